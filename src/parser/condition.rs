//! WHERE / HAVING condition parsing
//!
//! Turns a boolean SQL fragment into a [`ConditionTree`] shaped like the
//! conditions array the CakePHP query builder takes. Parsing is
//! split-and-recurse: OR binds loosest, then AND, then a wrapping pair of
//! parentheses, then a single comparison leaf. Nothing here fails; text
//! that cannot be classified becomes a [`Condition::Raw`] leaf so the
//! generator can leave a TODO for it.

use std::fmt;

use crate::parser::scanner::{
    split_conjunction, split_on_kind, split_top_level_commas, strip_outer_parens, Scanned,
};
use crate::parser::tokenizer::{unquote_identifier, TokenKind};

/// Nesting beyond this depth is not parsed any further.
pub const DEFAULT_MAX_DEPTH: usize = 64;

// ============================================================================
// Values
// ============================================================================

/// The right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// `X'..'` hex literal
    Binary(Vec<u8>),
    /// IN lists and BETWEEN bounds
    List(Vec<Value>),
    /// Unquoted text that is not a literal: a column reference, a
    /// function call, a placeholder. Without a schema the two cannot be
    /// told apart, so the text is carried verbatim.
    Expression(String),
}

impl Value {
    /// Classify a literal the way it was written in SQL
    pub fn parse(text: &str) -> Value {
        let text = text.trim();

        match text.to_ascii_uppercase().as_str() {
            "NULL" => return Value::Null,
            "TRUE" => return Value::Bool(true),
            "FALSE" => return Value::Bool(false),
            _ => {}
        }

        let scanned = Scanned::new(text);
        if scanned.len() == 1 {
            let token = scanned.tokens[0];
            let literal = token.text(text);
            match token.kind {
                TokenKind::String if is_closed_quote(literal, '\'') => {
                    return Value::String(unescape_quoted(literal));
                }
                TokenKind::QuotedIdentifier if is_closed_quote(literal, '"') => {
                    return Value::String(unescape_quoted(literal));
                }
                TokenKind::Blob => {
                    if let Ok(bytes) = hex::decode(&literal[2..literal.len() - 1]) {
                        return Value::Binary(bytes);
                    }
                }
                _ => {}
            }
        }

        if let Some(number) = parse_number(text) {
            return number;
        }

        Value::Expression(text.to_string())
    }

    pub fn is_expression(&self) -> bool {
        matches!(self, Value::Expression(_))
    }

    /// True if this value or any list element is an expression
    pub fn contains_expression(&self) -> bool {
        match self {
            Value::Expression(_) => true,
            Value::List(items) => items.iter().any(Value::contains_expression),
            _ => false,
        }
    }

    /// Render back to SQL text
    pub fn to_sql(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(true) => "TRUE".to_string(),
            Value::Bool(false) => "FALSE".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => format!("'{}'", s.replace('\'', "''")),
            Value::Binary(b) => format!("X'{}'", hex::encode_upper(b)),
            Value::List(items) => {
                let items: Vec<String> = items.iter().map(Value::to_sql).collect();
                format!("({})", items.join(", "))
            }
            Value::Expression(e) => e.clone(),
        }
    }
}

fn is_closed_quote(text: &str, quote: char) -> bool {
    text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote)
}

/// Strip surrounding quotes, resolving doubled quotes and backslash escapes
fn unescape_quoted(text: &str) -> String {
    let quote = text.chars().next().unwrap_or('\'');
    let inner = &text[1..text.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('0') => out.push('\0'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else if c == quote && chars.peek() == Some(&quote) {
            chars.next();
            out.push(quote);
        } else {
            out.push(c);
        }
    }
    out
}

/// `[+-]digits[.digits][e[+-]digits]`, or `[+-].digits[...]`
fn parse_number(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let mut i = 0;
    if i < bytes.len() && (bytes[i] == b'-' || bytes[i] == b'+') {
        i += 1;
    }
    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == int_start && bytes.get(i) != Some(&b'.') {
        return None;
    }
    let mut is_float = false;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == frac_start {
            return None;
        }
        is_float = true;
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if i < bytes.len() && (bytes[i] == b'-' || bytes[i] == b'+') {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return None;
        }
        is_float = true;
    }
    if i != bytes.len() {
        return None;
    }

    if !is_float {
        if let Ok(n) = text.parse::<i64>() {
            return Some(Value::Int(n));
        }
    }
    text.parse::<f64>().ok().map(Value::Float)
}

// ============================================================================
// Condition Tree
// ============================================================================

/// Comparison operator of a leaf. The suffix is what follows the field
/// name in the CakePHP conditions key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Gt,
    Ge,
    Lt,
    Le,
    In,
    NotIn,
    Like,
    NotLike,
    Is,
    IsNot,
    Between,
    NotBetween,
}

impl Operator {
    /// Key suffix; empty for equality
    pub fn suffix(&self) -> &'static str {
        match self {
            Operator::Eq => "",
            Operator::NotEq => "!=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::Is => "IS",
            Operator::IsNot => "IS NOT",
            Operator::Between => "BETWEEN",
            Operator::NotBetween => "NOT BETWEEN",
        }
    }

    fn from_token(kind: TokenKind) -> Option<Operator> {
        match kind {
            TokenKind::Eq | TokenKind::EqEq => Some(Operator::Eq),
            TokenKind::Ne | TokenKind::BangEq => Some(Operator::NotEq),
            TokenKind::Gt => Some(Operator::Gt),
            TokenKind::Ge => Some(Operator::Ge),
            TokenKind::Lt => Some(Operator::Lt),
            TokenKind::Le => Some(Operator::Le),
            _ => None,
        }
    }
}

/// One conjunct of a [`ConditionTree`]
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `field op value`
    Compare {
        field: String,
        op: Operator,
        value: Value,
    },
    /// Disjunction; every branch is itself a conjunction
    Or(Vec<ConditionTree>),
    /// `NOT (...)`
    Not(ConditionTree),
    /// `[NOT] EXISTS (subquery)`, subquery kept as text
    Exists { negated: bool, subquery: String },
    /// Text that could not be classified
    Raw(String),
}

impl Condition {
    pub fn compare(field: impl Into<String>, op: Operator, value: Value) -> Self {
        Condition::Compare {
            field: field.into(),
            op,
            value,
        }
    }

    /// True for a comparison against a literal. Only these sit under a
    /// field key in the conditions array; everything else is a numeric
    /// entry or a group and never collides with another condition.
    pub fn is_keyed(&self) -> bool {
        matches!(self, Condition::Compare { value, .. } if !value.contains_expression())
    }

    /// Key of this condition in the conditions array
    pub fn key(&self) -> String {
        match self {
            Condition::Compare { field, op, .. } => {
                if op.suffix().is_empty() {
                    field.clone()
                } else {
                    format!("{} {}", field, op.suffix())
                }
            }
            Condition::Or(_) => "OR".to_string(),
            Condition::Not(_) => "NOT".to_string(),
            Condition::Exists { negated, subquery } => {
                let keyword = if *negated { "NOT EXISTS" } else { "EXISTS" };
                format!("{} ({})", keyword, subquery)
            }
            Condition::Raw(_) => "_raw".to_string(),
        }
    }

    /// Render this condition back to SQL
    pub fn to_sql(&self) -> String {
        match self {
            Condition::Compare { field, op, value } => match (op, value) {
                (Operator::Eq, _) => format!("{} = {}", field, value.to_sql()),
                (Operator::Between | Operator::NotBetween, Value::List(bounds))
                    if bounds.len() == 2 =>
                {
                    format!(
                        "{} {} {} AND {}",
                        field,
                        op.suffix(),
                        bounds[0].to_sql(),
                        bounds[1].to_sql()
                    )
                }
                _ => format!("{} {} {}", field, op.suffix(), value.to_sql()),
            },
            Condition::Or(branches) => {
                let parts: Vec<String> = branches
                    .iter()
                    .map(|b| format!("({})", b.to_sql()))
                    .collect();
                parts.join(" OR ")
            }
            Condition::Not(inner) => format!("NOT ({})", inner.to_sql()),
            Condition::Exists { .. } => self.key(),
            Condition::Raw(text) => text.clone(),
        }
    }
}

/// Implicit conjunction of conditions, in source order.
///
/// Keyed comparisons (see [`Condition::is_keyed`]) behave like an ordered
/// map: inserting one whose key is already present replaces the earlier
/// one in place. Groups, raw text and expression comparisons are always
/// appended.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConditionTree {
    conditions: Vec<Condition>,
}

impl ConditionTree {
    pub fn new() -> Self {
        ConditionTree::default()
    }

    /// Insert, replacing any condition with the same key. Returns the
    /// replaced condition.
    pub fn insert(&mut self, condition: Condition) -> Option<Condition> {
        if !condition.is_keyed() {
            self.conditions.push(condition);
            return None;
        }
        let key = condition.key();
        match self
            .conditions
            .iter()
            .position(|c| c.is_keyed() && c.key() == key)
        {
            Some(i) => Some(std::mem::replace(&mut self.conditions[i], condition)),
            None => {
                self.conditions.push(condition);
                None
            }
        }
    }

    /// Insert every condition of `other`; later keys win.
    pub fn merge(&mut self, other: ConditionTree) {
        for condition in other.conditions {
            if let Some(replaced) = self.insert(condition) {
                tracing::warn!(
                    key = %replaced.key(),
                    "condition overwritten by a later one with the same key"
                );
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.key() == key)
    }

    /// Value of the comparison stored under `key`
    pub fn value(&self, key: &str) -> Option<&Value> {
        match self.get(key)? {
            Condition::Compare { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.conditions.iter()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// True if any condition, at any depth, fell back to raw text
    pub fn has_raw(&self) -> bool {
        self.conditions.iter().any(|c| match c {
            Condition::Raw(_) => true,
            Condition::Or(branches) => branches.iter().any(ConditionTree::has_raw),
            Condition::Not(inner) => inner.has_raw(),
            _ => false,
        })
    }

    pub fn to_sql(&self) -> String {
        let parts: Vec<String> = self
            .conditions
            .iter()
            .map(|c| match c {
                Condition::Or(_) if self.conditions.len() > 1 => format!("({})", c.to_sql()),
                _ => c.to_sql(),
            })
            .collect();
        parts.join(" AND ")
    }
}

impl From<Vec<Condition>> for ConditionTree {
    fn from(conditions: Vec<Condition>) -> Self {
        let mut tree = ConditionTree::new();
        for condition in conditions {
            tree.insert(condition);
        }
        tree
    }
}

impl From<Condition> for ConditionTree {
    fn from(condition: Condition) -> Self {
        ConditionTree {
            conditions: vec![condition],
        }
    }
}

impl fmt::Display for ConditionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

// ============================================================================
// Parser
// ============================================================================

/// Parser for WHERE / HAVING fragments
#[derive(Debug, Clone)]
pub struct ConditionParser {
    max_depth: usize,
}

impl Default for ConditionParser {
    fn default() -> Self {
        ConditionParser {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ConditionParser {
    pub fn new() -> Self {
        ConditionParser::default()
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parse a boolean expression. Never fails.
    pub fn parse(&self, text: &str) -> ConditionTree {
        self.parse_at(text, 0)
    }

    fn parse_at(&self, text: &str, depth: usize) -> ConditionTree {
        let text = text.trim();
        if text.is_empty() {
            return ConditionTree::new();
        }
        if depth > self.max_depth {
            tracing::warn!(depth, "condition nesting too deep, keeping raw text");
            return Condition::Raw(text.to_string()).into();
        }

        let parts = split_on_kind(text, TokenKind::Or);
        if parts.len() > 1 {
            if parts.iter().any(|p| p.is_empty()) {
                return Condition::Raw(text.to_string()).into();
            }
            let branches = parts.iter().map(|p| self.parse_at(p, depth + 1)).collect();
            return Condition::Or(branches).into();
        }

        let parts = split_conjunction(text);
        if parts.len() > 1 {
            if parts.iter().any(|p| p.is_empty()) {
                return Condition::Raw(text.to_string()).into();
            }
            let mut tree = ConditionTree::new();
            for part in &parts {
                tree.merge(self.parse_at(part, depth + 1));
            }
            return tree;
        }

        if let Some(inner) = strip_outer_parens(text) {
            if inner.is_empty() {
                return Condition::Raw(text.to_string()).into();
            }
            return self.parse_at(&inner, depth + 1);
        }

        self.parse_leaf(text, depth).into()
    }

    /// Classify a single predicate
    fn parse_leaf(&self, text: &str, depth: usize) -> Condition {
        let s = Scanned::new(text);
        let n = s.len();
        let raw = || Condition::Raw(text.to_string());

        // IS NOT NULL / IS NULL
        if n >= 3 && s.is_top(n - 2, TokenKind::Is) && s.is_top(n - 1, TokenKind::Null) {
            let (field_start, field_end, op) =
                negated_at(&s, n - 2, Operator::Is, Operator::IsNot);
            return leaf(s.slice(field_start, field_end), op, Value::Null).unwrap_or_else(raw);
        }
        if n >= 4 && s.is_top(n - 3, TokenKind::Is) && s.is_top(n - 2, TokenKind::Not)
            && s.is_top(n - 1, TokenKind::Null)
        {
            let negated = n > 4 && s.is_top(0, TokenKind::Not);
            let (field_start, op) = if negated {
                (1, Operator::Is)
            } else {
                (0, Operator::IsNot)
            };
            return leaf(s.slice(field_start, n - 3), op, Value::Null).unwrap_or_else(raw);
        }

        // [NOT] BETWEEN low AND high
        if let Some(b) = s.find_top(0, TokenKind::Between) {
            let and = match s.find_top(b + 1, TokenKind::And) {
                Some(and) => and,
                None => return raw(),
            };
            let (field_start, field_end, op) =
                negated_at(&s, b, Operator::Between, Operator::NotBetween);
            let low = s.slice(b + 1, and);
            let high = s.slice(and + 1, n);
            if low.is_empty() || high.is_empty() {
                return raw();
            }
            let bounds = Value::List(vec![Value::parse(low), Value::parse(high)]);
            return leaf(s.slice(field_start, field_end), op, bounds).unwrap_or_else(raw);
        }

        // [NOT] IN (...)
        if let Some(i) = s.find_top(0, TokenKind::In) {
            let close = match s.matching_paren(i + 1) {
                Some(close) if close == n - 1 => close,
                _ => return raw(),
            };
            if s.kind(i + 2) == Some(TokenKind::Select) {
                return raw();
            }
            let (field_start, field_end, op) = negated_at(&s, i, Operator::In, Operator::NotIn);
            let items = split_top_level_commas(s.slice(i + 2, close))
                .iter()
                .map(|item| Value::parse(item))
                .collect();
            return leaf(s.slice(field_start, field_end), op, Value::List(items))
                .unwrap_or_else(raw);
        }

        // [NOT] LIKE
        if let Some(l) = s.find_top(0, TokenKind::Like) {
            let (field_start, field_end, op) =
                negated_at(&s, l, Operator::Like, Operator::NotLike);
            let pattern = s.slice(l + 1, n);
            if pattern.is_empty() {
                return raw();
            }
            return leaf(s.slice(field_start, field_end), op, Value::parse(pattern))
                .unwrap_or_else(raw);
        }

        // [NOT] EXISTS (...) and NOT <predicate>
        if s.is_top(0, TokenKind::Exists) || s.is_top(0, TokenKind::Not) {
            let negated = s.is_top(0, TokenKind::Not);
            let exists_at = if negated { 1 } else { 0 };
            if s.is_top(exists_at, TokenKind::Exists) {
                return match s.matching_paren(exists_at + 1) {
                    Some(close) if close == n - 1 => Condition::Exists {
                        negated,
                        subquery: s.slice(exists_at + 2, close).to_string(),
                    },
                    _ => raw(),
                };
            }
            if exists_at == 0 {
                return raw();
            }
            let inner = self.parse_at(s.slice(1, n), depth + 1);
            if inner.is_empty() {
                return raw();
            }
            return Condition::Not(inner);
        }

        // Comparison operators, longest first
        const COMPARISONS: [TokenKind; 8] = [
            TokenKind::BangEq,
            TokenKind::Ne,
            TokenKind::Ge,
            TokenKind::Le,
            TokenKind::Gt,
            TokenKind::Lt,
            TokenKind::EqEq,
            TokenKind::Eq,
        ];
        for kind in COMPARISONS {
            if let Some(p) = s.find_top(0, kind) {
                let value = s.slice(p + 1, n);
                if value.is_empty() {
                    return raw();
                }
                let op = Operator::from_token(kind).unwrap_or(Operator::Eq);
                return leaf(s.slice(0, p), op, Value::parse(value)).unwrap_or_else(raw);
            }
        }

        raw()
    }
}

/// Field span and operator for the keyword at `at`. A top-level NOT right
/// before the keyword (`a NOT LIKE`) or in front of the whole predicate
/// (`NOT a LIKE`) negates the operator; both together cancel out.
fn negated_at(
    s: &Scanned<'_>,
    at: usize,
    plain: Operator,
    negated: Operator,
) -> (usize, usize, Operator) {
    let (end, mut is_negated) = if at > 0 && s.is_top(at - 1, TokenKind::Not) {
        (at - 1, true)
    } else {
        (at, false)
    };
    let start = if end > 1 && s.is_top(0, TokenKind::Not) {
        is_negated = !is_negated;
        1
    } else {
        0
    };
    (start, end, if is_negated { negated } else { plain })
}

fn leaf(field: &str, op: Operator, value: Value) -> Option<Condition> {
    let field = clean_field(field);
    if field.is_empty() {
        return None;
    }
    Some(Condition::compare(field, op, value))
}

/// Remove quoting from a field reference.
///
/// A dotted identifier path has each part unquoted (`` `u`.`id` `` →
/// `u.id`); any other expression only loses surrounding quote characters.
pub fn clean_field(text: &str) -> String {
    let text = text.trim();
    match clean_path(text) {
        Some(path) => path,
        None => text
            .trim_matches(|c| c == '`' || c == '"' || c == '\'')
            .trim()
            .to_string(),
    }
}

/// Unquote a `schema.table.column` style path, or `None` when the text is
/// anything else.
pub fn clean_path(text: &str) -> Option<String> {
    let text = text.trim();
    let s = Scanned::new(text);
    let is_path = !s.is_empty()
        && s.tokens.iter().all(|t| {
            matches!(
                t.kind,
                TokenKind::Identifier | TokenKind::QuotedIdentifier | TokenKind::Dot | TokenKind::Star
            )
        });
    if !is_path {
        return None;
    }
    Some(
        s.tokens
            .iter()
            .map(|t| match t.kind {
                TokenKind::QuotedIdentifier => unquote_identifier(t.text(text)),
                _ => t.text(text).to_string(),
            })
            .collect(),
    )
}

/// Parse a condition with the default parser
pub fn parse_condition(text: &str) -> ConditionTree {
    ConditionParser::new().parse(text)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cmp(field: &str, op: Operator, value: Value) -> Condition {
        Condition::compare(field, op, value)
    }

    fn s(text: &str) -> Value {
        Value::String(text.to_string())
    }

    #[test]
    fn test_simple_equality() {
        let tree = parse_condition("id = 5");
        assert_eq!(tree, ConditionTree::from(cmp("id", Operator::Eq, Value::Int(5))));
        assert_eq!(tree.value("id"), Some(&Value::Int(5)));
    }

    #[test]
    fn test_and_merges_flat() {
        let tree = parse_condition("active = 1 AND role = 'admin'");
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.value("active"), Some(&Value::Int(1)));
        assert_eq!(tree.value("role"), Some(&s("admin")));
    }

    #[test]
    fn test_or_produces_branches() {
        let tree = parse_condition("status = 'active' OR status = 'pending'");
        assert_eq!(
            tree,
            ConditionTree::from(Condition::Or(vec![
                cmp("status", Operator::Eq, s("active")).into(),
                cmp("status", Operator::Eq, s("pending")).into(),
            ]))
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let tree = parse_condition("a = 1 AND b = 2 OR c = 3");
        match tree.get("OR") {
            Some(Condition::Or(branches)) => {
                assert_eq!(branches.len(), 2);
                assert_eq!(branches[0].len(), 2);
                assert_eq!(branches[1].value("c"), Some(&Value::Int(3)));
            }
            other => panic!("expected OR, got {:?}", other),
        }
    }

    #[test]
    fn test_comparison_operators() {
        assert_eq!(parse_condition("age > 18").value("age >"), Some(&Value::Int(18)));
        assert_eq!(parse_condition("age >= 18").value("age >="), Some(&Value::Int(18)));
        assert_eq!(parse_condition("age <= 18").value("age <="), Some(&Value::Int(18)));
        assert_eq!(parse_condition("age < 18").value("age <"), Some(&Value::Int(18)));
        assert_eq!(
            parse_condition("status <> 'banned'").value("status !="),
            Some(&s("banned"))
        );
        assert_eq!(
            parse_condition("status != 'banned'").value("status !="),
            Some(&s("banned"))
        );
    }

    #[test]
    fn test_in_and_not_in() {
        assert_eq!(
            parse_condition("status IN (1,2,3)").value("status IN"),
            Some(&Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]))
        );
        assert_eq!(
            parse_condition("role NOT IN ('a', 'b')").value("role NOT IN"),
            Some(&Value::List(vec![s("a"), s("b")]))
        );
    }

    #[test]
    fn test_in_subquery_is_raw() {
        let tree = parse_condition("id IN (SELECT user_id FROM posts)");
        assert_eq!(
            tree.get("_raw"),
            Some(&Condition::Raw("id IN (SELECT user_id FROM posts)".into()))
        );
    }

    #[test]
    fn test_like_and_not_like() {
        assert_eq!(parse_condition("name LIKE '%jo%'").value("name LIKE"), Some(&s("%jo%")));
        assert_eq!(
            parse_condition("name NOT LIKE 'x%'").value("name NOT LIKE"),
            Some(&s("x%"))
        );
    }

    #[test]
    fn test_null_checks() {
        assert_eq!(parse_condition("deleted IS NULL").value("deleted IS"), Some(&Value::Null));
        assert_eq!(
            parse_condition("deleted is not null").value("deleted IS NOT"),
            Some(&Value::Null)
        );
    }

    #[test]
    fn test_between_is_not_split_on_and() {
        let tree = parse_condition("created BETWEEN '2023-01-01' AND '2023-12-31'");
        assert_eq!(tree.len(), 1);
        assert_eq!(
            tree.value("created BETWEEN"),
            Some(&Value::List(vec![s("2023-01-01"), s("2023-12-31")]))
        );
    }

    #[test]
    fn test_between_followed_by_and() {
        let tree = parse_condition("x BETWEEN 1 AND 5 AND y NOT BETWEEN 2 AND 3");
        assert_eq!(tree.len(), 2);
        assert_eq!(
            tree.value("x BETWEEN"),
            Some(&Value::List(vec![Value::Int(1), Value::Int(5)]))
        );
        assert!(tree.value("y NOT BETWEEN").is_some());
    }

    #[test]
    fn test_exists_kept_opaque() {
        let tree = parse_condition("NOT EXISTS (SELECT 1 FROM bans b WHERE b.user_id = u.id)");
        assert_eq!(
            tree.iter().next(),
            Some(&Condition::Exists {
                negated: true,
                subquery: "SELECT 1 FROM bans b WHERE b.user_id = u.id".into(),
            })
        );
    }

    #[test]
    fn test_not_group() {
        let tree = parse_condition("NOT (a = 1 OR b = 2)");
        match tree.get("NOT") {
            Some(Condition::Not(inner)) => assert!(inner.get("OR").is_some()),
            other => panic!("expected NOT, got {:?}", other),
        }
    }

    #[test]
    fn test_outer_parens_stripped() {
        let tree = parse_condition("(a = 1 AND (b = 2))");
        assert_eq!(tree.value("a"), Some(&Value::Int(1)));
        assert_eq!(tree.value("b"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_nested_or_inside_and() {
        let tree = parse_condition("active = 1 AND (role = 'a' OR role = 'b')");
        assert_eq!(tree.len(), 2);
        assert!(matches!(tree.get("OR"), Some(Condition::Or(b)) if b.len() == 2));
    }

    #[test]
    fn test_later_key_overrides() {
        let tree = parse_condition("a = 1 AND a = 2");
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.value("a"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_and_keeps_every_or_group() {
        let tree = parse_condition("(a = 1 OR b = 2) AND (c = 3 OR d = 4)");
        assert_eq!(tree.len(), 2);
        let groups: Vec<&Condition> = tree.iter().collect();
        match (groups[0], groups[1]) {
            (Condition::Or(first), Condition::Or(second)) => {
                assert_eq!(first[0].value("a"), Some(&Value::Int(1)));
                assert_eq!(second[1].value("d"), Some(&Value::Int(4)));
            }
            other => panic!("expected two OR groups, got {:?}", other),
        }
    }

    #[test]
    fn test_and_keeps_every_raw_fragment() {
        let tree = parse_condition("MATCH(title) AGAINST('x') AND foo(y) AND z = 1");
        let raws: Vec<&Condition> = tree
            .iter()
            .filter(|c| matches!(c, Condition::Raw(_)))
            .collect();
        assert_eq!(
            raws,
            vec![
                &Condition::Raw("MATCH(title) AGAINST('x')".into()),
                &Condition::Raw("foo(y)".into()),
            ]
        );
        assert_eq!(tree.value("z"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_and_keeps_expression_comparisons() {
        let tree = parse_condition("a.x = b.y AND a.x = c.z AND a.x = 1 AND a.x = 2");
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.value("a.x"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_prefix_not_negates_operator() {
        assert_eq!(
            parse_condition("NOT a BETWEEN 1 AND 2").value("a NOT BETWEEN"),
            Some(&Value::List(vec![Value::Int(1), Value::Int(2)]))
        );
        assert_eq!(parse_condition("NOT name LIKE 'x'").value("name NOT LIKE"), Some(&s("x")));
        assert_eq!(
            parse_condition("NOT id IN (1, 2)").value("id NOT IN"),
            Some(&Value::List(vec![Value::Int(1), Value::Int(2)]))
        );
        assert_eq!(parse_condition("NOT name NOT LIKE 'x'").value("name LIKE"), Some(&s("x")));
        assert_eq!(parse_condition("NOT deleted IS NULL").value("deleted IS NOT"), Some(&Value::Null));
        assert_eq!(parse_condition("NOT deleted IS NOT NULL").value("deleted IS"), Some(&Value::Null));
    }

    #[test]
    fn test_prefix_not_on_comparison() {
        let tree = parse_condition("NOT a = 1");
        assert_eq!(
            tree.get("NOT"),
            Some(&Condition::Not(cmp("a", Operator::Eq, Value::Int(1)).into()))
        );
        assert_eq!(parse_condition(&tree.to_sql()), tree);
    }

    #[test]
    fn test_field_cleaning() {
        assert_eq!(parse_condition("`u`.`id` = 1").value("u.id"), Some(&Value::Int(1)));
        assert_eq!(parse_condition("\"name\" = 'x'").value("name"), Some(&s("x")));
    }

    #[test]
    fn test_value_classification() {
        assert_eq!(Value::parse("NULL"), Value::Null);
        assert_eq!(Value::parse("true"), Value::Bool(true));
        assert_eq!(Value::parse("FALSE"), Value::Bool(false));
        assert_eq!(Value::parse("-42"), Value::Int(-42));
        assert_eq!(Value::parse("3.5"), Value::Float(3.5));
        assert_eq!(Value::parse("1e3"), Value::Float(1000.0));
        assert_eq!(Value::parse(".5"), Value::Float(0.5));
        assert_eq!(Value::parse("-.25"), Value::Float(-0.25));
        assert_eq!(Value::parse("."), Value::Expression(".".into()));
        assert_eq!(Value::parse("'it''s'"), s("it's"));
        assert_eq!(Value::parse(r"'don\'t'"), s("don't"));
        assert_eq!(Value::parse("\"dq\""), s("dq"));
        assert_eq!(Value::parse("X'4869'"), Value::Binary(b"Hi".to_vec()));
        assert_eq!(Value::parse("NOW()"), Value::Expression("NOW()".into()));
        assert_eq!(Value::parse("u.id"), Value::Expression("u.id".into()));
        assert_eq!(Value::parse("'a' || 'b'"), Value::Expression("'a' || 'b'".into()));
        assert_eq!(
            Value::parse("99999999999999999999"),
            Value::Float(99999999999999999999.0)
        );
    }

    #[test]
    fn test_garbage_degrades_to_raw() {
        for input in ["foo bar baz", "a = ", "= 1", "x BETWEEN 1", "OR", "a = 1 AND", "(("] {
            let tree = parse_condition(input);
            assert!(tree.has_raw(), "expected raw fallback for {:?}", input);
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_condition("   ").is_empty());
    }

    #[test]
    fn test_depth_guard() {
        let nested = format!("{}a = 1{}", "(".repeat(10), ")".repeat(10));
        let tree = ConditionParser::new().with_max_depth(3).parse(&nested);
        assert!(tree.has_raw());
        let tree = ConditionParser::new().parse(&nested);
        assert_eq!(tree.value("a"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_to_sql_round_trip_shape() {
        let tree = parse_condition("a = 1 AND (b = 'x' OR c IS NULL)");
        assert_eq!(tree.to_sql(), "a = 1 AND ((b = 'x') OR (c IS NULL))");
        assert_eq!(parse_condition(&tree.to_sql()), tree);
    }
}
