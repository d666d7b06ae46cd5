//! Statement segmentation
//!
//! Splits a SQL statement into the clauses the generator needs. Clause
//! boundaries are found by looking at depth-0 keyword tokens, so a
//! keyword inside parentheses or quotes never ends a clause. Clause
//! bodies are sliced from the original text.

use crate::error::{Error, ErrorCode, Result};
use crate::parser::ast::*;
use crate::parser::condition::{clean_field, clean_path};
use crate::parser::scanner::{split_assignment, split_top_level_commas, Scanned};
use crate::parser::tokenizer::{unquote_identifier, TokenKind};

// ============================================================================
// Clause Segmentation
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClauseKind {
    From,
    Join(JoinFlags),
    Where,
    GroupBy,
    Having,
    OrderBy,
    Limit,
    Offset,
}

/// A clause head found at depth 0: `head..body` is the keyword(s),
/// `body..end` the clause text.
#[derive(Debug, Clone, Copy)]
struct Clause {
    kind: ClauseKind,
    head: usize,
    body: usize,
    end: usize,
}

/// Recognize a clause head at `i`; returns the kind and the index just
/// past the head keywords.
fn clause_head(s: &Scanned<'_>, i: usize) -> Option<(ClauseKind, usize)> {
    if s.depths[i] != 0 {
        return None;
    }
    match s.tokens[i].kind {
        TokenKind::From => Some((ClauseKind::From, i + 1)),
        TokenKind::Where => Some((ClauseKind::Where, i + 1)),
        TokenKind::Having => Some((ClauseKind::Having, i + 1)),
        TokenKind::Limit => Some((ClauseKind::Limit, i + 1)),
        TokenKind::Offset => Some((ClauseKind::Offset, i + 1)),
        TokenKind::Group if s.is_top(i + 1, TokenKind::By) => Some((ClauseKind::GroupBy, i + 2)),
        TokenKind::Order if s.is_top(i + 1, TokenKind::By) => Some((ClauseKind::OrderBy, i + 2)),
        _ => join_head(s, i),
    }
}

/// `[NATURAL] [INNER|LEFT|RIGHT|FULL|CROSS] [OUTER] JOIN`. Modifier
/// keywords only form a head when they run into JOIN, which keeps
/// `LEFT(name, 3)` in a WHERE clause from looking like a join.
fn join_head(s: &Scanned<'_>, start: usize) -> Option<(ClauseKind, usize)> {
    let mut flags = JoinFlags::empty();
    let mut i = start;
    while i < s.len() && s.depths[i] == 0 {
        match s.tokens[i].kind {
            TokenKind::Join => return Some((ClauseKind::Join(flags), i + 1)),
            TokenKind::Natural => flags |= JoinFlags::NATURAL,
            TokenKind::Inner => flags |= JoinFlags::INNER,
            TokenKind::Cross => flags |= JoinFlags::CROSS,
            TokenKind::Left => flags |= JoinFlags::LEFT,
            TokenKind::Right => flags |= JoinFlags::RIGHT,
            TokenKind::Full => flags |= JoinFlags::LEFT | JoinFlags::RIGHT,
            TokenKind::Outer => flags |= JoinFlags::OUTER,
            _ => return None,
        }
        i += 1;
    }
    None
}

/// All clauses from `start` on, in source order
fn segment_clauses(s: &Scanned<'_>, start: usize) -> Vec<Clause> {
    let mut clauses: Vec<Clause> = Vec::new();
    let mut i = start;
    while i < s.len() {
        match clause_head(s, i) {
            Some((kind, body)) => {
                if let Some(prev) = clauses.last_mut() {
                    prev.end = i;
                }
                clauses.push(Clause {
                    kind,
                    head: i,
                    body,
                    end: s.len(),
                });
                i = body;
            }
            None => i += 1,
        }
    }
    clauses
}

// ============================================================================
// Parser
// ============================================================================

/// Statement parser. Stateless; one instance may parse any number of
/// statements.
#[derive(Debug, Clone, Default)]
pub struct SqlParser;

impl SqlParser {
    pub fn new() -> Self {
        SqlParser
    }

    /// Parse a single SQL statement
    pub fn parse(&self, sql: &str) -> Result<Statement> {
        let sql = sql
            .trim()
            .trim_end_matches(|c: char| c == ';' || c.is_whitespace());
        let s = Scanned::new(sql);

        let span = tracing::debug_span!("parse_statement", bytes = sql.len());
        let _enter = span.enter();

        let stmt = match s.kind(0) {
            Some(TokenKind::Select) => self.parse_select_or_union(&s)?,
            Some(TokenKind::Insert) => Statement::Insert(self.parse_insert(&s)),
            Some(TokenKind::Update) => Statement::Update(self.parse_update(&s)),
            Some(TokenKind::Delete) => Statement::Delete(self.parse_delete(&s)),
            Some(TokenKind::With) => {
                return Err(Error::with_message(
                    ErrorCode::UnsupportedQueryType,
                    "unsupported query type: WITH (common table expressions have no \
                     query builder translation; rewrite as a subquery or build the CTE \
                     with the ORM's CTE support)",
                ))
            }
            Some(_) => return Err(Error::unsupported(s.text(0).to_ascii_uppercase())),
            None => return Err(Error::unsupported("empty statement")),
        };

        tracing::debug!(kind = %stmt.kind(), "parsed statement");
        Ok(stmt)
    }

    // ========================================================================
    // SELECT / UNION
    // ========================================================================

    fn parse_select_or_union(&self, s: &Scanned<'_>) -> Result<Statement> {
        let unions: Vec<usize> = (0..s.len()).filter(|&i| s.is_top(i, TokenKind::Union)).collect();
        if unions.is_empty() {
            return Ok(Statement::Select(self.parse_select(s.source)));
        }

        let mut union_all = false;
        let mut queries = Vec::with_capacity(unions.len() + 1);
        let mut start = 0;
        for &u in unions.iter().chain(std::iter::once(&s.len())) {
            queries.push(self.parse_union_member(s.slice(start, u))?);
            start = u + 1;
            if s.is_top(start, TokenKind::All) {
                union_all = true;
                start += 1;
            }
        }

        tracing::debug!(members = queries.len(), union_all, "parsed UNION");
        Ok(Statement::Union(UnionStatement { union_all, queries }))
    }

    fn parse_union_member(&self, text: &str) -> Result<Statement> {
        let s = Scanned::new(text);
        match s.kind(0) {
            Some(TokenKind::Select) => Ok(Statement::Select(self.parse_select(text))),
            Some(TokenKind::LParen) if s.matching_paren(0) == Some(s.len() - 1) => {
                self.parse_union_member(s.slice(1, s.len() - 1))
            }
            Some(_) => Err(Error::unsupported(format!(
                "UNION member starting with {}",
                s.text(0).to_ascii_uppercase()
            ))),
            None => Err(Error::unsupported("empty UNION member")),
        }
    }

    /// Parse text starting with SELECT (and containing no top-level UNION)
    pub(crate) fn parse_select(&self, text: &str) -> SelectStatement {
        let s = Scanned::new(text);
        let mut stmt = SelectStatement {
            features: detect_features(&s),
            ..SelectStatement::default()
        };

        let mut i = 1;
        if s.is_top(i, TokenKind::Distinct) {
            stmt.distinct = true;
            i += 1;
        } else if s.is_top(i, TokenKind::All) {
            i += 1;
        }

        let from = s.find_top(i, TokenKind::From);
        stmt.fields = split_top_level_commas(s.slice(i, from.unwrap_or(s.len())))
            .iter()
            .filter(|f| !f.is_empty())
            .map(|f| parse_field(f))
            .collect();
        stmt.has_orm_aliases = stmt.fields.iter().any(FieldRef::is_orm_alias);

        let from = match from {
            Some(from) => from,
            None => return stmt,
        };

        let mut attached_offset = None;
        let mut standalone_offset = None;
        let mut previous: Option<ClauseKind> = None;

        for clause in segment_clauses(&s, from) {
            let body = s.slice(clause.body, clause.end);
            match clause.kind {
                ClauseKind::From => self.apply_from(&mut stmt, body),
                ClauseKind::Join(flags) => {
                    let join = parse_join(flags, body, stmt.from_reference());
                    stmt.joins.push(join);
                }
                ClauseKind::Where => stmt.where_clause = body.to_string(),
                ClauseKind::GroupBy => {
                    stmt.group_by = split_top_level_commas(body)
                        .into_iter()
                        .filter(|g| !g.is_empty())
                        .map(|g| clean_expr(&g))
                        .collect();
                }
                ClauseKind::Having => stmt.having = body.to_string(),
                ClauseKind::OrderBy => {
                    for term in split_top_level_commas(body) {
                        if let Some((field, direction)) = parse_order_term(&term) {
                            stmt.order_by.insert(field, direction);
                        }
                    }
                }
                ClauseKind::Limit => {
                    let (limit, offset) = parse_limit(body);
                    stmt.limit = limit;
                    if offset.is_some() {
                        attached_offset = offset;
                    }
                }
                ClauseKind::Offset => {
                    let offset = parse_count(body);
                    if offset.is_none() {
                        tracing::warn!(text = body, "ignoring non-numeric OFFSET");
                    }
                    if previous == Some(ClauseKind::Limit) {
                        attached_offset = offset;
                    } else {
                        standalone_offset = offset;
                    }
                }
            }
            tracing::trace!(head = s.text(clause.head), body, "clause");
            previous = Some(clause.kind);
        }

        // A standalone OFFSET wins over the one written with LIMIT
        stmt.offset = standalone_offset.or(attached_offset);
        stmt
    }

    fn apply_from(&self, stmt: &mut SelectStatement, body: &str) {
        let tables = split_top_level_commas(body);
        if tables.len() > 1 {
            tracing::warn!(tables = tables.len(), "comma-separated FROM tables, only the first is used");
            stmt.features |= QueryFeatures::IMPLICIT_JOIN;
        }
        let (table, alias) = parse_table_ref(tables.first().map(String::as_str).unwrap_or(""));
        stmt.from = table;
        stmt.from_alias = alias;
    }

    // ========================================================================
    // INSERT
    // ========================================================================

    fn parse_insert(&self, s: &Scanned<'_>) -> InsertStatement {
        let mut i = 1;
        if s.is_top(i, TokenKind::Ignore) {
            i += 1;
        }
        if s.is_top(i, TokenKind::Into) {
            i += 1;
        }

        let values = s.find_top(i, TokenKind::Values);
        let stop = values.unwrap_or(s.len());
        let columns = (i..stop).find(|&j| s.is_top(j, TokenKind::LParen));

        let mut stmt = InsertStatement {
            table: parse_table_ref(s.slice(i, columns.unwrap_or(stop))).0,
            ..InsertStatement::default()
        };

        if let Some(open) = columns {
            if let Some(close) = s.matching_paren(open) {
                stmt.fields = split_top_level_commas(s.slice(open + 1, close))
                    .iter()
                    .map(|f| clean_field(f))
                    .collect();
            }
        }

        let values = match values {
            Some(values) => values,
            None => {
                tracing::warn!(table = %stmt.table, "INSERT without VALUES");
                return stmt;
            }
        };

        let mut j = values + 1;
        while j < s.len() {
            match s.kind(j) {
                Some(TokenKind::Comma) => j += 1,
                Some(TokenKind::LParen) => {
                    let close = s.matching_paren(j).unwrap_or(s.len());
                    stmt.values.push(split_top_level_commas(s.slice(j + 1, close)));
                    j = close + 1;
                }
                _ => {
                    tracing::warn!(text = s.slice(j, s.len()), "ignoring text after VALUES rows");
                    break;
                }
            }
        }
        stmt
    }

    // ========================================================================
    // UPDATE
    // ========================================================================

    fn parse_update(&self, s: &Scanned<'_>) -> UpdateStatement {
        let set = s.find_top(1, TokenKind::Set);
        let (table, alias) = parse_table_ref(s.slice(1, set.unwrap_or(s.len())));
        let mut stmt = UpdateStatement {
            table,
            alias,
            ..UpdateStatement::default()
        };

        let set = match set {
            Some(set) => set,
            None => return stmt,
        };

        let tail = find_tail(s, set + 1);
        let where_at = s.find_top(set + 1, TokenKind::Where).filter(|&w| w < tail);
        for assignment in split_top_level_commas(s.slice(set + 1, where_at.unwrap_or(tail))) {
            match split_assignment(&assignment) {
                Some((field, value)) => stmt.assign(clean_field(&field), value),
                None => tracing::warn!(text = %assignment, "skipping malformed SET assignment"),
            }
        }
        if let Some(w) = where_at {
            stmt.where_clause = s.slice(w + 1, tail).to_string();
        }
        stmt
    }

    // ========================================================================
    // DELETE
    // ========================================================================

    fn parse_delete(&self, s: &Scanned<'_>) -> DeleteStatement {
        let table_start = s.find_top(1, TokenKind::From).map(|f| f + 1).unwrap_or(1);
        let tail = find_tail(s, table_start);
        let where_at = s.find_top(table_start, TokenKind::Where).filter(|&w| w < tail);

        let (from, alias) = parse_table_ref(s.slice(table_start, where_at.unwrap_or(tail)));
        DeleteStatement {
            from,
            alias,
            where_clause: where_at
                .map(|w| s.slice(w + 1, tail).to_string())
                .unwrap_or_default(),
        }
    }
}

/// Start of a trailing `ORDER BY` / `LIMIT` (MySQL UPDATE/DELETE), or the end
fn find_tail(s: &Scanned<'_>, from: usize) -> usize {
    (from..s.len())
        .find(|&i| {
            s.is_top(i, TokenKind::Limit)
                || (s.is_top(i, TokenKind::Order) && s.is_top(i + 1, TokenKind::By))
        })
        .unwrap_or(s.len())
}

// ============================================================================
// Clause Helpers
// ============================================================================

fn detect_features(s: &Scanned<'_>) -> QueryFeatures {
    let mut features = QueryFeatures::empty();
    for i in 0..s.len() {
        match s.tokens[i].kind {
            TokenKind::LParen if s.kind(i + 1) == Some(TokenKind::Select) => {
                features |= QueryFeatures::SUBQUERY;
            }
            TokenKind::Over
                if matches!(
                    s.kind(i + 1),
                    Some(TokenKind::LParen | TokenKind::Identifier | TokenKind::QuotedIdentifier)
                ) =>
            {
                features |= QueryFeatures::WINDOW_FUNCTION;
            }
            _ => {}
        }
    }
    features
}

/// One entry of a SELECT list
fn parse_field(segment: &str) -> FieldRef {
    let s = Scanned::new(segment);
    let n = s.len();

    // expr AS alias; the last top-level AS so CAST(x AS int) is left alone
    if let Some(as_at) = (0..n).rev().find(|&i| s.is_top(i, TokenKind::As)) {
        let field = s.slice(0, as_at);
        let alias = s.slice(as_at + 1, n);
        if !field.is_empty() && !alias.is_empty() {
            return FieldRef::aliased(clean_expr(field), unquote_identifier(alias));
        }
    }

    // expr alias: a single word without parentheses, whitespace, one identifier
    if n >= 2 && s.kind(n - 1).map_or(false, |k| k.is_identifier()) {
        let has_parens = s.tokens.iter().any(|t| t.kind == TokenKind::LParen);
        let separated = s.tokens[n - 1].start > s.tokens[n - 2].end;
        let single_word = (1..n - 1).all(|k| s.tokens[k].start == s.tokens[k - 1].end);
        if !has_parens && separated && single_word {
            return FieldRef::aliased(
                clean_expr(s.slice(0, n - 1)),
                unquote_identifier(s.text(n - 1)),
            );
        }
    }

    FieldRef::Name(clean_expr(segment))
}

/// Unquote plain column paths; leave expressions and literals as written
fn clean_expr(text: &str) -> String {
    clean_path(text).unwrap_or_else(|| text.trim().to_string())
}

/// `table [[AS] alias]` or `(subquery) [[AS] alias]`
fn parse_table_ref(text: &str) -> (String, Option<String>) {
    let s = Scanned::new(text);
    if s.is_empty() {
        return (String::new(), None);
    }

    let (table, mut next) = if s.kind(0) == Some(TokenKind::LParen) {
        let end = s.matching_paren(0).map(|c| c + 1).unwrap_or(s.len());
        (s.slice(0, end).to_string(), end)
    } else {
        let mut end = 1;
        while s.kind(end) == Some(TokenKind::Dot) && end + 1 < s.len() {
            end += 2;
        }
        (clean_field(s.slice(0, end)), end)
    };

    if s.kind(next) == Some(TokenKind::As) {
        next += 1;
    }
    let alias = match s.kind(next) {
        Some(kind) if kind.is_identifier() => Some(unquote_identifier(s.text(next))),
        _ => None,
    };
    (table, alias)
}

/// Body of a join clause: `table [[AS] alias] ON cond` or `... USING (cols)`
fn parse_join(flags: JoinFlags, body: &str, left: &str) -> JoinClause {
    let s = Scanned::new(body);
    let on = s.find_top(0, TokenKind::On);
    let using = s.find_top(0, TokenKind::Using);
    let table_end = on.or(using).unwrap_or(s.len());
    let (table, alias) = parse_table_ref(s.slice(0, table_end));

    let mut join = JoinClause {
        kind: JoinType::from_flags(flags),
        table,
        alias,
        conditions: String::new(),
    };

    if let Some(on) = on {
        join.conditions = s.slice(on + 1, s.len()).to_string();
    } else if let Some(using) = using {
        let columns = match s.matching_paren(using + 1) {
            Some(close) => split_top_level_commas(s.slice(using + 2, close)),
            None => split_top_level_commas(s.slice(using + 1, s.len())),
        };
        let right = join.reference().to_string();
        join.conditions = columns
            .iter()
            .filter(|c| !c.is_empty())
            .map(|c| {
                let c = clean_field(c);
                format!("{}.{} = {}.{}", left, c, right, c)
            })
            .collect::<Vec<_>>()
            .join(" AND ");
    }
    join
}

/// `field [ASC|DESC]`
fn parse_order_term(term: &str) -> Option<(String, SortOrder)> {
    let s = Scanned::new(term);
    let n = s.len();
    if n == 0 {
        return None;
    }
    let (field, direction) = match s.kind(n - 1) {
        Some(TokenKind::Desc) if s.depths[n - 1] == 0 => (s.slice(0, n - 1), SortOrder::Desc),
        Some(TokenKind::Asc) if s.depths[n - 1] == 0 => (s.slice(0, n - 1), SortOrder::Asc),
        _ => (s.slice(0, n), SortOrder::Asc),
    };
    if field.is_empty() {
        return None;
    }
    Some((clean_expr(field), direction))
}

/// `n`, or MySQL's `offset, n`. Returns (limit, offset).
fn parse_limit(body: &str) -> (Option<u64>, Option<u64>) {
    let parts = split_top_level_commas(body);
    match parts.as_slice() {
        [count] => {
            let limit = parse_count(count);
            if limit.is_none() {
                tracing::warn!(text = body, "ignoring non-numeric LIMIT");
            }
            (limit, None)
        }
        [offset, count] => (parse_count(count), parse_count(offset)),
        _ => {
            tracing::warn!(text = body, "ignoring malformed LIMIT");
            (None, None)
        }
    }
}

fn parse_count(text: &str) -> Option<u64> {
    text.trim().parse().ok()
}

/// Parse a statement with a fresh parser
pub fn parse_statement(sql: &str) -> Result<Statement> {
    SqlParser::new().parse(sql)
}

// ============================================================================
// Tests
// ============================================================================
