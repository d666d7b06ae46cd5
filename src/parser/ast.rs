//! Parsed statement model
//!
//! The statement parser segments SQL into these records. Clause bodies
//! that need a parser of their own (WHERE, HAVING, join conditions, SET
//! values) are kept as raw text and interpreted by the generator.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorCode, Result};

// ============================================================================
// Core Types
// ============================================================================

/// Sort order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Kind of join
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
    Full,
}

impl JoinType {
    /// Collapse the modifiers seen before JOIN into a join type.
    /// CROSS and NATURAL joins have no dedicated type and map to INNER.
    pub fn from_flags(flags: JoinFlags) -> Self {
        if flags.contains(JoinFlags::LEFT | JoinFlags::RIGHT) {
            JoinType::Full
        } else if flags.contains(JoinFlags::LEFT) {
            JoinType::Left
        } else if flags.contains(JoinFlags::RIGHT) {
            JoinType::Right
        } else {
            JoinType::Inner
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
            JoinType::Full => "FULL",
        }
    }
}

bitflags::bitflags! {
    /// Modifier keywords collected while scanning a join head.
    ///
    /// `FULL` sets both `LEFT` and `RIGHT`, so `FULL OUTER JOIN` is
    /// `LEFT | RIGHT | OUTER`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct JoinFlags: u8 {
        const INNER   = 0x01;
        const CROSS   = 0x02;
        const NATURAL = 0x04;
        const LEFT    = 0x08;
        const RIGHT   = 0x10;
        const OUTER   = 0x20;
    }
}

bitflags::bitflags! {
    /// SQL constructs that have no query-builder translation but are
    /// worth a guidance comment in the generated code.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct QueryFeatures: u8 {
        /// A nested `(SELECT ...)` somewhere in the statement
        const SUBQUERY        = 0x01;
        /// A window function call (`... OVER (...)`)
        const WINDOW_FUNCTION = 0x02;
        /// Comma-separated tables in FROM
        const IMPLICIT_JOIN   = 0x04;
    }
}

// ============================================================================
// Statements
// ============================================================================

/// Discriminant of a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Union,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatementKind::Select => "SELECT",
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
            StatementKind::Union => "UNION",
        };
        f.write_str(name)
    }
}

/// A parsed SQL statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    Union(UnionStatement),
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        match self {
            Statement::Select(_) => StatementKind::Select,
            Statement::Insert(_) => StatementKind::Insert,
            Statement::Update(_) => StatementKind::Update,
            Statement::Delete(_) => StatementKind::Delete,
            Statement::Union(_) => StatementKind::Union,
        }
    }

    /// Decode a statement previously serialized to JSON.
    ///
    /// An unknown `type` tag is reported as an unsupported query type
    /// rather than a format error.
    pub fn from_json(json: &str) -> Result<Statement> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        match value.get("type").and_then(|t| t.as_str()) {
            Some("SELECT" | "INSERT" | "UPDATE" | "DELETE" | "UNION") => {
                Ok(serde_json::from_value(value)?)
            }
            Some(other) => Err(Error::unsupported(other)),
            None => Err(Error::with_message(
                ErrorCode::Format,
                "statement is missing its \"type\" tag",
            )),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// One entry of a SELECT field list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldRef {
    /// `*` or an expression without alias
    Name(String),
    /// `expr AS alias`
    Aliased {
        field: String,
        alias: String,
        #[serde(rename = "isOrmAlias")]
        is_orm_alias: bool,
    },
}

impl FieldRef {
    pub fn aliased(field: impl Into<String>, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        FieldRef::Aliased {
            field: field.into(),
            is_orm_alias: is_orm_alias(&alias),
            alias,
        }
    }

    pub fn is_star(&self) -> bool {
        matches!(self, FieldRef::Name(name) if name == "*")
    }

    pub fn is_orm_alias(&self) -> bool {
        matches!(self, FieldRef::Aliased { is_orm_alias: true, .. })
    }
}

/// `Table__column`: letters or underscores, a double underscore, then
/// letters or underscores again.
pub fn is_orm_alias(alias: &str) -> bool {
    if alias.is_empty() || !alias.bytes().all(|b| b.is_ascii_alphabetic() || b == b'_') {
        return false;
    }
    let bytes = alias.as_bytes();
    (1..bytes.len().saturating_sub(2)).any(|i| bytes[i] == b'_' && bytes[i + 1] == b'_')
}

/// A JOIN clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinClause {
    #[serde(rename = "type")]
    pub kind: JoinType,
    pub table: String,
    pub alias: Option<String>,
    pub conditions: String,
}

impl JoinClause {
    /// Alias if present, else the table name
    pub fn reference(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }
}

/// A single ORDER BY term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTerm {
    pub field: String,
    pub direction: SortOrder,
}

/// Ordered field → direction mapping. Re-inserting a field replaces its
/// direction in place, so the last occurrence wins.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderBy(Vec<OrderTerm>);

impl OrderBy {
    pub fn new() -> Self {
        OrderBy(Vec::new())
    }

    pub fn insert(&mut self, field: impl Into<String>, direction: SortOrder) {
        let field = field.into();
        match self.0.iter_mut().find(|t| t.field == field) {
            Some(term) => term.direction = direction,
            None => self.0.push(OrderTerm { field, direction }),
        }
    }

    pub fn get(&self, field: &str) -> Option<SortOrder> {
        self.0.iter().find(|t| t.field == field).map(|t| t.direction)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OrderTerm> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// SELECT statement
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectStatement {
    pub distinct: bool,
    pub fields: Vec<FieldRef>,
    pub from: String,
    pub from_alias: Option<String>,
    pub joins: Vec<JoinClause>,
    #[serde(rename = "where")]
    pub where_clause: String,
    pub group_by: Vec<String>,
    pub having: String,
    pub order_by: OrderBy,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub has_orm_aliases: bool,
    #[serde(default)]
    pub features: QueryFeatures,
}

impl SelectStatement {
    /// Alias if present, else the FROM table
    pub fn from_reference(&self) -> &str {
        self.from_alias.as_deref().unwrap_or(&self.from)
    }

    /// Query text of a parenthesised FROM source
    pub fn derived_table(&self) -> Option<&str> {
        let inner = self.from.strip_prefix('(')?;
        Some(inner.strip_suffix(')').unwrap_or(inner).trim())
    }

    /// The FROM table; `None` without FROM or for a derived table
    pub fn from_table(&self) -> Option<&str> {
        if self.from.is_empty() || self.derived_table().is_some() {
            None
        } else {
            Some(&self.from)
        }
    }
}

/// INSERT statement; one inner vector per VALUES row
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InsertStatement {
    pub table: String,
    pub fields: Vec<String>,
    pub values: Vec<Vec<String>>,
}

impl InsertStatement {
    pub fn is_bulk(&self) -> bool {
        self.values.len() > 1
    }
}

/// One `field = value` of an UPDATE SET list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub field: String,
    pub value: String,
}

/// UPDATE statement
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UpdateStatement {
    pub table: String,
    #[serde(default)]
    pub alias: Option<String>,
    pub set: Vec<Assignment>,
    #[serde(rename = "where")]
    pub where_clause: String,
}

impl UpdateStatement {
    /// Add an assignment; a repeated field keeps its position and takes
    /// the new value.
    pub fn assign(&mut self, field: impl Into<String>, value: impl Into<String>) {
        let field = field.into();
        let value = value.into();
        match self.set.iter_mut().find(|a| a.field == field) {
            Some(existing) => existing.value = value,
            None => self.set.push(Assignment { field, value }),
        }
    }
}

/// DELETE statement
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeleteStatement {
    pub from: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(rename = "where")]
    pub where_clause: String,
}

/// Two or more SELECTs joined with UNION
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnionStatement {
    pub union_all: bool,
    pub queries: Vec<Statement>,
}
