//! CakePHP query builder code generation
//!
//! Each statement kind has a fixed template. Clauses absent from the
//! statement are left out entirely. Conditions are parsed here, at
//! generation time, so the statement model stays close to the SQL text.

use crate::codegen::inflector::{camelize, collection_variable, entity_variable, table_variable};
use crate::codegen::php::{quote, sql_value, ConditionFormatter};
use crate::config::GeneratorConfig;
use crate::error::{Error, ErrorCode, Result};
use crate::parser::ast::*;
use crate::parser::condition::{Condition, ConditionParser, ConditionTree, Operator, Value};
use crate::parser::scanner::strip_qualifier;
use crate::parser::statement::parse_statement;

const CONNECTION_QUERY: &str = "ConnectionManager::get('default')->selectQuery()";

// ============================================================================
// Code Writer
// ============================================================================

/// Line-oriented output buffer
struct CodeWriter {
    out: String,
    unit: usize,
}

impl CodeWriter {
    fn new(unit: usize) -> Self {
        CodeWriter {
            out: String::new(),
            unit,
        }
    }

    fn pad(&self, level: usize) -> usize {
        level * self.unit
    }

    fn line(&mut self, level: usize, text: &str) {
        self.out.push_str(&" ".repeat(self.pad(level)));
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn comment(&mut self, level: usize, text: &str) {
        self.line(level, &format!("// {}", text));
    }

    fn blank(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    /// `head` on its own line, then one call per line, `;` after the last
    fn chain(&mut self, head: &str, calls: &[String]) {
        match calls.split_last() {
            None => self.line(0, &format!("{};", head)),
            Some((last, rest)) => {
                self.line(0, head);
                for call in rest {
                    self.line(1, call);
                }
                self.line(1, &format!("{};", last));
            }
        }
    }

    fn finish(self) -> String {
        let mut out = self.out.trim_end().to_string();
        out.push('\n');
        out
    }
}

/// `[` entries `]`, one per line, closing bracket at column `indent`
fn php_array(entries: &[String], indent: usize, unit: usize) -> String {
    if entries.is_empty() {
        return "[]".to_string();
    }
    let mut out = String::from("[\n");
    for entry in entries {
        out.push_str(&" ".repeat(indent + unit));
        out.push_str(entry);
        out.push_str(",\n");
    }
    out.push_str(&" ".repeat(indent));
    out.push(']');
    out
}

/// Column name without its table qualifier
fn unqualified(field: &str) -> &str {
    field.rsplit('.').next().unwrap_or(field)
}

/// `q.col` with both halves plain identifiers
fn qualified_column(text: &str) -> Option<(&str, &str)> {
    let (qualifier, column) = text.split_once('.')?;
    let plain = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_');
    if plain(qualifier) && plain(column) {
        Some((qualifier, column))
    } else {
        None
    }
}

// ============================================================================
// Generator
// ============================================================================

/// Renders parsed statements as CakePHP 5 ORM code
#[derive(Debug, Clone, Default)]
pub struct QueryBuilderGenerator {
    config: GeneratorConfig,
    conditions: ConditionParser,
}

impl QueryBuilderGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: GeneratorConfig) -> Self {
        QueryBuilderGenerator {
            config,
            conditions: ConditionParser::new(),
        }
    }

    pub fn with_condition_parser(mut self, parser: ConditionParser) -> Self {
        self.conditions = parser;
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate PHP for `stmt`
    pub fn generate(&self, stmt: &Statement) -> Result<String> {
        let span = tracing::debug_span!("generate", kind = %stmt.kind());
        let _enter = span.enter();

        let mut w = CodeWriter::new(self.config.indent);
        match stmt {
            Statement::Select(select) => {
                self.write_select(&mut w, select, "$query");
                self.write_usage(&mut w, select.from_table());
            }
            Statement::Union(union) => self.write_union(&mut w, union)?,
            Statement::Insert(insert) => self.write_insert(&mut w, insert),
            Statement::Update(update) => self.write_update(&mut w, update),
            Statement::Delete(delete) => self.write_delete(&mut w, delete),
        }

        let code = w.finish();
        tracing::debug!(bytes = code.len(), "generated code");
        Ok(code)
    }

    fn formatter(&self) -> ConditionFormatter {
        ConditionFormatter::new(self.config.indent)
    }

    fn parse_conditions(&self, text: &str) -> ConditionTree {
        self.conditions.parse(text)
    }

    /// `->where([...])` / `->having([...])` when the clause has content
    fn condition_call(&self, method: &str, text: &str) -> Option<String> {
        let tree = self.parse_conditions(text);
        if tree.is_empty() {
            return None;
        }
        if tree.has_raw() {
            tracing::warn!(clause = method, text, "condition kept as raw SQL");
        }
        Some(format!(
            "->{}({})",
            method,
            self.formatter().format(&tree, self.config.indent)
        ))
    }

    // ========================================================================
    // SELECT
    // ========================================================================

    fn write_select(&self, w: &mut CodeWriter, s: &SelectStatement, var: &str) {
        if self.config.advisories {
            self.select_advisories(w, s);
        }

        let mut calls = Vec::new();
        let head = match (s.derived_table(), s.from_table()) {
            (Some(inner), _) => {
                let source = var.replacen("$query", "$subquery", 1);
                self.write_derived_table(w, inner, &source);
                let alias = s.from_alias.as_deref().unwrap_or("subquery");
                calls.push(format!("->from([{} => {}])", quote(alias), source));
                CONNECTION_QUERY.to_string()
            }
            (None, Some(table)) => {
                format!("{}->find()", self.config.locator.call(&camelize(table)))
            }
            (None, None) => CONNECTION_QUERY.to_string(),
        };
        if !s.fields.is_empty() && !s.fields.iter().all(FieldRef::is_star) {
            let fields: Vec<String> = s
                .fields
                .iter()
                .map(|f| match f {
                    FieldRef::Name(name) => quote(name),
                    FieldRef::Aliased { field, alias, .. } => {
                        format!("{} => {}", quote(alias), quote(field))
                    }
                })
                .collect();
            calls.push(format!("->select([{}])", fields.join(", ")));
        }
        if s.distinct {
            calls.push("->distinct()".to_string());
        }
        for join in &s.joins {
            calls.push(self.join_call(join));
        }
        calls.extend(self.condition_call("where", &s.where_clause));
        if !s.group_by.is_empty() {
            let fields: Vec<String> = s.group_by.iter().map(|g| quote(g)).collect();
            calls.push(format!("->groupBy([{}])", fields.join(", ")));
        }
        calls.extend(self.condition_call("having", &s.having));
        if !s.order_by.is_empty() {
            let terms: Vec<String> = s
                .order_by
                .iter()
                .map(|t| format!("{} => {}", quote(&t.field), quote(t.direction.as_str())))
                .collect();
            calls.push(format!("->orderBy([{}])", terms.join(", ")));
        }
        if let Some(limit) = s.limit {
            calls.push(format!("->limit({})", limit));
        }
        if let Some(offset) = s.offset {
            calls.push(format!("->offset({})", offset));
        }

        w.chain(&format!("{} = {}", var, head), &calls);
    }

    /// Build the query behind `FROM (SELECT ...)` as `var`
    fn write_derived_table(&self, w: &mut CodeWriter, sql: &str, var: &str) {
        match parse_statement(sql) {
            Ok(Statement::Select(inner)) => self.write_select(w, &inner, var),
            _ => {
                tracing::warn!(sql, "derived table is not a plain SELECT");
                w.comment(0, &format!("TODO: build this derived table as {}:", var));
                for line in sql.lines() {
                    w.comment(0, &format!("  {}", line.trim_end()));
                }
            }
        }
        w.blank();
    }

    fn join_call(&self, join: &JoinClause) -> String {
        let reference = quote(join.reference());
        let table = quote(&join.table);
        let conditions = if join.conditions.is_empty() {
            None
        } else {
            Some(quote(&join.conditions))
        };

        let method = match join.kind {
            JoinType::Inner => "innerJoin",
            JoinType::Left => "leftJoin",
            JoinType::Right => "rightJoin",
            JoinType::Full => {
                let mut spec = format!("'table' => {}, 'type' => 'FULL'", table);
                if let Some(conditions) = conditions {
                    spec.push_str(&format!(", 'conditions' => {}", conditions));
                }
                return format!("->join([{} => [{}]])", reference, spec);
            }
        };
        match conditions {
            Some(conditions) => format!("->{}([{} => {}], [{}])", method, reference, table, conditions),
            None => format!("->{}([{} => {}])", method, reference, table),
        }
    }

    fn select_advisories(&self, w: &mut CodeWriter, s: &SelectStatement) {
        if s.from.is_empty() {
            w.comment(0, "Note: no FROM clause, so the query runs on the connection rather than a table.");
        }
        if s.derived_table().is_some() {
            w.comment(
                0,
                "Note: the FROM subquery is built as its own query and passed to ->from(); rows come back as arrays, not entities.",
            );
        }
        if let (Some(table), Some(alias)) = (s.from_table(), s.from_alias.as_deref()) {
            let class = camelize(table);
            if alias != class {
                w.comment(
                    0,
                    &format!(
                        "Note: the ORM aliases {} as '{}'; rewrite '{}.' prefixes in the code below to '{}.'.",
                        table, class, alias, class
                    ),
                );
            }
        }
        for join in &s.joins {
            if let Some(hint) = self.association_hint(s, join) {
                w.comment(0, &hint);
            }
        }
        if s.has_orm_aliases {
            w.comment(
                0,
                "Note: Table__column aliases are what the ORM generates itself; with associations and ->contain() they are not needed.",
            );
        }
        if s.features.contains(QueryFeatures::SUBQUERY) {
            w.comment(
                0,
                "Note: subqueries are kept as SQL text. Build them as separate queries and pass them in, e.g. ->where(['id IN' => $subquery]).",
            );
        }
        if s.features.contains(QueryFeatures::WINDOW_FUNCTION) {
            w.comment(
                0,
                "Note: window functions are kept as SQL text; $query->func() with ->over() can build them.",
            );
        }
        if s.features.contains(QueryFeatures::IMPLICIT_JOIN) {
            w.comment(
                0,
                "Note: only the first comma-separated FROM table is used; rewrite the others as explicit joins.",
            );
        }
    }

    /// Suggest an association for joins of the form `a.x_id = b.id`
    fn association_hint(&self, s: &SelectStatement, join: &JoinClause) -> Option<String> {
        let tree = self.parse_conditions(&join.conditions);
        if tree.len() != 1 {
            return None;
        }
        let (field, rhs) = match tree.iter().next()? {
            Condition::Compare {
                field,
                op: Operator::Eq,
                value: Value::Expression(rhs),
            } => (field.as_str(), rhs.as_str()),
            _ => return None,
        };

        let (lq, lc) = qualified_column(field)?;
        let (rq, rc) = qualified_column(rhs)?;
        let (child, parent) = if lc.ends_with("_id") && rc == "id" {
            (lq, rq)
        } else if rc.ends_with("_id") && lc == "id" {
            (rq, lq)
        } else {
            return None;
        };

        let table_of = |qualifier: &str| -> String {
            if qualifier == s.from_reference() {
                if let Some(table) = s.from_table() {
                    return camelize(table);
                }
            }
            s.joins
                .iter()
                .find(|j| j.reference() == qualifier)
                .map(|j| camelize(&j.table))
                .unwrap_or_else(|| camelize(qualifier))
        };

        let (owner, kind, target) = if join.reference() == child {
            (table_of(parent), "hasMany", table_of(child))
        } else {
            (table_of(child), "belongsTo", table_of(parent))
        };
        Some(format!(
            "Tip: {} looks like an association ({} {} {}). Define it in {}Table::initialize() and use ->contain(['{}']) instead of the join.",
            join.conditions, owner, kind, target, owner, target
        ))
    }

    /// `table` is `None` when the query is not built from a table class
    fn write_usage(&self, w: &mut CodeWriter, table: Option<&str>) {
        if !self.config.usage_examples {
            return;
        }
        w.blank();
        let from = match table {
            Some(from) => from,
            None => {
                w.comment(0, "Fetch the results:");
                w.comment(0, "$rows = $query->execute()->fetchAll('assoc');");
                return;
            }
        };
        w.comment(0, "Fetch the results:");
        w.comment(0, &format!("{} = $query->all();", collection_variable(from)));
        w.comment(0, &format!("{} = $query->first();", entity_variable(from)));
        w.comment(0, "$count = $query->count();");
    }

    // ========================================================================
    // UNION
    // ========================================================================

    fn write_union(&self, w: &mut CodeWriter, union: &UnionStatement) -> Result<()> {
        if union.queries.is_empty() {
            return Err(Error::with_message(
                ErrorCode::UnsupportedQueryType,
                "unsupported query type: UNION without member queries",
            ));
        }

        for (i, query) in union.queries.iter().enumerate() {
            match query {
                Statement::Select(select) => {
                    self.write_select(w, select, &format!("$query{}", i + 1));
                    w.blank();
                }
                other => {
                    return Err(Error::unsupported(format!("{} inside UNION", other.kind())));
                }
            }
        }

        let method = if union.union_all { "unionAll" } else { "union" };
        let chained: String = (2..=union.queries.len())
            .map(|i| format!("->{}($query{})", method, i))
            .collect();
        w.line(0, &format!("$query = $query1{};", chained));

        let table = match &union.queries[0] {
            Statement::Select(select) => select.from_table(),
            _ => None,
        };
        self.write_usage(w, table);
        Ok(())
    }

    // ========================================================================
    // INSERT
    // ========================================================================

    fn write_insert(&self, w: &mut CodeWriter, insert: &InsertStatement) {
        let table_var = table_variable(&insert.table);
        w.line(
            0,
            &format!("{} = {};", table_var, self.config.locator.call(&camelize(&insert.table))),
        );

        if insert.values.is_empty() {
            w.comment(
                0,
                "TODO: INSERT without VALUES (e.g. INSERT ... SELECT) has no entity equivalent; use $connection->insertQuery() with ->values($selectQuery).",
            );
            return;
        }
        if insert.fields.is_empty() {
            w.comment(0, "TODO: the INSERT has no column list; replace the numeric keys with field names.");
        }

        let unit = self.config.indent;
        if insert.is_bulk() {
            let rows: Vec<String> = insert
                .values
                .iter()
                .map(|row| php_array(&self.entity_data(&insert.fields, row), unit, unit))
                .collect();
            let entities = collection_variable(&insert.table);
            w.line(
                0,
                &format!(
                    "{} = {}->newEntities({});",
                    entities,
                    table_var,
                    php_array(&rows, 0, unit)
                ),
            );
            w.line(0, &format!("{}->saveMany({});", table_var, entities));
        } else {
            let entity = entity_variable(&insert.table);
            let data = self.entity_data(&insert.fields, &insert.values[0]);
            w.line(
                0,
                &format!("{} = {}->newEntity({});", entity, table_var, php_array(&data, 0, unit)),
            );
            w.line(0, &format!("{}->save({});", table_var, entity));
        }
    }

    /// `'field' => value` pairs for one VALUES row
    fn entity_data(&self, fields: &[String], row: &[String]) -> Vec<String> {
        if !fields.is_empty() && fields.len() != row.len() {
            tracing::warn!(
                columns = fields.len(),
                values = row.len(),
                "VALUES row does not match the column list"
            );
        }
        row.iter()
            .enumerate()
            .map(|(i, v)| match fields.get(i) {
                Some(field) => format!("{} => {}", quote(unqualified(field)), sql_value(v)),
                None => format!("{} => {}", i, sql_value(v)),
            })
            .collect()
    }

    // ========================================================================
    // UPDATE / DELETE
    // ========================================================================

    /// Load the single entity a WHERE clause points at: `get()` for a
    /// primary key match, else `find()->where()->firstOrFail()`.
    fn write_entity_lookup(&self, w: &mut CodeWriter, table_var: &str, entity: &str, where_clause: &str) {
        let tree = self.parse_conditions(where_clause);
        if let Some(key) = primary_key_value(&tree) {
            w.line(0, &format!("{} = {}->get({});", entity, table_var, key));
            return;
        }
        if tree.is_empty() {
            w.comment(0, "No WHERE clause: every row matches, pick the one to change.");
        }
        let mut calls: Vec<String> = self.condition_call("where", where_clause).into_iter().collect();
        calls.push("->firstOrFail()".to_string());
        w.chain(&format!("{} = {}->find()", entity, table_var), &calls);
    }

    /// Table aliases mean nothing to `updateQuery()` / `deleteQuery()`, so
    /// column references lose the alias qualifier.
    fn unaliased(&self, w: &mut CodeWriter, table: &str, alias: Option<&str>, text: &str) -> String {
        match alias {
            Some(alias) if alias != table => {
                if self.config.advisories && text.contains('.') {
                    w.comment(
                        0,
                        &format!("Note: the alias {} is dropped; its columns are referenced unqualified.", alias),
                    );
                }
                strip_qualifier(text, alias)
            }
            _ => text.to_string(),
        }
    }

    fn write_update(&self, w: &mut CodeWriter, update: &UpdateStatement) {
        let table_var = table_variable(&update.table);
        let entity = entity_variable(&update.table);
        let unit = self.config.indent;
        let alias = update.alias.as_deref();
        let data: Vec<String> = update
            .set
            .iter()
            .map(|a| {
                let value = match alias {
                    Some(alias) => strip_qualifier(&a.value, alias),
                    None => a.value.clone(),
                };
                format!("{} => {}", quote(unqualified(&a.field)), sql_value(&value))
            })
            .collect();

        let where_clause = self.unaliased(w, &update.table, alias, &update.where_clause);
        w.line(
            0,
            &format!("{} = {};", table_var, self.config.locator.call(&camelize(&update.table))),
        );
        w.blank();

        w.comment(0, "Option 1: load the entity, patch it and save it (runs validation and callbacks)");
        self.write_entity_lookup(w, table_var.as_str(), &entity, &where_clause);
        w.line(
            0,
            &format!(
                "{} = {}->patchEntity({}, {});",
                entity,
                table_var,
                entity,
                php_array(&data, 0, unit)
            ),
        );
        w.line(0, &format!("{}->save({});", table_var, entity));
        w.blank();

        w.comment(0, "Option 2: update every matching row in one query (no entity callbacks)");
        let mut calls = vec![format!("->set({})", php_array(&data, unit, unit))];
        calls.extend(self.condition_call("where", &where_clause));
        calls.push("->execute()".to_string());
        w.chain(&format!("{}->updateQuery()", table_var), &calls);
    }

    fn write_delete(&self, w: &mut CodeWriter, delete: &DeleteStatement) {
        let table_var = table_variable(&delete.from);
        let entity = entity_variable(&delete.from);
        let where_clause = self.unaliased(w, &delete.from, delete.alias.as_deref(), &delete.where_clause);

        w.line(
            0,
            &format!("{} = {};", table_var, self.config.locator.call(&camelize(&delete.from))),
        );
        w.blank();

        w.comment(0, "Option 1: load the entity and delete it (runs callbacks and dependent deletes)");
        self.write_entity_lookup(w, table_var.as_str(), &entity, &where_clause);
        w.line(0, &format!("{}->delete({});", table_var, entity));
        w.blank();

        w.comment(0, "Option 2: delete every matching row in one query (no entity callbacks)");
        let mut calls: Vec<String> = self
            .condition_call("where", &where_clause)
            .into_iter()
            .collect();
        calls.push("->execute()".to_string());
        w.chain(&format!("{}->deleteQuery()", table_var), &calls);
    }
}

/// PHP literal of the key when the tree is exactly `id = <literal>`
fn primary_key_value(tree: &ConditionTree) -> Option<String> {
    if tree.len() != 1 {
        return None;
    }
    match tree.iter().next()? {
        Condition::Compare {
            field,
            op: Operator::Eq,
            value: v @ (Value::Int(_) | Value::String(_)),
        } if unqualified(field) == "id" => Some(crate::codegen::php::value(v)),
        _ => None,
    }
}

/// Generate code with the default configuration
pub fn generate_code(stmt: &Statement) -> Result<String> {
    QueryBuilderGenerator::new().generate(stmt)
}

// ============================================================================
// Tests
// ============================================================================
