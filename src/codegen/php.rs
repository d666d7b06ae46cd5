//! PHP literal rendering
//!
//! Values become PHP literals, condition trees become the nested arrays
//! that `Query::where()` and `Query::having()` take.

use std::collections::HashSet;

use crate::parser::condition::{Condition, ConditionTree, Value};
use crate::config::DEFAULT_INDENT;

/// Raw SQL fragment used as a value in entity data or `set()`
pub const EXPRESSION_CLASS: &str = "\\Cake\\Database\\Expression\\QueryExpression";

/// Single-quoted PHP string
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        if c == '\'' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

/// PHP literal for a classified value
pub fn value(v: &Value) -> String {
    match v {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => float(*f),
        Value::String(s) => quote(s),
        Value::Binary(bytes) => format!("hex2bin('{}')", hex::encode(bytes)),
        Value::List(items) => {
            let items: Vec<String> = items.iter().map(value).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Expression(e) => quote(e),
    }
}

fn float(f: f64) -> String {
    if f.is_nan() {
        return "NAN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "INF" } else { "-INF" }.to_string();
    }
    let text = f.to_string();
    if text.contains('.') || text.contains('e') {
        text
    } else {
        format!("{}.0", text)
    }
}

/// PHP value for a SQL value as written in VALUES or SET. Literals become
/// PHP literals; anything else is wrapped in a query expression so it
/// reaches the database as SQL.
pub fn sql_value(text: &str) -> String {
    match Value::parse(text) {
        Value::Expression(expr) => format!("new {}({})", EXPRESSION_CLASS, quote(&expr)),
        other => value(&other),
    }
}

/// Render `tree` as a PHP conditions array whose closing bracket sits at
/// column `indent`.
pub fn format_condition(tree: &ConditionTree, indent: usize) -> String {
    ConditionFormatter::new(DEFAULT_INDENT).format(tree, indent)
}

/// Conditions array renderer with a configurable indent unit
#[derive(Debug, Clone, Copy)]
pub struct ConditionFormatter {
    unit: usize,
}

impl ConditionFormatter {
    pub fn new(unit: usize) -> Self {
        ConditionFormatter { unit }
    }

    pub fn format(&self, tree: &ConditionTree, indent: usize) -> String {
        if tree.is_empty() {
            return "[]".to_string();
        }
        if tree.len() == 1 {
            if let Some(entry) = tree.iter().next().and_then(inline_entry) {
                return format!("[{}]", entry);
            }
        }

        let mut out = String::from("[\n");
        let mut groups = HashSet::new();
        for condition in tree.iter() {
            let repeated = match condition {
                Condition::Or(_) | Condition::Not(_) => !groups.insert(condition.key()),
                _ => false,
            };
            if repeated {
                // A second 'OR' key would replace the first one in PHP
                let pad = " ".repeat(indent + self.unit);
                out.push_str(&format!("{}[\n", pad));
                self.write_entry(&mut out, condition, indent + 2 * self.unit);
                out.push_str(&format!("{}],\n", pad));
            } else {
                self.write_entry(&mut out, condition, indent + self.unit);
            }
        }
        out.push_str(&" ".repeat(indent));
        out.push(']');
        out
    }

    fn write_entry(&self, out: &mut String, condition: &Condition, indent: usize) {
        let pad = " ".repeat(indent);
        match condition {
            Condition::Or(branches) => {
                out.push_str(&format!("{}'OR' => [\n", pad));
                for branch in branches {
                    let nested = self.format(branch, indent + self.unit);
                    out.push_str(&format!("{}{}{},\n", pad, " ".repeat(self.unit), nested));
                }
                out.push_str(&format!("{}],\n", pad));
            }
            Condition::Not(inner) => {
                out.push_str(&format!("{}'NOT' => {},\n", pad, self.format(inner, indent)));
            }
            Condition::Raw(text) => {
                out.push_str(&format!("{}// TODO: Could not auto-convert, review this condition:\n", pad));
                for line in text.lines() {
                    out.push_str(&format!("{}//   {}\n", pad, line.trim_end()));
                }
                out.push_str(&format!("{}{},\n", pad, quote(&single_line(text))));
            }
            _ => {
                if let Some(entry) = inline_entry(condition) {
                    out.push_str(&format!("{}{},\n", pad, entry));
                }
            }
        }
    }
}

/// One-line rendering of a leaf. Leaves whose value is a column or a
/// function call are emitted as raw SQL strings under a numeric key,
/// since a keyed value would be bound as a string parameter.
fn inline_entry(condition: &Condition) -> Option<String> {
    match condition {
        Condition::Compare { value: v, .. } if v.contains_expression() => {
            Some(quote(&condition.to_sql()))
        }
        Condition::Compare { value: v, .. } => {
            Some(format!("{} => {}", quote(&condition.key()), value(v)))
        }
        Condition::Exists { .. } => Some(quote(&single_line(&condition.to_sql()))),
        _ => None,
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::condition::parse_condition;

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("it's"), r"'it\'s'");
        assert_eq!(quote(r"C:\dir"), r"'C:\\dir'");
    }

    #[test]
    fn test_values() {
        assert_eq!(value(&Value::Null), "null");
        assert_eq!(value(&Value::Bool(true)), "true");
        assert_eq!(value(&Value::Int(-3)), "-3");
        assert_eq!(value(&Value::Float(1.5)), "1.5");
        assert_eq!(value(&Value::Float(1000.0)), "1000.0");
        assert_eq!(value(&Value::Binary(vec![0x48, 0x69])), "hex2bin('4869')");
        assert_eq!(
            value(&Value::List(vec![Value::Int(1), Value::String("a".into())])),
            "[1, 'a']"
        );
    }

    #[test]
    fn test_sql_value() {
        assert_eq!(sql_value("'Bob'"), "'Bob'");
        assert_eq!(sql_value("42"), "42");
        assert_eq!(sql_value("NULL"), "null");
        assert_eq!(
            sql_value("visits + 1"),
            "new \\Cake\\Database\\Expression\\QueryExpression('visits + 1')"
        );
    }

    #[test]
    fn test_single_leaf_inline() {
        assert_eq!(format_condition(&parse_condition("id = 5"), 0), "['id' => 5]");
        assert_eq!(format_condition(&parse_condition(""), 4), "[]");
    }

    #[test]
    fn test_multiple_leaves() {
        let tree = parse_condition("active = 1 AND role = 'admin' AND age >= 18");
        assert_eq!(
            format_condition(&tree, 4),
            "[\n        'active' => 1,\n        'role' => 'admin',\n        'age >=' => 18,\n    ]"
        );
    }

    #[test]
    fn test_or_branches() {
        let tree = parse_condition("status = 'active' OR status = 'pending'");
        assert_eq!(
            format_condition(&tree, 0),
            "[\n    'OR' => [\n        ['status' => 'active'],\n        ['status' => 'pending'],\n    ],\n]"
        );
    }

    #[test]
    fn test_or_with_conjunction_branch() {
        let tree = parse_condition("a = 1 AND b = 2 OR c = 3");
        let php = format_condition(&tree, 0);
        assert_eq!(
            php,
            "[\n    'OR' => [\n        [\n            'a' => 1,\n            'b' => 2,\n        ],\n        ['c' => 3],\n    ],\n]"
        );
    }

    #[test]
    fn test_second_or_group_gets_numeric_key() {
        let tree = parse_condition("(a = 1 OR b = 2) AND (c = 3 OR d = 4)");
        assert_eq!(
            format_condition(&tree, 0),
            "[\n    'OR' => [\n        ['a' => 1],\n        ['b' => 2],\n    ],\n    [\n        'OR' => [\n            ['c' => 3],\n            ['d' => 4],\n        ],\n    ],\n]"
        );
    }

    #[test]
    fn test_every_raw_fragment_gets_todo() {
        let tree = parse_condition("MATCH(title) AGAINST('x') AND foo(y) AND z = 1");
        let php = format_condition(&tree, 0);
        assert_eq!(php.matches("// TODO: Could not auto-convert").count(), 2);
        assert!(php.contains("//   MATCH(title) AGAINST('x')"));
        assert!(php.contains("//   foo(y)"));
        assert!(php.contains("    'z' => 1,\n"));
    }

    #[test]
    fn test_list_values() {
        let tree = parse_condition("id IN (1, 2, 3) AND created BETWEEN '2023-01-01' AND '2023-12-31'");
        let php = format_condition(&tree, 0);
        assert!(php.contains("'id IN' => [1, 2, 3],"));
        assert!(php.contains("'created BETWEEN' => ['2023-01-01', '2023-12-31'],"));
    }

    #[test]
    fn test_expression_values_are_raw_sql() {
        let tree = parse_condition("p.user_id = u.id AND created < NOW()");
        let php = format_condition(&tree, 0);
        assert!(php.contains("    'p.user_id = u.id',\n"));
        assert!(php.contains("    'created < NOW()',\n"));
    }

    #[test]
    fn test_not_and_exists() {
        let tree = parse_condition("NOT (a = 1 OR b = 2) AND NOT EXISTS (SELECT 1 FROM bans)");
        let php = format_condition(&tree, 0);
        assert!(php.contains("    'NOT' => [\n        'OR' => ["));
        assert!(php.contains("    'NOT EXISTS (SELECT 1 FROM bans)',\n"));
    }

    #[test]
    fn test_raw_emits_todo() {
        let tree = parse_condition("MATCH(title) AGAINST('rust')");
        let php = format_condition(&tree, 0);
        assert!(php.contains("// TODO: Could not auto-convert"));
        assert!(php.contains("//   MATCH(title) AGAINST('rust')"));
        assert!(php.contains(r"'MATCH(title) AGAINST(\'rust\')',"));
    }
}
