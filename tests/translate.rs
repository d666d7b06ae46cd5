//! End-to-end translation tests

use sqlcake::parser::ast::{FieldRef, JoinType, SortOrder, Statement};
use sqlcake::parser::condition::{Condition, Operator, Value};
use sqlcake::{
    format_condition, generate_code, parse_condition, parse_statement, ErrorCode, Translator,
};

fn select(sql: &str) -> sqlcake::parser::ast::SelectStatement {
    match parse_statement(sql).unwrap() {
        Statement::Select(s) => s,
        other => panic!("expected SELECT for {:?}, got {:?}", sql, other),
    }
}

#[test]
fn test_select_star_where_shape() {
    for (sql, table, cond) in [
        ("SELECT * FROM t WHERE c", "t", "c"),
        ("select * from orders where total > 100", "orders", "total > 100"),
        ("SELECT * FROM `items` WHERE (a = 1 OR b = 2);", "items", "(a = 1 OR b = 2)"),
    ] {
        let s = select(sql);
        assert_eq!(s.fields, vec![FieldRef::Name("*".into())]);
        assert_eq!(s.from, table);
        assert_eq!(s.where_clause, cond);
        assert!(!s.distinct);
        assert!(s.joins.is_empty() && s.group_by.is_empty() && s.order_by.is_empty());
        assert!(s.having.is_empty());
        assert_eq!((s.limit, s.offset), (None, None));
    }
}

#[test]
fn test_condition_examples() {
    let tree = parse_condition("id = 5");
    assert_eq!(tree.value("id"), Some(&Value::Int(5)));
    assert_eq!(tree.len(), 1);

    let tree = parse_condition("active = 1 AND role = 'admin'");
    assert_eq!(tree.value("active"), Some(&Value::Int(1)));
    assert_eq!(tree.value("role"), Some(&Value::String("admin".into())));

    let tree = parse_condition("status = 'active' OR status = 'pending'");
    match tree.get("OR") {
        Some(Condition::Or(branches)) => {
            assert_eq!(branches.len(), 2);
            assert_eq!(branches[0].value("status"), Some(&Value::String("active".into())));
            assert_eq!(branches[1].value("status"), Some(&Value::String("pending".into())));
        }
        other => panic!("expected OR, got {:?}", other),
    }

    assert_eq!(parse_condition("age > 18").value("age >"), Some(&Value::Int(18)));
    assert_eq!(
        parse_condition("status <> 'banned'").value("status !="),
        Some(&Value::String("banned".into()))
    );
    assert_eq!(
        parse_condition("status IN (1,2,3)").value("status IN"),
        Some(&Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]))
    );
    assert!(parse_condition("status NOT IN (1)").get("status NOT IN").is_some());
    assert!(parse_condition("name LIKE 'a%'").get("name LIKE").is_some());
    assert!(parse_condition("name NOT LIKE 'a%'").get("name NOT LIKE").is_some());
    assert_eq!(parse_condition("deleted IS NULL").value("deleted IS"), Some(&Value::Null));
    assert_eq!(parse_condition("deleted IS NOT NULL").value("deleted IS NOT"), Some(&Value::Null));
}

#[test]
fn test_between_and_is_not_a_conjunction() {
    let tree = parse_condition("created BETWEEN '2023-01-01' AND '2023-12-31'");
    assert_eq!(tree.len(), 1);
    match tree.get("created BETWEEN") {
        Some(Condition::Compare {
            op: Operator::Between,
            value: Value::List(bounds),
            ..
        }) => assert_eq!(bounds.len(), 2),
        other => panic!("expected BETWEEN leaf, got {:?}", other),
    }
}

#[test]
fn test_statement_examples() {
    assert!(select("SELECT DISTINCT user_id FROM posts").distinct);

    let s = select("SELECT u.id FROM users u LEFT JOIN posts p ON p.user_id = u.id");
    assert_eq!(s.joins.len(), 1);
    assert_eq!(s.joins[0].kind, JoinType::Left);
    assert_eq!(s.joins[0].alias.as_deref(), Some("p"));

    let s = select("SELECT * FROM users LIMIT 10 OFFSET 20");
    assert_eq!((s.limit, s.offset), (Some(10), Some(20)));

    match parse_statement("INSERT INTO users (username,email) VALUES ('john','j@x.com')").unwrap() {
        Statement::Insert(i) => {
            assert_eq!(i.fields, vec!["username", "email"]);
            assert_eq!(i.values.len(), 1);
        }
        other => panic!("expected INSERT, got {:?}", other),
    }

    let s = select("SELECT a.id AS Authors__id, a.name AS username FROM authors a");
    assert!(s.fields[0].is_orm_alias());
    assert!(!s.fields[1].is_orm_alias());
    assert!(s.has_orm_aliases);
}

#[test]
fn test_unsupported_statement_and_garbage_conditions() {
    let err = parse_statement("TRUNCATE users").unwrap_err();
    assert_eq!(err.code, ErrorCode::UnsupportedQueryType);

    let err = Statement::from_json(r#"{"type": "REPLACE", "table": "x"}"#).unwrap_err();
    assert_eq!(err.code, ErrorCode::UnsupportedQueryType);

    for garbage in ["%%%", "a =", "((", "AND OR", "x BETWEEN", "NOT", "'unterminated"] {
        let tree = parse_condition(garbage);
        assert!(!tree.is_empty(), "{:?} produced an empty tree", garbage);
        assert!(tree.has_raw(), "{:?} should fall back to raw", garbage);
    }
}

#[test]
fn test_format_condition_reparses_to_same_tree() {
    for text in ["id = 5", "age >= 21 AND name LIKE 'J%'", "a = 1 OR b IS NULL"] {
        let tree = parse_condition(text);
        assert_eq!(parse_condition(&tree.to_sql()), tree);
        let php = format_condition(&tree, 0);
        assert!(php.starts_with('[') && php.ends_with(']'), "{}", php);
    }
}

#[test]
fn test_order_by_keeps_last_direction() {
    let s = select("SELECT * FROM t ORDER BY a, b DESC, a DESC");
    let fields: Vec<&str> = s.order_by.iter().map(|t| t.field.as_str()).collect();
    assert_eq!(fields, vec!["a", "b"]);
    assert_eq!(s.order_by.get("a"), Some(SortOrder::Desc));
}

#[test]
fn test_full_select_translation() {
    let php = Translator::new()
        .translate(
            "SELECT p.id, p.title, COUNT(c.id) AS comments \
             FROM blog_posts p \
             LEFT JOIN comments c ON c.blog_post_id = p.id \
             WHERE p.published = 1 AND p.created > '2024-01-01' \
             GROUP BY p.id, p.title \
             HAVING COUNT(c.id) >= 3 \
             ORDER BY comments DESC \
             LIMIT 5",
        )
        .unwrap();

    let expected_lines = [
        "$query = $this->fetchTable('BlogPosts')->find()",
        "    ->select(['p.id', 'p.title', 'comments' => 'COUNT(c.id)'])",
        "    ->leftJoin(['c' => 'comments'], ['c.blog_post_id = p.id'])",
        "    ->where([",
        "        'p.published' => 1,",
        "        'p.created >' => '2024-01-01',",
        "    ])",
        "    ->groupBy(['p.id', 'p.title'])",
        "    ->having(['COUNT(c.id) >=' => 3])",
        "    ->orderBy(['comments' => 'DESC'])",
        "    ->limit(5);",
    ];
    let body = expected_lines.join("\n");
    assert!(php.contains(&body), "generated:\n{}", php);
    assert!(php.contains("(BlogPosts hasMany Comments)"));
    assert!(php.contains("// $blogPosts = $query->all();"));
}

#[test]
fn test_json_round_trip_generates_same_code() {
    let sql = "UPDATE users SET name = 'Ann' WHERE id = 2";
    let stmt = parse_statement(sql).unwrap();
    let json = stmt.to_json().unwrap();
    assert!(json.contains("\"type\": \"UPDATE\""));
    let back = Statement::from_json(&json).unwrap();
    assert_eq!(back, stmt);
    assert_eq!(generate_code(&back).unwrap(), generate_code(&stmt).unwrap());
}

#[test]
fn test_cte_is_rejected_with_hint() {
    let err = Translator::new()
        .translate("WITH recent AS (SELECT * FROM posts) SELECT * FROM recent")
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::UnsupportedQueryType);
    assert!(err.to_string().contains("common table expressions"));
}

#[test]
fn test_delete_keeps_every_or_group() {
    let php = Translator::new()
        .translate("DELETE FROM t WHERE (a = 1 OR b = 2) AND (c = 3 OR d = 4)")
        .unwrap();
    let expected = [
        "$tTable->deleteQuery()",
        "    ->where([",
        "        'OR' => [",
        "            ['a' => 1],",
        "            ['b' => 2],",
        "        ],",
        "        [",
        "            'OR' => [",
        "                ['c' => 3],",
        "                ['d' => 4],",
        "            ],",
        "        ],",
        "    ])",
        "    ->execute();",
    ]
    .join("\n");
    assert!(php.contains(&expected), "generated:\n{}", php);
}

#[test]
fn test_leading_dot_decimal_is_bound() {
    let php = Translator::new()
        .translate("SELECT * FROM products WHERE price = .5")
        .unwrap();
    assert!(php.contains("->where(['price' => 0.5])"), "generated:\n{}", php);
}
