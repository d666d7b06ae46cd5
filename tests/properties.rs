//! Property tests for the scanners and parsers

use proptest::prelude::*;
use sqlcake::parser::scanner::split_top_level_commas;
use sqlcake::{generate_code, parse_condition, parse_statement};

/// List items that each contain something a naive comma split would break
fn list_item() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z_][a-z0-9_]{0,8}",
        "'[a-z ,()]{0,8}'",
        "`[a-z ,]{0,8}`",
        "[a-z]{1,6}\\([a-z0-9, ]{0,10}\\)",
        "[0-9]{1,5}",
    ]
}

proptest! {
    #[test]
    fn prop_condition_parsing_is_total(text in ".{0,120}") {
        let tree = parse_condition(&text);
        if !text.trim().is_empty() {
            prop_assert!(!tree.is_empty(), "non-blank input {:?} gave an empty tree", text);
        }
    }

    #[test]
    fn prop_condition_parsing_is_total_on_sql_like_text(
        text in "[a-z0-9 ()'=<>!,.%*]{0,20}( (AND|OR|NOT|IN|LIKE|BETWEEN|IS|NULL|EXISTS) [a-z0-9 ()'=<>!,.%]{0,20}){0,6}"
    ) {
        let _ = parse_condition(&text);
    }

    #[test]
    fn prop_comma_split_respects_quotes_and_parens(items in prop::collection::vec(list_item(), 1..6)) {
        let joined = items.join(", ");
        prop_assert_eq!(split_top_level_commas(&joined), items);
    }

    #[test]
    fn prop_parsed_statements_always_generate(
        sql in "(SELECT|INSERT INTO|UPDATE|DELETE FROM) [a-z0-9 ()'=<>,.*]{0,40}( (FROM|WHERE|JOIN|ON|SET|VALUES|ORDER BY|GROUP BY|LIMIT|UNION) [a-z0-9 ()'=<>,.*]{0,20}){0,5}"
    ) {
        if let Ok(stmt) = parse_statement(&sql) {
            prop_assert!(generate_code(&stmt).is_ok(), "generation failed for {:?}", sql);
        }
    }
}
