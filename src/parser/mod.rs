//! SQL parsing: tokenizer, statement segmentation and condition trees

pub mod ast;
pub mod condition;
pub mod scanner;
pub mod statement;
pub mod tokenizer;

pub use ast::*;
pub use condition::{parse_condition, Condition, ConditionParser, ConditionTree, Operator, Value};
pub use statement::{parse_statement, SqlParser};
