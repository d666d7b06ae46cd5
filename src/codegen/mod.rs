//! PHP code generation for parsed statements

pub mod generator;
pub mod inflector;
pub mod php;

pub use generator::{generate_code, QueryBuilderGenerator};
pub use php::{format_condition, ConditionFormatter};
