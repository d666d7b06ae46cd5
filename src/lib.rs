//! sqlcake - SQL statements to CakePHP query builder code
//!
//! ```
//! let php = sqlcake::Translator::new()
//!     .translate("SELECT * FROM users WHERE active = 1")
//!     .unwrap();
//! assert!(php.contains("->where(['active' => 1])"));
//! ```

pub mod codegen;
pub mod config;
pub mod error;
pub mod parser;
pub mod translator;

// Re-export main public types
pub use error::{Error, ErrorCode, Result};
pub use config::{GeneratorConfig, TableLocator, TranslatorConfig};
pub use translator::Translator;

// Re-export the function-style API
pub use codegen::{format_condition, generate_code, QueryBuilderGenerator};
pub use parser::{parse_condition, parse_statement, ConditionParser, ConditionTree, SqlParser, Statement};
