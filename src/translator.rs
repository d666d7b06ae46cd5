//! SQL → PHP translation entry point

use crate::codegen::QueryBuilderGenerator;
use crate::config::TranslatorConfig;
use crate::error::{Error, ErrorCode, Result};
use crate::parser::ast::Statement;
use crate::parser::condition::ConditionParser;
use crate::parser::statement::SqlParser;

/// Parser and generator configured together. Holds no state between
/// calls; one instance can translate any number of statements.
#[derive(Debug, Clone, Default)]
pub struct Translator {
    config: TranslatorConfig,
    parser: SqlParser,
    generator: QueryBuilderGenerator,
}

impl Translator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TranslatorConfig) -> Self {
        let generator = QueryBuilderGenerator::with_config(config.generator.clone())
            .with_condition_parser(ConditionParser::new().with_max_depth(config.max_condition_depth));
        Translator {
            config,
            parser: SqlParser::new(),
            generator,
        }
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    fn check_len(&self, input: &str) -> Result<()> {
        if input.len() > self.config.max_input_len {
            return Err(Error::with_message(
                ErrorCode::TooBig,
                format!(
                    "input is {} bytes, the limit is {}",
                    input.len(),
                    self.config.max_input_len
                ),
            ));
        }
        Ok(())
    }

    /// Parse SQL into a statement
    pub fn parse(&self, sql: &str) -> Result<Statement> {
        self.check_len(sql)?;
        self.parser.parse(sql)
    }

    /// Generate PHP for an already parsed statement
    pub fn generate(&self, stmt: &Statement) -> Result<String> {
        self.generator.generate(stmt)
    }

    /// Parse SQL and generate PHP for it
    pub fn translate(&self, sql: &str) -> Result<String> {
        let stmt = self.parse(sql)?;
        self.generate(&stmt)
    }

    /// Generate PHP for a statement given as JSON
    pub fn translate_json(&self, json: &str) -> Result<String> {
        self.check_len(json)?;
        let stmt = Statement::from_json(json)?;
        self.generate(&stmt)
    }
}
