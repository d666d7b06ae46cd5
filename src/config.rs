//! Translator and generator configuration
//!
//! Plain structs with `Default` values and `with_*` builders. Nothing here
//! is global; each [`crate::Translator`] owns its own copy.

use crate::parser::condition::DEFAULT_MAX_DEPTH;

/// Inputs longer than this are rejected before parsing.
pub const DEFAULT_MAX_INPUT_LEN: usize = 64 * 1024;

/// Spaces per indentation level in generated PHP
pub const DEFAULT_INDENT: usize = 4;

/// How generated code obtains a Table object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableLocator {
    /// `$this->fetchTable('Users')` (controllers, commands, anything
    /// using `LocatorAwareTrait`)
    #[default]
    FetchTable,
    /// `TableRegistry::getTableLocator()->get('Users')`
    TableRegistry,
}

impl TableLocator {
    /// PHP expression that returns the table object for `class_name`
    pub fn call(&self, class_name: &str) -> String {
        match self {
            TableLocator::FetchTable => format!("$this->fetchTable('{}')", class_name),
            TableLocator::TableRegistry => {
                format!("TableRegistry::getTableLocator()->get('{}')", class_name)
            }
        }
    }
}

/// Code generation options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub indent: usize,
    pub locator: TableLocator,
    /// Trailing `all()` / `first()` / `count()` comments after a SELECT
    pub usage_examples: bool,
    /// Association, alias and unsupported-construct hints
    pub advisories: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            indent: DEFAULT_INDENT,
            locator: TableLocator::default(),
            usage_examples: true,
            advisories: true,
        }
    }
}

impl GeneratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_locator(mut self, locator: TableLocator) -> Self {
        self.locator = locator;
        self
    }

    pub fn with_usage_examples(mut self, enabled: bool) -> Self {
        self.usage_examples = enabled;
        self
    }

    pub fn with_advisories(mut self, enabled: bool) -> Self {
        self.advisories = enabled;
        self
    }
}

/// Top-level translation options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatorConfig {
    pub max_input_len: usize,
    pub max_condition_depth: usize,
    pub generator: GeneratorConfig,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        TranslatorConfig {
            max_input_len: DEFAULT_MAX_INPUT_LEN,
            max_condition_depth: DEFAULT_MAX_DEPTH,
            generator: GeneratorConfig::default(),
        }
    }
}

impl TranslatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_input_len(mut self, len: usize) -> Self {
        self.max_input_len = len;
        self
    }

    pub fn with_max_condition_depth(mut self, depth: usize) -> Self {
        self.max_condition_depth = depth;
        self
    }

    pub fn with_generator(mut self, generator: GeneratorConfig) -> Self {
        self.generator = generator;
        self
    }
}
