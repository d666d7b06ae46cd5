//! Error types and Result aliases for sqlcake

use std::fmt;

use thiserror::Error;

/// Broad category of a translation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Leading keyword or statement kind has no translation
    UnsupportedQueryType,
    /// Input exceeds the configured size guard
    TooBig,
    /// A serialized statement could not be decoded
    Format,
}

impl ErrorCode {
    /// Short human readable description of the code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::UnsupportedQueryType => "unsupported query type",
            ErrorCode::TooBig => "input too large",
            ErrorCode::Format => "malformed statement",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised by the statement parser, the generator and the facade.
///
/// Condition parsing never produces one of these: unparsable WHERE text
/// degrades to a raw condition instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
}

impl Error {
    /// Create an error with only a code
    pub fn new(code: ErrorCode) -> Self {
        Error {
            code,
            message: code.as_str().to_string(),
        }
    }

    /// Create an error with a code and a message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Error {
            code,
            message: message.into(),
        }
    }

    /// Shorthand for an unsupported statement kind
    pub fn unsupported(kind: impl fmt::Display) -> Self {
        Error::with_message(
            ErrorCode::UnsupportedQueryType,
            format!("unsupported query type: {}", kind),
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::with_message(ErrorCode::Format, e.to_string())
    }
}

/// Result type alias for sqlcake operations
pub type Result<T> = std::result::Result<T, Error>;
