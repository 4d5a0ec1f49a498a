//! Error module for the sweep configuration library.
use thiserror::Error;

/// Error types for the library.
///
/// Every variant that concerns the document carries the offending location: a line and column for
/// malformed text, a dotted path for schema and range violations.
#[derive(Debug, PartialEq, Clone, Error)]
pub enum ConfigError {
    /// Error for malformed text, e.g., a missing brace or an unterminated comment.
    #[error("Parse error at line {line}, column {column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },
    /// Error for a missing, unexpected or mistyped field.
    #[error("Schema error at `{path}`: {message}")]
    Schema { path: String, message: String },
    /// Error for a violated numeric constraint, e.g., min > max or count < 1.
    #[error("Range error at `{path}`: {message}")]
    Range { path: String, message: String },
    /// Error for I/O operations.
    #[error("I/O error: {0}")]
    IOError(String),
}

impl ConfigError {
    pub fn schema(path: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Schema {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn range(path: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Range {
            path: path.into(),
            message: message.into(),
        }
    }

    /// The dotted path of the offending field, if the error concerns one.
    pub fn path(&self) -> Option<&str> {
        match self {
            ConfigError::Schema { path, .. } | ConfigError::Range { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::IOError(e.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            return ConfigError::IOError(e.to_string());
        }
        ConfigError::Parse {
            line: e.line(),
            column: e.column(),
            message: e.to_string(),
        }
    }
}
