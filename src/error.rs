//! Error types shared by the table, oracle and CLI layers

use thiserror::Error;

/// Result type for fallible diffsearch operations
pub type Result<T> = std::result::Result<T, DiffError>;

/// Errors that can occur outside the (infallible) search core
#[derive(Debug, Error)]
pub enum DiffError {
    /// The round table violates one of its structural invariants
    #[error("invalid round table: {0}")]
    InvalidTable(String),

    /// A table file could not be parsed
    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Invalid search or runner configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The external cipher process misbehaved
    #[error("oracle failure: {0}")]
    Oracle(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DiffError {
    pub fn table(message: impl Into<String>) -> Self {
        DiffError::InvalidTable(message.into())
    }

    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        DiffError::Parse {
            line,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        DiffError::InvalidConfig(message.into())
    }

    pub fn oracle(message: impl Into<String>) -> Self {
        DiffError::Oracle(message.into())
    }
}
