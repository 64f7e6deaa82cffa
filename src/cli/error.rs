// CLI error types and handling

use thiserror::Error;

use crate::command_execution::CommandError;

/// Result type for CLI operations
pub type CLIResult<T> = Result<T, CLIError>;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CLIError {
    /// Configuration file parsing and validation errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// File system and terminal I/O errors
    #[error("I/O error: {0}")]
    IOError(#[from] std::io::Error),

    /// Maintenance core errors
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Output formatting errors
    #[error("Format error: {0}")]
    FormatError(String),

    /// Operation cancelled by user
    #[error("Operation cancelled")]
    Cancelled,
}

impl CLIError {
    /// Create a config error with context
    pub fn config(msg: impl Into<String>) -> Self {
        CLIError::ConfigError(msg.into())
    }

    /// Create a format error with context
    pub fn format(msg: impl Into<String>) -> Self {
        CLIError::FormatError(msg.into())
    }
}

impl From<serde_json::Error> for CLIError {
    fn from(err: serde_json::Error) -> Self {
        Self::FormatError(err.to_string())
    }
}
