use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for command execution operations
pub type CommandResult<T> = std::result::Result<T, CommandError>;

/// Bad input caught before any subprocess is started.
///
/// These never reach the classifier, so a caller can re-prompt for a password
/// or a path without showing a misleading "command failed" message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Elevation was requested without a usable credential
    #[error("A password is required to run this operation")]
    EmptyCredential,

    /// The target path does not exist
    #[error("Path does not exist: {}", .0.display())]
    PathNotFound(PathBuf),

    /// The target exists but is not an application bundle
    #[error("Not an application bundle (*.app): {}", .0.display())]
    NotAnAppBundle(PathBuf),

    /// Command arguments are UTF-8 strings; such a path cannot be passed through
    #[error("Path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),

    /// A command was built with an empty program name
    #[error("Command has no program to run")]
    EmptyProgram,
}

/// Errors that can occur while submitting or running maintenance operations
#[derive(Error, Debug)]
pub enum CommandError {
    /// Input rejected before anything was spawned
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The dispatcher queue is full (or a task is running with no queue)
    #[error("Busy: {running} running, {queued} queued")]
    Busy { running: usize, queued: usize },

    /// The dispatcher no longer accepts work
    #[error("Dispatcher is shut down")]
    DispatcherClosed,

    /// No task with this id is waiting in the queue
    #[error("Task not cancellable: {0}")]
    NotCancellable(uuid::Uuid),

    /// Platform-specific execution environment issues
    #[error("Platform error: {0}")]
    PlatformError(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CommandError {
    /// Create a new platform error
    pub fn platform_error(reason: impl Into<String>) -> Self {
        Self::PlatformError(reason.into())
    }

    /// Create a new internal error
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal(reason.into())
    }

    /// Returns the validation error if this error is one
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_converts_into_command_error() {
        let err: CommandError = ValidationError::EmptyCredential.into();
        assert_eq!(err.as_validation(), Some(&ValidationError::EmptyCredential));
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn test_busy_message() {
        let err = CommandError::Busy { running: 1, queued: 0 };
        assert_eq!(err.to_string(), "Busy: 1 running, 0 queued");
        assert!(err.as_validation().is_none());
    }
}
