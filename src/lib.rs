//! Gatekeeper and quarantine maintenance for macOS.
//!
//! The [`command_execution`] module holds the privileged command core; the
//! [`platform`] module knows the macOS tools; [`cli`] is the terminal caller.

pub mod cli;
pub mod command_execution;
pub mod platform;

pub use command_execution::{
    Classifier, CommandError, CommandExecutor, CommandResult, CommandSpec, Completion,
    Completions, Credential, Disposition, Dispatcher, ExecutionResult, FailureKind, FollowUp,
    MaintenanceApi, MaintenanceSettings, Outcome, PhraseTable, TaskHandle, ValidationError,
};
