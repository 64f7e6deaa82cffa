use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use crate::command_execution::error::ValidationError;

/// Unique identifier for a submitted task
pub type TaskId = Uuid;

/// Timestamp type
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// An external program invocation, built once and never mutated.
///
/// Arguments are kept as a literal vector and handed to the process-creation
/// primitive as-is; nothing here is ever joined into a shell string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    requires_elevation: bool,
}

impl CommandSpec {
    /// Create a new command spec for `program` with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            requires_elevation: false,
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments in order
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Mark the command as needing administrator authorization
    pub fn elevated(mut self) -> Self {
        self.requires_elevation = true;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn requires_elevation(&self) -> bool {
        self.requires_elevation
    }

    /// Program followed by its arguments
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 1);
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        argv
    }
}

impl fmt::Display for CommandSpec {
    /// Human-readable rendering for logs; not suitable for a shell.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.requires_elevation {
            write!(f, "[elevated] ")?;
        }
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {:?}", arg)?;
        }
        Ok(())
    }
}

/// Raw result of one program invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Set only when the program could not be started at all
    pub transport_failure: Option<String>,
    pub execution_time: Duration,
}

impl ExecutionResult {
    /// Result of a program that ran to completion
    pub fn exited(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
            transport_failure: None,
            execution_time: Duration::ZERO,
        }
    }

    /// Result of a program that could not be started
    pub fn transport_failed(message: impl Into<String>) -> Self {
        Self {
            exit_code: -1,
            stdout: String::new(),
            stderr: String::new(),
            transport_failure: Some(message.into()),
            execution_time: Duration::ZERO,
        }
    }

    pub fn with_execution_time(mut self, execution_time: Duration) -> Self {
        self.execution_time = execution_time;
        self
    }

    pub fn success(&self) -> bool {
        self.transport_failure.is_none() && self.exit_code == 0
    }

    /// stdout and stderr joined for phrase matching
    pub fn combined_output(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Side effect the caller should perform after a `NeedsConfirmation` outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FollowUp {
    /// Open a system settings deep link (fire-and-forget)
    OpenSettings(String),
}

/// Why an operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The program could not be started (missing binary, spawn error)
    Transport,
    /// The program ran and exited with this non-zero code
    Exited(i32),
    /// The operation itself faulted inside the worker
    Internal,
}

/// Semantic result of a maintenance operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Success {
        message: String,
        stdout: String,
        stderr: String,
    },
    NeedsConfirmation {
        guidance: String,
        follow_up: FollowUp,
    },
    Failure {
        kind: FailureKind,
        message: String,
        stdout: String,
        stderr: String,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn needs_confirmation(&self) -> bool {
        matches!(self, Self::NeedsConfirmation { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    /// Short one-line description
    pub fn summary(&self) -> &str {
        match self {
            Self::Success { message, .. } => message,
            Self::NeedsConfirmation { guidance, .. } => guidance,
            Self::Failure { message, .. } => message,
        }
    }
}

/// Handle returned on submission
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskHandle {
    pub id: TaskId,
    pub name: String,
}

/// What happened to a submitted task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// The operation ran and was classified
    Completed(Outcome),
    /// The operation refused its input before spawning anything
    Rejected(ValidationError),
    /// The task was cancelled while still queued
    Cancelled,
}

/// A single completion event, delivered exactly once per task
#[derive(Debug, Clone)]
pub struct Completion {
    pub handle: TaskHandle,
    pub disposition: Disposition,
    pub completed_at: Timestamp,
}

impl Completion {
    pub fn outcome(&self) -> Option<&Outcome> {
        match &self.disposition {
            Disposition::Completed(outcome) => Some(outcome),
            _ => None,
        }
    }
}

/// Snapshot of dispatcher occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatcherStatus {
    pub running: Option<TaskId>,
    pub queued: usize,
    pub accepting: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_spec_builder_keeps_literal_arguments() {
        let spec = CommandSpec::new("xattr")
            .args(["-r", "-d", "com.apple.quarantine"])
            .arg("/Applications/My App; rm -rf ~.app")
            .elevated();

        assert_eq!(spec.program(), "xattr");
        assert!(spec.requires_elevation());
        assert_eq!(spec.arguments().len(), 4);
        assert_eq!(spec.arguments()[3], "/Applications/My App; rm -rf ~.app");
        assert_eq!(spec.argv()[0], "xattr");
    }

    #[test]
    fn test_display_marks_elevation() {
        let spec = CommandSpec::new("spctl").arg("--status");
        assert_eq!(spec.to_string(), "spctl \"--status\"");
        assert!(spec.clone().elevated().to_string().starts_with("[elevated]"));
    }

    #[test]
    fn test_execution_result_success() {
        assert!(ExecutionResult::exited(0, "", "warning").success());
        assert!(!ExecutionResult::exited(1, "", "").success());
        assert!(!ExecutionResult::transport_failed("missing").success());
    }
}
