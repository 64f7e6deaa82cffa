// Output formatting for CLI results

use serde_json::json;

use crate::cli::error::CLIResult;
use crate::cli::types::{AppConfig, OutputFormat};
use crate::command_execution::{Completion, Disposition, FailureKind, FollowUp, Outcome};
use crate::platform::macos::{parse_gatekeeper_status, GatekeeperState};

/// Shown after a Gatekeeper toggle fails without a recognised reason
pub const GATEKEEPER_FAILURE_HINT: &str = "On macOS 15 and later the setting may also need to be \
changed under System Settings > Privacy & Security. Devices managed by an organisation (MDM) \
can block this change entirely.";

/// Renders completions and configuration in the selected format
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Render a completion; `hint` is appended to plain failures in text mode
    pub fn format_completion(&self, completion: &Completion, hint: Option<&str>) -> CLIResult<String> {
        match self.format {
            OutputFormat::Text => Ok(format_completion_text(completion, hint)),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&completion_to_json(completion))?),
        }
    }

    /// Render a Gatekeeper status query
    pub fn format_status(&self, completion: &Completion) -> CLIResult<String> {
        let state = match completion.outcome() {
            Some(Outcome::Success { stdout, stderr, .. }) => {
                // spctl has printed its status on either stream across releases
                match parse_gatekeeper_status(stdout) {
                    GatekeeperState::Unknown => parse_gatekeeper_status(stderr),
                    state => state,
                }
            }
            _ => return self.format_completion(completion, None),
        };

        match self.format {
            OutputFormat::Text => Ok(match state {
                GatekeeperState::Enabled => {
                    "Gatekeeper is enabled: only apps from the App Store and identified developers are allowed".to_string()
                }
                GatekeeperState::Disabled => {
                    "Gatekeeper is disabled: apps from anywhere are allowed".to_string()
                }
                GatekeeperState::Unknown => "Gatekeeper status could not be determined".to_string(),
            }),
            OutputFormat::Json => {
                let mut value = completion_to_json(completion);
                value["gatekeeper"] = serde_json::to_value(state)?;
                Ok(serde_json::to_string_pretty(&value)?)
            }
        }
    }

    pub fn format_config(&self, config: &AppConfig) -> CLIResult<String> {
        match self.format {
            OutputFormat::Text => toml::to_string_pretty(config)
                .map_err(|e| crate::cli::error::CLIError::format(e.to_string())),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(config)?),
        }
    }
}

fn format_completion_text(completion: &Completion, hint: Option<&str>) -> String {
    let mut output = String::new();

    match &completion.disposition {
        Disposition::Completed(Outcome::Success { message, .. }) => {
            output.push_str(&format!("✓ {}", message));
        }
        Disposition::Completed(Outcome::NeedsConfirmation { guidance, follow_up }) => {
            output.push_str(&format!("! {}", guidance));
            match follow_up {
                FollowUp::OpenSettings(uri) => {
                    output.push_str(&format!("\n  Settings page: {}", uri));
                }
            }
        }
        Disposition::Completed(Outcome::Failure {
            kind,
            message,
            stdout,
            stderr,
        }) => {
            output.push_str(&format!("✗ {}", message));
            for stream in [stderr, stdout] {
                let stream = stream.trim();
                if !stream.is_empty() {
                    output.push_str(&format!("\n  {}", stream.replace('\n', "\n  ")));
                }
            }
            if let (FailureKind::Exited(_), Some(hint)) = (kind, hint) {
                output.push_str(&format!("\n\n{}", hint));
            }
        }
        Disposition::Rejected(error) => {
            output.push_str(&format!("✗ {}: {}", completion.handle.name, error));
        }
        Disposition::Cancelled => {
            output.push_str(&format!("- {} was cancelled", completion.handle.name));
        }
    }

    output
}

fn completion_to_json(completion: &Completion) -> serde_json::Value {
    let mut value = json!({
        "task_id": completion.handle.id.to_string(),
        "name": completion.handle.name,
        "completed_at": completion.completed_at.to_rfc3339(),
    });

    match &completion.disposition {
        Disposition::Completed(outcome) => {
            value["status"] = json!(match outcome {
                Outcome::Success { .. } => "success",
                Outcome::NeedsConfirmation { .. } => "needs_confirmation",
                Outcome::Failure { .. } => "failure",
            });
            value["outcome"] = serde_json::to_value(outcome).unwrap_or(serde_json::Value::Null);
        }
        Disposition::Rejected(error) => {
            value["status"] = json!("rejected");
            value["error"] = json!(error.to_string());
        }
        Disposition::Cancelled => {
            value["status"] = json!("cancelled");
        }
    }

    value
}
