// Command handlers: run one maintenance operation and report its completion

use std::path::Path;
use std::sync::Arc;

use crate::cli::error::{CLIError, CLIResult};
use crate::cli::output::{OutputFormatter, GATEKEEPER_FAILURE_HINT};
use crate::cli::types::{AppConfig, CommandType};
use crate::command_execution::{
    validate_app_bundle, CommandError, Completion, Completions, Credential, Disposition,
    FollowUp, MaintenanceApi, Outcome, ProcessSpawner, TaskHandle,
};

/// Process exit codes used by the binary
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
    /// Invalid input, rejected or cancelled request
    pub const INVALID: i32 = 2;
    /// The change has to be confirmed in System Settings
    pub const NEEDS_CONFIRMATION: i32 = 3;
}

/// Where the administrator password comes from
pub trait CredentialSource: Send + Sync {
    fn obtain(&self, prompt: &str) -> CLIResult<Credential>;
}

/// Non-echoing terminal prompt
pub struct TerminalPrompt;

impl CredentialSource for TerminalPrompt {
    fn obtain(&self, prompt: &str) -> CLIResult<Credential> {
        let secret = rpassword::prompt_password(prompt).map_err(|e| match e.kind() {
            std::io::ErrorKind::Interrupted | std::io::ErrorKind::UnexpectedEof => {
                CLIError::Cancelled
            }
            _ => CLIError::IOError(e),
        })?;
        Ok(Credential::new(secret))
    }
}

/// Rendered result of a handled command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerReport {
    pub output: String,
    pub exit_code: i32,
}

/// Runs maintenance commands through the [`MaintenanceApi`]
pub struct CommandHandler {
    api: MaintenanceApi,
    completions: Completions,
    formatter: OutputFormatter,
    credentials: Box<dyn CredentialSource>,
    open_settings: bool,
}

impl CommandHandler {
    /// Build a handler for the real system. Must run inside a tokio runtime.
    pub fn new(config: &AppConfig, formatter: OutputFormatter, open_settings: bool) -> Self {
        let (api, completions) = MaintenanceApi::new(config.maintenance_settings());
        Self::from_parts(api, completions, formatter, open_settings)
    }

    /// Build a handler on top of a custom spawner
    pub fn with_spawner(
        spawner: Arc<dyn ProcessSpawner>,
        config: &AppConfig,
        formatter: OutputFormatter,
        open_settings: bool,
    ) -> Self {
        let (api, completions) = MaintenanceApi::with_spawner(spawner, config.maintenance_settings());
        Self::from_parts(api, completions, formatter, open_settings)
    }

    fn from_parts(
        api: MaintenanceApi,
        completions: Completions,
        formatter: OutputFormatter,
        open_settings: bool,
    ) -> Self {
        Self {
            api,
            completions,
            formatter,
            credentials: Box::new(TerminalPrompt),
            open_settings,
        }
    }

    /// Replace the password source
    pub fn with_credentials(mut self, credentials: Box<dyn CredentialSource>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Handle one command, then shut the dispatcher down
    pub async fn run(mut self, command: CommandType) -> CLIResult<HandlerReport> {
        let result = self.dispatch(&command).await;
        self.api.shutdown().await?;
        result
    }

    async fn dispatch(&mut self, command: &CommandType) -> CLIResult<HandlerReport> {
        match command {
            CommandType::OpenSettings => {
                self.api.open_settings()?;
                Ok(HandlerReport {
                    output: "Opened Privacy & Security settings".to_string(),
                    exit_code: exit_code::SUCCESS,
                })
            }
            CommandType::Status => {
                let handle = self.api.gatekeeper_status()?;
                let completion = self.wait_for(&handle).await?;
                Ok(HandlerReport {
                    output: self.formatter.format_status(&completion)?,
                    exit_code: completion_exit_code(&completion),
                })
            }
            CommandType::EnableAnySource => {
                let credential = self.prompt()?;
                let handle = self.api.enable_any_source(credential)?;
                self.finish(&handle, Some(GATEKEEPER_FAILURE_HINT)).await
            }
            CommandType::RestoreGatekeeper => {
                let credential = self.prompt()?;
                let handle = self.api.restore_gatekeeper(credential)?;
                self.finish(&handle, None).await
            }
            CommandType::LegacyDisable => {
                let credential = self.prompt()?;
                let handle = self.api.legacy_disable(credential)?;
                self.finish(&handle, Some(GATEKEEPER_FAILURE_HINT)).await
            }
            CommandType::LegacyEnable => {
                let credential = self.prompt()?;
                let handle = self.api.legacy_enable(credential)?;
                self.finish(&handle, None).await
            }
            CommandType::FixApp(path) => {
                // Reject a bad path before asking for the password
                validate_app_bundle(path).map_err(CommandError::from)?;
                let credential = self.prompt()?;
                let handle = self.api.fix_damaged_app(Path::new(path), credential)?;
                self.finish(&handle, None).await
            }
            CommandType::ConfigShow | CommandType::ConfigInit { .. } | CommandType::ConfigPath => {
                Err(CLIError::config("Configuration commands are not maintenance operations"))
            }
        }
    }

    fn prompt(&self) -> CLIResult<Credential> {
        self.credentials.obtain("Administrator password: ")
    }

    async fn finish(&mut self, handle: &TaskHandle, hint: Option<&str>) -> CLIResult<HandlerReport> {
        let completion = self.wait_for(handle).await?;

        if let Disposition::Completed(Outcome::NeedsConfirmation {
            follow_up: FollowUp::OpenSettings(uri),
            ..
        }) = &completion.disposition
        {
            if self.open_settings {
                if let Err(e) = self.api.open_settings_uri(uri) {
                    log::warn!("Could not open {}: {}", uri, e);
                }
            } else {
                log::debug!("Not opening {} (disabled)", uri);
            }
        }

        Ok(HandlerReport {
            output: self.formatter.format_completion(&completion, hint)?,
            exit_code: completion_exit_code(&completion),
        })
    }

    async fn wait_for(&mut self, handle: &TaskHandle) -> CLIResult<Completion> {
        log::debug!("Waiting for {} ({})", handle.name, handle.id);
        while let Some(completion) = self.completions.next().await {
            if completion.handle.id == handle.id {
                return Ok(completion);
            }
            log::debug!("Ignoring completion of {}", completion.handle.name);
        }
        Err(CommandError::DispatcherClosed.into())
    }
}

/// Map a completion to the process exit code
pub fn completion_exit_code(completion: &Completion) -> i32 {
    match &completion.disposition {
        Disposition::Completed(Outcome::Success { .. }) => exit_code::SUCCESS,
        Disposition::Completed(Outcome::NeedsConfirmation { .. }) => exit_code::NEEDS_CONFIRMATION,
        Disposition::Completed(Outcome::Failure { .. }) => exit_code::FAILURE,
        Disposition::Rejected(_) | Disposition::Cancelled => exit_code::INVALID,
    }
}

/// Map an error that prevented a completion to the process exit code
pub fn error_exit_code(error: &CLIError) -> i32 {
    match error {
        CLIError::Command(CommandError::Validation(_)) | CLIError::Cancelled => exit_code::INVALID,
        _ => exit_code::FAILURE,
    }
}
