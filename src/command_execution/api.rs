// Maintenance API
//
// Caller-facing facade tying the executor, classifier and dispatcher together.
// Inputs are validated here before anything is queued; every operation is then
// run by the single dispatcher worker and reported through `Completions`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::command_execution::{
    classifier::{Classifier, OperationProfile},
    credential::Credential,
    dispatcher::{Completions, Dispatcher, DispatcherConfig},
    error::{CommandResult, ValidationError},
    platform::{app_name, validate_app_bundle, CommandExecutor, ProcessSpawner},
    types::{CommandSpec, DispatcherStatus, TaskHandle, TaskId},
};
use crate::platform::macos::{open_settings_page, MaintenanceCommands};

/// Everything needed to assemble a [`MaintenanceApi`]
#[derive(Debug, Clone, Default)]
pub struct MaintenanceSettings {
    pub commands: MaintenanceCommands,
    pub classifier: Classifier,
    pub dispatcher: DispatcherConfig,
    /// Overrides the default elevation helper (`sudo`)
    pub elevation_program: Option<String>,
}

/// High-level maintenance operations
pub struct MaintenanceApi {
    executor: CommandExecutor,
    commands: MaintenanceCommands,
    settings_uri: String,
    dispatcher: Dispatcher,
}

impl MaintenanceApi {
    /// Build the API with the real process spawner.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(settings: MaintenanceSettings) -> (Self, Completions) {
        Self::with_executor(CommandExecutor::new(), settings)
    }

    /// Build the API on top of a custom spawner
    pub fn with_spawner(
        spawner: Arc<dyn ProcessSpawner>,
        settings: MaintenanceSettings,
    ) -> (Self, Completions) {
        Self::with_executor(CommandExecutor::with_spawner(spawner), settings)
    }

    fn with_executor(
        executor: CommandExecutor,
        settings: MaintenanceSettings,
    ) -> (Self, Completions) {
        let executor = match settings.elevation_program {
            Some(program) => executor.with_elevation_program(program),
            None => executor,
        };
        let settings_uri = settings.classifier.settings_uri().to_string();
        let (dispatcher, completions) =
            Dispatcher::spawn(settings.classifier, settings.dispatcher);

        (
            Self {
                executor,
                commands: settings.commands,
                settings_uri,
                dispatcher,
            },
            completions,
        )
    }

    /// Submit an arbitrary command spec under `name`.
    ///
    /// Elevated specs need a non-empty credential; a missing one is reported
    /// right away and nothing is queued. The credential moves into the task
    /// and is wiped once the elevation helper has read it.
    pub fn submit(
        &self,
        name: impl Into<String>,
        spec: CommandSpec,
        credential: Option<Credential>,
    ) -> CommandResult<TaskHandle> {
        self.submit_spec(OperationProfile::new(name), spec, credential)
    }

    /// Allow apps from anywhere (disable Gatekeeper assessments)
    pub fn enable_any_source(&self, credential: Credential) -> CommandResult<TaskHandle> {
        let profile = OperationProfile::new("Allow apps from anywhere")
            .with_success_message("Apps from anywhere are now allowed");
        self.submit_spec(profile, self.commands.global_disable(), Some(credential))
    }

    /// Restore the default Gatekeeper policy
    pub fn restore_gatekeeper(&self, credential: Credential) -> CommandResult<TaskHandle> {
        let profile = OperationProfile::new("Restore Gatekeeper")
            .with_success_message("Gatekeeper has been restored to its default policy");
        self.submit_spec(profile, self.commands.global_enable(), Some(credential))
    }

    /// `spctl --master-disable`, for systems that predate `--global-disable`
    pub fn legacy_disable(&self, credential: Credential) -> CommandResult<TaskHandle> {
        let profile = OperationProfile::new("Allow apps from anywhere (master-disable)");
        self.submit_spec(profile, self.commands.master_disable(), Some(credential))
    }

    /// `spctl --master-enable`
    pub fn legacy_enable(&self, credential: Credential) -> CommandResult<TaskHandle> {
        let profile = OperationProfile::new("Restore Gatekeeper (master-enable)");
        self.submit_spec(profile, self.commands.master_enable(), Some(credential))
    }

    /// Query Gatekeeper status; runs without elevation
    pub fn gatekeeper_status(&self) -> CommandResult<TaskHandle> {
        let profile = OperationProfile::new("Gatekeeper status")
            .with_success_message("Gatekeeper status retrieved");
        self.submit_spec(profile, self.commands.status(), None)
    }

    /// Remove the quarantine attribute from an application bundle.
    ///
    /// The path is checked now and again right before the command runs. An
    /// already-clean bundle is reported as success.
    pub fn fix_damaged_app(
        &self,
        bundle: impl AsRef<Path>,
        credential: Credential,
    ) -> CommandResult<TaskHandle> {
        let bundle: PathBuf = bundle.as_ref().to_path_buf();
        validate_app_bundle(&bundle)?;
        ensure_credential(&credential)?;

        let name = app_name(&bundle).unwrap_or_else(|| bundle.display().to_string());
        let profile = OperationProfile::new(format!("Repair {}", name))
            .with_success_message(format!("{} was repaired", name))
            .idempotent_removal(format!("{} does not need repair", name));
        let spec = self.commands.remove_quarantine(&bundle);
        let executor = self.executor.clone();

        self.dispatcher.submit_with_profile(profile, move || {
            executor.execute_on_bundle(&spec, &bundle, Some(credential))
        })
    }

    /// Open the Privacy & Security settings page (fire-and-forget)
    pub fn open_settings(&self) -> CommandResult<()> {
        open_settings_page(&self.commands, &self.settings_uri)
    }

    /// Open a settings URI returned in a `FollowUp`
    pub fn open_settings_uri(&self, uri: &str) -> CommandResult<()> {
        open_settings_page(&self.commands, uri)
    }

    /// Cancel a queued (not yet running) task
    pub fn cancel(&self, id: TaskId) -> CommandResult<()> {
        self.dispatcher.cancel(id)
    }

    pub fn status(&self) -> DispatcherStatus {
        self.dispatcher.status()
    }

    /// Stop accepting work and wait for queued tasks to finish
    pub async fn shutdown(self) -> CommandResult<()> {
        self.dispatcher.shutdown().await
    }

    fn submit_spec(
        &self,
        profile: OperationProfile,
        spec: CommandSpec,
        credential: Option<Credential>,
    ) -> CommandResult<TaskHandle> {
        if spec.requires_elevation() {
            match &credential {
                Some(credential) => ensure_credential(credential)?,
                None => return Err(ValidationError::EmptyCredential.into()),
            }
        }

        let executor = self.executor.clone();
        self.dispatcher
            .submit_with_profile(profile, move || executor.execute(&spec, credential))
    }
}

fn ensure_credential(credential: &Credential) -> Result<(), ValidationError> {
    if credential.is_empty() {
        Err(ValidationError::EmptyCredential)
    } else {
        Ok(())
    }
}
