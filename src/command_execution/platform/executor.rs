// Command executor: elevation, literal argv, permissive output decoding

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use zeroize::Zeroizing;

use crate::command_execution::{
    credential::Credential,
    error::{CommandResult, ValidationError},
    types::{CommandSpec, ExecutionResult},
};

use super::unix::SystemSpawner;

/// Default privilege-escalation helper
pub const DEFAULT_ELEVATION_PROGRAM: &str = "sudo";

/// Raw output of a spawned process, before decoding
#[derive(Debug, Clone, Default)]
pub struct RawOutput {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Process-creation primitive
///
/// Implementations receive the literal argument vector (`argv[0]` is the
/// program) and, optionally, bytes to write to the child's stdin. The stdin
/// buffer is owned so it is wiped as soon as the implementation drops it.
pub trait ProcessSpawner: Send + Sync {
    fn run(&self, argv: &[String], stdin: Option<Zeroizing<Vec<u8>>>) -> io::Result<RawOutput>;
}

/// Runs [`CommandSpec`]s, blocking until both output streams are drained
#[derive(Clone)]
pub struct CommandExecutor {
    spawner: Arc<dyn ProcessSpawner>,
    elevation_program: String,
}

impl CommandExecutor {
    /// Create an executor backed by the real process spawner
    pub fn new() -> Self {
        Self::with_spawner(Arc::new(SystemSpawner::new()))
    }

    /// Create an executor backed by a custom spawner
    pub fn with_spawner(spawner: Arc<dyn ProcessSpawner>) -> Self {
        Self {
            spawner,
            elevation_program: DEFAULT_ELEVATION_PROGRAM.to_string(),
        }
    }

    /// Set the elevation helper (must accept `-S -p ""` like sudo)
    pub fn with_elevation_program(mut self, program: impl Into<String>) -> Self {
        self.elevation_program = program.into();
        self
    }

    pub fn elevation_program(&self) -> &str {
        &self.elevation_program
    }

    /// Run a command, feeding `credential` to the elevation helper if needed.
    ///
    /// Returns `Err` only for validation problems detected before spawning.
    /// A program that cannot be started yields an `ExecutionResult` with
    /// `transport_failure` set.
    pub fn execute(
        &self,
        spec: &CommandSpec,
        credential: Option<Credential>,
    ) -> CommandResult<ExecutionResult> {
        if spec.program().trim().is_empty() {
            return Err(ValidationError::EmptyProgram.into());
        }

        let (argv, stdin) = if spec.requires_elevation() {
            let credential = match credential {
                Some(credential) if !credential.is_empty() => credential,
                _ => return Err(ValidationError::EmptyCredential.into()),
            };
            (self.elevated_argv(spec), Some(credential.into_stdin_bytes()))
        } else {
            (spec.argv(), None)
        };

        log::info!("Executing {}", spec);
        let start = Instant::now();

        let result = match self.spawner.run(&argv, stdin) {
            Ok(raw) => ExecutionResult::exited(
                raw.exit_code.unwrap_or(-1),
                String::from_utf8_lossy(&raw.stdout),
                String::from_utf8_lossy(&raw.stderr),
            ),
            Err(e) => {
                log::warn!("Failed to start {}: {}", argv[0], e);
                ExecutionResult::transport_failed(format!("Failed to start {}: {}", argv[0], e))
            }
        };
        let result = result.with_execution_time(start.elapsed());

        log::debug!(
            "{} finished with exit code {} in {:?}",
            spec.program(),
            result.exit_code,
            result.execution_time
        );

        Ok(result)
    }

    /// Validate the target bundle, then run the command.
    ///
    /// A missing path or a non-bundle target is reported before any process
    /// is spawned.
    pub fn execute_on_bundle(
        &self,
        spec: &CommandSpec,
        bundle: &Path,
        credential: Option<Credential>,
    ) -> CommandResult<ExecutionResult> {
        validate_app_bundle(bundle)?;
        self.execute(spec, credential)
    }

    /// `sudo -S -p "" <program> <args...>`: password on stdin, empty prompt
    fn elevated_argv(&self, spec: &CommandSpec) -> Vec<String> {
        let mut argv = vec![
            self.elevation_program.clone(),
            "-S".to_string(),
            "-p".to_string(),
            String::new(),
        ];
        argv.extend(spec.argv());
        argv
    }
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Check that `path` exists and is an application bundle (`*.app` directory)
pub fn validate_app_bundle(path: &Path) -> Result<(), ValidationError> {
    if path.to_str().is_none() {
        return Err(ValidationError::NonUtf8Path(path.to_path_buf()));
    }

    if path.as_os_str().is_empty() || !path.exists() {
        return Err(ValidationError::PathNotFound(path.to_path_buf()));
    }

    let is_app = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("app"))
        .unwrap_or(false);

    if !is_app || !path.is_dir() {
        return Err(ValidationError::NotAnAppBundle(path.to_path_buf()));
    }

    Ok(())
}

/// Boolean form of [`validate_app_bundle`]
pub fn validate_path(path: impl AsRef<Path>) -> bool {
    validate_app_bundle(path.as_ref()).is_ok()
}

/// Bundle name without the `.app` suffix, if the path is a valid bundle
pub fn app_name(path: impl AsRef<Path>) -> Option<String> {
    let path = path.as_ref();
    if !validate_path(path) {
        return None;
    }
    path.file_stem().map(|stem| stem.to_string_lossy().into_owned())
}
