// CLI handler tests with a canned password source and scripted tools

use std::io;
use std::sync::{Arc, Mutex};

use macrepair::cli::{
    error_exit_code, exit_code, AppConfig, CLIResult, CommandHandler, CommandType,
    CredentialSource, OutputFormat, OutputFormatter,
};
use macrepair::command_execution::{Credential, ProcessSpawner, RawOutput};
use zeroize::Zeroizing;

struct FixedPassword(&'static str);

impl CredentialSource for FixedPassword {
    fn obtain(&self, _prompt: &str) -> CLIResult<Credential> {
        Ok(Credential::new(self.0.to_string()))
    }
}

struct CannedSpawner {
    exit_code: i32,
    stdout: &'static str,
    stderr: &'static str,
    spawned: Mutex<usize>,
}

impl CannedSpawner {
    fn new(exit_code: i32, stdout: &'static str, stderr: &'static str) -> Arc<Self> {
        Arc::new(Self {
            exit_code,
            stdout,
            stderr,
            spawned: Mutex::new(0),
        })
    }

    fn spawned(&self) -> usize {
        *self.spawned.lock().unwrap()
    }
}

impl ProcessSpawner for CannedSpawner {
    fn run(&self, _argv: &[String], _stdin: Option<Zeroizing<Vec<u8>>>) -> io::Result<RawOutput> {
        *self.spawned.lock().unwrap() += 1;
        Ok(RawOutput {
            exit_code: Some(self.exit_code),
            stdout: self.stdout.as_bytes().to_vec(),
            stderr: self.stderr.as_bytes().to_vec(),
        })
    }
}

fn handler(spawner: Arc<CannedSpawner>, format: OutputFormat) -> CommandHandler {
    CommandHandler::with_spawner(spawner, &AppConfig::default(), OutputFormatter::new(format), false)
        .with_credentials(Box::new(FixedPassword("hunter2")))
}

#[tokio::test]
async fn test_needs_confirmation_exit_code() {
    let spawner = CannedSpawner::new(
        1,
        "",
        "Globally disabling the assessment system needs to be confirmed in System Settings.",
    );

    let report = handler(spawner, OutputFormat::Text)
        .run(CommandType::EnableAnySource)
        .await
        .unwrap();

    assert_eq!(report.exit_code, exit_code::NEEDS_CONFIRMATION);
    assert!(report.output.contains("x-apple.systempreferences:"));
}

#[tokio::test]
async fn test_failure_shows_hint() {
    let spawner = CannedSpawner::new(1, "", "Operation not permitted");

    let report = handler(spawner, OutputFormat::Text)
        .run(CommandType::EnableAnySource)
        .await
        .unwrap();

    assert_eq!(report.exit_code, exit_code::FAILURE);
    assert!(report.output.contains("Operation not permitted"));
    assert!(report.output.contains("Privacy & Security"));
}

#[tokio::test]
async fn test_status_json() {
    let spawner = CannedSpawner::new(0, "assessments enabled\n", "");

    let report = handler(spawner, OutputFormat::Json)
        .run(CommandType::Status)
        .await
        .unwrap();

    assert_eq!(report.exit_code, exit_code::SUCCESS);
    let value: serde_json::Value = serde_json::from_str(&report.output).unwrap();
    assert_eq!(value["status"], "success");
    assert_eq!(value["gatekeeper"], "Enabled");
}

#[tokio::test]
async fn test_fix_app_bad_path_fails_before_prompt() {
    struct NoPassword;
    impl CredentialSource for NoPassword {
        fn obtain(&self, _prompt: &str) -> CLIResult<Credential> {
            panic!("password must not be requested for an invalid path");
        }
    }

    let spawner = CannedSpawner::new(0, "", "");
    let err = handler(spawner.clone(), OutputFormat::Text)
        .with_credentials(Box::new(NoPassword))
        .run(CommandType::FixApp("/nonexistent/Foo.app".into()))
        .await
        .unwrap_err();

    assert_eq!(error_exit_code(&err), exit_code::INVALID);
    assert_eq!(spawner.spawned(), 0);
}

#[tokio::test]
async fn test_empty_password_is_invalid_input() {
    let spawner = CannedSpawner::new(0, "", "");
    let err = handler(spawner.clone(), OutputFormat::Text)
        .with_credentials(Box::new(FixedPassword("")))
        .run(CommandType::RestoreGatekeeper)
        .await
        .unwrap_err();

    assert_eq!(error_exit_code(&err), exit_code::INVALID);
    assert_eq!(spawner.spawned(), 0);
}

#[tokio::test]
async fn test_fix_app_success() {
    let dir = tempfile::tempdir().unwrap();
    let bundle = dir.path().join("Foo.app");
    std::fs::create_dir(&bundle).unwrap();

    let spawner = CannedSpawner::new(0, "", "");
    let report = handler(spawner.clone(), OutputFormat::Text)
        .run(CommandType::FixApp(bundle))
        .await
        .unwrap();

    assert_eq!(report.exit_code, exit_code::SUCCESS);
    assert!(report.output.contains("Foo"));
    assert_eq!(spawner.spawned(), 1);
}
