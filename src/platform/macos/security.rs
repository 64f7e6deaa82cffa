// macOS security maintenance: Gatekeeper toggles and quarantine removal

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::{Command, Stdio};

use crate::command_execution::{CommandError, CommandResult, CommandSpec};

/// Extended attribute applied to downloaded files
pub const QUARANTINE_ATTRIBUTE: &str = "com.apple.quarantine";

/// Programs used to build maintenance commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceCommands {
    pub spctl: String,
    pub xattr: String,
    pub open: String,
    pub quarantine_attribute: String,
}

impl Default for MaintenanceCommands {
    fn default() -> Self {
        Self {
            spctl: "spctl".to_string(),
            xattr: "xattr".to_string(),
            open: "open".to_string(),
            quarantine_attribute: QUARANTINE_ATTRIBUTE.to_string(),
        }
    }
}

impl MaintenanceCommands {
    /// Allow apps from anywhere (`spctl --global-disable`)
    pub fn global_disable(&self) -> CommandSpec {
        CommandSpec::new(&self.spctl).arg("--global-disable").elevated()
    }

    /// Restore the default Gatekeeper policy (`spctl --global-enable`)
    pub fn global_enable(&self) -> CommandSpec {
        CommandSpec::new(&self.spctl).arg("--global-enable").elevated()
    }

    /// Pre-Sequoia spelling of `--global-disable`
    pub fn master_disable(&self) -> CommandSpec {
        CommandSpec::new(&self.spctl).arg("--master-disable").elevated()
    }

    /// Pre-Sequoia spelling of `--global-enable`
    pub fn master_enable(&self) -> CommandSpec {
        CommandSpec::new(&self.spctl).arg("--master-enable").elevated()
    }

    /// Query assessment status; no elevation needed
    pub fn status(&self) -> CommandSpec {
        CommandSpec::new(&self.spctl).arg("--status")
    }

    /// Recursively delete the quarantine attribute from a bundle.
    ///
    /// `bundle` must already have passed `validate_app_bundle`, which rejects
    /// paths that are not valid UTF-8.
    pub fn remove_quarantine(&self, bundle: &Path) -> CommandSpec {
        CommandSpec::new(&self.xattr)
            .args(["-r", "-d"])
            .arg(&self.quarantine_attribute)
            .arg(bundle.to_string_lossy())
            .elevated()
    }

    /// Open a URI with the default handler
    pub fn open_uri(&self, uri: &str) -> CommandSpec {
        CommandSpec::new(&self.open).arg(uri)
    }
}

/// Gatekeeper assessment state as reported by `spctl --status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatekeeperState {
    Enabled,
    Disabled,
    Unknown,
}

/// Parse `spctl --status` output ("assessments enabled" / "assessments disabled")
pub fn parse_gatekeeper_status(output: &str) -> GatekeeperState {
    let output = output.to_lowercase();
    if output.contains("assessments disabled") {
        GatekeeperState::Disabled
    } else if output.contains("assessments enabled") {
        GatekeeperState::Enabled
    } else {
        GatekeeperState::Unknown
    }
}

/// Launch the settings deep link without waiting for it.
///
/// Only a failure to start `open` is reported; what happens afterwards is
/// not observed.
pub fn open_settings_page(commands: &MaintenanceCommands, uri: &str) -> CommandResult<()> {
    let spec = commands.open_uri(uri);
    log::info!("Opening {}", uri);

    let mut child = Command::new(spec.program())
        .args(spec.arguments())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| CommandError::platform_error(format!("Failed to run {}: {}", spec.program(), e)))?;

    // Reap the child in the background so it does not linger as a zombie.
    std::thread::spawn(move || {
        let _ = child.wait();
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gatekeeper_commands() {
        let commands = MaintenanceCommands::default();

        let disable = commands.global_disable();
        assert_eq!(disable.argv(), vec!["spctl", "--global-disable"]);
        assert!(disable.requires_elevation());

        assert_eq!(commands.global_enable().arguments(), ["--global-enable"]);
        assert_eq!(commands.master_disable().arguments(), ["--master-disable"]);
        assert_eq!(commands.master_enable().arguments(), ["--master-enable"]);

        let status = commands.status();
        assert!(!status.requires_elevation());
        assert_eq!(status.arguments(), ["--status"]);
    }

    #[test]
    fn test_remove_quarantine_keeps_path_as_single_argument() {
        let commands = MaintenanceCommands::default();
        let spec = commands.remove_quarantine(Path::new("/Applications/My \"Odd\" App $(id).app"));
        assert_eq!(
            spec.argv(),
            vec![
                "xattr",
                "-r",
                "-d",
                "com.apple.quarantine",
                "/Applications/My \"Odd\" App $(id).app",
            ]
        );
        assert!(spec.requires_elevation());
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_gatekeeper_status("assessments enabled\n"), GatekeeperState::Enabled);
        assert_eq!(parse_gatekeeper_status("assessments disabled\n"), GatekeeperState::Disabled);
        assert_eq!(parse_gatekeeper_status(""), GatekeeperState::Unknown);
    }

    #[test]
    fn test_open_settings_reports_missing_opener() {
        let commands = MaintenanceCommands {
            open: "definitely-not-an-opener-xyz".to_string(),
            ..MaintenanceCommands::default()
        };
        let err = open_settings_page(&commands, "x-apple.systempreferences:test").unwrap_err();
        assert!(matches!(err, CommandError::PlatformError(_)));
    }
}
