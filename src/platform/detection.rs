// Platform detection

use crate::command_execution::error::{CommandError, CommandResult};

/// Host operating system family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingSystem {
    MacOS,
    Linux,
    Windows,
    Other,
}

/// Detect the operating system this binary was built for
pub fn detect_os() -> OperatingSystem {
    if cfg!(target_os = "macos") {
        OperatingSystem::MacOS
    } else if cfg!(target_os = "linux") {
        OperatingSystem::Linux
    } else if cfg!(target_os = "windows") {
        OperatingSystem::Windows
    } else {
        OperatingSystem::Other
    }
}

/// Fail unless running on macOS; the maintenance tools only exist there
pub fn ensure_supported() -> CommandResult<()> {
    match detect_os() {
        OperatingSystem::MacOS => Ok(()),
        other => Err(CommandError::platform_error(format!(
            "This tool only supports macOS (detected {:?})",
            other
        ))),
    }
}

/// Product version reported by `sw_vers`, e.g. "15.1"
pub fn detect_macos_version() -> Option<String> {
    use std::process::Command;

    let output = Command::new("sw_vers").arg("-productVersion").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if version.is_empty() {
        None
    } else {
        Some(version)
    }
}
