// Platform detection and macOS-specific maintenance commands
//
// Command construction is portable so the catalog can be exercised on any
// host; only running the commands requires macOS.

pub mod detection;
pub mod macos;

pub use detection::{detect_os, detect_macos_version, ensure_supported, OperatingSystem};
