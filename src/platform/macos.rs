// macOS platform implementation

mod security;

// Re-export security functions for external use
pub use security::{
    open_settings_page, parse_gatekeeper_status, GatekeeperState, MaintenanceCommands,
    QUARANTINE_ATTRIBUTE,
};
