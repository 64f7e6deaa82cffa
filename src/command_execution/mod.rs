// Command Execution Module
//
// This module provides the privileged command core: literal-argv execution
// with stdin-delivered credentials, outcome classification, and a single-slot
// dispatcher that keeps the caller responsive.

pub mod api;
pub mod classifier;
pub mod credential;
pub mod dispatcher;
pub mod error;
pub mod platform;
pub mod types;

// Re-export main types and traits
pub use api::{MaintenanceApi, MaintenanceSettings};
pub use classifier::{
    classify, Classifier, OperationProfile, PhraseTable, DEFAULT_CONFIRMATION_PHRASES,
    DEFAULT_GUIDANCE, DEFAULT_MISSING_ATTRIBUTE_MARKER, PRIVACY_SECURITY_URL,
};
pub use credential::{is_credential_non_empty, Credential};
pub use dispatcher::{Completions, Dispatcher, DispatcherConfig, Operation};
pub use error::{CommandError, CommandResult, ValidationError};
pub use platform::{
    app_name, validate_app_bundle, validate_path, CommandExecutor, ProcessSpawner, RawOutput,
    SystemSpawner,
};
pub use types::*;
