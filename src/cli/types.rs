// Core CLI data structures and types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::command_execution::{
    Classifier, DispatcherConfig, MaintenanceSettings, PhraseTable, DEFAULT_CONFIRMATION_PHRASES,
    DEFAULT_GUIDANCE, DEFAULT_MISSING_ATTRIBUTE_MARKER, PRIVACY_SECURITY_URL,
};
use crate::platform::macos::{MaintenanceCommands, QUARANTINE_ATTRIBUTE};

/// CLI configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Output format for results
    #[serde(default)]
    pub output_format: OutputFormat,
    /// Launch the settings page when an operation needs confirmation
    #[serde(default = "default_true")]
    pub auto_open_settings: bool,
    #[serde(default)]
    pub tools: ToolSettings,
    #[serde(default)]
    pub classification: ClassificationSettings,
    #[serde(default)]
    pub dispatcher: DispatcherSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Text,
            auto_open_settings: true,
            tools: ToolSettings::default(),
            classification: ClassificationSettings::default(),
            dispatcher: DispatcherSettings::default(),
        }
    }
}

impl AppConfig {
    /// Assemble the maintenance core settings from this configuration
    pub fn maintenance_settings(&self) -> MaintenanceSettings {
        let classifier = Classifier::new(PhraseTable::new(
            self.classification.confirmation_phrases.iter().cloned(),
        ))
        .with_guidance(&self.classification.guidance)
        .with_settings_uri(&self.classification.settings_uri)
        .with_missing_attribute_marker(&self.classification.missing_attribute_marker);

        MaintenanceSettings {
            commands: MaintenanceCommands {
                spctl: self.tools.spctl_program.clone(),
                xattr: self.tools.xattr_program.clone(),
                open: self.tools.open_program.clone(),
                quarantine_attribute: self.tools.quarantine_attribute.clone(),
            },
            classifier,
            dispatcher: DispatcherConfig {
                queue_capacity: self.dispatcher.queue_capacity,
            },
            elevation_program: Some(self.tools.elevation_program.clone()),
        }
    }
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("Unknown output format '{}'. Valid options: text, json", other)),
        }
    }
}

/// External programs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSettings {
    #[serde(default = "default_elevation_program")]
    pub elevation_program: String,
    #[serde(default = "default_spctl_program")]
    pub spctl_program: String,
    #[serde(default = "default_xattr_program")]
    pub xattr_program: String,
    #[serde(default = "default_open_program")]
    pub open_program: String,
    #[serde(default = "default_quarantine_attribute")]
    pub quarantine_attribute: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            elevation_program: default_elevation_program(),
            spctl_program: default_spctl_program(),
            xattr_program: default_xattr_program(),
            open_program: default_open_program(),
            quarantine_attribute: default_quarantine_attribute(),
        }
    }
}

/// Outcome classification tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationSettings {
    /// Case-insensitive substrings that mean "confirm in System Settings"
    #[serde(default = "default_confirmation_phrases")]
    pub confirmation_phrases: Vec<String>,
    /// stderr marker for an already-absent attribute (English tool output)
    #[serde(default = "default_missing_attribute_marker")]
    pub missing_attribute_marker: String,
    #[serde(default = "default_settings_uri")]
    pub settings_uri: String,
    #[serde(default = "default_guidance")]
    pub guidance: String,
}

impl Default for ClassificationSettings {
    fn default() -> Self {
        Self {
            confirmation_phrases: default_confirmation_phrases(),
            missing_attribute_marker: default_missing_attribute_marker(),
            settings_uri: default_settings_uri(),
            guidance: default_guidance(),
        }
    }
}

/// Dispatcher queue policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DispatcherSettings {
    /// Tasks allowed to wait behind the running one; unset means unbounded
    #[serde(default)]
    pub queue_capacity: Option<usize>,
}

/// Parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: CommandType,
    pub config_file: Option<PathBuf>,
    pub output_format: Option<OutputFormat>,
    pub verbosity: u8,
    pub no_open: bool,
}

/// Subcommands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandType {
    EnableAnySource,
    RestoreGatekeeper,
    Status,
    OpenSettings,
    FixApp(PathBuf),
    LegacyDisable,
    LegacyEnable,
    ConfigShow,
    ConfigInit { force: bool },
    ConfigPath,
}

impl CommandType {
    /// Whether the command runs macOS tools (and so needs a macOS host)
    pub fn needs_macos(&self) -> bool {
        !matches!(self, Self::ConfigShow | Self::ConfigInit { .. } | Self::ConfigPath)
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_elevation_program() -> String {
    "sudo".to_string()
}

fn default_spctl_program() -> String {
    "spctl".to_string()
}

fn default_xattr_program() -> String {
    "xattr".to_string()
}

fn default_open_program() -> String {
    "open".to_string()
}

fn default_quarantine_attribute() -> String {
    QUARANTINE_ATTRIBUTE.to_string()
}

fn default_confirmation_phrases() -> Vec<String> {
    DEFAULT_CONFIRMATION_PHRASES.iter().map(|s| s.to_string()).collect()
}

fn default_missing_attribute_marker() -> String {
    DEFAULT_MISSING_ATTRIBUTE_MARKER.to_string()
}

fn default_settings_uri() -> String {
    PRIVACY_SECURITY_URL.to_string()
}

fn default_guidance() -> String {
    DEFAULT_GUIDANCE.to_string()
}
