// Configuration management module

use crate::cli::error::{CLIError, CLIResult};
use crate::cli::types::AppConfig;
use std::path::{Path, PathBuf};

/// Validation result
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Create a new validation result
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error
    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        self.valid = false;
    }

    /// Add a warning
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Check if there are any issues (errors or warnings)
    pub fn has_issues(&self) -> bool {
        !self.errors.is_empty() || !self.warnings.is_empty()
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// TOML configuration parser
pub struct TOMLConfigParser {
    config_path: PathBuf,
}

impl TOMLConfigParser {
    /// Create a parser for `config_path`, or the default location
    pub fn new(config_path: Option<PathBuf>) -> CLIResult<Self> {
        let config_path = match config_path {
            Some(path) => path,
            None => default_config_path()?,
        };
        Ok(Self { config_path })
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Parse configuration from TOML string
    pub fn parse_toml(&self, content: &str) -> CLIResult<AppConfig> {
        toml::from_str(content)
            .map_err(|e| CLIError::config(format!("Failed to parse TOML: {}", e)))
    }

    /// Serialize configuration to TOML string
    pub fn serialize_toml(&self, config: &AppConfig) -> CLIResult<String> {
        toml::to_string_pretty(config)
            .map_err(|e| CLIError::config(format!("Failed to serialize to TOML: {}", e)))
    }

    /// Load configuration from file
    pub async fn load(&self) -> CLIResult<AppConfig> {
        if !self.config_path.exists() {
            return Err(CLIError::config(format!(
                "Configuration file not found: {}",
                self.config_path.display()
            )));
        }

        let content = tokio::fs::read_to_string(&self.config_path)
            .await
            .map_err(|e| CLIError::config(format!("Failed to read config file: {}", e)))?;

        self.parse_toml(&content)
    }

    /// Validate configuration
    pub fn validate(&self, config: &AppConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        let programs = [
            ("tools.elevation_program", &config.tools.elevation_program),
            ("tools.spctl_program", &config.tools.spctl_program),
            ("tools.xattr_program", &config.tools.xattr_program),
            ("tools.open_program", &config.tools.open_program),
        ];
        for (key, value) in programs {
            if value.trim().is_empty() {
                result.add_error(format!("{} must not be empty", key));
            } else if value.chars().any(char::is_whitespace) {
                result.add_warning(format!(
                    "{} '{}' contains whitespace; it is run as a single program name, not a shell line",
                    key, value
                ));
            }
        }

        if config.tools.quarantine_attribute.trim().is_empty() {
            result.add_error("tools.quarantine_attribute must not be empty");
        }

        let classification = &config.classification;
        if classification.confirmation_phrases.iter().all(|p| p.trim().is_empty()) {
            result.add_error(
                "classification.confirmation_phrases must contain at least one phrase",
            );
        }
        if classification.missing_attribute_marker.trim().is_empty() {
            result.add_warning(
                "classification.missing_attribute_marker is empty; already-clean bundles will be reported as failures",
            );
        }
        if !classification.settings_uri.contains(':') {
            result.add_warning(format!(
                "classification.settings_uri '{}' does not look like a URI",
                classification.settings_uri
            ));
        }

        if config.dispatcher.queue_capacity == Some(0) {
            result.add_warning(
                "dispatcher.queue_capacity = 0 rejects every request while one is running",
            );
        }

        result
    }

    /// Generate default configuration file with comments
    pub fn generate_default_with_comments() -> String {
        format!(
            r#"# macrepair configuration
# Every key is optional; missing keys fall back to the values shown here.

# Output format for results
# Options: text, json
output_format = "text"

# Open System Settings automatically when an operation needs confirmation
auto_open_settings = true

[tools]
# Program used to run commands with administrator rights
elevation_program = "sudo"
spctl_program = "spctl"
xattr_program = "xattr"
open_program = "open"
quarantine_attribute = "{quarantine}"

[classification]
# Case-insensitive phrases meaning the change must be confirmed in System Settings
confirmation_phrases = [
{phrases}]

# stderr text from xattr when the attribute is already absent.
# This is English tool output; adjust it for other system languages.
missing_attribute_marker = "{marker}"

settings_uri = "{uri}"

[dispatcher]
# How many requests may wait behind the running one (unset = unbounded)
# queue_capacity = 4
"#,
            quarantine = crate::platform::macos::QUARANTINE_ATTRIBUTE,
            phrases = crate::command_execution::DEFAULT_CONFIRMATION_PHRASES
                .iter()
                .map(|p| format!("    \"{}\",\n", p))
                .collect::<String>(),
            marker = crate::command_execution::DEFAULT_MISSING_ATTRIBUTE_MARKER,
            uri = crate::command_execution::PRIVACY_SECURITY_URL,
        )
    }
}

/// Get default configuration file path
pub fn default_config_path() -> CLIResult<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| CLIError::config("Could not determine config directory"))?;

    Ok(config_dir.join("macrepair").join("config.toml"))
}

/// Load configuration from `path` (or the default location).
///
/// A missing file yields the defaults. An explicitly given path must exist.
pub async fn load_config(path: Option<PathBuf>) -> CLIResult<AppConfig> {
    let explicit = path.is_some();
    let parser = TOMLConfigParser::new(path)?;

    let config = if parser.path().exists() {
        parser.load().await?
    } else if explicit {
        return Err(CLIError::config(format!(
            "Configuration file not found: {}",
            parser.path().display()
        )));
    } else {
        log::debug!("No configuration at {}, using defaults", parser.path().display());
        AppConfig::default()
    };

    let validation = parser.validate(&config);
    if !validation.is_valid() {
        return Err(CLIError::config(format!(
            "Configuration validation failed:\n{}",
            validation.errors.join("\n")
        )));
    }
    for warning in &validation.warnings {
        log::warn!("Configuration: {}", warning);
    }

    Ok(config)
}

/// Write the commented default configuration, refusing to overwrite unless `force`
pub async fn init_config(path: Option<PathBuf>, force: bool) -> CLIResult<PathBuf> {
    let parser = TOMLConfigParser::new(path)?;

    if parser.path().exists() && !force {
        return Err(CLIError::config(format!(
            "Configuration file already exists: {} (use --force to overwrite)",
            parser.path().display()
        )));
    }

    if let Some(parent) = parser.path().parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CLIError::config(format!("Failed to create config directory: {}", e)))?;
    }

    tokio::fs::write(parser.path(), TOMLConfigParser::generate_default_with_comments())
        .await
        .map_err(|e| CLIError::config(format!("Failed to write config file: {}", e)))?;

    log::info!("Wrote default configuration to {}", parser.path().display());
    Ok(parser.path().to_path_buf())
}
