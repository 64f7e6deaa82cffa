// Outcome classification
//
// Maps a raw ExecutionResult to Success / NeedsConfirmation / Failure. The
// classifier only returns values; opening the settings page is left to the
// caller through the FollowUp carried by NeedsConfirmation.

use serde::{Deserialize, Serialize};

use crate::command_execution::types::{ExecutionResult, FailureKind, FollowUp, Outcome};

/// Privacy & Security pane in System Settings
pub const PRIVACY_SECURITY_URL: &str =
    "x-apple.systempreferences:com.apple.settings.PrivacySecurity";

/// Known prompts printed by `spctl` when a global toggle must be confirmed in
/// System Settings (macOS 15 and later)
pub const DEFAULT_CONFIRMATION_PHRASES: &[&str] = &[
    "Globally disabling the assessment system needs to be confirmed in System Settings.",
    "This operation is no longer supported",
];

/// stderr marker printed by `xattr -d` when the attribute is already absent.
///
/// English-only: localized tool output will not match and falls through to
/// the regular classification.
pub const DEFAULT_MISSING_ATTRIBUTE_MARKER: &str = "No such xattr";

pub const DEFAULT_GUIDANCE: &str = "Gatekeeper was asked to allow apps from anywhere, \
but macOS requires you to confirm this in System Settings:\n\n\
1) The Privacy & Security page has been opened for you.\n\
2) Scroll to the bottom and set \"Allow applications downloaded from\" to \"Anywhere\".\n\
3) If the option is missing, switch to another pane and back, or restart System Settings.\n\n\
Afterwards check the Gatekeeper status; it should report \"assessments disabled\".";

/// Case-insensitive substring table of confirmation prompts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct PhraseTable {
    phrases: Vec<String>,
    #[serde(skip)]
    lowered: Vec<String>,
}

impl PhraseTable {
    /// Build a table; blank phrases are dropped since they would match anything
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let phrases: Vec<String> = phrases
            .into_iter()
            .map(Into::into)
            .filter(|phrase: &String| !phrase.trim().is_empty())
            .collect();
        let lowered = phrases.iter().map(|phrase| phrase.to_lowercase()).collect();
        Self { phrases, lowered }
    }

    /// Add a phrase for a new OS wording
    pub fn with_phrase(self, phrase: impl Into<String>) -> Self {
        let mut phrases = self.phrases;
        phrases.push(phrase.into());
        Self::new(phrases)
    }

    /// First phrase contained in `text`, ignoring case
    pub fn find_in(&self, text: &str) -> Option<&str> {
        let haystack = text.to_lowercase();
        self.lowered
            .iter()
            .position(|phrase| haystack.contains(phrase.as_str()))
            .map(|index| self.phrases[index].as_str())
    }

    pub fn matches(&self, text: &str) -> bool {
        self.find_in(text).is_some()
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.phrases.iter().map(String::as_str)
    }
}

impl Default for PhraseTable {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIRMATION_PHRASES.iter().copied())
    }
}

impl From<Vec<String>> for PhraseTable {
    fn from(phrases: Vec<String>) -> Self {
        Self::new(phrases)
    }
}

impl From<PhraseTable> for Vec<String> {
    fn from(table: PhraseTable) -> Self {
        table.phrases
    }
}

/// Per-operation wording and policy used while classifying
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationProfile {
    pub title: String,
    pub success_message: String,
    /// Message for an idempotent removal whose target was already absent.
    /// `None` disables the missing-attribute override.
    pub noop_message: Option<String>,
}

impl OperationProfile {
    pub fn new(title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            success_message: format!("{} completed successfully", title),
            title,
            noop_message: None,
        }
    }

    pub fn with_success_message(mut self, message: impl Into<String>) -> Self {
        self.success_message = message.into();
        self
    }

    /// Treat "attribute already absent" as success with this message
    pub fn idempotent_removal(mut self, noop_message: impl Into<String>) -> Self {
        self.noop_message = Some(noop_message.into());
        self
    }
}

/// Side-effect-free classifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
    phrases: PhraseTable,
    guidance: String,
    settings_uri: String,
    missing_attribute_marker: String,
}

impl Classifier {
    pub fn new(phrases: PhraseTable) -> Self {
        Self {
            phrases,
            guidance: DEFAULT_GUIDANCE.to_string(),
            settings_uri: PRIVACY_SECURITY_URL.to_string(),
            missing_attribute_marker: DEFAULT_MISSING_ATTRIBUTE_MARKER.to_string(),
        }
    }

    pub fn with_guidance(mut self, guidance: impl Into<String>) -> Self {
        self.guidance = guidance.into();
        self
    }

    pub fn with_settings_uri(mut self, uri: impl Into<String>) -> Self {
        self.settings_uri = uri.into();
        self
    }

    pub fn with_missing_attribute_marker(mut self, marker: impl Into<String>) -> Self {
        self.missing_attribute_marker = marker.into();
        self
    }

    pub fn phrases(&self) -> &PhraseTable {
        &self.phrases
    }

    pub fn settings_uri(&self) -> &str {
        &self.settings_uri
    }

    /// Classify a raw result for the given operation
    pub fn classify(&self, result: &ExecutionResult, profile: &OperationProfile) -> Outcome {
        if let Some(reason) = &result.transport_failure {
            return Outcome::Failure {
                kind: FailureKind::Transport,
                message: format!("{} could not be started: {}", profile.title, reason),
                stdout: result.stdout.clone(),
                stderr: result.stderr.clone(),
            };
        }

        if result.exit_code == 0 {
            return Outcome::Success {
                message: profile.success_message.clone(),
                stdout: result.stdout.clone(),
                stderr: result.stderr.clone(),
            };
        }

        if let Some(noop_message) = &profile.noop_message {
            if !self.missing_attribute_marker.is_empty()
                && result.stderr.contains(&self.missing_attribute_marker)
            {
                log::debug!("{}: target attribute already absent", profile.title);
                return Outcome::Success {
                    message: noop_message.clone(),
                    stdout: result.stdout.clone(),
                    stderr: result.stderr.clone(),
                };
            }
        }

        if let Some(phrase) = self.phrases.find_in(&result.combined_output()) {
            log::info!("{} needs confirmation in System Settings ({:?})", profile.title, phrase);
            return Outcome::NeedsConfirmation {
                guidance: self.guidance.clone(),
                follow_up: FollowUp::OpenSettings(self.settings_uri.clone()),
            };
        }

        Outcome::Failure {
            kind: FailureKind::Exited(result.exit_code),
            message: format!("{} failed (exit code {})", profile.title, result.exit_code),
            stdout: result.stdout.clone(),
            stderr: result.stderr.clone(),
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(PhraseTable::default())
    }
}

/// Classify with default wording and no idempotent-removal override
pub fn classify(result: &ExecutionResult, phrases: &PhraseTable) -> Outcome {
    Classifier::new(phrases.clone()).classify(result, &OperationProfile::new("Command"))
}
