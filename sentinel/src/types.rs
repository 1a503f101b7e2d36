//! Core types for the Sentinel pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use sentinel_classifier::ImageRef;

/// Ordinal rank of how serious a single violation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    None = 0,
    Low = 1,
    Medium = 2,
    High = 3,
    Critical = 4,
}

impl Severity {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Self::None
    }
}

/// Ordinal rank of the system's response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Allow = 0,
    Warn = 1,
    Remove = 2,
    Suspend = 3,
    Ban = 4,
}

impl Action {
    /// Recommended action for a severity. Monotone in `severity`.
    pub fn for_severity(severity: Severity) -> Self {
        match severity {
            Severity::None => Action::Allow,
            Severity::Low => Action::Warn,
            Severity::Medium => Action::Remove,
            Severity::High => Action::Suspend,
            Severity::Critical => Action::Ban,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Allow => "allow",
            Action::Warn => "warn",
            Action::Remove => "remove",
            Action::Suspend => "suspend",
            Action::Ban => "ban",
        }
    }
}

impl Default for Action {
    fn default() -> Self {
        Self::Allow
    }
}

/// Category of a safety violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Indicators of self-harm or suicidal intent
    SelfHarm,
    /// Threats of violence against others
    ViolenceThreat,
    /// Sexual, explicit or otherwise inappropriate content
    InappropriateContent,
    /// Extremist or terrorist content
    ExtremistContent,
    /// Analysis could not complete; content held for review
    AnalysisError,
}

impl ViolationKind {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::SelfHarm => "self_harm",
            ViolationKind::ViolenceThreat => "violence_threat",
            ViolationKind::InappropriateContent => "inappropriate_content",
            ViolationKind::ExtremistContent => "extremist_content",
            ViolationKind::AnalysisError => "analysis_error",
        }
    }

    /// Whether this kind reflects user conduct (and so counts towards escalation).
    pub fn is_conduct(&self) -> bool {
        !matches!(self, ViolationKind::AnalysisError)
    }
}

/// A single finding from a detector. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// Violation category
    pub kind: ViolationKind,
    /// How serious this finding is
    pub severity: Severity,
    /// Indicator phrases that matched
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indicators: Vec<String>,
    /// Additional details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Detector that produced the finding
    pub source: String,
}

impl Violation {
    /// Create a new violation.
    pub fn new(kind: ViolationKind, severity: Severity, source: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            indicators: vec![],
            details: None,
            source: source.into(),
        }
    }

    /// Attach matched indicators.
    pub fn with_indicators(mut self, indicators: Vec<String>) -> Self {
        self.indicators = indicators;
        self
    }

    /// Attach details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// One user action to be checked. Not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSubmission {
    /// Submitting user
    pub user_id: String,
    /// UI component the content came from
    pub component: String,
    /// Free text, if any
    #[serde(default)]
    pub text: Option<String>,
    /// Uploaded image, if any
    #[serde(default)]
    pub image: Option<ImageRef>,
    /// When the submission was made
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl ContentSubmission {
    /// Create an empty submission for a user and component.
    pub fn new(user_id: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            component: component.into(),
            text: None,
            image: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a text submission.
    pub fn text(
        user_id: impl Into<String>,
        component: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self::new(user_id, component).with_text(text)
    }

    /// Set the text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the image.
    pub fn with_image(mut self, image: impl Into<ImageRef>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Reject empty or malformed submissions before any detector runs.
    pub fn validate(&self, max_text_chars: usize) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(SentinelError::Validation("user id is empty".to_string()));
        }
        if self.component.trim().is_empty() {
            return Err(SentinelError::Validation("component is empty".to_string()));
        }
        if let Some(image) = &self.image {
            if image.is_blank() {
                return Err(SentinelError::Validation(
                    "image reference is empty".to_string(),
                ));
            }
        }
        match (&self.text, &self.image) {
            (None, None) => {
                return Err(SentinelError::Validation(
                    "submission has neither text nor image".to_string(),
                ))
            }
            (Some(text), None) if text.trim().is_empty() => {
                return Err(SentinelError::Validation("text is blank".to_string()))
            }
            _ => {}
        }
        if let Some(text) = &self.text {
            let chars = text.chars().count();
            if chars > max_text_chars {
                return Err(SentinelError::Validation(format!(
                    "text is {} chars, limit is {}",
                    chars, max_text_chars
                )));
            }
        }
        Ok(())
    }
}

/// Result of analysing one submission with one or more detectors.
///
/// Invariants: `safe == violations.is_empty()`, `severity` is the maximum
/// violation severity (`None` when empty), and `action` is at least
/// `Action::for_severity(severity)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    /// Whether no violation was found
    pub safe: bool,
    /// All findings
    pub violations: Vec<Violation>,
    /// Maximum severity
    pub severity: Severity,
    /// Recommended action
    pub action: Action,
}

impl AnalysisOutcome {
    /// The identity outcome: nothing found.
    pub fn safe() -> Self {
        Self {
            safe: true,
            violations: vec![],
            severity: Severity::None,
            action: Action::Allow,
        }
    }

    /// Build an outcome from findings, deriving severity and action.
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        let severity = violations
            .iter()
            .map(|v| v.severity)
            .max()
            .unwrap_or(Severity::None);
        Self {
            safe: violations.is_empty(),
            action: Action::for_severity(severity),
            severity,
            violations,
        }
    }

    /// Whether any finding has this kind.
    pub fn has_kind(&self, kind: ViolationKind) -> bool {
        self.violations.iter().any(|v| v.kind == kind)
    }

    /// Distinct kinds present, in first-seen order.
    pub fn kinds(&self) -> Vec<ViolationKind> {
        let mut kinds = Vec::new();
        for violation in &self.violations {
            if !kinds.contains(&violation.kind) {
                kinds.push(violation.kind);
            }
        }
        kinds
    }

    /// Check the type invariants.
    pub fn is_consistent(&self) -> bool {
        let max = self
            .violations
            .iter()
            .map(|v| v.severity)
            .max()
            .unwrap_or(Severity::None);
        self.safe == self.violations.is_empty()
            && self.severity == max
            && self.action >= Action::for_severity(self.severity)
    }
}

impl Default for AnalysisOutcome {
    fn default() -> Self {
        Self::safe()
    }
}

/// Error types for Sentinel.
#[derive(Debug, thiserror::Error)]
pub enum SentinelError {
    /// Submission rejected before detection
    #[error("Validation error: {0}")]
    Validation(String),

    /// A detector's collaborator did not answer in time
    #[error("Detector timeout: {detector} after {timeout_ms}ms")]
    DetectorTimeout { detector: String, timeout_ms: u64 },

    /// A detector's collaborator could not be reached
    #[error("Detector unavailable: {detector}: {reason}")]
    DetectorUnavailable { detector: String, reason: String },

    /// Merged outcome broke its invariants
    #[error("Aggregation inconsistency: {0}")]
    AggregationInconsistency(String),

    /// Audit sink failure
    #[error("Audit error: {0}")]
    Audit(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SentinelError>;
