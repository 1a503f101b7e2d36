//! Configuration for the Sentinel pipeline.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::escalation::DEFAULT_REPEAT_OFFENSE_LIMIT;
use crate::types::{Result, SentinelError};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelConfig {
    /// Detector configuration
    pub detection: DetectionConfig,
    /// Image classifier configuration
    pub classifier: ClassifierConfig,
    /// Escalation configuration
    pub escalation: EscalationConfig,
    /// Audit configuration
    pub audit: AuditConfig,
    /// General settings
    pub general: GeneralConfig,
}

impl SentinelConfig {
    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> std::result::Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Load and validate a YAML file.
    pub async fn load(path: &str) -> Result<Self> {
        let yaml = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SentinelError::Config(format!("{}: {}", path, e)))?;
        let config = Self::from_yaml(&yaml)
            .map_err(|e| SentinelError::Config(format!("{}: {}", path, e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if !self.detection.text_enabled && !self.detection.image_enabled {
            return Err(SentinelError::Config(
                "at least one of text or image detection must be enabled".to_string(),
            ));
        }
        if self.detection.image_timeout_ms == 0 {
            return Err(SentinelError::Config(
                "detection.image_timeout_ms must be positive".to_string(),
            ));
        }
        if self.detection.max_text_chars == 0 {
            return Err(SentinelError::Config(
                "detection.max_text_chars must be positive".to_string(),
            ));
        }
        if self.escalation.repeat_offense_limit == 0 {
            return Err(SentinelError::Config(
                "escalation.repeat_offense_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Detector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Run the text detector
    pub text_enabled: bool,
    /// Run the image detector
    pub image_enabled: bool,
    /// Bound on one classifier call (ms)
    pub image_timeout_ms: u64,
    /// Longest accepted text
    pub max_text_chars: usize,
}

impl DetectionConfig {
    /// Image timeout as a duration.
    pub fn image_timeout(&self) -> Duration {
        Duration::from_millis(self.image_timeout_ms)
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            text_enabled: true,
            image_enabled: true,
            image_timeout_ms: 3000,
            max_text_chars: 10_000,
        }
    }
}

/// Image classifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Classification endpoint URL
    pub endpoint: Option<String>,
    /// Bearer token
    pub api_key: Option<String>,
    /// HTTP request timeout (ms)
    pub timeout_ms: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_ms: 3000,
        }
    }
}

/// Escalation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    /// Inappropriate-content offenses before suspension
    pub repeat_offense_limit: u32,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            repeat_offense_limit: DEFAULT_REPEAT_OFFENSE_LIMIT,
        }
    }
}

/// Audit configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Enable audit logging
    pub enabled: bool,
    /// Retained records for the in-memory sink
    pub max_entries: usize,
    /// JSON-lines file; in-memory sink when unset
    pub path: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10_000,
            path: None,
        }
    }
}

/// General configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
