//! Core traits for image-safety classifiers.
//!
//! This module defines the `ImageClassifier` trait - the abstraction over
//! whatever service decides whether an uploaded image is appropriate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Error types for classifier calls.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// The call did not complete in time
    #[error("Classifier timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The service could not be reached
    #[error("Classifier unavailable: {0}")]
    Unavailable(String),

    /// Rate limited by the service
    #[error("Rate limited, retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    /// Non-success HTTP status
    #[error("Request failed: HTTP {status}: {body}")]
    RequestFailed { status: u16, body: String },

    /// Response body did not match the contract
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl ClassifierError {
    /// Whether the failure was a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClassifierError::Timeout { .. })
    }
}

/// Reference to an uploaded image (URL or data URI).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(pub String);

impl ImageRef {
    /// Create a new image reference.
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Get the raw reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the reference is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for ImageRef {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ImageRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Verdict returned by the classification service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageVerdict {
    /// Whether the image was judged inappropriate
    pub inappropriate_content: bool,
    /// Free-form details from the service
    #[serde(default, deserialize_with = "details_as_string")]
    pub details: Option<String>,
}

impl ImageVerdict {
    /// A clean verdict.
    pub fn clean() -> Self {
        Self {
            inappropriate_content: false,
            details: None,
        }
    }

    /// An inappropriate verdict with details.
    pub fn inappropriate(details: impl Into<String>) -> Self {
        Self {
            inappropriate_content: true,
            details: Some(details.into()),
        }
    }
}

/// The service may send `details` as a string or as structured JSON.
fn details_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Core trait for image-safety classifiers.
#[async_trait]
pub trait ImageClassifier: Send + Sync {
    /// Get the classifier identifier.
    fn id(&self) -> &str;

    /// Classify an image.
    async fn classify(&self, image: &ImageRef) -> Result<ImageVerdict, ClassifierError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_wire_format() {
        let verdict: ImageVerdict = serde_json::from_str(
            r#"{"inappropriateContent": true, "details": "nudity"}"#,
        )
        .unwrap();
        assert!(verdict.inappropriate_content);
        assert_eq!(verdict.details.as_deref(), Some("nudity"));
    }

    #[test]
    fn test_structured_details() {
        let verdict: ImageVerdict = serde_json::from_str(
            r#"{"inappropriateContent": false, "details": {"score": 0.1}}"#,
        )
        .unwrap();
        assert!(!verdict.inappropriate_content);
        assert_eq!(verdict.details.as_deref(), Some(r#"{"score":0.1}"#));
    }

    #[test]
    fn test_missing_details() {
        let verdict: ImageVerdict =
            serde_json::from_str(r#"{"inappropriateContent": false}"#).unwrap();
        assert_eq!(verdict, ImageVerdict::clean());
    }

    #[test]
    fn test_image_ref_blank() {
        assert!(ImageRef::new("  ").is_blank());
        assert!(!ImageRef::from("https://cdn.example/palm.jpg").is_blank());
    }
}
