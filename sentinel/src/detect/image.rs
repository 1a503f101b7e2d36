//! Image detector backed by the external classifier.

use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use sentinel_classifier::{ClassifierError, ImageClassifier};

use crate::detect::{Detector, DetectorVerdict};
use crate::types::{ContentSubmission, SentinelError, Severity, Violation, ViolationKind};

/// Default bound on a classifier call.
pub const DEFAULT_IMAGE_TIMEOUT: Duration = Duration::from_secs(3);

/// Image detector.
///
/// Any classifier failure, including a timeout, yields `Failed`, so the
/// image is held for review rather than allowed.
pub struct ImageDetector {
    classifier: Arc<dyn ImageClassifier>,
    timeout: Duration,
}

impl ImageDetector {
    /// Create with the default timeout.
    pub fn new(classifier: Arc<dyn ImageClassifier>) -> Self {
        Self::with_timeout(classifier, DEFAULT_IMAGE_TIMEOUT)
    }

    /// Create with a custom timeout.
    pub fn with_timeout(classifier: Arc<dyn ImageClassifier>, timeout: Duration) -> Self {
        Self { classifier, timeout }
    }

    fn to_sentinel_error(&self, error: ClassifierError) -> SentinelError {
        match error {
            ClassifierError::Timeout { timeout_ms } => SentinelError::DetectorTimeout {
                detector: self.name().to_string(),
                timeout_ms,
            },
            other => SentinelError::DetectorUnavailable {
                detector: self.name().to_string(),
                reason: other.to_string(),
            },
        }
    }
}

#[async_trait::async_trait]
impl Detector for ImageDetector {
    fn name(&self) -> &str {
        "image_detector"
    }

    fn applies_to(&self, submission: &ContentSubmission) -> bool {
        submission.image.is_some()
    }

    async fn evaluate(&self, submission: &ContentSubmission) -> DetectorVerdict {
        let Some(image) = &submission.image else {
            return DetectorVerdict::Safe;
        };

        match tokio::time::timeout(self.timeout, self.classifier.classify(image)).await {
            Ok(Ok(verdict)) if verdict.inappropriate_content => {
                let mut violation = Violation::new(
                    ViolationKind::InappropriateContent,
                    Severity::High,
                    self.name(),
                );
                if let Some(details) = verdict.details {
                    violation = violation.with_details(details);
                }
                DetectorVerdict::Review(vec![violation])
            }
            Ok(Ok(_)) => DetectorVerdict::Safe,
            Ok(Err(e)) => {
                warn!(
                    classifier = self.classifier.id(),
                    error = %e,
                    "Image classifier failed, holding image for review"
                );
                DetectorVerdict::failed(self.name(), self.to_sentinel_error(e))
            }
            Err(_) => {
                let timeout_ms = self.timeout.as_millis() as u64;
                warn!(
                    classifier = self.classifier.id(),
                    timeout_ms = timeout_ms,
                    "Image classifier timed out, holding image for review"
                );
                DetectorVerdict::failed(
                    self.name(),
                    SentinelError::DetectorTimeout {
                        detector: self.name().to_string(),
                        timeout_ms,
                    },
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_classifier::{MockClassifier, MockReply};

    fn image_submission() -> ContentSubmission {
        ContentSubmission::new("u1", "palm-upload").with_image("img://palm/1")
    }

    #[tokio::test]
    async fn test_clean_image() {
        let detector = ImageDetector::new(Arc::new(MockClassifier::clean()));
        let verdict = detector.evaluate(&image_submission()).await;
        assert!(matches!(verdict, DetectorVerdict::Safe));
    }

    #[tokio::test]
    async fn test_flagged_image_is_high() {
        let detector = ImageDetector::new(Arc::new(MockClassifier::flagging("explicit")));
        let outcome = detector.evaluate(&image_submission()).await.into_outcome();

        assert_eq!(outcome.violations.len(), 1);
        let violation = &outcome.violations[0];
        assert_eq!(violation.kind, ViolationKind::InappropriateContent);
        assert_eq!(violation.severity, Severity::High);
        assert_eq!(violation.details.as_deref(), Some("explicit"));
    }

    #[tokio::test]
    async fn test_timeout_fails_restrictive() {
        let detector = ImageDetector::with_timeout(
            Arc::new(MockClassifier::hanging(Duration::from_secs(5))),
            Duration::from_millis(20),
        );
        let verdict = detector.evaluate(&image_submission()).await;
        match &verdict {
            DetectorVerdict::Failed { error, .. } => {
                assert!(matches!(error, SentinelError::DetectorTimeout { timeout_ms: 20, .. }))
            }
            other => panic!("expected failure, got {other:?}"),
        }

        let outcome = verdict.into_outcome();
        assert!(!outcome.safe);
        assert!(outcome.has_kind(ViolationKind::AnalysisError));
    }

    #[tokio::test]
    async fn test_http_error_fails_restrictive() {
        let detector = ImageDetector::new(Arc::new(MockClassifier::with_reply(MockReply::Status(500))));
        let verdict = detector.evaluate(&image_submission()).await;
        assert!(matches!(
            verdict,
            DetectorVerdict::Failed {
                error: SentinelError::DetectorUnavailable { .. },
                ..
            }
        ));
    }
}
