//! Content detectors.
//!
//! Each detector inspects one aspect of a submission:
//! - **Text**: indicator-phrase scan over the lowercased text
//! - **Image**: delegates to the external image-safety classifier
//!
//! Every detector answers with a [`DetectorVerdict`] and never returns an
//! error: a detector that cannot finish reports `Failed`, which is turned
//! into an `analysis_error` finding so the content is held for review.

mod image;
mod text;

pub use image::ImageDetector;
pub use text::TextDetector;

use crate::types::{AnalysisOutcome, ContentSubmission, SentinelError, Severity, Violation, ViolationKind};

/// Common trait for content detectors.
#[async_trait::async_trait]
pub trait Detector: Send + Sync {
    /// Name of the detector.
    fn name(&self) -> &str;

    /// Whether this detector has anything to inspect in the submission.
    fn applies_to(&self, submission: &ContentSubmission) -> bool;

    /// Evaluate a submission.
    async fn evaluate(&self, submission: &ContentSubmission) -> DetectorVerdict;
}

/// What a detector concluded.
#[derive(Debug)]
pub enum DetectorVerdict {
    /// Nothing found
    Safe,
    /// Findings that need a response
    Review(Vec<Violation>),
    /// The detector could not reach a conclusion
    Failed {
        /// Detector that failed
        detector: String,
        /// Why
        error: SentinelError,
    },
}

impl DetectorVerdict {
    /// Verdict from a list of findings.
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        if violations.is_empty() {
            DetectorVerdict::Safe
        } else {
            DetectorVerdict::Review(violations)
        }
    }

    /// A failed verdict.
    pub fn failed(detector: impl Into<String>, error: SentinelError) -> Self {
        DetectorVerdict::Failed {
            detector: detector.into(),
            error,
        }
    }

    /// Whether the detector failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, DetectorVerdict::Failed { .. })
    }

    /// Convert into an outcome. Failure becomes a single `analysis_error`.
    pub fn into_outcome(self) -> AnalysisOutcome {
        match self {
            DetectorVerdict::Safe => AnalysisOutcome::safe(),
            DetectorVerdict::Review(violations) => AnalysisOutcome::from_violations(violations),
            DetectorVerdict::Failed { detector, error } => {
                AnalysisOutcome::from_violations(vec![analysis_error(detector, &error)])
            }
        }
    }
}

/// Finding recorded when analysis could not complete.
pub fn analysis_error(detector: impl Into<String>, error: &SentinelError) -> Violation {
    Violation::new(ViolationKind::AnalysisError, Severity::Medium, detector)
        .with_details(error.to_string())
}
