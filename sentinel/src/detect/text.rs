//! Indicator-phrase text detector.
//!
//! Scans the lowercased text for fixed indicator phrases in three
//! categories. This is plain substring matching: it misses paraphrases
//! ("I don't want to be here anymore") and can fire on innocent text that
//! happens to contain a phrase ("the suicide squad movie"). Callers treat
//! its output as a screening signal, not a judgement.

use tracing::debug;

use crate::detect::{Detector, DetectorVerdict};
use crate::types::{AnalysisOutcome, ContentSubmission, Severity, Violation, ViolationKind};

/// Phrases indicating self-harm or suicidal intent.
const SELF_HARM_INDICATORS: &[&str] = &[
    "kill myself",
    "killing myself",
    "suicide",
    "suicidal",
    "end my life",
    "end it all",
    "want to die",
    "wanna die",
    "better off dead",
    "hurt myself",
    "harm myself",
    "self harm",
    "self-harm",
    "cut myself",
    "no reason to live",
    "take my own life",
];

/// Phrases indicating threats of violence against others.
const VIOLENCE_INDICATORS: &[&str] = &[
    "kill you",
    "kill him",
    "kill her",
    "kill them",
    "murder",
    "shoot you",
    "shoot them",
    "stab you",
    "stab him",
    "stab her",
    "beat you up",
    "going to hurt you",
    "make you pay",
    "bomb",
];

/// Phrases indicating sexual or otherwise inappropriate content.
const INAPPROPRIATE_INDICATORS: &[&str] = &[
    "naked",
    "nude",
    "porn",
    "nsfw",
    "xxx",
    "sexual",
    "sexy",
    "fuck",
    "bitch",
    "slut",
];

/// Text detector.
pub struct TextDetector {
    categories: Vec<Category>,
}

struct Category {
    kind: ViolationKind,
    severity: Severity,
    indicators: &'static [&'static str],
}

impl TextDetector {
    /// Create a detector with the built-in indicator tables.
    pub fn new() -> Self {
        Self {
            categories: vec![
                Category {
                    kind: ViolationKind::SelfHarm,
                    severity: Severity::Critical,
                    indicators: SELF_HARM_INDICATORS,
                },
                Category {
                    kind: ViolationKind::ViolenceThreat,
                    severity: Severity::High,
                    indicators: VIOLENCE_INDICATORS,
                },
                Category {
                    kind: ViolationKind::InappropriateContent,
                    severity: Severity::Medium,
                    indicators: INAPPROPRIATE_INDICATORS,
                },
            ],
        }
    }

    /// Scan a string. Pure and deterministic.
    pub fn scan(&self, text: &str) -> AnalysisOutcome {
        let lower = text.to_lowercase();
        let mut violations = Vec::new();

        for category in &self.categories {
            let matched: Vec<String> = category
                .indicators
                .iter()
                .filter(|indicator| lower.contains(*indicator))
                .map(|indicator| indicator.to_string())
                .collect();

            if !matched.is_empty() {
                debug!(
                    kind = category.kind.as_str(),
                    matched = matched.len(),
                    "Text indicators matched"
                );
                violations.push(
                    Violation::new(category.kind, category.severity, self.name())
                        .with_indicators(matched),
                );
            }
        }

        AnalysisOutcome::from_violations(violations)
    }
}

impl Default for TextDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Detector for TextDetector {
    fn name(&self) -> &str {
        "text_detector"
    }

    fn applies_to(&self, submission: &ContentSubmission) -> bool {
        submission
            .text
            .as_deref()
            .map(|t| !t.trim().is_empty())
            .unwrap_or(false)
    }

    async fn evaluate(&self, submission: &ContentSubmission) -> DetectorVerdict {
        let text = submission.text.as_deref().unwrap_or_default();
        DetectorVerdict::from_violations(self.scan(text).violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_harm() {
        let outcome = TextDetector::new().scan("I want to kill myself");
        assert!(!outcome.safe);
        assert!(outcome.has_kind(ViolationKind::SelfHarm));
        assert!(!outcome.has_kind(ViolationKind::ViolenceThreat));
        assert_eq!(outcome.severity, Severity::Critical);
    }

    #[test]
    fn test_benign_question() {
        let detector = TextDetector::new();
        assert!(detector.scan("What does the future hold for my career?").safe);
        assert!(detector.scan("Will Mercury retrograde affect my sextile?").safe);
        assert!(detector.scan("").safe);
    }

    #[test]
    fn test_case_insensitive() {
        let outcome = TextDetector::new().scan("I WILL KILL YOU");
        assert!(outcome.has_kind(ViolationKind::ViolenceThreat));
        assert_eq!(outcome.severity, Severity::High);
    }

    #[test]
    fn test_multiple_categories() {
        let outcome = TextDetector::new().scan("send nude pics or I will kill you");
        assert_eq!(
            outcome.kinds(),
            vec![ViolationKind::ViolenceThreat, ViolationKind::InappropriateContent]
        );
        let inappropriate = outcome
            .violations
            .iter()
            .find(|v| v.kind == ViolationKind::InappropriateContent)
            .unwrap();
        assert_eq!(inappropriate.indicators, vec!["nude".to_string()]);
    }

    #[test]
    fn test_substring_limitation_is_kept() {
        // Keyword matching fires on a film title; this is a known false positive.
        let outcome = TextDetector::new().scan("Is The Suicide Squad a good movie for a Leo?");
        assert!(outcome.has_kind(ViolationKind::SelfHarm));

        // And misses paraphrase; a known false negative.
        assert!(TextDetector::new().scan("I don't want to wake up tomorrow").safe);
    }

    #[tokio::test]
    async fn test_detector_applies_only_to_text() {
        let detector = TextDetector::new();
        let image_only = ContentSubmission::new("u1", "palm-upload").with_image("img://1");
        assert!(!detector.applies_to(&image_only));

        let text = ContentSubmission::text("u1", "question-box", "naked");
        assert!(detector.applies_to(&text));
        assert!(matches!(
            detector.evaluate(&text).await,
            DetectorVerdict::Review(_)
        ));
    }
}
