//! ContentMonitor - the public entry point of the pipeline.
//!
//! One `check_content` call runs the applicable detectors concurrently,
//! aggregates their outcomes, updates the user's behavior record, applies
//! the escalation table and enqueues an audit record. The whole call runs
//! while holding the user's session lane, so the resulting state is in
//! place before the caller sees the outcome.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use sentinel_classifier::{HttpImageClassifier, ImageClassifier};

use crate::aggregate::aggregate;
use crate::audit::{AuditRecord, AuditSink, InMemoryAuditSink, JsonLinesAuditSink, ViolationLogger};
use crate::behavior::BehaviorStore;
use crate::config::SentinelConfig;
use crate::crisis::{CrisisHandler, CrisisResourceBundle};
use crate::detect::{analysis_error, Detector, DetectorVerdict, ImageDetector, TextDetector};
use crate::escalation::{EscalationPolicy, Transition};
use crate::session::{BlockCause, ModerationState, SessionRegistry, SessionState};
use crate::types::{
    Action, AnalysisOutcome, ContentSubmission, Result, SentinelError, Severity, Violation,
};

const WARN_MESSAGE: &str = "This content doesn't meet our community guidelines. \
Please keep submissions respectful; a repeat violation will suspend your session.";
const SUSPEND_MESSAGE: &str =
    "Your session has been suspended after repeated community guideline violations.";
const BAN_MESSAGE: &str =
    "Your session has been terminated because this content violates our safety policy.";
const REVIEW_MESSAGE: &str = "We couldn't verify this content right now, so it has been held \
for review. Please try again later.";
const BLOCKED_MESSAGE: &str =
    "This session is blocked. Please contact support to restore access.";

/// Result of a content check, as returned to the UI.
///
/// Callers must not proceed with the user's action unless `safe` is true.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutcome {
    /// Whether the caller may proceed
    pub safe: bool,
    /// Action taken
    pub action: Action,
    /// Maximum severity found (none when detectors were skipped)
    pub severity: Severity,
    /// Session state after the check
    pub state: ModerationState,
    /// Whether the session is blocked
    pub blocked: bool,
    /// Findings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
    /// Human-readable explanation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Support resources for a crisis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crisis_bundle: Option<CrisisResourceBundle>,
}

impl CheckOutcome {
    fn allowed(state: ModerationState) -> Self {
        Self {
            safe: true,
            action: Action::Allow,
            severity: Severity::None,
            state,
            blocked: false,
            violations: vec![],
            message: None,
            crisis_bundle: None,
        }
    }
}

/// The monitoring orchestrator.
pub struct ContentMonitor {
    /// Configuration
    config: SentinelConfig,
    /// Detectors, run concurrently per submission
    detectors: Vec<Arc<dyn Detector>>,
    /// Per-user behavior history
    behavior: Arc<BehaviorStore>,
    /// Per-user sessions
    sessions: SessionRegistry,
    /// Escalation table
    policy: EscalationPolicy,
    /// Crisis response
    crisis: CrisisHandler,
    /// Audit trail
    logger: ViolationLogger,
}

impl ContentMonitor {
    /// Create a builder.
    pub fn builder() -> MonitorBuilder {
        MonitorBuilder::new()
    }

    /// Create from configuration. Fails outside a tokio runtime when audit is enabled.
    pub fn with_config(config: SentinelConfig) -> Result<Self> {
        MonitorBuilder::new().config(config).build()
    }

    /// Get the configuration.
    pub fn config(&self) -> &SentinelConfig {
        &self.config
    }

    /// Get the behavior store.
    pub fn behavior(&self) -> &Arc<BehaviorStore> {
        &self.behavior
    }

    /// Get the audit logger.
    pub fn logger(&self) -> &ViolationLogger {
        &self.logger
    }

    /// Names of the configured detectors.
    pub fn detector_names(&self) -> Vec<&str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// Check one submission.
    ///
    /// Only validation failures are returned as errors; every analysis
    /// failure is folded into an unsafe outcome.
    pub async fn check_content(&self, submission: ContentSubmission) -> Result<CheckOutcome> {
        submission.validate(self.config.detection.max_text_chars)?;

        let lane = self.sessions.lane(&submission.user_id);
        let mut session = lane.lock().await;

        if session.is_blocked() {
            debug!(
                user_id = %submission.user_id,
                cause = ?session.block_cause,
                "Session blocked, detectors skipped"
            );
            return Ok(Self::blocked_outcome(&session));
        }

        let analysis = self.analyze(&submission).await;

        if analysis.safe {
            debug!(
                user_id = %submission.user_id,
                component = %submission.component,
                "Content safe"
            );
            return Ok(CheckOutcome::allowed(session.state));
        }

        self.behavior
            .append_history(&submission.user_id, analysis.clone())
            .await;

        let mut findings = Vec::new();
        for kind in analysis.kinds() {
            if !kind.is_conduct() {
                continue;
            }
            if let Some(violation) = analysis.violations.iter().find(|v| v.kind == kind) {
                let count = self
                    .behavior
                    .record_violation(&submission.user_id, violation)
                    .await;
                findings.push((kind, count));
            }
        }

        let transition = self.policy.decide(findings);

        let outcome = match transition {
            Transition::Crisis => {
                let bundle = self.crisis.handle(&mut session, &submission, &analysis);
                CheckOutcome {
                    safe: false,
                    action: Action::Suspend,
                    severity: analysis.severity,
                    state: session.state,
                    blocked: true,
                    violations: analysis.violations,
                    message: Some(bundle.message.clone()),
                    crisis_bundle: Some(bundle),
                }
            }
            Transition::Ban(cause) => {
                session.block(cause);
                self.decided(&submission, &session, analysis, Action::Ban, BAN_MESSAGE)
            }
            Transition::SuspendRepeat => {
                session.block(BlockCause::InappropriateRepeat);
                self.decided(&submission, &session, analysis, Action::Suspend, SUSPEND_MESSAGE)
            }
            Transition::Warn => {
                session.warn();
                self.decided(&submission, &session, analysis, Action::Warn, WARN_MESSAGE)
            }
            Transition::None => {
                let action = analysis.action;
                self.decided(&submission, &session, analysis, action, REVIEW_MESSAGE)
            }
        };

        if transition.blocks() {
            warn!(
                user_id = %submission.user_id,
                component = %submission.component,
                transition = ?transition,
                action = outcome.action.as_str(),
                "Session blocked"
            );
        } else {
            info!(
                user_id = %submission.user_id,
                component = %submission.component,
                transition = ?transition,
                action = outcome.action.as_str(),
                "Unsafe content handled"
            );
        }

        Ok(outcome)
    }

    /// Return a user to `Normal`. Counts are zeroed; history is kept.
    pub async fn reset(&self, user_id: &str) -> SessionState {
        let lane = self.sessions.lane(user_id);
        let mut session = lane.lock().await;

        let previous = session.state;
        session.clear();
        self.behavior.reset(user_id).await;

        info!(
            user_id = %user_id,
            previous = previous.as_str(),
            "Session reset"
        );

        session.clone()
    }

    /// Current session state for a user.
    pub async fn session_state(&self, user_id: &str) -> SessionState {
        self.sessions.snapshot(user_id).await
    }

    /// Run applicable detectors concurrently and merge their outcomes.
    async fn analyze(&self, submission: &ContentSubmission) -> AnalysisOutcome {
        let applicable: Vec<Arc<dyn Detector>> = self
            .detectors
            .iter()
            .filter(|d| d.applies_to(submission))
            .cloned()
            .collect();

        if applicable.is_empty() {
            warn!(
                user_id = %submission.user_id,
                component = %submission.component,
                "No detector accepts this submission, holding for review"
            );
            let error = SentinelError::DetectorUnavailable {
                detector: "none".to_string(),
                reason: "no configured detector accepts this submission".to_string(),
            };
            return AnalysisOutcome::from_violations(vec![analysis_error("monitor", &error)]);
        }

        let shared = Arc::new(submission.clone());
        let tasks = applicable.iter().map(|detector| {
            let detector = Arc::clone(detector);
            let submission = Arc::clone(&shared);
            tokio::spawn(async move { detector.evaluate(&submission).await })
        });
        let results = join_all(tasks).await;

        let outcomes: Vec<AnalysisOutcome> = applicable
            .iter()
            .zip(results)
            .map(|(detector, result)| match result {
                Ok(verdict) => verdict.into_outcome(),
                Err(e) => {
                    error!(
                        detector = detector.name(),
                        error = %e,
                        "Detector task aborted, holding content for review"
                    );
                    DetectorVerdict::failed(
                        detector.name(),
                        SentinelError::DetectorUnavailable {
                            detector: detector.name().to_string(),
                            reason: format!("detector task aborted: {}", e),
                        },
                    )
                    .into_outcome()
                }
            })
            .collect();

        match aggregate(outcomes) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Aggregation failed, holding content for review");
                AnalysisOutcome::from_violations(vec![analysis_error("aggregator", &e)])
            }
        }
    }

    fn decided(
        &self,
        submission: &ContentSubmission,
        session: &SessionState,
        analysis: AnalysisOutcome,
        action: Action,
        message: &str,
    ) -> CheckOutcome {
        self.logger.log(AuditRecord::new(
            &submission.user_id,
            &submission.component,
            &analysis,
            action,
        ));

        CheckOutcome {
            safe: false,
            action,
            severity: analysis.severity,
            state: session.state,
            blocked: session.blocked,
            violations: analysis.violations,
            message: Some(message.to_string()),
            crisis_bundle: None,
        }
    }

    fn blocked_outcome(session: &SessionState) -> CheckOutcome {
        let crisis_bundle = match session.state {
            ModerationState::CrisisBlocked => Some(CrisisResourceBundle::new()),
            _ => None,
        };
        let message = crisis_bundle
            .as_ref()
            .map(|b| b.message.clone())
            .unwrap_or_else(|| BLOCKED_MESSAGE.to_string());

        CheckOutcome {
            safe: false,
            action: session.block_cause.action(),
            severity: Severity::None,
            state: session.state,
            blocked: true,
            violations: vec![],
            message: Some(message),
            crisis_bundle,
        }
    }
}

/// Builder for ContentMonitor.
pub struct MonitorBuilder {
    config: SentinelConfig,
    classifier: Option<Arc<dyn ImageClassifier>>,
    detectors: Vec<Arc<dyn Detector>>,
    behavior: Option<Arc<BehaviorStore>>,
    audit_sink: Option<Arc<dyn AuditSink>>,
}

impl MonitorBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: SentinelConfig::default(),
            classifier: None,
            detectors: Vec::new(),
            behavior: None,
            audit_sink: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: SentinelConfig) -> Self {
        self.config = config;
        self
    }

    /// Use this image classifier instead of the configured endpoint.
    pub fn classifier(mut self, classifier: Arc<dyn ImageClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Add a detector next to the built-in ones.
    pub fn detector(mut self, detector: Arc<dyn Detector>) -> Self {
        self.detectors.push(detector);
        self
    }

    /// Share an existing behavior store.
    pub fn behavior_store(mut self, store: Arc<BehaviorStore>) -> Self {
        self.behavior = Some(store);
        self
    }

    /// Write audit records to this sink.
    pub fn audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = Some(sink);
        self
    }

    /// Enable/disable the text detector.
    pub fn text_detection(mut self, enabled: bool) -> Self {
        self.config.detection.text_enabled = enabled;
        self
    }

    /// Enable/disable the image detector.
    pub fn image_detection(mut self, enabled: bool) -> Self {
        self.config.detection.image_enabled = enabled;
        self
    }

    /// Set the image classifier timeout.
    pub fn image_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.detection.image_timeout_ms = timeout_ms;
        self
    }

    /// Set the repeat-offense limit.
    pub fn repeat_offense_limit(mut self, limit: u32) -> Self {
        self.config.escalation.repeat_offense_limit = limit;
        self
    }

    /// Enable/disable audit.
    pub fn audit_enabled(mut self, enabled: bool) -> Self {
        self.config.audit.enabled = enabled;
        self
    }

    /// Build the monitor. Fails with a config error outside a tokio runtime
    /// when audit is enabled.
    pub fn build(self) -> Result<ContentMonitor> {
        let config = self.config;
        config.validate()?;

        let mut detectors: Vec<Arc<dyn Detector>> = Vec::new();
        if config.detection.text_enabled {
            detectors.push(Arc::new(TextDetector::new()));
        }

        if config.detection.image_enabled {
            let classifier: Option<Arc<dyn ImageClassifier>> = match self.classifier {
                Some(classifier) => Some(classifier),
                None => match &config.classifier.endpoint {
                    Some(endpoint) => {
                        let http = HttpImageClassifier::with_timeout(
                            endpoint.clone(),
                            config.classifier.api_key.clone(),
                            std::time::Duration::from_millis(config.classifier.timeout_ms),
                        )
                        .map_err(|e| SentinelError::Config(e.to_string()))?;
                        Some(Arc::new(http))
                    }
                    None => None,
                },
            };

            match classifier {
                Some(classifier) => detectors.push(Arc::new(ImageDetector::with_timeout(
                    classifier,
                    config.detection.image_timeout(),
                ))),
                None => warn!(
                    "Image detection enabled without a classifier; image-only submissions will be held for review"
                ),
            }
        }

        detectors.extend(self.detectors);

        let logger = if config.audit.enabled {
            let sink: Arc<dyn AuditSink> = match self.audit_sink {
                Some(sink) => sink,
                None => match &config.audit.path {
                    Some(path) => Arc::new(JsonLinesAuditSink::new(path)),
                    None => Arc::new(InMemoryAuditSink::with_max_entries(config.audit.max_entries)),
                },
            };
            ViolationLogger::spawn_with_capacity(sink, config.audit.max_entries)?
        } else {
            ViolationLogger::disabled()
        };

        info!(
            detectors = detectors.len(),
            audit = logger.is_enabled(),
            repeat_offense_limit = config.escalation.repeat_offense_limit,
            "ContentMonitor ready"
        );

        Ok(ContentMonitor {
            policy: EscalationPolicy::with_repeat_limit(config.escalation.repeat_offense_limit),
            crisis: CrisisHandler::new(logger.clone()),
            behavior: self.behavior.unwrap_or_default(),
            sessions: SessionRegistry::new(),
            detectors,
            logger,
            config,
        })
    }
}

impl Default for MonitorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ViolationKind;

    #[tokio::test]
    async fn test_builder_defaults() {
        let monitor = ContentMonitor::builder().build().unwrap();
        assert_eq!(monitor.detector_names(), vec!["text_detector"]);
        assert!(monitor.logger().is_enabled());
    }

    #[tokio::test]
    async fn test_builder_overrides() {
        let monitor = ContentMonitor::builder()
            .repeat_offense_limit(3)
            .audit_enabled(false)
            .image_timeout_ms(250)
            .build()
            .unwrap();
        assert_eq!(monitor.config().escalation.repeat_offense_limit, 3);
        assert_eq!(monitor.config().detection.image_timeout_ms, 250);
        assert!(!monitor.logger().is_enabled());
    }

    #[tokio::test]
    async fn test_builder_rejects_invalid_config() {
        let result = ContentMonitor::builder()
            .text_detection(false)
            .image_detection(false)
            .build();
        assert!(matches!(result, Err(SentinelError::Config(_))));
    }

    #[test]
    fn test_build_outside_runtime_is_config_error() {
        let result = ContentMonitor::builder().build();
        assert!(matches!(result, Err(SentinelError::Config(_))));

        let monitor = ContentMonitor::builder().audit_enabled(false).build();
        assert!(monitor.is_ok());
    }

    #[tokio::test]
    async fn test_warn_outcome_shape() {
        let monitor = ContentMonitor::builder().build().unwrap();
        let outcome = monitor
            .check_content(ContentSubmission::text("u1", "question-box", "show me naked photos"))
            .await
            .unwrap();

        assert!(!outcome.safe);
        assert_eq!(outcome.action, Action::Warn);
        assert_eq!(outcome.state, ModerationState::Warned);
        assert!(!outcome.blocked);
        assert_eq!(outcome.violations[0].kind, ViolationKind::InappropriateContent);
        assert!(outcome.message.is_some());

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["action"], "warn");
        assert_eq!(json["state"], "warned");
        assert!(json.get("crisisBundle").is_none());
    }

    #[tokio::test]
    async fn test_image_without_classifier_held() {
        let monitor = ContentMonitor::builder().build().unwrap();
        let outcome = monitor
            .check_content(ContentSubmission::new("u1", "palm-upload").with_image("img://palm"))
            .await
            .unwrap();

        assert!(!outcome.safe);
        assert_eq!(outcome.action, Action::Remove);
        assert_eq!(outcome.violations[0].kind, ViolationKind::AnalysisError);
        assert_eq!(outcome.state, ModerationState::Normal);
    }
}
