//! Crisis handling for self-harm indicators.
//!
//! A self-harm finding always blocks the session and surfaces support
//! resources, whatever else the submission contained. The block never
//! becomes a ban and never clears on its own.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::audit::{AuditRecord, ViolationLogger};
use crate::session::SessionState;
use crate::types::{Action, AnalysisOutcome, ContentSubmission};

/// 988 Suicide & Crisis Lifeline.
pub const CRISIS_HOTLINE: &str = "988";
/// Crisis Text Line instruction.
pub const CRISIS_TEXT_LINE: &str = "Text HOME to 741741";
/// Emergency services.
pub const EMERGENCY_NUMBER: &str = "911";

const CRISIS_MESSAGE: &str = "It sounds like you may be going through something really painful. \
You don't have to face it alone. Please reach out now: call or text 988, text HOME to 741741, \
or call 911 if you are in immediate danger.";

/// Support resources shown with a crisis block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrisisResourceBundle {
    pub hotline: String,
    pub text_line: String,
    pub emergency: String,
    pub message: String,
}

impl CrisisResourceBundle {
    /// Build a fresh bundle.
    pub fn new() -> Self {
        Self {
            hotline: CRISIS_HOTLINE.to_string(),
            text_line: CRISIS_TEXT_LINE.to_string(),
            emergency: EMERGENCY_NUMBER.to_string(),
            message: CRISIS_MESSAGE.to_string(),
        }
    }
}

impl Default for CrisisResourceBundle {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the crisis response to a locked session.
pub struct CrisisHandler {
    logger: ViolationLogger,
}

impl CrisisHandler {
    /// Create a handler logging through `logger`.
    pub fn new(logger: ViolationLogger) -> Self {
        Self { logger }
    }

    /// Block the session, enqueue the audit record and return the bundle.
    ///
    /// The caller holds the session's lane, so block and bundle are applied
    /// together before anyone else can observe the session.
    pub fn handle(
        &self,
        session: &mut SessionState,
        submission: &ContentSubmission,
        outcome: &AnalysisOutcome,
    ) -> CrisisResourceBundle {
        let bundle = CrisisResourceBundle::new();
        session.enter_crisis(bundle.clone());

        warn!(
            user_id = %submission.user_id,
            component = %submission.component,
            "Crisis indicators detected, session blocked and resources surfaced"
        );

        self.logger.log(AuditRecord::new(
            &submission.user_id,
            &submission.component,
            outcome,
            Action::Suspend,
        ));

        bundle
    }
}
