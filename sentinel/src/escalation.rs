//! Escalation table.
//!
//! Maps each violation kind, together with the user's updated count for
//! that kind, to a state transition. When one submission carries several
//! kinds the most severe transition wins:
//! crisis > ban > repeat suspension > warning.

use serde::{Deserialize, Serialize};

use crate::session::BlockCause;
use crate::types::{Action, ViolationKind};

/// Default number of inappropriate-content offenses that suspends a session.
pub const DEFAULT_REPEAT_OFFENSE_LIMIT: u32 = 2;

/// Transition produced by a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// No state change
    None,
    /// First inappropriate-content offense
    Warn,
    /// Repeated inappropriate content
    SuspendRepeat,
    /// Violence or extremism
    Ban(BlockCause),
    /// Self-harm indicators
    Crisis,
}

impl Transition {
    fn rank(&self) -> u8 {
        match self {
            Transition::None => 0,
            Transition::Warn => 1,
            Transition::SuspendRepeat => 2,
            Transition::Ban(_) => 3,
            Transition::Crisis => 4,
        }
    }

    /// The more severe of two transitions. Ties keep `self`.
    pub fn max(self, other: Transition) -> Transition {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }

    /// Action returned to the caller for this transition.
    pub fn action(&self) -> Option<Action> {
        match self {
            Transition::None => None,
            Transition::Warn => Some(Action::Warn),
            Transition::SuspendRepeat | Transition::Crisis => Some(Action::Suspend),
            Transition::Ban(_) => Some(Action::Ban),
        }
    }

    /// Whether the transition blocks the session.
    pub fn blocks(&self) -> bool {
        matches!(
            self,
            Transition::SuspendRepeat | Transition::Ban(_) | Transition::Crisis
        )
    }
}

/// Escalation policy.
#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    repeat_offense_limit: u32,
}

impl EscalationPolicy {
    /// Create with the default repeat limit.
    pub fn new() -> Self {
        Self::with_repeat_limit(DEFAULT_REPEAT_OFFENSE_LIMIT)
    }

    /// Create with a custom repeat limit (at least 1).
    pub fn with_repeat_limit(limit: u32) -> Self {
        Self {
            repeat_offense_limit: limit.max(1),
        }
    }

    /// Repeat limit in use.
    pub fn repeat_offense_limit(&self) -> u32 {
        self.repeat_offense_limit
    }

    /// Transition for one kind given the count after recording it.
    pub fn transition_for(&self, kind: ViolationKind, count: u32) -> Transition {
        match kind {
            ViolationKind::SelfHarm => Transition::Crisis,
            ViolationKind::ViolenceThreat => Transition::Ban(BlockCause::Violence),
            ViolationKind::ExtremistContent => Transition::Ban(BlockCause::Extremist),
            ViolationKind::InappropriateContent if count >= self.repeat_offense_limit => {
                Transition::SuspendRepeat
            }
            ViolationKind::InappropriateContent => Transition::Warn,
            ViolationKind::AnalysisError => Transition::None,
        }
    }

    /// Most severe transition over several `(kind, count)` pairs.
    pub fn decide(&self, findings: impl IntoIterator<Item = (ViolationKind, u32)>) -> Transition {
        findings
            .into_iter()
            .map(|(kind, count)| self.transition_for(kind, count))
            .fold(Transition::None, Transition::max)
    }
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inappropriate_warn_then_suspend() {
        let policy = EscalationPolicy::new();
        assert_eq!(
            policy.transition_for(ViolationKind::InappropriateContent, 1),
            Transition::Warn
        );
        assert_eq!(
            policy.transition_for(ViolationKind::InappropriateContent, 2),
            Transition::SuspendRepeat
        );
    }

    #[test]
    fn test_self_harm_wins() {
        let policy = EscalationPolicy::new();
        let transition = policy.decide(vec![
            (ViolationKind::ViolenceThreat, 1),
            (ViolationKind::SelfHarm, 1),
            (ViolationKind::InappropriateContent, 2),
        ]);
        assert_eq!(transition, Transition::Crisis);
        assert_eq!(transition.action(), Some(Action::Suspend));
    }

    #[test]
    fn test_ban_beats_repeat() {
        let policy = EscalationPolicy::new();
        let transition = policy.decide(vec![
            (ViolationKind::InappropriateContent, 2),
            (ViolationKind::ExtremistContent, 1),
        ]);
        assert_eq!(transition, Transition::Ban(BlockCause::Extremist));
        assert_eq!(transition.action(), Some(Action::Ban));
    }

    #[test]
    fn test_analysis_error_does_not_escalate() {
        let policy = EscalationPolicy::new();
        let transition = policy.decide(vec![(ViolationKind::AnalysisError, 5)]);
        assert_eq!(transition, Transition::None);
        assert!(!transition.blocks());
        assert_eq!(transition.action(), None);
    }

    #[test]
    fn test_custom_limit() {
        let policy = EscalationPolicy::with_repeat_limit(3);
        assert_eq!(
            policy.transition_for(ViolationKind::InappropriateContent, 2),
            Transition::Warn
        );
        assert_eq!(EscalationPolicy::with_repeat_limit(0).repeat_offense_limit(), 1);
    }
}
