//! Result aggregation.
//!
//! Merges per-detector outcomes into one. `merge` is associative and
//! commutative on `safe`, `severity` and `action`, with
//! [`AnalysisOutcome::safe`] as identity, so detectors may finish in any
//! order.

use crate::types::{AnalysisOutcome, Result, SentinelError};

/// Merge two outcomes.
pub fn merge(a: AnalysisOutcome, b: AnalysisOutcome) -> AnalysisOutcome {
    let mut violations = a.violations;
    violations.extend(b.violations);

    AnalysisOutcome {
        safe: a.safe && b.safe,
        severity: a.severity.max(b.severity),
        action: a.action.max(b.action),
        violations,
    }
}

/// Merge any number of outcomes. The empty list merges to a safe outcome.
pub fn merge_all(outcomes: impl IntoIterator<Item = AnalysisOutcome>) -> AnalysisOutcome {
    outcomes.into_iter().fold(AnalysisOutcome::safe(), merge)
}

/// Merge and check the result's invariants.
pub fn aggregate(outcomes: impl IntoIterator<Item = AnalysisOutcome>) -> Result<AnalysisOutcome> {
    let merged = merge_all(outcomes);
    if !merged.is_consistent() {
        return Err(SentinelError::AggregationInconsistency(format!(
            "safe={} severity={} action={} violations={}",
            merged.safe,
            merged.severity.as_str(),
            merged.action.as_str(),
            merged.violations.len()
        )));
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Action, Severity, Violation, ViolationKind};

    fn outcome(kind: ViolationKind, severity: Severity) -> AnalysisOutcome {
        AnalysisOutcome::from_violations(vec![Violation::new(kind, severity, "test")])
    }

    fn samples() -> Vec<AnalysisOutcome> {
        vec![
            AnalysisOutcome::safe(),
            outcome(ViolationKind::InappropriateContent, Severity::Medium),
            outcome(ViolationKind::SelfHarm, Severity::Critical),
            outcome(ViolationKind::AnalysisError, Severity::Medium),
            outcome(ViolationKind::ViolenceThreat, Severity::High),
        ]
    }

    fn key(o: &AnalysisOutcome) -> (bool, Severity, Action, usize) {
        (o.safe, o.severity, o.action, o.violations.len())
    }

    #[test]
    fn test_commutative() {
        for a in samples() {
            for b in samples() {
                assert_eq!(
                    key(&merge(a.clone(), b.clone())),
                    key(&merge(b.clone(), a.clone()))
                );
            }
        }
    }

    #[test]
    fn test_associative() {
        for a in samples() {
            for b in samples() {
                for c in samples() {
                    let left = merge(merge(a.clone(), b.clone()), c.clone());
                    let right = merge(a.clone(), merge(b.clone(), c.clone()));
                    assert_eq!(key(&left), key(&right));
                }
            }
        }
    }

    #[test]
    fn test_severity_is_max() {
        for a in samples() {
            for b in samples() {
                let expected = a.severity.max(b.severity);
                assert_eq!(merge(a.clone(), b.clone()).severity, expected);
            }
        }
    }

    #[test]
    fn test_permutations_agree() {
        let s = samples();
        let orders: [[usize; 3]; 6] = [
            [1, 2, 3],
            [1, 3, 2],
            [2, 1, 3],
            [2, 3, 1],
            [3, 1, 2],
            [3, 2, 1],
        ];
        let baseline = key(&merge_all(orders[0].iter().map(|&i| s[i].clone())));
        for order in &orders[1..] {
            let merged = merge_all(order.iter().map(|&i| s[i].clone()));
            assert_eq!(key(&merged), baseline);
        }
    }

    #[test]
    fn test_identity() {
        let merged = aggregate(vec![]).unwrap();
        assert_eq!(merged, AnalysisOutcome::safe());

        let single = outcome(ViolationKind::InappropriateContent, Severity::High);
        assert_eq!(merge(single.clone(), AnalysisOutcome::safe()), single);
    }

    #[test]
    fn test_inconsistent_input_detected() {
        let broken = AnalysisOutcome {
            safe: true,
            violations: vec![Violation::new(
                ViolationKind::SelfHarm,
                Severity::Critical,
                "test",
            )],
            severity: Severity::Critical,
            action: Action::Ban,
        };
        let err = aggregate(vec![broken]).unwrap_err();
        assert!(matches!(err, SentinelError::AggregationInconsistency(_)));
    }
}
