//! Per-user behavior history.
//!
//! The store is the single source of truth for repeat offenses. Each user
//! has one record behind its own async mutex, so increments for the same
//! user are serialised while different users never contend.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::types::{AnalysisOutcome, Violation, ViolationKind};

/// One past unsafe outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// The outcome as analysed
    pub outcome: AnalysisOutcome,
    /// When it was recorded
    pub recorded_at: DateTime<Utc>,
}

/// Everything known about one user's past conduct.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorRecord {
    /// User ID
    pub user_id: String,
    /// Cumulative count per violation kind since the last reset
    pub counts: HashMap<ViolationKind, u32>,
    /// Append-only list of unsafe outcomes
    pub history: Vec<HistoryEntry>,
    /// When the record was created
    pub created_at: DateTime<Utc>,
    /// When counts were last zeroed
    pub last_reset_at: Option<DateTime<Utc>>,
}

impl BehaviorRecord {
    fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            counts: HashMap::new(),
            history: Vec::new(),
            created_at: Utc::now(),
            last_reset_at: None,
        }
    }

    /// Count for a kind.
    pub fn count_of(&self, kind: ViolationKind) -> u32 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }
}

/// Behavior store keyed by user ID.
pub struct BehaviorStore {
    records: DashMap<String, Arc<Mutex<BehaviorRecord>>>,
}

impl BehaviorStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Get or lazily create the record for a user.
    fn record(&self, user_id: &str) -> Arc<Mutex<BehaviorRecord>> {
        self.records
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(BehaviorRecord::new(user_id))))
            .value()
            .clone()
    }

    fn existing(&self, user_id: &str) -> Option<Arc<Mutex<BehaviorRecord>>> {
        self.records.get(user_id).map(|r| r.value().clone())
    }

    /// Record a violation and return the updated count for its kind.
    pub async fn record_violation(&self, user_id: &str, violation: &Violation) -> u32 {
        let record = self.record(user_id);
        let mut record = record.lock().await;

        let count = record.counts.entry(violation.kind).or_insert(0);
        *count += 1;
        let count = *count;

        debug!(
            user_id = %user_id,
            kind = violation.kind.as_str(),
            count = count,
            "Violation recorded"
        );

        count
    }

    /// Append an unsafe outcome to the user's history.
    pub async fn append_history(&self, user_id: &str, outcome: AnalysisOutcome) {
        let record = self.record(user_id);
        let mut record = record.lock().await;
        record.history.push(HistoryEntry {
            outcome,
            recorded_at: Utc::now(),
        });
    }

    /// Current count for a kind. Zero for unknown users.
    pub async fn count_of(&self, user_id: &str, kind: ViolationKind) -> u32 {
        match self.existing(user_id) {
            Some(record) => record.lock().await.count_of(kind),
            None => 0,
        }
    }

    /// Zero all counts for a user. History is kept.
    pub async fn reset(&self, user_id: &str) {
        if let Some(record) = self.existing(user_id) {
            let mut record = record.lock().await;
            record.counts.clear();
            record.last_reset_at = Some(Utc::now());
            info!(
                user_id = %user_id,
                history_len = record.history.len(),
                "Behavior counts reset"
            );
        }
    }

    /// Full history for a user, oldest first.
    pub async fn history(&self, user_id: &str) -> Vec<HistoryEntry> {
        match self.existing(user_id) {
            Some(record) => record.lock().await.history.clone(),
            None => Vec::new(),
        }
    }

    /// Copy of a user's record, if one exists.
    pub async fn snapshot(&self, user_id: &str) -> Option<BehaviorRecord> {
        match self.existing(user_id) {
            Some(record) => Some(record.lock().await.clone()),
            None => None,
        }
    }

    /// Number of users with a record.
    pub fn tracked_users(&self) -> usize {
        self.records.len()
    }
}

impl Default for BehaviorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;

    fn inappropriate() -> Violation {
        Violation::new(ViolationKind::InappropriateContent, Severity::Medium, "test")
    }

    #[tokio::test]
    async fn test_counts_increment() {
        let store = BehaviorStore::new();
        assert_eq!(store.record_violation("u1", &inappropriate()).await, 1);
        assert_eq!(store.record_violation("u1", &inappropriate()).await, 2);
        assert_eq!(store.count_of("u1", ViolationKind::InappropriateContent).await, 2);
        assert_eq!(store.count_of("u1", ViolationKind::SelfHarm).await, 0);
        assert_eq!(store.count_of("u2", ViolationKind::InappropriateContent).await, 0);
    }

    #[tokio::test]
    async fn test_lazy_creation() {
        let store = BehaviorStore::new();
        assert_eq!(store.count_of("u1", ViolationKind::SelfHarm).await, 0);
        store.reset("u1").await;
        assert_eq!(store.tracked_users(), 0);
        assert!(store.snapshot("u1").await.is_none());

        store.record_violation("u1", &inappropriate()).await;
        assert_eq!(store.tracked_users(), 1);
    }

    #[tokio::test]
    async fn test_reset_keeps_history() {
        let store = BehaviorStore::new();
        let outcome = AnalysisOutcome::from_violations(vec![inappropriate()]);
        store.record_violation("u1", &inappropriate()).await;
        store.append_history("u1", outcome).await;

        store.reset("u1").await;

        assert_eq!(store.count_of("u1", ViolationKind::InappropriateContent).await, 0);
        assert_eq!(store.history("u1").await.len(), 1);
        let snapshot = store.snapshot("u1").await.unwrap();
        assert!(snapshot.last_reset_at.is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_not_lost() {
        let store = Arc::new(BehaviorStore::new());
        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.record_violation("u1", &inappropriate()).await
            }));
        }
        let mut seen: Vec<u32> = Vec::new();
        for handle in handles {
            seen.push(handle.await.unwrap());
        }
        seen.sort_unstable();

        assert_eq!(seen, (1..=50).collect::<Vec<u32>>());
        assert_eq!(store.count_of("u1", ViolationKind::InappropriateContent).await, 50);
    }
}
