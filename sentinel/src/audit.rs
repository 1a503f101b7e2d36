//! Violation audit trail.
//!
//! Records are handed to a background worker over a bounded channel and
//! written to an [`AuditSink`]. Callers never wait on the sink; sink
//! failures are reported with `tracing::error!` and otherwise dropped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};
use tracing::{debug, error};

use crate::types::{Action, AnalysisOutcome, Result, SentinelError, Severity, Violation};

/// Maximum entries in the in-memory sink before pruning.
const MAX_AUDIT_ENTRIES: usize = 10_000;

/// One audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    /// Unique record ID
    pub id: String,
    /// User the outcome applies to
    pub user_id: String,
    /// Component the content came from
    pub component: String,
    /// Findings
    pub violations: Vec<Violation>,
    /// Maximum severity
    pub severity: Severity,
    /// Action returned to the caller
    pub action: Action,
    /// When the decision was made
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    /// Build a record from an analysed outcome and the action taken.
    pub fn new(
        user_id: impl Into<String>,
        component: impl Into<String>,
        outcome: &AnalysisOutcome,
        action: Action,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            component: component.into(),
            violations: outcome.violations.clone(),
            severity: outcome.severity,
            action,
            timestamp: Utc::now(),
        }
    }
}

/// Append-only destination for audit records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Name of the sink.
    fn name(&self) -> &str;

    /// Append one record.
    async fn append(&self, record: &AuditRecord) -> Result<()>;
}

/// Bounded in-memory sink (newest first).
pub struct InMemoryAuditSink {
    entries: RwLock<VecDeque<AuditRecord>>,
    max_entries: usize,
}

impl InMemoryAuditSink {
    /// Create a new sink.
    pub fn new() -> Self {
        Self::with_max_entries(MAX_AUDIT_ENTRIES)
    }

    /// Create with custom max entries.
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            max_entries,
        }
    }

    /// Get recent records.
    pub async fn recent(&self, limit: usize) -> Vec<AuditRecord> {
        let entries = self.entries.read().await;
        entries.iter().take(limit).cloned().collect()
    }

    /// Get records for a user.
    pub async fn by_user(&self, user_id: &str, limit: usize) -> Vec<AuditRecord> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Get count.
    pub async fn count(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for InMemoryAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn append(&self, record: &AuditRecord) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.push_front(record.clone());

        while entries.len() > self.max_entries {
            entries.pop_back();
        }
        Ok(())
    }
}

/// Sink appending one JSON object per line to a file.
pub struct JsonLinesAuditSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesAuditSink {
    /// Create a sink writing to `path`. The file is created on first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Target file.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl AuditSink for JsonLinesAuditSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn append(&self, record: &AuditRecord) -> Result<()> {
        let mut line =
            serde_json::to_string(record).map_err(|e| SentinelError::Audit(e.to_string()))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| SentinelError::Audit(format!("{}: {}", self.path.display(), e)))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| SentinelError::Audit(format!("{}: {}", self.path.display(), e)))?;
        file.flush()
            .await
            .map_err(|e| SentinelError::Audit(format!("{}: {}", self.path.display(), e)))?;
        Ok(())
    }
}

enum LoggerMessage {
    Record(AuditRecord),
    Flush(oneshot::Sender<()>),
}

/// Fire-and-forget logger in front of an [`AuditSink`].
///
/// The queue is bounded; when the sink falls behind, new records are dropped
/// and reported on the error channel instead of blocking the caller.
#[derive(Clone)]
pub struct ViolationLogger {
    tx: Option<mpsc::Sender<LoggerMessage>>,
}

impl ViolationLogger {
    /// Spawn the background worker with the default queue capacity.
    pub fn spawn(sink: Arc<dyn AuditSink>) -> Result<Self> {
        Self::spawn_with_capacity(sink, MAX_AUDIT_ENTRIES)
    }

    /// Spawn the background worker. Fails outside a tokio runtime.
    pub fn spawn_with_capacity(sink: Arc<dyn AuditSink>, capacity: usize) -> Result<Self> {
        let handle = tokio::runtime::Handle::try_current().map_err(|e| {
            SentinelError::Config(format!("audit logger needs a tokio runtime: {}", e))
        })?;
        let (tx, mut rx) = mpsc::channel::<LoggerMessage>(capacity.max(1));

        handle.spawn(async move {
            while let Some(message) = rx.recv().await {
                match message {
                    LoggerMessage::Record(record) => {
                        if let Err(e) = sink.append(&record).await {
                            error!(
                                sink = sink.name(),
                                record_id = %record.id,
                                user_id = %record.user_id,
                                error = %e,
                                "Audit sink append failed"
                            );
                        } else {
                            debug!(sink = sink.name(), record_id = %record.id, "Audit record written");
                        }
                    }
                    LoggerMessage::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
        });

        Ok(Self { tx: Some(tx) })
    }

    /// A logger that discards everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Whether records go anywhere.
    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Enqueue a record. Never blocks and never fails.
    pub fn log(&self, record: AuditRecord) {
        let Some(tx) = &self.tx else {
            return;
        };
        match tx.try_send(LoggerMessage::Record(record)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(LoggerMessage::Record(record))) => {
                error!(
                    record_id = %record.id,
                    user_id = %record.user_id,
                    "Audit queue full, record dropped"
                );
            }
            Err(mpsc::error::TrySendError::Closed(LoggerMessage::Record(record))) => {
                error!(
                    record_id = %record.id,
                    user_id = %record.user_id,
                    "Audit worker stopped, record dropped"
                );
            }
            Err(_) => {}
        }
    }

    /// Wait until every record enqueued so far has reached the sink.
    pub async fn flush(&self) {
        let Some(tx) = &self.tx else {
            return;
        };
        let (ack_tx, ack_rx) = oneshot::channel();
        if tx.send(LoggerMessage::Flush(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ViolationKind;

    struct FailingSink;

    #[async_trait]
    impl AuditSink for FailingSink {
        fn name(&self) -> &str {
            "failing"
        }

        async fn append(&self, _record: &AuditRecord) -> Result<()> {
            Err(SentinelError::Audit("disk full".to_string()))
        }
    }

    fn record(user: &str) -> AuditRecord {
        let outcome = AnalysisOutcome::from_violations(vec![Violation::new(
            ViolationKind::InappropriateContent,
            Severity::Medium,
            "test",
        )]);
        AuditRecord::new(user, "question-box", &outcome, Action::Warn)
    }

    #[tokio::test]
    async fn test_logger_writes_to_sink() {
        let sink = Arc::new(InMemoryAuditSink::new());
        let logger = ViolationLogger::spawn(sink.clone()).unwrap();

        logger.log(record("u1"));
        logger.log(record("u2"));
        logger.flush().await;

        assert_eq!(sink.count().await, 2);
        assert_eq!(sink.by_user("u1", 10).await.len(), 1);
        assert_eq!(sink.recent(1).await[0].user_id, "u2");
    }

    #[tokio::test]
    async fn test_failing_sink_is_swallowed() {
        let logger = ViolationLogger::spawn(Arc::new(FailingSink)).unwrap();
        logger.log(record("u1"));
        logger.flush().await;
        // Still usable afterwards
        logger.log(record("u1"));
        logger.flush().await;
    }

    /// Sink that never finishes an append.
    struct StalledSink;

    #[async_trait]
    impl AuditSink for StalledSink {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn append(&self, _record: &AuditRecord) -> Result<()> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let logger = ViolationLogger::spawn_with_capacity(Arc::new(StalledSink), 2).unwrap();

        let start = std::time::Instant::now();
        for i in 0..100 {
            logger.log(record(&format!("u{}", i)));
        }
        assert!(start.elapsed() < std::time::Duration::from_secs(1));
        assert!(logger.is_enabled());
    }

    #[test]
    fn test_spawn_outside_runtime_is_config_error() {
        let result = ViolationLogger::spawn(Arc::new(InMemoryAuditSink::new()));
        assert!(matches!(result, Err(SentinelError::Config(_))));
    }

    #[tokio::test]
    async fn test_disabled_logger() {
        let logger = ViolationLogger::disabled();
        assert!(!logger.is_enabled());
        logger.log(record("u1"));
        logger.flush().await;
    }

    #[tokio::test]
    async fn test_memory_sink_bounded() {
        let sink = InMemoryAuditSink::with_max_entries(3);
        for i in 0..5 {
            sink.append(&record(&format!("u{}", i))).await.unwrap();
        }
        assert_eq!(sink.count().await, 3);
        assert_eq!(sink.recent(1).await[0].user_id, "u4");
    }

    #[tokio::test]
    async fn test_jsonl_sink_appends() {
        let path = std::env::temp_dir().join(format!("sentinel-audit-{}.jsonl", uuid::Uuid::new_v4()));
        let sink = JsonLinesAuditSink::new(&path);

        sink.append(&record("u1")).await.unwrap();
        sink.append(&record("u2")).await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: AuditRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed.user_id, "u2");
        assert_eq!(parsed.action, Action::Warn);

        let _ = tokio::fs::remove_file(&path).await;
    }
}
