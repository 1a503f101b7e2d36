//! Sentinel - content-safety monitoring for user submissions
//!
//! Every text or image a user submits passes through one pipeline:
//!
//! - **Detection**: keyword text scan and an external image classifier
//! - **Aggregation**: order-independent merge of detector outcomes
//! - **Behavior**: per-user violation counts and history
//! - **Escalation**: warn, suspend, ban, or crisis block with resources
//! - **Audit**: fire-and-forget violation log
//!
//! Analysis failures never let content through: a detector that times
//! out or errors produces an `analysis_error` finding instead.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                       ContentMonitor                          │
//! │                                                               │
//! │  ┌──────────┐   ┌───────────┐   ┌──────────┐   ┌───────────┐  │
//! │  │ Detectors│──▶│ Aggregate │──▶│ Behavior │──▶│ Escalation│  │
//! │  └──────────┘   └───────────┘   └──────────┘   └─────┬─────┘  │
//! │                                                      │        │
//! │                          ┌──────────────┐    ┌───────▼─────┐  │
//! │                          │ ViolationLog │◀───│   Session   │  │
//! │                          └──────────────┘    └─────────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```

pub mod aggregate;
pub mod audit;
pub mod behavior;
pub mod config;
pub mod crisis;
pub mod detect;
pub mod escalation;
pub mod monitor;
pub mod session;
pub mod types;

// Re-export main types
pub use audit::{AuditRecord, AuditSink, InMemoryAuditSink, JsonLinesAuditSink, ViolationLogger};
pub use behavior::{BehaviorRecord, BehaviorStore, HistoryEntry};
pub use config::SentinelConfig;
pub use crisis::CrisisResourceBundle;
pub use detect::{Detector, DetectorVerdict};
pub use monitor::{CheckOutcome, ContentMonitor, MonitorBuilder};
pub use session::{BlockCause, ModerationState, SessionState};
pub use types::*;
