//! Sentinel Classifier - image-safety collaborator client
//!
//! Provides the boundary to the external image-safety classification
//! service used by the Sentinel image detector:
//! - Trait-based classifier abstraction (`ImageClassifier`)
//! - HTTP implementation speaking the `{image} -> {inappropriateContent, details}` contract
//! - Scriptable mock for tests
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │    ImageDetector     │   (sentinel crate)
//! └──────────┬───────────┘
//!            │ classify(image)
//!            ▼
//! ┌──────────────────────┐       POST {image}
//! │   ImageClassifier    │ ─────────────────────▶  external service
//! │ (Http / Mock)        │ ◀─────────────────────
//! └──────────────────────┘  {inappropriateContent, details}
//! ```

pub mod http;
pub mod mock;
pub mod traits;

pub use http::HttpImageClassifier;
pub use mock::{MockClassifier, MockReply};
pub use traits::{ClassifierError, ImageClassifier, ImageRef, ImageVerdict};
