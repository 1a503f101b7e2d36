//! Mock classifier for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use super::traits::*;

/// Scripted behaviour of the mock.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this verdict
    Verdict(ImageVerdict),
    /// Fail as if the service were unreachable
    Unavailable,
    /// Fail with an HTTP status
    Status(u16),
    /// Sleep before answering cleanly (used to exercise caller timeouts)
    Hang(Duration),
}

/// Mock classifier.
///
/// Configurable replies for unit tests.
pub struct MockClassifier {
    reply: MockReply,
    call_count: AtomicU32,
}

impl MockClassifier {
    /// A mock that judges every image clean.
    pub fn clean() -> Self {
        Self::with_reply(MockReply::Verdict(ImageVerdict::clean()))
    }

    /// A mock that flags every image.
    pub fn flagging(details: impl Into<String>) -> Self {
        Self::with_reply(MockReply::Verdict(ImageVerdict::inappropriate(details)))
    }

    /// A mock that is unreachable.
    pub fn unavailable() -> Self {
        Self::with_reply(MockReply::Unavailable)
    }

    /// A mock that takes `delay` to answer.
    pub fn hanging(delay: Duration) -> Self {
        Self::with_reply(MockReply::Hang(delay))
    }

    /// Create with an explicit reply.
    pub fn with_reply(reply: MockReply) -> Self {
        Self {
            reply,
            call_count: AtomicU32::new(0),
        }
    }

    /// Number of classify calls so far.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self::clean()
    }
}

#[async_trait]
impl ImageClassifier for MockClassifier {
    fn id(&self) -> &str {
        "mock-classifier"
    }

    async fn classify(&self, _image: &ImageRef) -> Result<ImageVerdict, ClassifierError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        match &self.reply {
            MockReply::Verdict(verdict) => Ok(verdict.clone()),
            MockReply::Unavailable => Err(ClassifierError::Unavailable(
                "mock classifier offline".to_string(),
            )),
            MockReply::Status(status) => Err(ClassifierError::RequestFailed {
                status: *status,
                body: String::new(),
            }),
            MockReply::Hang(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(ImageVerdict::clean())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_counts_calls() {
        let mock = MockClassifier::flagging("explicit");
        let image = ImageRef::new("img://1");

        let verdict = mock.classify(&image).await.unwrap();
        assert!(verdict.inappropriate_content);
        mock.classify(&image).await.unwrap();
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_unavailable() {
        let mock = MockClassifier::unavailable();
        let err = mock.classify(&ImageRef::new("img://1")).await.unwrap_err();
        assert!(matches!(err, ClassifierError::Unavailable(_)));
        assert!(!err.is_timeout());
    }
}
