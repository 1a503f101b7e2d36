//! HTTP image-safety classifier.
//!
//! Speaks the collaborator contract:
//! `POST <endpoint> {"image": "..."} -> {"inappropriateContent": bool, "details": ...}`.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::traits::*;

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// HTTP-backed classifier.
pub struct HttpImageClassifier {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpImageClassifier {
    /// Create a classifier posting to `endpoint`.
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Result<Self, ClassifierError> {
        Self::with_timeout(endpoint, api_key, DEFAULT_TIMEOUT)
    }

    /// Create with a custom request timeout.
    pub fn with_timeout(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClassifierError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ClassifierError::Unavailable(format!("HTTP client init: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            timeout,
        })
    }

    /// Configured endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn auth_header(&self) -> Option<String> {
        self.api_key.as_ref().map(|k| format!("Bearer {}", k))
    }

    fn map_transport_error(&self, e: reqwest::Error) -> ClassifierError {
        if e.is_timeout() {
            ClassifierError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            ClassifierError::Unavailable(e.to_string())
        }
    }
}

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    image: &'a str,
}

#[async_trait]
impl ImageClassifier for HttpImageClassifier {
    fn id(&self) -> &str {
        &self.endpoint
    }

    async fn classify(&self, image: &ImageRef) -> Result<ImageVerdict, ClassifierError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&ClassifyRequest { image: image.as_str() });

        if let Some(auth) = self.auth_header() {
            request = request.header(header::AUTHORIZATION, auth);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 429 {
                let retry_after_ms = response
                    .headers()
                    .get(header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(|secs| secs.saturating_mul(1000));
                return Err(ClassifierError::RateLimited { retry_after_ms });
            }

            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::RequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        let verdict: ImageVerdict = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.map_transport_error(e)
            } else {
                ClassifierError::ParseError(e.to_string())
            }
        })?;

        debug!(
            endpoint = %self.endpoint,
            inappropriate = verdict.inappropriate_content,
            "Image classified"
        );

        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creation() {
        let classifier =
            HttpImageClassifier::new("http://localhost:9000/classify", None).unwrap();
        assert_eq!(classifier.id(), "http://localhost:9000/classify");
        assert!(classifier.auth_header().is_none());
    }

    #[test]
    fn test_auth_header() {
        let classifier = HttpImageClassifier::new(
            "http://localhost:9000/classify",
            Some("secret".to_string()),
        )
        .unwrap();
        assert_eq!(classifier.auth_header().as_deref(), Some("Bearer secret"));
    }
}
