//! HTTP transport for the remote taxa service.
//!
//! The client only needs a GET that returns a status code and a body, so the
//! transport is a small object-safe trait. `HttpTransport` talks to the real
//! service through reqwest; tests substitute a scripted implementation.

use async_trait::async_trait;
use std::time::Duration;

/// Status code and raw body of one HTTP exchange.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }
}

/// Network failure before any HTTP status was received.
#[derive(Debug, thiserror::Error)]
#[error("Request to {url} failed: {message}")]
pub struct TransportError {
    pub url: String,
    pub message: String,
}

/// Trait that every transport implements.
///
/// Uses `async_trait` because the client stores a `Box<dyn TaxaTransport>`.
#[async_trait]
pub trait TaxaTransport: Send + Sync {
    /// Transport name for logging.
    fn name(&self) -> &str;

    /// Issue a GET request for `url` with the given query parameters.
    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<TransportResponse, TransportError>;
}

/// reqwest-backed transport for the public taxa API.
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl TaxaTransport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<TransportResponse, TransportError> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .header("Content-type", "application/json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| TransportError {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| TransportError {
            url: url.to_string(),
            message: format!("Failed to read response body: {e}"),
        })?;

        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let ok = TransportResponse {
            status: 200,
            body: String::new(),
        };
        assert!(ok.is_success());
        assert!(!ok.is_rate_limited());

        let limited = TransportResponse {
            status: 429,
            body: String::new(),
        };
        assert!(!limited.is_success());
        assert!(limited.is_rate_limited());

        let missing = TransportResponse {
            status: 404,
            body: String::new(),
        };
        assert!(!missing.is_success());
        assert!(!missing.is_rate_limited());
    }
}
