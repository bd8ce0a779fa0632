use reqwest::{Client, ClientBuilder};
use std::time::Duration;

use crate::error::{OncoselError, Result};

/// Default timeout for evidence and insights calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

/// A timeout-bounded HTTP client shared by all external-service
/// clients. Every request carries a hard timeout; callers with
/// engine-specific budgets (larger scoring windows) override it per
/// call.
#[derive(Debug, Clone)]
pub struct BoundedClient {
    client: Client,
    default_timeout: Duration,
}

impl BoundedClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(default_timeout: Duration) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(default_timeout)
            .build()
            .map_err(|e| OncoselError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, default_timeout })
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client.get(url).timeout(self.default_timeout)
    }

    pub fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.client.post(url).timeout(self.default_timeout)
    }

    /// GET with a caller-chosen timeout (per-engine budgets).
    pub fn get_with_timeout(&self, url: &str, timeout: Duration) -> reqwest::RequestBuilder {
        self.client.get(url).timeout(timeout)
    }

    /// POST with a caller-chosen timeout.
    pub fn post_with_timeout(&self, url: &str, timeout: Duration) -> reqwest::RequestBuilder {
        self.client.post(url).timeout(timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds() {
        let c = BoundedClient::new().unwrap();
        assert_eq!(c.default_timeout(), DEFAULT_TIMEOUT);
    }
}
