// Shared transport configuration for building reqwest::Client instances.
//
// Keeps timeout and default-header settings in one place so embedding
// applications can inject auth headers without touching request code.

use std::time::Duration;

use reqwest::header::HeaderMap;

/// Settings for the underlying HTTP client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    /// Headers attached to every request (e.g. `Authorization`).
    pub default_headers: HeaderMap,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            default_headers: HeaderMap::new(),
            user_agent: concat!("restive/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .default_headers(self.default_headers.clone())
            .build()?;
        Ok(client)
    }

    /// Replace the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Merge additional default headers into the config.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers.extend(headers);
        self
    }
}
