// Shared transport configuration for building the reqwest::Client.
//
// The node only ever talks plain HTTP to devices on the local network, so
// there is no TLS or cookie handling here, just the default timeout and
// user agent.

use std::time::Duration;

use crate::error::Error;

const USER_AGENT: &str = concat!("voxbridge/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Default request timeout. Individual calls may override it.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5000),
            user_agent: USER_AGENT.into(),
        }
    }
}

impl TransportConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .build()
            .map_err(|e| Error::Client(e.to_string()))
    }
}
