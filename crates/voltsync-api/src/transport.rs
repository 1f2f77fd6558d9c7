// Shared transport configuration for building reqwest::Client instances.
//
// The vendor API fingerprints clients on the user-agent pair, so the
// headers are fixed here rather than left to reqwest defaults.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

/// The vendor-specific user-agent header required on every request.
const VENDOR_USER_AGENT: &str = "VoltApp/3.4.4-350/android/8.1.0";

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-vendor-user-agent",
            HeaderValue::from_static(VENDOR_USER_AGENT),
        );

        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent("voltsync/0.1.0")
            .default_headers(headers)
            .gzip(true)
            .build()
            .map_err(crate::error::Error::Transport)
    }
}
