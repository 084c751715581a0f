//! Dynamic request-timeout budget from the backend.
//!
//! Operators tune the streaming timeout server-side; the console picks
//! it up per exchange. The fetch itself runs under a short budget of
//! its own and falls back to a hardcoded constant on any failure, so a
//! slow or absent config endpoint can never wedge a chat exchange.

use std::time::Duration;

use serde::Deserialize;

use crate::api::ApiClient;
use crate::error::{ConsoleError, Result};

/// Fallback streaming-timeout budget when the backend value is
/// unavailable.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 120_000;

/// Budget for the timeout-config fetch itself, distinct from the
/// streaming budget it retrieves.
const CONFIG_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct TimeoutConfigResponse {
    frontend_timeout_ms: u64,
}

/// Fetches the streaming-timeout budget with a safe fallback.
#[derive(Debug, Clone)]
pub struct ConfigSync {
    api: ApiClient,
}

impl ConfigSync {
    /// Create a config client.
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// The streaming-timeout budget in milliseconds. Never errors: any
    /// fetch failure logs and returns [`DEFAULT_REQUEST_TIMEOUT_MS`].
    pub async fn request_timeout_ms(&self) -> u64 {
        match self.fetch().await {
            Ok(ms) => ms,
            Err(err) => {
                tracing::warn!("timeout config fetch failed, using fallback: {err}");
                DEFAULT_REQUEST_TIMEOUT_MS
            }
        }
    }

    async fn fetch(&self) -> Result<u64> {
        let response: TimeoutConfigResponse = self
            .api
            .get_json_with_timeout("/config/timeout", CONFIG_FETCH_TIMEOUT)
            .await
            .map_err(|e| ConsoleError::Config(e.to_string()))?;
        Ok(response.frontend_timeout_ms)
    }
}
