//! Shared HTTP client for the admin REST backend.
//!
//! Every component in this crate talks to the same backend, so the
//! `reqwest::Client` (and its connection pool) lives here once, together
//! with the JSON helpers and the HTTP-status → error mapping.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ConsoleError, Result};

/// HTTP client bound to the admin backend base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the given base URL (trailing slash tolerated).
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// The underlying `reqwest` client, for requests that need the raw
    /// response (the streaming chat endpoint).
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Absolute URL for a backend path (`path` starts with `/`).
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET a JSON document.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request_json(self.http.get(self.url(path))).await
    }

    /// GET a JSON document under a per-request timeout.
    pub async fn get_json_with_timeout<T: DeserializeOwned>(
        &self,
        path: &str,
        timeout: Duration,
    ) -> Result<T> {
        self.request_json(self.http.get(self.url(path)).timeout(timeout))
            .await
    }

    /// POST a JSON body and parse the JSON response.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request_json(self.http.post(self.url(path)).json(body))
            .await
    }

    /// DELETE a resource; only the status matters.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let response = self
            .http
            .delete(self.url(path))
            .send()
            .await
            .map_err(|e| ConsoleError::Request(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }
        Ok(())
    }

    async fn request_json<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| ConsoleError::Request(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ConsoleError::Request(format!("malformed response body: {e}")))
    }
}

/// Map a non-2xx status to an error, calling out auth and rate-limit
/// statuses in the message text.
pub(crate) fn status_error(status: reqwest::StatusCode, body: &str) -> ConsoleError {
    let message = extract_error_message(body);
    match status.as_u16() {
        401 | 403 => ConsoleError::Request(format!("backend authentication failed: {message}")),
        429 => ConsoleError::Request(format!("backend rate limited: {message}")),
        code => ConsoleError::Request(format!("backend HTTP {code}: {message}")),
    }
}

/// Pull a human-readable message out of a backend error body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .and_then(|m| m.as_str())
                .map(String::from)
                .or_else(|| v.get("error").and_then(|e| e.as_str()).map(String::from))
        })
        .unwrap_or_else(|| body.to_owned())
}
