//! HTTP transport to the dispatch ledger service.
//!
//! Wraps `reqwest` with the ledger's conventions: JSON bodies, bearer-token
//! auth, and user-friendly error messages for transport and status failures.
//! Higher layers (`identity`, `ledger`, `directory`, `auth`) map these string
//! messages into the typed error taxonomy at each operation boundary.

use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::LedgerConfig;

/// Default timeout for ledger requests (30 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Convert a `reqwest::Error` into a user-friendly message.
fn friendly_error(url: &str, err: &reqwest::Error) -> String {
    if err.is_connect() {
        return format!("Cannot reach the dispatch ledger at {url}");
    }
    if err.is_timeout() {
        return format!("Connection to {url} timed out");
    }
    if err.is_builder() {
        return format!("Invalid dispatch ledger URL: {url}");
    }
    format!("Network error communicating with {url}: {err}")
}

/// Convert an HTTP status code into a user-friendly message.
fn status_error(status: StatusCode) -> String {
    match status.as_u16() {
        401 => "Session token is invalid or expired".to_string(),
        403 => "This account is not allowed to do that".to_string(),
        404 => "Dispatch ledger endpoint not found".to_string(),
        s if s >= 500 => format!("Dispatch ledger server error (HTTP {s})"),
        s => format!("Unexpected response from dispatch ledger (HTTP {s})"),
    }
}

/// Pull the most useful message out of a non-success response body.
/// Preserves the ledger's own `error`/`message` fields when present.
fn extract_error_detail(status: StatusCode, body_text: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body_text) {
        let message = json
            .get("error")
            .or_else(|| json.get("message"))
            .and_then(Value::as_str)
            .map(|s| s.to_string())
            .unwrap_or_else(|| status_error(status));
        if let Some(details) = json.get("details").or_else(|| json.get("errors")) {
            return format!("{message} (HTTP {}): {}", status.as_u16(), details);
        }
        return format!("{message} (HTTP {})", status.as_u16());
    }
    if !body_text.trim().is_empty() {
        return format!(
            "{} (HTTP {}): {}",
            status_error(status),
            status.as_u16(),
            body_text.trim()
        );
    }
    format!("{} (HTTP {})", status_error(status), status.as_u16())
}

// ---------------------------------------------------------------------------
// Ledger API client
// ---------------------------------------------------------------------------

/// Authenticated JSON client for the dispatch ledger.
pub struct LedgerApi {
    config: LedgerConfig,
    client: Client,
}

impl LedgerApi {
    pub fn new(config: LedgerConfig) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {e}"))?;
        Ok(Self { config, client })
    }

    pub fn base_url(&self) -> &str {
        self.config.base_url()
    }

    /// GET a path (leading slash included, e.g. `/clients/QR-123`).
    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<Value, String> {
        self.get_with_query(path, &[], token).await
    }

    /// GET with query parameters appended.
    pub async fn get_with_query(
        &self,
        path: &str,
        query: &[(String, String)],
        token: Option<&str>,
    ) -> Result<Value, String> {
        let url = self.config.endpoint(path);
        debug!(%url, params = query.len(), "ledger GET");

        let mut req = self.client.get(&url).query(query);
        if let Some(t) = token {
            req = req.bearer_auth(t);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| friendly_error(self.config.base_url(), &e))?;
        Self::read_json(resp).await
    }

    /// POST a JSON body to a path.
    pub async fn post(&self, path: &str, body: &Value, token: Option<&str>) -> Result<Value, String> {
        let url = self.config.endpoint(path);
        debug!(%url, "ledger POST");

        let mut req = self.client.post(&url).json(body);
        if let Some(t) = token {
            req = req.bearer_auth(t);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| friendly_error(self.config.base_url(), &e))?;
        Self::read_json(resp).await
    }

    /// Check the status and parse the JSON body, or `null` for an empty 204.
    async fn read_json(resp: reqwest::Response) -> Result<Value, String> {
        let status = resp.status();
        let body_text = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(extract_error_detail(status, &body_text));
        }
        if body_text.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body_text)
            .map_err(|e| format!("Invalid JSON from dispatch ledger: {e}"))
    }
}

// ===========================================================================
// Tests
// ===========================================================================
