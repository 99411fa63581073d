//! Dispatch ledger endpoint configuration.
//!
//! The base URL is provided by deployment config (it is not baked into the
//! binary) and gets normalised once, up front, so the rest of the client can
//! join paths onto it without worrying about trailing slashes or schemes.

/// Normalise the dispatch ledger URL:
/// - strip trailing slashes
/// - strip a trailing `/api` segment
/// - ensure a scheme is present (https, or http for localhost)
pub fn normalize_base_url(url: &str) -> String {
    let mut url = url.trim().to_string();

    if !url.starts_with("http://") && !url.starts_with("https://") {
        // Local dev ledgers run plain http; anything else gets TLS.
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }

    // Peel trailing slashes and a final "/api" segment, in any order, so
    // endpoint() can append its own path blindly.
    loop {
        if url.ends_with('/') {
            url.pop();
        } else if url.ends_with("/api") {
            url.truncate(url.len() - 4);
        } else {
            break;
        }
    }

    url
}

/// Resolved ledger endpoint.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    base_url: String,
}

impl LedgerConfig {
    pub fn new(url: &str) -> Self {
        Self {
            base_url: normalize_base_url(url),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join a path (with leading slash) onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
