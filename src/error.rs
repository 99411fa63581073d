//! Error taxonomy for the field client.
//!
//! Local validation failures never reach the network layer; remote failures
//! are caught at the operation boundary and surfaced with an actionable
//! message, and the workflow returns to the state that preceded the failed
//! operation. `SessionInvalid` is fatal to the current session and forces
//! re-authentication.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Every error an operation of this client can surface.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Local input validation failed; lists the offending fields. No request
    /// was sent.
    #[error("validation failed: {}", .fields.join(", "))]
    ValidationFailed { fields: Vec<String> },

    /// The identity lookup could not be completed (transport or parse
    /// failure). The caller stays in the scanning state and may retry.
    #[error("client lookup failed: {0}")]
    LookupFailed(String),

    /// The order query could not be completed. The caller keeps the previous
    /// result set displayed.
    #[error("order query failed: {0}")]
    QueryFailed(String),

    /// Order submission failed; no partial order exists on the client side.
    #[error("order creation failed: {0}")]
    OrderCreationFailed(String),

    /// The ledger refused a registration (e.g. duplicate code) and gave a
    /// reason. Not retried automatically.
    #[error("registration rejected: {0}")]
    RegistrationRejected(String),

    /// `dateFrom` is after `dateTo`; detected locally, no request issued.
    #[error("invalid date range: {start} is after {end}")]
    InvalidDateRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// The stored credential is absent or malformed. The session must be
    /// replaced via re-authentication, never repaired in place.
    #[error("session invalid: {0}")]
    SessionInvalid(String),

    /// Sign-in was refused by the ledger (wrong phone number or password).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The signed-in role is not allowed to perform this operation.
    #[error("forbidden: {0}")]
    Forbidden(String),
}

impl ClientError {
    /// Convenience constructor for a single-field validation failure.
    pub fn missing(field: &str) -> Self {
        ClientError::ValidationFailed {
            fields: vec![field.to_string()],
        }
    }

    /// Whether this error invalidates the session entirely. Everything else
    /// is recoverable by correcting input or retrying the same action.
    pub fn requires_reauth(&self) -> bool {
        matches!(self, ClientError::SessionInvalid(_))
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_lists_fields() {
        let err = ClientError::ValidationFailed {
            fields: vec!["name".into(), "city".into()],
        };
        assert_eq!(err.to_string(), "validation failed: name, city");
    }

    #[test]
    fn only_session_invalid_forces_reauth() {
        assert!(ClientError::SessionInvalid("no token".into()).requires_reauth());
        assert!(!ClientError::LookupFailed("timeout".into()).requires_reauth());
        assert!(!ClientError::missing("price").requires_reauth());
    }
}
