//! Sign-in against the dispatch ledger and session lifecycle.
//!
//! `login` exchanges phone number + password for a token via `POST /login`,
//! builds the session from the response, and persists it in device storage.
//! `restore` rebuilds the session on startup; `logout` destroys it. A session
//! is never repaired in place — once invalid it is replaced by a fresh login.

use serde_json::Value;
use tracing::{info, warn};

use crate::api::LedgerApi;
use crate::error::ClientError;
use crate::session::{Role, Session};
use crate::storage;

/// Authenticate and establish a new session.
///
/// Both fields are required locally; no request is sent otherwise. On success
/// the token, role, and actor id are persisted so the session survives app
/// restarts.
pub async fn login(
    api: &LedgerApi,
    phone_number: &str,
    password: &str,
) -> Result<Session, ClientError> {
    let mut missing = Vec::new();
    if phone_number.trim().is_empty() {
        missing.push("phone_number".to_string());
    }
    if password.is_empty() {
        missing.push("password".to_string());
    }
    if !missing.is_empty() {
        return Err(ClientError::ValidationFailed { fields: missing });
    }

    let body = serde_json::json!({
        "phoneNumber": phone_number.trim(),
        "password": password,
    });

    let resp = api
        .post("/login", &body, None)
        .await
        .map_err(ClientError::AuthFailed)?;

    if !resp.get("success").and_then(Value::as_bool).unwrap_or(false) {
        return Err(ClientError::AuthFailed(
            "Wrong phone number or password".into(),
        ));
    }

    let session = session_from_login(&resp)?;

    if let Err(e) = storage::persist_session(&session) {
        // The session is still usable for this run; it just won't survive a
        // restart on this device.
        warn!(error = %e, "could not persist session to device storage");
    }

    info!(
        actor_id = session.actor_id(),
        role = %session.role().as_str(),
        "login successful"
    );
    Ok(session)
}

/// Restore the persisted session on startup. `SessionInvalid` means the user
/// must sign in again.
pub fn restore() -> Result<Session, ClientError> {
    let session = storage::load_session()?;
    info!(
        actor_id = session.actor_id(),
        role = %session.role().as_str(),
        "session restored from device storage"
    );
    Ok(session)
}

/// Destroy the current session and wipe device storage.
pub fn logout() {
    if let Err(e) = storage::clear_session() {
        warn!(error = %e, "failed to clear stored session");
    }
    info!("logged out");
}

/// Build the session from the login response. Prefers the token's own claims;
/// falls back to the `user` object for ledger versions whose tokens carry no
/// readable payload.
fn session_from_login(resp: &Value) -> Result<Session, ClientError> {
    let token = resp
        .get("token")
        .and_then(Value::as_str)
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ClientError::SessionInvalid("login response carried no token".into()))?;

    if let Ok(session) = Session::from_token(token) {
        return Ok(session);
    }

    let user = resp
        .get("user")
        .ok_or_else(|| ClientError::SessionInvalid("login response carried no user".into()))?;
    let actor_id = user
        .get("id")
        .and_then(|v| v.as_i64().or_else(|| v.as_str()?.trim().parse().ok()))
        .ok_or_else(|| ClientError::SessionInvalid("login response carried no actor id".into()))?;
    let role = user
        .get("role")
        .and_then(Value::as_str)
        .and_then(Role::parse)
        .ok_or_else(|| ClientError::SessionInvalid("login response carried no usable role".into()))?;

    Ok(Session::new(actor_id, role, token.to_string()))
}

// ===========================================================================
// Tests
// ===========================================================================
