//! Device-local session persistence using the OS credential store.
//!
//! On Windows this uses DPAPI (via the `keyring` crate), on macOS Keychain,
//! and on Linux the Secret Service API / keyutils. The token, role, and actor
//! id survive app restarts and are cleared entirely on logout.

use keyring::Entry;
use tracing::{info, warn};

use crate::error::ClientError;
use crate::session::{Role, Session};

const SERVICE_NAME: &str = "courier-field";

// Credential keys
const KEY_TOKEN: &str = "session_token";
const KEY_ROLE: &str = "session_role";
const KEY_ACTOR_ID: &str = "session_actor_id";

/// All credential keys managed by this module.
const ALL_KEYS: &[&str] = &[KEY_TOKEN, KEY_ROLE, KEY_ACTOR_ID];

// ---------------------------------------------------------------------------
// Low-level helpers
// ---------------------------------------------------------------------------

/// Retrieve a single credential from the OS keyring. Returns `None` when the
/// entry does not exist (or the platform returns a "not found" error).
pub fn get_credential(key: &str) -> Option<String> {
    let entry = match Entry::new(SERVICE_NAME, key) {
        Ok(e) => e,
        Err(e) => {
            warn!(key, error = %e, "keyring: failed to create entry");
            return None;
        }
    };
    match entry.get_password() {
        Ok(pw) => Some(pw),
        Err(keyring::Error::NoEntry) => None,
        Err(e) => {
            warn!(key, error = %e, "keyring: failed to read credential");
            None
        }
    }
}

/// Store a credential in the OS keyring.
pub fn set_credential(key: &str, value: &str) -> Result<(), String> {
    let entry = Entry::new(SERVICE_NAME, key).map_err(|e| e.to_string())?;
    entry.set_password(value).map_err(|e| e.to_string())?;
    Ok(())
}

/// Delete a credential from the OS keyring. Silently succeeds if the entry
/// does not exist.
pub fn delete_credential(key: &str) -> Result<(), String> {
    let entry = Entry::new(SERVICE_NAME, key).map_err(|e| e.to_string())?;
    match entry.delete_credential() {
        Ok(()) => Ok(()),
        Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Session persistence
// ---------------------------------------------------------------------------

/// Persist the full session. All three values are written so that a restore
/// never observes a half-updated session.
pub fn persist_session(session: &Session) -> Result<(), String> {
    set_credential(KEY_TOKEN, session.token())?;
    set_credential(KEY_ROLE, session.role().as_str())?;
    set_credential(KEY_ACTOR_ID, &session.actor_id().to_string())?;
    info!(actor_id = session.actor_id(), role = %session.role().as_str(), "session persisted");
    Ok(())
}

/// Restore the session from device storage. Any absent or malformed value
/// yields `SessionInvalid`; the caller must force re-authentication rather
/// than attempt a partial repair.
pub fn load_session() -> Result<Session, ClientError> {
    let token = get_credential(KEY_TOKEN)
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ClientError::SessionInvalid("no stored token".into()))?;
    let role = get_credential(KEY_ROLE)
        .as_deref()
        .and_then(Role::parse)
        .ok_or_else(|| ClientError::SessionInvalid("no stored role".into()))?;
    let actor_id = get_credential(KEY_ACTOR_ID)
        .and_then(|v| v.trim().parse::<i64>().ok())
        .ok_or_else(|| ClientError::SessionInvalid("no stored actor id".into()))?;

    Ok(Session::new(actor_id, role, token))
}

/// Remove every stored session value (logout).
pub fn clear_session() -> Result<(), String> {
    info!("clearing stored session");
    for key in ALL_KEYS {
        delete_credential(key)?;
    }
    Ok(())
}

/// Whether a stored token exists at all (fast startup check; the token may
/// still fail to decode).
pub fn has_session() -> bool {
    get_credential(KEY_TOKEN).is_some()
}

// ===========================================================================
// Tests
// ===========================================================================
