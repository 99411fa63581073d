//! Session context: who is signed in, and as what.
//!
//! A `Session` is populated once after authentication succeeds (or restored
//! from device storage on startup) by decoding the issued token. It is
//! immutable for its lifetime; logout replaces it entirely rather than
//! repairing it in place. Every role-scoped operation takes the session as an
//! explicit argument — there is no ambient singleton.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use serde_json::Value;

use crate::error::ClientError;

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// The two roles the ledger issues. Drivers only ever see their own orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Driver,
}

impl Role {
    pub fn parse(s: &str) -> Option<Role> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "driver" => Some(Role::Driver),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Driver => "driver",
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The authenticated actor's identity, role, and credential.
#[derive(Debug, Clone)]
pub struct Session {
    actor_id: i64,
    role: Role,
    token: String,
}

impl Session {
    pub fn new(actor_id: i64, role: Role, token: String) -> Self {
        Self {
            actor_id,
            role,
            token,
        }
    }

    /// Build a session by decoding the issued token's claims.
    pub fn from_token(token: &str) -> Result<Self, ClientError> {
        let claims = decode_token_claims(token)
            .ok_or_else(|| ClientError::SessionInvalid("token is malformed".into()))?;

        let actor_id = claims
            .get("id")
            .and_then(claim_as_i64)
            .ok_or_else(|| ClientError::SessionInvalid("token has no actor id".into()))?;
        let role = claims
            .get("role")
            .and_then(Value::as_str)
            .and_then(Role::parse)
            .ok_or_else(|| ClientError::SessionInvalid("token has no usable role".into()))?;

        Ok(Self::new(actor_id, role, token.to_string()))
    }

    pub fn actor_id(&self) -> i64 {
        self.actor_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

// ---------------------------------------------------------------------------
// Token decoding
// ---------------------------------------------------------------------------

/// Decode the claims segment of a JWT-shaped token without verifying the
/// signature — verification is the ledger's job; the client only needs the
/// actor id and role for display and query scoping.
pub fn decode_token_claims(token: &str) -> Option<Value> {
    let payload = token.trim().split('.').nth(1)?;
    if payload.is_empty() {
        return None;
    }

    let base64 = payload.replace('-', "+").replace('_', "/");
    let padded = format!(
        "{}{}",
        base64,
        "=".repeat((4usize.wrapping_sub(base64.len() % 4)) % 4)
    );
    let decoded = BASE64_STANDARD.decode(padded).ok()?;
    serde_json::from_slice::<Value>(&decoded).ok()
}

/// Actor ids arrive as numbers from some ledger versions and as strings from
/// others.
fn claim_as_i64(v: &Value) -> Option<i64> {
    v.as_i64().or_else(|| v.as_str()?.trim().parse().ok())
}

// ===========================================================================
// Tests
// ===========================================================================
