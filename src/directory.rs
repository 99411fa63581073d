//! Customer and driver directory operations.
//!
//! Listing customers feeds the filter screen's picker; the driver endpoints
//! are admin-only (registering a new driver account, changing a driver's
//! password). Role checks happen here, against the live session, before any
//! request is issued.

use serde_json::Value;
use tracing::{info, warn};

use crate::api::LedgerApi;
use crate::error::ClientError;
use crate::models::{Customer, Driver, NewDriver};
use crate::session::Session;

// ---------------------------------------------------------------------------
// Customers
// ---------------------------------------------------------------------------

/// Fetch every registered customer (`GET /allClients`).
pub async fn list_customers(
    api: &LedgerApi,
    session: &Session,
) -> Result<Vec<Customer>, ClientError> {
    let resp = api
        .get("/allClients", Some(session.token()))
        .await
        .map_err(ClientError::QueryFailed)?;

    parse_rows(&resp, "clients").ok_or_else(|| {
        ClientError::QueryFailed("the ledger response had no clients array".into())
    })
}

/// Fetch the full record for one customer (`GET /allClientDataById/{id}`).
pub async fn customer_detail(
    api: &LedgerApi,
    session: &Session,
    customer_id: i64,
) -> Result<Customer, ClientError> {
    let resp = api
        .get(
            &format!("/allClientDataById/{customer_id}"),
            Some(session.token()),
        )
        .await
        .map_err(ClientError::LookupFailed)?;

    if !resp.get("exists").and_then(Value::as_bool).unwrap_or(false) {
        return Err(ClientError::LookupFailed(format!(
            "no customer with id {customer_id}"
        )));
    }
    resp.get("data")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .ok_or_else(|| {
            ClientError::LookupFailed("the ledger returned an unreadable customer record".into())
        })
}

// ---------------------------------------------------------------------------
// Drivers (admin only)
// ---------------------------------------------------------------------------

/// List driver accounts (`GET /drivers`). Admin only.
pub async fn list_drivers(api: &LedgerApi, session: &Session) -> Result<Vec<Driver>, ClientError> {
    require_admin(session, "list drivers")?;

    let resp = api
        .get("/drivers", Some(session.token()))
        .await
        .map_err(ClientError::QueryFailed)?;

    parse_rows(&resp, "data")
        .ok_or_else(|| ClientError::QueryFailed("the ledger response had no data array".into()))
}

/// Register a new driver account (`POST /register`). Admin only; the role is
/// always "driver" regardless of input.
pub async fn register_driver(
    api: &LedgerApi,
    session: &Session,
    profile: &NewDriver,
) -> Result<(), ClientError> {
    require_admin(session, "register a driver")?;

    let missing = profile.missing_fields();
    if !missing.is_empty() {
        return Err(ClientError::ValidationFailed { fields: missing });
    }
    if profile.password != profile.confirm_password {
        return Err(ClientError::ValidationFailed {
            fields: vec!["confirm_password".to_string()],
        });
    }

    let body = serde_json::json!({
        "name": profile.name.trim(),
        "surname": profile.surname.trim(),
        "phone_number": profile.phone_number.trim(),
        "role": "driver",
        "password": profile.password,
    });

    let resp = api
        .post("/register", &body, Some(session.token()))
        .await
        .map_err(ClientError::RegistrationRejected)?;

    if !resp.get("success").and_then(Value::as_bool).unwrap_or(false) {
        let reason = resp
            .get("message")
            .or_else(|| resp.get("error"))
            .and_then(Value::as_str)
            .unwrap_or("the ledger refused the driver registration")
            .to_string();
        return Err(ClientError::RegistrationRejected(reason));
    }

    info!(phone = %profile.phone_number.trim(), "driver registered");
    Ok(())
}

/// Change a driver's password (`POST /driverPasswordChange`). Admin only.
pub async fn change_driver_password(
    api: &LedgerApi,
    session: &Session,
    driver_id: i64,
    new_password: &str,
) -> Result<(), ClientError> {
    require_admin(session, "change a driver password")?;

    if new_password.trim().is_empty() {
        return Err(ClientError::missing("new_password"));
    }

    let body = serde_json::json!({
        "id": driver_id,
        "newPassword": new_password,
    });

    let resp = api
        .post("/driverPasswordChange", &body, Some(session.token()))
        .await
        .map_err(ClientError::QueryFailed)?;

    if !resp.get("success").and_then(Value::as_bool).unwrap_or(false) {
        return Err(ClientError::QueryFailed(
            "the ledger refused the password change".into(),
        ));
    }

    info!(driver_id, "driver password changed");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn require_admin(session: &Session, what: &str) -> Result<(), ClientError> {
    if session.is_admin() {
        Ok(())
    } else {
        Err(ClientError::Forbidden(format!(
            "only an admin may {what}"
        )))
    }
}

/// Deserialize an array field row by row, skipping malformed entries the way
/// a display list would.
fn parse_rows<T: serde::de::DeserializeOwned>(resp: &Value, field: &str) -> Option<Vec<T>> {
    let rows = resp.get(field)?.as_array()?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        match serde_json::from_value::<T>(row.clone()) {
            Ok(item) => out.push(item),
            Err(e) => warn!(field, error = %e, "skipping malformed row"),
        }
    }
    Some(out)
}

// ===========================================================================
// Tests
// ===========================================================================
