//! Identity resolution: scanned code -> existing customer or registration.
//!
//! `resolve` is idempotent and side-effect-free: two consecutive calls with no
//! intervening registration yield the same variant for the same code. On a
//! transport or parse failure it never guesses — the caller stays in the
//! scanning state and may retry.

use serde_json::Value;
use tracing::{info, warn};

use crate::api::LedgerApi;
use crate::error::ClientError;
use crate::models::{Customer, NewCustomer, ScanResult};
use crate::session::Session;

/// Look up a scanned code against the ledger (`GET /clients/{code}`).
pub async fn resolve(
    api: &LedgerApi,
    session: &Session,
    code: &str,
) -> Result<ScanResult, ClientError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(ClientError::missing("scanned_code"));
    }

    let resp = api
        .get(&format!("/clients/{code}"), Some(session.token()))
        .await
        .map_err(ClientError::LookupFailed)?;

    parse_lookup(resp, code)
}

/// Register a new customer under a scanned code (`POST /clients/register`).
///
/// The profile is validated locally first; an incomplete form never reaches
/// the network. The returned record has a zero loyalty balance and becomes
/// the operand for order creation in the same workflow.
pub async fn register(
    api: &LedgerApi,
    session: &Session,
    code: &str,
    profile: &NewCustomer,
) -> Result<Customer, ClientError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(ClientError::missing("scanned_code"));
    }
    let missing = profile.missing_fields();
    if !missing.is_empty() {
        return Err(ClientError::ValidationFailed { fields: missing });
    }

    let body = serde_json::json!({
        "name": profile.name.trim(),
        "surname": profile.surname.trim(),
        "phone_number": profile.phone_number.trim(),
        "country": profile.country.trim(),
        "city": profile.city.trim(),
        "qr_code_id": code,
    });

    let resp = api
        .post("/clients/register", &body, Some(session.token()))
        .await
        .map_err(ClientError::RegistrationRejected)?;

    let customer = parse_registration(&resp)?;

    info!(customer_id = customer.id, code, "customer registered");
    Ok(customer)
}

/// Interpret the `{success, client}` registration response. A refusal keeps
/// the ledger's own reason; a confirmation without a customer record is
/// still a rejection, because the record is the operand for the rest of the
/// workflow.
fn parse_registration(resp: &Value) -> Result<Customer, ClientError> {
    if !resp.get("success").and_then(Value::as_bool).unwrap_or(false) {
        let reason = resp
            .get("message")
            .or_else(|| resp.get("error"))
            .and_then(Value::as_str)
            .unwrap_or("the ledger refused the registration")
            .to_string();
        return Err(ClientError::RegistrationRejected(reason));
    }

    resp.get("client")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .ok_or_else(|| {
            ClientError::RegistrationRejected("ledger response carried no customer record".into())
        })
}

/// Interpret the `{exists, data}` lookup response. `exists: true` without a
/// parseable record is a parse failure, not a guessable outcome.
fn parse_lookup(resp: Value, code: &str) -> Result<ScanResult, ClientError> {
    match resp.get("exists").and_then(Value::as_bool) {
        Some(true) => {
            let customer: Customer = resp
                .get("data")
                .cloned()
                .and_then(|v| serde_json::from_value(v).ok())
                .ok_or_else(|| {
                    warn!(code, "lookup said exists but carried no readable record");
                    ClientError::LookupFailed(
                        "the ledger returned an unreadable customer record".into(),
                    )
                })?;
            info!(code, customer_id = customer.id, "scanned code resolved");
            Ok(ScanResult::Found(customer))
        }
        Some(false) => {
            info!(code, "scanned code is unregistered");
            Ok(ScanResult::NotFound {
                code: code.to_string(),
            })
        }
        None => Err(ClientError::LookupFailed(
            "the ledger response had no exists flag".into(),
        )),
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_parses_found() {
        let resp = serde_json::json!({
            "exists": true,
            "data": {
                "id": 11, "name": "Jovan", "surname": "Peric",
                "phone_number": "+38160111222", "country": "Srbija",
                "city": "Novi Sad", "loyalty_bonus_money": 50.0
            }
        });
        match parse_lookup(resp, "QR-11").unwrap() {
            ScanResult::Found(c) => {
                assert_eq!(c.id, 11);
                assert_eq!(c.loyalty_bonus_money, 50.0);
            }
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[test]
    fn lookup_parses_not_found() {
        let resp = serde_json::json!({ "exists": false });
        match parse_lookup(resp, "QR-NEW").unwrap() {
            ScanResult::NotFound { code } => assert_eq!(code, "QR-NEW"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn lookup_is_idempotent_for_same_response() {
        let resp = serde_json::json!({ "exists": false });
        let first = parse_lookup(resp.clone(), "QR-X").unwrap();
        let second = parse_lookup(resp, "QR-X").unwrap();
        assert!(matches!(
            (first, second),
            (ScanResult::NotFound { .. }, ScanResult::NotFound { .. })
        ));
    }

    #[test]
    fn exists_without_record_is_lookup_failed() {
        let resp = serde_json::json!({ "exists": true });
        assert!(matches!(
            parse_lookup(resp, "QR-11"),
            Err(ClientError::LookupFailed(_))
        ));
    }

    #[test]
    fn missing_exists_flag_is_lookup_failed() {
        let resp = serde_json::json!({ "status": "ok" });
        assert!(matches!(
            parse_lookup(resp, "QR-11"),
            Err(ClientError::LookupFailed(_))
        ));
    }

    #[test]
    fn fresh_registration_starts_with_empty_balance() {
        let resp = serde_json::json!({
            "success": true,
            "client": {
                "id": 42, "name": "Mila", "surname": "Ilic",
                "phone_number": "+38163444555", "country": "Srbija",
                "city": "Nis", "qr_code_id": "QR-NEW"
            }
        });
        let customer = parse_registration(&resp).unwrap();
        assert_eq!(customer.id, 42);
        assert_eq!(customer.loyalty_bonus_money, 0.0);
        assert_eq!(customer.qr_code_id.as_deref(), Some("QR-NEW"));
    }

    #[test]
    fn refused_registration_surfaces_ledger_reason() {
        let resp = serde_json::json!({
            "success": false,
            "message": "phone number already registered"
        });
        match parse_registration(&resp) {
            Err(ClientError::RegistrationRejected(reason)) => {
                assert_eq!(reason, "phone number already registered");
            }
            other => panic!("expected RegistrationRejected, got {other:?}"),
        }
    }

    #[test]
    fn confirmation_without_customer_record_is_rejected() {
        let resp = serde_json::json!({ "success": true });
        assert!(matches!(
            parse_registration(&resp),
            Err(ClientError::RegistrationRejected(_))
        ));
    }

    #[tokio::test]
    async fn incomplete_profile_never_reaches_the_network() {
        use crate::config::LedgerConfig;
        use crate::session::Role;

        let api = LedgerApi::new(LedgerConfig::new("localhost:1")).unwrap();
        let session = Session::new(3, Role::Driver, "tok".into());
        let profile = NewCustomer {
            name: "Mila".into(),
            surname: String::new(),
            phone_number: String::new(),
            country: "Srbija".into(),
            city: "Nis".into(),
        };
        match register(&api, &session, "QR-NEW", &profile).await {
            Err(ClientError::ValidationFailed { fields }) => {
                assert_eq!(fields, vec!["surname", "phone_number"]);
            }
            other => panic!("expected ValidationFailed, got {other:?}"),
        }
    }
}
