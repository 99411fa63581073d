//! Wire models for the dispatch ledger API.
//!
//! Field names follow the ledger's JSON exactly (snake_case rows out of the
//! ledger database, plus the `useBonusMoney` quirk on order submission, which
//! lives in `ledger.rs`). All records held here are transient, non-authoritative
//! copies; after any mutating call they must be treated as stale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Lenient deserializers
// ---------------------------------------------------------------------------

/// The ledger stores flags as tinyint, so `discount_used` arrives as `0`/`1`
/// from some deployments and as `true`/`false` from others.
pub(crate) fn flag_from_any<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    Ok(match v {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::Number(n) => n.as_i64().unwrap_or(0) != 0,
        serde_json::Value::String(s) => {
            let lower = s.trim().to_ascii_lowercase();
            lower == "true" || lower == "1" || lower == "yes"
        }
        _ => false,
    })
}

// ---------------------------------------------------------------------------
// Customer
// ---------------------------------------------------------------------------

/// A registered customer. `loyalty_bonus_money` is the accrued credit
/// ("kasica"); it is mutated only by the ledger as a side effect of order
/// creation, never computed and persisted locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub surname: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub loyalty_bonus_money: f64,
    #[serde(default)]
    pub qr_code_id: Option<String>,
}

/// Profile collected by the registration form. Validated locally before any
/// request is sent.
#[derive(Debug, Clone, Serialize)]
pub struct NewCustomer {
    pub name: String,
    pub surname: String,
    pub phone_number: String,
    pub country: String,
    pub city: String,
}

impl NewCustomer {
    /// Names of the required fields that are empty (after trimming).
    pub fn missing_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        for (label, value) in [
            ("name", &self.name),
            ("surname", &self.surname),
            ("phone_number", &self.phone_number),
            ("country", &self.country),
            ("city", &self.city),
        ] {
            if value.trim().is_empty() {
                missing.push(label.to_string());
            }
        }
        missing
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// A driver account as listed by `GET /drivers`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: i64,
    pub name: String,
    pub surname: String,
    #[serde(default)]
    pub phone_number: String,
}

/// Profile for registering a new driver account (admin only).
#[derive(Debug, Clone)]
pub struct NewDriver {
    pub name: String,
    pub surname: String,
    pub phone_number: String,
    pub password: String,
    pub confirm_password: String,
}

impl NewDriver {
    pub fn missing_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        for (label, value) in [
            ("name", &self.name),
            ("surname", &self.surname),
            ("phone_number", &self.phone_number),
            ("password", &self.password),
            ("confirm_password", &self.confirm_password),
        ] {
            if value.trim().is_empty() {
                missing.push(label.to_string());
            }
        }
        missing
    }
}

// ---------------------------------------------------------------------------
// Order
// ---------------------------------------------------------------------------

/// An order row as returned by the ledger. Immutable from the client's
/// perspective; there is no edit or delete operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    #[serde(default)]
    pub client_id: Option<i64>,
    #[serde(default)]
    pub user_id: Option<i64>,
    pub description: String,
    /// Driver name the ledger joins in for display.
    #[serde(default)]
    pub username: Option<String>,
    /// Final charged price (base price minus redeemed credit).
    pub price: f64,
    #[serde(default, deserialize_with = "flag_from_any")]
    pub discount_used: bool,
    #[serde(default)]
    pub discount_price: f64,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Scan result
// ---------------------------------------------------------------------------

/// Outcome of resolving a scanned code. Produced by identity resolution,
/// consumed once by the workflow, then discarded.
#[derive(Debug, Clone)]
pub enum ScanResult {
    Found(Customer),
    NotFound { code: String },
}

// ---------------------------------------------------------------------------
// Order filter
// ---------------------------------------------------------------------------

/// Raw filter picks from the interface, before the role rule is applied.
#[derive(Debug, Clone, Default)]
pub struct FilterSelections {
    pub client_id: Option<i64>,
    pub driver_id: Option<i64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// A role-correct, validated order query. Constructed per query via
/// `filter::build_filter`; not persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderFilter {
    pub client_id: Option<i64>,
    pub driver_id: Option<i64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl OrderFilter {
    /// Non-empty fields as `GET /getOrders` query parameters. Dates go out
    /// as ISO-8601.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(id) = self.client_id {
            pairs.push(("clientId".to_string(), id.to_string()));
        }
        if let Some(id) = self.driver_id {
            pairs.push(("driverId".to_string(), id.to_string()));
        }
        if let Some(from) = self.start_date {
            pairs.push(("startDate".to_string(), from.to_rfc3339()));
        }
        if let Some(to) = self.end_date {
            pairs.push(("endDate".to_string(), to.to_rfc3339()));
        }
        pairs
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_flag_parses_tinyint_and_bool() {
        let from_int: Order = serde_json::from_value(serde_json::json!({
            "id": 1, "description": "paket", "price": 20.0,
            "discount_used": 1, "discount_price": 5.0,
            "created_at": "2024-11-03T12:00:00Z"
        }))
        .unwrap();
        assert!(from_int.discount_used);

        let from_bool: Order = serde_json::from_value(serde_json::json!({
            "id": 2, "description": "paket", "price": 20.0,
            "discount_used": false,
            "created_at": "2024-11-03T12:00:00Z"
        }))
        .unwrap();
        assert!(!from_bool.discount_used);
    }

    #[test]
    fn customer_defaults_for_absent_fields() {
        let c: Customer = serde_json::from_value(serde_json::json!({
            "id": 9, "name": "Mira", "surname": "Ilic"
        }))
        .unwrap();
        assert_eq!(c.loyalty_bonus_money, 0.0);
        assert!(c.qr_code_id.is_none());
    }

    #[test]
    fn new_customer_reports_missing_fields() {
        let profile = NewCustomer {
            name: "Ana".into(),
            surname: "  ".into(),
            phone_number: "+381601234567".into(),
            country: "".into(),
            city: "Beograd".into(),
        };
        assert_eq!(profile.missing_fields(), vec!["surname", "country"]);
    }

    #[test]
    fn filter_query_pairs_skip_unset_dimensions() {
        let filter = OrderFilter {
            client_id: Some(4),
            driver_id: None,
            start_date: None,
            end_date: None,
        };
        assert_eq!(
            filter.query_pairs(),
            vec![("clientId".to_string(), "4".to_string())]
        );
    }
}
