//! Order ledger client: order creation and role-scoped retrieval.
//!
//! Order creation runs the loyalty-redemption negotiation before submission.
//! The client-side figure is advisory only: the ledger recomputes and
//! persists the authoritative price, and the submission carries the loyalty
//! balance observed at decision time so the ledger can detect staleness.

use serde_json::Value;
use tracing::{info, warn};

use crate::api::LedgerApi;
use crate::error::ClientError;
use crate::models::{Customer, Order, OrderFilter};
use crate::session::Session;

// ---------------------------------------------------------------------------
// Redemption arithmetic
// ---------------------------------------------------------------------------

/// Outcome of the loyalty-redemption negotiation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Redemption {
    pub used: bool,
    pub redeemed_amount: f64,
    pub final_price: f64,
}

/// Compute the provisional redemption for an order.
///
/// If redemption is declined or the balance is zero, nothing is redeemed.
/// Otherwise the redeemed amount is `min(balance, base_price)` and the final
/// price is `max(0, base_price - redeemed)`; the final price is never
/// negative.
pub fn negotiate_redemption(loyalty_balance: f64, base_price: f64, wants_redemption: bool) -> Redemption {
    if !wants_redemption || loyalty_balance <= 0.0 {
        return Redemption {
            used: false,
            redeemed_amount: 0.0,
            final_price: base_price,
        };
    }
    let redeemed = loyalty_balance.min(base_price);
    Redemption {
        used: true,
        redeemed_amount: redeemed,
        final_price: (base_price - redeemed).max(0.0),
    }
}

// ---------------------------------------------------------------------------
// Order creation
// ---------------------------------------------------------------------------

/// Create an order for a customer (`POST /orders`).
///
/// The description and price are validated locally; an invalid form never
/// reaches the network. On failure no partial order exists on the client
/// side — the caller re-offers the same form state for resubmission.
pub async fn create_order(
    api: &LedgerApi,
    session: &Session,
    customer: &Customer,
    description: &str,
    base_price: f64,
    wants_redemption: bool,
) -> Result<Order, ClientError> {
    let mut invalid = Vec::new();
    if description.trim().is_empty() {
        invalid.push("description".to_string());
    }
    if !base_price.is_finite() || base_price <= 0.0 {
        invalid.push("price".to_string());
    }
    if !invalid.is_empty() {
        return Err(ClientError::ValidationFailed { fields: invalid });
    }

    let redemption = negotiate_redemption(
        customer.loyalty_bonus_money,
        base_price,
        wants_redemption,
    );

    let body = serde_json::json!({
        "client_id": customer.id,
        "user_id": session.actor_id(),
        "order_description": description.trim(),
        "price": redemption.final_price,
        "useBonusMoney": redemption.used,
        // Balance observed at decision time, for staleness detection.
        "loyalty_bonus_money": customer.loyalty_bonus_money,
    });

    let resp = api
        .post("/orders", &body, Some(session.token()))
        .await
        .map_err(ClientError::OrderCreationFailed)?;

    let order = parse_order_response(&resp)?;

    info!(
        order_id = order.id,
        customer_id = customer.id,
        final_price = order.price,
        redeemed = redemption.used,
        "order created"
    );
    Ok(order)
}

/// Interpret the `{success, order?}` creation response. A confirmation
/// without an order record cannot satisfy the contract: the client must
/// display the ledger's copy, never its own guess.
fn parse_order_response(resp: &Value) -> Result<Order, ClientError> {
    if !resp.get("success").and_then(Value::as_bool).unwrap_or(false) {
        let reason = resp
            .get("message")
            .or_else(|| resp.get("error"))
            .and_then(Value::as_str)
            .unwrap_or("the ledger refused the order")
            .to_string();
        return Err(ClientError::OrderCreationFailed(reason));
    }

    resp.get("order")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .ok_or_else(|| {
            ClientError::OrderCreationFailed("ledger confirmed but returned no order record".into())
        })
}

// ---------------------------------------------------------------------------
// Order retrieval
// ---------------------------------------------------------------------------

/// Query orders under a role-correct filter (`GET /getOrders`).
///
/// The result is sorted newest-first by the client regardless of what the
/// ledger returns. An empty result is valid. On failure the caller keeps the
/// previous result set displayed.
pub async fn list_orders(
    api: &LedgerApi,
    session: &Session,
    filter: &OrderFilter,
) -> Result<Vec<Order>, ClientError> {
    let resp = api
        .get_with_query("/getOrders", &filter.query_pairs(), Some(session.token()))
        .await
        .map_err(ClientError::QueryFailed)?;

    let rows = resp
        .get("orders")
        .and_then(Value::as_array)
        .cloned()
        .ok_or_else(|| ClientError::QueryFailed("the ledger response had no orders array".into()))?;

    let mut orders = Vec::with_capacity(rows.len());
    for row in rows {
        match serde_json::from_value::<Order>(row) {
            Ok(order) => orders.push(order),
            Err(e) => warn!(error = %e, "skipping malformed order row"),
        }
    }

    sort_newest_first(&mut orders);
    info!(count = orders.len(), "orders fetched");
    Ok(orders)
}

/// Sort orders by creation time, most recent first.
pub fn sort_newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn order(id: i64, created_at: &str) -> Order {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "description": "paket",
            "price": 10.0,
            "created_at": created_at,
        }))
        .unwrap()
    }

    #[test]
    fn declined_redemption_charges_base_price() {
        let r = negotiate_redemption(50.0, 200.0, false);
        assert!(!r.used);
        assert_eq!(r.redeemed_amount, 0.0);
        assert_eq!(r.final_price, 200.0);
    }

    #[test]
    fn zero_balance_redeems_nothing_even_when_accepted() {
        let r = negotiate_redemption(0.0, 200.0, true);
        assert!(!r.used);
        assert_eq!(r.redeemed_amount, 0.0);
        assert_eq!(r.final_price, 200.0);
    }

    #[test]
    fn partial_balance_is_redeemed_in_full() {
        // kasica 50, order 200 -> charge 150
        let r = negotiate_redemption(50.0, 200.0, true);
        assert!(r.used);
        assert_eq!(r.redeemed_amount, 50.0);
        assert_eq!(r.final_price, 150.0);
    }

    #[test]
    fn balance_larger_than_price_caps_at_price() {
        // kasica 300, order 200 -> charge 0, redeem only 200
        let r = negotiate_redemption(300.0, 200.0, true);
        assert!(r.used);
        assert_eq!(r.redeemed_amount, 200.0);
        assert_eq!(r.final_price, 0.0);
    }

    #[test]
    fn final_price_is_never_negative() {
        for balance in [0.0, 1.0, 99.99, 100.0, 1000.0] {
            for price in [0.01, 50.0, 100.0] {
                let r = negotiate_redemption(balance, price, true);
                assert!(r.final_price >= 0.0, "balance={balance} price={price}");
                assert_eq!(r.redeemed_amount, balance.min(price));
                assert_eq!(r.final_price, (price - r.redeemed_amount).max(0.0));
            }
        }
    }

    #[test]
    fn sort_puts_most_recent_first() {
        let mut orders = vec![
            order(1, "2024-10-01T08:00:00Z"),
            order(2, "2024-12-24T18:30:00Z"),
            order(3, "2024-11-15T12:00:00Z"),
        ];
        sort_newest_first(&mut orders);
        let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);

        let expected_first = Utc.with_ymd_and_hms(2024, 12, 24, 18, 30, 0).unwrap();
        assert_eq!(orders[0].created_at, expected_first);
    }

    #[test]
    fn order_response_returns_ledger_copy() {
        let resp = serde_json::json!({
            "success": true,
            "order": {
                "id": 31, "client_id": 4, "user_id": 7,
                "description": "paket", "price": 150.0,
                "discount_used": 1, "discount_price": 50.0,
                "created_at": "2024-12-01T09:00:00Z"
            }
        });
        let order = parse_order_response(&resp).unwrap();
        assert_eq!(order.id, 31);
        assert_eq!(order.price, 150.0);
        assert!(order.discount_used);
        assert_eq!(order.discount_price, 50.0);
    }

    #[test]
    fn refused_order_surfaces_ledger_reason() {
        let resp = serde_json::json!({
            "success": false,
            "message": "stale loyalty balance"
        });
        match parse_order_response(&resp) {
            Err(ClientError::OrderCreationFailed(reason)) => {
                assert_eq!(reason, "stale loyalty balance");
            }
            other => panic!("expected OrderCreationFailed, got {other:?}"),
        }
    }

    #[test]
    fn confirmation_without_record_is_a_failure() {
        let resp = serde_json::json!({ "success": true });
        assert!(matches!(
            parse_order_response(&resp),
            Err(ClientError::OrderCreationFailed(_))
        ));
    }

    #[tokio::test]
    async fn invalid_form_never_reaches_the_network() {
        use crate::api::LedgerApi;
        use crate::config::LedgerConfig;
        use crate::session::{Role, Session};

        // Unroutable host: any network attempt would fail differently.
        let api = LedgerApi::new(LedgerConfig::new("localhost:1")).unwrap();
        let session = Session::new(7, Role::Driver, "tok".into());
        let customer: Customer = serde_json::from_value(serde_json::json!({
            "id": 1, "name": "Jovan", "surname": "Peric"
        }))
        .unwrap();

        let err = create_order(&api, &session, &customer, "  ", -5.0, false)
            .await
            .unwrap_err();
        match err {
            ClientError::ValidationFailed { fields } => {
                assert_eq!(fields, vec!["description", "price"]);
            }
            other => panic!("expected ValidationFailed, got {other:?}"),
        }
    }

    #[test]
    fn sort_handles_empty_and_single() {
        let mut empty: Vec<Order> = Vec::new();
        sort_newest_first(&mut empty);
        assert!(empty.is_empty());

        let mut single = vec![order(1, "2024-10-01T08:00:00Z")];
        sort_newest_first(&mut single);
        assert_eq!(single[0].id, 1);
    }
}
