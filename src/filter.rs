//! Filter query builder with role scoping.
//!
//! A driver must never be able to construct a filter that returns another
//! driver's orders: for non-admin sessions the driver dimension is forced to
//! the session's own actor id regardless of what the interface selected. The
//! role is read from the session at build time, never from a cached copy.

use tracing::debug;

use crate::error::ClientError;
use crate::models::{FilterSelections, OrderFilter};
use crate::session::Session;

/// Compose a role-correct, validated order query from the user's picks.
///
/// Admins may scope (or not) across both the customer and driver dimensions.
/// Drivers keep the optional customer scope, but the driver id is always
/// their own. A date range with `start > end` is rejected before any request
/// is issued.
pub fn build_filter(
    session: &Session,
    selections: &FilterSelections,
) -> Result<OrderFilter, ClientError> {
    if let (Some(start), Some(end)) = (selections.start_date, selections.end_date) {
        if start > end {
            return Err(ClientError::InvalidDateRange { start, end });
        }
    }

    let driver_id = if session.is_admin() {
        selections.driver_id
    } else {
        // Hard invariant: ignore whatever the interface put here.
        Some(session.actor_id())
    };

    let filter = OrderFilter {
        client_id: selections.client_id,
        driver_id,
        start_date: selections.start_date,
        end_date: selections.end_date,
    };
    debug!(?filter, role = %session.role().as_str(), "filter built");
    Ok(filter)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;
    use chrono::{TimeZone, Utc};

    fn admin() -> Session {
        Session::new(1, Role::Admin, "tok".into())
    }

    fn driver(id: i64) -> Session {
        Session::new(id, Role::Driver, "tok".into())
    }

    #[test]
    fn admin_selections_pass_through() {
        let selections = FilterSelections {
            client_id: Some(4),
            driver_id: Some(9),
            ..Default::default()
        };
        let filter = build_filter(&admin(), &selections).unwrap();
        assert_eq!(filter.client_id, Some(4));
        assert_eq!(filter.driver_id, Some(9));
    }

    #[test]
    fn admin_unset_dimensions_stay_unscoped() {
        let filter = build_filter(&admin(), &FilterSelections::default()).unwrap();
        assert_eq!(filter.client_id, None);
        assert_eq!(filter.driver_id, None);
        assert!(filter.query_pairs().is_empty());
    }

    #[test]
    fn driver_id_is_forced_to_own_actor_id() {
        // Attempt to peek at driver 9's orders from driver 7's session.
        let selections = FilterSelections {
            driver_id: Some(9),
            ..Default::default()
        };
        let filter = build_filter(&driver(7), &selections).unwrap();
        assert_eq!(filter.driver_id, Some(7));
    }

    #[test]
    fn driver_without_selection_still_scoped_to_self() {
        let filter = build_filter(&driver(7), &FilterSelections::default()).unwrap();
        assert_eq!(filter.driver_id, Some(7));
    }

    #[test]
    fn driver_keeps_optional_customer_scope() {
        let selections = FilterSelections {
            client_id: Some(4),
            ..Default::default()
        };
        let filter = build_filter(&driver(7), &selections).unwrap();
        assert_eq!(filter.client_id, Some(4));
        assert_eq!(filter.driver_id, Some(7));
    }

    #[test]
    fn inverted_date_range_is_rejected() {
        let selections = FilterSelections {
            start_date: Some(Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap()),
            end_date: Some(Utc.with_ymd_and_hms(2024, 11, 1, 0, 0, 0).unwrap()),
            ..Default::default()
        };
        assert!(matches!(
            build_filter(&driver(7), &selections),
            Err(ClientError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn equal_dates_are_a_valid_range() {
        let day = Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap();
        let selections = FilterSelections {
            start_date: Some(day),
            end_date: Some(day),
            ..Default::default()
        };
        let filter = build_filter(&admin(), &selections).unwrap();
        assert_eq!(filter.start_date, Some(day));
        assert_eq!(filter.end_date, Some(day));
    }

    #[test]
    fn single_bound_needs_no_range_check() {
        let selections = FilterSelections {
            start_date: Some(Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap()),
            ..Default::default()
        };
        assert!(build_filter(&admin(), &selections).is_ok());
    }
}
