//! Courier field client.
//!
//! Backend for the field app couriers carry: scan a customer's identity card,
//! resolve or register the customer against the dispatch ledger, record
//! priced delivery orders (optionally redeeming the customer's accrued
//! loyalty credit), and query historical orders under a role-scoped filter.
//!
//! The ledger service owns all records; this client holds transient copies
//! for display and treats them as stale after any mutating call.

use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod api;
pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod filter;
pub mod identity;
pub mod ledger;
pub mod models;
pub mod session;
pub mod storage;
pub mod workflow;

pub use api::LedgerApi;
pub use config::LedgerConfig;
pub use error::ClientError;
pub use models::{Customer, Driver, FilterSelections, NewCustomer, NewDriver, Order, OrderFilter, ScanResult};
pub use session::{Role, Session};
pub use workflow::{Event, PendingOp, Workflow, WorkflowState};

/// Initialize structured logging (console, plus a daily rolling file when a
/// log directory is given).
pub fn init_logging(log_dir: Option<&std::path::Path>) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,courier_field_lib=debug"));

    let console_layer = fmt::layer().with_target(true);
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).ok();
            let file_appender = tracing_appender::rolling::daily(dir, "courier-field");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let file_layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true);
            registry.with(file_layer).init();

            // Keep the guard alive for the lifetime of the app; dropping it
            // flushes logs, and the app runs until process exit.
            std::mem::forget(guard);
        }
        None => registry.init(),
    }

    info!("courier-field v{} logging initialized", env!("CARGO_PKG_VERSION"));
}
