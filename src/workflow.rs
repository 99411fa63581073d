//! Scan-to-order workflow as an explicit state machine.
//!
//! Each user action or operation result is a discrete `Event`; applying one
//! yields a new state plus at most one `PendingOp` for the caller to run.
//! While an operation is in flight, re-entrant triggers of the same class are
//! ignored (the scan-guard latch), so rapid repeated input can never cause a
//! double registration or a double order. A result event that no longer
//! matches the current state is discarded rather than applied.

use tracing::{debug, info};

use crate::models::{Customer, NewCustomer, Order, ScanResult};

// ---------------------------------------------------------------------------
// States and events
// ---------------------------------------------------------------------------

/// Where a dismissed error returns control to. The workflow never silently
/// advances past a failure.
#[derive(Debug, Clone)]
pub enum ResumePoint {
    Scanning,
    Registering { code: String },
    OrderEntry { customer: Customer },
}

#[derive(Debug, Clone)]
pub enum WorkflowState {
    Idle,
    Scanning,
    Resolving {
        code: String,
    },
    CustomerFound {
        customer: Customer,
    },
    CustomerNotFound {
        code: String,
    },
    Registering {
        code: String,
    },
    OrderEntry {
        customer: Customer,
    },
    Submitting {
        customer: Customer,
        description: String,
        base_price: f64,
        wants_redemption: bool,
    },
    Done {
        order: Order,
    },
    Error {
        message: String,
        resume: ResumePoint,
    },
}

impl WorkflowState {
    /// Short name for logging.
    fn name(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "idle",
            WorkflowState::Scanning => "scanning",
            WorkflowState::Resolving { .. } => "resolving",
            WorkflowState::CustomerFound { .. } => "customer_found",
            WorkflowState::CustomerNotFound { .. } => "customer_not_found",
            WorkflowState::Registering { .. } => "registering",
            WorkflowState::OrderEntry { .. } => "order_entry",
            WorkflowState::Submitting { .. } => "submitting",
            WorkflowState::Done { .. } => "done",
            WorkflowState::Error { .. } => "error",
        }
    }
}

/// Discrete inputs: user actions plus operation results.
#[derive(Debug, Clone)]
pub enum Event {
    /// User armed the scanner.
    StartScan,
    /// The camera decoded a code.
    CodeScanned { code: String },
    /// Result of `identity::resolve`.
    Resolved(ScanResult),
    ResolveFailed { message: String },
    /// Advance out of the found / not-found decision point.
    Proceed,
    /// User submitted the registration form.
    SubmitRegistration { profile: NewCustomer },
    /// Result of `identity::register`.
    Registered { customer: Customer },
    RegistrationFailed { message: String },
    /// User confirmed the order form (redemption already decided).
    SubmitOrder {
        description: String,
        base_price: f64,
        wants_redemption: bool,
    },
    /// Result of `ledger::create_order`.
    OrderCreated { order: Order },
    OrderFailed { message: String },
    /// Acknowledge an error and return to the prior interactive state.
    Dismiss,
    /// Navigate away / start over. Cancels interest in any pending result.
    Reset,
}

/// The single network operation a transition may request. Strictly sequential:
/// the caller runs it, then feeds the result back as an event.
#[derive(Debug, Clone)]
pub enum PendingOp {
    Resolve {
        code: String,
    },
    Register {
        code: String,
        profile: NewCustomer,
    },
    CreateOrder {
        customer: Customer,
        description: String,
        base_price: f64,
        wants_redemption: bool,
    },
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Single-writer state store for one workflow instance.
pub struct Workflow {
    state: WorkflowState,
    in_flight: bool,
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new()
    }
}

impl Workflow {
    pub fn new() -> Self {
        Self {
            state: WorkflowState::Idle,
            in_flight: false,
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Whether a network operation is currently awaited.
    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    /// Apply one event. Returns the operation to run, if the transition
    /// started one.
    pub fn handle(&mut self, event: Event) -> Option<PendingOp> {
        // Leaving a state cancels interest in its pending result; whatever
        // arrives later will not match the new state and gets discarded.
        if let Event::Reset = event {
            info!(from = self.state.name(), "workflow reset");
            self.in_flight = false;
            self.state = WorkflowState::Idle;
            return None;
        }

        let state = std::mem::replace(&mut self.state, WorkflowState::Idle);
        let mut op = None;

        self.state = match (state, event) {
            (WorkflowState::Idle, Event::StartScan) => WorkflowState::Scanning,

            (WorkflowState::Scanning, Event::CodeScanned { code }) => {
                if self.in_flight {
                    debug!("scan ignored: resolution already in progress");
                    WorkflowState::Scanning
                } else {
                    self.in_flight = true;
                    op = Some(PendingOp::Resolve { code: code.clone() });
                    WorkflowState::Resolving { code }
                }
            }

            (WorkflowState::Resolving { .. }, Event::Resolved(result)) => {
                self.in_flight = false;
                match result {
                    ScanResult::Found(customer) => WorkflowState::CustomerFound { customer },
                    ScanResult::NotFound { code } => WorkflowState::CustomerNotFound { code },
                }
            }
            (WorkflowState::Resolving { .. }, Event::ResolveFailed { message }) => {
                self.in_flight = false;
                // Re-arm scanning after the user acknowledges.
                WorkflowState::Error {
                    message,
                    resume: ResumePoint::Scanning,
                }
            }

            (WorkflowState::CustomerFound { customer }, Event::Proceed) => {
                WorkflowState::OrderEntry { customer }
            }
            (WorkflowState::CustomerNotFound { code }, Event::Proceed) => {
                WorkflowState::Registering { code }
            }

            (WorkflowState::Registering { code }, Event::SubmitRegistration { profile }) => {
                if self.in_flight {
                    debug!("registration submit ignored: already in progress");
                } else {
                    self.in_flight = true;
                    op = Some(PendingOp::Register {
                        code: code.clone(),
                        profile,
                    });
                }
                WorkflowState::Registering { code }
            }
            (WorkflowState::Registering { .. }, Event::Registered { customer }) => {
                self.in_flight = false;
                WorkflowState::OrderEntry { customer }
            }
            (WorkflowState::Registering { code }, Event::RegistrationFailed { message }) => {
                self.in_flight = false;
                WorkflowState::Error {
                    message,
                    resume: ResumePoint::Registering { code },
                }
            }

            (
                WorkflowState::OrderEntry { customer },
                Event::SubmitOrder {
                    description,
                    base_price,
                    wants_redemption,
                },
            ) => {
                if self.in_flight {
                    debug!("order submit ignored: already in progress");
                    WorkflowState::OrderEntry { customer }
                } else {
                    self.in_flight = true;
                    op = Some(PendingOp::CreateOrder {
                        customer: customer.clone(),
                        description: description.clone(),
                        base_price,
                        wants_redemption,
                    });
                    WorkflowState::Submitting {
                        customer,
                        description,
                        base_price,
                        wants_redemption,
                    }
                }
            }
            (WorkflowState::Submitting { .. }, Event::OrderCreated { order }) => {
                self.in_flight = false;
                WorkflowState::Done { order }
            }
            (WorkflowState::Submitting { customer, .. }, Event::OrderFailed { message }) => {
                self.in_flight = false;
                // Re-offer the same form rather than assume partial success.
                WorkflowState::Error {
                    message,
                    resume: ResumePoint::OrderEntry { customer },
                }
            }

            (WorkflowState::Error { resume, .. }, Event::Dismiss) => match resume {
                ResumePoint::Scanning => WorkflowState::Scanning,
                ResumePoint::Registering { code } => WorkflowState::Registering { code },
                ResumePoint::OrderEntry { customer } => WorkflowState::OrderEntry { customer },
            },

            // Anything else is stale or out of place; leave the state alone.
            (state, event) => {
                debug!(state = state.name(), ?event, "event discarded");
                state
            }
        };

        op
    }
}

// ---------------------------------------------------------------------------
// Operation runner
// ---------------------------------------------------------------------------

/// Execute a pending operation and fold its outcome back into an event.
///
/// This is the only place network results re-enter the state machine, which
/// keeps the sequencing rule honest: the next operation cannot start before
/// this one's result has been observed.
pub async fn run_op(
    api: &crate::api::LedgerApi,
    session: &crate::session::Session,
    op: PendingOp,
) -> Event {
    match op {
        PendingOp::Resolve { code } => {
            match crate::identity::resolve(api, session, &code).await {
                Ok(result) => Event::Resolved(result),
                Err(e) => Event::ResolveFailed {
                    message: e.to_string(),
                },
            }
        }
        PendingOp::Register { code, profile } => {
            match crate::identity::register(api, session, &code, &profile).await {
                Ok(customer) => Event::Registered { customer },
                Err(e) => Event::RegistrationFailed {
                    message: e.to_string(),
                },
            }
        }
        PendingOp::CreateOrder {
            customer,
            description,
            base_price,
            wants_redemption,
        } => {
            match crate::ledger::create_order(
                api,
                session,
                &customer,
                &description,
                base_price,
                wants_redemption,
            )
            .await
            {
                Ok(order) => Event::OrderCreated { order },
                Err(e) => Event::OrderFailed {
                    message: e.to_string(),
                },
            }
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
