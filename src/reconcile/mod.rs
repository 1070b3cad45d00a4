//! Template reconciliation engine
//!
//! - [`Planner`] computes the command batch for a bind, a rebind, or a removal
//! - the order pass ([`order_changes`]) keeps managed entries in declaration order
//! - [`Reconciler`] is the per-tree state machine callers talk to

mod guard;
mod order;
mod orchestrator;
mod plan;
mod staging;

pub use guard::{ReconcileGuard, ReentrancyFlag};
pub use orchestrator::{AppliedTemplate, ExternalChange, Reconciler, UnbindMode};
pub use order::order_changes;
pub use plan::Planner;
