//! Lifecycle state machine and KPI aggregation over the contract stores.
//!
//! The two dashboard-facing entry points are
//! [`transition_contract`](lifecycle::transition_contract) (role-checked
//! status transitions with audit side records) and
//! [`load_aggregates`](metrics::load_aggregates) (point-in-time KPI
//! snapshots). Both sit on the store traits from `kontrak-store`.

mod error;
pub mod lifecycle;
pub mod metrics;

pub use error::{AggregateError, TransitionError};
pub use lifecycle::{
    TransitionOutcome, TransitionRule, check_transition, load_contract, rule_for, sweep_expired,
    transition_contract,
};
pub use metrics::{KpiSnapshot, compute_aggregates, load_aggregates};
