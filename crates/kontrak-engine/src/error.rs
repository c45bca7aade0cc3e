use kontrak_core::{ContractStatus, Role};
use kontrak_store::StoreError;
use thiserror::Error;

/// Why a requested status transition was refused.
///
/// `IllegalTransition` and `Unauthorized` are distinct on purpose: the UI
/// renders different messaging for "that move does not exist" and "you may
/// not make that move".
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("contract not found: {0}")]
    NotFound(String),

    #[error("no transition from {from} to {attempted}")]
    IllegalTransition {
        from: ContractStatus,
        attempted: ContractStatus,
    },

    #[error("role {role} may not move a contract from {from} to {attempted}")]
    Unauthorized {
        role: Role,
        from: ContractStatus,
        attempted: ContractStatus,
    },

    /// The conditional update lost a race. The caller should refetch and
    /// retry; at most one automatic retry is reasonable before surfacing
    /// the failure to the user.
    #[error("concurrent update on contract {id}: expected {expected}, found {actual}")]
    ConcurrencyConflict {
        id: String,
        expected: ContractStatus,
        actual: ContractStatus,
    },

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for TransitionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => TransitionError::NotFound(id),
            StoreError::Conflict {
                id,
                expected,
                actual,
            } => TransitionError::ConcurrencyConflict {
                id,
                expected,
                actual,
            },
            other => TransitionError::Store(other),
        }
    }
}

/// Failure to produce a KPI snapshot.
///
/// A failed scan must reach the dashboard as an error state, never as a
/// zero-filled snapshot — "no contracts" and "could not load contracts"
/// render differently.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("contract scan failed: {0}")]
    SourceUnavailable(#[from] StoreError),
}
