use kontrak_core::ContractStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("contract not found: {0}")]
    NotFound(String),

    /// Conditional update lost the race: the row's status no longer matches
    /// what the caller read. Carries the actual status so the caller can
    /// refetch and retry.
    #[error("stale status for contract {id}: expected {expected}, found {actual}")]
    Conflict {
        id: String,
        expected: ContractStatus,
        actual: ContractStatus,
    },

    #[error("contract already exists: {0}")]
    AlreadyExists(String),

    /// The underlying scan/read could not be served at all. Aggregation
    /// consumers must surface this, never substitute an empty result.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[cfg(feature = "duckdb")]
    #[error("duckdb error: {0}")]
    DuckDb(#[from] ::duckdb::Error),

    #[error("{0}")]
    Other(String),
}
