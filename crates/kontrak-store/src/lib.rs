//! Storage layer: store contracts consumed by the lifecycle engine, an
//! in-memory implementation, and a DuckDB-backed implementation (feature
//! `duckdb`).
//!
//! The conditional-update primitive on [`ContractStore::update_status`] is
//! the optimistic-concurrency seam the lifecycle engine relies on: two
//! racing transitions against one contract resolve to one winner and one
//! [`StoreError::Conflict`].

mod error;
mod memory;
mod traits;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use traits::{AuditStore, ContractStore};

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::DuckStore;
