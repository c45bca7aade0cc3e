//! Abstract store capabilities the core consumes.
//!
//! Real deployments satisfy these against a relational database with
//! row-level access policies; tests and the CLI use [`MemoryStore`](crate::MemoryStore).

use kontrak_core::{Contract, ContractStatus, LegalNote, LifecycleEntry};

use crate::StoreError;

/// Durable key-value-by-id access to contract records.
pub trait ContractStore {
    /// Fetch one contract by id.
    fn get_contract(&self, id: &str) -> Result<Contract, StoreError>;

    /// Persist a brand-new contract record.
    fn insert_contract(&self, contract: &Contract) -> Result<(), StoreError>;

    /// Conditionally update a contract's status.
    ///
    /// The write only lands when the stored status still equals
    /// `expected_current`; otherwise [`StoreError::Conflict`] is returned
    /// and the row is untouched. `updated_at` is bumped on success.
    /// Returns the updated record.
    fn update_status(
        &self,
        id: &str,
        new_status: ContractStatus,
        expected_current: ContractStatus,
    ) -> Result<Contract, StoreError>;

    /// Materialize the contract set, optionally restricted to one status.
    fn scan_contracts(&self, status: Option<ContractStatus>) -> Result<Vec<Contract>, StoreError>;
}

/// Append-only notes and lifecycle-stage history tied to a contract id.
///
/// Entries are never mutated or deleted. Lifecycle history is read only for
/// human display; status truth lives on the contract record.
pub trait AuditStore {
    /// Record that a contract reached a lifecycle stage.
    fn append_lifecycle_entry(
        &self,
        contract_id: &str,
        stage: &str,
        notes: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Append reviewer commentary.
    fn append_note(&self, contract_id: &str, author: &str, text: &str) -> Result<(), StoreError>;

    /// All notes for a contract, newest first (the canonical read order).
    fn notes_for(&self, contract_id: &str) -> Result<Vec<LegalNote>, StoreError>;

    /// Lifecycle history for a contract, oldest first.
    fn history_for(&self, contract_id: &str) -> Result<Vec<LifecycleEntry>, StoreError>;
}
