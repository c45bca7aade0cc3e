//! In-memory store used by tests and the CLI.
//!
//! A single mutex guards all tables, so the conditional status update is a
//! genuine compare-and-swap: between the status check and the write no other
//! caller can slip in.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::Utc;
use kontrak_core::{Contract, ContractStatus, LegalNote, LifecycleEntry};
use tracing::debug;

use crate::{AuditStore, ContractStore, StoreError};

#[derive(Default)]
struct Tables {
    contracts: BTreeMap<String, Contract>,
    notes: Vec<LegalNote>,
    history: Vec<LifecycleEntry>,
    note_seq: u64,
}

/// Mutex-protected in-process implementation of both store traits.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an existing contract set.
    pub fn with_contracts(contracts: impl IntoIterator<Item = Contract>) -> Self {
        let store = Self::new();
        {
            let mut tables = store.tables.lock().expect("store mutex poisoned");
            for c in contracts {
                tables.contracts.insert(c.id.clone(), c);
            }
        }
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().expect("store mutex poisoned")
    }
}

impl ContractStore for MemoryStore {
    fn get_contract(&self, id: &str) -> Result<Contract, StoreError> {
        self.lock()
            .contracts
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn insert_contract(&self, contract: &Contract) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if tables.contracts.contains_key(&contract.id) {
            return Err(StoreError::AlreadyExists(contract.id.clone()));
        }
        tables.contracts.insert(contract.id.clone(), contract.clone());
        Ok(())
    }

    fn update_status(
        &self,
        id: &str,
        new_status: ContractStatus,
        expected_current: ContractStatus,
    ) -> Result<Contract, StoreError> {
        let mut tables = self.lock();
        let row = tables
            .contracts
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if row.status != expected_current {
            return Err(StoreError::Conflict {
                id: id.to_string(),
                expected: expected_current,
                actual: row.status,
            });
        }
        row.status = new_status;
        row.updated_at = Utc::now();
        debug!(id, status = %new_status, "contract status updated");
        Ok(row.clone())
    }

    fn scan_contracts(&self, status: Option<ContractStatus>) -> Result<Vec<Contract>, StoreError> {
        let tables = self.lock();
        Ok(tables
            .contracts
            .values()
            .filter(|c| status.is_none_or(|s| c.status == s))
            .cloned()
            .collect())
    }
}

impl AuditStore for MemoryStore {
    fn append_lifecycle_entry(
        &self,
        contract_id: &str,
        stage: &str,
        notes: Option<&str>,
    ) -> Result<(), StoreError> {
        self.lock().history.push(LifecycleEntry {
            contract_id: contract_id.to_string(),
            stage: stage.to_string(),
            started_at: Utc::now(),
            notes: notes.map(str::to_string),
        });
        Ok(())
    }

    fn append_note(&self, contract_id: &str, author: &str, text: &str) -> Result<(), StoreError> {
        let mut tables = self.lock();
        tables.note_seq += 1;
        let id = tables.note_seq;
        tables.notes.push(LegalNote {
            id,
            contract_id: contract_id.to_string(),
            author: author.to_string(),
            note: text.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    fn notes_for(&self, contract_id: &str) -> Result<Vec<LegalNote>, StoreError> {
        let tables = self.lock();
        let mut notes: Vec<LegalNote> = tables
            .notes
            .iter()
            .filter(|n| n.contract_id == contract_id)
            .cloned()
            .collect();
        // Newest first; the sequence id breaks same-instant ties.
        notes.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(notes)
    }

    fn history_for(&self, contract_id: &str) -> Result<Vec<LifecycleEntry>, StoreError> {
        Ok(self
            .lock()
            .history
            .iter()
            .filter(|e| e.contract_id == contract_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(id: &str) -> Contract {
        Contract::new_draft(id, "tester")
    }

    #[test]
    fn get_missing_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.get_contract("CTR-404"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn insert_then_get() {
        let store = MemoryStore::new();
        store.insert_contract(&draft("CTR-1")).unwrap();
        let got = store.get_contract("CTR-1").unwrap();
        assert_eq!(got.status, ContractStatus::Draft);
    }

    #[test]
    fn double_insert_rejected() {
        let store = MemoryStore::new();
        store.insert_contract(&draft("CTR-1")).unwrap();
        assert!(matches!(
            store.insert_contract(&draft("CTR-1")),
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[test]
    fn conditional_update_succeeds_on_match() {
        let store = MemoryStore::new();
        store.insert_contract(&draft("CTR-1")).unwrap();
        let updated = store
            .update_status("CTR-1", ContractStatus::Submitted, ContractStatus::Draft)
            .unwrap();
        assert_eq!(updated.status, ContractStatus::Submitted);
        assert_eq!(
            store.get_contract("CTR-1").unwrap().status,
            ContractStatus::Submitted
        );
    }

    #[test]
    fn stale_expected_status_conflicts_and_leaves_row_untouched() {
        let store = MemoryStore::new();
        store.insert_contract(&draft("CTR-1")).unwrap();
        store
            .update_status("CTR-1", ContractStatus::Submitted, ContractStatus::Draft)
            .unwrap();

        // A second writer still holding the Draft snapshot loses.
        let err = store
            .update_status("CTR-1", ContractStatus::Rejected, ContractStatus::Draft)
            .unwrap_err();
        match err {
            StoreError::Conflict { expected, actual, .. } => {
                assert_eq!(expected, ContractStatus::Draft);
                assert_eq!(actual, ContractStatus::Submitted);
            }
            other => panic!("expected Conflict, got {other:?}"),
        }
        assert_eq!(
            store.get_contract("CTR-1").unwrap().status,
            ContractStatus::Submitted
        );
    }

    #[test]
    fn racing_updates_resolve_to_one_winner() {
        let store = MemoryStore::new();
        store.insert_contract(&draft("CTR-1")).unwrap();

        // Both callers read Draft; only one CAS can land.
        let first = store.update_status("CTR-1", ContractStatus::Submitted, ContractStatus::Draft);
        let second = store.update_status("CTR-1", ContractStatus::Rejected, ContractStatus::Draft);
        assert!(first.is_ok());
        assert!(matches!(second, Err(StoreError::Conflict { .. })));
        assert_eq!(
            store.get_contract("CTR-1").unwrap().status,
            ContractStatus::Submitted
        );
    }

    #[test]
    fn scan_filters_by_status() {
        let store = MemoryStore::new();
        store.insert_contract(&draft("CTR-1")).unwrap();
        store.insert_contract(&draft("CTR-2")).unwrap();
        store
            .update_status("CTR-2", ContractStatus::Submitted, ContractStatus::Draft)
            .unwrap();

        assert_eq!(store.scan_contracts(None).unwrap().len(), 2);
        let drafts = store.scan_contracts(Some(ContractStatus::Draft)).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].id, "CTR-1");
    }

    #[test]
    fn notes_read_newest_first() {
        let store = MemoryStore::new();
        store.append_note("CTR-1", "Legal Team", "first pass").unwrap();
        store.append_note("CTR-1", "Legal Team", "second pass").unwrap();
        store.append_note("CTR-2", "Management", "unrelated").unwrap();

        let notes = store.notes_for("CTR-1").unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].note, "second pass");
        assert_eq!(notes[1].note, "first pass");
    }

    #[test]
    fn history_is_per_contract_oldest_first() {
        let store = MemoryStore::new();
        store
            .append_lifecycle_entry("CTR-1", "Submitted", None)
            .unwrap();
        store
            .append_lifecycle_entry("CTR-1", "Reviewed", Some("looks fine"))
            .unwrap();
        store.append_lifecycle_entry("CTR-2", "Submitted", None).unwrap();

        let history = store.history_for("CTR-1").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].stage, "Submitted");
        assert_eq!(history[1].stage, "Reviewed");
        assert_eq!(history[1].notes.as_deref(), Some("looks fine"));
    }
}
