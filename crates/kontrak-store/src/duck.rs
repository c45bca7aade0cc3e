//! DuckDB-backed store for deployments that want contracts to survive
//! process restarts.
//!
//! Dates and timestamps are stored as ISO-8601 text and parsed with chrono
//! on read; status and risk labels are stored with the product's canonical
//! casing but parsed leniently. The conditional status update is expressed
//! as `UPDATE ... WHERE id = ? AND status = ?` with an affected-row check,
//! which is how optimistic concurrency maps onto a relational store.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use duckdb::{Connection, OptionalExt, Row, params};
use kontrak_core::{Contract, ContractStatus, LegalNote, LifecycleEntry, RiskLevel};
use tracing::info;

use crate::{AuditStore, ContractStore, StoreError};

/// DuckDB store holding the `contracts`, `legal_notes`, and
/// `lifecycle_entries` tables.
///
/// Supports both in-memory (ephemeral) and persistent (file-backed) modes.
pub struct DuckStore {
    conn: Connection,
}

const DDL: &str = "
    CREATE TABLE IF NOT EXISTS contracts (
        id              VARCHAR PRIMARY KEY,
        first_party     VARCHAR,
        second_party    VARCHAR,
        value_rp        BIGINT,
        start_date      VARCHAR,
        end_date        VARCHAR,
        duration_months INTEGER,
        risk            VARCHAR,
        status          VARCHAR NOT NULL,
        created_by      VARCHAR NOT NULL,
        created_at      VARCHAR NOT NULL,
        updated_at      VARCHAR NOT NULL,
        file_url        VARCHAR
    );
    CREATE SEQUENCE IF NOT EXISTS legal_note_id START 1;
    CREATE TABLE IF NOT EXISTS legal_notes (
        id          BIGINT PRIMARY KEY DEFAULT nextval('legal_note_id'),
        contract_id VARCHAR NOT NULL,
        author      VARCHAR NOT NULL,
        note        VARCHAR NOT NULL,
        created_at  VARCHAR NOT NULL
    );
    CREATE TABLE IF NOT EXISTS lifecycle_entries (
        contract_id VARCHAR NOT NULL,
        stage       VARCHAR NOT NULL,
        started_at  VARCHAR NOT NULL,
        notes       VARCHAR
    );
";

impl DuckStore {
    /// Open an in-memory DuckDB database and create the schema.
    pub fn open() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(DDL)?;
        Ok(Self { conn })
    }

    /// Open or create a persistent DuckDB database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(DDL)?;
        info!(path = %path.display(), "opened contract store");
        Ok(Self { conn })
    }

    /// Number of rows in the `contracts` table.
    pub fn contract_count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT count(*) FROM contracts", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn row_to_contract(row: &Row<'_>) -> duckdb::Result<RawContract> {
        Ok(RawContract {
            id: row.get(0)?,
            first_party: row.get(1)?,
            second_party: row.get(2)?,
            value_rp: row.get(3)?,
            start_date: row.get(4)?,
            end_date: row.get(5)?,
            duration_months: row.get(6)?,
            risk: row.get(7)?,
            status: row.get(8)?,
            created_by: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
            file_url: row.get(12)?,
        })
    }
}

/// Column values as stored, before label/date parsing.
struct RawContract {
    id: String,
    first_party: Option<String>,
    second_party: Option<String>,
    value_rp: Option<i64>,
    start_date: Option<String>,
    end_date: Option<String>,
    duration_months: Option<i32>,
    risk: Option<String>,
    status: String,
    created_by: String,
    created_at: String,
    updated_at: String,
    file_url: Option<String>,
}

impl RawContract {
    fn decode(self) -> Result<Contract, StoreError> {
        let status: ContractStatus = self
            .status
            .parse()
            .map_err(|e| StoreError::Other(format!("contract {}: {e}", self.id)))?;
        let risk = self
            .risk
            .as_deref()
            .map(str::parse::<RiskLevel>)
            .transpose()
            .map_err(|e| StoreError::Other(format!("contract {}: {e}", self.id)))?;
        Ok(Contract {
            first_party: self.first_party,
            second_party: self.second_party,
            value_rp: self.value_rp.map(|v| v.max(0) as u64),
            start_date: parse_date(self.start_date.as_deref(), &self.id)?,
            end_date: parse_date(self.end_date.as_deref(), &self.id)?,
            duration_months: self.duration_months.map(|m| m.max(0) as u32),
            risk,
            status,
            created_by: self.created_by,
            created_at: parse_timestamp(&self.created_at, &self.id)?,
            updated_at: parse_timestamp(&self.updated_at, &self.id)?,
            file_url: self.file_url,
            id: self.id,
        })
    }
}

fn parse_date(s: Option<&str>, id: &str) -> Result<Option<NaiveDate>, StoreError> {
    s.map(|s| {
        s.parse::<NaiveDate>()
            .map_err(|e| StoreError::Other(format!("contract {id}: bad date {s:?}: {e}")))
    })
    .transpose()
}

fn parse_timestamp(s: &str, id: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Other(format!("contract {id}: bad timestamp {s:?}: {e}")))
}

impl ContractStore for DuckStore {
    fn get_contract(&self, id: &str) -> Result<Contract, StoreError> {
        let raw = self
            .conn
            .query_row(
                "SELECT * FROM contracts WHERE id = ?",
                params![id],
                Self::row_to_contract,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        raw.decode()
    }

    fn insert_contract(&self, contract: &Contract) -> Result<(), StoreError> {
        let existing: Option<String> = self
            .conn
            .query_row(
                "SELECT id FROM contracts WHERE id = ?",
                params![contract.id],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(StoreError::AlreadyExists(contract.id.clone()));
        }
        let value_rp = contract
            .value_rp
            .map(i64::try_from)
            .transpose()
            .map_err(|_| {
                StoreError::Other(format!(
                    "contract {}: value_rp {} exceeds the storable range",
                    contract.id,
                    contract.value_rp.unwrap_or_default()
                ))
            })?;
        self.conn.execute(
            "INSERT INTO contracts VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                contract.id,
                contract.first_party,
                contract.second_party,
                value_rp,
                contract.start_date.map(|d| d.to_string()),
                contract.end_date.map(|d| d.to_string()),
                contract.duration_months.map(|m| m as i32),
                contract.risk.map(|r| r.as_str()),
                contract.status.as_str(),
                contract.created_by,
                contract.created_at.to_rfc3339(),
                contract.updated_at.to_rfc3339(),
                contract.file_url,
            ],
        )?;
        Ok(())
    }

    fn update_status(
        &self,
        id: &str,
        new_status: ContractStatus,
        expected_current: ContractStatus,
    ) -> Result<Contract, StoreError> {
        let updated = self.conn.execute(
            "UPDATE contracts SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
            params![
                new_status.as_str(),
                Utc::now().to_rfc3339(),
                id,
                expected_current.as_str(),
            ],
        )?;
        if updated == 0 {
            // Distinguish a missing row from a lost race.
            let current = self.get_contract(id)?;
            return Err(StoreError::Conflict {
                id: id.to_string(),
                expected: expected_current,
                actual: current.status,
            });
        }
        self.get_contract(id)
    }

    fn scan_contracts(&self, status: Option<ContractStatus>) -> Result<Vec<Contract>, StoreError> {
        let (sql, bind): (&str, Vec<String>) = match status {
            Some(s) => (
                "SELECT * FROM contracts WHERE status = ? ORDER BY id",
                vec![s.as_str().to_string()],
            ),
            None => ("SELECT * FROM contracts ORDER BY id", vec![]),
        };
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(
            duckdb::params_from_iter(bind.iter()),
            Self::row_to_contract,
        )?;
        let mut contracts = Vec::new();
        for raw in rows {
            contracts.push(raw?.decode()?);
        }
        Ok(contracts)
    }
}

impl AuditStore for DuckStore {
    fn append_lifecycle_entry(
        &self,
        contract_id: &str,
        stage: &str,
        notes: Option<&str>,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO lifecycle_entries VALUES (?, ?, ?, ?)",
            params![contract_id, stage, Utc::now().to_rfc3339(), notes],
        )?;
        Ok(())
    }

    fn append_note(&self, contract_id: &str, author: &str, text: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO legal_notes (contract_id, author, note, created_at) VALUES (?, ?, ?, ?)",
            params![contract_id, author, text, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn notes_for(&self, contract_id: &str) -> Result<Vec<LegalNote>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, contract_id, author, note, created_at
             FROM legal_notes WHERE contract_id = ?
             ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![contract_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;
        let mut notes = Vec::new();
        for row in rows {
            let (id, contract_id, author, note, created_at) = row?;
            notes.push(LegalNote {
                id: id as u64,
                created_at: parse_timestamp(&created_at, &contract_id)?,
                contract_id,
                author,
                note,
            });
        }
        Ok(notes)
    }

    fn history_for(&self, contract_id: &str) -> Result<Vec<LifecycleEntry>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT contract_id, stage, started_at, notes
             FROM lifecycle_entries WHERE contract_id = ?
             ORDER BY started_at",
        )?;
        let rows = stmt.query_map(params![contract_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?;
        let mut history = Vec::new();
        for row in rows {
            let (contract_id, stage, started_at, notes) = row?;
            history.push(LifecycleEntry {
                started_at: parse_timestamp(&started_at, &contract_id)?,
                contract_id,
                stage,
                notes,
            });
        }
        Ok(history)
    }
}
