//! Contract domain types shared across the Kontrak workspace.
//!
//! Upstream writers (dashboard forms, imports) have historically stored
//! status and risk labels with inconsistent casing, so every enum here
//! parses case-insensitively and renders one canonical label. Downstream
//! code compares typed variants, never strings.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to parse a status, risk, or role label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognised {kind} label: {input:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub input: String,
}

/// Lifecycle status of a contract.
///
/// The graph is `Draft → Submitted → Reviewed → Approved → Active → Expired`,
/// with `Revision Requested → Submitted` as the resubmission back-edge and
/// `Rejected` reachable from `Submitted` or `Reviewed`. `Rejected` and
/// `Expired` are terminal. Which edges exist, and which roles may take them,
/// is defined by the transition table in `kontrak-engine`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractStatus {
    Draft,
    Submitted,
    Reviewed,
    #[serde(rename = "Revision Requested")]
    RevisionRequested,
    Approved,
    Active,
    Rejected,
    Expired,
}

impl ContractStatus {
    pub const ALL: [ContractStatus; 8] = [
        ContractStatus::Draft,
        ContractStatus::Submitted,
        ContractStatus::Reviewed,
        ContractStatus::RevisionRequested,
        ContractStatus::Approved,
        ContractStatus::Active,
        ContractStatus::Rejected,
        ContractStatus::Expired,
    ];

    /// Canonical product label, as written to the store.
    pub fn as_str(self) -> &'static str {
        match self {
            ContractStatus::Draft => "Draft",
            ContractStatus::Submitted => "Submitted",
            ContractStatus::Reviewed => "Reviewed",
            ContractStatus::RevisionRequested => "Revision Requested",
            ContractStatus::Approved => "Approved",
            ContractStatus::Active => "Active",
            ContractStatus::Rejected => "Rejected",
            ContractStatus::Expired => "Expired",
        }
    }

    /// Terminal states have no outbound edges.
    pub fn is_terminal(self) -> bool {
        matches!(self, ContractStatus::Rejected | ContractStatus::Expired)
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "draft" => Ok(ContractStatus::Draft),
            "submitted" => Ok(ContractStatus::Submitted),
            "reviewed" => Ok(ContractStatus::Reviewed),
            "revision requested" => Ok(ContractStatus::RevisionRequested),
            "approved" => Ok(ContractStatus::Approved),
            "active" => Ok(ContractStatus::Active),
            "rejected" => Ok(ContractStatus::Rejected),
            "expired" => Ok(ContractStatus::Expired),
            _ => Err(ParseEnumError {
                kind: "status",
                input: s.to_string(),
            }),
        }
    }
}

/// Coarse risk classification assigned by external document analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            _ => Err(ParseEnumError {
                kind: "risk",
                input: s.to_string(),
            }),
        }
    }
}

/// Acting role of the user requesting an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Procurement,
    Legal,
    Management,
    Owner,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Procurement => "procurement",
            Role::Legal => "legal",
            Role::Management => "management",
            Role::Owner => "owner",
        }
    }

    /// Author label used when the system writes an audit note on behalf of
    /// the acting role (approve / revision / reject commentary).
    pub fn system_identity(self) -> &'static str {
        match self {
            Role::Procurement => "Procurement Team",
            Role::Legal => "Legal Team",
            Role::Management => "Management",
            Role::Owner => "Owner",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "procurement" => Ok(Role::Procurement),
            "legal" => Ok(Role::Legal),
            "management" => Ok(Role::Management),
            "owner" => Ok(Role::Owner),
            _ => Err(ParseEnumError {
                kind: "role",
                input: s.to_string(),
            }),
        }
    }
}

/// Lowercase, collapse `_`/`-` to spaces, trim.
fn normalize_label(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| match c {
            '_' | '-' => ' ',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// A contract record as held in the contract store.
///
/// `start_date`/`end_date` are the source of truth for lifecycle
/// classification; `duration_months` may be declared or derived and is
/// carried for display only. `value_rp` is a non-negative Rupiah amount,
/// null until known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: String,
    #[serde(default)]
    pub first_party: Option<String>,
    #[serde(default)]
    pub second_party: Option<String>,
    #[serde(default)]
    pub value_rp: Option<u64>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub duration_months: Option<u32>,
    #[serde(default)]
    pub risk: Option<RiskLevel>,
    pub status: ContractStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub file_url: Option<String>,
}

impl Contract {
    /// A freshly drafted contract, as first persisted by a procurement actor.
    pub fn new_draft(id: impl Into<String>, created_by: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            first_party: None,
            second_party: None,
            value_rp: None,
            start_date: None,
            end_date: None,
            duration_months: None,
            risk: None,
            status: ContractStatus::Draft,
            created_by: created_by.into(),
            created_at: now,
            updated_at: now,
            file_url: None,
        }
    }

    /// Case-insensitive substring match over id and both party names.
    ///
    /// Dashboards filter their contract slice with this before aggregation.
    pub fn matches_filter(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        if needle.is_empty() {
            return true;
        }
        let haystacks = [
            Some(self.id.as_str()),
            self.first_party.as_deref(),
            self.second_party.as_deref(),
        ];
        haystacks
            .into_iter()
            .flatten()
            .any(|h| h.to_lowercase().contains(&needle))
    }
}

/// Append-only reviewer commentary tied to a contract.
///
/// Never mutated or deleted; newest-first is the canonical read order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalNote {
    pub id: u64,
    pub contract_id: String,
    pub author: String,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

/// Append-only audit trail entry written alongside every status transition.
///
/// Read only as human history — `Contract::status` is the status truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEntry {
    pub contract_id: String,
    pub stage: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
}
