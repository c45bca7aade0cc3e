//! Contract lifecycle state machine.
//!
//! The legal moves form the graph
//!
//! ```text
//!                        ┌──────────────── Revision Requested ◄──┐
//!                        ▼                        ▲              │
//! Draft ──► Submitted ──►┴──► Reviewed ──► Approved ──► Active ──► Expired
//!               │                 │            (│ Reviewed → Active kept as
//!               ▼                 ▼               a deprecated synonym)
//!            Rejected          Rejected
//! ```
//!
//! with `Rejected` and `Expired` terminal. Every edge carries the set of
//! roles allowed to take it and whether it must leave reviewer commentary
//! behind. The whole table lives in [`rule_for`], so authorization is one
//! function consultable without any store or UI.
//!
//! Side-effect ordering on a successful transition: the conditional status
//! update lands first; only then are the lifecycle entry and note appended.
//! A failed status update writes nothing. A failed audit write after a
//! committed status update is reported as a warning on the outcome, never
//! rolled back — status correctness is mandatory, audit completeness is
//! best-effort.

use chrono::NaiveDate;
use kontrak_core::classify::needs_expiry_reclassification;
use kontrak_core::{Contract, ContractStatus, Role};
use kontrak_store::{AuditStore, ContractStore, StoreError};
use tracing::{info, warn};

use crate::TransitionError;

/// One edge of the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    pub allowed_roles: &'static [Role],
    /// Whether the transition always writes an audit note (approve,
    /// revision, reject carry reviewer commentary).
    pub requires_note: bool,
    /// Kept for call sites that predate the canonical
    /// `Reviewed → Approved → Active` path.
    pub deprecated: bool,
}

const fn rule(allowed_roles: &'static [Role], requires_note: bool) -> TransitionRule {
    TransitionRule {
        allowed_roles,
        requires_note,
        deprecated: false,
    }
}

/// Look up the rule for an edge, or `None` when the edge does not exist.
pub fn rule_for(from: ContractStatus, to: ContractStatus) -> Option<TransitionRule> {
    use ContractStatus::*;
    use Role::*;
    match (from, to) {
        (Draft, Submitted) => Some(rule(&[Procurement, Management], false)),
        (Submitted, Reviewed) => Some(rule(&[Legal], false)),
        (Submitted, RevisionRequested) => Some(rule(&[Legal], true)),
        (Reviewed, RevisionRequested) => Some(rule(&[Legal], true)),
        (Submitted, Rejected) => Some(rule(&[Legal], true)),
        (Reviewed, Rejected) => Some(rule(&[Legal], true)),
        (Reviewed, Approved) => Some(rule(&[Management], true)),
        (Approved, Active) => Some(rule(&[Management], false)),
        // Deprecated synonym for Reviewed → Approved → Active. Approval
        // always leaves an attributed note, so the synonym does too.
        (Reviewed, Active) => Some(TransitionRule {
            allowed_roles: &[Management],
            requires_note: true,
            deprecated: true,
        }),
        (RevisionRequested, Submitted) => Some(rule(&[Procurement], false)),
        (Active, Expired) => Some(rule(&[Management, Owner], false)),
        _ => None,
    }
}

/// Pure authorization check for one attempted transition.
///
/// Distinguishes a nonexistent edge (`IllegalTransition`) from an existing
/// edge the role may not take (`Unauthorized`).
pub fn check_transition(
    from: ContractStatus,
    to: ContractStatus,
    role: Role,
) -> Result<TransitionRule, TransitionError> {
    let rule = rule_for(from, to).ok_or(TransitionError::IllegalTransition {
        from,
        attempted: to,
    })?;
    if !rule.allowed_roles.contains(&role) {
        return Err(TransitionError::Unauthorized {
            role,
            from,
            attempted: to,
        });
    }
    Ok(rule)
}

/// Result of a successful transition.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    /// The contract as stored after the transition.
    pub contract: Contract,
    /// Non-fatal audit-write failures. The status change is committed even
    /// when these are present.
    pub warnings: Vec<String>,
}

/// Execute a role-checked status transition.
///
/// Requesting the status the contract already has is a no-op success for
/// any role: nothing is written, no lifecycle entry is duplicated.
pub fn transition_contract<C, A>(
    contracts: &C,
    audit: &A,
    id: &str,
    target: ContractStatus,
    role: Role,
    note: Option<&str>,
) -> Result<TransitionOutcome, TransitionError>
where
    C: ContractStore,
    A: AuditStore,
{
    let contract = contracts.get_contract(id)?;
    let current = contract.status;

    if current == target {
        return Ok(TransitionOutcome {
            contract,
            warnings: Vec::new(),
        });
    }

    let rule = check_transition(current, target, role)?;
    if rule.deprecated {
        warn!(
            id,
            from = %current,
            to = %target,
            "deprecated edge; canonical path is Reviewed → Approved → Active"
        );
    }

    // Status first. A conflict here means another writer won the race; the
    // caller refetches and retries, and no audit records exist for the loss.
    let updated = contracts.update_status(id, target, current)?;
    info!(id, from = %current, to = %target, role = %role, "contract transitioned");

    let mut warnings = Vec::new();
    if let Err(err) = audit.append_lifecycle_entry(id, target.as_str(), note) {
        warn!(id, stage = %target, error = %err, "lifecycle entry write failed");
        warnings.push(format!("lifecycle entry not recorded: {err}"));
    }

    if rule.requires_note || note.is_some() {
        let text = note.map_or_else(|| format!("Status changed to {target}"), str::to_string);
        if let Err(err) = audit.append_note(id, role.system_identity(), &text) {
            warn!(id, error = %err, "audit note write failed");
            warnings.push(format!("audit note not recorded: {err}"));
        }
    }

    Ok(TransitionOutcome {
        contract: updated,
        warnings,
    })
}

/// Fetch a contract, flipping its stored status to `Expired` first when its
/// end date has passed.
///
/// This is the write half of the status/date consistency invariant: the
/// classifier only reports staleness, this function repairs it on read.
/// Losing the repair race to a concurrent writer is fine — the fresh row is
/// returned either way. `Rejected` is never downgraded.
pub fn load_contract<C, A>(
    contracts: &C,
    audit: &A,
    id: &str,
    now: NaiveDate,
) -> Result<Contract, TransitionError>
where
    C: ContractStore,
    A: AuditStore,
{
    let contract = contracts.get_contract(id)?;
    if !needs_expiry_reclassification(&contract, now) {
        return Ok(contract);
    }
    match contracts.update_status(id, ContractStatus::Expired, contract.status) {
        Ok(updated) => {
            info!(id, from = %contract.status, "contract reclassified as expired");
            if let Err(err) =
                audit.append_lifecycle_entry(id, ContractStatus::Expired.as_str(), Some("End date passed"))
            {
                warn!(id, error = %err, "lifecycle entry write failed");
            }
            Ok(updated)
        }
        Err(StoreError::Conflict { .. }) => Ok(contracts.get_contract(id)?),
        Err(err) => Err(err.into()),
    }
}

/// Reclassify every overdue contract in the store. Returns how many rows
/// were flipped to `Expired`.
pub fn sweep_expired<C, A>(
    contracts: &C,
    audit: &A,
    now: NaiveDate,
) -> Result<usize, TransitionError>
where
    C: ContractStore,
    A: AuditStore,
{
    let mut flipped = 0;
    for contract in contracts.scan_contracts(None)? {
        if !needs_expiry_reclassification(&contract, now) {
            continue;
        }
        match contracts.update_status(&contract.id, ContractStatus::Expired, contract.status) {
            Ok(_) => {
                if let Err(err) = audit.append_lifecycle_entry(
                    &contract.id,
                    ContractStatus::Expired.as_str(),
                    Some("End date passed"),
                ) {
                    warn!(id = %contract.id, error = %err, "lifecycle entry write failed");
                }
                flipped += 1;
            }
            // Lost to a concurrent writer; their status wins.
            Err(StoreError::Conflict { .. }) => {}
            Err(err) => return Err(err.into()),
        }
    }
    if flipped > 0 {
        info!(flipped, "expiry sweep complete");
    }
    Ok(flipped)
}
