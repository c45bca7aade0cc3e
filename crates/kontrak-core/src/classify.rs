//! Temporal classification of a contract's date range against "now".
//!
//! Pure functions of `(start_date, end_date, now)` at day granularity.
//! The product carries two threshold conventions — lifecycle widgets use
//! "≤15 critical / ≤60 warning", card badges use "≤30 critical" — so the
//! thresholds are an explicit configuration object, never hard-coded.
//!
//! Classification only reads. The write that flips a stored status to
//! `Expired` (the status/date consistency invariant) is performed by the
//! lifecycle engine, which consults [`needs_expiry_reclassification`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::contract::{Contract, ContractStatus};

/// Expiry-window thresholds, in whole days.
///
/// A contract is `Critical` at `0..=critical_days` days to expiry and
/// `ExpiringSoon` at `critical_days+1..=warning_days`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryThresholds {
    pub critical_days: i64,
    pub warning_days: i64,
}

impl ExpiryThresholds {
    /// Lifecycle-widget convention: ≤15 critical, ≤60 warning.
    pub const LIFECYCLE: ExpiryThresholds = ExpiryThresholds {
        critical_days: 15,
        warning_days: 60,
    };

    /// Card-badge convention: ≤30 critical, ≤60 warning.
    pub const BADGE: ExpiryThresholds = ExpiryThresholds {
        critical_days: 30,
        warning_days: 60,
    };
}

impl Default for ExpiryThresholds {
    fn default() -> Self {
        Self::LIFECYCLE
    }
}

/// Expiry bucket for a contract's end date relative to now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpiryBucket {
    Active,
    ExpiringSoon,
    Critical,
    Expired,
}

impl ExpiryBucket {
    pub fn as_str(self) -> &'static str {
        match self {
            ExpiryBucket::Active => "active",
            ExpiryBucket::ExpiringSoon => "expiring-soon",
            ExpiryBucket::Critical => "critical",
            ExpiryBucket::Expired => "expired",
        }
    }
}

/// Result of classifying one contract at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub bucket: ExpiryBucket,
    /// Whole days until `end_date`; negative once past. `None` when the
    /// contract has no end date.
    pub days_to_expiry: Option<i64>,
    /// Whether `now` falls within `[start_date, end_date]` inclusive.
    /// Always false when either date is null.
    pub temporally_active: bool,
}

/// Whole days from `now` until `end_date` (floor; negative once past).
pub fn days_to_expiry(end_date: NaiveDate, now: NaiveDate) -> i64 {
    end_date.signed_duration_since(now).num_days()
}

/// Classify a contract's date range against `now` under the given thresholds.
///
/// A contract without an end date never expires: bucket `Active`,
/// `days_to_expiry: None`. It is also never temporally active, since
/// activity requires both dates.
pub fn classify(contract: &Contract, now: NaiveDate, thresholds: ExpiryThresholds) -> Classification {
    let days = contract.end_date.map(|end| days_to_expiry(end, now));
    let bucket = match days {
        None => ExpiryBucket::Active,
        Some(d) if d < 0 => ExpiryBucket::Expired,
        Some(d) if d <= thresholds.critical_days => ExpiryBucket::Critical,
        Some(d) if d <= thresholds.warning_days => ExpiryBucket::ExpiringSoon,
        Some(_) => ExpiryBucket::Active,
    };
    let temporally_active = match (contract.start_date, contract.end_date) {
        (Some(start), Some(end)) => start <= now && now <= end,
        _ => false,
    };
    Classification {
        bucket,
        days_to_expiry: days,
        temporally_active,
    }
}

/// Whether a contract counts toward an expiring-within-`window_days` bucket.
///
/// Inclusive upper bound, exclusive of already-expired and of expiry today:
/// `0 < daysToExpiry ≤ window_days`. The 30/60/90-day reporting buckets
/// overlap by construction — a contract at 20 days counts in all three.
pub fn expires_within(contract: &Contract, now: NaiveDate, window_days: i64) -> bool {
    match contract.end_date {
        Some(end) => {
            let d = days_to_expiry(end, now);
            d > 0 && d <= window_days
        }
        None => false,
    }
}

/// Whether the stored status must be flipped to `Expired` on this evaluation.
///
/// True once `end_date < now` unless the contract is already `Expired` or
/// sits in the terminal manual state `Rejected`, which is never downgraded.
pub fn needs_expiry_reclassification(contract: &Contract, now: NaiveDate) -> bool {
    if matches!(
        contract.status,
        ContractStatus::Rejected | ContractStatus::Expired
    ) {
        return false;
    }
    match contract.end_date {
        Some(end) => days_to_expiry(end, now) < 0,
        None => false,
    }
}
