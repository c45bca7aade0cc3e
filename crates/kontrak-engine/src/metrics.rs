//! KPI/risk aggregation over a contract set.
//!
//! A snapshot is derived in one pass over a materialized slice and is never
//! persisted: every request recomputes against whatever the caller read.
//! The aggregator is correct on any subset, because dashboards hand it
//! differently filtered slices.
//!
//! A failed scan propagates as [`AggregateError`] — an empty store and an
//! unreachable store must render differently, so no code path substitutes a
//! zero-filled snapshot for an error.

use chrono::NaiveDate;
use kontrak_core::classify::expires_within;
use kontrak_core::{Contract, ContractStatus, RiskLevel};
use kontrak_store::ContractStore;
use serde::Serialize;
use tracing::debug;

use crate::AggregateError;

/// Point-in-time counts, sums, and percentage distributions over a contract
/// set. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct KpiSnapshot {
    pub total_contracts: usize,

    // Status counts (pending = neither active nor expired).
    pub active_count: usize,
    pub expired_count: usize,
    pub pending_count: usize,

    // Risk distribution; unassessed contracts are excluded from counts and
    // from the percentage denominator.
    pub low_risk_count: usize,
    pub medium_risk_count: usize,
    pub high_risk_count: usize,
    pub total_risk_assessed: usize,
    pub low_risk_percentage: f64,
    pub medium_risk_percentage: f64,
    pub high_risk_percentage: f64,

    // Overlapping expiry windows: a contract at 20 days counts in all three.
    pub expiring_30_days: usize,
    pub expiring_60_days: usize,
    pub expiring_90_days: usize,

    // Rupiah value aggregates; null value counts as 0.
    pub total_contract_value: u64,
    pub avg_active_contract_value: f64,
}

/// Compute all KPI aggregates over a materialized contract slice.
///
/// `filter` is an optional case-insensitive substring predicate over
/// contract id and party names, applied before aggregation.
pub fn compute_aggregates(
    contracts: &[Contract],
    filter: Option<&str>,
    now: NaiveDate,
) -> KpiSnapshot {
    let mut snapshot = KpiSnapshot::default();
    let mut active_value: u64 = 0;

    for contract in contracts {
        if let Some(needle) = filter {
            if !contract.matches_filter(needle) {
                continue;
            }
        }
        snapshot.total_contracts += 1;

        match contract.status {
            ContractStatus::Active => snapshot.active_count += 1,
            ContractStatus::Expired => snapshot.expired_count += 1,
            _ => snapshot.pending_count += 1,
        }

        match contract.risk {
            Some(RiskLevel::Low) => snapshot.low_risk_count += 1,
            Some(RiskLevel::Medium) => snapshot.medium_risk_count += 1,
            Some(RiskLevel::High) => snapshot.high_risk_count += 1,
            None => {}
        }

        if expires_within(contract, now, 30) {
            snapshot.expiring_30_days += 1;
        }
        if expires_within(contract, now, 60) {
            snapshot.expiring_60_days += 1;
        }
        if expires_within(contract, now, 90) {
            snapshot.expiring_90_days += 1;
        }

        let value = contract.value_rp.unwrap_or(0);
        snapshot.total_contract_value += value;
        if contract.status == ContractStatus::Active {
            active_value += value;
        }
    }

    snapshot.total_risk_assessed =
        snapshot.low_risk_count + snapshot.medium_risk_count + snapshot.high_risk_count;
    if snapshot.total_risk_assessed > 0 {
        let denom = snapshot.total_risk_assessed as f64;
        snapshot.low_risk_percentage = snapshot.low_risk_count as f64 / denom * 100.0;
        snapshot.medium_risk_percentage = snapshot.medium_risk_count as f64 / denom * 100.0;
        snapshot.high_risk_percentage = snapshot.high_risk_count as f64 / denom * 100.0;
    }
    if snapshot.active_count > 0 {
        snapshot.avg_active_contract_value = active_value as f64 / snapshot.active_count as f64;
    }

    debug!(
        total = snapshot.total_contracts,
        active = snapshot.active_count,
        expiring_30 = snapshot.expiring_30_days,
        "aggregates computed"
    );
    snapshot
}

/// Scan the store and aggregate in one call.
///
/// Reads are not transactionally isolated from concurrent writers: two
/// back-to-back calls during a write storm may differ, and that is fine.
/// Two calls with no writers in between yield identical snapshots.
pub fn load_aggregates<C: ContractStore>(
    store: &C,
    filter: Option<&str>,
    now: NaiveDate,
) -> Result<KpiSnapshot, AggregateError> {
    let contracts = store.scan_contracts(None)?;
    Ok(compute_aggregates(&contracts, filter, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;
    use kontrak_store::{MemoryStore, StoreError};

    fn now() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 30).unwrap()
    }

    fn contract(id: &str, status: ContractStatus, risk: Option<RiskLevel>) -> Contract {
        let mut c = Contract::new_draft(id, "tester");
        c.status = status;
        c.risk = risk;
        c
    }

    fn expiring(id: &str, days: u64) -> Contract {
        let mut c = contract(id, ContractStatus::Active, None);
        c.start_date = Some(now() - Days::new(30));
        c.end_date = Some(now() + Days::new(days));
        c
    }

    #[test]
    fn empty_set_yields_all_zero() {
        let snapshot = compute_aggregates(&[], None, now());
        assert_eq!(snapshot, KpiSnapshot::default());
    }

    #[test]
    fn status_counts_split_active_expired_pending() {
        let set = [
            contract("a", ContractStatus::Active, None),
            contract("b", ContractStatus::Active, None),
            contract("c", ContractStatus::Expired, None),
            contract("d", ContractStatus::Draft, None),
            contract("e", ContractStatus::Submitted, None),
            contract("f", ContractStatus::Rejected, None),
        ];
        let snapshot = compute_aggregates(&set, None, now());
        assert_eq!(snapshot.total_contracts, 6);
        assert_eq!(snapshot.active_count, 2);
        assert_eq!(snapshot.expired_count, 1);
        assert_eq!(snapshot.pending_count, 3);
    }

    #[test]
    fn mixed_case_risk_labels_count_together() {
        // Upstream rows wrote "High" and "high"; both parse to the same
        // variant, so the aggregate sees two assessed contracts.
        let set = [
            contract("a", ContractStatus::Active, Some("High".parse().unwrap())),
            contract("b", ContractStatus::Active, Some("high".parse().unwrap())),
            contract("c", ContractStatus::Active, None),
        ];
        let snapshot = compute_aggregates(&set, None, now());
        assert_eq!(snapshot.high_risk_count, 2);
        assert_eq!(snapshot.total_risk_assessed, 2);
        assert_eq!(snapshot.high_risk_percentage, 100.0);
        assert_eq!(snapshot.low_risk_percentage, 0.0);
    }

    #[test]
    fn risk_percentages_sum_to_100() {
        let set = [
            contract("a", ContractStatus::Active, Some(RiskLevel::Low)),
            contract("b", ContractStatus::Active, Some(RiskLevel::Low)),
            contract("c", ContractStatus::Active, Some(RiskLevel::Medium)),
            contract("d", ContractStatus::Active, Some(RiskLevel::High)),
            contract("e", ContractStatus::Draft, None),
        ];
        let snapshot = compute_aggregates(&set, None, now());
        assert_eq!(snapshot.total_risk_assessed, 4);
        let sum = snapshot.low_risk_percentage
            + snapshot.medium_risk_percentage
            + snapshot.high_risk_percentage;
        assert!((sum - 100.0).abs() < 1e-9, "sum was {sum}");
    }

    #[test]
    fn no_assessed_contracts_means_zero_percentages() {
        let set = [
            contract("a", ContractStatus::Active, None),
            contract("b", ContractStatus::Draft, None),
        ];
        let snapshot = compute_aggregates(&set, None, now());
        assert_eq!(snapshot.total_risk_assessed, 0);
        assert_eq!(snapshot.low_risk_percentage, 0.0);
        assert_eq!(snapshot.medium_risk_percentage, 0.0);
        assert_eq!(snapshot.high_risk_percentage, 0.0);
    }

    #[test]
    fn expiry_buckets_overlap_and_are_monotonic() {
        let set = [
            expiring("a", 10),
            expiring("b", 20),
            expiring("c", 45),
            expiring("d", 75),
            expiring("e", 120),
        ];
        let snapshot = compute_aggregates(&set, None, now());
        assert_eq!(snapshot.expiring_30_days, 2);
        assert_eq!(snapshot.expiring_60_days, 3);
        assert_eq!(snapshot.expiring_90_days, 4);
        assert!(snapshot.expiring_30_days <= snapshot.expiring_60_days);
        assert!(snapshot.expiring_60_days <= snapshot.expiring_90_days);
    }

    #[test]
    fn expired_contracts_do_not_join_expiry_windows() {
        let mut past = contract("a", ContractStatus::Active, None);
        past.end_date = Some(now() - Days::new(5));
        let snapshot = compute_aggregates(&[past], None, now());
        assert_eq!(snapshot.expiring_30_days, 0);
        assert_eq!(snapshot.expiring_90_days, 0);
    }

    #[test]
    fn value_aggregates_treat_null_as_zero() {
        let mut a = contract("a", ContractStatus::Active, None);
        a.value_rp = Some(400_000_000);
        let mut b = contract("b", ContractStatus::Active, None);
        b.value_rp = None;
        let mut c = contract("c", ContractStatus::Draft, None);
        c.value_rp = Some(100_000_000);

        let snapshot = compute_aggregates(&[a, b, c], None, now());
        assert_eq!(snapshot.total_contract_value, 500_000_000);
        // Average over active contracts only, null counted as zero.
        assert_eq!(snapshot.avg_active_contract_value, 200_000_000.0);
    }

    #[test]
    fn no_active_contracts_means_zero_average() {
        let mut a = contract("a", ContractStatus::Draft, None);
        a.value_rp = Some(900_000_000);
        let snapshot = compute_aggregates(&[a], None, now());
        assert_eq!(snapshot.avg_active_contract_value, 0.0);
        assert_eq!(snapshot.total_contract_value, 900_000_000);
    }

    #[test]
    fn filter_applies_before_aggregation() {
        let mut a = contract("CTR-1", ContractStatus::Active, Some(RiskLevel::High));
        a.first_party = Some("PT Nusantara Logistik".into());
        a.value_rp = Some(300_000_000);
        let mut b = contract("CTR-2", ContractStatus::Active, Some(RiskLevel::Low));
        b.first_party = Some("CV Maju Bersama".into());
        b.value_rp = Some(700_000_000);

        let snapshot = compute_aggregates(&[a, b], Some("nusantara"), now());
        assert_eq!(snapshot.total_contracts, 1);
        assert_eq!(snapshot.active_count, 1);
        assert_eq!(snapshot.high_risk_count, 1);
        assert_eq!(snapshot.total_risk_assessed, 1);
        assert_eq!(snapshot.high_risk_percentage, 100.0);
        assert_eq!(snapshot.total_contract_value, 300_000_000);
    }

    #[test]
    fn aggregator_works_on_any_subset() {
        let set = [
            contract("a", ContractStatus::Active, Some(RiskLevel::Low)),
            contract("b", ContractStatus::Expired, Some(RiskLevel::High)),
        ];
        let all = compute_aggregates(&set, None, now());
        let first_only = compute_aggregates(&set[..1], None, now());
        assert_eq!(all.total_contracts, 2);
        assert_eq!(first_only.total_contracts, 1);
        assert_eq!(first_only.expired_count, 0);
        assert_eq!(first_only.low_risk_percentage, 100.0);
    }

    #[test]
    fn recomputation_without_writers_is_identical() {
        let set = [
            expiring("a", 10),
            contract("b", ContractStatus::Draft, Some(RiskLevel::Medium)),
        ];
        let first = compute_aggregates(&set, None, now());
        let second = compute_aggregates(&set, None, now());
        assert_eq!(first, second);
    }

    #[test]
    fn load_aggregates_reads_through_the_store() {
        let store = MemoryStore::with_contracts([
            contract("a", ContractStatus::Active, Some(RiskLevel::Low)),
            contract("b", ContractStatus::Draft, None),
        ]);
        let snapshot = load_aggregates(&store, None, now()).unwrap();
        assert_eq!(snapshot.total_contracts, 2);
        assert_eq!(snapshot.active_count, 1);
    }

    /// Store whose scans always fail.
    struct DownStore;

    impl ContractStore for DownStore {
        fn get_contract(&self, id: &str) -> Result<Contract, StoreError> {
            Err(StoreError::NotFound(id.to_string()))
        }

        fn insert_contract(&self, _: &Contract) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("read-only".into()))
        }

        fn update_status(
            &self,
            _: &str,
            _: ContractStatus,
            _: ContractStatus,
        ) -> Result<Contract, StoreError> {
            Err(StoreError::Unavailable("read-only".into()))
        }

        fn scan_contracts(
            &self,
            _: Option<ContractStatus>,
        ) -> Result<Vec<Contract>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    #[test]
    fn scan_failure_is_an_error_not_an_empty_snapshot() {
        let result = load_aggregates(&DownStore, None, now());
        assert!(matches!(result, Err(AggregateError::SourceUnavailable(_))));
    }

    #[test]
    fn snapshot_serialises_for_dashboards() {
        let snapshot = compute_aggregates(&[expiring("a", 10)], None, now());
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["total_contracts"], 1);
        assert_eq!(json["expiring_30_days"], 1);
    }
}
