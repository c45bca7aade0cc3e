//! Text rendering for KPI snapshots and per-contract classifications.

use chrono::NaiveDate;
use kontrak_core::{Classification, Contract};
use kontrak_engine::KpiSnapshot;

/// Format a Rupiah amount with thousands separators: 1500000 → "Rp 1.500.000".
fn rupiah(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    format!("Rp {grouped}")
}

/// Sectioned text card for a KPI snapshot.
pub fn kpi_card(s: &KpiSnapshot, now: NaiveDate) -> String {
    let mut out = String::new();
    out.push_str(&format!("KPI snapshot as of {now}\n"));
    out.push_str(&format!("  contracts            {}\n", s.total_contracts));
    out.push('\n');
    out.push_str("── Status ──\n");
    out.push_str(&format!("  active               {}\n", s.active_count));
    out.push_str(&format!("  expired              {}\n", s.expired_count));
    out.push_str(&format!("  pending              {}\n", s.pending_count));
    out.push('\n');
    out.push_str("── Risk ──\n");
    out.push_str(&format!(
        "  low                  {} ({:.1}%)\n",
        s.low_risk_count, s.low_risk_percentage
    ));
    out.push_str(&format!(
        "  medium               {} ({:.1}%)\n",
        s.medium_risk_count, s.medium_risk_percentage
    ));
    out.push_str(&format!(
        "  high                 {} ({:.1}%)\n",
        s.high_risk_count, s.high_risk_percentage
    ));
    out.push_str(&format!("  assessed             {}\n", s.total_risk_assessed));
    out.push('\n');
    out.push_str("── Expiring ──\n");
    out.push_str(&format!("  within 30 days       {}\n", s.expiring_30_days));
    out.push_str(&format!("  within 60 days       {}\n", s.expiring_60_days));
    out.push_str(&format!("  within 90 days       {}\n", s.expiring_90_days));
    out.push('\n');
    out.push_str("── Value ──\n");
    out.push_str(&format!(
        "  total                {}\n",
        rupiah(s.total_contract_value)
    ));
    out.push_str(&format!(
        "  avg per active       {}\n",
        rupiah(s.avg_active_contract_value.round() as u64)
    ));
    out
}

/// One line per contract: id, bucket, days to expiry, temporal activity.
pub fn classification_line(contract: &Contract, c: Classification) -> String {
    let days = match c.days_to_expiry {
        Some(d) => format!("{d:>5}d"),
        None => "    —".to_string(),
    };
    let active = if c.temporally_active { "active" } else { "      " };
    format!(
        "{:<16} {:<14} {} {}",
        contract.id,
        c.bucket.as_str(),
        days,
        active
    )
}
