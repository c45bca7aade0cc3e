//! Operator CLI: KPI snapshots, expiry classification, and transition
//! dry-runs over a JSON contract export.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, bail};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use kontrak_core::{Contract, ContractStatus, ExpiryThresholds, Role, classify};
use kontrak_engine::{check_transition, compute_aggregates};

mod display;

#[derive(Parser)]
#[command(name = "kontrak", version, about = "Contract lifecycle and KPI tooling")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute the KPI snapshot over a contract export
    Kpi {
        /// JSON file containing an array of contract records
        #[arg(long)]
        input: PathBuf,
        /// Case-insensitive substring filter over contract id and parties
        #[arg(long)]
        filter: Option<String>,
        /// Evaluation date, e.g. 2026-08-30 (defaults to today)
        #[arg(long)]
        as_of: Option<NaiveDate>,
        /// Emit JSON instead of the text card
        #[arg(long)]
        json: bool,
    },
    /// Classify each contract's expiry window
    Classify {
        /// JSON file containing an array of contract records
        #[arg(long)]
        input: PathBuf,
        /// Evaluation date (defaults to today)
        #[arg(long)]
        as_of: Option<NaiveDate>,
        /// Use the card-badge thresholds (critical ≤30d) instead of the
        /// lifecycle thresholds (critical ≤15d)
        #[arg(long)]
        badge: bool,
    },
    /// Dry-run a transition against the role/edge table
    CheckTransition {
        #[arg(long)]
        from: ContractStatus,
        #[arg(long)]
        to: ContractStatus,
        #[arg(long)]
        role: Role,
    },
}

fn load_contracts(path: &PathBuf) -> anyhow::Result<Vec<Contract>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let contracts: Vec<Contract> =
        serde_json::from_reader(file).with_context(|| format!("bad JSON in {}", path.display()))?;
    tracing::info!(count = contracts.len(), path = %path.display(), "loaded contract export");
    Ok(contracts)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Kpi {
            input,
            filter,
            as_of,
            json,
        } => {
            let contracts = load_contracts(&input)?;
            let now = as_of.unwrap_or_else(|| Utc::now().date_naive());
            let snapshot = compute_aggregates(&contracts, filter.as_deref(), now);
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print!("{}", display::kpi_card(&snapshot, now));
            }
        }
        Command::Classify {
            input,
            as_of,
            badge,
        } => {
            let contracts = load_contracts(&input)?;
            let now = as_of.unwrap_or_else(|| Utc::now().date_naive());
            let thresholds = if badge {
                ExpiryThresholds::BADGE
            } else {
                ExpiryThresholds::LIFECYCLE
            };
            for contract in &contracts {
                let c = classify::classify(contract, now, thresholds);
                println!("{}", display::classification_line(contract, c));
            }
        }
        Command::CheckTransition { from, to, role } => match check_transition(from, to, role) {
            Ok(rule) => {
                let note = if rule.requires_note {
                    " (writes an audit note)"
                } else {
                    ""
                };
                let deprecated = if rule.deprecated { " [deprecated edge]" } else { "" };
                println!("allowed: {from} → {to} as {role}{note}{deprecated}");
            }
            Err(err) => bail!("refused: {err}"),
        },
    }

    Ok(())
}
