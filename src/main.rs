//! Nutriscan command-line front end.
//!
//! ```bash
//! nutriscan evaluate scan.json
//! nutriscan trend 6f1c1c8e-2f55-4a8e-9d55-0b8c2b5e7a10
//! nutriscan monthly 6f1c1c8e-2f55-4a8e-9d55-0b8c2b5e7a10 --year 2026 --month 3
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Datelike;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use nutriscan_lib::analysis::{advice, AdviceItem, DefaultSafetyEngine, MessageTemplates, SafetyEngine, ScanRequest};
use nutriscan_lib::config::{self, AnalysisConfig};
use nutriscan_lib::db::{ReportStore, SqliteReportStore};
use nutriscan_lib::history::{month_over_month, monthly_summary, trend_with_tolerance};
use nutriscan_lib::models::{SafetyReport, UserProfile};
use nutriscan_lib::reference::ReferenceSnapshot;

#[derive(Parser)]
#[command(
    name = "nutriscan",
    version,
    about = "Supplement safety checks for seniors",
    long_about = "Evaluate supplement labels against a health profile and review past scans."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Report database (defaults to the app data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Reference table directory (bundled tables when absent)
    #[arg(long, global = true)]
    reference_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate a scan document `{ "profile": ..., "scan": ... }` and store the report
    Evaluate {
        scan_file: PathBuf,

        /// Do not store the report
        #[arg(long)]
        dry_run: bool,
    },

    /// Per-nutrient trend over every stored report of a profile
    Trend { profile_id: Uuid },

    /// Monthly summary for a profile (current month by default)
    Monthly {
        profile_id: Uuid,

        #[arg(long)]
        year: Option<i32>,

        #[arg(long)]
        month: Option<u32>,
    },

    /// Average intake per nutrient and month
    Intake { profile_id: Uuid },
}

#[derive(Deserialize)]
struct ScanDocument {
    profile: UserProfile,
    scan: ScanRequest,
}

#[derive(Serialize)]
struct EvaluationOutput<'a> {
    summary: &'static str,
    report: &'a SafetyReport,
    advice: Vec<AdviceItem>,
}

fn main() -> Result<()> {
    nutriscan_lib::init_tracing();
    let cli = Cli::parse();
    let analysis = AnalysisConfig::from_env();
    let db_path = cli.db.unwrap_or_else(config::database_path);

    match cli.command {
        Command::Evaluate { scan_file, dry_run } => {
            let reference_dir = cli.reference_dir.unwrap_or_else(config::reference_dir);
            let reference = ReferenceSnapshot::load_or_bundled(&reference_dir)
                .with_context(|| format!("loading reference data from {}", reference_dir.display()))?;
            let document = read_document(&scan_file)?;

            let engine = DefaultSafetyEngine::with_config(Arc::new(reference), analysis);
            let report = engine.evaluate(&document.scan, &document.profile);

            if !dry_run {
                open_store(&db_path)?
                    .save_report(&report)
                    .context("storing safety report")?;
            }

            print_json(&EvaluationOutput {
                summary: MessageTemplates::signal_summary(report.overall_signal),
                advice: advice(&report),
                report: &report,
            })
        }
        Command::Trend { profile_id } => {
            let reports = open_store(&db_path)?.reports_for_profile(&profile_id)?;
            print_json(&trend_with_tolerance(&reports, analysis.trend_stable_tolerance_pct))
        }
        Command::Monthly { profile_id, year, month } => {
            let today = chrono::Local::now().date_naive();
            let year = year.unwrap_or(today.year());
            let month = month.unwrap_or(today.month());
            let reports = open_store(&db_path)?.reports_in_month(&profile_id, year, month)?;
            print_json(&monthly_summary(&reports, year, month))
        }
        Command::Intake { profile_id } => {
            let reports = open_store(&db_path)?.reports_for_profile(&profile_id)?;
            print_json(&month_over_month(&reports, analysis.trend_stable_tolerance_pct))
        }
    }
}

fn read_document(path: &Path) -> Result<ScanDocument> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))
}

fn open_store(path: &Path) -> Result<SqliteReportStore> {
    SqliteReportStore::open(path).with_context(|| format!("opening {}", path.display()))
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
