//! `dupeguard` — command-line surface over the duplicate-detection engine.
//!
//! No HTTP transport is implemented here; this binary exposes the same
//! ingestion, query, mutation, and admin operations a future HTTP layer
//! would, each subcommand printing the same JSON shape to stdout.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use dupeguard_core::{Engine, FeedbackKind, IngestInput, Location, ReportFilter, ReportStatus};
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dupeguard")]
#[command(author = "Sam Valladares")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Duplicate-detection and duplicate-lifecycle engine for civic-issue reports")]
struct Cli {
    /// Path to the SQLite database file. Defaults to the platform data dir,
    /// or the `DUPEGUARD_DB_PATH` environment variable.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Request deadline in milliseconds, applied to `ingest` only.
    #[arg(long, global = true)]
    deadline_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a new report, running it through the duplicate-detection pipeline.
    Ingest {
        #[arg(long)]
        reporter_id: String,
        #[arg(long)]
        lat: f64,
        #[arg(long)]
        lon: f64,
        #[arg(long)]
        category: String,
        #[arg(long, default_value = "medium")]
        severity: String,
        #[arg(long)]
        description: String,
        /// Photo files to embed (1..3). Raw bytes are read and passed to the
        /// image embedder; no decoding is performed by this binary.
        #[arg(long = "photo", num_args = 1..=3)]
        photos: Vec<PathBuf>,
    },

    /// Fetch a single report by id.
    Show { id: String },

    /// List reports, optionally filtered by status, category, or duplicate status.
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Restrict to duplicate-linked (`true`) or independent (`false`) reports.
        #[arg(long)]
        is_duplicate: Option<bool>,
    },

    /// List every report currently duplicate-linked to `id`.
    DuplicatesOf { id: String },

    /// Submit confirm/dispute feedback on a duplicate-linked report.
    Feedback {
        report_id: String,
        #[arg(long)]
        user_id: String,
        #[arg(long, value_enum)]
        kind: FeedbackArg,
        #[arg(long)]
        comment: Option<String>,
    },

    /// Cast an idempotent upvote.
    Upvote {
        report_id: String,
        #[arg(long)]
        user_id: String,
    },

    /// Update a report's status, optionally cascading RESOLVED to its duplicates.
    UpdateStatus {
        id: String,
        #[arg(long, value_enum)]
        status: StatusArg,
        #[arg(long)]
        cascade: bool,
    },

    /// Admin: merge `source` into `target`, folding upvotes and relinking pointers.
    Merge { target_id: String, source_id: String },

    /// Admin: cancel a report's scheduled deletion.
    CancelDeletion { report_id: String },

    /// Admin: trigger one sweeper pass immediately.
    Sweep,

    /// Report duplicate/deletion statistics.
    Stats {
        #[command(subcommand)]
        kind: StatsKind,
    },
}

#[derive(Subcommand)]
enum StatsKind {
    Duplicates,
    Deletions,
}

#[derive(Clone, clap::ValueEnum)]
enum FeedbackArg {
    Confirm,
    Dispute,
}

impl From<FeedbackArg> for FeedbackKind {
    fn from(v: FeedbackArg) -> Self {
        match v {
            FeedbackArg::Confirm => FeedbackKind::Confirm,
            FeedbackArg::Dispute => FeedbackKind::Dispute,
        }
    }
}

#[derive(Clone, clap::ValueEnum)]
enum StatusArg {
    Reported,
    UnderReview,
    InProgress,
    Resolved,
    Duplicate,
}

impl From<StatusArg> for ReportStatus {
    fn from(v: StatusArg) -> Self {
        match v {
            StatusArg::Reported => ReportStatus::Reported,
            StatusArg::UnderReview => ReportStatus::UnderReview,
            StatusArg::InProgress => ReportStatus::InProgress,
            StatusArg::Resolved => ReportStatus::Resolved,
            StatusArg::Duplicate => ReportStatus::Duplicate,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    if let Some(path) = &cli.db_path {
        // SAFETY: single-threaded at this point, before the engine reads the
        // environment and before any other thread exists.
        unsafe {
            std::env::set_var("DUPEGUARD_DB_PATH", path);
        }
    }
    let engine = Engine::from_env()?;

    match cli.command {
        Commands::Ingest {
            reporter_id,
            lat,
            lon,
            category,
            severity,
            description,
            photos,
        } => {
            if photos.is_empty() {
                anyhow::bail!("at least one --photo is required");
            }
            let photo_bytes = photos
                .iter()
                .map(std::fs::read)
                .collect::<Result<Vec<_>, _>>()?;
            let input = IngestInput {
                reporter_id,
                location: Location::new(lat, lon)?,
                category,
                severity,
                description,
                photo_bytes,
            };
            let deadline = cli.deadline_ms.map(Duration::from_millis);
            let disposition = engine.ingest(input, deadline)?;
            print_json(&disposition)?;
        }
        Commands::Show { id } => match engine.get(&id)? {
            Some(report) => print_json(&report)?,
            None => {
                eprintln!("{}", format!("no such report: {id}").red());
                std::process::exit(1);
            }
        },
        Commands::List {
            status,
            category,
            is_duplicate,
        } => {
            let filter = ReportFilter {
                status: status.map(|s| parse_status(&s)).transpose()?,
                category,
                is_duplicate,
            };
            print_json(&engine.list(&filter)?)?;
        }
        Commands::DuplicatesOf { id } => print_json(&engine.duplicates_of(&id)?)?,
        Commands::Feedback {
            report_id,
            user_id,
            kind,
            comment,
        } => {
            let outcome = engine.submit_feedback(&report_id, &user_id, kind.into(), comment.as_deref())?;
            println!("{}", format!("{outcome:?}").cyan());
        }
        Commands::Upvote { report_id, user_id } => {
            engine.upvote(&report_id, &user_id)?;
            println!("{}", "upvote recorded".green());
        }
        Commands::UpdateStatus { id, status, cascade } => {
            engine.update_status(&id, status.into(), cascade)?;
            println!("{}", "status updated".green());
        }
        Commands::Merge { target_id, source_id } => {
            engine.merge(&target_id, &source_id)?;
            println!("{}", format!("merged {source_id} into {target_id}").green());
        }
        Commands::CancelDeletion { report_id } => {
            engine.cancel_deletion(&report_id)?;
            println!("{}", "scheduled deletion cancelled".green());
        }
        Commands::Sweep => {
            let archived = engine.sweep()?;
            println!("{}", format!("archived {archived} report(s)").green());
        }
        Commands::Stats { kind } => match kind {
            StatsKind::Duplicates => print_json(&engine.stats_duplicates()?)?,
            StatsKind::Deletions => print_json(&engine.stats_deletions()?)?,
        },
    }

    Ok(())
}

fn parse_status(s: &str) -> anyhow::Result<ReportStatus> {
    Ok(match s.to_uppercase().as_str() {
        "REPORTED" => ReportStatus::Reported,
        "UNDER_REVIEW" => ReportStatus::UnderReview,
        "IN_PROGRESS" => ReportStatus::InProgress,
        "RESOLVED" => ReportStatus::Resolved,
        "DUPLICATE" => ReportStatus::Duplicate,
        other => anyhow::bail!("unknown status: {other}"),
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
