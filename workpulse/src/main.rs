//! workpulse - personal productivity pattern analysis
//!
//! Commands:
//! - `analyze`: full report of validated patterns
//! - `insights`: top recommendations only
//! - `schedule`: project/time-of-day suggestions
//! - `trends`: per-day or per-week activity series
//!
//! Sessions come from a JSON file (`--input`) or a read-only SQLite database
//! (`--db`, default `$XDG_DATA_HOME/workpulse/sessions.db`).

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use workpulse_core::analytics::{
    render, render_insights, render_schedule, render_trends, AnalysisRequest, PatternEngine,
    ReportFormat, TrendGranularity,
};
use workpulse_core::{
    load_sessions_json, Config, ConfidenceTier, SessionRecord, SessionStore, SqliteSessionStore,
};

/// Exit status when there is not yet enough history to analyze.
const EXIT_INSUFFICIENT_DATA: u8 = 2;

#[derive(Parser)]
#[command(name = "workpulse")]
#[command(about = "Discover when and how you do your best work")]
#[command(version)]
struct Args {
    /// Read sessions from a JSON file instead of the database
    #[arg(long, global = true, conflicts_with = "db")]
    input: Option<PathBuf>,

    /// Sessions database (default: from config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Config file (default: $XDG_CONFIG_HOME/workpulse/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minutes east of UTC used for hours and dates (overrides config)
    #[arg(long, global = true, allow_hyphen_values = true)]
    utc_offset: Option<i32>,

    /// Reference time, RFC 3339 (default: now)
    #[arg(long, global = true)]
    as_of: Option<DateTime<Utc>>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Clone)]
struct WindowArgs {
    /// First day to analyze (YYYY-MM-DD)
    #[arg(long)]
    since: Option<NaiveDate>,

    /// Last day to analyze, inclusive (YYYY-MM-DD)
    #[arg(long)]
    until: Option<NaiveDate>,

    /// Output format: text (default), json, csv or markdown
    #[arg(short, long, default_value = "text")]
    format: String,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pattern analysis
    Analyze {
        #[command(flatten)]
        window: WindowArgs,

        /// Only report patterns at or above this tier (low, medium, high, very-high)
        #[arg(long)]
        min_confidence: Option<ConfidenceTier>,

        /// Include per-detector diagnostics
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show the top recommendations
    Insights {
        #[command(flatten)]
        window: WindowArgs,
    },

    /// Suggest when to schedule each project
    Schedule {
        #[command(flatten)]
        window: WindowArgs,

        /// Only suggest slots at or above this tier
        #[arg(long)]
        min_confidence: Option<ConfidenceTier>,
    },

    /// Show activity trends
    Trends {
        #[command(flatten)]
        window: WindowArgs,

        /// Period size: day or week
        #[arg(long, default_value = "week")]
        by: String,
    },
}

/// Where sessions are read from.
enum Source {
    File(Vec<SessionRecord>),
    Database(SqliteSessionStore),
}

impl SessionStore for Source {
    fn sessions_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> workpulse_core::Result<Vec<SessionRecord>> {
        match self {
            Source::File(sessions) => sessions.sessions_between(start, end),
            Source::Database(store) => store.sessions_between(start, end),
        }
    }
}

fn open_source(args: &Args, config: &Config) -> Result<Source> {
    if let Some(path) = &args.input {
        let sessions = load_sessions_json(path)
            .with_context(|| format!("failed to read sessions from {}", path.display()))?;
        return Ok(Source::File(sessions));
    }

    let path = args.db.clone().unwrap_or_else(|| config.database_path());
    if !path.exists() {
        anyhow::bail!(
            "No session database at {}. Pass --input <sessions.json> or --db <path>.",
            path.display()
        );
    }
    let store = SqliteSessionStore::open(&path)
        .with_context(|| format!("failed to open database {}", path.display()))?;
    Ok(Source::Database(store))
}

/// Parse `--format`, falling back to text for anything unknown.
fn output_format(value: &str) -> ReportFormat {
    value.parse().unwrap_or_else(|err| {
        eprintln!("Warning: {}; falling back to text", err);
        ReportFormat::Text
    })
}

fn emit(rendered: String) {
    println!("{}", rendered.trim_end());
}

fn request(window: &WindowArgs, as_of: DateTime<Utc>) -> AnalysisRequest {
    AnalysisRequest::new(as_of).with_range(window.since, window.until)
}

fn run(args: Args) -> Result<()> {
    Config::ensure_xdg_env();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Config::load().context("failed to load configuration")?,
    };
    if let Some(offset) = args.utc_offset {
        config.analysis.utc_offset_minutes = offset;
    }

    // Logging is best-effort; an unwritable state dir must not block analysis
    let _log_guard = workpulse_core::logging::init(&config.logging).ok();

    let source = open_source(&args, &config)?;
    let as_of = args.as_of.unwrap_or_else(Utc::now);
    let engine =
        PatternEngine::new(config.analysis.clone()).context("invalid analysis configuration")?;
    tracing::info!(
        as_of = %as_of,
        detectors = engine.detector_names().len(),
        "workpulse starting"
    );

    match &args.command {
        Command::Analyze {
            window,
            min_confidence,
            verbose,
        } => {
            let format = output_format(&window.format);
            let request = request(window, as_of).with_min_confidence(*min_confidence);
            let mut report = engine.analyze(&source, &request)?;
            if !verbose {
                report.diagnostics.clear();
            }
            emit(render(&report, format)?);
        }
        Command::Insights { window } => {
            let format = output_format(&window.format);
            let insights = engine.quick_insights(&source, &request(window, as_of))?;
            emit(render_insights(&insights, format)?);
        }
        Command::Schedule {
            window,
            min_confidence,
        } => {
            let format = output_format(&window.format);
            let request = request(window, as_of).with_min_confidence(*min_confidence);
            let suggestions = engine.generate_schedule_suggestions(&source, &request)?;
            emit(render_schedule(&suggestions, format)?);
        }
        Command::Trends { window, by } => {
            let format = output_format(&window.format);
            let granularity: TrendGranularity = by.parse()?;
            let trends = engine.trends(&source, &request(window, as_of), granularity)?;
            emit(render_trends(&trends, format)?);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(guidance) = err
                .downcast_ref::<workpulse_core::Error>()
                .and_then(|e| e.guidance())
            {
                eprintln!("Not enough data yet: {}", err);
                eprintln!("{}", guidance);
                return ExitCode::from(EXIT_INSUFFICIENT_DATA);
            }
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
