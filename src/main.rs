//! CLI entry point for the punctuality insights pipeline.
//!
//! Provides subcommands for processing a raw punctuality CSV into the
//! processed metrics table and for summarizing an already-processed table.

use anyhow::Result;
use clap::{Parser, Subcommand};
use punctuality_insights::analyzers::rankings::{
    covid_summary, operator_rankings, season_means, seasonal_analysis,
};
use punctuality_insights::analyzers::types::MonthlyMetrics;
use punctuality_insights::cache::ProcessedCache;
use punctuality_insights::output::print_json;
use punctuality_insights::pipeline::{self, PipelineReport};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{debug, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const DEFAULT_RAW: &str = "data/raw/norwegian_entur_punctuality.csv";
const DEFAULT_PROCESSED: &str = "data/processed/punctuality_insights_processed.csv";

#[derive(Parser)]
#[command(name = "punctuality_insights")]
#[command(about = "Aggregate Norwegian public-transport punctuality data", long_about = None)]
struct Cli {
    /// Log debug-level detail to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the aggregation pipeline over a raw punctuality CSV
    Process {
        /// Raw monthly punctuality records
        #[arg(short, long, default_value = DEFAULT_RAW)]
        input: String,

        /// Where to write the processed metrics table
        #[arg(short, long, default_value = DEFAULT_PROCESSED)]
        output: String,

        /// Also log operator rankings, seasonal patterns, and the
        /// pandemic-period comparison
        #[arg(short, long)]
        analysis: bool,
    },
    /// Log headline figures from an already-processed table
    Summary {
        /// Processed metrics table to read
        #[arg(short, long, default_value = DEFAULT_PROCESSED)]
        input: String,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let cli = Cli::parse();

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/punctuality_insights.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("punctuality_insights.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_level = if cli.verbose { "debug" } else { "info" };
    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive(stderr_level.parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    match cli.command {
        Commands::Process {
            input,
            output,
            analysis,
        } => {
            let outcome = pipeline::run(Path::new(&input), Path::new(&output))?;
            if analysis {
                run_extended_analysis(&outcome.rows)?;
            }
        }
        Commands::Summary { input } => {
            let mut cache = ProcessedCache::new(&input);
            let rows = cache.load()?;
            match PipelineReport::from_rows(rows) {
                Some(report) => print_json(&report)?,
                None => anyhow::bail!("processed table {input} has no rows"),
            }
        }
    }

    Ok(())
}

/// Logs the extended analysis: top operator rankings, per-season
/// punctuality, and the pandemic-period comparison.
fn run_extended_analysis(rows: &[MonthlyMetrics]) -> Result<()> {
    let rankings = operator_rankings(rows);
    for entry in rankings.iter().take(3) {
        info!(
            rank = entry.rank,
            operator = %entry.operator,
            score = entry.performance_score,
            punctuality = entry.avg_punctuality,
            reliability = entry.avg_reliability,
            "Operator ranking"
        );
    }
    print_json(&rankings)?;

    for (season, punctuality) in season_means(rows) {
        info!(season = %season, punctuality, "Seasonal punctuality");
    }
    for slice in seasonal_analysis(rows) {
        debug!(
            season = %slice.season,
            operator = %slice.operator,
            punctuality = slice.punctuality,
            delay = slice.delay,
            "Seasonal operator profile"
        );
    }

    let covid = covid_summary(rows);
    info!(
        pre = ?covid.pre_covid_punctuality,
        during = ?covid.covid_period_punctuality,
        post = ?covid.post_covid_punctuality,
        impact_pct = ?covid.covid_impact_pct,
        recovery_pct = ?covid.recovery_rate_pct,
        improved = covid.service_improved,
        "Pandemic impact summary"
    );

    Ok(())
}
