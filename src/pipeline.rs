//! End-to-end pipeline orchestration: load, aggregate, persist, report.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::analyzers::aggregate::aggregate;
use crate::analyzers::types::{Month, MonthlyMetrics};
use crate::analyzers::utility::{mean, round1};
use crate::error::PipelineError;
use crate::{input, output};

/// Headline figures of a processed table, for logging and the summary
/// command.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub monthly_rows: usize,
    pub operators: usize,
    pub first_month: Month,
    pub last_month: Month,
    pub total_scheduled_trips: u64,
    pub mean_punctuality: f64,
    pub best_operator: String,
    pub best_month: Month,
    pub best_punctuality: f64,
    pub worst_month: Month,
    pub worst_punctuality: f64,
}

impl PipelineReport {
    /// Builds the report from a processed table. Returns `None` for an
    /// empty table.
    pub fn from_rows(rows: &[MonthlyMetrics]) -> Option<Self> {
        let first = rows.first()?;

        let mut best = first;
        let mut worst = first;
        for row in rows {
            if row.punctuality_rate_mean > best.punctuality_rate_mean {
                best = row;
            }
            if row.punctuality_rate_mean < worst.punctuality_rate_mean {
                worst = row;
            }
        }

        let operators: BTreeSet<&str> = rows.iter().map(|r| r.operator.as_str()).collect();
        let months: Vec<Month> = rows.iter().map(|r| r.month).collect();
        let rates: Vec<f64> = rows.iter().map(|r| r.punctuality_rate_mean).collect();

        Some(Self {
            monthly_rows: rows.len(),
            operators: operators.len(),
            first_month: months.iter().copied().min()?,
            last_month: months.iter().copied().max()?,
            total_scheduled_trips: rows.iter().map(|r| r.scheduled_trips_total).sum(),
            mean_punctuality: round1(mean(&rates)),
            best_operator: best.operator.clone(),
            best_month: best.month,
            best_punctuality: best.punctuality_rate_mean,
            worst_month: worst.month,
            worst_punctuality: worst.punctuality_rate_mean,
        })
    }
}

/// A completed pipeline run: the processed rows and their headline report.
pub struct PipelineOutcome {
    pub rows: Vec<MonthlyMetrics>,
    pub report: PipelineReport,
}

/// Runs the full pipeline: load and validate `input`, aggregate per
/// (operator, month), and atomically write the processed table to `output`.
///
/// Fails without touching `output` if any input row is malformed or out of
/// range.
pub fn run(input_path: &Path, output_path: &Path) -> Result<PipelineOutcome, PipelineError> {
    info!(input = %input_path.display(), "Processing punctuality data");

    let records = input::load_records(input_path)?;

    let operators: BTreeSet<&str> = records.iter().map(|r| r.operator.as_str()).collect();
    let regions: BTreeSet<&str> = records
        .iter()
        .filter_map(|r| r.region.as_deref())
        .collect();
    let modes: BTreeSet<&str> = records.iter().filter_map(|r| r.mode.as_deref()).collect();
    info!(
        records = records.len(),
        operators = operators.len(),
        regions = regions.len(),
        modes = modes.len(),
        "Raw data loaded"
    );

    let rows = aggregate(&records);
    output::write_processed(output_path, &rows)?;

    let report = match PipelineReport::from_rows(&rows) {
        Some(report) => report,
        None => {
            return Err(PipelineError::Schema {
                detail: "aggregation produced no rows".to_string(),
            });
        }
    };

    info!(
        output = %output_path.display(),
        rows = report.monthly_rows,
        operators = report.operators,
        first_month = %report.first_month,
        last_month = %report.last_month,
        total_trips = report.total_scheduled_trips,
        mean_punctuality = report.mean_punctuality,
        best_operator = %report.best_operator,
        best_month = %report.best_month,
        worst_month = %report.worst_month,
        "Processed punctuality table written"
    );

    Ok(PipelineOutcome { rows, report })
}
