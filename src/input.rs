//! Raw CSV loading against an explicit schema.
//!
//! The header is checked for every required column before any row is read.
//! Each parsed row then passes domain validation; the first violation
//! aborts the load.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::analyzers::types::RawRecord;
use crate::error::PipelineError;

/// Columns the raw table must provide. `region` and `mode` are optional
/// descriptive extras.
pub const REQUIRED_COLUMNS: &[&str] = &[
    "operator",
    "month",
    "scheduled_trips",
    "on_time_trips",
    "delay_minutes_avg",
];

/// Loads and validates raw records from a CSV file.
pub fn load_records(path: &Path) -> Result<Vec<RawRecord>, PipelineError> {
    debug!(path = %path.display(), "Loading raw punctuality data");
    let file = File::open(path)?;
    read_records(file)
}

/// Reads and validates raw records from any CSV source.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<RawRecord>, PipelineError> {
    let mut rdr = csv::Reader::from_reader(reader);

    let headers = rdr.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == *column) {
            return Err(PipelineError::Schema {
                detail: format!("missing required column {column:?}"),
            });
        }
    }

    let mut records = Vec::new();
    for (index, result) in rdr.deserialize().enumerate() {
        let row = index + 1; // 1-based data row, header not counted
        let record: RawRecord = result.map_err(|e| PipelineError::Schema {
            detail: format!("row {row}: {e}"),
        })?;
        validate_record(&record, row)?;
        records.push(record);
    }

    if records.is_empty() {
        return Err(PipelineError::Schema {
            detail: "input contains no data rows".to_string(),
        });
    }

    debug!(records = records.len(), "Raw data validated");
    Ok(records)
}

fn validate_record(record: &RawRecord, row: usize) -> Result<(), PipelineError> {
    if record.operator.trim().is_empty() {
        return Err(PipelineError::Range {
            row,
            column: "operator",
            detail: "operator name is empty".to_string(),
        });
    }

    if record.on_time_trips > record.scheduled_trips {
        return Err(PipelineError::Range {
            row,
            column: "on_time_trips",
            detail: format!(
                "on_time_trips {} exceeds scheduled_trips {}",
                record.on_time_trips, record.scheduled_trips
            ),
        });
    }

    if !record.delay_minutes_avg.is_finite() || record.delay_minutes_avg < 0.0 {
        return Err(PipelineError::Range {
            row,
            column: "delay_minutes_avg",
            detail: format!("delay {} is not a non-negative number", record.delay_minutes_avg),
        });
    }

    Ok(())
}
