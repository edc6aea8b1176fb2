//! Output formatting and persistence for the processed table.
//!
//! Persistence is all-or-nothing: rows are serialized into a temporary
//! sibling file which is renamed onto the target only after a successful
//! flush, so a failed run never leaves a partial table behind.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use crate::analyzers::types::MonthlyMetrics;
use crate::error::PipelineError;

/// Logs a serializable value using Rust's debug pretty-print format.
pub fn print_pretty(value: &impl std::fmt::Debug) {
    debug!("{:#?}", value);
}

/// Logs a serializable value as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> Result<(), PipelineError> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes the processed table to `path`, replacing any previous version.
///
/// The output carries no timestamps, so rerunning over identical input
/// produces a byte-identical file.
pub fn write_processed(path: &Path, rows: &[MonthlyMetrics]) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp = path.with_extension("csv.tmp");
    debug!(path = %path.display(), rows = rows.len(), "Writing processed table");

    if let Err(e) = write_rows(&tmp, rows) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, path)?;

    Ok(())
}

fn write_rows(path: &Path, rows: &[MonthlyMetrics]) -> Result<(), PipelineError> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads a processed table back, e.g. for the summary command or a
/// dashboard session.
pub fn read_processed(path: &Path) -> Result<Vec<MonthlyMetrics>, PipelineError> {
    let file = fs::File::open(path)?;
    let mut rdr = csv::Reader::from_reader(file);

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: MonthlyMetrics = result?;
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::types::{Grade, ImpactLevel, Month, Season};
    use std::env;

    fn temp_path(name: &str) -> std::path::PathBuf {
        env::temp_dir().join(name)
    }

    fn sample_row() -> MonthlyMetrics {
        MonthlyMetrics {
            operator: "Ruter".to_string(),
            month: Month::new(2024, 1).unwrap(),
            season: Season::Winter,
            scheduled_trips_total: 1000,
            on_time_trips_total: 800,
            punctuality_rate_mean: 80.0,
            avg_delay_mean: 3.2,
            avg_delay_max: 3.2,
            passenger_impact_score: 0.6,
            impact_level: ImpactLevel::Low,
            service_reliability: 80.0,
            delay_consistency: 100.0,
            punctuality_improvement: 0.0,
            performance_score: 88.4,
            service_grade: Grade::Good,
            covid_impact_pct: None,
        }
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&sample_row());
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&sample_row()).unwrap();
    }

    #[test]
    fn test_write_creates_file_with_single_header() {
        let path = temp_path("punctuality_test_write.csv");
        let _ = fs::remove_file(&path);

        write_processed(&path, &[sample_row(), sample_row()]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header_count = content.lines().filter(|l| l.contains("operator")).count();
        assert_eq!(header_count, 1);
        assert_eq!(content.lines().count(), 3);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_overwrites_prior_version() {
        let path = temp_path("punctuality_test_overwrite.csv");
        let _ = fs::remove_file(&path);

        write_processed(&path, &[sample_row(), sample_row()]).unwrap();
        write_processed(&path, &[sample_row()]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2); // header + one row

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_leaves_no_temp_file() {
        let path = temp_path("punctuality_test_tmp.csv");
        let _ = fs::remove_file(&path);

        write_processed(&path, &[sample_row()]).unwrap();
        assert!(!path.with_extension("csv.tmp").exists());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_round_trip_preserves_values() {
        let path = temp_path("punctuality_test_roundtrip.csv");
        let _ = fs::remove_file(&path);

        let mut row = sample_row();
        row.covid_impact_pct = Some(-12.5);
        write_processed(&path, std::slice::from_ref(&row)).unwrap();

        let rows = read_processed(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].operator, row.operator);
        assert_eq!(rows[0].month, row.month);
        assert_eq!(rows[0].punctuality_rate_mean, row.punctuality_rate_mean);
        assert_eq!(rows[0].service_grade, row.service_grade);
        assert_eq!(rows[0].covid_impact_pct, Some(-12.5));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_none_covid_field_reads_back_as_none() {
        let path = temp_path("punctuality_test_none.csv");
        let _ = fs::remove_file(&path);

        write_processed(&path, &[sample_row()]).unwrap();
        let rows = read_processed(&path).unwrap();
        assert_eq!(rows[0].covid_impact_pct, None);

        fs::remove_file(&path).unwrap();
    }
}
