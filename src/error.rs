//! Error types for the aggregation pipeline.
//!
//! Every failure surfaces immediately; the pipeline never clips, skips, or
//! silently repairs a bad row, and it writes no output on failure.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required column is missing or a value has the wrong type.
    #[error("schema error: {detail}")]
    Schema { detail: String },

    /// A value parsed fine but lies outside its valid domain.
    #[error("range error: row {row}, column {column}: {detail}")]
    Range {
        row: usize,
        column: &'static str,
        detail: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
