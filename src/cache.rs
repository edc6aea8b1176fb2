//! Fingerprint-keyed cache for the processed table.
//!
//! A dashboard session reads the processed CSV many times between pipeline
//! runs. [`ProcessedCache`] keeps the last parse in memory and re-reads only
//! when the file's fingerprint (length + modification time) changes. There
//! is no eviction; a new pipeline run is the only invalidation event.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use crate::analyzers::types::MonthlyMetrics;
use crate::error::PipelineError;
use crate::output::read_processed;

/// Identity of a file's contents as far as the cache is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    len: u64,
    modified: SystemTime,
}

impl Fingerprint {
    pub fn of(path: &Path) -> Result<Self, PipelineError> {
        let meta = fs::metadata(path)?;
        Ok(Self {
            len: meta.len(),
            modified: meta.modified()?,
        })
    }
}

/// An explicitly-scoped cache of one processed table. Owned by whoever
/// needs repeated reads; no global state.
pub struct ProcessedCache {
    path: PathBuf,
    fingerprint: Option<Fingerprint>,
    rows: Vec<MonthlyMetrics>,
}

impl ProcessedCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fingerprint: None,
            rows: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the cached rows, re-reading the file first if its
    /// fingerprint no longer matches.
    pub fn load(&mut self) -> Result<&[MonthlyMetrics], PipelineError> {
        let current = Fingerprint::of(&self.path)?;
        if self.fingerprint != Some(current) {
            self.rows = read_processed(&self.path)?;
            self.fingerprint = Some(current);
            debug!(
                path = %self.path.display(),
                rows = self.rows.len(),
                "Processed table (re)loaded"
            );
        }
        Ok(&self.rows)
    }
}
