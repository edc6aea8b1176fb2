//! Metric derivation and analysis over monthly punctuality records.
//!
//! This module groups validated raw records by (operator, month), derives
//! punctuality, impact, reliability, and composite performance metrics,
//! and provides the extended operator/seasonal/pandemic analysis.

pub mod aggregate;
pub mod grade;
pub mod rankings;
pub mod types;
pub mod utility;
