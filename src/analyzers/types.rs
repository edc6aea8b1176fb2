//! Data types used by the aggregation pipeline.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// A calendar month (year + month), the time grain of the whole pipeline.
///
/// Parses from `YYYY-MM` or a full `YYYY-MM-DD` date (the day is dropped).
/// Orders chronologically and displays as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month(NaiveDate);

impl Month {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self)
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    /// Month number, 1 through 12.
    pub fn number(self) -> u32 {
        self.0.month()
    }

    pub fn season(self) -> Season {
        match self.0.month() {
            12 | 1 | 2 => Season::Winter,
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            _ => Season::Autumn,
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m"))
    }
}

impl FromStr for Month {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .or_else(|| NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d").ok());
        match date.and_then(|d| d.with_day(1)) {
            Some(d) => Ok(Self(d)),
            None => Err(PipelineError::Schema {
                detail: format!("invalid month value {s:?}, expected YYYY-MM"),
            }),
        }
    }
}

impl Serialize for Month {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
        };
        f.write_str(name)
    }
}

/// Service grade derived from the composite performance score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    Excellent,
    Good,
    Acceptable,
    Poor,
}

/// Rider-experienced disruption band derived from the passenger impact score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImpactLevel {
    Low,
    Moderate,
    High,
    Critical,
}

/// A single row deserialized from the raw punctuality CSV.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
    pub operator: String,
    pub month: Month,
    pub scheduled_trips: u64,
    pub on_time_trips: u64,
    pub delay_minutes_avg: f64,

    // descriptive fields, not part of the aggregation key
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
}

/// One row of the processed table, keyed by (operator, month).
///
/// Field order here is the column order of the output CSV.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyMetrics {
    pub operator: String,
    pub month: Month,
    pub season: Season,
    pub scheduled_trips_total: u64,
    pub on_time_trips_total: u64,
    pub punctuality_rate_mean: f64,
    pub avg_delay_mean: f64,
    pub avg_delay_max: f64,
    pub passenger_impact_score: f64,
    pub impact_level: ImpactLevel,
    pub service_reliability: f64,
    pub delay_consistency: f64,
    pub punctuality_improvement: f64,
    pub performance_score: f64,
    pub service_grade: Grade,
    /// Percentage deviation from the operator's pre-pandemic baseline.
    /// `None` outside the lockdown window or when no baseline months exist.
    pub covid_impact_pct: Option<f64>,
}

/// Per-operator performance summary across all months.
#[derive(Debug, Clone, Serialize)]
pub struct OperatorRanking {
    pub operator: String,
    pub avg_punctuality: f64,
    pub punctuality_std: f64,
    pub worst_punctuality: f64,
    pub best_punctuality: f64,
    pub avg_impact: f64,
    pub total_trips: u64,
    pub avg_reliability: f64,
    pub avg_consistency: f64,
    pub performance_score: f64,
    /// Dense rank, 1 = best; equal scores share a rank.
    pub rank: usize,
}

/// Punctuality profile of one operator in one season.
#[derive(Debug, Clone, Serialize)]
pub struct SeasonalSlice {
    pub season: Season,
    pub operator: String,
    pub punctuality: f64,
    pub punctuality_std: f64,
    pub impact: f64,
    pub delay: f64,
}

/// Pre/during/post pandemic punctuality comparison.
///
/// Period means are `None` when the table has no rows in that period;
/// the derived percentages require both of their inputs.
#[derive(Debug, Clone, Serialize)]
pub struct CovidSummary {
    pub pre_covid_punctuality: Option<f64>,
    pub covid_period_punctuality: Option<f64>,
    pub post_covid_punctuality: Option<f64>,
    pub covid_impact_pct: Option<f64>,
    pub recovery_rate_pct: Option<f64>,
    pub service_improved: bool,
}
