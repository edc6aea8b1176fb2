//! Grouping and metric derivation for monthly punctuality records.
//!
//! Rows are partitioned by (operator, month), each group is reduced to a
//! [`MonthlyMetrics`] row, and two cross-group passes fill in the
//! month-over-month improvement and the pandemic-window deviation.

use std::collections::{BTreeMap, HashMap};

use crate::analyzers::grade::{grade, impact_level};
use crate::analyzers::types::{Month, MonthlyMetrics, RawRecord};
use crate::analyzers::utility::{clamp, mean, pct, round1};

/// Weights of the composite performance score. Punctuality dominates;
/// passenger impact and delay consistency split the remainder.
pub const W_PUNCTUALITY: f64 = 0.4;
pub const W_IMPACT: f64 = 0.3;
pub const W_CONSISTENCY: f64 = 0.3;

/// Maps the 0–5 passenger impact scale onto 0–100 before weighting.
pub const IMPACT_SCALE: f64 = 20.0;

/// Spread-to-consistency conversion factor: each minute of spread between
/// the worst and the mean delay costs ten consistency points.
pub const CONSISTENCY_SPREAD_FACTOR: f64 = 10.0;

/// Months of the national lockdown window, inclusive on both ends.
pub const COVID_WINDOW_START: (i32, u32) = (2020, 3);
pub const COVID_WINDOW_END: (i32, u32) = (2020, 6);

/// Returns `true` for months inside the lockdown window.
pub fn in_covid_window(month: Month) -> bool {
    let key = (month.year(), month.number());
    key >= COVID_WINDOW_START && key <= COVID_WINDOW_END
}

fn before_covid_window(month: Month) -> bool {
    (month.year(), month.number()) < COVID_WINDOW_START
}

/// Reduces validated raw records to one [`MonthlyMetrics`] row per distinct
/// (operator, month) pair, sorted by that key.
pub fn aggregate(records: &[RawRecord]) -> Vec<MonthlyMetrics> {
    let mut groups: BTreeMap<(&str, Month), Vec<&RawRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry((record.operator.as_str(), record.month))
            .or_default()
            .push(record);
    }

    let mut rows: Vec<MonthlyMetrics> = groups
        .iter()
        .map(|((operator, month), group)| derive_group(operator, *month, group))
        .collect();

    apply_improvement(&mut rows);
    apply_covid_deviation(&mut rows);

    rows
}

fn derive_group(operator: &str, month: Month, group: &[&RawRecord]) -> MonthlyMetrics {
    let rates: Vec<f64> = group
        .iter()
        .map(|r| pct(r.on_time_trips, r.scheduled_trips))
        .collect();
    let delays: Vec<f64> = group.iter().map(|r| r.delay_minutes_avg).collect();
    let impacts: Vec<f64> = group.iter().map(|r| row_impact(r)).collect();

    let scheduled_trips_total: u64 = group.iter().map(|r| r.scheduled_trips).sum();
    let on_time_trips_total: u64 = group.iter().map(|r| r.on_time_trips).sum();

    let punctuality_rate_mean = round1(mean(&rates));
    let avg_delay_mean = round1(mean(&delays));
    let avg_delay_max = round1(delays.iter().copied().fold(0.0, f64::max));
    let passenger_impact_score = round1(mean(&impacts));
    let service_reliability = round1(pct(on_time_trips_total, scheduled_trips_total));
    let delay_consistency = round1(clamp(
        100.0 - (avg_delay_max - avg_delay_mean) * CONSISTENCY_SPREAD_FACTOR,
        0.0,
        100.0,
    ));

    let performance_score = round1(composite_score(
        punctuality_rate_mean,
        passenger_impact_score,
        delay_consistency,
    ));

    MonthlyMetrics {
        operator: operator.to_string(),
        month,
        season: month.season(),
        scheduled_trips_total,
        on_time_trips_total,
        punctuality_rate_mean,
        avg_delay_mean,
        avg_delay_max,
        passenger_impact_score,
        impact_level: impact_level(passenger_impact_score),
        service_reliability,
        delay_consistency,
        punctuality_improvement: 0.0,
        performance_score,
        service_grade: grade(performance_score),
        covid_impact_pct: None,
    }
}

/// Weighted composite of punctuality, inverted passenger impact, and delay
/// consistency, clamped to [0, 100].
pub fn composite_score(punctuality: f64, impact: f64, consistency: f64) -> f64 {
    let score = W_PUNCTUALITY * punctuality
        + W_IMPACT * (100.0 - impact * IMPACT_SCALE)
        + W_CONSISTENCY * consistency;
    clamp(score, 0.0, 100.0)
}

/// Delay severity scaled by the share of trips that missed their slot.
/// A month with no scheduled trips contributes no impact.
fn row_impact(record: &RawRecord) -> f64 {
    if record.scheduled_trips == 0 {
        return 0.0;
    }
    let delayed_share = 1.0 - record.on_time_trips as f64 / record.scheduled_trips as f64;
    record.delay_minutes_avg * delayed_share
}

/// Month-over-month punctuality delta per operator. Rows arrive sorted by
/// (operator, month); the first month of each operator keeps 0.0.
fn apply_improvement(rows: &mut [MonthlyMetrics]) {
    let mut prev: Option<(String, f64)> = None;
    for row in rows.iter_mut() {
        if let Some((operator, rate)) = &prev {
            if *operator == row.operator {
                row.punctuality_improvement = round1(row.punctuality_rate_mean - rate);
            }
        }
        prev = Some((row.operator.clone(), row.punctuality_rate_mean));
    }
}

/// Percentage deviation of in-window months from the operator's pre-window
/// punctuality baseline. Rows outside the window, or whose operator has no
/// months before the window, keep `None`.
fn apply_covid_deviation(rows: &mut [MonthlyMetrics]) {
    let mut baseline_series: HashMap<&str, Vec<f64>> = HashMap::new();
    for row in rows.iter() {
        if before_covid_window(row.month) {
            baseline_series
                .entry(row.operator.as_str())
                .or_default()
                .push(row.punctuality_rate_mean);
        }
    }

    let baselines: HashMap<String, f64> = baseline_series
        .into_iter()
        .filter(|(_, series)| !series.is_empty())
        .map(|(operator, series)| (operator.to_string(), mean(&series)))
        .collect();

    for row in rows.iter_mut() {
        if !in_covid_window(row.month) {
            continue;
        }
        if let Some(baseline) = baselines.get(&row.operator) {
            if *baseline > 0.0 {
                let deviation = (row.punctuality_rate_mean - baseline) / baseline * 100.0;
                row.covid_impact_pct = Some(round1(deviation));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::types::Grade;

    fn record(operator: &str, month: (i32, u32), scheduled: u64, on_time: u64) -> RawRecord {
        RawRecord {
            operator: operator.to_string(),
            month: Month::new(month.0, month.1).unwrap(),
            scheduled_trips: scheduled,
            on_time_trips: on_time,
            delay_minutes_avg: 2.0,
            region: None,
            mode: None,
        }
    }

    #[test]
    fn test_groups_keyed_and_sorted_by_operator_then_month() {
        let records = vec![
            record("Vy", (2024, 2), 100, 90),
            record("Ruter", (2024, 2), 100, 80),
            record("Vy", (2024, 1), 100, 85),
            record("Ruter", (2024, 1), 100, 75),
        ];
        let rows = aggregate(&records);

        let keys: Vec<(String, String)> = rows
            .iter()
            .map(|r| (r.operator.clone(), r.month.to_string()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("Ruter".to_string(), "2024-01".to_string()),
                ("Ruter".to_string(), "2024-02".to_string()),
                ("Vy".to_string(), "2024-01".to_string()),
                ("Vy".to_string(), "2024-02".to_string()),
            ]
        );
    }

    #[test]
    fn test_punctuality_is_mean_of_row_rates() {
        // Two records in the same group: 80% and 90%
        let records = vec![
            record("Ruter", (2024, 1), 100, 80),
            record("Ruter", (2024, 1), 200, 180),
        ];
        let rows = aggregate(&records);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].punctuality_rate_mean, 85.0);
        // Reliability is volume-weighted: 260 of 300
        assert_eq!(rows[0].service_reliability, 86.7);
        assert_eq!(rows[0].scheduled_trips_total, 300);
        assert_eq!(rows[0].on_time_trips_total, 260);
    }

    #[test]
    fn test_improvement_series_with_sentinel_first_month() {
        let records = vec![
            record("Ruter", (2024, 1), 100, 80),
            record("Ruter", (2024, 2), 100, 85),
            record("Ruter", (2024, 3), 100, 82),
        ];
        let rows = aggregate(&records);
        let deltas: Vec<f64> = rows.iter().map(|r| r.punctuality_improvement).collect();
        assert_eq!(deltas, vec![0.0, 5.0, -3.0]);
    }

    #[test]
    fn test_improvement_resets_between_operators() {
        let records = vec![
            record("Ruter", (2024, 1), 100, 80),
            record("Ruter", (2024, 2), 100, 85),
            record("Vy", (2024, 1), 100, 95),
        ];
        let rows = aggregate(&records);
        assert_eq!(rows[2].operator, "Vy");
        assert_eq!(rows[2].punctuality_improvement, 0.0);
    }

    #[test]
    fn test_passenger_impact_from_delay_and_volume() {
        // 2.0 delay minutes, 20% of trips delayed => impact 0.4
        let records = vec![record("Ruter", (2024, 1), 100, 80)];
        let rows = aggregate(&records);
        assert_eq!(rows[0].passenger_impact_score, 0.4);
    }

    #[test]
    fn test_composite_score_weights_and_clamp() {
        assert_eq!(composite_score(100.0, 0.0, 100.0), 100.0);
        // 0.4 * 80 + 0.3 * (100 - 1.0 * 20) + 0.3 * 90 = 83.0
        let score = composite_score(80.0, 1.0, 90.0);
        assert!((score - 83.0).abs() < 1e-9);
        // A pathological impact cannot push the score below zero
        assert_eq!(composite_score(0.0, 10.0, 0.0), 0.0);
    }

    #[test]
    fn test_perfect_month_grades_excellent() {
        let records = vec![RawRecord {
            delay_minutes_avg: 0.0,
            ..record("Ruter", (2024, 1), 100, 100)
        }];
        let rows = aggregate(&records);
        assert_eq!(rows[0].performance_score, 100.0);
        assert_eq!(rows[0].service_grade, Grade::Excellent);
    }

    #[test]
    fn test_covid_window_membership() {
        assert!(!in_covid_window(Month::new(2020, 2).unwrap()));
        assert!(in_covid_window(Month::new(2020, 3).unwrap()));
        assert!(in_covid_window(Month::new(2020, 6).unwrap()));
        assert!(!in_covid_window(Month::new(2020, 7).unwrap()));
        assert!(!in_covid_window(Month::new(2019, 4).unwrap()));
        assert!(!in_covid_window(Month::new(2021, 4).unwrap()));
    }

    #[test]
    fn test_covid_deviation_against_pre_window_baseline() {
        let records = vec![
            record("Ruter", (2020, 1), 100, 80),
            record("Ruter", (2020, 2), 100, 80),
            record("Ruter", (2020, 4), 100, 60),
        ];
        let rows = aggregate(&records);
        // Baseline 80%, April at 60% => -25%
        assert_eq!(rows[0].covid_impact_pct, None);
        assert_eq!(rows[1].covid_impact_pct, None);
        assert_eq!(rows[2].covid_impact_pct, Some(-25.0));
    }

    #[test]
    fn test_covid_deviation_absent_without_baseline() {
        // Operator first appears inside the window: no baseline, no value
        let records = vec![record("Flytoget", (2020, 4), 100, 70)];
        let rows = aggregate(&records);
        assert_eq!(rows[0].covid_impact_pct, None);
    }

    #[test]
    fn test_zero_scheduled_trips_contribute_nothing() {
        let records = vec![RawRecord {
            delay_minutes_avg: 0.0,
            ..record("Ruter", (2024, 1), 0, 0)
        }];
        let rows = aggregate(&records);
        assert_eq!(rows[0].punctuality_rate_mean, 0.0);
        assert_eq!(rows[0].passenger_impact_score, 0.0);
        assert_eq!(rows[0].service_reliability, 0.0);
    }
}
