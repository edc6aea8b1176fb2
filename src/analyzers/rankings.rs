//! Extended analysis over the processed monthly table: operator rankings,
//! seasonal patterns, and a pandemic-period comparison.

use std::collections::BTreeMap;

use crate::analyzers::aggregate::{COVID_WINDOW_START, composite_score, in_covid_window};
use crate::analyzers::types::{CovidSummary, Month, MonthlyMetrics, OperatorRanking, Season, SeasonalSlice};
use crate::analyzers::utility::{mean, round1, stddev};

/// First month counted as post-pandemic in [`covid_summary`].
pub const POST_COVID_START: (i32, u32) = (2021, 1);

/// Threshold for the `service_improved` flag: post-pandemic punctuality must
/// beat the pre-pandemic mean by at least this factor.
pub const IMPROVEMENT_FACTOR: f64 = 1.02;

/// Ranks operators by composite performance across all their months,
/// best first. Equal scores share a dense rank.
pub fn operator_rankings(rows: &[MonthlyMetrics]) -> Vec<OperatorRanking> {
    let mut by_operator: BTreeMap<&str, Vec<&MonthlyMetrics>> = BTreeMap::new();
    for row in rows {
        by_operator.entry(row.operator.as_str()).or_default().push(row);
    }

    let mut rankings: Vec<OperatorRanking> = by_operator
        .into_iter()
        .map(|(operator, months)| {
            let punctualities: Vec<f64> =
                months.iter().map(|m| m.punctuality_rate_mean).collect();
            let impacts: Vec<f64> = months.iter().map(|m| m.passenger_impact_score).collect();
            let reliabilities: Vec<f64> = months.iter().map(|m| m.service_reliability).collect();
            let consistencies: Vec<f64> = months.iter().map(|m| m.delay_consistency).collect();

            let avg_punctuality = round1(mean(&punctualities));
            let avg_impact = round1(mean(&impacts));
            let avg_consistency = round1(mean(&consistencies));

            OperatorRanking {
                operator: operator.to_string(),
                avg_punctuality,
                punctuality_std: round1(stddev(&punctualities, mean(&punctualities))),
                worst_punctuality: round1(
                    punctualities.iter().copied().fold(f64::INFINITY, f64::min),
                ),
                best_punctuality: round1(
                    punctualities.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                ),
                avg_impact,
                total_trips: months.iter().map(|m| m.scheduled_trips_total).sum(),
                avg_reliability: round1(mean(&reliabilities)),
                avg_consistency,
                performance_score: round1(composite_score(
                    avg_punctuality,
                    avg_impact,
                    avg_consistency,
                )),
                rank: 0,
            }
        })
        .collect();

    rankings.sort_by(|a, b| {
        b.performance_score
            .partial_cmp(&a.performance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.operator.cmp(&b.operator))
    });

    let mut rank = 0;
    let mut last_score = f64::NAN;
    for entry in rankings.iter_mut() {
        if entry.performance_score != last_score {
            rank += 1;
            last_score = entry.performance_score;
        }
        entry.rank = rank;
    }

    rankings
}

/// Per-(season, operator) punctuality profile, in season order
/// Winter, Spring, Summer, Autumn.
pub fn seasonal_analysis(rows: &[MonthlyMetrics]) -> Vec<SeasonalSlice> {
    let mut by_key: BTreeMap<(Season, &str), Vec<&MonthlyMetrics>> = BTreeMap::new();
    for row in rows {
        by_key
            .entry((row.season, row.operator.as_str()))
            .or_default()
            .push(row);
    }

    by_key
        .into_iter()
        .map(|((season, operator), months)| {
            let punctualities: Vec<f64> =
                months.iter().map(|m| m.punctuality_rate_mean).collect();
            SeasonalSlice {
                season,
                operator: operator.to_string(),
                punctuality: round1(mean(&punctualities)),
                punctuality_std: round1(stddev(&punctualities, mean(&punctualities))),
                impact: round1(mean(
                    &months
                        .iter()
                        .map(|m| m.passenger_impact_score)
                        .collect::<Vec<_>>(),
                )),
                delay: round1(mean(
                    &months.iter().map(|m| m.avg_delay_mean).collect::<Vec<_>>(),
                )),
            }
        })
        .collect()
}

/// Mean punctuality per season across all operators, best season first.
pub fn season_means(rows: &[MonthlyMetrics]) -> Vec<(Season, f64)> {
    let mut by_season: BTreeMap<Season, Vec<f64>> = BTreeMap::new();
    for row in rows {
        by_season
            .entry(row.season)
            .or_default()
            .push(row.punctuality_rate_mean);
    }

    let mut means: Vec<(Season, f64)> = by_season
        .into_iter()
        .map(|(season, series)| (season, round1(mean(&series))))
        .collect();
    means.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    means
}

/// Compares mean punctuality before, during, and after the pandemic window.
pub fn covid_summary(rows: &[MonthlyMetrics]) -> CovidSummary {
    let mut pre = Vec::new();
    let mut during = Vec::new();
    let mut post = Vec::new();

    for row in rows {
        if in_covid_window(row.month) {
            during.push(row.punctuality_rate_mean);
        } else if month_key(row.month) < COVID_WINDOW_START {
            pre.push(row.punctuality_rate_mean);
        } else if month_key(row.month) >= POST_COVID_START {
            post.push(row.punctuality_rate_mean);
        }
    }

    let pre_covid_punctuality = period_mean(&pre);
    let covid_period_punctuality = period_mean(&during);
    let post_covid_punctuality = period_mean(&post);

    let covid_impact_pct = match (pre_covid_punctuality, covid_period_punctuality) {
        (Some(pre), Some(during)) if pre > 0.0 => Some(round1((during - pre) / pre * 100.0)),
        _ => None,
    };
    let recovery_rate_pct = match (covid_period_punctuality, post_covid_punctuality) {
        (Some(during), Some(post)) if during > 0.0 => {
            Some(round1((post - during) / during * 100.0))
        }
        _ => None,
    };
    let service_improved = match (pre_covid_punctuality, post_covid_punctuality) {
        (Some(pre), Some(post)) => post > pre * IMPROVEMENT_FACTOR,
        _ => false,
    };

    CovidSummary {
        pre_covid_punctuality,
        covid_period_punctuality,
        post_covid_punctuality,
        covid_impact_pct,
        recovery_rate_pct,
        service_improved,
    }
}

fn month_key(month: Month) -> (i32, u32) {
    (month.year(), month.number())
}

fn period_mean(series: &[f64]) -> Option<f64> {
    if series.is_empty() {
        None
    } else {
        Some(round1(mean(series)))
    }
}
