// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-stroke statistics derived on read.
//!
//! Nothing here is persisted or cached; every call scans the store for the
//! athlete and filter and rebuilds the view. Missing data yields `None`
//! fields, never an error.

use crate::db::{PerformanceQuery, PerformanceStore};
use crate::error::Result;
use crate::models::{
    AthleteStatistics, BestTime, Consistency, ConsistencyRating, FlaggedPersonalBest, LastTime,
    PoolLength, Source, Stroke, StrokeStatistics, TimedPerformance, YearImprovement,
};
use crate::services::personal_best::compare_for_best;
use chrono::{DateTime, Datelike, Utc};
use futures_util::{stream, StreamExt};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Number of most recent swims in the rolling average and consistency window.
pub const RECENT_WINDOW: usize = 5;

const MAX_CONCURRENT_QUERIES: usize = 8;

/// Optional narrowing of an aggregation.
///
/// With no `source`, all three sources are merged and the displayed best
/// time is the fastest across them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StatsFilter {
    #[serde(default)]
    pub distance_meters: Option<u32>,
    #[serde(default)]
    pub pool_length: Option<PoolLength>,
    #[serde(default)]
    pub source: Option<Source>,
}

impl StatsFilter {
    pub fn query_for(&self, athlete_id: u64) -> PerformanceQuery {
        PerformanceQuery {
            distance_meters: self.distance_meters,
            pool_length: self.pool_length,
            sources: self.source.into_iter().collect(),
            ..PerformanceQuery::for_athlete(athlete_id)
        }
    }
}

/// Computes derived statistics from the store.
#[derive(Clone)]
pub struct StatisticsAggregator {
    store: Arc<dyn PerformanceStore>,
}

impl StatisticsAggregator {
    pub fn new(store: Arc<dyn PerformanceStore>) -> Self {
        Self { store }
    }

    /// Statistics for one athlete. An athlete with no rows gets an empty list.
    pub async fn athlete_statistics(
        &self,
        athlete_id: u64,
        filter: &StatsFilter,
        now: DateTime<Utc>,
    ) -> Result<AthleteStatistics> {
        let rows = self.store.find_matching(&filter.query_for(athlete_id)).await?;

        tracing::debug!(
            athlete_id,
            rows = rows.len(),
            filter = ?filter,
            "Aggregating statistics"
        );

        Ok(AthleteStatistics {
            athlete_id,
            strokes: aggregate(&rows, now),
        })
    }

    /// Statistics for several athletes, in request order (duplicates dropped).
    pub async fn best_times(
        &self,
        athlete_ids: &[u64],
        filter: &StatsFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<AthleteStatistics>> {
        let mut unique = Vec::with_capacity(athlete_ids.len());
        for id in athlete_ids {
            if !unique.contains(id) {
                unique.push(*id);
            }
        }

        stream::iter(unique)
            .map(|athlete_id| self.athlete_statistics(athlete_id, filter, now))
            .buffered(MAX_CONCURRENT_QUERIES)
            .collect::<Vec<Result<AthleteStatistics>>>()
            .await
            .into_iter()
            .collect()
    }
}

/// Group rows by (stroke, distance) and compute each group's statistics.
///
/// Output is ordered by stroke, then distance.
pub fn aggregate(rows: &[TimedPerformance], now: DateTime<Utc>) -> Vec<StrokeStatistics> {
    let mut groups: BTreeMap<(Stroke, u32), Vec<&TimedPerformance>> = BTreeMap::new();
    for row in rows {
        groups
            .entry((row.stroke, row.distance_meters))
            .or_default()
            .push(row);
    }

    groups
        .into_iter()
        .map(|((stroke, distance_meters), group)| {
            stroke_statistics(stroke, distance_meters, group, now)
        })
        .collect()
}

/// Statistics for one (stroke, distance) group.
pub fn stroke_statistics(
    stroke: Stroke,
    distance_meters: u32,
    mut rows: Vec<&TimedPerformance>,
    now: DateTime<Utc>,
) -> StrokeStatistics {
    // Chronological; id breaks ties so "most recent" is deterministic.
    rows.sort_by(|a, b| a.occurred_at.cmp(&b.occurred_at).then_with(|| a.id.cmp(&b.id)));

    let best = rows.iter().copied().min_by(|a, b| compare_for_best(a, b));
    let last = rows.last().copied();

    let this_year: Vec<&TimedPerformance> = rows
        .iter()
        .copied()
        .filter(|row| row.occurred_at.year() == now.year())
        .collect();
    let season_best = this_year.iter().copied().min_by(|a, b| compare_for_best(a, b));

    let recent: Vec<f64> = rows
        .iter()
        .rev()
        .take(RECENT_WINDOW)
        .map(|row| row.elapsed_seconds)
        .collect();

    let delta_vs_best = match (last, best) {
        (Some(l), Some(b)) => Some(l.elapsed_seconds - b.elapsed_seconds),
        _ => None,
    };
    let delta_vs_season_best = match (last, season_best) {
        (Some(l), Some(sb)) => Some(l.elapsed_seconds - sb.elapsed_seconds),
        _ => None,
    };

    let consistency = if recent.len() >= 2 {
        population_std_dev(&recent).map(|std_dev| Consistency {
            std_dev,
            rating: ConsistencyRating::from_std_dev(std_dev),
        })
    } else {
        None
    };

    let mut personal_bests: Vec<FlaggedPersonalBest> = rows
        .iter()
        .filter(|row| row.is_personal_best)
        .filter_map(|row| {
            row.pool_length.map(|pool_length| FlaggedPersonalBest {
                performance_id: row.id,
                pool_length,
                seconds: row.elapsed_seconds,
                source: row.source,
                occurred_at: row.occurred_at,
            })
        })
        .collect();
    personal_bests.sort_by_key(|pb| pb.pool_length);

    StrokeStatistics {
        stroke,
        distance_meters,
        sample_count: rows.len(),
        best_time: best.map(BestTime::from_performance),
        last_time: last.map(|row| LastTime {
            performance_id: row.id,
            seconds: row.elapsed_seconds,
            source: row.source,
            occurred_at: row.occurred_at,
        }),
        season_best: season_best.map(BestTime::from_performance),
        delta_vs_best,
        delta_vs_season_best,
        rolling_average: mean(&recent),
        consistency,
        year_improvement: year_improvement(&this_year),
        personal_bests,
    }
}

/// Improvement between the first and last swim of the year.
///
/// `rows` must be in chronological order and all in the same year.
pub fn year_improvement(rows: &[&TimedPerformance]) -> Option<YearImprovement> {
    if rows.len() < 2 {
        return None;
    }
    let first = rows.first()?;
    let last = rows.last()?;

    let seconds = first.elapsed_seconds - last.elapsed_seconds;
    let percent = if first.elapsed_seconds > 0.0 {
        seconds / first.elapsed_seconds * 100.0
    } else {
        0.0
    };
    let months_spanned = months_between(first.occurred_at, last.occurred_at);
    let monthly_rate = (months_spanned > 0).then(|| seconds / f64::from(months_spanned));

    Some(YearImprovement {
        seconds,
        percent,
        samples: rows.len(),
        months_spanned,
        monthly_rate,
    })
}

/// Whole calendar months from `start` to `end` (0 when `end` is earlier).
pub fn months_between(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    let start_index = start.year() * 12 + start.month0() as i32;
    let end_index = end.year() * 12 + end.month0() as i32;
    u32::try_from(end_index - start_index).unwrap_or(0)
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Population standard deviation, `None` for an empty slice.
pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    let avg = mean(values)?;
    let variance =
        values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceMetadata;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap()
    }

    fn row(seconds: f64, y: i32, m: u32, d: u32) -> TimedPerformance {
        TimedPerformance {
            id: Uuid::new_v4(),
            athlete_id: 1,
            stroke: Stroke::Freestyle,
            distance_meters: 50,
            pool_length: Some(PoolLength::Short25m),
            elapsed_seconds: seconds,
            occurred_at: Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap(),
            source: Source::Training,
            is_personal_best: false,
            source_metadata: SourceMetadata::Training {
                lap_splits: vec![],
                lap_count: 0,
            },
        }
    }

    #[test]
    fn test_std_dev_window() {
        let std_dev = population_std_dev(&[31.0, 31.2, 30.9, 31.1, 31.0]).unwrap();
        assert!((std_dev - 0.1019803902718557).abs() < 1e-9);
        assert_eq!(
            ConsistencyRating::from_std_dev(std_dev),
            ConsistencyRating::Excellent
        );
    }

    #[test]
    fn test_mean_and_std_dev_empty() {
        assert!(mean(&[]).is_none());
        assert!(population_std_dev(&[]).is_none());
    }

    #[test]
    fn test_months_between() {
        let jan = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        let feb = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let nov = Utc.with_ymd_and_hms(2024, 11, 15, 0, 0, 0).unwrap();
        assert_eq!(months_between(jan, feb), 1);
        assert_eq!(months_between(jan, nov), 10);
        assert_eq!(months_between(feb, jan), 0);
        assert_eq!(months_between(jan, jan), 0);
    }

    #[test]
    fn test_single_sample_statistics() {
        let only = row(30.0, 2024, 3, 1);
        let stats = stroke_statistics(Stroke::Freestyle, 50, vec![&only], now());

        assert_eq!(stats.sample_count, 1);
        assert_eq!(stats.best_time.as_ref().unwrap().seconds, 30.0);
        assert_eq!(stats.delta_vs_best, Some(0.0));
        assert_eq!(stats.rolling_average, Some(30.0));
        assert!(stats.consistency.is_none());
        assert!(stats.year_improvement.is_none());
    }

    #[test]
    fn test_rolling_window_uses_most_recent_five() {
        let rows = vec![
            row(40.0, 2024, 1, 1),
            row(30.0, 2024, 2, 1),
            row(30.0, 2024, 3, 1),
            row(30.0, 2024, 4, 1),
            row(30.0, 2024, 5, 1),
            row(30.0, 2024, 6, 1),
        ];
        let stats = stroke_statistics(Stroke::Freestyle, 50, rows.iter().collect(), now());

        assert_eq!(stats.rolling_average, Some(30.0));
        assert_eq!(stats.consistency.unwrap().std_dev, 0.0);
    }

    #[test]
    fn test_year_improvement_same_month() {
        let a = row(31.0, 2024, 5, 1);
        let b = row(30.0, 2024, 5, 20);
        let improvement = year_improvement(&[&a, &b]).unwrap();

        assert!((improvement.seconds - 1.0).abs() < 1e-9);
        assert_eq!(improvement.months_spanned, 0);
        assert!(improvement.monthly_rate.is_none());
    }

    #[test]
    fn test_season_best_ignores_previous_years() {
        let old = row(29.0, 2023, 6, 1);
        let current = row(30.5, 2024, 6, 1);
        let stats = stroke_statistics(Stroke::Freestyle, 50, vec![&old, &current], now());

        assert_eq!(stats.best_time.unwrap().seconds, 29.0);
        assert_eq!(stats.season_best.unwrap().seconds, 30.5);
        assert!((stats.delta_vs_best.unwrap() - 1.5).abs() < 1e-9);
        assert_eq!(stats.delta_vs_season_best, Some(0.0));
        // Only one swim this year
        assert!(stats.year_improvement.is_none());
    }

    #[test]
    fn test_aggregate_groups_by_stroke_and_distance() {
        let mut back = row(35.0, 2024, 1, 1);
        back.stroke = Stroke::Backstroke;
        let mut hundred = row(65.0, 2024, 1, 1);
        hundred.distance_meters = 100;
        let fifty = row(30.0, 2024, 1, 1);

        let stats = aggregate(&[hundred, back, fifty], now());
        let keys: Vec<(Stroke, u32)> = stats.iter().map(|s| (s.stroke, s.distance_meters)).collect();
        assert_eq!(
            keys,
            vec![
                (Stroke::Freestyle, 50),
                (Stroke::Freestyle, 100),
                (Stroke::Backstroke, 50)
            ]
        );
    }

    #[test]
    fn test_filter_query() {
        let filter = StatsFilter {
            distance_meters: Some(100),
            pool_length: Some(PoolLength::Long50m),
            source: Some(Source::Competition),
        };
        let query = filter.query_for(5);
        assert_eq!(query.athlete_id, 5);
        assert_eq!(query.distance_meters, Some(100));
        assert_eq!(query.sources, vec![Source::Competition]);
        assert!(query.stroke.is_none());

        assert!(StatsFilter::default().query_for(5).sources.is_empty());
    }
}
