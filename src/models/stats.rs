// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Aggregated per-stroke statistics returned to the UI.
//!
//! These are derived on every read and never stored. Any statistic that
//! cannot be computed from the available history is `None`.

use crate::models::{PoolLength, Source, Stroke, TimedPerformance};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;

/// Fastest displayed time across every source in scope.
///
/// This is the source-agnostic "best time". It is not the personal-best
/// flag, which only covers competition and training rows per pool length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BestTime {
    pub performance_id: Uuid,
    pub seconds: f64,
    pub source: Source,
    pub occurred_at: DateTime<Utc>,
    pub pool_length: Option<PoolLength>,
    /// Only set for competition results
    pub competition_name: Option<String>,
}

impl BestTime {
    pub fn from_performance(performance: &TimedPerformance) -> Self {
        Self {
            performance_id: performance.id,
            seconds: performance.elapsed_seconds,
            source: performance.source,
            occurred_at: performance.occurred_at,
            pool_length: performance.pool_length,
            competition_name: performance
                .source_metadata
                .competition_name()
                .map(str::to_string),
        }
    }
}

/// Most recent swim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LastTime {
    pub performance_id: Uuid,
    pub seconds: f64,
    pub source: Source,
    pub occurred_at: DateTime<Utc>,
}

/// A row currently carrying the personal-best flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FlaggedPersonalBest {
    pub performance_id: Uuid,
    pub pool_length: PoolLength,
    pub seconds: f64,
    pub source: Source,
    pub occurred_at: DateTime<Utc>,
}

/// Consistency classification of the recent window's spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsistencyRating {
    Excellent,
    Good,
    Fair,
    Inconsistent,
}

impl ConsistencyRating {
    /// Classify a standard deviation in seconds.
    pub fn from_std_dev(std_dev: f64) -> Self {
        if std_dev < 0.5 {
            ConsistencyRating::Excellent
        } else if std_dev < 1.0 {
            ConsistencyRating::Good
        } else if std_dev < 2.0 {
            ConsistencyRating::Fair
        } else {
            ConsistencyRating::Inconsistent
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Consistency {
    /// Population standard deviation of the recent window, seconds
    pub std_dev: f64,
    pub rating: ConsistencyRating,
}

/// Improvement within the current calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct YearImprovement {
    /// First swim of the year minus last swim of the year (positive = faster)
    pub seconds: f64,
    /// `seconds` as a percentage of the first swim of the year
    pub percent: f64,
    pub samples: usize,
    /// Whole calendar months between first and last swim of the year
    pub months_spanned: u32,
    /// `seconds / months_spanned`, `None` when both swims share a month
    pub monthly_rate: Option<f64>,
}

/// Derived statistics for one stroke at one distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StrokeStatistics {
    pub stroke: Stroke,
    pub distance_meters: u32,
    pub sample_count: usize,
    pub best_time: Option<BestTime>,
    pub last_time: Option<LastTime>,
    pub season_best: Option<BestTime>,
    /// `last - best`
    pub delta_vs_best: Option<f64>,
    /// `last - season best`
    pub delta_vs_season_best: Option<f64>,
    /// Mean of the most recent swims (up to five)
    pub rolling_average: Option<f64>,
    pub consistency: Option<Consistency>,
    pub year_improvement: Option<YearImprovement>,
    /// Rows holding the personal-best flag, one per pool length at most
    pub personal_bests: Vec<FlaggedPersonalBest>,
}

/// All statistics for one athlete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AthleteStatistics {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub athlete_id: u64,
    pub strokes: Vec<StrokeStatistics>,
}
