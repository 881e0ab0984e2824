// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod performance;
pub mod source_event;
pub mod stats;

pub use performance::{
    PerformanceEdit, PersonalBestKey, PoolLength, Source, SourceMetadata, Stroke,
    TimedPerformance,
};
pub use source_event::{CompetitionRecord, HeatLaneResult, SourceEvent, TrainingSession};
pub use stats::{
    AthleteStatistics, BestTime, Consistency, ConsistencyRating, FlaggedPersonalBest, LastTime,
    StrokeStatistics, YearImprovement,
};
