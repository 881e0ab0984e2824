// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod normalizer;
pub mod performance;
pub mod personal_best;
pub mod statistics;

pub use performance::PerformanceService;
pub use personal_best::PersonalBestMaintainer;
pub use statistics::{StatisticsAggregator, StatsFilter};
