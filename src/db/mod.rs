// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Performance store abstraction and its backends.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::Result;
use crate::models::{PersonalBestKey, PoolLength, Source, Stroke, TimedPerformance};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Collection names as constants.
pub mod collections {
    pub const PERFORMANCES: &str = "performances";
}

/// The single indexed query shape used by the maintainer and the aggregator.
///
/// Every filter except the athlete is optional. An empty `sources` list
/// means "all sources".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceQuery {
    pub athlete_id: u64,
    pub stroke: Option<Stroke>,
    pub distance_meters: Option<u32>,
    pub pool_length: Option<PoolLength>,
    pub sources: Vec<Source>,
}

impl PerformanceQuery {
    /// Everything recorded for one athlete.
    pub fn for_athlete(athlete_id: u64) -> Self {
        Self {
            athlete_id,
            stroke: None,
            distance_meters: None,
            pool_length: None,
            sources: Vec::new(),
        }
    }

    /// Rows in the scope of one personal-best key.
    pub fn for_key(key: &PersonalBestKey) -> Self {
        Self {
            athlete_id: key.athlete_id,
            stroke: Some(key.stroke),
            distance_meters: Some(key.distance_meters),
            pool_length: Some(key.pool_length),
            sources: Source::PERSONAL_BEST_SOURCES.to_vec(),
        }
    }

    /// Whether a row satisfies this query.
    ///
    /// A pool-length filter only matches rows with a known pool length, so
    /// internal meet rows never fall into a pool-scoped query.
    pub fn matches(&self, performance: &TimedPerformance) -> bool {
        performance.athlete_id == self.athlete_id
            && self.stroke.is_none_or(|s| performance.stroke == s)
            && self
                .distance_meters
                .is_none_or(|d| performance.distance_meters == d)
            && self
                .pool_length
                .is_none_or(|p| performance.pool_length == Some(p))
            && (self.sources.is_empty() || self.sources.contains(&performance.source))
    }
}

/// Durable table of performances.
///
/// Implementations must make `apply_personal_best` atomic for a single call:
/// every row in the key's scope ends with `is_personal_best` equal to
/// `id == winner`, or none of them change.
#[async_trait]
pub trait PerformanceStore: Send + Sync {
    /// Insert a new performance.
    async fn insert(&self, performance: &TimedPerformance) -> Result<()>;

    /// Replace an existing performance by id.
    async fn update(&self, performance: &TimedPerformance) -> Result<()>;

    /// Delete by id, returning the removed row if it existed.
    async fn delete(&self, id: Uuid) -> Result<Option<TimedPerformance>>;

    /// Fetch by id.
    async fn get(&self, id: Uuid) -> Result<Option<TimedPerformance>>;

    /// All rows matching the query, in no particular order.
    async fn find_matching(&self, query: &PerformanceQuery) -> Result<Vec<TimedPerformance>>;

    /// Flag `winner` and clear every other row in the key's scope.
    ///
    /// Returns the number of rows whose flag changed.
    async fn apply_personal_best(&self, key: &PersonalBestKey, winner: Option<Uuid>)
        -> Result<usize>;
}
