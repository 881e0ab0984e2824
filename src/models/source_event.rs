// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Raw inbound event shapes, one per performance source.
//!
//! Each source names and scales its fields differently. The raw shapes are
//! kept loose (mostly `Option`) so that the normalizer can reject a
//! malformed event with a precise validation error instead of failing
//! deserialization with a generic one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Upper bound on any single swim, in seconds (two hours).
pub const MAX_ELAPSED_SECONDS: f64 = 7200.0;

/// Longest race distance accepted from any source.
pub const MAX_DISTANCE_METERS: u32 = 10_000;

/// Competition result, entered or imported by club staff.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CompetitionRecord {
    /// Present when the CRUD layer re-submits an existing record
    #[serde(default)]
    pub id: Option<Uuid>,
    pub swimmer_id: u64,
    #[serde(default)]
    pub stroke: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, max = 10000))]
    pub distance: Option<u32>,
    /// "25m" / "50m" style label
    #[serde(default)]
    pub pool_length: Option<String>,
    /// Seconds
    #[serde(default)]
    #[validate(range(min = 0.0, max = 7200.0))]
    pub time: Option<f64>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub competition_name: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1))]
    pub placement: Option<u32>,
}

/// Timed swim logged during a training session.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TrainingSession {
    pub athlete_id: u64,
    #[serde(default)]
    pub stroke: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, max = 10000))]
    pub distance: Option<u32>,
    /// "SHORT_COURSE" / "LONG_COURSE" style label
    #[serde(default)]
    pub pool_type: Option<String>,
    /// Seconds
    #[serde(default)]
    #[validate(range(min = 0.0, max = 7200.0))]
    pub time: Option<f64>,
    #[serde(default)]
    pub session_date: Option<DateTime<Utc>>,
    /// Lap split times in seconds
    #[serde(default)]
    #[validate(length(max = 400))]
    pub lap_splits: Vec<f64>,
}

/// Finalized time for one lane of one internal-meet heat.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct HeatLaneResult {
    pub swimmer_id: u64,
    #[serde(default)]
    pub stroke: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, max = 10000))]
    pub distance_meters: Option<u32>,
    /// Milliseconds, as recorded by the meet timing sheet
    #[serde(default)]
    #[validate(range(max = 7200000))]
    pub final_time_millis: Option<u64>,
    /// Defaults to the time the event is ingested
    #[serde(default)]
    pub finalized_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub meet_id: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub heat_id: String,
    #[validate(range(min = 1, max = 10))]
    pub lane: u8,
}

/// One inbound event from any source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceEvent {
    Competition(CompetitionRecord),
    Training(TrainingSession),
    InternalMeet(HeatLaneResult),
}
