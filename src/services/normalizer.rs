// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Maps the three inbound source shapes onto `TimedPerformance`.
//!
//! Pure mapping: no store access, no personal-best logic. Every row leaves
//! here with `is_personal_best = false`.

use crate::error::{AppError, Result};
use crate::models::source_event::MAX_ELAPSED_SECONDS;
use crate::models::{
    CompetitionRecord, HeatLaneResult, PoolLength, Source, SourceEvent, SourceMetadata, Stroke,
    TimedPerformance, TrainingSession,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

const MILLIS_PER_SECOND: f64 = 1000.0;

/// Normalize one source event.
///
/// `now` stands in for the swim time of internal-meet results that carry no
/// finalize timestamp.
pub fn normalize(event: &SourceEvent, now: DateTime<Utc>) -> Result<TimedPerformance> {
    match event {
        SourceEvent::Competition(record) => normalize_competition(record),
        SourceEvent::Training(session) => normalize_training(session),
        SourceEvent::InternalMeet(result) => normalize_heat_lane(result, now),
    }
}

fn normalize_competition(record: &CompetitionRecord) -> Result<TimedPerformance> {
    record.validate()?;

    let stroke = require_stroke(record.stroke.as_deref())?;
    let distance_meters = require_distance(record.distance)?;
    let pool_length = require_pool(record.pool_length.as_deref(), "pool_length")?;
    let elapsed_seconds = require_seconds(record.time, "time")?;
    let occurred_at = record
        .date
        .ok_or_else(|| AppError::Validation("missing date".to_string()))?;

    Ok(TimedPerformance {
        id: record.id.unwrap_or_else(Uuid::new_v4),
        athlete_id: record.swimmer_id,
        stroke,
        distance_meters,
        pool_length: Some(pool_length),
        elapsed_seconds,
        occurred_at,
        source: Source::Competition,
        is_personal_best: false,
        source_metadata: SourceMetadata::Competition {
            competition_name: record
                .competition_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            placement: record.placement,
        },
    })
}

fn normalize_training(session: &TrainingSession) -> Result<TimedPerformance> {
    session.validate()?;

    let stroke = require_stroke(session.stroke.as_deref())?;
    let distance_meters = require_distance(session.distance)?;
    let pool_length = require_pool(session.pool_type.as_deref(), "pool_type")?;
    let elapsed_seconds = require_seconds(session.time, "time")?;
    let occurred_at = session
        .session_date
        .ok_or_else(|| AppError::Validation("missing session_date".to_string()))?;

    if let Some(bad) = session
        .lap_splits
        .iter()
        .find(|split| !split.is_finite() || **split < 0.0)
    {
        return Err(AppError::Validation(format!("invalid lap split {}", bad)));
    }

    Ok(TimedPerformance {
        id: Uuid::new_v4(),
        athlete_id: session.athlete_id,
        stroke,
        distance_meters,
        pool_length: Some(pool_length),
        elapsed_seconds,
        occurred_at,
        source: Source::Training,
        is_personal_best: false,
        source_metadata: SourceMetadata::Training {
            lap_count: session.lap_splits.len(),
            lap_splits: session.lap_splits.clone(),
        },
    })
}

fn normalize_heat_lane(result: &HeatLaneResult, now: DateTime<Utc>) -> Result<TimedPerformance> {
    result.validate()?;

    let stroke = require_stroke(result.stroke.as_deref())?;
    let distance_meters = require_distance(result.distance_meters)?;
    let millis = result
        .final_time_millis
        .ok_or_else(|| AppError::Validation("missing final_time_millis".to_string()))?;

    Ok(TimedPerformance {
        id: Uuid::new_v4(),
        athlete_id: result.swimmer_id,
        stroke,
        distance_meters,
        pool_length: None,
        elapsed_seconds: millis_to_seconds(millis),
        occurred_at: result.finalized_at.unwrap_or(now),
        source: Source::InternalMeet,
        is_personal_best: false,
        source_metadata: SourceMetadata::InternalMeet {
            meet_id: result.meet_id.clone(),
            heat_id: result.heat_id.clone(),
            lane: result.lane,
        },
    })
}

/// Internal meet sheets record milliseconds.
pub fn millis_to_seconds(millis: u64) -> f64 {
    millis as f64 / MILLIS_PER_SECOND
}

fn require_stroke(raw: Option<&str>) -> Result<Stroke> {
    let raw = raw.ok_or_else(|| AppError::Validation("missing stroke".to_string()))?;
    Stroke::parse_label(raw)
        .ok_or_else(|| AppError::Validation(format!("unknown stroke {:?}", raw)))
}

fn require_distance(distance: Option<u32>) -> Result<u32> {
    match distance {
        Some(0) => Err(AppError::Validation(
            "distance must be positive".to_string(),
        )),
        Some(d) => Ok(d),
        None => Err(AppError::Validation("missing distance".to_string())),
    }
}

fn require_pool(raw: Option<&str>, field: &str) -> Result<PoolLength> {
    let raw = raw.ok_or_else(|| AppError::Validation(format!("missing {}", field)))?;
    PoolLength::parse_label(raw)
        .ok_or_else(|| AppError::Validation(format!("unknown {} {:?}", field, raw)))
}

/// Validate an elapsed time in seconds.
pub fn require_seconds(time: Option<f64>, field: &str) -> Result<f64> {
    match time {
        None => Err(AppError::Validation(format!("missing {}", field))),
        Some(t) if !t.is_finite() || t < 0.0 => {
            Err(AppError::Validation(format!("invalid {} {}", field, t)))
        }
        Some(t) if t > MAX_ELAPSED_SECONDS => Err(AppError::Validation(format!(
            "{} {} exceeds {} seconds",
            field, t, MAX_ELAPSED_SECONDS
        ))),
        Some(t) => Ok(t),
    }
}
