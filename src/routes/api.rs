// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JSON API over the performance service.

use crate::error::{AppError, Result};
use crate::models::{
    AthleteStatistics, PerformanceEdit, PersonalBestKey, PoolLength, Source, SourceEvent,
    TimedPerformance,
};
use crate::services::StatsFilter;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;

/// Most athletes a single best-times request may ask for.
const MAX_ATHLETES_PER_QUERY: usize = 50;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/events", post(record_event))
        .route(
            "/api/performances/{id}",
            patch(edit_performance).delete(delete_performance),
        )
        .route("/api/best-times", get(get_best_times))
        .route(
            "/api/athletes/{athlete_id}/personal-bests",
            get(get_personal_bests),
        )
        .route(
            "/api/athletes/{athlete_id}/personal-bests/recompute",
            post(recompute_athlete),
        )
        .route("/api/personal-bests/recompute", post(recompute_key))
}

// ─── Writes ──────────────────────────────────────────────────

/// Ingest one source event (competition, training or internal meet).
async fn record_event(
    State(state): State<Arc<AppState>>,
    Json(event): Json<SourceEvent>,
) -> Result<(StatusCode, Json<TimedPerformance>)> {
    let performance = state.performance_service.record_event(&event).await?;
    Ok((StatusCode::CREATED, Json(performance)))
}

/// Edit a competition result.
async fn edit_performance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(edit): Json<PerformanceEdit>,
) -> Result<Json<TimedPerformance>> {
    let performance = state.performance_service.edit_performance(id, &edit).await?;
    Ok(Json(performance))
}

/// Delete a performance; responds with the removed row.
async fn delete_performance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TimedPerformance>> {
    let deleted = state.performance_service.delete_performance(id).await?;
    Ok(Json(deleted))
}

// ─── Best Times ──────────────────────────────────────────────

#[derive(Deserialize)]
struct BestTimesQuery {
    /// Comma-separated athlete IDs
    athlete_ids: String,
    /// Filter by distance in meters
    distance: Option<u32>,
    /// Filter by pool length ("25m", "LONG_50M", ...)
    pool: Option<String>,
    /// Restrict to a single source; all sources when absent
    source: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BestTimesResponse {
    pub athletes: Vec<AthleteStatistics>,
}

fn parse_athlete_ids(raw: &str) -> Result<Vec<u64>> {
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u64>()
                .map_err(|_| AppError::BadRequest(format!("Invalid athlete id {:?}", part)))
        })
        .collect::<Result<Vec<u64>>>()?;

    if ids.is_empty() {
        return Err(AppError::BadRequest(
            "At least one athlete id is required".to_string(),
        ));
    }
    if ids.len() > MAX_ATHLETES_PER_QUERY {
        return Err(AppError::BadRequest(format!(
            "At most {} athletes per query",
            MAX_ATHLETES_PER_QUERY
        )));
    }
    Ok(ids)
}

fn parse_filter(params: &BestTimesQuery) -> Result<StatsFilter> {
    let pool_length = params
        .pool
        .as_deref()
        .map(|raw| {
            PoolLength::parse_label(raw)
                .ok_or_else(|| AppError::BadRequest(format!("Invalid 'pool' parameter {:?}", raw)))
        })
        .transpose()?;

    let source = params
        .source
        .as_deref()
        .map(|raw| {
            Source::parse_label(raw).ok_or_else(|| {
                AppError::BadRequest(format!("Invalid 'source' parameter {:?}", raw))
            })
        })
        .transpose()?;

    if params.distance == Some(0) {
        return Err(AppError::BadRequest(
            "'distance' must be positive".to_string(),
        ));
    }

    Ok(StatsFilter {
        distance_meters: params.distance,
        pool_length,
        source,
    })
}

/// Per-stroke statistics for one or more athletes.
async fn get_best_times(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BestTimesQuery>,
) -> Result<Json<BestTimesResponse>> {
    let athlete_ids = parse_athlete_ids(&params.athlete_ids)?;
    let filter = parse_filter(&params)?;

    tracing::debug!(
        athletes = ?athlete_ids,
        filter = ?filter,
        "Fetching best times"
    );

    let athletes = state
        .performance_service
        .best_times(&athlete_ids, &filter)
        .await?;

    Ok(Json(BestTimesResponse { athletes }))
}

// ─── Personal Bests ──────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PersonalBestsResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub athlete_id: u64,
    pub personal_bests: Vec<TimedPerformance>,
}

async fn get_personal_bests(
    State(state): State<Arc<AppState>>,
    Path(athlete_id): Path<u64>,
) -> Result<Json<PersonalBestsResponse>> {
    let personal_bests = state
        .performance_service
        .personal_bests(athlete_id)
        .await?;
    Ok(Json(PersonalBestsResponse {
        athlete_id,
        personal_bests,
    }))
}

/// Repair every personal best of one athlete.
async fn recompute_athlete(
    State(state): State<Arc<AppState>>,
    Path(athlete_id): Path<u64>,
) -> Result<Json<PersonalBestsResponse>> {
    let personal_bests = state
        .performance_service
        .recompute_athlete(athlete_id)
        .await?;
    Ok(Json(PersonalBestsResponse {
        athlete_id,
        personal_bests,
    }))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RecomputeResponse {
    pub key: PersonalBestKey,
    pub winner: Option<TimedPerformance>,
}

/// Repair a single key.
async fn recompute_key(
    State(state): State<Arc<AppState>>,
    Json(key): Json<PersonalBestKey>,
) -> Result<Json<RecomputeResponse>> {
    let winner = state.performance_service.recompute(&key).await?;
    Ok(Json(RecomputeResponse { key, winner }))
}
