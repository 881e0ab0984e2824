// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Performance service: the one seam the surrounding application touches.
//!
//! Handles the write workflow:
//! 1. Normalize the inbound source event
//! 2. Write it to the performance store
//! 3. Recompute the personal best of every key the write touched
//!
//! and the read side (`best_times`), which delegates to the aggregator.

use crate::db::{PerformanceQuery, PerformanceStore};
use crate::error::{AppError, Result};
use crate::models::source_event::MAX_DISTANCE_METERS;
use crate::models::{
    AthleteStatistics, PerformanceEdit, PersonalBestKey, Source, SourceEvent, SourceMetadata,
    TimedPerformance,
};
use crate::services::normalizer::{self, require_seconds};
use crate::services::personal_best::PersonalBestMaintainer;
use crate::services::statistics::{StatisticsAggregator, StatsFilter};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

/// Query facade over the store, the maintainer and the aggregator.
#[derive(Clone)]
pub struct PerformanceService {
    store: Arc<dyn PerformanceStore>,
    maintainer: PersonalBestMaintainer,
    aggregator: StatisticsAggregator,
}

impl PerformanceService {
    pub fn new(store: Arc<dyn PerformanceStore>) -> Self {
        Self {
            maintainer: PersonalBestMaintainer::new(store.clone()),
            aggregator: StatisticsAggregator::new(store.clone()),
            store,
        }
    }

    pub fn maintainer(&self) -> &PersonalBestMaintainer {
        &self.maintainer
    }

    // ─── Write Side ──────────────────────────────────────────────

    /// Ingest one source event.
    ///
    /// A competition record that re-submits an existing id is treated as an
    /// edit of that record.
    pub async fn record_event(&self, event: &SourceEvent) -> Result<TimedPerformance> {
        self.record_event_at(event, Utc::now()).await
    }

    pub async fn record_event_at(
        &self,
        event: &SourceEvent,
        now: DateTime<Utc>,
    ) -> Result<TimedPerformance> {
        let mut performance = normalizer::normalize(event, now).inspect_err(|e| {
            tracing::warn!(error = %e, "Rejected source event");
        })?;

        let previous = if performance.source == Source::Competition {
            self.store.get(performance.id).await?
        } else {
            None
        };

        match &previous {
            Some(existing) => {
                if existing.source != Source::Competition {
                    return Err(AppError::Validation(format!(
                        "Performance {} is not a competition result",
                        existing.id
                    )));
                }
                // The flag belongs to the recompute, not to the submitter.
                performance.is_personal_best = existing.is_personal_best;
                self.store.update(&performance).await?
            }
            None => self.store.insert(&performance).await?,
        }

        tracing::info!(
            athlete_id = performance.athlete_id,
            performance_id = %performance.id,
            source = %performance.source,
            stroke = %performance.stroke,
            distance_meters = performance.distance_meters,
            seconds = performance.elapsed_seconds,
            "Performance recorded"
        );

        self.on_performance_written(previous.as_ref(), &performance)
            .await?;
        self.reload(performance).await
    }

    /// Edit a competition performance in place.
    pub async fn edit_performance(
        &self,
        id: Uuid,
        edit: &PerformanceEdit,
    ) -> Result<TimedPerformance> {
        let previous = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Performance {}", id)))?;

        if previous.source != Source::Competition {
            return Err(AppError::Validation(format!(
                "Only competition results can be edited ({} is {})",
                id, previous.source
            )));
        }

        let updated = apply_edit(&previous, edit)?;
        self.store.update(&updated).await?;

        tracing::info!(
            athlete_id = updated.athlete_id,
            performance_id = %id,
            seconds = updated.elapsed_seconds,
            "Performance edited"
        );

        self.on_performance_written(Some(&previous), &updated)
            .await?;
        self.reload(updated).await
    }

    /// Delete a performance and repair its key.
    pub async fn delete_performance(&self, id: Uuid) -> Result<TimedPerformance> {
        let deleted = self
            .store
            .delete(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Performance {}", id)))?;

        tracing::info!(
            athlete_id = deleted.athlete_id,
            performance_id = %id,
            "Performance deleted"
        );

        self.on_performance_deleted(&deleted).await?;
        Ok(deleted)
    }

    /// Hook for rows written by the surrounding application.
    ///
    /// Recomputes the old key first, then the new one. Nothing is
    /// recomputed when the key, the time, the swim date and the flag are all
    /// unchanged.
    pub async fn on_performance_written(
        &self,
        previous: Option<&TimedPerformance>,
        current: &TimedPerformance,
    ) -> Result<()> {
        let old_key = previous.and_then(TimedPerformance::personal_best_key);
        let new_key = current.personal_best_key();

        let time_changed =
            previous.is_none_or(|p| p.elapsed_seconds != current.elapsed_seconds);
        let moment_changed = previous.is_none_or(|p| p.occurred_at != current.occurred_at);
        let flag_changed =
            previous.is_none_or(|p| p.is_personal_best != current.is_personal_best);

        if old_key == new_key && !time_changed && !moment_changed && !flag_changed {
            return Ok(());
        }

        if let Some(key) = old_key.filter(|k| Some(*k) != new_key) {
            self.maintainer.recompute(&key).await?;
        }
        if let Some(key) = new_key {
            self.maintainer.recompute(&key).await?;
        }
        Ok(())
    }

    /// Hook for rows deleted by the surrounding application.
    pub async fn on_performance_deleted(&self, deleted: &TimedPerformance) -> Result<()> {
        if let Some(key) = deleted.personal_best_key() {
            self.maintainer.recompute(&key).await?;
        }
        Ok(())
    }

    /// Recompute one key directly.
    pub async fn recompute(&self, key: &PersonalBestKey) -> Result<Option<TimedPerformance>> {
        self.maintainer.recompute(key).await
    }

    /// Recompute every key an athlete has rows in.
    ///
    /// Returns the winners, ordered by key.
    pub async fn recompute_athlete(&self, athlete_id: u64) -> Result<Vec<TimedPerformance>> {
        let rows = self
            .store
            .find_matching(&PerformanceQuery::for_athlete(athlete_id))
            .await?;
        let keys: BTreeSet<PersonalBestKey> =
            rows.iter().filter_map(TimedPerformance::personal_best_key).collect();

        tracing::info!(athlete_id, keys = keys.len(), "Recomputing athlete personal bests");

        let mut winners = Vec::with_capacity(keys.len());
        for key in &keys {
            if let Some(winner) = self.maintainer.recompute(key).await? {
                winners.push(winner);
            }
        }
        Ok(winners)
    }

    // ─── Read Side ───────────────────────────────────────────────

    /// Rows currently flagged as personal bests for an athlete.
    pub async fn personal_bests(&self, athlete_id: u64) -> Result<Vec<TimedPerformance>> {
        let mut flagged: Vec<TimedPerformance> = self
            .store
            .find_matching(&PerformanceQuery::for_athlete(athlete_id))
            .await?
            .into_iter()
            .filter(|row| row.is_personal_best)
            .collect();
        flagged.sort_by_key(|row| row.personal_best_key());
        Ok(flagged)
    }

    /// Aggregated per-stroke view for the given athletes.
    pub async fn best_times(
        &self,
        athlete_ids: &[u64],
        filter: &StatsFilter,
    ) -> Result<Vec<AthleteStatistics>> {
        self.best_times_at(athlete_ids, filter, Utc::now()).await
    }

    /// As [`best_times`](Self::best_times), with an explicit "current" instant
    /// for the season and year statistics.
    pub async fn best_times_at(
        &self,
        athlete_ids: &[u64],
        filter: &StatsFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<AthleteStatistics>> {
        self.aggregator.best_times(athlete_ids, filter, now).await
    }

    /// Return the stored version of a row (flag included) after recompute.
    async fn reload(&self, performance: TimedPerformance) -> Result<TimedPerformance> {
        Ok(self.store.get(performance.id).await?.unwrap_or(performance))
    }
}

/// Apply an edit to a copy of `previous`.
fn apply_edit(previous: &TimedPerformance, edit: &PerformanceEdit) -> Result<TimedPerformance> {
    let mut updated = previous.clone();

    if let Some(seconds) = edit.elapsed_seconds {
        updated.elapsed_seconds = require_seconds(Some(seconds), "elapsed_seconds")?;
    }
    if let Some(stroke) = edit.stroke {
        updated.stroke = stroke;
    }
    if let Some(distance) = edit.distance_meters {
        if distance == 0 || distance > MAX_DISTANCE_METERS {
            return Err(AppError::Validation(format!(
                "distance_meters {} out of range",
                distance
            )));
        }
        updated.distance_meters = distance;
    }
    if let Some(pool_length) = edit.pool_length {
        updated.pool_length = Some(pool_length);
    }
    if let Some(occurred_at) = edit.occurred_at {
        updated.occurred_at = occurred_at;
    }
    if let Some(metadata) = &edit.source_metadata {
        if !matches!(metadata, SourceMetadata::Competition { .. }) {
            return Err(AppError::Validation(
                "competition results take competition metadata".to_string(),
            ));
        }
        updated.source_metadata = metadata.clone();
    }

    Ok(updated)
}
