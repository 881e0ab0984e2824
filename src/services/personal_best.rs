// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Personal-best flag maintenance.
//!
//! For every `PersonalBestKey` at most one competition or training row
//! carries `is_personal_best`. `recompute` re-derives the winner from the
//! store on every call (no cached state) and is serialized per key:
//! 1. Acquire the key's lock
//! 2. Read the key's scope and pick the winner (fastest, earliest on ties)
//! 3. Flag the winner and clear everyone else in one store call
//! 4. Re-read and verify exactly one flag (or none for an empty scope)
//! 5. On a store failure or a failed verification, retry once, then give up
//!    with a transient error

use crate::db::{PerformanceQuery, PerformanceStore};
use crate::error::{AppError, Result};
use crate::models::{PersonalBestKey, TimedPerformance};
use dashmap::DashMap;
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// First attempt plus one synchronous retry.
const MAX_RECOMPUTE_ATTEMPTS: u32 = 2;

/// Shared per-key recompute locks.
pub type RecomputeLocks = Arc<DashMap<PersonalBestKey, Arc<Mutex<()>>>>;

/// Keeps the single-personal-best invariant for every key.
#[derive(Clone)]
pub struct PersonalBestMaintainer {
    store: Arc<dyn PerformanceStore>,
    /// Per-key mutex to serialize recomputes on the same key.
    locks: RecomputeLocks,
}

impl PersonalBestMaintainer {
    pub fn new(store: Arc<dyn PerformanceStore>) -> Self {
        Self {
            store,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Keys with a recompute in flight.
    pub fn active_keys(&self) -> usize {
        self.locks.len()
    }

    /// Recompute the personal best for one key.
    ///
    /// Returns the winning row (with its flag set), or `None` when the key
    /// has no competition or training rows left. Safe to re-run at any time;
    /// a second call with no intervening writes changes nothing.
    pub async fn recompute(&self, key: &PersonalBestKey) -> Result<Option<TimedPerformance>> {
        let lock = self
            .locks
            .entry(*key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().await;
            self.recompute_locked(key).await
        };

        // Drop the entry once no other caller holds or waits on this key.
        drop(lock);
        self.locks
            .remove_if(key, |_, entry| Arc::strong_count(entry) == 1);

        result
    }

    async fn recompute_locked(&self, key: &PersonalBestKey) -> Result<Option<TimedPerformance>> {
        let mut last_error = None;
        for attempt in 1..=MAX_RECOMPUTE_ATTEMPTS {
            match self.recompute_once(key).await {
                Ok(winner) => return Ok(winner),
                Err(err) => {
                    tracing::warn!(
                        key = %key,
                        attempt,
                        error = %err,
                        "Personal best recompute failed"
                    );
                    last_error = Some(err);
                }
            }
        }

        let detail = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown failure".to_string());
        tracing::error!(key = %key, error = %detail, "Personal best repair gave up");
        Err(AppError::Transient(format!(
            "personal best recompute for {} failed: {}",
            key, detail
        )))
    }

    async fn recompute_once(&self, key: &PersonalBestKey) -> Result<Option<TimedPerformance>> {
        let query = PerformanceQuery::for_key(key);
        let rows = self.store.find_matching(&query).await?;

        let flagged = count_flagged(&rows);
        let winner = select_winner(&rows).cloned();
        let winner_id = winner.as_ref().map(|w| w.id);

        let consistent = match &winner {
            Some(w) => flagged == 1 && w.is_personal_best,
            None => flagged == 0,
        };
        if consistent {
            tracing::debug!(key = %key, winner = ?winner_id, "Personal best already consistent");
            return Ok(winner);
        }

        if flagged > 1 || (flagged == 0 && winner.is_some()) {
            // Left behind by a partial write or a racing writer; repaired below.
            tracing::warn!(
                key = %key,
                flagged,
                rows = rows.len(),
                "Inconsistent personal best state, repairing"
            );
        }

        let changed = self.store.apply_personal_best(key, winner_id).await?;

        let after = self.store.find_matching(&query).await?;
        verify_single_winner(key, &after, winner_id)?;

        tracing::info!(
            key = %key,
            winner = ?winner_id,
            changed,
            "Personal best recomputed"
        );

        // Report the row as stored after the sweep.
        Ok(after.into_iter().find(|row| Some(row.id) == winner_id))
    }
}

/// Pick the personal best among rows of one key.
///
/// Fastest time wins; on an exact tie the earliest swim wins, then the
/// lowest id so that identical timestamps still order deterministically.
pub fn select_winner(rows: &[TimedPerformance]) -> Option<&TimedPerformance> {
    rows.iter().min_by(|a, b| compare_for_best(a, b))
}

/// Ordering where the better performance sorts first.
pub fn compare_for_best(a: &TimedPerformance, b: &TimedPerformance) -> Ordering {
    a.elapsed_seconds
        .total_cmp(&b.elapsed_seconds)
        .then_with(|| a.occurred_at.cmp(&b.occurred_at))
        .then_with(|| a.id.cmp(&b.id))
}

fn count_flagged(rows: &[TimedPerformance]) -> usize {
    rows.iter().filter(|row| row.is_personal_best).count()
}

/// Check the post-condition of a sweep.
///
/// A winner that disappeared between the read and the sweep (deleted or
/// moved to another key) shows up as zero flags here and triggers a retry.
fn verify_single_winner(
    key: &PersonalBestKey,
    rows: &[TimedPerformance],
    winner: Option<Uuid>,
) -> Result<()> {
    let flagged = count_flagged(rows);
    let expected = usize::from(!rows.is_empty());
    let winner_flagged = rows
        .iter()
        .any(|row| row.is_personal_best && Some(row.id) == winner);

    if flagged == expected && (expected == 0 || winner_flagged) {
        Ok(())
    } else {
        Err(AppError::ConcurrencyConflict {
            key: key.to_string(),
            flagged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PoolLength, Source, SourceMetadata, Stroke};
    use chrono::{TimeZone, Utc};

    fn key() -> PersonalBestKey {
        PersonalBestKey {
            athlete_id: 1,
            stroke: Stroke::Freestyle,
            distance_meters: 50,
            pool_length: PoolLength::Long50m,
        }
    }

    fn row(seconds: f64, day: u32) -> TimedPerformance {
        TimedPerformance {
            id: Uuid::new_v4(),
            athlete_id: 1,
            stroke: Stroke::Freestyle,
            distance_meters: 50,
            pool_length: Some(PoolLength::Long50m),
            elapsed_seconds: seconds,
            occurred_at: Utc.with_ymd_and_hms(2024, 1, day, 10, 0, 0).unwrap(),
            source: Source::Competition,
            is_personal_best: false,
            source_metadata: SourceMetadata::Competition {
                competition_name: None,
                placement: None,
            },
        }
    }

    #[test]
    fn test_select_winner_fastest() {
        let rows = vec![row(32.45, 15), row(30.10, 20), row(31.0, 25)];
        assert_eq!(select_winner(&rows).unwrap().elapsed_seconds, 30.10);
    }

    #[test]
    fn test_select_winner_tie_earliest() {
        let later = row(30.0, 20);
        let earlier = row(30.0, 5);
        let rows = vec![later.clone(), earlier.clone()];
        assert_eq!(select_winner(&rows).unwrap().id, earlier.id);

        let reversed = vec![earlier.clone(), later];
        assert_eq!(select_winner(&reversed).unwrap().id, earlier.id);
    }

    #[test]
    fn test_select_winner_same_instant_uses_id() {
        let a = row(30.0, 5);
        let mut b = row(30.0, 5);
        b.occurred_at = a.occurred_at;
        let expected = if a.id < b.id { a.id } else { b.id };

        assert_eq!(select_winner(&[a.clone(), b.clone()]).unwrap().id, expected);
        assert_eq!(select_winner(&[b, a]).unwrap().id, expected);
    }

    #[test]
    fn test_select_winner_empty() {
        assert!(select_winner(&[]).is_none());
    }

    #[test]
    fn test_verify_single_winner() {
        let mut a = row(30.0, 1);
        let b = row(31.0, 2);
        assert!(verify_single_winner(&key(), &[], None).is_ok());

        a.is_personal_best = true;
        assert!(verify_single_winner(&key(), &[a.clone(), b.clone()], Some(a.id)).is_ok());

        // Wrong row flagged
        assert!(verify_single_winner(&key(), &[a.clone(), b.clone()], Some(b.id)).is_err());

        // Double flag
        let mut b_flagged = b.clone();
        b_flagged.is_personal_best = true;
        let err = verify_single_winner(&key(), &[a.clone(), b_flagged], Some(a.id)).unwrap_err();
        assert!(matches!(
            err,
            AppError::ConcurrencyConflict { flagged: 2, .. }
        ));

        // Zero flags in a non-empty scope
        a.is_personal_best = false;
        assert!(verify_single_winner(&key(), &[a, b], None).is_err());
    }
}
