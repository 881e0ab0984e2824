// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Process-local performance store.
//!
//! Rows live in a single `RwLock`-guarded map, so every write (including the
//! personal-best flag sweep) is atomic with respect to every other write.

use crate::db::{PerformanceQuery, PerformanceStore};
use crate::error::{AppError, Result};
use crate::models::{PersonalBestKey, TimedPerformance};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory store, cheap to clone (clones share the same rows).
#[derive(Clone, Default)]
pub struct MemoryStore {
    rows: Arc<RwLock<HashMap<Uuid, TimedPerformance>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Overwrite a row's flag without any recompute.
    ///
    /// Used to stage inconsistent states (e.g. after a partial write).
    pub async fn force_flag(&self, id: Uuid, is_personal_best: bool) -> Result<()> {
        let mut rows = self.rows.write().await;
        let row = rows
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Performance {}", id)))?;
        row.is_personal_best = is_personal_best;
        Ok(())
    }
}

#[async_trait]
impl PerformanceStore for MemoryStore {
    async fn insert(&self, performance: &TimedPerformance) -> Result<()> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&performance.id) {
            return Err(AppError::BadRequest(format!(
                "Performance {} already exists",
                performance.id
            )));
        }
        rows.insert(performance.id, performance.clone());
        Ok(())
    }

    async fn update(&self, performance: &TimedPerformance) -> Result<()> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&performance.id) {
            Some(existing) => {
                *existing = performance.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!(
                "Performance {}",
                performance.id
            ))),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<Option<TimedPerformance>> {
        Ok(self.rows.write().await.remove(&id))
    }

    async fn get(&self, id: Uuid) -> Result<Option<TimedPerformance>> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn find_matching(&self, query: &PerformanceQuery) -> Result<Vec<TimedPerformance>> {
        let rows = self.rows.read().await;
        Ok(rows.values().filter(|p| query.matches(p)).cloned().collect())
    }

    async fn apply_personal_best(
        &self,
        key: &PersonalBestKey,
        winner: Option<Uuid>,
    ) -> Result<usize> {
        let query = PerformanceQuery::for_key(key);
        let mut rows = self.rows.write().await;
        let mut changed = 0;

        // Scope is re-evaluated under the write guard: rows that moved to
        // another key since the caller's read are left alone.
        for row in rows.values_mut().filter(|p| query.matches(p)) {
            let flag = Some(row.id) == winner;
            if row.is_personal_best != flag {
                row.is_personal_best = flag;
                changed += 1;
            }
        }

        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PoolLength, Source, SourceMetadata, Stroke};
    use chrono::{TimeZone, Utc};

    fn row(pool_length: PoolLength, seconds: f64) -> TimedPerformance {
        TimedPerformance {
            id: Uuid::new_v4(),
            athlete_id: 9,
            stroke: Stroke::Backstroke,
            distance_meters: 100,
            pool_length: Some(pool_length),
            elapsed_seconds: seconds,
            occurred_at: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
            source: Source::Competition,
            is_personal_best: false,
            source_metadata: SourceMetadata::Competition {
                competition_name: None,
                placement: None,
            },
        }
    }

    fn key(pool_length: PoolLength) -> PersonalBestKey {
        PersonalBestKey {
            athlete_id: 9,
            stroke: Stroke::Backstroke,
            distance_meters: 100,
            pool_length,
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let store = MemoryStore::new();
        let performance = row(PoolLength::Long50m, 70.0);
        store.insert(&performance).await.unwrap();

        let err = store.insert(&performance).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_update_missing_row_is_not_found() {
        let store = MemoryStore::new();
        let err = store.update(&row(PoolLength::Long50m, 70.0)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_apply_personal_best_only_touches_key_scope() {
        let store = MemoryStore::new();
        let long = row(PoolLength::Long50m, 70.0);
        let short = row(PoolLength::Short25m, 68.0);
        store.insert(&long).await.unwrap();
        store.insert(&short).await.unwrap();
        store.force_flag(short.id, true).await.unwrap();

        let changed = store
            .apply_personal_best(&key(PoolLength::Long50m), Some(long.id))
            .await
            .unwrap();
        assert_eq!(changed, 1);

        assert!(store.get(long.id).await.unwrap().unwrap().is_personal_best);
        // Different pool length: untouched
        assert!(store.get(short.id).await.unwrap().unwrap().is_personal_best);

        // Second application is a no-op
        let changed = store
            .apply_personal_best(&key(PoolLength::Long50m), Some(long.id))
            .await
            .unwrap();
        assert_eq!(changed, 0);
    }

    #[tokio::test]
    async fn test_apply_personal_best_none_clears_scope() {
        let store = MemoryStore::new();
        let long = row(PoolLength::Long50m, 70.0);
        store.insert(&long).await.unwrap();
        store.force_flag(long.id, true).await.unwrap();

        let changed = store
            .apply_personal_best(&key(PoolLength::Long50m), None)
            .await
            .unwrap();
        assert_eq!(changed, 1);
        assert!(!store.get(long.id).await.unwrap().unwrap().is_personal_best);
    }
}
