// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use swim_records::config::Config;
use swim_records::db::{FirestoreDb, MemoryStore, PerformanceQuery, PerformanceStore};
use swim_records::error::{AppError, Result};
use swim_records::models::{
    CompetitionRecord, HeatLaneResult, PersonalBestKey, SourceEvent, TimedPerformance,
    TrainingSession,
};
use swim_records::routes::create_router;
use swim_records::services::PerformanceService;
use swim_records::AppState;
use uuid::Uuid;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app backed by an in-memory store.
/// Returns the router, the shared state and a handle on the store.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, MemoryStore) {
    let store = MemoryStore::new();
    let state = Arc::new(AppState::new(Config::default(), Arc::new(store.clone())));
    (create_router(state.clone()), state, store)
}

/// Service over a fresh in-memory store.
#[allow(dead_code)]
pub fn test_service() -> (PerformanceService, MemoryStore) {
    let store = MemoryStore::new();
    (PerformanceService::new(Arc::new(store.clone())), store)
}

/// Midday UTC on the given date.
#[allow(dead_code)]
pub fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

#[allow(dead_code)]
pub fn competition(
    athlete_id: u64,
    stroke: &str,
    distance: u32,
    pool: &str,
    seconds: f64,
    date: DateTime<Utc>,
) -> SourceEvent {
    SourceEvent::Competition(CompetitionRecord {
        id: None,
        swimmer_id: athlete_id,
        stroke: Some(stroke.to_string()),
        distance: Some(distance),
        pool_length: Some(pool.to_string()),
        time: Some(seconds),
        date: Some(date),
        competition_name: Some(format!("Meet {}", date.format("%Y-%m-%d"))),
        placement: None,
    })
}

#[allow(dead_code)]
pub fn training(
    athlete_id: u64,
    stroke: &str,
    distance: u32,
    pool: &str,
    seconds: f64,
    date: DateTime<Utc>,
) -> SourceEvent {
    SourceEvent::Training(TrainingSession {
        athlete_id,
        stroke: Some(stroke.to_string()),
        distance: Some(distance),
        pool_type: Some(pool.to_string()),
        time: Some(seconds),
        session_date: Some(date),
        lap_splits: vec![seconds / 2.0, seconds / 2.0],
    })
}

#[allow(dead_code)]
pub fn internal_meet(
    athlete_id: u64,
    stroke: &str,
    distance: u32,
    millis: u64,
    date: DateTime<Utc>,
) -> SourceEvent {
    SourceEvent::InternalMeet(HeatLaneResult {
        swimmer_id: athlete_id,
        stroke: Some(stroke.to_string()),
        distance_meters: Some(distance),
        final_time_millis: Some(millis),
        finalized_at: Some(date),
        meet_id: Some("club-gala".to_string()),
        heat_id: "H1".to_string(),
        lane: 4,
    })
}

/// Rows of one key as currently stored.
#[allow(dead_code)]
pub async fn scope(store: &dyn PerformanceStore, key: &PersonalBestKey) -> Vec<TimedPerformance> {
    store
        .find_matching(&PerformanceQuery::for_key(key))
        .await
        .expect("scope query failed")
}

/// Number of flagged rows in a key's scope.
#[allow(dead_code)]
pub async fn flagged_count(store: &dyn PerformanceStore, key: &PersonalBestKey) -> usize {
    scope(store, key)
        .await
        .iter()
        .filter(|row| row.is_personal_best)
        .count()
}

/// How `FlakyStore` misbehaves on `apply_personal_best`.
#[allow(dead_code)]
#[derive(Clone, Copy, Debug)]
pub enum Fault {
    /// Return an error without writing anything
    Fail,
    /// Flag the winner but leave every other flag as it was, then error
    WinnerOnly,
}

/// Store wrapper that injects faults into the first N flag sweeps.
#[allow(dead_code)]
#[derive(Clone)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    fault: Fault,
    remaining_faults: Arc<AtomicUsize>,
    pub sweeps: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl FlakyStore {
    pub fn new(inner: MemoryStore, fault: Fault, faults: usize) -> Self {
        Self {
            inner,
            fault,
            remaining_faults: Arc::new(AtomicUsize::new(faults)),
            sweeps: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn take_fault(&self) -> bool {
        self.remaining_faults
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl PerformanceStore for FlakyStore {
    async fn insert(&self, performance: &TimedPerformance) -> Result<()> {
        self.inner.insert(performance).await
    }

    async fn update(&self, performance: &TimedPerformance) -> Result<()> {
        self.inner.update(performance).await
    }

    async fn delete(&self, id: Uuid) -> Result<Option<TimedPerformance>> {
        self.inner.delete(id).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<TimedPerformance>> {
        self.inner.get(id).await
    }

    async fn find_matching(&self, query: &PerformanceQuery) -> Result<Vec<TimedPerformance>> {
        self.inner.find_matching(query).await
    }

    async fn apply_personal_best(
        &self,
        key: &PersonalBestKey,
        winner: Option<Uuid>,
    ) -> Result<usize> {
        self.sweeps.fetch_add(1, Ordering::SeqCst);

        if !self.take_fault() {
            return self.inner.apply_personal_best(key, winner).await;
        }

        match self.fault {
            Fault::Fail => Err(AppError::Database("injected write failure".to_string())),
            Fault::WinnerOnly => {
                if let Some(id) = winner {
                    self.inner.force_flag(id, true).await?;
                }
                Err(AppError::Database("injected partial write".to_string()))
            }
        }
    }
}
