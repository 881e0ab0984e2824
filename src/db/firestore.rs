// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed performance store.
//!
//! One document per performance in the `performances` collection, keyed by
//! the performance id. The personal-best flag sweep for a key is committed
//! in a single Firestore transaction.

use crate::db::{collections, PerformanceQuery, PerformanceStore};
use crate::error::AppError;
use crate::models::{PersonalBestKey, TimedPerformance};
use async_trait::async_trait;
use firestore::{paths, FirestoreWritePrecondition};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Partial document carrying only the personal-best flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersonalBestFlag {
    is_personal_best: bool,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Query by the indexed fields, then apply the full predicate in memory.
    ///
    /// Source filtering happens after the fetch; the indexed fields already
    /// narrow the result to one athlete (and usually one event).
    async fn query_performances(
        &self,
        query: &PerformanceQuery,
    ) -> Result<Vec<TimedPerformance>, AppError> {
        let athlete_id = query.athlete_id;
        let stroke = query.stroke.map(|s| s.as_str());
        let distance = query.distance_meters.map(u64::from);
        let pool_length = query.pool_length.map(|p| p.as_str());

        let mut rows: Vec<TimedPerformance> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::PERFORMANCES)
            .filter(move |q| {
                q.for_all([
                    q.field("athlete_id").eq(athlete_id),
                    stroke.and_then(|s| q.field("stroke").eq(s)),
                    distance.and_then(|d| q.field("distance_meters").eq(d)),
                    pool_length.and_then(|p| q.field("pool_length").eq(p)),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        rows.retain(|p| query.matches(p));
        Ok(rows)
    }

    /// Write personal-best flags in one transaction.
    ///
    /// Only the flag field is written, so concurrent edits to other fields of
    /// the same documents survive. A document deleted since it was read fails
    /// the existence precondition and aborts the whole commit.
    pub async fn commit_flags(
        &self,
        key: &PersonalBestKey,
        changes: &[(Uuid, bool)],
    ) -> Result<usize, AppError> {
        if changes.is_empty() {
            return Ok(0);
        }

        let client = self.get_client()?;
        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        for (id, is_personal_best) in changes {
            client
                .fluent()
                .update()
                .fields(paths!(PersonalBestFlag::{is_personal_best}))
                .in_col(collections::PERFORMANCES)
                .precondition(FirestoreWritePrecondition::Exists(true))
                .document_id(id.to_string())
                .object(&PersonalBestFlag {
                    is_personal_best: *is_personal_best,
                })
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add flag update to transaction: {}", e))
                })?;
        }

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::debug!(
            key = %key,
            changed = changes.len(),
            "Personal best flags committed"
        );

        Ok(changes.len())
    }
}

#[async_trait]
impl PerformanceStore for FirestoreDb {
    async fn insert(&self, performance: &TimedPerformance) -> Result<(), AppError> {
        let _: TimedPerformance = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::PERFORMANCES)
            .document_id(performance.id.to_string())
            .object(performance)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn update(&self, performance: &TimedPerformance) -> Result<(), AppError> {
        if self.get(performance.id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Performance {}",
                performance.id
            )));
        }

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PERFORMANCES)
            .document_id(performance.id.to_string())
            .object(performance)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<Option<TimedPerformance>, AppError> {
        let Some(existing) = self.get(id).await? else {
            return Ok(None);
        };

        self.get_client()?
            .fluent()
            .delete()
            .from(collections::PERFORMANCES)
            .document_id(id.to_string())
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Some(existing))
    }

    async fn get(&self, id: Uuid) -> Result<Option<TimedPerformance>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PERFORMANCES)
            .obj()
            .one(&id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_matching(
        &self,
        query: &PerformanceQuery,
    ) -> Result<Vec<TimedPerformance>, AppError> {
        self.query_performances(query).await
    }

    async fn apply_personal_best(
        &self,
        key: &PersonalBestKey,
        winner: Option<Uuid>,
    ) -> Result<usize, AppError> {
        let rows = self
            .query_performances(&PerformanceQuery::for_key(key))
            .await?;

        let changes: Vec<(Uuid, bool)> = rows
            .iter()
            .filter(|row| row.is_personal_best != (Some(row.id) == winner))
            .map(|row| (row.id, Some(row.id) == winner))
            .collect();

        self.commit_flags(key, &changes).await
    }
}
