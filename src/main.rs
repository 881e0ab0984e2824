// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Swim-Records API Server
//!
//! Serves personal-best maintenance and best-time statistics to the club
//! application over JSON.

use std::sync::Arc;
use swim_records::{
    config::{Config, StoreBackend},
    db::{FirestoreDb, MemoryStore, PerformanceStore},
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        backend = ?config.store_backend,
        "Starting Swim-Records API"
    );

    let db: Arc<dyn PerformanceStore> = match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory performance store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Firestore => Arc::new(FirestoreDb::new(&config.gcp_project_id).await?),
    };

    let state = Arc::new(AppState::new(config.clone(), db));

    let app = swim_records::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("swim_records=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
