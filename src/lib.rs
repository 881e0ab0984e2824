// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Swim-Records: personal-best consistency and cross-source performance
//! aggregation for swim clubs.
//!
//! This crate ingests timed swims from competitions, training sessions and
//! internal meets, keeps exactly one personal-best flag per athlete, stroke,
//! distance and pool length, and derives the per-stroke statistics shown
//! throughout the club dashboard.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::PerformanceStore;
use services::PerformanceService;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn PerformanceStore>,
    pub performance_service: PerformanceService,
}

impl AppState {
    /// Build the state around a store.
    pub fn new(config: Config, db: Arc<dyn PerformanceStore>) -> Self {
        Self {
            performance_service: PerformanceService::new(db.clone()),
            config,
            db,
        }
    }
}
