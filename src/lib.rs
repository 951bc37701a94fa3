//! # Roofline Analytics Engine
//!
//! Recomputes derived business metrics from the primary tables (leads,
//! projects, customers, weather events), reconciles them into parallel
//! analytics tables, produces placeholder predictions behind an explicit
//! strategy dispatch, and rolls metrics up into time-bucketed aggregates.
//! The Axum router is exposed so integration tests can create an in-process
//! server without `cargo run`.

pub mod aggregate;
pub mod batch;
pub mod db;
pub mod error;
pub mod models;
pub mod predict;
pub mod reconcile;
pub mod reports;
pub mod routes;
pub mod scoring;
pub mod store;

use axum::{Extension, Router};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the Axum router with all route modules and middleware.
///
/// The caller is responsible for providing a connected database pool.
/// This function does NOT start a server or run migrations.
pub fn create_app(app_db: PgPool) -> Router {
    Router::new()
        .merge(routes::analytics::router())
        .merge(routes::reports::router())
        .layer(Extension(app_db))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
