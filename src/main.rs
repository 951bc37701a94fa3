//! # Roofline Analytics Service
//!
//! Standalone Axum service exposing the analytics engine:
//!
//! - batch recomputation of every derived analytics table
//! - single-entity predictions through the strategy dispatcher
//! - time-bucketed aggregate regeneration
//! - dashboard and per-kind report queries
//!
//! Authentication, static assets, and the rest of the platform live in the
//! gateway in front of this service.

mod aggregate;
mod batch;
mod db;
mod error;
mod models;
mod predict;
mod reconcile;
mod reports;
mod routes;
mod scoring;
mod store;

use axum::{Extension, Router};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roofline_analytics=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting Roofline analytics service");

    let app_db_url = db::pool_from_env();
    let app_db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&app_db_url)
        .await?;

    info!("Connected to application database");

    sqlx::migrate!("./migrations").run(&app_db).await?;
    info!("Migrations complete");

    // Build the Axum router with all route modules
    let app = Router::new()
        .merge(routes::analytics::router())
        .merge(routes::reports::router())
        .layer(Extension(app_db))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let bind_addr = "0.0.0.0:3000";
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("Listening on {}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
