//! HTTP route modules for the analytics engine.
//!
//! - `analytics`: mutation endpoints (batch run, predictions, aggregates)
//! - `reports`: read endpoints (dashboard, per-kind reports, insights)

pub mod analytics;
pub mod reports;
