//! Reporting routes.
//!
//! GET /analytics/dashboard - Dashboard metrics (revenue series for
//!                            admin/manager roles)
//! GET /analytics/leads     - Top lead analytics joined with their lead
//! GET /analytics/projects  - Top project analytics
//! GET /analytics/customers - Top customer analytics
//! GET /analytics/weather   - Top weather impact analytics
//! GET /analytics/insights  - Non-expired predictions, newest first

use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::Deserialize;

use crate::db::AppDb;
use crate::models::{
    ApiResponse, CustomerAnalyticsReport, DashboardMetrics, LeadAnalyticsReport,
    PredictiveModelResult, ProjectAnalyticsReport, WeatherImpactReport,
};
use crate::reports;
use crate::routes::analytics::status_for;
use crate::store::PgStore;

/// Build the reporting router.
pub fn router() -> Router {
    Router::new()
        .route("/analytics/dashboard", get(dashboard))
        .route("/analytics/leads", get(lead_report))
        .route("/analytics/projects", get(project_report))
        .route("/analytics/customers", get(customer_report))
        .route("/analytics/weather", get(weather_report))
        .route("/analytics/insights", get(insights))
}

/// Identity forwarded by the gateway; authentication itself happens there.
#[derive(Debug, Deserialize)]
struct DashboardQuery {
    user_id: Option<i32>,
    #[serde(default)]
    role: String,
}

async fn dashboard(
    Extension(pool): Extension<AppDb>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<ApiResponse<DashboardMetrics>>, StatusCode> {
    let store = PgStore::new(pool);
    let metrics = reports::dashboard_metrics(&store, query.user_id, &query.role)
        .await
        .map_err(|e| status_for("Dashboard query failed", e))?;

    Ok(Json(ApiResponse {
        data: metrics,
        message: "Dashboard metrics".to_string(),
    }))
}

async fn lead_report(
    Extension(pool): Extension<AppDb>,
) -> Result<Json<ApiResponse<Vec<LeadAnalyticsReport>>>, StatusCode> {
    let store = PgStore::new(pool);
    let rows = reports::lead_analytics_report(&store)
        .await
        .map_err(|e| status_for("Lead report failed", e))?;

    Ok(Json(ApiResponse {
        data: rows,
        message: "Lead analytics".to_string(),
    }))
}

async fn project_report(
    Extension(pool): Extension<AppDb>,
) -> Result<Json<ApiResponse<Vec<ProjectAnalyticsReport>>>, StatusCode> {
    let store = PgStore::new(pool);
    let rows = reports::project_analytics_report(&store)
        .await
        .map_err(|e| status_for("Project report failed", e))?;

    Ok(Json(ApiResponse {
        data: rows,
        message: "Project analytics".to_string(),
    }))
}

async fn customer_report(
    Extension(pool): Extension<AppDb>,
) -> Result<Json<ApiResponse<Vec<CustomerAnalyticsReport>>>, StatusCode> {
    let store = PgStore::new(pool);
    let rows = reports::customer_analytics_report(&store)
        .await
        .map_err(|e| status_for("Customer report failed", e))?;

    Ok(Json(ApiResponse {
        data: rows,
        message: "Customer analytics".to_string(),
    }))
}

async fn weather_report(
    Extension(pool): Extension<AppDb>,
) -> Result<Json<ApiResponse<Vec<WeatherImpactReport>>>, StatusCode> {
    let store = PgStore::new(pool);
    let rows = reports::weather_impact_report(&store)
        .await
        .map_err(|e| status_for("Weather report failed", e))?;

    Ok(Json(ApiResponse {
        data: rows,
        message: "Weather impact analytics".to_string(),
    }))
}

async fn insights(
    Extension(pool): Extension<AppDb>,
) -> Result<Json<ApiResponse<Vec<PredictiveModelResult>>>, StatusCode> {
    let store = PgStore::new(pool);
    let rows = reports::predictive_insights(&store)
        .await
        .map_err(|e| status_for("Insights query failed", e))?;

    Ok(Json(ApiResponse {
        data: rows,
        message: "Predictive insights".to_string(),
    }))
}
