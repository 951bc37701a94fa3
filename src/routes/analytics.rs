//! Analytics mutation routes.
//!
//! POST /analytics/batch       - Run the full recomputation batch
//! POST /analytics/predictions - Generate one prediction
//! POST /analytics/aggregates  - Regenerate one metric at one granularity

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Extension, Json, Router};
use tracing::{error, info};

use crate::aggregate;
use crate::batch;
use crate::db::AppDb;
use crate::error::AnalyticsError;
use crate::models::{
    AggregateRequest, ApiResponse, BatchSummary, PredictionRequest, PredictiveModelResult,
    TimeBasedAggregate,
};
use crate::predict;
use crate::scoring::ThreadRngSource;
use crate::store::PgStore;

/// Build the analytics mutation router.
pub fn router() -> Router {
    Router::new()
        .route("/analytics/batch", post(run_batch))
        .route("/analytics/predictions", post(generate_prediction))
        .route("/analytics/aggregates", post(generate_aggregate))
}

/// Map an engine error to a response status, logging the failure.
pub fn status_for(context: &str, err: AnalyticsError) -> StatusCode {
    match err {
        AnalyticsError::Validation(_) => {
            error!("{context}: {err}");
            StatusCode::BAD_REQUEST
        }
        AnalyticsError::NotFound { .. } => {
            error!("{context}: {err}");
            StatusCode::NOT_FOUND
        }
        AnalyticsError::Store(_) => {
            error!("{context}: {err}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Run the full batch: reconcile every entity, generate the capped
/// prediction set, regenerate all monthly aggregates.
async fn run_batch(
    Extension(pool): Extension<AppDb>,
) -> Result<Json<ApiResponse<BatchSummary>>, StatusCode> {
    let store = PgStore::new(pool);
    let mut rng = ThreadRngSource;

    let summary = batch::run_batch(&store, &mut rng)
        .await
        .map_err(|e| status_for("Batch run failed", e))?;

    info!(
        "Batch complete: {} leads, {} projects, {} customers, {} weather events",
        summary.leads_processed,
        summary.projects_processed,
        summary.customers_processed,
        summary.weather_events_processed
    );

    Ok(Json(ApiResponse {
        data: summary,
        message: "Batch run complete".to_string(),
    }))
}

/// Generate a single prediction for one entity.
async fn generate_prediction(
    Extension(pool): Extension<AppDb>,
    Json(req): Json<PredictionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PredictiveModelResult>>), StatusCode> {
    let store = PgStore::new(pool);
    let mut rng = ThreadRngSource;

    let result = predict::generate_prediction(&store, &req, &mut rng)
        .await
        .map_err(|e| status_for("Prediction failed", e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: result,
            message: "Prediction stored".to_string(),
        }),
    ))
}

/// Regenerate one time-based aggregate. Appends new bucket rows.
async fn generate_aggregate(
    Extension(pool): Extension<AppDb>,
    Json(req): Json<AggregateRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<TimeBasedAggregate>>>), StatusCode> {
    let store = PgStore::new(pool);

    let rows = aggregate::generate_aggregate_named(&store, &req.metric_name, &req.aggregation_level)
        .await
        .map_err(|e| status_for("Aggregation failed", e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: rows,
            message: "Aggregates regenerated".to_string(),
        }),
    ))
}
