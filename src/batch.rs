//! # Batch Orchestrator
//!
//! Runs the full recomputation pipeline in a fixed sequence: reconcile every
//! lead, project, customer, and weather event, generate a capped set of
//! predictions, then regenerate all monthly aggregates. Each entity is
//! processed to completion before the next begins, the first unrecovered
//! failure aborts the run, and work committed by earlier phases stays
//! committed (no cross-phase transaction).

use tracing::info;

use crate::aggregate::{self, AggregationLevel, ALL_METRICS};
use crate::error::Result;
use crate::models::{BatchSummary, PredictionRequest};
use crate::predict::{self, EntityType};
use crate::reconcile;
use crate::scoring::RandomSource;
use crate::store::Store;

/// Leads given a conversion prediction per run, in id order.
const PREDICTED_LEADS: usize = 10;
/// Customers given a churn prediction per run, in id order.
const PREDICTED_CUSTOMERS: usize = 5;
/// Projects given a cost-overrun prediction per run, in id order.
const PREDICTED_PROJECTS: usize = 5;

const DEFAULT_EXPIRATION_DAYS: i64 = 30;

fn prediction_request(
    model_name: &str,
    entity_type: EntityType,
    entity_id: i32,
    prediction_type: &str,
) -> PredictionRequest {
    PredictionRequest {
        model_name: model_name.to_string(),
        entity_type: entity_type.as_str().to_string(),
        entity_id,
        prediction_type: prediction_type.to_string(),
        expiration_days: DEFAULT_EXPIRATION_DAYS,
    }
}

/// Run the whole analytics batch and return summary counts.
pub async fn run_batch<S: Store>(store: &S, rng: &mut dyn RandomSource) -> Result<BatchSummary> {
    let mut summary = BatchSummary::default();

    let leads = store.leads().await?;
    for lead in &leads {
        reconcile::reconcile_lead(store, lead).await?;
        summary.leads_processed += 1;
    }
    info!("Reconciled {} leads", summary.leads_processed);

    let projects = store.projects().await?;
    for project in &projects {
        reconcile::reconcile_project(store, project, rng).await?;
        summary.projects_processed += 1;
    }
    info!("Reconciled {} projects", summary.projects_processed);

    let customers = store.customers().await?;
    for customer in &customers {
        reconcile::reconcile_customer(store, customer, rng).await?;
        summary.customers_processed += 1;
    }
    info!("Reconciled {} customers", summary.customers_processed);

    for event in store.weather_events().await? {
        reconcile::reconcile_weather_event(store, &event).await?;
        summary.weather_events_processed += 1;
    }
    info!(
        "Reconciled {} weather events",
        summary.weather_events_processed
    );

    for lead in leads.iter().take(PREDICTED_LEADS) {
        let request = prediction_request(
            "lead_conversion_model",
            EntityType::Lead,
            lead.id,
            "conversion_probability",
        );
        predict::generate_prediction(store, &request, rng).await?;
        summary.predictions_generated += 1;
    }

    for customer in customers.iter().take(PREDICTED_CUSTOMERS) {
        let request = prediction_request(
            "churn_prediction_model",
            EntityType::Customer,
            customer.id,
            "churn_probability",
        );
        predict::generate_prediction(store, &request, rng).await?;
        summary.predictions_generated += 1;
    }

    for project in projects.iter().take(PREDICTED_PROJECTS) {
        let request = prediction_request(
            "cost_overrun_model",
            EntityType::Project,
            project.id,
            "cost_overrun_risk",
        );
        predict::generate_prediction(store, &request, rng).await?;
        summary.predictions_generated += 1;
    }
    info!("Generated {} predictions", summary.predictions_generated);

    for metric in ALL_METRICS {
        let rows = aggregate::generate_aggregate(store, metric, AggregationLevel::Monthly).await?;
        summary.aggregates_generated += rows.len();
    }
    info!("Generated {} aggregate buckets", summary.aggregates_generated);

    Ok(summary)
}
