//! # Prediction Dispatcher
//!
//! Resolves a (model name, prediction type) pair to an explicit strategy,
//! computes a placeholder prediction for one entity, and upserts the result
//! keyed by (model, entity type, entity id, prediction type). Strategies
//! that find the entity's analytics row derive the value from it and report
//! higher confidence; otherwise they fall back to a randomized estimate with
//! a reduced feature set.

use std::str::FromStr;

use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tracing::info;

use crate::error::{AnalyticsError, Result};
use crate::models::{NewPrediction, PredictionRequest, PredictiveModelResult};
use crate::scoring::RandomSource;
use crate::store::Store;

/// Longest allowed prediction lifetime, in days.
const MAX_EXPIRATION_DAYS: i64 = 3650;

// ============================================================================
// Entity Types and Strategies
// ============================================================================

/// Entity kinds predictions can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityType {
    Lead,
    Customer,
    Project,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lead => "lead",
            Self::Customer => "customer",
            Self::Project => "project",
        }
    }
}

impl FromStr for EntityType {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "lead" => Ok(Self::Lead),
            "customer" => Ok(Self::Customer),
            "project" => Ok(Self::Project),
            other => Err(AnalyticsError::validation(format!(
                "unknown entity type: {other}"
            ))),
        }
    }
}

/// The defined prediction strategies. Anything outside the three named
/// (model, prediction type) pairs runs the generic baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionStrategy {
    LeadConversion,
    CustomerChurn,
    ProjectCostOverrun,
    Generic,
}

impl PredictionStrategy {
    /// Exact-match lookup on the (model name, prediction type) pair.
    pub fn select(model_name: &str, prediction_type: &str) -> Self {
        match (model_name, prediction_type) {
            ("lead_conversion_model", "conversion_probability") => Self::LeadConversion,
            ("churn_prediction_model", "churn_probability") => Self::CustomerChurn,
            ("cost_overrun_model", "cost_overrun_risk") => Self::ProjectCostOverrun,
            _ => Self::Generic,
        }
    }
}

/// Computed strategy output prior to persistence.
struct Outcome {
    value: f64,
    confidence: f64,
    features: Value,
}

async fn run_strategy<S: Store>(
    store: &S,
    strategy: PredictionStrategy,
    entity_id: i32,
    rng: &mut dyn RandomSource,
) -> Result<Outcome> {
    let outcome = match strategy {
        PredictionStrategy::LeadConversion => match store.lead_analytics_for(entity_id).await? {
            Some(analytics) => Outcome {
                value: analytics.conversion_probability,
                confidence: 0.85,
                features: json!({
                    "lead_score": 1,
                    "acquisition_cost": 1,
                    "conversion_probability": 1
                }),
            },
            None => Outcome {
                value: rng.uniform(0.2, 0.6),
                confidence: 0.65,
                features: json!({ "acquisition_source": 1 }),
            },
        },
        PredictionStrategy::CustomerChurn => {
            match store.customer_analytics_for(entity_id).await? {
                Some(analytics) => Outcome {
                    value: analytics.churn_probability,
                    confidence: 0.82,
                    features: json!({
                        "retention_score": 1,
                        "project_count": 1,
                        "lifetime_value": 1
                    }),
                },
                None => Outcome {
                    value: rng.uniform(0.3, 0.7),
                    confidence: 0.6,
                    features: json!({ "project_count": 1 }),
                },
            }
        }
        PredictionStrategy::ProjectCostOverrun => {
            match store.project_analytics_for(entity_id).await? {
                Some(analytics) => Outcome {
                    value: (0.5 + analytics.cost_variance_percent / 100.0).clamp(0.0, 1.0),
                    confidence: 0.8,
                    features: json!({
                        "cost_variance_percent": 1,
                        "profit_margin": 1,
                        "estimated_cost": 1
                    }),
                },
                None => Outcome {
                    value: rng.uniform(0.2, 0.8),
                    confidence: 0.7,
                    features: json!({ "contract_amount": 1 }),
                },
            }
        }
        PredictionStrategy::Generic => Outcome {
            value: rng.uniform(0.0, 1.0),
            confidence: 0.5,
            features: json!({ "baseline": 1 }),
        },
    };
    Ok(outcome)
}

// ============================================================================
// Dispatch
// ============================================================================

/// Generate one prediction and upsert it by its four-part key.
///
/// Fails with a validation error for an unknown entity type or an
/// out-of-range `expiration_days`, and with not-found if the target entity
/// does not exist. A repeated call with the
/// same key updates the stored row rather than appending a new one.
pub async fn generate_prediction<S: Store>(
    store: &S,
    request: &PredictionRequest,
    rng: &mut dyn RandomSource,
) -> Result<PredictiveModelResult> {
    let entity_type = EntityType::from_str(&request.entity_type)?;

    if !(1..=MAX_EXPIRATION_DAYS).contains(&request.expiration_days) {
        return Err(AnalyticsError::validation(format!(
            "expiration_days must be between 1 and {MAX_EXPIRATION_DAYS}, got {}",
            request.expiration_days
        )));
    }

    let exists = match entity_type {
        EntityType::Lead => store.lead_by_id(request.entity_id).await?.is_some(),
        EntityType::Customer => store.customer_by_id(request.entity_id).await?.is_some(),
        EntityType::Project => store.project_by_id(request.entity_id).await?.is_some(),
    };
    if !exists {
        return Err(AnalyticsError::not_found(
            entity_type.as_str(),
            request.entity_id,
        ));
    }

    let strategy = PredictionStrategy::select(&request.model_name, &request.prediction_type);
    let outcome = run_strategy(store, strategy, request.entity_id, rng).await?;

    let prediction_date = Utc::now().naive_utc();
    let expiration_date = prediction_date + Duration::days(request.expiration_days);

    let stored = match store
        .prediction_for(
            &request.model_name,
            entity_type.as_str(),
            request.entity_id,
            &request.prediction_type,
        )
        .await?
    {
        Some(mut existing) => {
            existing.prediction_value = outcome.value;
            existing.confidence_score = outcome.confidence;
            existing.features_used = outcome.features;
            existing.prediction_date = prediction_date;
            existing.expiration_date = expiration_date;
            store.update_prediction(&existing).await?
        }
        None => {
            store
                .insert_prediction(NewPrediction {
                    model_name: request.model_name.clone(),
                    entity_type: entity_type.as_str().to_string(),
                    entity_id: request.entity_id,
                    prediction_type: request.prediction_type.clone(),
                    prediction_value: outcome.value,
                    confidence_score: outcome.confidence,
                    features_used: outcome.features,
                    prediction_date,
                    expiration_date,
                })
                .await?
        }
    };

    info!(
        "Prediction {}/{} for {} {}: value={:.4} confidence={:.2}",
        request.model_name,
        request.prediction_type,
        entity_type.as_str(),
        request.entity_id,
        stored.prediction_value,
        stored.confidence_score
    );
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_pairs_select_their_strategy() {
        assert_eq!(
            PredictionStrategy::select("lead_conversion_model", "conversion_probability"),
            PredictionStrategy::LeadConversion
        );
        assert_eq!(
            PredictionStrategy::select("churn_prediction_model", "churn_probability"),
            PredictionStrategy::CustomerChurn
        );
        assert_eq!(
            PredictionStrategy::select("cost_overrun_model", "cost_overrun_risk"),
            PredictionStrategy::ProjectCostOverrun
        );
    }

    #[test]
    fn partial_matches_fall_through_to_generic() {
        assert_eq!(
            PredictionStrategy::select("lead_conversion_model", "churn_probability"),
            PredictionStrategy::Generic
        );
        assert_eq!(
            PredictionStrategy::select("revenue_forecast_model", "next_quarter"),
            PredictionStrategy::Generic
        );
    }

    #[test]
    fn entity_type_parsing() {
        assert_eq!(EntityType::from_str("lead").unwrap(), EntityType::Lead);
        assert!(EntityType::from_str("weather_event").is_err());
    }
}
