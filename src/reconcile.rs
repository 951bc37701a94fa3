//! # Analytics Reconcilers
//!
//! One reconciler per entity kind. Each computes the entity's derived
//! metrics, then checks for an existing analytics row by foreign key:
//! found rows get their computed fields rewritten in place, missing rows
//! are inserted with defaults for the fields only later pipeline stages can
//! fill (lead conversion tracking). The read-then-write pair is not wrapped
//! in a transaction; at most one reconciliation run may be active at a time.

use chrono::Utc;
use serde_json::json;
use tracing::debug;

use crate::error::Result;
use crate::models::{
    Customer, CustomerAnalytics, Lead, LeadAnalytics, NewCustomerAnalytics, NewLeadAnalytics,
    NewProjectAnalytics, NewWeatherImpactAnalytics, Project, ProjectAnalytics, WeatherEvent,
    WeatherImpactAnalytics,
};
use crate::scoring::{self, RandomSource};
use crate::store::Store;

/// Recompute and persist analytics for one lead.
///
/// Conversion tracking fields (days_to_conversion, converted_to_customer,
/// conversion_date) are written by the sales pipeline and pass through
/// updates untouched.
pub async fn reconcile_lead<S: Store>(store: &S, lead: &Lead) -> Result<LeadAnalytics> {
    let lead_score = scoring::lead_score(lead);
    let acquisition_cost = scoring::lead_acquisition_cost(lead.source.as_deref());
    let conversion_probability = scoring::conversion_probability(lead_score);

    match store.lead_analytics_for(lead.id).await? {
        Some(mut existing) => {
            existing.acquisition_source = lead.source.clone();
            existing.acquisition_cost = acquisition_cost;
            existing.lead_score = lead_score;
            existing.conversion_probability = conversion_probability;
            let stored = store.update_lead_analytics(&existing).await?;
            debug!("Updated lead analytics for lead {}", lead.id);
            Ok(stored)
        }
        None => {
            let stored = store
                .insert_lead_analytics(NewLeadAnalytics {
                    lead_id: lead.id,
                    acquisition_source: lead.source.clone(),
                    acquisition_cost,
                    lead_score,
                    conversion_probability,
                })
                .await?;
            debug!("Inserted lead analytics for lead {}", lead.id);
            Ok(stored)
        }
    }
}

/// Recompute and persist cost/duration analytics for one project.
pub async fn reconcile_project<S: Store>(
    store: &S,
    project: &Project,
    rng: &mut dyn RandomSource,
) -> Result<ProjectAnalytics> {
    let costing = scoring::project_costing(project, rng);

    match store.project_analytics_for(project.id).await? {
        Some(mut existing) => {
            existing.estimated_cost = costing.estimated_cost;
            existing.actual_cost = costing.actual_cost;
            existing.cost_variance_percent = costing.cost_variance_percent;
            existing.estimated_duration = costing.estimated_duration;
            existing.actual_duration = costing.actual_duration;
            existing.duration_variance_percent = costing.duration_variance_percent;
            existing.profit_margin = costing.profit_margin;
            existing.weather_impact_score = costing.weather_impact_score;
            existing.customer_satisfaction_score = costing.customer_satisfaction_score;
            let stored = store.update_project_analytics(&existing).await?;
            debug!("Updated project analytics for project {}", project.id);
            Ok(stored)
        }
        None => {
            let stored = store
                .insert_project_analytics(NewProjectAnalytics {
                    project_id: project.id,
                    estimated_cost: costing.estimated_cost,
                    actual_cost: costing.actual_cost,
                    cost_variance_percent: costing.cost_variance_percent,
                    estimated_duration: costing.estimated_duration,
                    actual_duration: costing.actual_duration,
                    duration_variance_percent: costing.duration_variance_percent,
                    profit_margin: costing.profit_margin,
                    weather_impact_score: costing.weather_impact_score,
                    customer_satisfaction_score: costing.customer_satisfaction_score,
                })
                .await?;
            debug!("Inserted project analytics for project {}", project.id);
            Ok(stored)
        }
    }
}

/// Recompute and persist value/retention analytics for one customer from
/// their project history.
pub async fn reconcile_customer<S: Store>(
    store: &S,
    customer: &Customer,
    rng: &mut dyn RandomSource,
) -> Result<CustomerAnalytics> {
    let projects = store.projects_for_customer(customer.id).await?;
    let value = scoring::customer_value(&projects, Utc::now().date_naive(), rng);

    match store.customer_analytics_for(customer.id).await? {
        Some(mut existing) => {
            existing.lifetime_value = value.lifetime_value;
            existing.acquisition_cost = value.acquisition_cost;
            existing.retention_score = value.retention_score;
            existing.churn_probability = value.churn_probability;
            existing.referral_count = value.referral_count;
            existing.project_count = value.project_count;
            existing.average_project_value = value.average_project_value;
            existing.last_interaction_date = value.last_interaction_date;
            let stored = store.update_customer_analytics(&existing).await?;
            debug!("Updated customer analytics for customer {}", customer.id);
            Ok(stored)
        }
        None => {
            let stored = store
                .insert_customer_analytics(NewCustomerAnalytics {
                    customer_id: customer.id,
                    lifetime_value: value.lifetime_value,
                    acquisition_cost: value.acquisition_cost,
                    retention_score: value.retention_score,
                    churn_probability: value.churn_probability,
                    referral_count: value.referral_count,
                    project_count: value.project_count,
                    average_project_value: value.average_project_value,
                    last_interaction_date: value.last_interaction_date,
                })
                .await?;
            debug!("Inserted customer analytics for customer {}", customer.id);
            Ok(stored)
        }
    }
}

/// Recompute and persist impact analytics for one weather event.
pub async fn reconcile_weather_event<S: Store>(
    store: &S,
    event: &WeatherEvent,
) -> Result<WeatherImpactAnalytics> {
    let impact = scoring::weather_impact(event);
    let affected_zip_codes = json!([event.zip]);

    match store.weather_impact_for(event.id).await? {
        Some(mut existing) => {
            existing.leads_generated = impact.leads_generated;
            existing.projects_created = impact.projects_created;
            existing.revenue_impact = impact.revenue_impact;
            existing.affected_zip_codes = affected_zip_codes;
            existing.impact_start_date = impact.impact_start_date;
            existing.impact_end_date = impact.impact_end_date;
            let stored = store.update_weather_impact(&existing).await?;
            debug!("Updated weather impact for event {}", event.id);
            Ok(stored)
        }
        None => {
            let stored = store
                .insert_weather_impact(NewWeatherImpactAnalytics {
                    weather_event_id: event.id,
                    leads_generated: impact.leads_generated,
                    projects_created: impact.projects_created,
                    revenue_impact: impact.revenue_impact,
                    affected_zip_codes,
                    impact_start_date: impact.impact_start_date,
                    impact_end_date: impact.impact_end_date,
                })
                .await?;
            debug!("Inserted weather impact for event {}", event.id);
            Ok(stored)
        }
    }
}
