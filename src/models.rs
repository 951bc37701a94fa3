//! Domain models for the Roofline analytics engine.
//!
//! Source entities (leads, projects, customers, weather events, the business
//! metrics ledger) are read-only to this crate; the analytics tables are
//! owned and mutated exclusively by it. Each analytics row keeps a foreign
//! key back to its source entity plus created_at/updated_at bookkeeping.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ============================================================================
// Source Entities (sqlx::FromRow, read-only)
// ============================================================================

/// A sales lead captured by the intake side of the platform.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Lead {
    pub id: i32,
    pub source: Option<String>,
    pub service_interest: Option<String>,
    pub status: String,
    /// Business-entered score, 0-100 once set. Distinct from the computed
    /// lead_score in `LeadAnalytics`.
    pub score: Option<f64>,
    pub created_at: NaiveDateTime,
}

/// A contracted job for a customer's property.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: i32,
    pub customer_id: i32,
    pub property_id: i32,
    pub project_type: String,
    pub status: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub contract_amount: f64,
    pub created_at: NaiveDateTime,
}

/// A customer account. Projects reference it via customer_id.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Customer {
    pub id: i32,
    pub name: String,
    pub created_at: NaiveDateTime,
}

/// A severe-weather event relevant to the service area.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WeatherEvent {
    pub id: i32,
    pub event_type: String,
    pub severity: f64,
    pub zip: String,
    pub event_date: NaiveDate,
}

/// One row of the generic business-metrics ledger (revenue, profit, ...).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BusinessMetric {
    pub id: i32,
    pub metric_name: String,
    pub value: f64,
    pub recorded_at: NaiveDateTime,
}

// ============================================================================
// Derived Analytics Rows (owned by this crate)
// ============================================================================

/// Computed lead metrics, one row per lead. The conversion tracking fields
/// (days_to_conversion, converted_to_customer, conversion_date) are written
/// by the sales pipeline and must survive recomputation untouched.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LeadAnalytics {
    pub id: i32,
    pub lead_id: i32,
    pub acquisition_source: Option<String>,
    pub acquisition_cost: f64,
    pub lead_score: f64,
    pub conversion_probability: f64,
    pub days_to_conversion: Option<i32>,
    pub converted_to_customer: bool,
    pub conversion_date: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Computed project cost/duration metrics, one row per project.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectAnalytics {
    pub id: i32,
    pub project_id: i32,
    pub estimated_cost: f64,
    pub actual_cost: f64,
    pub cost_variance_percent: f64,
    pub estimated_duration: i32,
    pub actual_duration: i32,
    pub duration_variance_percent: f64,
    pub profit_margin: f64,
    pub weather_impact_score: f64,
    pub customer_satisfaction_score: f64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Computed customer value/retention metrics, one row per customer.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CustomerAnalytics {
    pub id: i32,
    pub customer_id: i32,
    pub lifetime_value: f64,
    pub acquisition_cost: f64,
    pub retention_score: f64,
    pub churn_probability: f64,
    pub referral_count: i32,
    pub project_count: i32,
    pub average_project_value: f64,
    pub last_interaction_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Estimated business impact of one weather event.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WeatherImpactAnalytics {
    pub id: i32,
    pub weather_event_id: i32,
    pub leads_generated: i32,
    pub projects_created: i32,
    pub revenue_impact: f64,
    /// JSON array of affected zip codes.
    pub affected_zip_codes: serde_json::Value,
    pub impact_start_date: NaiveDate,
    pub impact_end_date: NaiveDate,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Stored output of one prediction strategy run. Unique per
/// (model_name, entity_type, entity_id, prediction_type); a repeated run
/// updates the row in place, so this table holds current values only.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PredictiveModelResult {
    pub id: i32,
    pub model_name: String,
    pub entity_type: String,
    pub entity_id: i32,
    pub prediction_type: String,
    pub prediction_value: f64,
    pub confidence_score: f64,
    /// JSON object mapping feature name -> weight (always 1).
    pub features_used: serde_json::Value,
    pub prediction_date: NaiveDateTime,
    pub expiration_date: NaiveDateTime,
}

/// One time-bucketed aggregate value. NOT uniquely keyed: regeneration
/// appends new rows rather than replacing old ones.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TimeBasedAggregate {
    pub id: i32,
    pub metric_name: String,
    pub aggregation_level: String,
    pub period_start: NaiveDateTime,
    pub period_end: NaiveDateTime,
    pub value: f64,
    pub dimension: Option<String>,
    pub dimension_value: Option<String>,
    pub created_at: NaiveDateTime,
}

// ============================================================================
// Insert Payloads (id and timestamps assigned by the store)
// ============================================================================

#[derive(Debug, Clone)]
pub struct NewLeadAnalytics {
    pub lead_id: i32,
    pub acquisition_source: Option<String>,
    pub acquisition_cost: f64,
    pub lead_score: f64,
    pub conversion_probability: f64,
}

#[derive(Debug, Clone)]
pub struct NewProjectAnalytics {
    pub project_id: i32,
    pub estimated_cost: f64,
    pub actual_cost: f64,
    pub cost_variance_percent: f64,
    pub estimated_duration: i32,
    pub actual_duration: i32,
    pub duration_variance_percent: f64,
    pub profit_margin: f64,
    pub weather_impact_score: f64,
    pub customer_satisfaction_score: f64,
}

#[derive(Debug, Clone)]
pub struct NewCustomerAnalytics {
    pub customer_id: i32,
    pub lifetime_value: f64,
    pub acquisition_cost: f64,
    pub retention_score: f64,
    pub churn_probability: f64,
    pub referral_count: i32,
    pub project_count: i32,
    pub average_project_value: f64,
    pub last_interaction_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct NewWeatherImpactAnalytics {
    pub weather_event_id: i32,
    pub leads_generated: i32,
    pub projects_created: i32,
    pub revenue_impact: f64,
    pub affected_zip_codes: serde_json::Value,
    pub impact_start_date: NaiveDate,
    pub impact_end_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct NewPrediction {
    pub model_name: String,
    pub entity_type: String,
    pub entity_id: i32,
    pub prediction_type: String,
    pub prediction_value: f64,
    pub confidence_score: f64,
    pub features_used: serde_json::Value,
    pub prediction_date: NaiveDateTime,
    pub expiration_date: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewAggregate {
    pub metric_name: String,
    pub aggregation_level: String,
    pub period_start: NaiveDateTime,
    pub period_end: NaiveDateTime,
    pub value: f64,
    pub dimension: Option<String>,
    pub dimension_value: Option<String>,
}

// ============================================================================
// Request Models (Deserialize from JSON input)
// ============================================================================

/// Request body for generating a single prediction.
#[derive(Debug, Deserialize)]
pub struct PredictionRequest {
    pub model_name: String,
    pub entity_type: String,
    pub entity_id: i32,
    pub prediction_type: String,
    /// Days until the stored result expires.
    #[serde(default = "default_expiration_days")]
    pub expiration_days: i64,
}

fn default_expiration_days() -> i64 {
    30
}

/// Request body for regenerating one time-based aggregate.
#[derive(Debug, Deserialize)]
pub struct AggregateRequest {
    pub metric_name: String,
    pub aggregation_level: String,
}

// ============================================================================
// Report Rows (analytics joined with their source entity)
// ============================================================================

/// Lead analytics joined with the lead, ranked by lead_score.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LeadAnalyticsReport {
    pub lead_id: i32,
    pub source: Option<String>,
    pub service_interest: Option<String>,
    pub status: String,
    pub lead_score: f64,
    pub acquisition_source: Option<String>,
    pub acquisition_cost: f64,
    pub conversion_probability: f64,
    pub converted_to_customer: bool,
    pub lead_created_at: NaiveDateTime,
}

/// Project analytics joined with the project, ranked by project recency.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProjectAnalyticsReport {
    pub project_id: i32,
    pub project_type: String,
    pub status: String,
    pub contract_amount: f64,
    pub estimated_cost: f64,
    pub actual_cost: f64,
    pub cost_variance_percent: f64,
    pub profit_margin: f64,
    pub project_created_at: NaiveDateTime,
}

/// Customer analytics joined with the customer, ranked by lifetime value.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CustomerAnalyticsReport {
    pub customer_id: i32,
    pub name: String,
    pub lifetime_value: f64,
    pub retention_score: f64,
    pub churn_probability: f64,
    pub project_count: i32,
    pub average_project_value: f64,
}

/// Weather impact analytics joined with the event, ranked by impact start.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WeatherImpactReport {
    pub weather_event_id: i32,
    pub event_type: String,
    pub severity: f64,
    pub zip: String,
    pub leads_generated: i32,
    pub projects_created: i32,
    pub revenue_impact: f64,
    pub impact_start_date: NaiveDate,
    pub impact_end_date: NaiveDate,
}

// ============================================================================
// Response Models
// ============================================================================

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub message: String,
}

/// Summary counts returned by a full batch run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct BatchSummary {
    pub leads_processed: usize,
    pub projects_processed: usize,
    pub customers_processed: usize,
    pub weather_events_processed: usize,
    pub predictions_generated: usize,
    pub aggregates_generated: usize,
}

/// Revenue impact rolled up by weather event type.
#[derive(Debug, Clone, Serialize)]
pub struct WeatherImpactByType {
    pub event_type: String,
    pub event_count: usize,
    pub total_revenue_impact: f64,
}

/// One point of the monthly revenue series (admin/manager dashboards only).
#[derive(Debug, Clone, Serialize)]
pub struct RevenuePoint {
    pub month: NaiveDate,
    pub revenue: f64,
}

/// Aggregate view backing the reporting dashboard.
#[derive(Debug, Serialize)]
pub struct DashboardMetrics {
    pub lead_conversion_rate: f64,
    pub average_profit_margin: f64,
    pub average_lifetime_value: f64,
    pub weather_impact_by_type: Vec<WeatherImpactByType>,
    pub recent_metrics: Vec<BusinessMetric>,
    /// Last-12-months revenue series; present for admin/manager roles only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_revenue: Option<Vec<RevenuePoint>>,
}
