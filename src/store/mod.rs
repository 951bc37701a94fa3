//! Persistence seam for the analytics engine.
//!
//! Every component receives a [`Store`] at the call site instead of reaching
//! for a shared global connection. The production implementation is
//! [`postgres::PgStore`]; [`memory::MemoryStore`] backs the test suite.
//!
//! Ordering contracts the orchestrator relies on: `leads`, `projects`, and
//! `customers` return rows ordered by id ascending, so "first N" selections
//! are stable across runs.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::error::Result;
use crate::models::{
    BusinessMetric, Customer, CustomerAnalytics, CustomerAnalyticsReport, Lead, LeadAnalytics,
    LeadAnalyticsReport, NewAggregate, NewCustomerAnalytics, NewLeadAnalytics, NewPrediction,
    NewProjectAnalytics, NewWeatherImpactAnalytics, PredictiveModelResult, Project,
    ProjectAnalytics, ProjectAnalyticsReport, TimeBasedAggregate, WeatherEvent,
    WeatherImpactAnalytics, WeatherImpactReport,
};

pub use postgres::PgStore;

/// Read access to the primary business tables and full ownership of the
/// analytics tables. Insert methods assign ids and timestamps and return the
/// stored row; update methods overwrite every non-key field of the given row.
#[async_trait]
pub trait Store: Send + Sync {
    // ------------------------------------------------------------------
    // Source entities (read-only)
    // ------------------------------------------------------------------

    async fn leads(&self) -> Result<Vec<Lead>>;
    async fn lead_by_id(&self, id: i32) -> Result<Option<Lead>>;
    async fn projects(&self) -> Result<Vec<Project>>;
    async fn project_by_id(&self, id: i32) -> Result<Option<Project>>;
    async fn customers(&self) -> Result<Vec<Customer>>;
    async fn customer_by_id(&self, id: i32) -> Result<Option<Customer>>;
    async fn projects_for_customer(&self, customer_id: i32) -> Result<Vec<Project>>;
    async fn weather_events(&self) -> Result<Vec<WeatherEvent>>;
    async fn business_metrics_named(&self, metric_name: &str) -> Result<Vec<BusinessMetric>>;
    async fn recent_business_metrics(&self, limit: i64) -> Result<Vec<BusinessMetric>>;

    // ------------------------------------------------------------------
    // Lead analytics
    // ------------------------------------------------------------------

    async fn lead_analytics_for(&self, lead_id: i32) -> Result<Option<LeadAnalytics>>;
    async fn insert_lead_analytics(&self, row: NewLeadAnalytics) -> Result<LeadAnalytics>;
    async fn update_lead_analytics(&self, row: &LeadAnalytics) -> Result<LeadAnalytics>;
    async fn lead_analytics_all(&self) -> Result<Vec<LeadAnalytics>>;

    // ------------------------------------------------------------------
    // Project analytics
    // ------------------------------------------------------------------

    async fn project_analytics_for(&self, project_id: i32) -> Result<Option<ProjectAnalytics>>;
    async fn insert_project_analytics(&self, row: NewProjectAnalytics)
        -> Result<ProjectAnalytics>;
    async fn update_project_analytics(&self, row: &ProjectAnalytics) -> Result<ProjectAnalytics>;
    async fn project_analytics_all(&self) -> Result<Vec<ProjectAnalytics>>;

    // ------------------------------------------------------------------
    // Customer analytics
    // ------------------------------------------------------------------

    async fn customer_analytics_for(&self, customer_id: i32)
        -> Result<Option<CustomerAnalytics>>;
    async fn insert_customer_analytics(
        &self,
        row: NewCustomerAnalytics,
    ) -> Result<CustomerAnalytics>;
    async fn update_customer_analytics(
        &self,
        row: &CustomerAnalytics,
    ) -> Result<CustomerAnalytics>;
    async fn customer_analytics_all(&self) -> Result<Vec<CustomerAnalytics>>;

    // ------------------------------------------------------------------
    // Weather impact analytics
    // ------------------------------------------------------------------

    async fn weather_impact_for(
        &self,
        weather_event_id: i32,
    ) -> Result<Option<WeatherImpactAnalytics>>;
    async fn insert_weather_impact(
        &self,
        row: NewWeatherImpactAnalytics,
    ) -> Result<WeatherImpactAnalytics>;
    async fn update_weather_impact(
        &self,
        row: &WeatherImpactAnalytics,
    ) -> Result<WeatherImpactAnalytics>;
    async fn weather_impact_all(&self) -> Result<Vec<WeatherImpactAnalytics>>;

    // ------------------------------------------------------------------
    // Predictions
    // ------------------------------------------------------------------

    async fn prediction_for(
        &self,
        model_name: &str,
        entity_type: &str,
        entity_id: i32,
        prediction_type: &str,
    ) -> Result<Option<PredictiveModelResult>>;
    async fn insert_prediction(&self, row: NewPrediction) -> Result<PredictiveModelResult>;
    async fn update_prediction(
        &self,
        row: &PredictiveModelResult,
    ) -> Result<PredictiveModelResult>;
    /// Non-expired predictions as of `as_of`, newest first.
    async fn active_predictions(
        &self,
        as_of: NaiveDateTime,
        limit: i64,
    ) -> Result<Vec<PredictiveModelResult>>;

    // ------------------------------------------------------------------
    // Time-based aggregates
    // ------------------------------------------------------------------

    /// Appends unconditionally: there is no unique key on aggregates and
    /// regeneration is intentionally non-idempotent.
    async fn insert_aggregate(&self, row: NewAggregate) -> Result<TimeBasedAggregate>;
    async fn aggregates_named(
        &self,
        metric_name: &str,
        aggregation_level: &str,
    ) -> Result<Vec<TimeBasedAggregate>>;

    // ------------------------------------------------------------------
    // Report joins
    // ------------------------------------------------------------------

    async fn lead_report(&self, limit: i64) -> Result<Vec<LeadAnalyticsReport>>;
    async fn project_report(&self, limit: i64) -> Result<Vec<ProjectAnalyticsReport>>;
    async fn customer_report(&self, limit: i64) -> Result<Vec<CustomerAnalyticsReport>>;
    async fn weather_report(&self, limit: i64) -> Result<Vec<WeatherImpactReport>>;
}
