//! Postgres-backed [`Store`] implementation.
//!
//! Plain runtime-checked `sqlx::query_as` calls against the application
//! database; migrations in `./migrations` create every table touched here.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::PgPool;

use crate::error::Result;
use crate::models::{
    BusinessMetric, Customer, CustomerAnalytics, CustomerAnalyticsReport, Lead, LeadAnalytics,
    LeadAnalyticsReport, NewAggregate, NewCustomerAnalytics, NewLeadAnalytics, NewPrediction,
    NewProjectAnalytics, NewWeatherImpactAnalytics, PredictiveModelResult, Project,
    ProjectAnalytics, ProjectAnalyticsReport, TimeBasedAggregate, WeatherEvent,
    WeatherImpactAnalytics, WeatherImpactReport,
};
use crate::store::Store;

/// Thin wrapper over the shared connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    // ------------------------------------------------------------------
    // Source entities
    // ------------------------------------------------------------------

    async fn leads(&self) -> Result<Vec<Lead>> {
        let rows = sqlx::query_as("SELECT * FROM leads ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn lead_by_id(&self, id: i32) -> Result<Option<Lead>> {
        let row = sqlx::query_as("SELECT * FROM leads WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn projects(&self) -> Result<Vec<Project>> {
        let rows = sqlx::query_as("SELECT * FROM projects ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn project_by_id(&self, id: i32) -> Result<Option<Project>> {
        let row = sqlx::query_as("SELECT * FROM projects WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn customers(&self) -> Result<Vec<Customer>> {
        let rows = sqlx::query_as("SELECT * FROM customers ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn customer_by_id(&self, id: i32) -> Result<Option<Customer>> {
        let row = sqlx::query_as("SELECT * FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn projects_for_customer(&self, customer_id: i32) -> Result<Vec<Project>> {
        let rows = sqlx::query_as("SELECT * FROM projects WHERE customer_id = $1 ORDER BY id")
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn weather_events(&self) -> Result<Vec<WeatherEvent>> {
        let rows = sqlx::query_as("SELECT * FROM weather_events ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn business_metrics_named(&self, metric_name: &str) -> Result<Vec<BusinessMetric>> {
        let rows = sqlx::query_as(
            "SELECT * FROM business_metrics WHERE metric_name = $1 ORDER BY recorded_at",
        )
        .bind(metric_name)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn recent_business_metrics(&self, limit: i64) -> Result<Vec<BusinessMetric>> {
        let rows = sqlx::query_as("SELECT * FROM business_metrics ORDER BY recorded_at DESC LIMIT $1")
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    // ------------------------------------------------------------------
    // Lead analytics
    // ------------------------------------------------------------------

    async fn lead_analytics_for(&self, lead_id: i32) -> Result<Option<LeadAnalytics>> {
        let row = sqlx::query_as("SELECT * FROM lead_analytics WHERE lead_id = $1")
            .bind(lead_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert_lead_analytics(&self, row: NewLeadAnalytics) -> Result<LeadAnalytics> {
        let stored = sqlx::query_as(
            r#"
            INSERT INTO lead_analytics
                (lead_id, acquisition_source, acquisition_cost, lead_score, conversion_probability)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(row.lead_id)
        .bind(&row.acquisition_source)
        .bind(row.acquisition_cost)
        .bind(row.lead_score)
        .bind(row.conversion_probability)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    async fn update_lead_analytics(&self, row: &LeadAnalytics) -> Result<LeadAnalytics> {
        let stored = sqlx::query_as(
            r#"
            UPDATE lead_analytics
            SET acquisition_source = $1,
                acquisition_cost = $2,
                lead_score = $3,
                conversion_probability = $4,
                days_to_conversion = $5,
                converted_to_customer = $6,
                conversion_date = $7,
                updated_at = NOW()
            WHERE id = $8
            RETURNING *
            "#,
        )
        .bind(&row.acquisition_source)
        .bind(row.acquisition_cost)
        .bind(row.lead_score)
        .bind(row.conversion_probability)
        .bind(row.days_to_conversion)
        .bind(row.converted_to_customer)
        .bind(row.conversion_date)
        .bind(row.id)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    async fn lead_analytics_all(&self) -> Result<Vec<LeadAnalytics>> {
        let rows = sqlx::query_as("SELECT * FROM lead_analytics ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    // ------------------------------------------------------------------
    // Project analytics
    // ------------------------------------------------------------------

    async fn project_analytics_for(&self, project_id: i32) -> Result<Option<ProjectAnalytics>> {
        let row = sqlx::query_as("SELECT * FROM project_analytics WHERE project_id = $1")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert_project_analytics(
        &self,
        row: NewProjectAnalytics,
    ) -> Result<ProjectAnalytics> {
        let stored = sqlx::query_as(
            r#"
            INSERT INTO project_analytics
                (project_id, estimated_cost, actual_cost, cost_variance_percent,
                 estimated_duration, actual_duration, duration_variance_percent,
                 profit_margin, weather_impact_score, customer_satisfaction_score)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(row.project_id)
        .bind(row.estimated_cost)
        .bind(row.actual_cost)
        .bind(row.cost_variance_percent)
        .bind(row.estimated_duration)
        .bind(row.actual_duration)
        .bind(row.duration_variance_percent)
        .bind(row.profit_margin)
        .bind(row.weather_impact_score)
        .bind(row.customer_satisfaction_score)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    async fn update_project_analytics(&self, row: &ProjectAnalytics) -> Result<ProjectAnalytics> {
        let stored = sqlx::query_as(
            r#"
            UPDATE project_analytics
            SET estimated_cost = $1,
                actual_cost = $2,
                cost_variance_percent = $3,
                estimated_duration = $4,
                actual_duration = $5,
                duration_variance_percent = $6,
                profit_margin = $7,
                weather_impact_score = $8,
                customer_satisfaction_score = $9,
                updated_at = NOW()
            WHERE id = $10
            RETURNING *
            "#,
        )
        .bind(row.estimated_cost)
        .bind(row.actual_cost)
        .bind(row.cost_variance_percent)
        .bind(row.estimated_duration)
        .bind(row.actual_duration)
        .bind(row.duration_variance_percent)
        .bind(row.profit_margin)
        .bind(row.weather_impact_score)
        .bind(row.customer_satisfaction_score)
        .bind(row.id)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    async fn project_analytics_all(&self) -> Result<Vec<ProjectAnalytics>> {
        let rows = sqlx::query_as("SELECT * FROM project_analytics ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    // ------------------------------------------------------------------
    // Customer analytics
    // ------------------------------------------------------------------

    async fn customer_analytics_for(
        &self,
        customer_id: i32,
    ) -> Result<Option<CustomerAnalytics>> {
        let row = sqlx::query_as("SELECT * FROM customer_analytics WHERE customer_id = $1")
            .bind(customer_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert_customer_analytics(
        &self,
        row: NewCustomerAnalytics,
    ) -> Result<CustomerAnalytics> {
        let stored = sqlx::query_as(
            r#"
            INSERT INTO customer_analytics
                (customer_id, lifetime_value, acquisition_cost, retention_score,
                 churn_probability, referral_count, project_count,
                 average_project_value, last_interaction_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(row.customer_id)
        .bind(row.lifetime_value)
        .bind(row.acquisition_cost)
        .bind(row.retention_score)
        .bind(row.churn_probability)
        .bind(row.referral_count)
        .bind(row.project_count)
        .bind(row.average_project_value)
        .bind(row.last_interaction_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    async fn update_customer_analytics(
        &self,
        row: &CustomerAnalytics,
    ) -> Result<CustomerAnalytics> {
        let stored = sqlx::query_as(
            r#"
            UPDATE customer_analytics
            SET lifetime_value = $1,
                acquisition_cost = $2,
                retention_score = $3,
                churn_probability = $4,
                referral_count = $5,
                project_count = $6,
                average_project_value = $7,
                last_interaction_date = $8,
                updated_at = NOW()
            WHERE id = $9
            RETURNING *
            "#,
        )
        .bind(row.lifetime_value)
        .bind(row.acquisition_cost)
        .bind(row.retention_score)
        .bind(row.churn_probability)
        .bind(row.referral_count)
        .bind(row.project_count)
        .bind(row.average_project_value)
        .bind(row.last_interaction_date)
        .bind(row.id)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    async fn customer_analytics_all(&self) -> Result<Vec<CustomerAnalytics>> {
        let rows = sqlx::query_as("SELECT * FROM customer_analytics ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    // ------------------------------------------------------------------
    // Weather impact analytics
    // ------------------------------------------------------------------

    async fn weather_impact_for(
        &self,
        weather_event_id: i32,
    ) -> Result<Option<WeatherImpactAnalytics>> {
        let row =
            sqlx::query_as("SELECT * FROM weather_impact_analytics WHERE weather_event_id = $1")
                .bind(weather_event_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row)
    }

    async fn insert_weather_impact(
        &self,
        row: NewWeatherImpactAnalytics,
    ) -> Result<WeatherImpactAnalytics> {
        let stored = sqlx::query_as(
            r#"
            INSERT INTO weather_impact_analytics
                (weather_event_id, leads_generated, projects_created, revenue_impact,
                 affected_zip_codes, impact_start_date, impact_end_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(row.weather_event_id)
        .bind(row.leads_generated)
        .bind(row.projects_created)
        .bind(row.revenue_impact)
        .bind(&row.affected_zip_codes)
        .bind(row.impact_start_date)
        .bind(row.impact_end_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    async fn update_weather_impact(
        &self,
        row: &WeatherImpactAnalytics,
    ) -> Result<WeatherImpactAnalytics> {
        let stored = sqlx::query_as(
            r#"
            UPDATE weather_impact_analytics
            SET leads_generated = $1,
                projects_created = $2,
                revenue_impact = $3,
                affected_zip_codes = $4,
                impact_start_date = $5,
                impact_end_date = $6,
                updated_at = NOW()
            WHERE id = $7
            RETURNING *
            "#,
        )
        .bind(row.leads_generated)
        .bind(row.projects_created)
        .bind(row.revenue_impact)
        .bind(&row.affected_zip_codes)
        .bind(row.impact_start_date)
        .bind(row.impact_end_date)
        .bind(row.id)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    async fn weather_impact_all(&self) -> Result<Vec<WeatherImpactAnalytics>> {
        let rows = sqlx::query_as("SELECT * FROM weather_impact_analytics ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    // ------------------------------------------------------------------
    // Predictions
    // ------------------------------------------------------------------

    async fn prediction_for(
        &self,
        model_name: &str,
        entity_type: &str,
        entity_id: i32,
        prediction_type: &str,
    ) -> Result<Option<PredictiveModelResult>> {
        let row = sqlx::query_as(
            r#"
            SELECT * FROM predictive_model_results
            WHERE model_name = $1 AND entity_type = $2
              AND entity_id = $3 AND prediction_type = $4
            "#,
        )
        .bind(model_name)
        .bind(entity_type)
        .bind(entity_id)
        .bind(prediction_type)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_prediction(&self, row: NewPrediction) -> Result<PredictiveModelResult> {
        let stored = sqlx::query_as(
            r#"
            INSERT INTO predictive_model_results
                (model_name, entity_type, entity_id, prediction_type, prediction_value,
                 confidence_score, features_used, prediction_date, expiration_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&row.model_name)
        .bind(&row.entity_type)
        .bind(row.entity_id)
        .bind(&row.prediction_type)
        .bind(row.prediction_value)
        .bind(row.confidence_score)
        .bind(&row.features_used)
        .bind(row.prediction_date)
        .bind(row.expiration_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    async fn update_prediction(
        &self,
        row: &PredictiveModelResult,
    ) -> Result<PredictiveModelResult> {
        let stored = sqlx::query_as(
            r#"
            UPDATE predictive_model_results
            SET prediction_value = $1,
                confidence_score = $2,
                features_used = $3,
                prediction_date = $4,
                expiration_date = $5
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(row.prediction_value)
        .bind(row.confidence_score)
        .bind(&row.features_used)
        .bind(row.prediction_date)
        .bind(row.expiration_date)
        .bind(row.id)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    async fn active_predictions(
        &self,
        as_of: NaiveDateTime,
        limit: i64,
    ) -> Result<Vec<PredictiveModelResult>> {
        let rows = sqlx::query_as(
            r#"
            SELECT * FROM predictive_model_results
            WHERE expiration_date > $1
            ORDER BY prediction_date DESC
            LIMIT $2
            "#,
        )
        .bind(as_of)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // ------------------------------------------------------------------
    // Time-based aggregates
    // ------------------------------------------------------------------

    async fn insert_aggregate(&self, row: NewAggregate) -> Result<TimeBasedAggregate> {
        let stored = sqlx::query_as(
            r#"
            INSERT INTO time_based_aggregates
                (metric_name, aggregation_level, period_start, period_end,
                 value, dimension, dimension_value)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&row.metric_name)
        .bind(&row.aggregation_level)
        .bind(row.period_start)
        .bind(row.period_end)
        .bind(row.value)
        .bind(&row.dimension)
        .bind(&row.dimension_value)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    async fn aggregates_named(
        &self,
        metric_name: &str,
        aggregation_level: &str,
    ) -> Result<Vec<TimeBasedAggregate>> {
        let rows = sqlx::query_as(
            r#"
            SELECT * FROM time_based_aggregates
            WHERE metric_name = $1 AND aggregation_level = $2
            ORDER BY period_start, id
            "#,
        )
        .bind(metric_name)
        .bind(aggregation_level)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // ------------------------------------------------------------------
    // Report joins
    // ------------------------------------------------------------------

    async fn lead_report(&self, limit: i64) -> Result<Vec<LeadAnalyticsReport>> {
        let rows = sqlx::query_as(
            r#"
            SELECT l.id AS lead_id, l.source, l.service_interest, l.status,
                   la.lead_score, la.acquisition_source, la.acquisition_cost,
                   la.conversion_probability, la.converted_to_customer,
                   l.created_at AS lead_created_at
            FROM lead_analytics la
            JOIN leads l ON l.id = la.lead_id
            ORDER BY la.lead_score DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn project_report(&self, limit: i64) -> Result<Vec<ProjectAnalyticsReport>> {
        let rows = sqlx::query_as(
            r#"
            SELECT p.id AS project_id, p.project_type, p.status, p.contract_amount,
                   pa.estimated_cost, pa.actual_cost, pa.cost_variance_percent,
                   pa.profit_margin, p.created_at AS project_created_at
            FROM project_analytics pa
            JOIN projects p ON p.id = pa.project_id
            ORDER BY p.created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn customer_report(&self, limit: i64) -> Result<Vec<CustomerAnalyticsReport>> {
        let rows = sqlx::query_as(
            r#"
            SELECT c.id AS customer_id, c.name, ca.lifetime_value, ca.retention_score,
                   ca.churn_probability, ca.project_count, ca.average_project_value
            FROM customer_analytics ca
            JOIN customers c ON c.id = ca.customer_id
            ORDER BY ca.lifetime_value DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn weather_report(&self, limit: i64) -> Result<Vec<WeatherImpactReport>> {
        let rows = sqlx::query_as(
            r#"
            SELECT w.id AS weather_event_id, w.event_type, w.severity, w.zip,
                   wia.leads_generated, wia.projects_created, wia.revenue_impact,
                   wia.impact_start_date, wia.impact_end_date
            FROM weather_impact_analytics wia
            JOIN weather_events w ON w.id = wia.weather_event_id
            ORDER BY wia.impact_start_date DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
