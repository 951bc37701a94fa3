//! In-memory [`Store`] implementation.
//!
//! Serves the test suite (and local experiments) without a database. Rows
//! live in plain vectors behind one mutex; ids are assigned from a counter
//! per table. Semantics mirror `PgStore`, including the ordering contracts.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};

use crate::error::Result;
use crate::models::{
    BusinessMetric, Customer, CustomerAnalytics, CustomerAnalyticsReport, Lead, LeadAnalytics,
    LeadAnalyticsReport, NewAggregate, NewCustomerAnalytics, NewLeadAnalytics, NewPrediction,
    NewProjectAnalytics, NewWeatherImpactAnalytics, PredictiveModelResult, Project,
    ProjectAnalytics, ProjectAnalyticsReport, TimeBasedAggregate, WeatherEvent,
    WeatherImpactAnalytics, WeatherImpactReport,
};
use crate::store::Store;

#[derive(Debug, Default)]
struct Inner {
    leads: Vec<Lead>,
    projects: Vec<Project>,
    customers: Vec<Customer>,
    weather_events: Vec<WeatherEvent>,
    business_metrics: Vec<BusinessMetric>,
    lead_analytics: Vec<LeadAnalytics>,
    project_analytics: Vec<ProjectAnalytics>,
    customer_analytics: Vec<CustomerAnalytics>,
    weather_impacts: Vec<WeatherImpactAnalytics>,
    predictions: Vec<PredictiveModelResult>,
    aggregates: Vec<TimeBasedAggregate>,
    next_id: i32,
}

impl Inner {
    fn take_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

/// Mutex-guarded in-memory store. Cheap to construct per test.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Seeding helpers for the read-only source tables; callers pick the ids.

    pub fn seed_lead(&self, lead: Lead) {
        self.inner.lock().expect("store lock poisoned").leads.push(lead);
    }

    pub fn seed_project(&self, project: Project) {
        self.inner.lock().expect("store lock poisoned").projects.push(project);
    }

    pub fn seed_customer(&self, customer: Customer) {
        self.inner.lock().expect("store lock poisoned").customers.push(customer);
    }

    pub fn seed_weather_event(&self, event: WeatherEvent) {
        self.inner.lock().expect("store lock poisoned").weather_events.push(event);
    }

    pub fn seed_business_metric(&self, metric: BusinessMetric) {
        self.inner.lock().expect("store lock poisoned").business_metrics.push(metric);
    }
}

#[async_trait]
impl Store for MemoryStore {
    // ------------------------------------------------------------------
    // Source entities
    // ------------------------------------------------------------------

    async fn leads(&self) -> Result<Vec<Lead>> {
        let mut rows = self.inner.lock().expect("store lock poisoned").leads.clone();
        rows.sort_by_key(|l| l.id);
        Ok(rows)
    }

    async fn lead_by_id(&self, id: i32) -> Result<Option<Lead>> {
        Ok(self
            .inner
            .lock()
            .expect("store lock poisoned")
            .leads
            .iter()
            .find(|l| l.id == id)
            .cloned())
    }

    async fn projects(&self) -> Result<Vec<Project>> {
        let mut rows = self.inner.lock().expect("store lock poisoned").projects.clone();
        rows.sort_by_key(|p| p.id);
        Ok(rows)
    }

    async fn project_by_id(&self, id: i32) -> Result<Option<Project>> {
        Ok(self
            .inner
            .lock()
            .expect("store lock poisoned")
            .projects
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn customers(&self) -> Result<Vec<Customer>> {
        let mut rows = self.inner.lock().expect("store lock poisoned").customers.clone();
        rows.sort_by_key(|c| c.id);
        Ok(rows)
    }

    async fn customer_by_id(&self, id: i32) -> Result<Option<Customer>> {
        Ok(self
            .inner
            .lock()
            .expect("store lock poisoned")
            .customers
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn projects_for_customer(&self, customer_id: i32) -> Result<Vec<Project>> {
        let mut rows: Vec<Project> = self
            .inner
            .lock()
            .expect("store lock poisoned")
            .projects
            .iter()
            .filter(|p| p.customer_id == customer_id)
            .cloned()
            .collect();
        rows.sort_by_key(|p| p.id);
        Ok(rows)
    }

    async fn weather_events(&self) -> Result<Vec<WeatherEvent>> {
        let mut rows = self.inner.lock().expect("store lock poisoned").weather_events.clone();
        rows.sort_by_key(|w| w.id);
        Ok(rows)
    }

    async fn business_metrics_named(&self, metric_name: &str) -> Result<Vec<BusinessMetric>> {
        let mut rows: Vec<BusinessMetric> = self
            .inner
            .lock()
            .expect("store lock poisoned")
            .business_metrics
            .iter()
            .filter(|m| m.metric_name == metric_name)
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.recorded_at);
        Ok(rows)
    }

    async fn recent_business_metrics(&self, limit: i64) -> Result<Vec<BusinessMetric>> {
        let mut rows = self.inner.lock().expect("store lock poisoned").business_metrics.clone();
        rows.sort_by_key(|m| std::cmp::Reverse(m.recorded_at));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    // ------------------------------------------------------------------
    // Lead analytics
    // ------------------------------------------------------------------

    async fn lead_analytics_for(&self, lead_id: i32) -> Result<Option<LeadAnalytics>> {
        Ok(self
            .inner
            .lock()
            .expect("store lock poisoned")
            .lead_analytics
            .iter()
            .find(|a| a.lead_id == lead_id)
            .cloned())
    }

    async fn insert_lead_analytics(&self, row: NewLeadAnalytics) -> Result<LeadAnalytics> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let stored = LeadAnalytics {
            id: inner.take_id(),
            lead_id: row.lead_id,
            acquisition_source: row.acquisition_source,
            acquisition_cost: row.acquisition_cost,
            lead_score: row.lead_score,
            conversion_probability: row.conversion_probability,
            days_to_conversion: None,
            converted_to_customer: false,
            conversion_date: None,
            created_at: now(),
            updated_at: now(),
        };
        inner.lead_analytics.push(stored.clone());
        Ok(stored)
    }

    async fn update_lead_analytics(&self, row: &LeadAnalytics) -> Result<LeadAnalytics> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let slot = inner
            .lead_analytics
            .iter_mut()
            .find(|a| a.id == row.id)
            .ok_or(sqlx::Error::RowNotFound)?;
        *slot = LeadAnalytics {
            created_at: slot.created_at,
            updated_at: now(),
            ..row.clone()
        };
        Ok(slot.clone())
    }

    async fn lead_analytics_all(&self) -> Result<Vec<LeadAnalytics>> {
        let mut rows = self.inner.lock().expect("store lock poisoned").lead_analytics.clone();
        rows.sort_by_key(|a| a.id);
        Ok(rows)
    }

    // ------------------------------------------------------------------
    // Project analytics
    // ------------------------------------------------------------------

    async fn project_analytics_for(&self, project_id: i32) -> Result<Option<ProjectAnalytics>> {
        Ok(self
            .inner
            .lock()
            .expect("store lock poisoned")
            .project_analytics
            .iter()
            .find(|a| a.project_id == project_id)
            .cloned())
    }

    async fn insert_project_analytics(
        &self,
        row: NewProjectAnalytics,
    ) -> Result<ProjectAnalytics> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let stored = ProjectAnalytics {
            id: inner.take_id(),
            project_id: row.project_id,
            estimated_cost: row.estimated_cost,
            actual_cost: row.actual_cost,
            cost_variance_percent: row.cost_variance_percent,
            estimated_duration: row.estimated_duration,
            actual_duration: row.actual_duration,
            duration_variance_percent: row.duration_variance_percent,
            profit_margin: row.profit_margin,
            weather_impact_score: row.weather_impact_score,
            customer_satisfaction_score: row.customer_satisfaction_score,
            created_at: now(),
            updated_at: now(),
        };
        inner.project_analytics.push(stored.clone());
        Ok(stored)
    }

    async fn update_project_analytics(&self, row: &ProjectAnalytics) -> Result<ProjectAnalytics> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let slot = inner
            .project_analytics
            .iter_mut()
            .find(|a| a.id == row.id)
            .ok_or(sqlx::Error::RowNotFound)?;
        *slot = ProjectAnalytics {
            created_at: slot.created_at,
            updated_at: now(),
            ..row.clone()
        };
        Ok(slot.clone())
    }

    async fn project_analytics_all(&self) -> Result<Vec<ProjectAnalytics>> {
        let mut rows = self.inner.lock().expect("store lock poisoned").project_analytics.clone();
        rows.sort_by_key(|a| a.id);
        Ok(rows)
    }

    // ------------------------------------------------------------------
    // Customer analytics
    // ------------------------------------------------------------------

    async fn customer_analytics_for(
        &self,
        customer_id: i32,
    ) -> Result<Option<CustomerAnalytics>> {
        Ok(self
            .inner
            .lock()
            .expect("store lock poisoned")
            .customer_analytics
            .iter()
            .find(|a| a.customer_id == customer_id)
            .cloned())
    }

    async fn insert_customer_analytics(
        &self,
        row: NewCustomerAnalytics,
    ) -> Result<CustomerAnalytics> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let stored = CustomerAnalytics {
            id: inner.take_id(),
            customer_id: row.customer_id,
            lifetime_value: row.lifetime_value,
            acquisition_cost: row.acquisition_cost,
            retention_score: row.retention_score,
            churn_probability: row.churn_probability,
            referral_count: row.referral_count,
            project_count: row.project_count,
            average_project_value: row.average_project_value,
            last_interaction_date: row.last_interaction_date,
            created_at: now(),
            updated_at: now(),
        };
        inner.customer_analytics.push(stored.clone());
        Ok(stored)
    }

    async fn update_customer_analytics(
        &self,
        row: &CustomerAnalytics,
    ) -> Result<CustomerAnalytics> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let slot = inner
            .customer_analytics
            .iter_mut()
            .find(|a| a.id == row.id)
            .ok_or(sqlx::Error::RowNotFound)?;
        *slot = CustomerAnalytics {
            created_at: slot.created_at,
            updated_at: now(),
            ..row.clone()
        };
        Ok(slot.clone())
    }

    async fn customer_analytics_all(&self) -> Result<Vec<CustomerAnalytics>> {
        let mut rows = self.inner.lock().expect("store lock poisoned").customer_analytics.clone();
        rows.sort_by_key(|a| a.id);
        Ok(rows)
    }

    // ------------------------------------------------------------------
    // Weather impact analytics
    // ------------------------------------------------------------------

    async fn weather_impact_for(
        &self,
        weather_event_id: i32,
    ) -> Result<Option<WeatherImpactAnalytics>> {
        Ok(self
            .inner
            .lock()
            .expect("store lock poisoned")
            .weather_impacts
            .iter()
            .find(|a| a.weather_event_id == weather_event_id)
            .cloned())
    }

    async fn insert_weather_impact(
        &self,
        row: NewWeatherImpactAnalytics,
    ) -> Result<WeatherImpactAnalytics> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let stored = WeatherImpactAnalytics {
            id: inner.take_id(),
            weather_event_id: row.weather_event_id,
            leads_generated: row.leads_generated,
            projects_created: row.projects_created,
            revenue_impact: row.revenue_impact,
            affected_zip_codes: row.affected_zip_codes,
            impact_start_date: row.impact_start_date,
            impact_end_date: row.impact_end_date,
            created_at: now(),
            updated_at: now(),
        };
        inner.weather_impacts.push(stored.clone());
        Ok(stored)
    }

    async fn update_weather_impact(
        &self,
        row: &WeatherImpactAnalytics,
    ) -> Result<WeatherImpactAnalytics> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let slot = inner
            .weather_impacts
            .iter_mut()
            .find(|a| a.id == row.id)
            .ok_or(sqlx::Error::RowNotFound)?;
        *slot = WeatherImpactAnalytics {
            created_at: slot.created_at,
            updated_at: now(),
            ..row.clone()
        };
        Ok(slot.clone())
    }

    async fn weather_impact_all(&self) -> Result<Vec<WeatherImpactAnalytics>> {
        let mut rows = self.inner.lock().expect("store lock poisoned").weather_impacts.clone();
        rows.sort_by_key(|a| a.id);
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
        Ok(self
            .inner
            .lock()
            .expect("store lock poisoned")
            .predictions
            .iter()
            .find(|p| {
                p.model_name == model_name
                    && p.entity_type == entity_type
                    && p.entity_id == entity_id
                    && p.prediction_type == prediction_type
            })
            .cloned())
    }

    async fn insert_prediction(&self, row: NewPrediction) -> Result<PredictiveModelResult> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let stored = PredictiveModelResult {
            id: inner.take_id(),
            model_name: row.model_name,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            prediction_type: row.prediction_type,
            prediction_value: row.prediction_value,
            confidence_score: row.confidence_score,
            features_used: row.features_used,
            prediction_date: row.prediction_date,
            expiration_date: row.expiration_date,
        };
        inner.predictions.push(stored.clone());
        Ok(stored)
    }

    async fn update_prediction(
        &self,
        row: &PredictiveModelResult,
    ) -> Result<PredictiveModelResult> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let slot = inner
            .predictions
            .iter_mut()
            .find(|p| p.id == row.id)
            .ok_or(sqlx::Error::RowNotFound)?;
        *slot = row.clone();
        Ok(slot.clone())
    }

    async fn active_predictions(
        &self,
        as_of: NaiveDateTime,
        limit: i64,
    ) -> Result<Vec<PredictiveModelResult>> {
        let mut rows: Vec<PredictiveModelResult> = self
            .inner
            .lock()
            .expect("store lock poisoned")
            .predictions
            .iter()
            .filter(|p| p.expiration_date > as_of)
            .cloned()
            .collect();
        rows.sort_by_key(|p| std::cmp::Reverse(p.prediction_date));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    // ------------------------------------------------------------------
    // Time-based aggregates
    // ------------------------------------------------------------------

    async fn insert_aggregate(&self, row: NewAggregate) -> Result<TimeBasedAggregate> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let stored = TimeBasedAggregate {
            id: inner.take_id(),
            metric_name: row.metric_name,
            aggregation_level: row.aggregation_level,
            period_start: row.period_start,
            period_end: row.period_end,
            value: row.value,
            dimension: row.dimension,
            dimension_value: row.dimension_value,
            created_at: now(),
        };
        inner.aggregates.push(stored.clone());
        Ok(stored)
    }

    async fn aggregates_named(
        &self,
        metric_name: &str,
        aggregation_level: &str,
    ) -> Result<Vec<TimeBasedAggregate>> {
        let mut rows: Vec<TimeBasedAggregate> = self
            .inner
            .lock()
            .expect("store lock poisoned")
            .aggregates
            .iter()
            .filter(|a| a.metric_name == metric_name && a.aggregation_level == aggregation_level)
            .cloned()
            .collect();
        rows.sort_by_key(|a| (a.period_start, a.id));
        Ok(rows)
    }

    // ------------------------------------------------------------------
    // Report joins
    // ------------------------------------------------------------------

    async fn lead_report(&self, limit: i64) -> Result<Vec<LeadAnalyticsReport>> {
        let inner = self.inner.lock().expect("store lock poisoned");
        let mut rows: Vec<LeadAnalyticsReport> = inner
            .lead_analytics
            .iter()
            .filter_map(|a| {
                let lead = inner.leads.iter().find(|l| l.id == a.lead_id)?;
                Some(LeadAnalyticsReport {
                    lead_id: lead.id,
                    source: lead.source.clone(),
                    service_interest: lead.service_interest.clone(),
                    status: lead.status.clone(),
                    lead_score: a.lead_score,
                    acquisition_source: a.acquisition_source.clone(),
                    acquisition_cost: a.acquisition_cost,
                    conversion_probability: a.conversion_probability,
                    converted_to_customer: a.converted_to_customer,
                    lead_created_at: lead.created_at,
                })
            })
            .collect();
        rows.sort_by(|a, b| b.lead_score.total_cmp(&a.lead_score));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn project_report(&self, limit: i64) -> Result<Vec<ProjectAnalyticsReport>> {
        let inner = self.inner.lock().expect("store lock poisoned");
        let mut rows: Vec<ProjectAnalyticsReport> = inner
            .project_analytics
            .iter()
            .filter_map(|a| {
                let project = inner.projects.iter().find(|p| p.id == a.project_id)?;
                Some(ProjectAnalyticsReport {
                    project_id: project.id,
                    project_type: project.project_type.clone(),
                    status: project.status.clone(),
                    contract_amount: project.contract_amount,
                    estimated_cost: a.estimated_cost,
                    actual_cost: a.actual_cost,
                    cost_variance_percent: a.cost_variance_percent,
                    profit_margin: a.profit_margin,
                    project_created_at: project.created_at,
                })
            })
            .collect();
        rows.sort_by_key(|r| std::cmp::Reverse(r.project_created_at));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn customer_report(&self, limit: i64) -> Result<Vec<CustomerAnalyticsReport>> {
        let inner = self.inner.lock().expect("store lock poisoned");
        let mut rows: Vec<CustomerAnalyticsReport> = inner
            .customer_analytics
            .iter()
            .filter_map(|a| {
                let customer = inner.customers.iter().find(|c| c.id == a.customer_id)?;
                Some(CustomerAnalyticsReport {
                    customer_id: customer.id,
                    name: customer.name.clone(),
                    lifetime_value: a.lifetime_value,
                    retention_score: a.retention_score,
                    churn_probability: a.churn_probability,
                    project_count: a.project_count,
                    average_project_value: a.average_project_value,
                })
            })
            .collect();
        rows.sort_by(|a, b| b.lifetime_value.total_cmp(&a.lifetime_value));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn weather_report(&self, limit: i64) -> Result<Vec<WeatherImpactReport>> {
        let inner = self.inner.lock().expect("store lock poisoned");
        let mut rows: Vec<WeatherImpactReport> = inner
            .weather_impacts
            .iter()
            .filter_map(|a| {
                let event = inner
                    .weather_events
                    .iter()
                    .find(|w| w.id == a.weather_event_id)?;
                Some(WeatherImpactReport {
                    weather_event_id: event.id,
                    event_type: event.event_type.clone(),
                    severity: event.severity,
                    zip: event.zip.clone(),
                    leads_generated: a.leads_generated,
                    projects_created: a.projects_created,
                    revenue_impact: a.revenue_impact,
                    impact_start_date: a.impact_start_date,
                    impact_end_date: a.impact_end_date,
                })
            })
            .collect();
        rows.sort_by_key(|r| std::cmp::Reverse(r.impact_start_date));
        rows.truncate(limit as usize);
        Ok(rows)
    }
}
