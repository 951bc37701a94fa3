//! # Reporting Queries
//!
//! Read-only views over the analytics tables for the dashboard and the
//! per-kind report endpoints. Nothing here writes.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use tracing::debug;

use crate::aggregate::AggregationLevel;
use crate::error::Result;
use crate::models::{
    CustomerAnalyticsReport, DashboardMetrics, LeadAnalyticsReport, PredictiveModelResult,
    ProjectAnalyticsReport, RevenuePoint, WeatherImpactByType, WeatherImpactReport,
};
use crate::store::Store;

/// Rows returned by the per-kind report queries.
const REPORT_LIMIT: i64 = 100;
/// Ledger rows shown in the dashboard's recent-metrics feed.
const RECENT_METRICS: i64 = 10;
/// Event types shown in the dashboard's weather ranking.
const TOP_WEATHER_TYPES: usize = 5;

/// Roles allowed to see the revenue series.
fn sees_revenue(role: &str) -> bool {
    matches!(role, "admin" | "manager")
}

/// Assemble the dashboard view. The revenue series is only included for
/// admin and manager roles.
pub async fn dashboard_metrics<S: Store>(
    store: &S,
    user_id: Option<i32>,
    role: &str,
) -> Result<DashboardMetrics> {
    debug!("Dashboard metrics for user {:?} role {}", user_id, role);

    let lead_rows = store.lead_analytics_all().await?;
    let lead_conversion_rate = if lead_rows.is_empty() {
        0.0
    } else {
        let converted = lead_rows.iter().filter(|a| a.converted_to_customer).count();
        converted as f64 / lead_rows.len() as f64 * 100.0
    };

    let project_rows = store.project_analytics_all().await?;
    let average_profit_margin = if project_rows.is_empty() {
        0.0
    } else {
        project_rows.iter().map(|a| a.profit_margin * 100.0).sum::<f64>()
            / project_rows.len() as f64
    };

    let customer_rows = store.customer_analytics_all().await?;
    let average_lifetime_value = if customer_rows.is_empty() {
        0.0
    } else {
        customer_rows.iter().map(|a| a.lifetime_value).sum::<f64>() / customer_rows.len() as f64
    };

    let weather_impact_by_type = top_weather_impact(store).await?;
    let recent_metrics = store.recent_business_metrics(RECENT_METRICS).await?;

    let monthly_revenue = if sees_revenue(role) {
        Some(revenue_series(store).await?)
    } else {
        None
    };

    Ok(DashboardMetrics {
        lead_conversion_rate,
        average_profit_margin,
        average_lifetime_value,
        weather_impact_by_type,
        recent_metrics,
        monthly_revenue,
    })
}

/// Revenue impact grouped by weather event type, largest first, top 5.
async fn top_weather_impact<S: Store>(store: &S) -> Result<Vec<WeatherImpactByType>> {
    let events = store.weather_events().await?;
    let types_by_id: HashMap<i32, &str> = events
        .iter()
        .map(|e| (e.id, e.event_type.as_str()))
        .collect();

    let mut grouped: HashMap<String, (usize, f64)> = HashMap::new();
    for impact in store.weather_impact_all().await? {
        let Some(event_type) = types_by_id.get(&impact.weather_event_id) else {
            continue;
        };
        let entry = grouped.entry((*event_type).to_string()).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += impact.revenue_impact;
    }

    let mut ranked: Vec<WeatherImpactByType> = grouped
        .into_iter()
        .map(|(event_type, (event_count, total_revenue_impact))| WeatherImpactByType {
            event_type,
            event_count,
            total_revenue_impact,
        })
        .collect();
    ranked.sort_by(|a, b| b.total_revenue_impact.total_cmp(&a.total_revenue_impact));
    ranked.truncate(TOP_WEATHER_TYPES);
    Ok(ranked)
}

/// Last-12-months revenue from the business-metrics ledger, one point per
/// calendar month.
async fn revenue_series<S: Store>(store: &S) -> Result<Vec<RevenuePoint>> {
    let cutoff = Utc::now().naive_utc() - Duration::days(365);
    let mut by_month: HashMap<chrono::NaiveDate, f64> = HashMap::new();
    for metric in store.business_metrics_named("revenue").await? {
        if metric.recorded_at < cutoff {
            continue;
        }
        let month = AggregationLevel::Monthly.truncate(metric.recorded_at);
        *by_month.entry(month).or_insert(0.0) += metric.value;
    }

    let mut series: Vec<RevenuePoint> = by_month
        .into_iter()
        .map(|(month, revenue)| RevenuePoint { month, revenue })
        .collect();
    series.sort_by_key(|p| p.month);
    Ok(series)
}

/// Top 100 lead analytics rows joined with their lead, best score first.
pub async fn lead_analytics_report<S: Store>(store: &S) -> Result<Vec<LeadAnalyticsReport>> {
    store.lead_report(REPORT_LIMIT).await
}

/// Top 100 project analytics rows joined with their project, newest first.
pub async fn project_analytics_report<S: Store>(
    store: &S,
) -> Result<Vec<ProjectAnalyticsReport>> {
    store.project_report(REPORT_LIMIT).await
}

/// Top 100 customer analytics rows joined with their customer, highest
/// lifetime value first.
pub async fn customer_analytics_report<S: Store>(
    store: &S,
) -> Result<Vec<CustomerAnalyticsReport>> {
    store.customer_report(REPORT_LIMIT).await
}

/// Top 100 weather impact rows joined with their event, most recent first.
pub async fn weather_impact_report<S: Store>(store: &S) -> Result<Vec<WeatherImpactReport>> {
    store.weather_report(REPORT_LIMIT).await
}

/// Up to 100 non-expired predictions, newest first.
pub async fn predictive_insights<S: Store>(store: &S) -> Result<Vec<PredictiveModelResult>> {
    store
        .active_predictions(Utc::now().naive_utc(), REPORT_LIMIT)
        .await
}
