//! # Time Aggregator
//!
//! Buckets metric samples by calendar period (day, ISO week, month, quarter,
//! year) and writes one `TimeBasedAggregate` row per bucket. Regeneration
//! appends rows; there is deliberately no existence check here, unlike the
//! entity reconcilers (see DESIGN.md).

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime};
use tracing::info;

use crate::error::{AnalyticsError, Result};
use crate::models::{NewAggregate, TimeBasedAggregate};
use crate::store::Store;

// ============================================================================
// Metric and Level Vocabulary
// ============================================================================

/// The six aggregatable metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricName {
    Revenue,
    Profit,
    Leads,
    Projects,
    LeadConversionRate,
    ProjectProfitMargin,
}

/// All metrics, in the order the batch orchestrator regenerates them.
pub const ALL_METRICS: [MetricName; 6] = [
    MetricName::Revenue,
    MetricName::Profit,
    MetricName::Leads,
    MetricName::Projects,
    MetricName::LeadConversionRate,
    MetricName::ProjectProfitMargin,
];

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Revenue => "revenue",
            Self::Profit => "profit",
            Self::Leads => "leads",
            Self::Projects => "projects",
            Self::LeadConversionRate => "lead_conversion_rate",
            Self::ProjectProfitMargin => "project_profit_margin",
        }
    }
}

impl FromStr for MetricName {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "revenue" => Ok(Self::Revenue),
            "profit" => Ok(Self::Profit),
            "leads" => Ok(Self::Leads),
            "projects" => Ok(Self::Projects),
            "lead_conversion_rate" => Ok(Self::LeadConversionRate),
            "project_profit_margin" => Ok(Self::ProjectProfitMargin),
            other => Err(AnalyticsError::validation(format!(
                "unknown metric name: {other}"
            ))),
        }
    }
}

/// Calendar granularity of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationLevel {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl AggregationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
        }
    }

    /// Truncate a timestamp to the start of its period.
    pub fn truncate(&self, at: NaiveDateTime) -> NaiveDate {
        let date = at.date();
        match self {
            Self::Daily => date,
            // ISO weeks start on Monday.
            Self::Weekly => date - Days::new(date.weekday().num_days_from_monday() as u64),
            Self::Monthly => date.with_day(1).unwrap_or(date),
            Self::Quarterly => {
                let quarter_month = (date.month0() / 3) * 3 + 1;
                NaiveDate::from_ymd_opt(date.year(), quarter_month, 1).unwrap_or(date)
            }
            Self::Yearly => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
        }
    }
}

impl FromStr for AggregationLevel {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "yearly" => Ok(Self::Yearly),
            other => Err(AnalyticsError::validation(format!(
                "unknown aggregation level: {other}"
            ))),
        }
    }
}

// ============================================================================
// Sample Collection and Rollup
// ============================================================================

/// One timestamped observation feeding a bucket.
struct Sample {
    at: NaiveDateTime,
    value: f64,
    converted: bool,
}

impl Sample {
    fn plain(at: NaiveDateTime, value: f64) -> Self {
        Self {
            at,
            value,
            converted: false,
        }
    }
}

/// How a bucket's samples collapse into its value.
enum Rollup {
    Sum,
    Count,
    Average,
    ConversionRate,
}

impl MetricName {
    fn rollup(&self) -> Rollup {
        match self {
            Self::Revenue | Self::Profit => Rollup::Sum,
            Self::Leads | Self::Projects => Rollup::Count,
            Self::LeadConversionRate => Rollup::ConversionRate,
            Self::ProjectProfitMargin => Rollup::Average,
        }
    }
}

async fn collect_samples<S: Store>(store: &S, metric: MetricName) -> Result<Vec<Sample>> {
    let samples = match metric {
        MetricName::Revenue | MetricName::Profit => store
            .business_metrics_named(metric.as_str())
            .await?
            .into_iter()
            .map(|m| Sample::plain(m.recorded_at, m.value))
            .collect(),
        MetricName::Leads => store
            .leads()
            .await?
            .into_iter()
            .map(|l| Sample::plain(l.created_at, 1.0))
            .collect(),
        MetricName::Projects => store
            .projects()
            .await?
            .into_iter()
            .map(|p| Sample::plain(p.created_at, 1.0))
            .collect(),
        MetricName::LeadConversionRate => store
            .lead_analytics_all()
            .await?
            .into_iter()
            .filter_map(|a| {
                a.conversion_date.map(|at| Sample {
                    at,
                    value: 1.0,
                    converted: a.converted_to_customer,
                })
            })
            .collect(),
        MetricName::ProjectProfitMargin => store
            .project_analytics_all()
            .await?
            .into_iter()
            .map(|a| Sample::plain(a.created_at, a.profit_margin * 100.0))
            .collect(),
    };
    Ok(samples)
}

fn bucket_value(rollup: &Rollup, samples: &[Sample]) -> f64 {
    match rollup {
        Rollup::Sum => samples.iter().map(|s| s.value).sum(),
        Rollup::Count => samples.len() as f64,
        Rollup::Average => {
            samples.iter().map(|s| s.value).sum::<f64>() / samples.len() as f64
        }
        Rollup::ConversionRate => {
            let converted = samples.iter().filter(|s| s.converted).count();
            converted as f64 / samples.len() as f64 * 100.0
        }
    }
}

// ============================================================================
// Aggregate Generation
// ============================================================================

/// Regenerate one metric at one granularity. Returns the appended rows.
pub async fn generate_aggregate<S: Store>(
    store: &S,
    metric: MetricName,
    level: AggregationLevel,
) -> Result<Vec<TimeBasedAggregate>> {
    let samples = collect_samples(store, metric).await?;

    let mut buckets: BTreeMap<NaiveDate, Vec<Sample>> = BTreeMap::new();
    for sample in samples {
        buckets.entry(level.truncate(sample.at)).or_default().push(sample);
    }

    let rollup = metric.rollup();
    let mut stored = Vec::with_capacity(buckets.len());
    for group in buckets.into_values() {
        // Non-empty by construction.
        let period_start = group.iter().map(|s| s.at).min().unwrap_or_default();
        let period_end = group.iter().map(|s| s.at).max().unwrap_or_default();
        let row = store
            .insert_aggregate(NewAggregate {
                metric_name: metric.as_str().to_string(),
                aggregation_level: level.as_str().to_string(),
                period_start,
                period_end,
                value: bucket_value(&rollup, &group),
                dimension: None,
                dimension_value: None,
            })
            .await?;
        stored.push(row);
    }

    info!(
        "Aggregated {} at {} granularity into {} buckets",
        metric.as_str(),
        level.as_str(),
        stored.len()
    );
    Ok(stored)
}

/// String-keyed entry point for HTTP callers: validates both names before
/// touching the store, so an unknown metric or level writes nothing.
pub async fn generate_aggregate_named<S: Store>(
    store: &S,
    metric_name: &str,
    aggregation_level: &str,
) -> Result<Vec<TimeBasedAggregate>> {
    let metric = MetricName::from_str(metric_name)?;
    let level = AggregationLevel::from_str(aggregation_level)?;
    generate_aggregate(store, metric, level).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap()
    }

    #[test]
    fn truncation_boundaries() {
        let ts = at(2025, 8, 14); // a Thursday
        assert_eq!(
            AggregationLevel::Daily.truncate(ts),
            NaiveDate::from_ymd_opt(2025, 8, 14).unwrap()
        );
        assert_eq!(
            AggregationLevel::Weekly.truncate(ts),
            NaiveDate::from_ymd_opt(2025, 8, 11).unwrap()
        );
        assert_eq!(
            AggregationLevel::Monthly.truncate(ts),
            NaiveDate::from_ymd_opt(2025, 8, 1).unwrap()
        );
        assert_eq!(
            AggregationLevel::Quarterly.truncate(ts),
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()
        );
        assert_eq!(
            AggregationLevel::Yearly.truncate(ts),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
        );
    }

    #[test]
    fn quarter_starts() {
        for (month, start) in [(1, 1), (3, 1), (4, 4), (6, 4), (9, 7), (12, 10)] {
            assert_eq!(
                AggregationLevel::Quarterly.truncate(at(2025, month, 15)),
                NaiveDate::from_ymd_opt(2025, start, 1).unwrap()
            );
        }
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert!(MetricName::from_str("margin").is_err());
        assert!(AggregationLevel::from_str("fortnightly").is_err());
    }
}
