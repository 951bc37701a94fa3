//! # Scoring Functions
//!
//! Pure per-entity metric computations. Everything here is deterministic
//! except the fields the upstream system does not capture yet (actual cost
//! variance, satisfaction, customer acquisition cost, referrals); those draw
//! from an injected [`RandomSource`] so callers can pin them in tests.

use chrono::{Days, NaiveDate};

use crate::models::{Lead, Project, WeatherEvent};

/// Multiplier applied to average project value for repeat business when
/// computing customer lifetime value.
pub const REPEAT_BUSINESS_FACTOR: f64 = 0.3;

/// Fixed average project value used for weather revenue impact estimates.
pub const AVERAGE_PROJECT_VALUE: f64 = 8500.0;

/// Days a weather event keeps influencing lead flow.
pub const WEATHER_IMPACT_WINDOW_DAYS: u64 = 30;

// ============================================================================
// Random Source
// ============================================================================

/// Source of uniform random draws for the placeholder fields.
pub trait RandomSource: Send {
    /// A uniform draw in `[lo, hi)`.
    fn uniform(&mut self, lo: f64, hi: f64) -> f64;
}

/// Default source backed by the thread-local rng.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngSource;

impl RandomSource for ThreadRngSource {
    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        use rand::Rng;
        rand::rng().random_range(lo..hi)
    }
}

/// Replays a fixed script of draws, wrapping around when exhausted, and
/// clamps each draw into the requested range. An empty script yields the
/// midpoint of every range. Test double.
#[derive(Debug, Default)]
pub struct SequenceSource {
    draws: Vec<f64>,
    next: usize,
}

impl SequenceSource {
    pub fn new(draws: Vec<f64>) -> Self {
        Self { draws, next: 0 }
    }
}

impl RandomSource for SequenceSource {
    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        if self.draws.is_empty() {
            return (lo + hi) / 2.0;
        }
        let raw = self.draws[self.next % self.draws.len()];
        self.next += 1;
        raw.clamp(lo, hi)
    }
}

// ============================================================================
// Lead Scoring
// ============================================================================

/// Score a lead 0-100 from its acquisition source and service interest.
///
/// Base 50, plus a source bonus (referral 20, website 15, google 10,
/// facebook 5) and a service-interest bonus (roof replacement 15, repair 10,
/// inspection 5; first match wins), clamped to [0, 100].
pub fn lead_score(lead: &Lead) -> f64 {
    let mut score: f64 = 50.0;

    if let Some(source) = lead.source.as_deref() {
        score += match source.to_lowercase().as_str() {
            "referral" => 20.0,
            "website" => 15.0,
            "google" => 10.0,
            "facebook" => 5.0,
            _ => 0.0,
        };
    }

    if let Some(interest) = lead.service_interest.as_deref() {
        let interest = interest.to_lowercase();
        score += if interest.contains("roof replacement") {
            15.0
        } else if interest.contains("repair") {
            10.0
        } else if interest.contains("inspection") {
            5.0
        } else {
            0.0
        };
    }

    score.clamp(0.0, 100.0)
}

/// Fixed per-source acquisition cost for a lead.
pub fn lead_acquisition_cost(source: Option<&str>) -> f64 {
    match source.map(|s| s.to_lowercase()).as_deref() {
        Some("google") => 75.0,
        Some("facebook") => 50.0,
        Some("website") => 25.0,
        Some("referral") => 100.0,
        _ => 40.0,
    }
}

/// Conversion probability derived from a 0-100 lead score.
pub fn conversion_probability(lead_score: f64) -> f64 {
    lead_score / 100.0 * 0.8
}

// ============================================================================
// Project Costing
// ============================================================================

/// Computed cost/duration metrics for one project.
#[derive(Debug, Clone)]
pub struct ProjectCosting {
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

/// Estimate a project's cost and duration metrics from its contract.
///
/// No actual-cost field exists upstream, so actual cost is the estimate
/// scaled by U(0.85, 1.15); satisfaction is U(3, 5) and weather impact
/// U(0, 10), both placeholders until the field teams report real data.
pub fn project_costing(project: &Project, rng: &mut dyn RandomSource) -> ProjectCosting {
    let estimated_cost = project.contract_amount * 0.6;
    let actual_cost = estimated_cost * rng.uniform(0.85, 1.15);
    let cost_variance_percent = (actual_cost - estimated_cost) / estimated_cost * 100.0;

    let kind = project.project_type.to_lowercase();
    let estimated_duration: i32 = if kind.contains("replacement") {
        21
    } else if kind.contains("repair") {
        7
    } else {
        14
    };

    let actual_duration = match project.end_date {
        Some(end) => (end - project.start_date).num_days() as i32,
        None => estimated_duration,
    };
    let duration_variance_percent =
        (actual_duration - estimated_duration) as f64 / estimated_duration as f64 * 100.0;

    ProjectCosting {
        estimated_cost,
        actual_cost,
        cost_variance_percent,
        estimated_duration,
        actual_duration,
        duration_variance_percent,
        profit_margin: (project.contract_amount - actual_cost) / project.contract_amount,
        weather_impact_score: rng.uniform(0.0, 10.0),
        customer_satisfaction_score: rng.uniform(3.0, 5.0),
    }
}

// ============================================================================
// Customer Value
// ============================================================================

/// Computed value/retention metrics for one customer.
#[derive(Debug, Clone)]
pub struct CustomerValue {
    pub lifetime_value: f64,
    pub acquisition_cost: f64,
    pub retention_score: f64,
    pub churn_probability: f64,
    pub referral_count: i32,
    pub project_count: i32,
    pub average_project_value: f64,
    pub last_interaction_date: Option<NaiveDate>,
}

/// Derive customer metrics from their project history.
///
/// Retention starts at 50, gains 30 for more than 3 projects (15 for more
/// than 1), and shifts with recency of the latest project activity:
/// under 90 days +20, under 180 days +10, over a year -10.
pub fn customer_value(
    projects: &[Project],
    today: NaiveDate,
    rng: &mut dyn RandomSource,
) -> CustomerValue {
    let project_count = projects.len() as i32;
    let total_value: f64 = projects.iter().map(|p| p.contract_amount).sum();
    let average_project_value = if project_count > 0 {
        total_value / project_count as f64
    } else {
        0.0
    };
    let lifetime_value =
        average_project_value * project_count as f64 * (1.0 + REPEAT_BUSINESS_FACTOR);

    let last_interaction_date = projects
        .iter()
        .map(|p| p.end_date.unwrap_or(p.start_date))
        .max();

    let mut retention: f64 = 50.0;
    if project_count > 3 {
        retention += 30.0;
    } else if project_count > 1 {
        retention += 15.0;
    }
    if let Some(last) = last_interaction_date {
        let days_since = (today - last).num_days();
        if days_since < 90 {
            retention += 20.0;
        } else if days_since < 180 {
            retention += 10.0;
        } else if days_since > 365 {
            retention -= 10.0;
        }
    }
    let retention_score = retention.clamp(0.0, 100.0);
    let churn_probability = ((1.0 - retention_score / 100.0) * 0.9).max(0.0);

    CustomerValue {
        lifetime_value,
        acquisition_cost: rng.uniform(100.0, 400.0),
        retention_score,
        churn_probability,
        referral_count: rng.uniform(0.0, 5.0).floor() as i32,
        project_count,
        average_project_value,
        last_interaction_date,
    }
}

// ============================================================================
// Weather Impact
// ============================================================================

/// Estimated business impact of one weather event.
#[derive(Debug, Clone)]
pub struct WeatherImpact {
    pub leads_generated: i32,
    pub projects_created: i32,
    pub revenue_impact: f64,
    pub impact_start_date: NaiveDate,
    pub impact_end_date: NaiveDate,
}

/// Lead-generation multiplier per event type. Unmatched types fall into a
/// default bucket.
fn event_type_multiplier(event_type: &str) -> f64 {
    match event_type.to_lowercase().as_str() {
        "hail storm" => 5.0,
        "tornado" => 8.0,
        "hurricane" => 10.0,
        "wind storm" => 4.0,
        "heavy rain" => 2.0,
        _ => 3.0,
    }
}

/// Estimate the lead, project, and revenue impact of a weather event over
/// its 30-day influence window.
pub fn weather_impact(event: &WeatherEvent) -> WeatherImpact {
    let leads_generated = (event.severity * event_type_multiplier(&event.event_type)).floor() as i32;
    let projects_created = (leads_generated as f64 * 0.4).floor() as i32;
    let revenue_impact = projects_created as f64 * AVERAGE_PROJECT_VALUE;

    WeatherImpact {
        leads_generated,
        projects_created,
        revenue_impact,
        impact_start_date: event.event_date,
        impact_end_date: event.event_date + Days::new(WEATHER_IMPACT_WINDOW_DAYS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn lead(source: Option<&str>, interest: Option<&str>) -> Lead {
        Lead {
            id: 1,
            source: source.map(String::from),
            service_interest: interest.map(String::from),
            status: "new".into(),
            score: None,
            created_at: NaiveDate::from_ymd_opt(2025, 3, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn lead_score_stacks_source_and_interest_bonuses() {
        assert_eq!(lead_score(&lead(Some("Referral"), Some("Roof Replacement"))), 85.0);
        assert_eq!(lead_score(&lead(Some("website"), Some("gutter repair"))), 75.0);
        assert_eq!(lead_score(&lead(Some("billboard"), Some("inspection"))), 55.0);
        assert_eq!(lead_score(&lead(None, None)), 50.0);
    }

    #[test]
    fn lead_score_first_interest_clause_wins() {
        // "roof replacement repair" matches the replacement clause only.
        assert_eq!(lead_score(&lead(None, Some("roof replacement repair"))), 65.0);
    }

    #[test]
    fn acquisition_cost_table() {
        assert_eq!(lead_acquisition_cost(Some("google")), 75.0);
        assert_eq!(lead_acquisition_cost(Some("Referral")), 100.0);
        assert_eq!(lead_acquisition_cost(Some("door hanger")), 40.0);
        assert_eq!(lead_acquisition_cost(None), 40.0);
    }

    #[test]
    fn replacement_project_costing() {
        let project = Project {
            id: 7,
            customer_id: 1,
            property_id: 1,
            project_type: "Roof Replacement".into(),
            status: "completed".into(),
            start_date: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            end_date: Some(NaiveDate::from_ymd_opt(2025, 4, 19).unwrap()),
            contract_amount: 12500.0,
            created_at: NaiveDate::from_ymd_opt(2025, 3, 20)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        };
        // Pin the cost multiplier at exactly 1.0.
        let mut rng = SequenceSource::new(vec![1.0, 4.0, 4.0]);
        let costing = project_costing(&project, &mut rng);

        assert_eq!(costing.estimated_cost, 7500.0);
        assert_eq!(costing.actual_cost, 7500.0);
        assert_eq!(costing.cost_variance_percent, 0.0);
        assert_eq!(costing.estimated_duration, 21);
        assert_eq!(costing.actual_duration, 18);
        assert_eq!(costing.profit_margin, (12500.0 - 7500.0) / 12500.0);
    }

    #[test]
    fn customer_with_no_projects_has_zero_value() {
        let mut rng = SequenceSource::new(vec![200.0, 2.0]);
        let value = customer_value(&[], NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(), &mut rng);
        assert_eq!(value.project_count, 0);
        assert_eq!(value.average_project_value, 0.0);
        assert_eq!(value.lifetime_value, 0.0);
        assert_eq!(value.retention_score, 50.0);
        assert_eq!(value.churn_probability, 0.45);
        assert_eq!(value.last_interaction_date, None);
    }

    #[test]
    fn empty_sequence_source_yields_range_midpoints() {
        let mut rng = SequenceSource::new(Vec::new());
        assert_eq!(rng.uniform(0.0, 10.0), 5.0);
        assert_eq!(rng.uniform(0.85, 1.15), 1.0);
    }

    #[test]
    fn hail_storm_impact() {
        let event = WeatherEvent {
            id: 3,
            event_type: "Hail Storm".into(),
            severity: 4.2,
            zip: "75001".into(),
            event_date: NaiveDate::from_ymd_opt(2025, 5, 10).unwrap(),
        };
        let impact = weather_impact(&event);
        assert_eq!(impact.leads_generated, 21);
        assert_eq!(impact.projects_created, 8);
        assert_eq!(impact.revenue_impact, 68000.0);
        assert_eq!(
            impact.impact_end_date,
            NaiveDate::from_ymd_opt(2025, 6, 9).unwrap()
        );
    }
}
