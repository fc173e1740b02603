use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::config::AnalyticsConfig;
use crate::interval_stats::IntervalStats;
use crate::model::{CustomerRecord, HealthStatus, Segment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Watch,
}

impl Severity {
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::Warning => 1,
            Severity::Watch => 2,
        }
    }
}

/// Whether the cadence came from the robust per-gap statistics or from the
/// lifetime-span estimate. The two paths make different eligibility calls, so
/// the dashboard shows which one produced a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CadenceSource {
    Robust,
    Naive,
}

#[derive(Debug, Clone, Copy)]
struct Cadence {
    median_interval: f64,
    cv: f64,
    source: CadenceSource,
}

/// A customer overdue relative to their own ordering pattern.
#[derive(Debug, Clone, Serialize)]
pub struct OrderingAnomaly {
    pub customer_id: i64,
    pub company_name: String,
    pub segment: Segment,
    pub total_revenue: f64,
    pub order_count: i64,
    pub median_interval_days: f64,
    pub cadence_source: CadenceSource,
    pub last_order_date: NaiveDate,
    pub days_since_last_order: i64,
    pub expected_order_date: NaiveDate,
    pub days_overdue: i64,
    pub overdue_ratio: f64,
    pub severity: Severity,
    pub is_churned: bool,
}

fn cadence_for(
    customer: &CustomerRecord,
    stats: Option<&IntervalStats>,
    cfg: &AnalyticsConfig,
) -> Option<Cadence> {
    if let Some(stats) = stats {
        return Some(Cadence {
            median_interval: stats.median_interval_days,
            cv: stats.coefficient_of_variation(),
            source: CadenceSource::Robust,
        });
    }
    // Upstream aggregation missed this customer (window cap or procedure
    // failure): estimate the cadence from the lifetime span, with a moderate
    // assumed dispersion.
    let first = customer.first_sale_date?;
    let last = customer.last_sale_date?;
    if customer.lifetime_orders < 2 || last <= first {
        return None;
    }
    let interval = (last - first).num_days() as f64 / (customer.lifetime_orders - 1) as f64;
    Some(Cadence {
        median_interval: interval,
        cv: cfg.fallback_cv,
        source: CadenceSource::Naive,
    })
}

/// Decide whether one customer is an ordering anomaly.
///
/// The eligibility gate applies in order and short-circuits: corporate
/// gifting out, manual churn out, enough history with usable dates, median
/// inside the plausible cadence band (inclusive), dispersion under the CV
/// cap, and strictly more than `overdue_ratio_floor` of the median elapsed.
pub fn classify_anomaly(
    customer: &CustomerRecord,
    stats: Option<&IntervalStats>,
    now: NaiveDate,
    cfg: &AnalyticsConfig,
) -> Option<OrderingAnomaly> {
    if customer.is_corporate_gifting {
        return None;
    }
    if customer.manually_churned {
        return None;
    }
    if customer.lifetime_orders < cfg.min_order_count {
        return None;
    }
    customer.first_sale_date?;
    let last_order_date = customer.last_sale_date?;
    let days_since_last_order = customer.days_since_last_order?;

    let cadence = cadence_for(customer, stats, cfg)?;
    if cadence.median_interval < cfg.cadence_min_days
        || cadence.median_interval > cfg.cadence_max_days
    {
        return None;
    }
    if cadence.cv > cfg.max_coefficient_of_variation {
        return None;
    }

    let overdue_ratio = days_since_last_order as f64 / cadence.median_interval;
    if overdue_ratio <= cfg.overdue_ratio_floor {
        return None;
    }

    let severity = if overdue_ratio >= 2.0 {
        Severity::Critical
    } else if overdue_ratio >= 1.5 {
        Severity::Warning
    } else {
        Severity::Watch
    };
    let expected_order_date = last_order_date + Duration::days(cadence.median_interval.round() as i64);
    let days_overdue = (now - expected_order_date).num_days();

    Some(OrderingAnomaly {
        customer_id: customer.customer_id,
        company_name: customer.company_name.clone(),
        segment: customer.segment,
        total_revenue: customer.lifetime_revenue,
        order_count: customer.lifetime_orders,
        median_interval_days: cadence.median_interval,
        cadence_source: cadence.source,
        last_order_date,
        days_since_last_order,
        expected_order_date,
        days_overdue,
        overdue_ratio,
        severity,
        is_churned: days_since_last_order >= cfg.churn_days,
    })
}

/// Anomalies across the whole book, critical first, highest revenue first
/// within a tier. Churned customers stay in the list; callers filter.
pub fn detect_anomalies(
    customers: &[CustomerRecord],
    stats: &HashMap<i64, IntervalStats>,
    now: NaiveDate,
    cfg: &AnalyticsConfig,
) -> Vec<OrderingAnomaly> {
    let mut anomalies: Vec<OrderingAnomaly> = customers
        .iter()
        .filter_map(|c| classify_anomaly(c, stats.get(&c.customer_id), now, cfg))
        .collect();
    anomalies.sort_by(|a, b| {
        a.severity
            .rank()
            .cmp(&b.severity.rank())
            .then_with(|| {
                b.total_revenue
                    .partial_cmp(&a.total_revenue)
                    .unwrap_or(Ordering::Equal)
            })
    });
    anomalies
}

#[derive(Debug, Clone, Serialize)]
pub struct AtRiskCustomer {
    pub customer_id: i64,
    pub company_name: String,
    pub segment: Segment,
    pub health_status: HealthStatus,
    pub lifetime_revenue: f64,
    pub days_since_last_order: Option<i64>,
    pub risk_score: i64,
    pub recommended_action: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct GrowthOpportunity {
    pub customer_id: i64,
    pub company_name: String,
    pub segment: Segment,
    pub revenue_trend: f64,
    pub ytd_revenue: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalesLead {
    pub customer_id: i64,
    pub company_name: String,
    pub segment: Segment,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WinbackCandidate {
    pub customer_id: i64,
    pub company_name: String,
    pub lifetime_revenue: f64,
    pub last_order_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CohortSummary {
    pub at_risk: Vec<AtRiskCustomer>,
    pub growth_opportunities: Vec<GrowthOpportunity>,
    pub never_ordered: Vec<SalesLead>,
    pub winback: Vec<WinbackCandidate>,
}

pub fn b2b_with_orders(customers: &[CustomerRecord]) -> Vec<&CustomerRecord> {
    customers
        .iter()
        .filter(|c| !c.is_corporate_gifting && c.lifetime_orders > 0)
        .collect()
}

pub fn cohorts(customers: &[CustomerRecord], cfg: &AnalyticsConfig) -> CohortSummary {
    let mut at_risk: Vec<AtRiskCustomer> = customers
        .iter()
        .filter(|c| c.health_status.is_at_risk_band())
        .map(|c| {
            let days = c.days_since_last_order.unwrap_or(cfg.churn_days);
            // 365 days since the last order maps onto a risk score of 100.
            let risk_score = ((days as f64) / 3.65).round() as i64;
            AtRiskCustomer {
                customer_id: c.customer_id,
                company_name: c.company_name.clone(),
                segment: c.segment,
                health_status: c.health_status,
                lifetime_revenue: c.lifetime_revenue,
                days_since_last_order: c.days_since_last_order,
                risk_score: risk_score.clamp(0, 100),
                recommended_action: if days > 180 {
                    "Re-engagement campaign"
                } else {
                    "Check-in call"
                },
            }
        })
        .collect();
    at_risk.sort_by(|a, b| {
        b.risk_score.cmp(&a.risk_score).then_with(|| {
            b.lifetime_revenue
                .partial_cmp(&a.lifetime_revenue)
                .unwrap_or(Ordering::Equal)
        })
    });

    let mut growth_opportunities: Vec<GrowthOpportunity> = customers
        .iter()
        .filter(|c| {
            c.revenue_trend > cfg.growth_trend_floor
                && !matches!(
                    c.health_status,
                    HealthStatus::Churning | HealthStatus::Churned
                )
        })
        .map(|c| GrowthOpportunity {
            customer_id: c.customer_id,
            company_name: c.company_name.clone(),
            segment: c.segment,
            revenue_trend: c.revenue_trend,
            ytd_revenue: c.ytd_revenue,
        })
        .collect();
    growth_opportunities.sort_by(|a, b| {
        b.revenue_trend
            .partial_cmp(&a.revenue_trend)
            .unwrap_or(Ordering::Equal)
    });

    // Hottest leads first: accounts created most recently.
    let mut never_ordered: Vec<SalesLead> = customers
        .iter()
        .filter(|c| c.lifetime_orders == 0 && !c.is_corporate_gifting)
        .map(|c| SalesLead {
            customer_id: c.customer_id,
            company_name: c.company_name.clone(),
            segment: c.segment,
            created_at: c.created_at,
        })
        .collect();
    never_ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let mut winback: Vec<WinbackCandidate> = customers
        .iter()
        .filter(|c| {
            c.health_status == HealthStatus::Churned
                && !c.is_corporate_gifting
                && c.segment != Segment::Major
                && c.lifetime_orders >= 1
        })
        .map(|c| WinbackCandidate {
            customer_id: c.customer_id,
            company_name: c.company_name.clone(),
            lifetime_revenue: c.lifetime_revenue,
            last_order_date: c.last_sale_date,
        })
        .collect();
    winback.sort_by(|a, b| {
        b.lifetime_revenue
            .partial_cmp(&a.lifetime_revenue)
            .unwrap_or(Ordering::Equal)
    });

    CohortSummary {
        at_risk,
        growth_opportunities,
        never_ordered,
        winback,
    }
}

/// Health and segment distributions over the given (usually B2B) population.
pub fn distributions(
    customers: &[&CustomerRecord],
) -> (BTreeMap<String, i64>, BTreeMap<String, i64>) {
    let mut health: BTreeMap<String, i64> = BTreeMap::new();
    let mut segment: BTreeMap<String, i64> = BTreeMap::new();
    for c in customers {
        *health.entry(c.health_status.as_str().to_string()).or_insert(0) += 1;
        *segment.entry(c.segment.as_str().to_string()).or_insert(0) += 1;
    }
    (health, segment)
}
