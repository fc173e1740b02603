use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use wholesale_service::classifier::{b2b_with_orders, cohorts, distributions};
use wholesale_service::config::AnalyticsConfig;
use wholesale_service::model::{CustomerRecord, HealthStatus, Segment};

fn day(n: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(n)
}

fn created(n: i64) -> Option<DateTime<Utc>> {
    Some(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + Duration::days(n))
}

fn customer(id: i64, health: HealthStatus, orders: i64) -> CustomerRecord {
    CustomerRecord {
        customer_id: id,
        company_name: format!("Account {id}"),
        category: Some("Wholesale".into()),
        is_corporate_gifting: false,
        manually_churned: false,
        lifetime_revenue: 10_000.0,
        ytd_revenue: 2_000.0,
        avg_order_value: 400.0,
        revenue_trend: 0.0,
        lifetime_orders: orders,
        first_sale_date: Some(day(0)),
        last_sale_date: Some(day(300)),
        days_since_last_order: Some(60),
        health_status: health,
        segment: Segment::Mid,
        created_at: None,
    }
}

#[test]
fn risk_score_maps_a_year_of_silence_to_one_hundred() {
    let cfg = AnalyticsConfig::default();
    let mut quiet = customer(1, HealthStatus::Churned, 5);
    quiet.days_since_last_order = Some(365);
    let mut very_quiet = customer(2, HealthStatus::Churned, 5);
    very_quiet.days_since_last_order = Some(900);
    let mut recent = customer(3, HealthStatus::AtRisk, 5);
    recent.days_since_last_order = Some(100);

    let summary = cohorts(&[quiet, very_quiet, recent], &cfg);
    let scores: Vec<(i64, i64)> = summary
        .at_risk
        .iter()
        .map(|c| (c.customer_id, c.risk_score))
        .collect();
    assert!(scores.contains(&(1, 100)));
    assert!(scores.contains(&(2, 100)));
    assert!(scores.contains(&(3, 27)));
}

#[test]
fn recommended_action_switches_past_180_days() {
    let cfg = AnalyticsConfig::default();
    let mut near = customer(1, HealthStatus::AtRisk, 5);
    near.days_since_last_order = Some(180);
    let mut far = customer(2, HealthStatus::AtRisk, 5);
    far.days_since_last_order = Some(181);

    let summary = cohorts(&[near, far], &cfg);
    for c in &summary.at_risk {
        match c.customer_id {
            1 => assert_eq!(c.recommended_action, "Check-in call"),
            2 => assert_eq!(c.recommended_action, "Re-engagement campaign"),
            _ => unreachable!(),
        }
    }
}

#[test]
fn healthy_customers_are_not_at_risk() {
    let cfg = AnalyticsConfig::default();
    let summary = cohorts(&[customer(1, HealthStatus::Healthy, 5)], &cfg);
    assert!(summary.at_risk.is_empty());
}

#[test]
fn growth_requires_trend_and_live_health() {
    let cfg = AnalyticsConfig::default();
    let mut fast = customer(1, HealthStatus::Healthy, 5);
    fast.revenue_trend = 40.0;
    let mut modest = customer(2, HealthStatus::Healthy, 5);
    modest.revenue_trend = 15.0;
    let mut flat = customer(3, HealthStatus::Healthy, 5);
    flat.revenue_trend = 10.0;
    let mut leaving = customer(4, HealthStatus::Churning, 5);
    leaving.revenue_trend = 80.0;

    let summary = cohorts(&[modest, flat, leaving, fast], &cfg);
    let ids: Vec<i64> = summary
        .growth_opportunities
        .iter()
        .map(|c| c.customer_id)
        .collect();
    // trend must exceed 10% and churning/churned are out; ranked by trend
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn never_ordered_ranks_newest_accounts_first() {
    let cfg = AnalyticsConfig::default();
    let mut old_lead = customer(1, HealthStatus::NeverOrdered, 0);
    old_lead.created_at = created(10);
    let mut new_lead = customer(2, HealthStatus::NeverOrdered, 0);
    new_lead.created_at = created(200);
    let mut dateless = customer(3, HealthStatus::NeverOrdered, 0);
    dateless.created_at = None;
    let mut corporate = customer(4, HealthStatus::NeverOrdered, 0);
    corporate.is_corporate_gifting = true;

    let summary = cohorts(&[old_lead, new_lead, dateless, corporate], &cfg);
    let ids: Vec<i64> = summary.never_ordered.iter().map(|c| c.customer_id).collect();
    assert_eq!(ids, vec![2, 1, 3]);
}

#[test]
fn winback_excludes_major_corporate_and_never_ordered() {
    let cfg = AnalyticsConfig::default();
    let mut small = customer(1, HealthStatus::Churned, 4);
    small.lifetime_revenue = 3_000.0;
    small.segment = Segment::Small;
    let mut mid = customer(2, HealthStatus::Churned, 6);
    mid.lifetime_revenue = 15_000.0;
    let mut major = customer(3, HealthStatus::Churned, 20);
    major.segment = Segment::Major;
    let mut corporate = customer(4, HealthStatus::Churned, 6);
    corporate.is_corporate_gifting = true;
    let no_orders = customer(5, HealthStatus::NeverOrdered, 0);

    let summary = cohorts(&[small, mid, major, corporate, no_orders], &cfg);
    let ids: Vec<i64> = summary.winback.iter().map(|c| c.customer_id).collect();
    assert_eq!(ids, vec![2, 1]);
}

#[test]
fn b2b_population_and_distributions() {
    let mut corporate = customer(1, HealthStatus::Healthy, 5);
    corporate.is_corporate_gifting = true;
    let lead = customer(2, HealthStatus::NeverOrdered, 0);
    let healthy = customer(3, HealthStatus::Healthy, 5);
    let mut churned = customer(4, HealthStatus::Churned, 3);
    churned.segment = Segment::Small;

    let customers = vec![corporate, lead, healthy, churned];
    let b2b = b2b_with_orders(&customers);
    assert_eq!(b2b.len(), 2);

    let (health, segment) = distributions(&b2b);
    assert_eq!(health.get("healthy"), Some(&1));
    assert_eq!(health.get("churned"), Some(&1));
    assert_eq!(segment.get("mid"), Some(&1));
    assert_eq!(segment.get("small"), Some(&1));
}
