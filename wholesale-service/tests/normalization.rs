use chrono::NaiveDate;
use wholesale_service::model::{CustomerRecord, HealthStatus, RawCustomerRow};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn raw() -> RawCustomerRow {
    RawCustomerRow {
        ns_id: 2001,
        company_name: "Tidewater Trading Co".into(),
        category: Some("Wholesale".into()),
        lifetime_revenue: Some("18250.40".into()),
        ytd_revenue: Some("$4,100.00".into()),
        avg_order_value: None,
        revenue_trend: Some("not-a-number".into()),
        first_sale_date: Some(date(2023, 5, 2)),
        last_sale_date: Some(date(2025, 3, 18)),
        lifetime_orders: Some(12),
        health_status: Some("at_risk".into()),
        segment: None,
        manually_churned: None,
        created_at: None,
    }
}

#[test]
fn malformed_and_missing_decimals_coerce_to_zero() {
    let rec = CustomerRecord::from_row(raw(), None, date(2025, 4, 1));
    assert_eq!(rec.lifetime_revenue, 18250.40);
    assert_eq!(rec.ytd_revenue, 4100.0);
    assert_eq!(rec.avg_order_value, 0.0);
    assert_eq!(rec.revenue_trend, 0.0);
}

#[test]
fn days_since_last_order_comes_from_now() {
    let rec = CustomerRecord::from_row(raw(), None, date(2025, 4, 1));
    assert_eq!(rec.days_since_last_order, Some(14));
    assert_eq!(rec.health_status, HealthStatus::AtRisk);
}

#[test]
fn missing_segment_resolves_from_revenue() {
    let rec = CustomerRecord::from_row(raw(), None, date(2025, 4, 1));
    // 18250.40 sits in the legacy "mid" band, which is canonical mid
    let value = serde_json::to_value(&rec).unwrap();
    assert_eq!(value["segment"], "mid");
    assert_eq!(value["health_status"], "at_risk");
}

#[test]
fn customers_without_any_dates_stay_unflagged_material() {
    let mut row = raw();
    row.first_sale_date = None;
    row.last_sale_date = None;
    row.lifetime_orders = None;
    let rec = CustomerRecord::from_row(row, None, date(2025, 4, 1));
    assert_eq!(rec.lifetime_orders, 0);
    assert_eq!(rec.days_since_last_order, None);
    assert_eq!(rec.health_status, HealthStatus::NeverOrdered);
}
