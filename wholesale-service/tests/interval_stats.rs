use chrono::{Duration, NaiveDate};
use wholesale_service::interval_stats::{compute, stats_by_customer};
use wholesale_service::model::TransactionRecord;

fn day(n: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(n)
}

fn txn(customer_id: i64, n: i64) -> TransactionRecord {
    TransactionRecord {
        customer_id,
        tran_date: day(n),
        total: 500.0,
        tran_type: Some("CustInvc".into()),
    }
}

#[test]
fn median_of_odd_gap_count_is_middle_value() {
    // gaps 10, 20, 30
    let dates = [day(0), day(10), day(30), day(60)];
    let stats = compute(&dates, 4).unwrap();
    assert_eq!(stats.median_interval_days, 20.0);
    assert_eq!(stats.mean_interval_days, 20.0);
}

#[test]
fn median_of_even_gap_count_averages_middle_values() {
    // gaps 10, 20, 30, 40
    let dates = [day(0), day(10), day(30), day(60), day(100)];
    let stats = compute(&dates, 4).unwrap();
    assert_eq!(stats.median_interval_days, 25.0);
    assert_eq!(stats.mean_interval_days, 25.0);
}

#[test]
fn population_std_dev_and_cv() {
    // gaps 10, 20, 30: population variance 200/3
    let dates = [day(0), day(10), day(30), day(60)];
    let stats = compute(&dates, 4).unwrap();
    let expected_sd = (200.0_f64 / 3.0).sqrt();
    assert!((stats.std_dev_days - expected_sd).abs() < 1e-9);
    assert!((stats.coefficient_of_variation() - expected_sd / 20.0).abs() < 1e-9);
}

#[test]
fn uniform_cadence_has_zero_dispersion() {
    let dates = [day(0), day(30), day(60), day(90)];
    let stats = compute(&dates, 4).unwrap();
    assert_eq!(stats.median_interval_days, 30.0);
    assert_eq!(stats.std_dev_days, 0.0);
    assert_eq!(stats.coefficient_of_variation(), 0.0);
}

#[test]
fn below_minimum_is_insufficient_data() {
    let dates = [day(0), day(30), day(60)];
    assert!(compute(&dates, 4).is_none());
    // and the grouping helper simply omits the customer
    let txns: Vec<TransactionRecord> = vec![txn(1, 0), txn(1, 30), txn(1, 60)];
    assert!(stats_by_customer(&txns, 4).is_empty());
}

#[test]
fn grouping_keys_stats_by_customer() {
    let mut txns = Vec::new();
    for n in [0, 30, 60, 90] {
        txns.push(txn(7, n));
    }
    for n in [0, 15, 200] {
        txns.push(txn(8, n));
    }
    let stats = stats_by_customer(&txns, 4);
    assert_eq!(stats.len(), 1);
    assert_eq!(stats.get(&7).unwrap().median_interval_days, 30.0);
    assert!(!stats.contains_key(&8));
}
