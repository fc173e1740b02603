use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::TransactionRecord;

/// Robust inter-order statistics for a single customer, in days.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct IntervalStats {
    pub median_interval_days: f64,
    pub mean_interval_days: f64,
    pub std_dev_days: f64,
}

impl IntervalStats {
    pub fn coefficient_of_variation(&self) -> f64 {
        if self.mean_interval_days == 0.0 {
            0.0
        } else {
            self.std_dev_days / self.mean_interval_days
        }
    }
}

/// Median, mean, and population standard deviation of the gaps between
/// consecutive order dates.
///
/// Returns `None` below `min_order_count` orders: fewer than three gaps is
/// statistically unreliable, and downstream treats missing stats as
/// insufficient data rather than a failure.
pub fn compute(dates: &[NaiveDate], min_order_count: usize) -> Option<IntervalStats> {
    if dates.len() < min_order_count || dates.len() < 2 {
        return None;
    }
    let mut ordered = dates.to_vec();
    ordered.sort_unstable();

    let mut gaps: Vec<f64> = ordered
        .windows(2)
        .map(|w| (w[1] - w[0]).num_days() as f64)
        .collect();

    let mean = gaps.iter().sum::<f64>() / gaps.len() as f64;
    let variance = gaps
        .iter()
        .map(|g| {
            let diff = g - mean;
            diff * diff
        })
        .sum::<f64>()
        / gaps.len() as f64;

    gaps.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = gaps.len() / 2;
    let median = if gaps.len() % 2 == 1 {
        gaps[mid]
    } else {
        (gaps[mid - 1] + gaps[mid]) / 2.0
    };

    Some(IntervalStats {
        median_interval_days: median,
        mean_interval_days: mean,
        std_dev_days: variance.sqrt(),
    })
}

/// Group the bulk transaction load by customer and compute stats per
/// customer. Customers below the order minimum are simply absent.
pub fn stats_by_customer(
    transactions: &[TransactionRecord],
    min_order_count: usize,
) -> HashMap<i64, IntervalStats> {
    let mut dates: HashMap<i64, Vec<NaiveDate>> = HashMap::new();
    for txn in transactions {
        dates.entry(txn.customer_id).or_default().push(txn.tran_date);
    }
    dates
        .into_iter()
        .filter_map(|(id, ds)| compute(&ds, min_order_count).map(|s| (id, s)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(n: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(n as i64)
    }

    #[test]
    fn fewer_than_two_dates_is_no_stats() {
        assert!(compute(&[], 1).is_none());
        assert!(compute(&[day(0)], 1).is_none());
    }

    #[test]
    fn below_minimum_order_count_is_no_stats() {
        let dates = [day(0), day(30), day(60)];
        assert!(compute(&dates, 4).is_none());
    }

    #[test]
    fn unsorted_input_is_tolerated() {
        let dates = [day(60), day(0), day(30), day(90)];
        let stats = compute(&dates, 4).unwrap();
        assert_eq!(stats.median_interval_days, 30.0);
        assert_eq!(stats.std_dev_days, 0.0);
    }
}
