use chrono::{Months, NaiveDate};
use std::env;

// Aggregate marketplace accounts (Amazon, Faire, corporate drop-ship) that
// post under a single customer id and would distort per-customer cadence and
// acquisition cohorts.
const DEFAULT_EXCLUDED_ACCOUNTS: &[i64] = &[1696, 2875, 4810];

/// Tunables for the wholesale analytics core. Built once in `main` and passed
/// into every computation; nothing below lives in module-level state.
#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    /// Lifetime orders required before a customer has a usable cadence.
    pub min_order_count: i64,
    /// Plausible cadence band, inclusive on both edges. Shorter medians are
    /// split-shipment noise; longer ones are too infrequent to predict.
    pub cadence_min_days: f64,
    pub cadence_max_days: f64,
    /// Customers with more relative dispersion than this have no exploitable
    /// ordering pattern.
    pub max_coefficient_of_variation: f64,
    /// Strictly-greater-than floor on days-late relative to the median
    /// interval before a customer is flagged.
    pub overdue_ratio_floor: f64,
    /// Assumed coefficient of variation when only the naive cadence estimate
    /// is available.
    pub fallback_cv: f64,
    pub churn_days: i64,
    /// A new customer whose window revenue exceeds this multiple of the
    /// combined per-customer average is treated as an acquisition outlier.
    pub outlier_multiplier: f64,
    /// Minimum revenue-trend percentage for the growth-opportunity cohort.
    pub growth_trend_floor: f64,
    /// Bounded transaction load window for cadence analysis.
    pub window_months: u32,
    pub page_size: i64,
    pub excluded_account_ids: Vec<i64>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            min_order_count: 4,
            cadence_min_days: 14.0,
            cadence_max_days: 180.0,
            max_coefficient_of_variation: 1.5,
            overdue_ratio_floor: 1.2,
            fallback_cv: 0.5,
            churn_days: 365,
            outlier_multiplier: 3.0,
            growth_trend_floor: 10.0,
            window_months: 24,
            page_size: 5000,
            excluded_account_ids: DEFAULT_EXCLUDED_ACCOUNTS.to_vec(),
        }
    }
}

impl AnalyticsConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(value) = env::var("WHOLESALE_MIN_ORDER_COUNT") {
            if let Ok(parsed) = value.parse() {
                config.min_order_count = parsed;
            }
        }
        if let Ok(value) = env::var("WHOLESALE_WINDOW_MONTHS") {
            if let Ok(parsed) = value.parse() {
                config.window_months = parsed;
            }
        }
        if let Ok(value) = env::var("WHOLESALE_PAGE_SIZE") {
            if let Ok(parsed) = value.parse() {
                config.page_size = parsed;
            }
        }
        if let Ok(value) = env::var("WHOLESALE_EXCLUDED_ACCOUNTS") {
            let ids: Vec<i64> = value
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if !ids.is_empty() {
                config.excluded_account_ids = ids;
            }
        }
        config
    }

    /// Start of the bounded transaction load window.
    pub fn window_start(&self, now: NaiveDate) -> NaiveDate {
        now.checked_sub_months(Months::new(self.window_months))
            .unwrap_or(now)
    }

    pub fn is_excluded_account(&self, customer_id: i64) -> bool {
        self.excluded_account_ids.contains(&customer_id)
    }
}
