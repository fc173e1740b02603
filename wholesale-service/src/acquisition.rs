use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use common_money::round_cents;
use serde::Serialize;
use sqlx::PgPool;

use crate::config::AnalyticsConfig;
use crate::model::{CustomerRecord, TransactionRecord};
use crate::store;

/// The comparison spans two back-to-back trailing-365-day windows.
pub const LOOKBACK_DAYS: i64 = 730;

#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error("transaction scan failed: {0}")]
    Scan(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowLabel {
    Current,
    Prior,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct WindowTotals {
    pub new_customers: i64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewCustomerOutlier {
    pub customer_id: i64,
    pub company_name: String,
    pub window: WindowLabel,
    pub revenue: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CountDelta {
    pub absolute: i64,
    pub percent: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RevenueDelta {
    pub absolute: f64,
    pub percent: Option<f64>,
}

/// Year-over-year new-customer acquisition, raw and with revenue outliers
/// removed.
#[derive(Debug, Clone, Serialize)]
pub struct AcquisitionComparison {
    pub current: WindowTotals,
    pub prior: WindowTotals,
    pub adjusted_current: WindowTotals,
    pub adjusted_prior: WindowTotals,
    pub count_delta: CountDelta,
    pub revenue_delta: RevenueDelta,
    pub adjusted_count_delta: CountDelta,
    pub adjusted_revenue_delta: RevenueDelta,
    pub outliers: Vec<NewCustomerOutlier>,
}

/// Partition customers into the two acquisition windows and compare them.
///
/// A customer is "new" in the window holding their first-ever order date;
/// their cohort revenue is everything they ordered inside that window, not
/// just the first order. Corporate gifting customers and the configured
/// aggregate accounts never join a cohort.
pub fn compare(
    transactions: &[TransactionRecord],
    customers: &[CustomerRecord],
    now: NaiveDate,
    cfg: &AnalyticsConfig,
) -> AcquisitionComparison {
    let by_id: HashMap<i64, &CustomerRecord> =
        customers.iter().map(|c| (c.customer_id, c)).collect();
    let current_start = now - Duration::days(365);
    let prior_start = now - Duration::days(LOOKBACK_DAYS);

    // First-ever order per customer: the earlier of the stored dimension date
    // and the earliest observed transaction. The scan is window-capped, so
    // neither source alone is trustworthy.
    let mut first_order: HashMap<i64, NaiveDate> = HashMap::new();
    for txn in transactions {
        if cfg.is_excluded_account(txn.customer_id) {
            continue;
        }
        if by_id
            .get(&txn.customer_id)
            .map(|c| c.is_corporate_gifting)
            .unwrap_or(false)
        {
            continue;
        }
        first_order
            .entry(txn.customer_id)
            .and_modify(|d| {
                if txn.tran_date < *d {
                    *d = txn.tran_date;
                }
            })
            .or_insert(txn.tran_date);
    }
    for (id, first) in first_order.iter_mut() {
        if let Some(stored) = by_id.get(id).and_then(|c| c.first_sale_date) {
            if stored < *first {
                *first = stored;
            }
        }
    }

    let mut member_window: HashMap<i64, WindowLabel> = HashMap::new();
    for (id, first) in &first_order {
        if *first > current_start && *first <= now {
            member_window.insert(*id, WindowLabel::Current);
        } else if *first > prior_start && *first <= current_start {
            member_window.insert(*id, WindowLabel::Prior);
        }
    }

    let mut window_revenue: HashMap<i64, f64> = HashMap::new();
    for txn in transactions {
        let Some(window) = member_window.get(&txn.customer_id) else {
            continue;
        };
        let in_window = match window {
            WindowLabel::Current => txn.tran_date > current_start && txn.tran_date <= now,
            WindowLabel::Prior => {
                txn.tran_date > prior_start && txn.tran_date <= current_start
            }
        };
        if in_window {
            *window_revenue.entry(txn.customer_id).or_insert(0.0) += txn.total;
        }
    }

    let mut current = WindowTotals::default();
    let mut prior = WindowTotals::default();
    for (id, window) in &member_window {
        let revenue = window_revenue.get(id).copied().unwrap_or(0.0);
        match window {
            WindowLabel::Current => {
                current.new_customers += 1;
                current.revenue += revenue;
            }
            WindowLabel::Prior => {
                prior.new_customers += 1;
                prior.revenue += revenue;
            }
        }
    }

    // Single-pass outlier exclusion against the combined average; removing an
    // outlier never re-flags anyone else.
    let combined_count = (current.new_customers + prior.new_customers).max(1) as f64;
    let combined_avg = (current.revenue + prior.revenue) / combined_count;
    let threshold = cfg.outlier_multiplier * combined_avg;

    let mut outliers: Vec<NewCustomerOutlier> = Vec::new();
    let mut adjusted_current = current;
    let mut adjusted_prior = prior;
    for (id, window) in &member_window {
        let revenue = window_revenue.get(id).copied().unwrap_or(0.0);
        if combined_avg > 0.0 && revenue > threshold {
            let company_name = by_id
                .get(id)
                .map(|c| c.company_name.clone())
                .unwrap_or_else(|| format!("customer {id}"));
            outliers.push(NewCustomerOutlier {
                customer_id: *id,
                company_name,
                window: *window,
                revenue: round_cents(revenue),
            });
            match window {
                WindowLabel::Current => {
                    adjusted_current.new_customers -= 1;
                    adjusted_current.revenue -= revenue;
                }
                WindowLabel::Prior => {
                    adjusted_prior.new_customers -= 1;
                    adjusted_prior.revenue -= revenue;
                }
            }
        }
    }
    outliers.sort_by(|a, b| b.revenue.partial_cmp(&a.revenue).unwrap_or(Ordering::Equal));

    // Reporting totals round to cents; float accumulation dust from the raw
    // transaction sums must not leak into the payload.
    let current = rounded(current);
    let prior = rounded(prior);
    let adjusted_current = rounded(adjusted_current);
    let adjusted_prior = rounded(adjusted_prior);

    AcquisitionComparison {
        count_delta: count_delta(current.new_customers, prior.new_customers),
        revenue_delta: revenue_delta(current.revenue, prior.revenue),
        adjusted_count_delta: count_delta(
            adjusted_current.new_customers,
            adjusted_prior.new_customers,
        ),
        adjusted_revenue_delta: revenue_delta(adjusted_current.revenue, adjusted_prior.revenue),
        current,
        prior,
        adjusted_current,
        adjusted_prior,
        outliers,
    }
}

fn rounded(totals: WindowTotals) -> WindowTotals {
    WindowTotals {
        new_customers: totals.new_customers,
        revenue: round_cents(totals.revenue),
    }
}

fn count_delta(current: i64, prior: i64) -> CountDelta {
    let percent = if prior > 0 {
        Some((current - prior) as f64 / prior as f64 * 100.0)
    } else {
        None
    };
    CountDelta {
        absolute: current - prior,
        percent,
    }
}

fn revenue_delta(current: f64, prior: f64) -> RevenueDelta {
    let percent = if prior.abs() > f64::EPSILON {
        Some((current - prior) / prior * 100.0)
    } else {
        None
    };
    RevenueDelta {
        absolute: round_cents(current - prior),
        percent,
    }
}

/// Run the comparison on its own two-year scan — the most failure-prone read
/// in the service. Callers treat an error here as a partial failure and still
/// return every other section.
pub async fn load_and_compare(
    pool: &PgPool,
    customers: &[CustomerRecord],
    now: NaiveDate,
    cfg: &AnalyticsConfig,
) -> Result<AcquisitionComparison, AcquisitionError> {
    let since = now - Duration::days(LOOKBACK_DAYS);
    let transactions = store::fetch_transactions(pool, since, cfg.page_size).await?;
    Ok(compare(&transactions, customers, now, cfg))
}
