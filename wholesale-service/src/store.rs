use std::collections::HashMap;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use common_money::decimal_to_f64;
use sqlx::{FromRow, PgPool};

use crate::interval_stats::IntervalStats;
use crate::model::{RawCustomerRow, TransactionRecord};

#[derive(FromRow)]
struct TransactionRow {
    ns_customer_id: i64,
    tran_date: NaiveDate,
    total: Option<BigDecimal>,
    tran_type: Option<String>,
}

#[derive(FromRow)]
struct IntervalStatsRow {
    ns_customer_id: i64,
    median_interval: Option<f64>,
    mean_interval: Option<f64>,
    std_dev: Option<f64>,
}

pub async fn fetch_customers(pool: &PgPool) -> Result<Vec<RawCustomerRow>, sqlx::Error> {
    sqlx::query_as::<_, RawCustomerRow>(
        "SELECT
            ns_id, company_name, category,
            lifetime_revenue, ytd_revenue, avg_order_value, revenue_trend,
            first_sale_date, last_sale_date, lifetime_orders,
            health_status, segment, manually_churned, created_at
        FROM ns_wholesale_customers
        ORDER BY ns_id",
    )
    .fetch_all(pool)
    .await
}

/// Bounded, paged transaction load, ascending by date for deterministic
/// interval computation.
///
/// The REST gateway in front of the store truncates large result sets, so
/// every read walks LIMIT/OFFSET pages and concatenates until a short page
/// arrives.
pub async fn fetch_transactions(
    pool: &PgPool,
    since: NaiveDate,
    page_size: i64,
) -> Result<Vec<TransactionRecord>, sqlx::Error> {
    let mut transactions = Vec::new();
    let mut offset: i64 = 0;
    loop {
        let rows = sqlx::query_as::<_, TransactionRow>(
            "SELECT ns_customer_id, tran_date, total, type AS tran_type
             FROM ns_wholesale_transactions
             WHERE tran_date >= $1
             ORDER BY tran_date ASC, id ASC
             LIMIT $2 OFFSET $3",
        )
        .bind(since)
        .bind(page_size)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let page_len = rows.len() as i64;
        transactions.extend(rows.into_iter().map(|row| TransactionRecord {
            customer_id: row.ns_customer_id,
            tran_date: row.tran_date,
            total: decimal_to_f64(row.total.as_ref()),
            tran_type: row.tran_type,
        }));
        if page_len < page_size {
            break;
        }
        offset += page_size;
    }
    Ok(transactions)
}

/// Precomputed robust interval statistics from the stored aggregation
/// procedure. Callers fall back to the in-process engine when this read
/// fails; rows with NULL aggregates (insufficient history) are skipped.
pub async fn fetch_interval_stats(
    pool: &PgPool,
    min_order_count: i64,
) -> Result<HashMap<i64, IntervalStats>, sqlx::Error> {
    let rows = sqlx::query_as::<_, IntervalStatsRow>(
        "SELECT ns_customer_id, median_interval, mean_interval, std_dev
         FROM wholesale_order_intervals($1)",
    )
    .bind(min_order_count)
    .fetch_all(pool)
    .await?;

    let mut stats = HashMap::with_capacity(rows.len());
    for row in rows {
        if let (Some(median), Some(mean), Some(std_dev)) =
            (row.median_interval, row.mean_interval, row.std_dev)
        {
            stats.insert(
                row.ns_customer_id,
                IntervalStats {
                    median_interval_days: median,
                    mean_interval_days: mean,
                    std_dev_days: std_dev,
                },
            );
        }
    }
    Ok(stats)
}
