use std::collections::BTreeMap;

use axum::extract::State;
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use common_http_errors::{ApiError, ApiResult};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::acquisition::{self, AcquisitionComparison};
use crate::app::AppState;
use crate::classifier::{self, CohortSummary, OrderingAnomaly};
use crate::interval_stats;
use crate::model::{self, CustomerRecord};
use crate::store;

#[derive(Serialize)]
pub struct WholesaleOverview {
    pub generated_at: DateTime<Utc>,
    pub customer_count: usize,
    pub b2b_with_orders: usize,
    pub customers: Vec<CustomerRecord>,
    pub ordering_anomalies: Vec<OrderingAnomaly>,
    pub acquisition: Option<AcquisitionComparison>,
    pub cohorts: CohortSummary,
    pub health_distribution: BTreeMap<String, i64>,
    pub segment_distribution: BTreeMap<String, i64>,
    pub partial_errors: Vec<String>,
}

struct CoreData {
    generated_at: DateTime<Utc>,
    customers: Vec<CustomerRecord>,
    anomalies: Vec<OrderingAnomaly>,
}

fn db_internal(err: sqlx::Error, trace_id: Uuid) -> ApiError {
    ApiError::Internal {
        trace_id: Some(trace_id),
        message: Some(format!("DB error: {}", err)),
    }
}

// Everything here is recomputed from the two base tables on each request; a
// short shared cache window keeps the endpoints cheap to poll.
fn cacheable_json<T: Serialize>(value: T) -> Response {
    let mut resp = Json(value).into_response();
    resp.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("private, max-age=60"),
    );
    resp
}

async fn load_core(state: &AppState, trace_id: Uuid) -> ApiResult<CoreData> {
    let generated_at = Utc::now();
    let now = generated_at.date_naive();
    let cfg = state.config.as_ref();
    let window_start = cfg.window_start(now);

    // Failure of either base read is fatal: there is nothing meaningful to
    // compute without them.
    let (raw_customers, transactions) = tokio::try_join!(
        store::fetch_customers(&state.db),
        store::fetch_transactions(&state.db, window_start, cfg.page_size),
    )
    .map_err(|e| db_internal(e, trace_id))?;

    state.metrics.customers_scanned.set(raw_customers.len() as i64);
    state
        .metrics
        .transactions_scanned
        .set(transactions.len() as i64);

    let stats = match store::fetch_interval_stats(&state.db, cfg.min_order_count).await {
        Ok(map) => map,
        Err(err) => {
            warn!(trace_id = %trace_id, error = %err, "interval stats procedure unavailable; computing in-process");
            interval_stats::stats_by_customer(&transactions, cfg.min_order_count as usize)
        }
    };

    let spans = model::observed_spans(&transactions);
    let customers: Vec<CustomerRecord> = raw_customers
        .into_iter()
        .map(|row| {
            let span = spans.get(&row.ns_id);
            CustomerRecord::from_row(row, span, now)
        })
        .collect();

    let anomalies = classifier::detect_anomalies(&customers, &stats, now, cfg);
    state.metrics.anomalies_flagged.set(anomalies.len() as i64);

    Ok(CoreData {
        generated_at,
        customers,
        anomalies,
    })
}

pub async fn get_overview(State(state): State<AppState>) -> ApiResult<Response> {
    let trace_id = Uuid::new_v4();
    let timer = state.metrics.analytics_duration_seconds.start_timer();
    let core = load_core(&state, trace_id).await?;
    let cfg = state.config.as_ref();
    let now = core.generated_at.date_naive();

    let cohorts = classifier::cohorts(&core.customers, cfg);
    let b2b = classifier::b2b_with_orders(&core.customers);
    let (health_distribution, segment_distribution) = classifier::distributions(&b2b);
    let b2b_with_orders = b2b.len();

    let mut partial_errors = Vec::new();
    let acquisition =
        match acquisition::load_and_compare(&state.db, &core.customers, now, cfg).await {
            Ok(summary) => Some(summary),
            Err(err) => {
                warn!(trace_id = %trace_id, error = %err, "acquisition comparison failed; returning partial response");
                state.metrics.partial_failures.inc();
                partial_errors.push(format!("acquisition: {err}"));
                None
            }
        };

    timer.observe_duration();
    Ok(cacheable_json(WholesaleOverview {
        generated_at: core.generated_at,
        customer_count: core.customers.len(),
        b2b_with_orders,
        customers: core.customers,
        ordering_anomalies: core.anomalies,
        acquisition,
        cohorts,
        health_distribution,
        segment_distribution,
        partial_errors,
    }))
}

pub async fn get_anomalies(State(state): State<AppState>) -> ApiResult<Response> {
    let trace_id = Uuid::new_v4();
    let core = load_core(&state, trace_id).await?;
    Ok(cacheable_json(core.anomalies))
}

pub async fn get_customers(State(state): State<AppState>) -> ApiResult<Response> {
    let trace_id = Uuid::new_v4();
    let core = load_core(&state, trace_id).await?;
    Ok(cacheable_json(core.customers))
}
