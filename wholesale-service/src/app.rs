use std::sync::Arc;

use axum::http::{header::{ACCEPT, CONTENT_TYPE}, HeaderName, HeaderValue, Method, StatusCode};
use axum::{middleware, routing::get, Router};
use prometheus::{Encoder, TextEncoder};
use sqlx::PgPool;
use tower_http::cors::{AllowOrigin, CorsLayer};

use common_observability::WholesaleMetrics;

use crate::config::AnalyticsConfig;
use crate::wholesale_handlers::{get_anomalies, get_customers, get_overview};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub metrics: Arc<WholesaleMetrics>,
    pub config: Arc<AnalyticsConfig>,
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn http_error_metrics(
    axum::extract::State(metrics): axum::extract::State<Arc<WholesaleMetrics>>,
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let resp = next.run(req).await;
    let status = resp.status();
    if status.as_u16() >= 400 {
        let code = resp
            .headers()
            .get("X-Error-Code")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown");
        metrics
            .http_errors_total
            .with_label_values(&["wholesale-service", code, status.as_str()])
            .inc();
    }
    resp
}

async fn metrics_endpoint(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> (StatusCode, String) {
    let encoder = TextEncoder::new();
    let families = state.metrics.registry.gather();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buf) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encode error: {e}"),
        );
    }
    (StatusCode::OK, String::from_utf8_lossy(&buf).to_string())
}

pub fn build_router(state: AppState) -> Router {
    let allowed_origins = [
        "http://localhost:3000",
        "http://localhost:3001",
        "http://localhost:5173",
    ];
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            allowed_origins
                .iter()
                .filter_map(|o| o.parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        ))
        .allow_methods([Method::GET])
        .allow_headers([
            ACCEPT,
            CONTENT_TYPE,
            HeaderName::from_static("authorization"),
        ]);

    let metrics = state.metrics.clone();
    Router::new()
        .route("/healthz", get(health))
        .route("/wholesale/overview", get(get_overview))
        .route("/wholesale/anomalies", get(get_anomalies))
        .route("/wholesale/customers", get(get_customers))
        .route("/internal/metrics", get(metrics_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .layer(middleware::from_fn_with_state(metrics, http_error_metrics))
        .layer(cors)
}
