use std::{
    env,
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::Context;
use sqlx::PgPool;
use tokio::net::TcpListener;

use common_observability::WholesaleMetrics;
use wholesale_service::config::AnalyticsConfig;
use wholesale_service::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let db = PgPool::connect(&database_url).await?;

    let config = AnalyticsConfig::from_env();
    tracing::info!(
        min_order_count = config.min_order_count,
        window_months = config.window_months,
        page_size = config.page_size,
        "analytics config loaded"
    );

    let state = AppState {
        db,
        metrics: Arc::new(WholesaleMetrics::new()),
        config: Arc::new(config),
    };
    let app = build_router(state);

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8091);
    let ip: IpAddr = host.parse()?;
    let addr = SocketAddr::from((ip, port));

    println!("starting wholesale-service on {addr}");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
