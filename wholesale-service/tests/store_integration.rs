use sqlx::PgPool;

fn require_database_url() -> Option<String> {
    std::env::var("WHOLESALE_TEST_DATABASE_URL")
        .ok()
        .or_else(|| std::env::var("DATABASE_URL").ok())
}

#[tokio::test]
#[cfg_attr(
    not(feature = "integration"),
    ignore = "enable with --features integration (requires Postgres with synced wholesale tables)"
)]
async fn base_reads_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let database_url = match require_database_url() {
        Some(url) => url,
        None => {
            eprintln!("Skipping store integration test because DATABASE_URL is not set.");
            return Ok(());
        }
    };

    let pool = PgPool::connect(&database_url).await?;
    let customers = wholesale_service::store::fetch_customers(&pool).await?;
    for row in customers.iter().take(5) {
        assert!(row.ns_id > 0);
    }

    let since = chrono::Utc::now().date_naive() - chrono::Duration::days(730);
    let transactions =
        wholesale_service::store::fetch_transactions(&pool, since, 1000).await?;
    for txn in transactions.iter().take(5) {
        assert!(txn.tran_date >= since);
    }

    Ok(())
}
