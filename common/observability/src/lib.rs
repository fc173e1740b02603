use prometheus::{Histogram, IntCounter, IntCounterVec, IntGauge, Registry};

#[derive(Clone)]
pub struct WholesaleMetrics {
    pub registry: Registry,
    pub analytics_duration_seconds: Histogram,
    pub partial_failures: IntCounter,
    pub transactions_scanned: IntGauge,
    pub customers_scanned: IntGauge,
    pub anomalies_flagged: IntGauge,
    pub http_errors_total: IntCounterVec,
}

impl WholesaleMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        let analytics_duration_seconds = Histogram::with_opts(
            prometheus::HistogramOpts::new(
                "wholesale_analytics_duration_seconds",
                "Duration of a full wholesale analytics computation"
            ).buckets(vec![0.01,0.05,0.1,0.25,0.5,1.0,2.0,5.0])
        ).unwrap();
        let partial_failures = IntCounter::new(
            "wholesale_partial_failures_total",
            "Analytics sections that failed and were omitted from a response",
        ).unwrap();
        let transactions_scanned = IntGauge::new(
            "wholesale_transactions_scanned",
            "Transactions loaded for the most recent analytics run",
        ).unwrap();
        let customers_scanned = IntGauge::new(
            "wholesale_customers_scanned",
            "Customer dimension rows loaded for the most recent analytics run",
        ).unwrap();
        let anomalies_flagged = IntGauge::new(
            "wholesale_anomalies_flagged",
            "Ordering anomalies flagged in the most recent analytics run",
        ).unwrap();
        let http_errors_total = IntCounterVec::new(
            prometheus::Opts::new(
                "http_errors_total",
                "Count of HTTP error responses emitted (status >= 400)"
            ),
            &["service", "code", "status"]
        ).unwrap();
        let _ = registry.register(Box::new(analytics_duration_seconds.clone()));
        let _ = registry.register(Box::new(partial_failures.clone()));
        let _ = registry.register(Box::new(transactions_scanned.clone()));
        let _ = registry.register(Box::new(customers_scanned.clone()));
        let _ = registry.register(Box::new(anomalies_flagged.clone()));
        let _ = registry.register(Box::new(http_errors_total.clone()));
        WholesaleMetrics { registry, analytics_duration_seconds, partial_failures, transactions_scanned, customers_scanned, anomalies_flagged, http_errors_total }
    }
}

impl Default for WholesaleMetrics {
    fn default() -> Self { Self::new() }
}
