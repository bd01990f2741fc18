use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use tracing::warn;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("dashboard_requests_total", "Total API requests by endpoint"),
        &["endpoint"]
    )
    .unwrap();
    pub static ref INVALID_CATEGORY_TOTAL: IntCounter = IntCounter::with_opts(Opts::new(
        "dashboard_invalid_category_total",
        "Total requests rejected for an unknown search category"
    ))
    .unwrap();
    pub static ref DB_ERRORS_TOTAL: IntCounter = IntCounter::with_opts(Opts::new(
        "dashboard_db_errors_total",
        "Total failed database queries"
    ))
    .unwrap();
    pub static ref ANOMALIES_TOTAL: IntCounter = IntCounter::with_opts(Opts::new(
        "dashboard_anomalies_total",
        "Total anomalies reported by the device dashboard"
    ))
    .unwrap();
    pub static ref ROWS_RETURNED: Histogram = Histogram::with_opts(
        HistogramOpts::new("dashboard_rows_returned", "Rows returned per query")
            .buckets(vec![0.0, 1.0, 10.0, 100.0, 1000.0, 10000.0, 100000.0])
    )
    .unwrap();
    pub static ref QUERY_LATENCY_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new("dashboard_query_latency_seconds", "Database query latency")
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0
            ]),
        &["query"]
    )
    .unwrap();
}

pub fn init_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(REQUESTS_TOTAL.clone()),
        Box::new(INVALID_CATEGORY_TOTAL.clone()),
        Box::new(DB_ERRORS_TOTAL.clone()),
        Box::new(ANOMALIES_TOTAL.clone()),
        Box::new(ROWS_RETURNED.clone()),
        Box::new(QUERY_LATENCY_SECONDS.clone()),
    ];

    for collector in collectors {
        if let Err(e) = REGISTRY.register(collector) {
            warn!("Failed to register metric: {}", e);
        }
    }
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}
