use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Business Metrics
    pub static ref SESSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_sessions_total",
        "Total number of quiz sessions",
        &["event"]
    )
    .unwrap();

    pub static ref SESSIONS_OPEN: IntGauge = register_int_gauge!(
        "quiz_sessions_open",
        "Number of currently open quiz sessions"
    )
    .unwrap();

    pub static ref QUESTIONS_STARTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_questions_started_total",
        "Total number of questions started",
        &["method"]
    )
    .unwrap();

    pub static ref RESPONSES_SUBMITTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_responses_submitted_total",
        "Total number of responses submitted",
        &["qtype"]
    )
    .unwrap();

    pub static ref VOTES_CAST_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_votes_cast_total",
        "Total number of vote casts",
        &["accepted"]
    )
    .unwrap();

    pub static ref MERGES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_merges_total",
        "Total number of merge log operations",
        &["op"]
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}
