//! Prometheus metrics exposition
//!
//! Three series cover the gateway:
//!
//! - `embed_requests_total` (counter): labels `status`, `method`
//! - `embed_request_duration_seconds` (histogram): label `status`
//! - `embed_pipeline_errors_total` (counter): label `stage`

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// Configures `embed_request_duration_seconds` with explicit buckets so it
/// renders as a histogram (`_bucket` lines usable with `histogram_quantile()`)
/// rather than the default summary. A request makes two upstream calls in
/// sequence, so the range runs from 5ms to 60s.
pub fn install_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full(
                "embed_request_duration_seconds".to_string(),
            ),
            DURATION_BUCKETS,
        )
        .expect("failed to set histogram buckets")
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Record a completed request with status code and HTTP method labels.
pub fn record_request(status: u16, method: &str, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!("embed_requests_total", "status" => status_str.clone(), "method" => method.to_string())
        .increment(1);
    metrics::histogram!("embed_request_duration_seconds", "status" => status_str)
        .record(duration_secs);
}

/// Record a pipeline failure labelled with the stage that produced it.
pub fn record_pipeline_error(stage: &str) {
    metrics::counter!("embed_pipeline_errors_total", "stage" => stage.to_string()).increment(1);
}
