//! Prometheus metrics exposition
//!
//! - `callback_requests_total` (counter): label `result`
//! - `exchange_requests_total` (counter): label `result`
//! - `token_exchange_duration_seconds` (histogram): label `result`

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// Configures `token_exchange_duration_seconds` with explicit buckets so it
/// renders as a histogram (with `_bucket` lines for `histogram_quantile()`
/// queries) rather than the default summary. The boundaries cover the range
/// from a warm provider round-trip to the exchange timeout.
pub fn install_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full(
                "token_exchange_duration_seconds".to_string(),
            ),
            &[0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )
        .expect("failed to set histogram buckets")
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Record a completed /callback request with its outcome label.
pub fn record_callback(result: &str) {
    metrics::counter!("callback_requests_total", "result" => result.to_string()).increment(1);
}

/// Record a completed /exchange request with its outcome label.
pub fn record_exchange(result: &str) {
    metrics::counter!("exchange_requests_total", "result" => result.to_string()).increment(1);
}

/// Record one outbound token-exchange call.
pub fn record_token_exchange(result: &str, duration_secs: f64) {
    metrics::histogram!("token_exchange_duration_seconds", "result" => result.to_string())
        .record(duration_secs);
}
