//! Prometheus exposition.
//!
//! # Responsibilities
//! - Install the global `metrics` recorder backing `GET /metrics`
//! - Describe every metric the telemetry registry produces
//!
//! # Design Decisions
//! - No separate listener; the handle is rendered by the app's own route
//! - Histogram buckets tuned for sub-second web latencies plus the
//!   injected-latency range

use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

const DURATION_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0];

/// Install the Prometheus recorder and describe every metric.
pub fn install_prometheus() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("request_duration_seconds".to_string()),
            DURATION_BUCKETS,
        )?
        .install_recorder()?;
    describe_metrics();
    tracing::info!("Prometheus recorder installed");
    Ok(handle)
}

fn describe_metrics() {
    metrics::describe_counter!("requests_total", "Completed requests");
    metrics::describe_counter!("slo_violations_total", "SLO violations by type and severity");
    metrics::describe_histogram!(
        "request_duration_seconds",
        metrics::Unit::Seconds,
        "End-to-end request duration"
    );
    metrics::describe_gauge!("active_requests", "Requests currently in flight");
    metrics::describe_gauge!("error_rate", "Rolling error rate per service version");
    metrics::describe_gauge!("health_status", "1 if the last request was healthy");
}
