//! Request metrics.
//!
//! # Metrics
//! - `requests_total` (counter): method, endpoint, status_code, version
//! - `slo_violations_total` (counter): violation_type, severity, endpoint
//! - `request_duration_seconds` (histogram): method, endpoint, version
//! - `active_requests` (gauge): method, endpoint
//! - `error_rate` (gauge): version
//! - `health_status` (gauge): version, 1 = last request healthy
//!
//! # Design Decisions
//! - The registry is an owned object; every update is mirrored to the
//!   `metrics` facade so an installed exporter sees it
//! - The registry keeps its own values so they can be read back without a
//!   global recorder
//! - The in-flight gauge is released by a guard's `Drop`, so every exit
//!   path decrements exactly once

use std::sync::Arc;

use dashmap::DashMap;

use crate::telemetry::sink::{CompletionReport, EmissionError, TelemetrySink};
use crate::telemetry::slo::SloViolation;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RequestSeries {
    method: String,
    endpoint: String,
    status_code: u16,
    version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ViolationSeries {
    violation_type: &'static str,
    severity: &'static str,
    endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DurationSeries {
    method: String,
    endpoint: String,
    version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ActiveSeries {
    method: String,
    endpoint: String,
}

/// Count and sum of a histogram series.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DurationStats {
    pub count: u64,
    pub sum_seconds: f64,
}

/// Owned store of every metric the service produces.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    requests: DashMap<RequestSeries, u64>,
    slo_violations: DashMap<ViolationSeries, u64>,
    durations: DashMap<DurationSeries, DurationStats>,
    active: DashMap<ActiveSeries, i64>,
    error_rate: DashMap<String, f64>,
    health: DashMap<String, f64>,
}

impl MetricsRegistry {
    /// Empty registry. Updates are mirrored to the global `metrics` recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one finished request and observe its duration.
    pub fn record_request(
        &self,
        method: &str,
        endpoint: &str,
        status_code: u16,
        version: &str,
        duration_seconds: f64,
    ) {
        *self
            .requests
            .entry(RequestSeries {
                method: method.to_string(),
                endpoint: endpoint.to_string(),
                status_code,
                version: version.to_string(),
            })
            .or_insert(0) += 1;

        {
            let mut stats = self
                .durations
                .entry(DurationSeries {
                    method: method.to_string(),
                    endpoint: endpoint.to_string(),
                    version: version.to_string(),
                })
                .or_default();
            stats.count += 1;
            stats.sum_seconds += duration_seconds;
        }

        metrics::counter!(
            "requests_total",
            "method" => method.to_string(),
            "endpoint" => endpoint.to_string(),
            "status_code" => status_code.to_string(),
            "version" => version.to_string()
        )
        .increment(1);
        metrics::histogram!(
            "request_duration_seconds",
            "method" => method.to_string(),
            "endpoint" => endpoint.to_string(),
            "version" => version.to_string()
        )
        .record(duration_seconds);
    }

    /// Count one violation against `endpoint`.
    pub fn record_slo_violation(&self, violation: &SloViolation, endpoint: &str) {
        let violation_type = violation.violation_type.as_str();
        let severity = violation.severity.as_str();
        *self
            .slo_violations
            .entry(ViolationSeries {
                violation_type,
                severity,
                endpoint: endpoint.to_string(),
            })
            .or_insert(0) += 1;

        metrics::counter!(
            "slo_violations_total",
            "violation_type" => violation_type,
            "severity" => severity,
            "endpoint" => endpoint.to_string()
        )
        .increment(1);
    }

    /// Publish the smoothed error rate for `version`.
    pub fn set_error_rate(&self, version: &str, rate: f64) {
        self.error_rate.insert(version.to_string(), rate);
        metrics::gauge!("error_rate", "version" => version.to_string()).set(rate);
    }

    /// 1.0 when healthy, 0.0 otherwise.
    pub fn set_health_status(&self, version: &str, healthy: bool) {
        let value = if healthy { 1.0 } else { 0.0 };
        self.health.insert(version.to_string(), value);
        metrics::gauge!("health_status", "version" => version.to_string()).set(value);
    }

    /// Mark a request in flight until the returned guard is dropped.
    pub fn track_in_flight(self: &Arc<Self>, method: &str, endpoint: &str) -> InFlightGuard {
        let series = ActiveSeries {
            method: method.to_string(),
            endpoint: endpoint.to_string(),
        };
        self.adjust_active(&series, 1);
        InFlightGuard {
            registry: self.clone(),
            series,
        }
    }

    fn adjust_active(&self, series: &ActiveSeries, delta: i64) {
        *self.active.entry(series.clone()).or_insert(0) += delta;
        let gauge = metrics::gauge!(
            "active_requests",
            "method" => series.method.clone(),
            "endpoint" => series.endpoint.clone()
        );
        if delta >= 0 {
            gauge.increment(delta as f64);
        } else {
            gauge.decrement((-delta) as f64);
        }
    }

    // --- Read back ---

    /// Completed requests for one label set.
    pub fn requests_total(
        &self,
        method: &str,
        endpoint: &str,
        status_code: u16,
        version: &str,
    ) -> u64 {
        self.requests
            .get(&RequestSeries {
                method: method.to_string(),
                endpoint: endpoint.to_string(),
                status_code,
                version: version.to_string(),
            })
            .map(|v| *v)
            .unwrap_or(0)
    }

    /// Sum of `requests_total` over every series.
    pub fn total_requests(&self) -> u64 {
        self.requests.iter().map(|r| *r.value()).sum()
    }

    /// Violations counted for one label set.
    pub fn slo_violations_total(
        &self,
        violation_type: &str,
        severity: &str,
        endpoint: &str,
    ) -> u64 {
        self.slo_violations
            .iter()
            .filter(|r| {
                r.key().violation_type == violation_type
                    && r.key().severity == severity
                    && r.key().endpoint == endpoint
            })
            .map(|r| *r.value())
            .sum()
    }

    /// Observed latency stats for one series.
    pub fn request_duration(&self, method: &str, endpoint: &str, version: &str) -> DurationStats {
        self.durations
            .get(&DurationSeries {
                method: method.to_string(),
                endpoint: endpoint.to_string(),
                version: version.to_string(),
            })
            .map(|v| *v)
            .unwrap_or_default()
    }

    /// Requests currently in flight for one series.
    pub fn active_requests(&self, method: &str, endpoint: &str) -> i64 {
        self.active
            .get(&ActiveSeries {
                method: method.to_string(),
                endpoint: endpoint.to_string(),
            })
            .map(|v| *v)
            .unwrap_or(0)
    }

    /// Sum of `active_requests` over every series.
    pub fn total_active_requests(&self) -> i64 {
        self.active.iter().map(|r| *r.value()).sum()
    }

    /// Last published error rate, if any.
    pub fn error_rate(&self, version: &str) -> Option<f64> {
        self.error_rate.get(version).map(|v| *v)
    }

    /// Last published health gauge value, if any.
    pub fn health_status(&self, version: &str) -> Option<f64> {
        self.health.get(version).map(|v| *v)
    }
}

/// Holds one unit of the `active_requests` gauge.
#[derive(Debug)]
pub struct InFlightGuard {
    registry: Arc<MetricsRegistry>,
    series: ActiveSeries,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.adjust_active(&self.series, -1);
    }
}

/// Metric sink: one counter increment and one histogram observation per
/// request, plus SLO and health gauges.
pub struct MetricRecorder {
    registry: Arc<MetricsRegistry>,
}

impl MetricRecorder {
    /// Sink recording into `registry`.
    pub fn new(registry: Arc<MetricsRegistry>) -> Self {
        Self { registry }
    }
}

impl TelemetrySink for MetricRecorder {
    fn name(&self) -> &'static str {
        "metrics"
    }

    fn request_completed(&self, report: &CompletionReport<'_>) -> Result<(), EmissionError> {
        let ctx = report.context;
        let version = &report.config.service_version;

        self.registry.record_request(
            ctx.method(),
            ctx.endpoint(),
            report.status_code,
            version,
            report.duration.as_secs_f64(),
        );
        for violation in report.violations {
            self.registry.record_slo_violation(violation, ctx.endpoint());
        }
        self.registry.set_health_status(version, report.healthy());

        tracing::debug!(
            correlation_id = %ctx.correlation_id,
            trace_id = %ctx.trace_id,
            method = ctx.method(),
            endpoint = ctx.endpoint(),
            status_code = report.status_code,
            version = %version,
            "Request metrics recorded"
        );
        Ok(())
    }
}
