//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Probability of a complete outage when outage simulation is enabled.
pub const OUTAGE_PROBABILITY: f64 = 0.05;

/// Largest accepted `max_latency_seconds`. Larger bounds are clamped at load.
pub const MAX_LATENCY_CEILING_SECONDS: f64 = 300.0;

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener and request handling settings.
    pub server: ServerConfig,

    /// Fault injection settings.
    pub simulation: SimulationConfig,

    /// Service-level objective thresholds.
    pub slo: SloConfig,

    /// Process logging and metrics export.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,

    /// Request timeout in seconds. Requests aborted by this timeout lose
    /// their completion telemetry.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Fault injection configuration. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Master switch for every bad-SLO simulation.
    pub sim_bad_enabled: bool,

    /// Probability in [0, 1] that a request fails with a simulated error.
    pub error_rate: f64,

    /// Enable artificial latency.
    pub latency_sim_enabled: bool,

    /// Upper bound of the latency draw in seconds.
    pub max_latency_seconds: f64,

    /// Enable complete outages.
    pub outage_sim_enabled: bool,

    /// Probability of an outage per request. Fixed; neither the file nor
    /// the environment can change it.
    #[serde(skip_deserializing, default = "default_outage_probability")]
    pub outage_probability: f64,

    /// Semantic service version, used as the metric/estimator key.
    pub service_version: String,

    /// Free-form deployment label, e.g. "v1.2.0-canary".
    pub version_label: String,
}

fn default_outage_probability() -> f64 {
    OUTAGE_PROBABILITY
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sim_bad_enabled: false,
            error_rate: 0.2,
            latency_sim_enabled: false,
            max_latency_seconds: 2.0,
            outage_sim_enabled: false,
            outage_probability: OUTAGE_PROBABILITY,
            service_version: "1.0.0".to_string(),
            version_label: "v1.0.0-unknown".to_string(),
        }
    }
}

impl SimulationConfig {
    /// "canary" when the label says so, "stable" otherwise.
    pub fn deployment_type(&self) -> &'static str {
        if self.version_label.to_lowercase().contains("canary") {
            "canary"
        } else {
            "stable"
        }
    }
}

/// SLO thresholds used to classify completed requests.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SloConfig {
    /// Requests slower than this are a `latency` violation (warning);
    /// slower than twice this, critical.
    pub latency_target_seconds: f64,
}

impl Default for SloConfig {
    fn default() -> Self {
        Self {
            latency_target_seconds: 1.0,
        }
    }
}

/// Output format for process logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Observability settings for the process itself.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log output format.
    pub log_format: LogFormat,

    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub log_filter: String,

    /// Install the Prometheus recorder and serve `/metrics`.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            log_filter: "fault_telemetry=info,telemetry=info,tower_http=info".to_string(),
            metrics_enabled: true,
        }
    }
}
