//! Process observability.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     → logging.rs (tracing subscriber, JSON or pretty)
//!     → metrics.rs (Prometheus recorder; handle rendered at /metrics)
//!
//! Per request (see `telemetry`):
//!     log events → tracing target `telemetry`
//!     metric updates → `metrics` facade → Prometheus recorder
//! ```

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use self::metrics::install_prometheus;
