//! Fault-injection and correlated-telemetry engine.

pub mod config;
pub mod correlation;
pub mod fault;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod telemetry;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::{Orchestrator, Shutdown};
