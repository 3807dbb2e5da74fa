//! Service health estimation.
//!
//! # Data Flow
//! ```text
//! Completed request (endpoint not excluded)
//!     → error_rate.rs update(service_version, is_error)
//!     → new EWMA returned to the orchestrator
//!     → error_rate{version} gauge
//! ```
//!
//! # Design Decisions
//! - One estimate per service version, shared by all in-flight requests
//! - Updates are serialized per key, never across keys

pub mod error_rate;

pub use error_rate::{RollingErrorRate, SMOOTHING_ALPHA};
