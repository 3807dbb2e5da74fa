//! HTTP surface.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs   (Axum router, timeout + trace layers)
//!     → handlers.rs (endpoint policy + business closure)
//!     → request.rs  (RequestMetadata for telemetry)
//!     → [lifecycle::Orchestrator runs the request]
//!     → response.rs (status, body, correlation headers)
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use response::{TRACEPARENT, X_CORRELATION_ID};
pub use server::{AppState, HttpServer};
