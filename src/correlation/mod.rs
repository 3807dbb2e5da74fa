//! Request correlation.
//!
//! The correlation id, trace id and root span id generated here are the
//! only identifiers threaded into log events, metric updates and span
//! records for a request. Joining signals after the fact relies on it.

pub mod context;
pub mod ids;

pub use context::{RequestContext, RequestMetadata};
pub use ids::{SpanId, TraceId};
