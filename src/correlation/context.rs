//! Per-request correlation context.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::correlation::ids::{SpanId, TraceId};

/// Request metadata handed over by the HTTP layer.
///
/// Optional fields stay `None` rather than being dropped, so serialized
/// records always carry the same keys.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RequestMetadata {
    pub method: String,
    pub path: String,
    pub endpoint: String,
    pub query: Option<String>,
    pub remote_address: Option<String>,
    pub user_agent: Option<String>,
    pub content_length: Option<u64>,
}

impl RequestMetadata {
    /// Metadata with no client address or user agent.
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }
}

/// Identity and timing of one request.
///
/// Owned by the task handling the request. Not `Clone`: a context is never
/// shared or reused across requests.
#[derive(Debug)]
pub struct RequestContext {
    pub correlation_id: Uuid,
    pub trace_id: TraceId,
    /// Root span of the request.
    pub span_id: SpanId,
    pub started_at: Instant,
    pub started_at_utc: DateTime<Utc>,
    pub request: RequestMetadata,
}

impl RequestContext {
    /// Open a fresh context with newly generated identifiers.
    pub fn open(request: RequestMetadata) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            trace_id: TraceId::generate(),
            span_id: SpanId::generate(),
            started_at: Instant::now(),
            started_at_utc: Utc::now(),
            request,
        }
    }

    /// HTTP method, e.g. `GET`.
    pub fn method(&self) -> &str {
        &self.request.method
    }

    /// Request path without the query string.
    pub fn path(&self) -> &str {
        &self.request.path
    }

    /// Logical endpoint name used in labels.
    pub fn endpoint(&self) -> &str {
        &self.request.endpoint
    }

    /// Identifier for a child span under this request's trace.
    pub fn child_span_id(&self) -> SpanId {
        SpanId::generate()
    }

    /// W3C `traceparent` header value, sampled flag set.
    pub fn traceparent(&self) -> String {
        format!("00-{}-{}-01", self.trace_id, self.span_id)
    }
}
