//! Structured telemetry events.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config::SimulationConfig;
use crate::correlation::{RequestContext, SpanId, TraceId};

/// Service name stamped on every event and span.
pub const SERVICE_NAME: &str = "web-app";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    RequestStarted,
    RequestCompleted,
    BusinessEvent,
    SystemHealth,
    SystemFailure,
    SloViolation,
}

impl EventType {
    /// Wire name of the event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::RequestStarted => "request_started",
            EventType::RequestCompleted => "request_completed",
            EventType::BusinessEvent => "business_event",
            EventType::SystemHealth => "system_health",
            EventType::SystemFailure => "system_failure",
            EventType::SloViolation => "slo_violation",
        }
    }
}

/// Identity of the emitting service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceMetadata {
    pub name: &'static str,
    pub version: String,
    pub version_label: String,
    pub deployment_type: &'static str,
}

impl ServiceMetadata {
    /// Service block stamped onto every event.
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            name: SERVICE_NAME,
            version: config.service_version.clone(),
            version_label: config.version_label.clone(),
            deployment_type: config.deployment_type(),
        }
    }
}

/// One emitted record. Never persisted here; handed to a writer.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryEvent {
    pub event_type: EventType,
    pub correlation_id: Uuid,
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub timestamp: DateTime<Utc>,
    pub service: ServiceMetadata,
    pub payload: Map<String, Value>,
}

impl TelemetryEvent {
    /// Event stamped with the request's identifiers and the current time.
    pub fn for_request(
        event_type: EventType,
        ctx: &RequestContext,
        service: ServiceMetadata,
        payload: Map<String, Value>,
    ) -> Self {
        Self {
            event_type,
            correlation_id: ctx.correlation_id,
            trace_id: ctx.trace_id,
            span_id: ctx.span_id,
            timestamp: Utc::now(),
            service,
            payload,
        }
    }

    /// Single-line JSON rendering.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::RequestMetadata;

    #[test]
    fn test_event_shape() {
        let ctx = RequestContext::open(RequestMetadata::new("GET", "/", "root"));
        let mut payload = Map::new();
        payload.insert("answer".into(), Value::from(42));
        let event = TelemetryEvent::for_request(
            EventType::BusinessEvent,
            &ctx,
            ServiceMetadata::from_config(&SimulationConfig::default()),
            payload,
        );

        let value: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(value["event_type"], "business_event");
        assert_eq!(value["correlation_id"], ctx.correlation_id.to_string());
        assert_eq!(value["trace_id"], ctx.trace_id.to_string());
        assert_eq!(value["span_id"], ctx.span_id.to_string());
        assert_eq!(value["service"]["name"], SERVICE_NAME);
        assert_eq!(value["service"]["deployment_type"], "stable");
        assert_eq!(value["payload"]["answer"], 42);
        assert!(value["timestamp"].as_str().unwrap().ends_with('Z'));
    }
}
