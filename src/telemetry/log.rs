//! Structured log emitter.
//!
//! # Responsibilities
//! - Build one `TelemetryEvent` per logical occurrence of a request
//! - Embed the request identifiers, the simulation config and the decision
//! - Hand each event to an `EventWriter` as a single write
//!
//! # Design Decisions
//! - Absent request metadata is serialized as null, never omitted
//! - The default writer renders JSON through `tracing` on target `telemetry`

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::{json, Map, Value};

use crate::config::SimulationConfig;
use crate::correlation::RequestContext;
use crate::telemetry::event::{EventType, ServiceMetadata, TelemetryEvent};
use crate::telemetry::sink::{CompletionReport, EmissionError, TelemetrySink};

/// Destination for finished events.
pub trait EventWriter: Send + Sync {
    fn write(&self, event: &TelemetryEvent) -> Result<(), EmissionError>;
}

/// Writes each event as one JSON line through `tracing`.
#[derive(Debug, Default)]
pub struct TracingEventWriter;

impl EventWriter for TracingEventWriter {
    fn write(&self, event: &TelemetryEvent) -> Result<(), EmissionError> {
        let record = event.to_json()?;
        match event.event_type {
            EventType::SystemFailure => tracing::error!(
                target: "telemetry",
                event_type = event.event_type.as_str(),
                correlation_id = %event.correlation_id,
                trace_id = %event.trace_id,
                "{record}"
            ),
            EventType::SloViolation => tracing::warn!(
                target: "telemetry",
                event_type = event.event_type.as_str(),
                correlation_id = %event.correlation_id,
                trace_id = %event.trace_id,
                "{record}"
            ),
            _ => tracing::info!(
                target: "telemetry",
                event_type = event.event_type.as_str(),
                correlation_id = %event.correlation_id,
                trace_id = %event.trace_id,
                "{record}"
            ),
        }
        Ok(())
    }
}

/// Keeps events in memory. Used by tests and local inspection.
#[derive(Debug, Default)]
pub struct MemoryEventWriter {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl MemoryEventWriter {
    /// Empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far.
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events of one type, in write order.
    pub fn of_type(&self, event_type: EventType) -> Vec<TelemetryEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Drop every captured event.
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl EventWriter for MemoryEventWriter {
    fn write(&self, event: &TelemetryEvent) -> Result<(), EmissionError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}

impl<W: EventWriter + ?Sized> EventWriter for Arc<W> {
    fn write(&self, event: &TelemetryEvent) -> Result<(), EmissionError> {
        (**self).write(event)
    }
}

/// Log sink: turns request lifecycle points into structured events.
pub struct LogEmitter {
    writer: Box<dyn EventWriter>,
}

impl LogEmitter {
    /// Emitter writing through `writer`.
    pub fn new(writer: impl EventWriter + 'static) -> Self {
        Self {
            writer: Box::new(writer),
        }
    }

    /// Emitter backed by [`TracingEventWriter`].
    pub fn tracing() -> Self {
        Self::new(TracingEventWriter)
    }

    fn emit(
        &self,
        event_type: EventType,
        ctx: &RequestContext,
        config: &SimulationConfig,
        payload: Map<String, Value>,
    ) -> Result<(), EmissionError> {
        let event = TelemetryEvent::for_request(
            event_type,
            ctx,
            ServiceMetadata::from_config(config),
            payload,
        );
        self.writer.write(&event)
    }
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

fn fault_payload(report: &CompletionReport<'_>) -> Value {
    let d = report.decision;
    json!({
        "outage_triggered": d.outage_triggered,
        "error_triggered": d.error_triggered,
        "simulated_latency_seconds": d.simulated_latency_seconds,
        "latency_injected": d.latency_injected,
        "healthy": d.healthy(),
        "failure_type": d.failure_type(),
    })
}

impl TelemetrySink for LogEmitter {
    fn name(&self) -> &'static str {
        "log"
    }

    fn request_started(
        &self,
        ctx: &RequestContext,
        config: &SimulationConfig,
    ) -> Result<(), EmissionError> {
        let payload = json!({
            "request": &ctx.request,
            "simulation": config,
        });
        self.emit(EventType::RequestStarted, ctx, config, into_map(payload))
    }

    fn request_completed(&self, report: &CompletionReport<'_>) -> Result<(), EmissionError> {
        let ctx = report.context;
        let config = report.config;
        let mut first_error = None;
        let mut record = |result: Result<(), EmissionError>| {
            if let Err(e) = result {
                first_error.get_or_insert(e);
            }
        };

        if report.healthy() {
            for event in report.events {
                record(self.emit(event.event_type, ctx, config, event.payload.clone()));
            }
        }

        if report.health_check {
            let payload = json!({
                "status": if report.healthy() { "healthy" } else { "unhealthy" },
                "failure_type": report.outcome.as_str(),
                "status_code": report.status_code,
            });
            record(self.emit(EventType::SystemHealth, ctx, config, into_map(payload)));
        }

        if !report.healthy() {
            let payload = json!({
                "failure_type": report.outcome.as_str(),
                "status_code": report.status_code,
                "endpoint": ctx.endpoint(),
                "error": report.error_message,
                "fault": fault_payload(report),
            });
            record(self.emit(EventType::SystemFailure, ctx, config, into_map(payload)));
        }

        for violation in report.violations {
            let payload = json!({
                "violation_type": violation.violation_type,
                "severity": violation.severity,
                "observed": violation.observed,
                "threshold": violation.threshold,
                "endpoint": ctx.endpoint(),
            });
            record(self.emit(EventType::SloViolation, ctx, config, into_map(payload)));
        }

        let payload = json!({
            "request": &ctx.request,
            "response": {
                "status_code": report.status_code,
                "status_category": report.status_category(),
                "duration_seconds": report.duration.as_secs_f64(),
                "outcome": report.outcome.as_str(),
            },
            "fault": fault_payload(report),
            "simulation": config,
            "error": report.error_message,
            "slo_violations": report.violations.len(),
        });
        record(self.emit(EventType::RequestCompleted, ctx, config, into_map(payload)));

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
