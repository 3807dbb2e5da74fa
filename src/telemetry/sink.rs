//! The seam between the orchestrator and the three telemetry sinks.

use std::time::Duration;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::SimulationConfig;
use crate::correlation::RequestContext;
use crate::fault::{FaultDecision, FaultKind};
use crate::telemetry::event::EventType;
use crate::telemetry::slo::SloViolation;
use crate::telemetry::span::ChildSpan;

/// A sink failed to accept a record.
#[derive(Debug, Error)]
pub enum EmissionError {
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("sink {sink} rejected record: {reason}")]
    Rejected { sink: &'static str, reason: String },
    #[error("sink {0} panicked")]
    Panicked(&'static str),
}

/// How a request ended, independent of its response payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Healthy,
    Fault(FaultKind),
    HandlerFailure,
}

impl OutcomeKind {
    /// Whether this outcome counts against the error rate.
    pub fn is_error(&self) -> bool {
        !matches!(self, OutcomeKind::Healthy)
    }

    /// Stable label for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Healthy => "healthy",
            OutcomeKind::Fault(kind) => kind.as_str(),
            OutcomeKind::HandlerFailure => "handler_failure",
        }
    }
}

/// Event produced by a business handler, emitted only on the healthy path.
#[derive(Debug, Clone)]
pub struct DomainEvent {
    pub event_type: EventType,
    pub payload: Map<String, Value>,
}

impl DomainEvent {
    /// A `business_event` carrying `payload`.
    pub fn business(payload: Map<String, Value>) -> Self {
        Self {
            event_type: EventType::BusinessEvent,
            payload,
        }
    }
}

/// Everything a sink needs to record one completed request.
#[derive(Debug)]
pub struct CompletionReport<'a> {
    pub context: &'a RequestContext,
    pub decision: &'a FaultDecision,
    pub config: &'a SimulationConfig,
    pub outcome: OutcomeKind,
    pub status_code: u16,
    pub duration: Duration,
    /// Root span name, e.g. `root_endpoint`.
    pub span_name: &'static str,
    /// The endpoint is a health check and reports `system_health`.
    pub health_check: bool,
    pub error_message: Option<&'a str>,
    pub violations: &'a [SloViolation],
    pub child_spans: &'a [ChildSpan],
    /// Extra root span attributes from the handler, e.g. `users.count`.
    pub attributes: &'a Map<String, Value>,
    pub events: &'a [DomainEvent],
}

impl CompletionReport<'_> {
    /// Whether the request finished without a fault or handler failure.
    pub fn healthy(&self) -> bool {
        !self.outcome.is_error()
    }

    /// "2xx", "5xx", ...
    pub fn status_category(&self) -> String {
        format!("{}xx", self.status_code / 100)
    }
}

/// One of the independent telemetry sinks.
///
/// Failures are returned, never raised; the orchestrator logs them and moves
/// on to the next sink.
pub trait TelemetrySink: Send + Sync {
    fn name(&self) -> &'static str;

    fn request_started(
        &self,
        _ctx: &RequestContext,
        _config: &SimulationConfig,
    ) -> Result<(), EmissionError> {
        Ok(())
    }

    fn request_completed(&self, report: &CompletionReport<'_>) -> Result<(), EmissionError>;

    /// Push out anything buffered. Called once at shutdown.
    fn flush(&self) -> Result<(), EmissionError> {
        Ok(())
    }
}
