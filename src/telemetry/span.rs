//! Span recording.
//!
//! One root span per request plus child spans for the simulation steps,
//! all under the request's trace id. Each span is exported exactly once,
//! when the request completes.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::correlation::{SpanId, TraceId};
use crate::telemetry::event::SERVICE_NAME;
use crate::telemetry::sink::{CompletionReport, EmissionError, TelemetrySink};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", content = "message", rename_all = "snake_case")]
pub enum SpanStatus {
    Unset,
    Ok,
    Error(String),
}

impl SpanStatus {
    /// True for `SpanStatus::Error`.
    pub fn is_error(&self) -> bool {
        matches!(self, SpanStatus::Error(_))
    }
}

/// A sub-operation timed inside the request, recorded by the orchestrator.
#[derive(Debug, Clone)]
pub struct ChildSpan {
    pub name: &'static str,
    pub span_id: SpanId,
    /// `None` means the request's root span.
    pub parent: Option<SpanId>,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub attributes: Map<String, Value>,
}

impl ChildSpan {
    /// Open a child span now; `parent` defaults to the root.
    pub fn new(name: &'static str, span_id: SpanId, parent: Option<SpanId>) -> Self {
        Self {
            name,
            span_id,
            parent,
            started_at: Utc::now(),
            duration: Duration::ZERO,
            attributes: Map::new(),
        }
    }

    /// Set one attribute.
    pub fn attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    /// Record the span's elapsed time.
    pub fn finish(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

/// A closed span, ready for export.
#[derive(Debug, Clone, Serialize)]
pub struct SpanRecord {
    pub name: String,
    pub service: &'static str,
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub parent_span_id: Option<SpanId>,
    pub correlation_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub duration_seconds: f64,
    pub status: SpanStatus,
    pub attributes: Map<String, Value>,
}

/// Destination for closed spans.
pub trait SpanExporter: Send + Sync {
    fn export(&self, span: SpanRecord) -> Result<(), EmissionError>;
}

/// Logs each closed span as JSON at debug level on target `telemetry::span`.
#[derive(Debug, Default)]
pub struct TracingSpanExporter;

impl SpanExporter for TracingSpanExporter {
    fn export(&self, span: SpanRecord) -> Result<(), EmissionError> {
        let record = serde_json::to_string(&span)?;
        tracing::debug!(
            target: "telemetry::span",
            span_name = %span.name,
            trace_id = %span.trace_id,
            span_id = %span.span_id,
            "{record}"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemorySpanExporter {
    spans: Mutex<Vec<SpanRecord>>,
}

impl InMemorySpanExporter {
    /// Empty exporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every exported span, in export order.
    pub fn spans(&self) -> Vec<SpanRecord> {
        self.spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Spans without a parent.
    pub fn roots(&self) -> Vec<SpanRecord> {
        self.spans()
            .into_iter()
            .filter(|s| s.parent_span_id.is_none())
            .collect()
    }

    /// Exported spans with the given name.
    pub fn named(&self, name: &str) -> Vec<SpanRecord> {
        self.spans().into_iter().filter(|s| s.name == name).collect()
    }
}

impl SpanExporter for InMemorySpanExporter {
    fn export(&self, span: SpanRecord) -> Result<(), EmissionError> {
        self.spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(span);
        Ok(())
    }
}

impl<E: SpanExporter + ?Sized> SpanExporter for Arc<E> {
    fn export(&self, span: SpanRecord) -> Result<(), EmissionError> {
        (**self).export(span)
    }
}

/// Span sink.
pub struct SpanRecorder {
    exporter: Box<dyn SpanExporter>,
}

impl SpanRecorder {
    /// Recorder exporting through `exporter`.
    pub fn new(exporter: impl SpanExporter + 'static) -> Self {
        Self {
            exporter: Box::new(exporter),
        }
    }

    /// Recorder backed by [`TracingSpanExporter`].
    pub fn tracing() -> Self {
        Self::new(TracingSpanExporter)
    }

    fn root_span(report: &CompletionReport<'_>) -> SpanRecord {
        let ctx = report.context;
        let config = report.config;
        let decision = report.decision;

        let mut attributes = Map::new();
        attributes.insert("slo.sim_bad".into(), config.sim_bad_enabled.into());
        attributes.insert("slo.error_rate".into(), config.error_rate.into());
        attributes.insert("service.version".into(), config.service_version.clone().into());
        attributes.insert("version.label".into(), config.version_label.clone().into());
        attributes.insert("http.method".into(), ctx.method().into());
        attributes.insert("http.route".into(), ctx.path().into());
        attributes.insert("http.status_code".into(), report.status_code.into());
        attributes.insert(
            "response.latency_ms".into(),
            (decision.simulated_latency_seconds * 1000.0).into(),
        );
        attributes.insert(
            "response.status".into(),
            (if report.healthy() { "success" } else { "error" }).into(),
        );
        attributes.insert("failure.type".into(), report.outcome.as_str().into());
        for (key, value) in report.attributes {
            attributes.insert(key.clone(), value.clone());
        }

        let status = if report.healthy() {
            SpanStatus::Ok
        } else {
            let message = report
                .error_message
                .unwrap_or("Service simulation failure")
                .to_string();
            SpanStatus::Error(message)
        };

        SpanRecord {
            name: report.span_name.to_string(),
            service: SERVICE_NAME,
            trace_id: ctx.trace_id,
            span_id: ctx.span_id,
            parent_span_id: None,
            correlation_id: ctx.correlation_id,
            start_time: ctx.started_at_utc,
            duration_seconds: report.duration.as_secs_f64(),
            status,
            attributes,
        }
    }
}

impl TelemetrySink for SpanRecorder {
    fn name(&self) -> &'static str {
        "spans"
    }

    fn request_completed(&self, report: &CompletionReport<'_>) -> Result<(), EmissionError> {
        let ctx = report.context;
        let mut first_error = None;

        // Children close before their parent. A rejected child never
        // suppresses the root.
        for child in report.child_spans {
            let exported = self.exporter.export(SpanRecord {
                name: child.name.to_string(),
                service: SERVICE_NAME,
                trace_id: ctx.trace_id,
                span_id: child.span_id,
                parent_span_id: Some(child.parent.unwrap_or(ctx.span_id)),
                correlation_id: ctx.correlation_id,
                start_time: child.started_at,
                duration_seconds: child.duration.as_secs_f64(),
                status: SpanStatus::Unset,
                attributes: child.attributes.clone(),
            });
            if let Err(e) = exported {
                first_error.get_or_insert(e);
            }
        }

        let root = self.exporter.export(Self::root_span(report));
        match first_error {
            Some(e) => Err(e),
            None => root,
        }
    }
}
