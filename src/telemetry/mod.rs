//! Correlated telemetry subsystem.
//!
//! # Data Flow
//! ```text
//! Orchestrator (one CompletionReport per request)
//!     → log.rs     (structured TelemetryEvents → EventWriter)
//!     → metrics.rs (MetricsRegistry + `metrics` facade)
//!     → span.rs    (SpanRecords → SpanExporter)
//!
//! Shared by all three:
//!     correlation id, trace id, root span id of the request
//! ```
//!
//! # Design Decisions
//! - Sinks are independent; one failing never stops the others
//! - Sinks return errors instead of raising them
//! - SLO classification happens once, before any sink runs

pub mod event;
pub mod log;
pub mod metrics;
pub mod sink;
pub mod slo;
pub mod span;

pub use event::{EventType, ServiceMetadata, TelemetryEvent};
pub use self::log::{EventWriter, LogEmitter, MemoryEventWriter, TracingEventWriter};
pub use self::metrics::{InFlightGuard, MetricRecorder, MetricsRegistry};
pub use sink::{CompletionReport, DomainEvent, EmissionError, OutcomeKind, TelemetrySink};
pub use slo::{classify, Severity, SloViolation, ViolationType};
pub use span::{ChildSpan, InMemorySpanExporter, SpanExporter, SpanRecord, SpanRecorder, SpanStatus};
