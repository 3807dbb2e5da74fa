//! Request lifecycle orchestration.
//!
//! # States
//! ```text
//! STARTED → FAULT_EVALUATED → HANDLER_RAN → COMPLETED
//! ```
//! - STARTED: context opened, in-flight guard taken, `request_started` emitted
//! - FAULT_EVALUATED: decision drawn, injected latency slept
//! - HANDLER_RAN: handler ran only if the decision is healthy; otherwise a
//!   fault outcome is synthesized without touching business logic
//! - COMPLETED: every sink runs once, then the estimator is updated. The
//!   in-flight guard is released last, on every exit path
//!
//! # Known signal loss
//! If the HTTP layer drops the request future before COMPLETED (timeout),
//! completion telemetry is not emitted. The in-flight gauge is still
//! released because the guard is dropped with the future.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::schema::MAX_LATENCY_CEILING_SECONDS;
use crate::config::{SimulationConfig, SloConfig};
use crate::correlation::{RequestContext, RequestMetadata, SpanId, TraceId};
use crate::fault::{self, FaultDecision, FaultKind, RandomSource, SystemRandom};
use crate::health::RollingErrorRate;
use crate::telemetry::{
    self, ChildSpan, CompletionReport, DomainEvent, EmissionError, EventWriter, LogEmitter,
    MetricRecorder, MetricsRegistry, OutcomeKind, SpanExporter, SpanRecorder, TelemetrySink,
};

/// Static description of a route, as seen by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    /// Metric/log label, e.g. `root`.
    pub name: &'static str,
    /// Root span name, e.g. `root_endpoint`.
    pub span_name: &'static str,
    pub inject_faults: bool,
    /// Whether completions feed the rolling error rate.
    pub track_error_rate: bool,
    /// Whether completions emit a `system_health` event.
    pub health_check: bool,
}

impl Endpoint {
    /// Endpoint that injects faults and feeds the estimator.
    pub const fn new(name: &'static str, span_name: &'static str) -> Self {
        Self {
            name,
            span_name,
            inject_faults: true,
            track_error_rate: true,
            health_check: false,
        }
    }

    /// Skip fault evaluation.
    pub const fn without_faults(mut self) -> Self {
        self.inject_faults = false;
        self
    }

    /// Keep out of the error-rate estimator.
    pub const fn untracked(mut self) -> Self {
        self.track_error_rate = false;
        self
    }

    /// Mark as a health check; a healthy result sets the health gauge.
    pub const fn health_check(mut self) -> Self {
        self.health_check = true;
        self
    }
}

/// Response body produced by a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Text(String),
    Json(Value),
}

/// Successful handler output.
#[derive(Debug, Clone)]
pub struct HandlerResponse {
    pub status: u16,
    pub body: ResponseBody,
    /// Added to the root span.
    pub attributes: Map<String, Value>,
    pub events: Vec<DomainEvent>,
}

impl HandlerResponse {
    /// 200 with a plain text body.
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: ResponseBody::Text(body.into()),
            attributes: Map::new(),
            events: Vec::new(),
        }
    }

    /// 200 with a JSON body.
    pub fn json(body: Value) -> Self {
        Self {
            status: 200,
            body: ResponseBody::Json(body),
            attributes: Map::new(),
            events: Vec::new(),
        }
    }

    /// Extra attribute on the root span.
    pub fn with_attribute(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    /// Domain event emitted after the handler succeeds.
    pub fn with_event(mut self, event: DomainEvent) -> Self {
        self.events.push(event);
        self
    }
}

/// Business handler failure.
#[derive(Debug, Clone, Error)]
pub enum HandlerError {
    #[error("handler failed: {0}")]
    Failed(String),
    #[error("handler panicked: {0}")]
    Panicked(String),
}

/// Tagged result of the two-stage pipeline.
#[derive(Debug, Clone)]
pub enum RequestOutcome {
    Healthy(HandlerResponse),
    Fault(FaultKind),
    Failed(HandlerError),
}

impl RequestOutcome {
    /// Outcome category used by the sinks.
    pub fn kind(&self) -> OutcomeKind {
        match self {
            RequestOutcome::Healthy(_) => OutcomeKind::Healthy,
            RequestOutcome::Fault(kind) => OutcomeKind::Fault(*kind),
            RequestOutcome::Failed(_) => OutcomeKind::HandlerFailure,
        }
    }

    /// HTTP status the outcome maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            RequestOutcome::Healthy(response) => response.status,
            RequestOutcome::Fault(FaultKind::Outage) => 503,
            RequestOutcome::Fault(FaultKind::ErrorRate) => 500,
            RequestOutcome::Failed(_) => 500,
        }
    }
}

/// What the handler gets to see of the request.
#[derive(Debug, Clone)]
pub struct RequestScope {
    pub correlation_id: Uuid,
    pub trace_id: TraceId,
    pub simulated_latency_seconds: f64,
}

/// A completed request, handed back to the HTTP layer.
#[derive(Debug, Clone)]
pub struct HandledRequest {
    pub correlation_id: Uuid,
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub traceparent: String,
    pub decision: FaultDecision,
    pub outcome: RequestOutcome,
}

impl HandledRequest {
    /// HTTP status the outcome maps to.
    pub fn status_code(&self) -> u16 {
        self.outcome.status_code()
    }
}

/// Drives every request through the fault engine and the telemetry sinks.
pub struct Orchestrator {
    config: Arc<SimulationConfig>,
    slo: SloConfig,
    rng: Mutex<Box<dyn RandomSource>>,
    registry: Arc<MetricsRegistry>,
    estimator: Arc<RollingErrorRate>,
    sinks: Vec<Arc<dyn TelemetrySink>>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("slo", &self.slo)
            .field("sinks", &self.sinks.iter().map(|s| s.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl Orchestrator {
    /// Start building with the default sinks and an entropy-seeded source.
    pub fn builder(config: SimulationConfig) -> OrchestratorBuilder {
        OrchestratorBuilder::new(config)
    }

    /// Simulation settings in effect.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// SLO thresholds in effect.
    pub fn slo(&self) -> &SloConfig {
        &self.slo
    }

    /// Registry the metric sink records into.
    pub fn registry(&self) -> &Arc<MetricsRegistry> {
        &self.registry
    }

    /// Shared error-rate estimator.
    pub fn estimator(&self) -> &Arc<RollingErrorRate> {
        &self.estimator
    }

    /// Current rolling error rate of the configured service version.
    pub fn current_error_rate(&self) -> f64 {
        self.estimator.current(&self.config.service_version)
    }

    /// Run one request end to end.
    pub async fn handle<F, Fut>(
        &self,
        request: RequestMetadata,
        endpoint: &Endpoint,
        handler: F,
    ) -> HandledRequest
    where
        F: FnOnce(RequestScope) -> Fut,
        Fut: Future<Output = Result<HandlerResponse, HandlerError>>,
    {
        let ctx = RequestContext::open(request);
        let span = tracing::info_span!(
            "request",
            correlation_id = %ctx.correlation_id,
            trace_id = %ctx.trace_id,
            span_id = %ctx.span_id,
            endpoint = endpoint.name,
            status_code = tracing::field::Empty,
        );
        self.run(ctx, endpoint, handler).instrument(span).await
    }

    async fn run<F, Fut>(
        &self,
        ctx: RequestContext,
        endpoint: &Endpoint,
        handler: F,
    ) -> HandledRequest
    where
        F: FnOnce(RequestScope) -> Fut,
        Fut: Future<Output = Result<HandlerResponse, HandlerError>>,
    {
        // STARTED
        let _in_flight = self.registry.track_in_flight(ctx.method(), ctx.endpoint());
        self.dispatch("request_started", |sink| sink.request_started(&ctx, &self.config));

        // FAULT_EVALUATED
        let mut child_spans = Vec::new();
        let decision = if endpoint.inject_faults {
            self.evaluate_faults(&ctx, &mut child_spans).await
        } else {
            FaultDecision::baseline()
        };

        // HANDLER_RAN
        let outcome = match decision.fault() {
            Some(kind) => {
                tracing::debug!(failure_type = kind.as_str(), "Skipping handler, fault injected");
                RequestOutcome::Fault(kind)
            }
            None => {
                let scope = RequestScope {
                    correlation_id: ctx.correlation_id,
                    trace_id: ctx.trace_id,
                    simulated_latency_seconds: decision.simulated_latency_seconds,
                };
                run_handler(handler, scope).await
            }
        };

        // COMPLETED
        self.complete(&ctx, endpoint, &decision, &outcome, &child_spans);

        HandledRequest {
            correlation_id: ctx.correlation_id,
            trace_id: ctx.trace_id,
            span_id: ctx.span_id,
            traceparent: ctx.traceparent(),
            decision,
            outcome,
        }
    }

    async fn evaluate_faults(
        &self,
        ctx: &RequestContext,
        spans: &mut Vec<ChildSpan>,
    ) -> FaultDecision {
        let health_span = ChildSpan::new("health_simulation", ctx.child_span_id(), None);
        let started = Instant::now();
        let decision = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            fault::decide(&self.config, rng.as_mut())
        };
        let elapsed = started.elapsed();
        let health_id = health_span.span_id;

        spans.push(
            health_span
                .attr("slo.sim_bad", self.config.sim_bad_enabled)
                .attr("failure.type", decision.failure_type())
                .finish(elapsed),
        );
        spans.push(
            ChildSpan::new("simulate_outage", ctx.child_span_id(), Some(health_id))
                .attr("outage.simulation_enabled", decision.outage_evaluated)
                .attr("outage.should_fail", decision.outage_triggered)
                .finish(elapsed),
        );
        if !decision.outage_triggered {
            spans.push(
                ChildSpan::new("simulate_error_rate", ctx.child_span_id(), Some(health_id))
                    .attr("error.simulation_enabled", decision.error_evaluated)
                    .attr("error.should_fail", decision.error_triggered)
                    .attr("error.configured_rate", self.config.error_rate)
                    .finish(elapsed),
            );
        }

        let latency_span = ChildSpan::new("simulate_latency", ctx.child_span_id(), None)
            .attr("latency.simulated", decision.latency_injected);
        if decision.latency_injected {
            let started = Instant::now();
            tokio::time::sleep(latency_duration(decision.simulated_latency_seconds)).await;
            spans.push(
                latency_span
                    .attr("latency.duration_seconds", decision.simulated_latency_seconds)
                    .finish(started.elapsed()),
            );
        } else {
            spans.push(latency_span);
        }

        decision
    }

    fn complete(
        &self,
        ctx: &RequestContext,
        endpoint: &Endpoint,
        decision: &FaultDecision,
        outcome: &RequestOutcome,
        child_spans: &[ChildSpan],
    ) {
        let duration = ctx.started_at.elapsed();
        let kind = outcome.kind();
        let status_code = outcome.status_code();
        let violations = telemetry::classify(&self.slo, duration, kind);
        let empty = Map::new();
        let (attributes, events, error_message) = match outcome {
            RequestOutcome::Healthy(response) => {
                (&response.attributes, response.events.as_slice(), None)
            }
            RequestOutcome::Fault(_) => (&empty, &[][..], None),
            RequestOutcome::Failed(err) => (&empty, &[][..], Some(err.to_string())),
        };

        let report = CompletionReport {
            context: ctx,
            decision,
            config: &self.config,
            outcome: kind,
            status_code,
            duration,
            span_name: endpoint.span_name,
            health_check: endpoint.health_check,
            error_message: error_message.as_deref(),
            violations: &violations,
            child_spans,
            attributes,
            events,
        };
        self.dispatch("request_completed", |sink| sink.request_completed(&report));

        if endpoint.track_error_rate {
            let version = &self.config.service_version;
            // Publish under the estimator's entry lock so the gauge never
            // lags behind a concurrent update.
            self.estimator.update_with(version, kind.is_error(), |rate| {
                self.registry.set_error_rate(version, rate)
            });
        }

        tracing::Span::current().record("status_code", status_code);
        tracing::info!(
            status_code,
            outcome = kind.as_str(),
            duration_ms = duration.as_millis() as u64,
            slo_violations = violations.len(),
            "Request completed"
        );
    }

    /// Run `f` against every sink. A failing or panicking sink is logged and
    /// skipped.
    fn dispatch<F>(&self, stage: &'static str, f: F)
    where
        F: Fn(&dyn TelemetrySink) -> Result<(), EmissionError>,
    {
        for sink in &self.sinks {
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| f(sink.as_ref())))
                .unwrap_or_else(|_| Err(EmissionError::Panicked(sink.name())));
            if let Err(e) = result {
                tracing::warn!(sink = sink.name(), stage, error = %e, "Telemetry emission failed");
            }
        }
    }

    /// Flush every sink. Called once at shutdown.
    pub fn flush(&self) {
        self.dispatch("flush", |sink| sink.flush());
        tracing::info!(sinks = self.sinks.len(), "Telemetry sinks flushed");
    }
}

/// Sleep length for an injected latency. Total over every `f64`: bounds
/// above the ceiling are capped, NaN and negative values sleep zero.
fn latency_duration(seconds: f64) -> Duration {
    if seconds.is_nan() {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(seconds.min(MAX_LATENCY_CEILING_SECONDS))
        .unwrap_or(Duration::ZERO)
}

async fn run_handler<F, Fut>(handler: F, scope: RequestScope) -> RequestOutcome
where
    F: FnOnce(RequestScope) -> Fut,
    Fut: Future<Output = Result<HandlerResponse, HandlerError>>,
{
    let result = AssertUnwindSafe(async move { handler(scope).await })
        .catch_unwind()
        .await;
    match result {
        Ok(Ok(response)) => RequestOutcome::Healthy(response),
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "Handler failed");
            RequestOutcome::Failed(err)
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(error = %message, "Handler panicked");
            RequestOutcome::Failed(HandlerError::Panicked(message))
        }
    }
}

/// Assembles an orchestrator with the standard log, metric and span sinks.
pub struct OrchestratorBuilder {
    config: SimulationConfig,
    slo: SloConfig,
    rng: Option<Box<dyn RandomSource>>,
    registry: Option<Arc<MetricsRegistry>>,
    event_writer: Option<Arc<dyn EventWriter>>,
    span_exporter: Option<Arc<dyn SpanExporter>>,
    extra_sinks: Vec<Arc<dyn TelemetrySink>>,
}

impl OrchestratorBuilder {
    fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            slo: SloConfig::default(),
            rng: None,
            registry: None,
            event_writer: None,
            span_exporter: None,
            extra_sinks: Vec::new(),
        }
    }

    /// Override the default SLO thresholds.
    pub fn slo(mut self, slo: SloConfig) -> Self {
        self.slo = slo;
        self
    }

    /// Replace the default entropy-seeded source.
    pub fn random(mut self, rng: impl RandomSource + 'static) -> Self {
        self.rng = Some(Box::new(rng));
        self
    }

    /// Share an existing registry.
    pub fn registry(mut self, registry: Arc<MetricsRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Write events here instead of through `tracing`.
    pub fn event_writer(mut self, writer: impl EventWriter + 'static) -> Self {
        self.event_writer = Some(Arc::new(writer));
        self
    }

    /// Export spans here instead of through `tracing`.
    pub fn span_exporter(mut self, exporter: impl SpanExporter + 'static) -> Self {
        self.span_exporter = Some(Arc::new(exporter));
        self
    }

    /// Runs after the standard sinks.
    pub fn sink(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.extra_sinks.push(sink);
        self
    }

    /// Finish building. Sinks run in log, metrics, spans order, then extras.
    pub fn build(self) -> Orchestrator {
        let registry = self.registry.unwrap_or_default();
        let estimator = Arc::new(RollingErrorRate::new(self.config.error_rate));

        let log: Arc<dyn TelemetrySink> = match self.event_writer {
            Some(writer) => Arc::new(LogEmitter::new(writer)),
            None => Arc::new(LogEmitter::tracing()),
        };
        let spans: Arc<dyn TelemetrySink> = match self.span_exporter {
            Some(exporter) => Arc::new(SpanRecorder::new(exporter)),
            None => Arc::new(SpanRecorder::tracing()),
        };
        let mut sinks: Vec<Arc<dyn TelemetrySink>> =
            vec![log, Arc::new(MetricRecorder::new(registry.clone())), spans];
        sinks.extend(self.extra_sinks);

        Orchestrator {
            config: Arc::new(self.config),
            slo: self.slo,
            rng: Mutex::new(self.rng.unwrap_or_else(|| Box::new(SystemRandom::new()))),
            registry,
            estimator,
            sinks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::fault::{ScriptedRandom, SystemRandom};
    use crate::telemetry::{
        EventType, InMemorySpanExporter, MemoryEventWriter, SpanStatus, TelemetryEvent,
    };

    const ROOT: Endpoint = Endpoint::new("root", "root_endpoint");
    const HEALTH: Endpoint = Endpoint::new("health", "health_check").health_check();
    const METRICS: Endpoint = Endpoint::new("metrics", "metrics_endpoint")
        .without_faults()
        .untracked();

    struct Harness {
        orchestrator: Arc<Orchestrator>,
        events: Arc<MemoryEventWriter>,
        spans: Arc<InMemorySpanExporter>,
    }

    fn harness(config: SimulationConfig, rng: ScriptedRandom) -> Harness {
        let events = Arc::new(MemoryEventWriter::new());
        let spans = Arc::new(InMemorySpanExporter::new());
        let orchestrator = Orchestrator::builder(config)
            .random(rng)
            .event_writer(events.clone())
            .span_exporter(spans.clone())
            .build();
        Harness {
            orchestrator: Arc::new(orchestrator),
            events,
            spans,
        }
    }

    fn bad(config: SimulationConfig) -> SimulationConfig {
        SimulationConfig {
            sim_bad_enabled: true,
            ..config
        }
    }

    fn get(path: &str, endpoint: &str) -> RequestMetadata {
        RequestMetadata::new("GET", path, endpoint)
    }

    async fn ok(_scope: RequestScope) -> Result<HandlerResponse, HandlerError> {
        Ok(HandlerResponse::text("ok"))
    }

    #[tokio::test]
    async fn test_healthy_request_is_correlated_everywhere() {
        let h = harness(SimulationConfig::default(), ScriptedRandom::constant(0.5));
        let handled = h.orchestrator.handle(get("/", "root"), &ROOT, ok).await;

        assert!(matches!(handled.outcome, RequestOutcome::Healthy(_)));
        assert_eq!(handled.status_code(), 200);
        assert_eq!(
            handled.traceparent,
            format!("00-{}-{}-01", handled.trace_id, handled.span_id)
        );

        let events = h.events.events();
        let types: Vec<_> = events.iter().map(|e| e.event_type).collect();
        assert_eq!(types, vec![EventType::RequestStarted, EventType::RequestCompleted]);
        assert!(events.iter().all(|e: &TelemetryEvent| {
            e.correlation_id == handled.correlation_id && e.trace_id == handled.trace_id
        }));

        let spans = h.spans.spans();
        assert!(spans.iter().all(|s| s.trace_id == handled.trace_id));
        let root = &h.spans.roots()[0];
        assert_eq!(root.name, "root_endpoint");
        assert_eq!(root.span_id, handled.span_id);
        assert_eq!(root.status, SpanStatus::Ok);

        let registry = h.orchestrator.registry();
        assert_eq!(registry.requests_total("GET", "root", 200, "1.0.0"), 1);
        assert_eq!(registry.total_active_requests(), 0);
        // 0.9 * 0.2 + 0.1 * 0
        assert!((h.orchestrator.current_error_rate() - 0.18).abs() < 1e-12);
        assert_eq!(registry.error_rate("1.0.0"), Some(h.orchestrator.current_error_rate()));
    }

    #[tokio::test]
    async fn test_outage_skips_handler() {
        let config = bad(SimulationConfig {
            outage_sim_enabled: true,
            ..SimulationConfig::default()
        });
        let h = harness(config, ScriptedRandom::new([0.01]));
        let called = AtomicBool::new(false);

        let handled = h
            .orchestrator
            .handle(get("/health", "health"), &HEALTH, |_| async {
                called.store(true, Ordering::SeqCst);
                Ok(HandlerResponse::text("OK"))
            })
            .await;

        assert!(!called.load(Ordering::SeqCst));
        assert!(matches!(handled.outcome, RequestOutcome::Fault(FaultKind::Outage)));
        assert_eq!(handled.status_code(), 503);
        assert!(handled.decision.outage_triggered);
        assert!(!handled.decision.error_evaluated);

        assert_eq!(h.events.of_type(EventType::SystemHealth).len(), 1);
        assert_eq!(h.events.of_type(EventType::SystemFailure).len(), 1);
        assert_eq!(h.events.of_type(EventType::SloViolation).len(), 1);

        let root = &h.spans.roots()[0];
        assert_eq!(root.name, "health_check");
        assert!(root.status.is_error());
        assert!(h.spans.named("simulate_outage")[0].attributes["outage.should_fail"] == true);
        assert!(h.spans.named("simulate_error_rate").is_empty());

        let registry = h.orchestrator.registry();
        assert_eq!(registry.requests_total("GET", "health", 503, "1.0.0"), 1);
        assert_eq!(registry.slo_violations_total("availability", "critical", "health"), 1);
        assert_eq!(registry.health_status("1.0.0"), Some(0.0));
    }

    #[tokio::test]
    async fn test_error_rate_fault() {
        let h = harness(bad(SimulationConfig::default()), ScriptedRandom::new([0.1]));
        let handled = h.orchestrator.handle(get("/", "root"), &ROOT, ok).await;

        assert!(matches!(handled.outcome, RequestOutcome::Fault(FaultKind::ErrorRate)));
        assert_eq!(handled.status_code(), 500);
        let error_span = &h.spans.named("simulate_error_rate")[0];
        assert_eq!(error_span.attributes["error.should_fail"], true);
        assert_eq!(
            h.orchestrator.registry().slo_violations_total("error", "major", "root"),
            1
        );
        // 0.9 * 0.2 + 0.1 * 1
        assert!((h.orchestrator.current_error_rate() - 0.28).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_injected_latency_blocks_before_completion() {
        let config = bad(SimulationConfig {
            error_rate: 0.0,
            latency_sim_enabled: true,
            max_latency_seconds: 2.0,
            ..SimulationConfig::default()
        });
        // error draw, then latency draw
        let h = harness(config, ScriptedRandom::new([0.9, 0.5]));

        let started = Instant::now();
        let handled = h.orchestrator.handle(get("/", "root"), &ROOT, ok).await;
        assert!(started.elapsed() >= Duration::from_millis(500));

        assert!(matches!(handled.outcome, RequestOutcome::Healthy(_)));
        assert!((handled.decision.simulated_latency_seconds - 0.5).abs() < 1e-12);
        let completed = &h.events.of_type(EventType::RequestCompleted)[0];
        let duration = completed.payload["response"]["duration_seconds"].as_f64().unwrap();
        assert!(duration >= 0.5);
        let latency_span = &h.spans.named("simulate_latency")[0];
        assert!(latency_span.duration_seconds >= 0.5);
    }

    #[tokio::test]
    async fn test_handler_error_and_panic_are_contained() {
        let h = harness(SimulationConfig::default(), ScriptedRandom::constant(0.5));

        let failed = h
            .orchestrator
            .handle(get("/users", "users"), &ROOT, |_| async {
                Err(HandlerError::Failed("database unavailable".into()))
            })
            .await;
        assert!(matches!(failed.outcome, RequestOutcome::Failed(HandlerError::Failed(_))));
        assert_eq!(failed.status_code(), 500);

        let panicked = h
            .orchestrator
            .handle(get("/users", "users"), &ROOT, |_| async {
                if true {
                    panic!("boom");
                }
                Ok(HandlerResponse::text("unreachable"))
            })
            .await;
        match &panicked.outcome {
            RequestOutcome::Failed(HandlerError::Panicked(message)) => assert_eq!(message, "boom"),
            other => panic!("unexpected outcome {other:?}"),
        }

        let registry = h.orchestrator.registry();
        assert_eq!(registry.requests_total("GET", "users", 500, "1.0.0"), 2);
        assert_eq!(registry.total_active_requests(), 0);
        let failure = &h.events.of_type(EventType::SystemFailure)[0];
        assert_eq!(failure.payload["failure_type"], "handler_failure");
        assert_eq!(failure.payload["error"], "handler failed: database unavailable");
    }

    struct RejectingWriter;

    impl EventWriter for RejectingWriter {
        fn write(&self, _event: &crate::telemetry::TelemetryEvent) -> Result<(), EmissionError> {
            Err(EmissionError::Rejected {
                sink: "log",
                reason: "disk full".into(),
            })
        }
    }

    struct PanickingSink;

    impl TelemetrySink for PanickingSink {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn request_completed(&self, _report: &CompletionReport<'_>) -> Result<(), EmissionError> {
            panic!("sink exploded")
        }
    }

    #[tokio::test]
    async fn test_failing_sinks_do_not_affect_others() {
        let spans = Arc::new(InMemorySpanExporter::new());
        let orchestrator = Orchestrator::builder(SimulationConfig::default())
            .random(ScriptedRandom::constant(0.5))
            .event_writer(RejectingWriter)
            .span_exporter(spans.clone())
            .sink(Arc::new(PanickingSink))
            .build();

        let handled = orchestrator.handle(get("/", "root"), &ROOT, ok).await;
        assert_eq!(handled.status_code(), 200);
        assert_eq!(orchestrator.registry().requests_total("GET", "root", 200, "1.0.0"), 1);
        assert_eq!(spans.roots().len(), 1);
        assert_eq!(orchestrator.registry().total_active_requests(), 0);
        orchestrator.flush();
    }

    #[tokio::test]
    async fn test_excluded_endpoint_skips_faults_and_estimator() {
        let config = bad(SimulationConfig {
            error_rate: 1.0,
            outage_sim_enabled: true,
            ..SimulationConfig::default()
        });
        let h = harness(config, ScriptedRandom::constant(0.0));
        let handled = h.orchestrator.handle(get("/metrics", "metrics"), &METRICS, ok).await;

        assert_eq!(handled.status_code(), 200);
        assert_eq!(handled.decision, FaultDecision::baseline());
        assert!(h.spans.named("health_simulation").is_empty());
        assert_eq!(h.orchestrator.current_error_rate(), 1.0);
        assert_eq!(h.orchestrator.registry().error_rate("1.0.0"), None);
    }

    #[tokio::test]
    async fn test_concurrent_requests_balance_gauge() {
        let h = harness(bad(SimulationConfig::default()), ScriptedRandom::constant(0.5));
        let mut tasks = Vec::new();
        for _ in 0..32 {
            let orchestrator = h.orchestrator.clone();
            tasks.push(tokio::spawn(async move {
                orchestrator
                    .handle(get("/", "root"), &ROOT, |_| async {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        Ok(HandlerResponse::text("ok"))
                    })
                    .await
                    .correlation_id
            }));
        }

        let mut ids = std::collections::HashSet::new();
        for task in tasks {
            ids.insert(task.await.unwrap());
        }
        assert_eq!(ids.len(), 32);

        let registry = h.orchestrator.registry();
        assert_eq!(registry.total_requests(), 32);
        assert_eq!(registry.total_active_requests(), 0);
        assert_eq!(h.events.of_type(EventType::RequestCompleted).len(), 32);
        assert_eq!(h.spans.roots().len(), 32);
    }

    #[test]
    fn test_latency_duration_is_total() {
        assert_eq!(latency_duration(0.5), Duration::from_millis(500));
        assert_eq!(latency_duration(f64::NAN), Duration::ZERO);
        assert_eq!(latency_duration(-1.0), Duration::ZERO);
        let ceiling = Duration::from_secs_f64(MAX_LATENCY_CEILING_SECONDS);
        assert_eq!(latency_duration(5e29), ceiling);
        assert_eq!(latency_duration(f64::INFINITY), ceiling);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrepresentable_latency_still_completes() {
        // Built directly, so the load-time clamp never ran.
        let config = bad(SimulationConfig {
            error_rate: 0.0,
            latency_sim_enabled: true,
            max_latency_seconds: 1e30,
            ..SimulationConfig::default()
        });
        let h = harness(config, ScriptedRandom::new([0.9, 5e29]));
        let orchestrator = h.orchestrator.clone();
        let task = tokio::spawn(async move {
            orchestrator.handle(get("/", "root"), &ROOT, ok).await.status_code()
        });

        let status = task.await.expect("request task must not panic");
        assert_eq!(status, 200);
        let registry = h.orchestrator.registry();
        assert_eq!(registry.requests_total("GET", "root", 200, "1.0.0"), 1);
        assert_eq!(registry.total_active_requests(), 0);
        assert_eq!(h.events.of_type(EventType::RequestCompleted).len(), 1);
    }

    #[tokio::test]
    async fn test_gauge_balances_across_mixed_outcomes() {
        let config = bad(SimulationConfig {
            error_rate: 0.5,
            outage_sim_enabled: true,
            ..SimulationConfig::default()
        });
        let events = Arc::new(MemoryEventWriter::new());
        let orchestrator = Arc::new(
            Orchestrator::builder(config)
                .random(SystemRandom::seeded(7))
                .event_writer(events.clone())
                .span_exporter(InMemorySpanExporter::new())
                .build(),
        );

        let mut tasks = Vec::new();
        for i in 0..40 {
            let orchestrator = orchestrator.clone();
            tasks.push(tokio::spawn(async move {
                orchestrator
                    .handle(get("/", "root"), &ROOT, move |_| async move {
                        tokio::time::sleep(Duration::from_millis(2)).await;
                        if i % 4 == 0 {
                            panic!("handler crashed");
                        }
                        Ok(HandlerResponse::text("ok"))
                    })
                    .await
                    .status_code()
            }));
        }

        let mut statuses = Vec::new();
        for task in tasks {
            statuses.push(task.await.unwrap());
        }
        assert!(statuses.iter().any(|s| *s != 200));

        let registry = orchestrator.registry();
        assert_eq!(registry.total_requests(), 40);
        assert_eq!(registry.total_active_requests(), 0);
        assert_eq!(events.of_type(EventType::RequestCompleted).len(), 40);
        assert_eq!(
            registry.error_rate("1.0.0"),
            Some(orchestrator.current_error_rate())
        );
    }
}

