//! Route handlers.
//!
//! Each handler builds request metadata, hands its business logic to the
//! orchestrator as a closure and renders the outcome. Fault injection,
//! telemetry and error-rate tracking all happen in the orchestrator.

use axum::extract::{Request, State};
use axum::response::Response;
use serde_json::{json, Map};

use crate::http::request::request_metadata;
use crate::http::response::into_response;
use crate::http::server::AppState;
use crate::lifecycle::{Endpoint, HandlerResponse};
use crate::telemetry::DomainEvent;

pub const ROOT: Endpoint = Endpoint::new("root", "root_endpoint");
pub const HEALTH: Endpoint = Endpoint::new("health", "health_check").health_check();
pub const USERS: Endpoint = Endpoint::new("users", "users_endpoint");
pub const VERSION: Endpoint = Endpoint::new("version", "version_endpoint").without_faults();
pub const SLO_CONFIG: Endpoint =
    Endpoint::new("slo_config", "slo_config_endpoint").without_faults();
// A scrape must not move the error-rate estimate.
pub const METRICS: Endpoint = Endpoint::new("metrics", "metrics_endpoint")
    .without_faults()
    .untracked();

fn label(state: &AppState) -> &str {
    &state.orchestrator.config().version_label
}

/// `GET /`
pub async fn root(State(state): State<AppState>, request: Request) -> Response {
    let meta = request_metadata(&request, ROOT.name);
    let label = label(&state);
    let handled = state
        .orchestrator
        .handle(meta, &ROOT, |scope| async move {
            Ok(HandlerResponse::text(format!(
                "Application is running! [{label}] (Response time: {:.2}s)",
                scope.simulated_latency_seconds
            )))
        })
        .await;
    into_response(handled, label)
}

/// `GET /health`
pub async fn health(State(state): State<AppState>, request: Request) -> Response {
    let meta = request_metadata(&request, HEALTH.name);
    let label = label(&state);
    let handled = state
        .orchestrator
        .handle(meta, &HEALTH, |_| async move {
            Ok(HandlerResponse::text(format!("OK [{label}]"))
                .with_attribute("health.status", "healthy"))
        })
        .await;
    into_response(handled, label)
}

/// `GET /users`
pub async fn users(State(state): State<AppState>, request: Request) -> Response {
    let meta = request_metadata(&request, USERS.name);
    let label = label(&state);
    let handled = state
        .orchestrator
        .handle(meta, &USERS, |scope| async move {
            let users = vec![
                json!({"id": 1, "name": "John Doe", "email": "john@example.com"}),
                json!({"id": 2, "name": "Jane Smith", "email": "jane@example.com"}),
                json!({"id": 3, "name": "Bob Johnson", "email": "bob@example.com"}),
            ];
            let count = users.len();

            let mut event = Map::new();
            event.insert("event".into(), "users_listed".into());
            event.insert("users.count".into(), count.into());

            Ok(HandlerResponse::json(json!({
                "users": users,
                "response_time": format!("{:.2}s", scope.simulated_latency_seconds),
            }))
            .with_attribute("users.count", count)
            .with_event(DomainEvent::business(event)))
        })
        .await;
    into_response(handled, label)
}

/// `GET /version`
pub async fn version(State(state): State<AppState>, request: Request) -> Response {
    let meta = request_metadata(&request, VERSION.name);
    let config = state.orchestrator.config();
    let handled = state
        .orchestrator
        .handle(meta, &VERSION, |_| async move {
            Ok(HandlerResponse::json(json!({
                "version": config.service_version,
                "label": config.version_label,
                "slo_config": {
                    "sim_bad": config.sim_bad_enabled,
                    "error_rate": config.error_rate,
                    "latency_simulation": config.latency_sim_enabled,
                    "outage_simulation": config.outage_sim_enabled,
                },
                "deployment_type": config.deployment_type(),
            })))
        })
        .await;
    into_response(handled, &config.version_label)
}

/// `GET /slo-config`
pub async fn slo_config(State(state): State<AppState>, request: Request) -> Response {
    let meta = request_metadata(&request, SLO_CONFIG.name);
    let orchestrator = &state.orchestrator;
    let config = orchestrator.config();
    let handled = orchestrator
        .handle(meta, &SLO_CONFIG, |_| async move {
            Ok(HandlerResponse::json(json!({
                "service_info": {
                    "version": config.service_version,
                    "label": config.version_label,
                    "deployment_type": config.deployment_type(),
                },
                "slo_simulation": {
                    "sim_bad": config.sim_bad_enabled,
                    "error_rate": config.error_rate,
                    "latency_simulation": config.latency_sim_enabled,
                    "max_latency": config.max_latency_seconds,
                    "outage_simulation": config.outage_sim_enabled,
                },
                "description": {
                    "sim_bad": "Master switch for all bad SLO simulations",
                    "error_rate": "Probability of returning errors (0.0-1.0)",
                    "latency_simulation": "Enable artificial latency delays",
                    "max_latency": "Maximum latency in seconds",
                    "outage_simulation": format!(
                        "Enable complete service outages ({}% chance)",
                        config.outage_probability * 100.0
                    ),
                },
                "slo_targets": {
                    "latency_target_seconds": orchestrator.slo().latency_target_seconds,
                },
                "current_error_rate": orchestrator.current_error_rate(),
            })))
        })
        .await;
    into_response(handled, &config.version_label)
}

/// `GET /metrics`, Prometheus text format.
pub async fn metrics(State(state): State<AppState>, request: Request) -> Response {
    let meta = request_metadata(&request, METRICS.name);
    let rendered = match &state.prometheus {
        Some(handle) => handle.render(),
        None => "# metrics exporter disabled\n".to_string(),
    };
    let handled = state
        .orchestrator
        .handle(meta, &METRICS, |_| async move { Ok(HandlerResponse::text(rendered)) })
        .await;
    into_response(handled, label(&state))
}

