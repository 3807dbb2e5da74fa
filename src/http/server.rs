//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with every route
//! - Wire up middleware (timeout, tracing)
//! - Serve on a bound listener until the shutdown signal, then flush
//!   telemetry

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::http::handlers;
use crate::lifecycle::Orchestrator;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// `None` when metrics export is disabled.
    pub prometheus: Option<PrometheusHandle>,
}

pub struct HttpServer {
    router: Router,
    config: AppConfig,
    orchestrator: Arc<Orchestrator>,
}

impl HttpServer {
    /// Bind-ready server around a built orchestrator.
    pub fn new(
        config: AppConfig,
        orchestrator: Arc<Orchestrator>,
        prometheus: Option<PrometheusHandle>,
    ) -> Self {
        let state = AppState {
            orchestrator: orchestrator.clone(),
            prometheus,
        };
        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            orchestrator,
        }
    }

    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState) -> Router {
        Router::new()
            .route("/", get(handlers::root))
            .route("/health", get(handlers::health))
            .route("/users", get(handlers::users))
            .route("/version", get(handlers::version))
            .route("/slo-config", get(handlers::slo_config))
            .route("/metrics", get(handlers::metrics))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.server.request_timeout_secs,
            )))
            .layer(TraceLayer::new_for_http())
    }

    /// Router with state applied, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Configuration the server was built with.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Serve until `shutdown` fires, drain in-flight requests, then flush
    /// every telemetry sink.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining");
            })
            .await?;

        self.orchestrator.flush();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
