//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use fault_telemetry::config::{AppConfig, SimulationConfig};
use fault_telemetry::fault::ScriptedRandom;
use fault_telemetry::http::HttpServer;
use fault_telemetry::lifecycle::{Orchestrator, Shutdown};
use fault_telemetry::telemetry::{InMemorySpanExporter, MemoryEventWriter};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A running server on an ephemeral port with in-memory sinks.
pub struct TestServer {
    pub addr: SocketAddr,
    pub orchestrator: Arc<Orchestrator>,
    pub events: Arc<MemoryEventWriter>,
    pub spans: Arc<InMemorySpanExporter>,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the server to drain.
    #[allow(dead_code)]
    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = tokio::time::timeout(Duration::from_secs(5), self.handle).await;
    }
}

pub async fn start_server(simulation: SimulationConfig, rng: ScriptedRandom) -> TestServer {
    let events = Arc::new(MemoryEventWriter::new());
    let spans = Arc::new(InMemorySpanExporter::new());
    let orchestrator = Arc::new(
        Orchestrator::builder(simulation.clone())
            .random(rng)
            .event_writer(events.clone())
            .span_exporter(spans.clone())
            .build(),
    );

    let config = AppConfig {
        simulation,
        ..AppConfig::default()
    };
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, orchestrator.clone(), None);
    let rx = shutdown.subscribe();
    let handle = tokio::spawn(async move { server.run(listener, rx).await });

    TestServer {
        addr,
        orchestrator,
        events,
        spans,
        shutdown,
        handle,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
