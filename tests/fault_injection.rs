//! Fault injection over HTTP with scripted draws.

use std::time::{Duration, Instant};

use fault_telemetry::config::SimulationConfig;
use fault_telemetry::fault::ScriptedRandom;
use fault_telemetry::telemetry::{EventType, SpanStatus};

mod common;

fn bad() -> SimulationConfig {
    SimulationConfig {
        sim_bad_enabled: true,
        ..SimulationConfig::default()
    }
}

#[tokio::test]
async fn test_outage_returns_503_and_reports_failure() {
    let config = SimulationConfig {
        outage_sim_enabled: true,
        version_label: "v2.0.0-canary".into(),
        ..bad()
    };
    let server = common::start_server(config, ScriptedRandom::new([0.01])).await;
    let res = common::client().get(server.url("/health")).send().await.unwrap();

    assert_eq!(res.status(), 503);
    assert_eq!(res.text().await.unwrap(), "Service Unavailable [v2.0.0-canary]");

    let health = server.events.of_type(EventType::SystemHealth);
    assert_eq!(health[0].payload["status"], "unhealthy");
    assert_eq!(health[0].service.deployment_type, "canary");
    let failure = server.events.of_type(EventType::SystemFailure);
    assert_eq!(failure[0].payload["failure_type"], "outage");

    let root = &server.spans.named("health_check")[0];
    assert_eq!(root.status, SpanStatus::Error("Service simulation failure".into()));
    assert_eq!(
        server
            .orchestrator
            .registry()
            .slo_violations_total("availability", "critical", "health"),
        1
    );
    server.stop().await;
}

#[tokio::test]
async fn test_error_rate_fault_returns_500() {
    // Outage draw misses, error draw hits.
    let config = SimulationConfig {
        outage_sim_enabled: true,
        error_rate: 0.2,
        ..bad()
    };
    let server = common::start_server(config, ScriptedRandom::new([0.5, 0.1])).await;
    let res = common::client().get(server.url("/users")).send().await.unwrap();

    assert_eq!(res.status(), 500);
    assert_eq!(res.text().await.unwrap(), "ERROR [v1.0.0-unknown]");
    assert!(server.events.of_type(EventType::BusinessEvent).is_empty());
    let registry = server.orchestrator.registry();
    assert_eq!(registry.requests_total("GET", "users", 500, "1.0.0"), 1);
    assert_eq!(registry.slo_violations_total("error", "major", "users"), 1);
    server.stop().await;
}

#[tokio::test]
async fn test_injected_latency_is_observed() {
    let config = SimulationConfig {
        error_rate: 0.0,
        latency_sim_enabled: true,
        max_latency_seconds: 2.0,
        ..bad()
    };
    let server = common::start_server(config, ScriptedRandom::new([0.9, 0.5])).await;

    let started = Instant::now();
    let res = common::client().get(server.url("/")).send().await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(500));
    assert_eq!(res.status(), 200);
    assert_eq!(
        res.text().await.unwrap(),
        "Application is running! [v1.0.0-unknown] (Response time: 0.50s)"
    );

    let stats = server
        .orchestrator
        .registry()
        .request_duration("GET", "root", "1.0.0");
    assert_eq!(stats.count, 1);
    assert!(stats.sum_seconds >= 0.5);
    server.stop().await;
}

#[tokio::test]
async fn test_metrics_scrape_is_never_faulted() {
    let config = SimulationConfig {
        error_rate: 1.0,
        outage_sim_enabled: true,
        ..bad()
    };
    let server = common::start_server(config, ScriptedRandom::constant(0.0)).await;
    let client = common::client();

    for _ in 0..5 {
        let res = client.get(server.url("/metrics")).send().await.unwrap();
        assert_eq!(res.status(), 200);
    }
    assert_eq!(server.orchestrator.registry().error_rate("1.0.0"), None);
    server.stop().await;
}

#[tokio::test]
async fn test_disabled_simulation_is_always_healthy() {
    let config = SimulationConfig {
        sim_bad_enabled: false,
        error_rate: 1.0,
        outage_sim_enabled: true,
        latency_sim_enabled: true,
        ..SimulationConfig::default()
    };
    let server = common::start_server(config, ScriptedRandom::constant(0.0)).await;
    let client = common::client();

    for _ in 0..10 {
        let res = client.get(server.url("/")).send().await.unwrap();
        assert_eq!(res.status(), 200);
    }
    assert!(server.events.of_type(EventType::SystemFailure).is_empty());
    // 10 healthy completions from 1.0: 0.9^10
    let rate = server.orchestrator.current_error_rate();
    assert!((rate - 0.9f64.powi(10)).abs() < 1e-9);
    server.stop().await;
}
