//! Startup wiring.
//!
//! Builds the engine from a loaded [`AppConfig`]: metrics registry first,
//! then the orchestrator with its standard sinks. Listeners are bound by the
//! caller, last.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::lifecycle::orchestrator::Orchestrator;
use crate::telemetry::MetricsRegistry;

/// Assemble the orchestrator and publish the starting error-rate estimate.
pub fn build_orchestrator(config: &AppConfig) -> Arc<Orchestrator> {
    let sim = &config.simulation;
    tracing::info!(
        service_version = %sim.service_version,
        version_label = %sim.version_label,
        deployment_type = sim.deployment_type(),
        sim_bad = sim.sim_bad_enabled,
        error_rate = sim.error_rate,
        latency_sim = sim.latency_sim_enabled,
        max_latency_seconds = sim.max_latency_seconds,
        outage_sim = sim.outage_sim_enabled,
        latency_target_seconds = config.slo.latency_target_seconds,
        "Simulation configured"
    );

    let registry = Arc::new(MetricsRegistry::new());
    // Publish the starting estimate before the first request lands.
    registry.set_error_rate(&sim.service_version, sim.error_rate);

    Arc::new(
        Orchestrator::builder(sim.clone())
            .slo(config.slo.clone())
            .registry(registry)
            .build(),
    )
}
