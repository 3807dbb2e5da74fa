//! Per-request fault decision.
//!
//! Order matters: the outage draw runs before the error-rate draw, and a
//! fired outage skips the error-rate draw entirely. The latency draw is
//! independent of both, so a request may be slow and healthy or fast and
//! failed.

use crate::config::SimulationConfig;
use crate::fault::decision::{FaultDecision, BASELINE_LATENCY_SECONDS, MIN_INJECTED_LATENCY_SECONDS};
use crate::fault::random::RandomSource;

/// Decide the fate of one request. Total over sanitized configs.
pub fn decide(config: &SimulationConfig, rng: &mut dyn RandomSource) -> FaultDecision {
    if !config.sim_bad_enabled {
        return FaultDecision::baseline();
    }

    let mut decision = FaultDecision::baseline();

    if config.outage_sim_enabled {
        decision.outage_evaluated = true;
        decision.outage_triggered = rng.unit() < config.outage_probability;
    }

    if !decision.outage_triggered {
        decision.error_evaluated = true;
        decision.error_triggered = rng.unit() < config.error_rate;
    }

    if config.latency_sim_enabled {
        // A bound at or below the floor collapses the range to the floor.
        let high = config.max_latency_seconds.max(MIN_INJECTED_LATENCY_SECONDS);
        decision.simulated_latency_seconds = rng.uniform(MIN_INJECTED_LATENCY_SECONDS, high);
        decision.latency_injected = true;
    } else {
        decision.simulated_latency_seconds = BASELINE_LATENCY_SECONDS;
    }

    decision
}
