//! Configuration validation.
//!
//! # Responsibilities
//! - Clamp probabilities into [0, 1]
//! - Clamp latency bounds (at most `MAX_LATENCY_CEILING_SECONDS`) and
//!   timeouts to usable values
//! - Report every adjustment so startup can log it
//!
//! # Design Decisions
//! - Invalid values are recovered locally, never surfaced as errors
//! - Returns all adjustments, not just the first
//! - Runs once at load time; the fault engine never re-checks

use std::fmt;

use crate::config::schema::{AppConfig, MAX_LATENCY_CEILING_SECONDS};

/// A field that was out of range and has been replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigWarning {
    pub field: &'static str,
    pub original: String,
    pub applied: String,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} = {} is out of range, using {}",
            self.field, self.original, self.applied
        )
    }
}

fn clamp_probability(
    field: &'static str,
    value: &mut f64,
    fallback: f64,
    warnings: &mut Vec<ConfigWarning>,
) {
    let applied = if value.is_nan() {
        fallback
    } else {
        value.clamp(0.0, 1.0)
    };
    if applied != *value {
        warnings.push(ConfigWarning {
            field,
            original: value.to_string(),
            applied: applied.to_string(),
        });
        *value = applied;
    }
}

/// Clamp every out-of-range value in place.
pub fn sanitize_config(config: &mut AppConfig) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();
    let sim = &mut config.simulation;

    clamp_probability("simulation.error_rate", &mut sim.error_rate, 0.0, &mut warnings);
    clamp_probability(
        "simulation.outage_probability",
        &mut sim.outage_probability,
        0.0,
        &mut warnings,
    );

    if !sim.max_latency_seconds.is_finite() || sim.max_latency_seconds < 0.0 {
        warnings.push(ConfigWarning {
            field: "simulation.max_latency_seconds",
            original: sim.max_latency_seconds.to_string(),
            applied: "0".to_string(),
        });
        sim.max_latency_seconds = 0.0;
    } else if sim.max_latency_seconds > MAX_LATENCY_CEILING_SECONDS {
        warnings.push(ConfigWarning {
            field: "simulation.max_latency_seconds",
            original: sim.max_latency_seconds.to_string(),
            applied: MAX_LATENCY_CEILING_SECONDS.to_string(),
        });
        sim.max_latency_seconds = MAX_LATENCY_CEILING_SECONDS;
    }

    let slo = &mut config.slo;
    if !slo.latency_target_seconds.is_finite() || slo.latency_target_seconds <= 0.0 {
        let applied = crate::config::schema::SloConfig::default().latency_target_seconds;
        warnings.push(ConfigWarning {
            field: "slo.latency_target_seconds",
            original: slo.latency_target_seconds.to_string(),
            applied: applied.to_string(),
        });
        slo.latency_target_seconds = applied;
    }

    if config.server.request_timeout_secs == 0 {
        let applied = crate::config::schema::ServerConfig::default().request_timeout_secs;
        warnings.push(ConfigWarning {
            field: "server.request_timeout_secs",
            original: "0".to_string(),
            applied: applied.to_string(),
        });
        config.server.request_timeout_secs = applied;
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config_has_no_warnings() {
        let mut config = AppConfig::default();
        assert!(sanitize_config(&mut config).is_empty());
    }

    #[test]
    fn test_error_rate_clamped() {
        let mut config = AppConfig::default();
        config.simulation.error_rate = 1.7;
        let warnings = sanitize_config(&mut config);
        assert_eq!(config.simulation.error_rate, 1.0);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "simulation.error_rate");

        config.simulation.error_rate = -0.3;
        sanitize_config(&mut config);
        assert_eq!(config.simulation.error_rate, 0.0);
    }

    #[test]
    fn test_nan_probability_falls_back_to_zero() {
        let mut config = AppConfig::default();
        config.simulation.outage_probability = f64::NAN;
        let warnings = sanitize_config(&mut config);
        assert_eq!(config.simulation.outage_probability, 0.0);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_all_problems_reported() {
        let mut config = AppConfig::default();
        config.simulation.error_rate = 3.0;
        config.simulation.max_latency_seconds = -1.0;
        config.slo.latency_target_seconds = 0.0;
        config.server.request_timeout_secs = 0;
        let warnings = sanitize_config(&mut config);
        assert_eq!(warnings.len(), 4);
        assert_eq!(config.simulation.max_latency_seconds, 0.0);
        assert_eq!(config.slo.latency_target_seconds, 1.0);
        assert_eq!(config.server.request_timeout_secs, 30);
    }

    #[test]
    fn test_huge_latency_bound_clamped_to_ceiling() {
        let mut config = AppConfig::default();
        config.simulation.max_latency_seconds = 1e30;
        let warnings = sanitize_config(&mut config);
        assert_eq!(config.simulation.max_latency_seconds, MAX_LATENCY_CEILING_SECONDS);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "simulation.max_latency_seconds");
    }
}
