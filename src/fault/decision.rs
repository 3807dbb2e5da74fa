//! Fault decision value types.

use serde::Serialize;

/// Latency recorded when no latency is injected. Never zero, so
/// latency-bucketed metrics see traffic on the healthy path too.
pub const BASELINE_LATENCY_SECONDS: f64 = 0.01;

/// Lower bound of the injected latency draw.
pub const MIN_INJECTED_LATENCY_SECONDS: f64 = 0.1;

/// The kind of simulated fault that fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// Complete outage. Pre-empts the error-rate check.
    Outage,
    /// Transient error drawn from the configured error rate.
    ErrorRate,
}

impl FaultKind {
    /// Label used in logs and span attributes.
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultKind::Outage => "outage",
            FaultKind::ErrorRate => "error_rate",
        }
    }
}

/// Per-request outcome of the fault engine. Immutable once produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FaultDecision {
    pub outage_triggered: bool,
    pub error_triggered: bool,
    /// Whether the outage draw ran.
    pub outage_evaluated: bool,
    /// Whether the error-rate check ran at all.
    pub error_evaluated: bool,
    pub simulated_latency_seconds: f64,
    /// Whether `simulated_latency_seconds` was drawn and must be slept.
    pub latency_injected: bool,
}

impl FaultDecision {
    /// Healthy decision with baseline latency.
    pub fn baseline() -> Self {
        Self {
            outage_triggered: false,
            error_triggered: false,
            outage_evaluated: false,
            error_evaluated: false,
            simulated_latency_seconds: BASELINE_LATENCY_SECONDS,
            latency_injected: false,
        }
    }

    /// True when neither an outage nor an error fault fired.
    pub fn healthy(&self) -> bool {
        !self.outage_triggered && !self.error_triggered
    }

    /// The fault that fired, outage first.
    pub fn fault(&self) -> Option<FaultKind> {
        if self.outage_triggered {
            Some(FaultKind::Outage)
        } else if self.error_triggered {
            Some(FaultKind::ErrorRate)
        } else {
            None
        }
    }

    /// `failure.type` span attribute value.
    pub fn failure_type(&self) -> &'static str {
        self.fault().map_or("none", |k| k.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_is_healthy() {
        let d = FaultDecision::baseline();
        assert!(d.healthy());
        assert_eq!(d.fault(), None);
        assert_eq!(d.failure_type(), "none");
        assert!(d.simulated_latency_seconds > 0.0);
    }

    #[test]
    fn test_outage_wins_over_error() {
        let d = FaultDecision {
            outage_triggered: true,
            error_triggered: true,
            ..FaultDecision::baseline()
        };
        assert!(!d.healthy());
        assert_eq!(d.fault(), Some(FaultKind::Outage));
    }
}
