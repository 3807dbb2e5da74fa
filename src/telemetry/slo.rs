//! SLO violation classification for completed requests.

use std::time::Duration;

use serde::Serialize;

use crate::config::SloConfig;
use crate::fault::FaultKind;
use crate::telemetry::sink::OutcomeKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    Latency,
    Availability,
    Error,
}

impl ViolationType {
    /// Metric label value.
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationType::Latency => "latency",
            ViolationType::Availability => "availability",
            ViolationType::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Major,
    Critical,
}

impl Severity {
    /// Metric label value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Major => "major",
            Severity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SloViolation {
    pub violation_type: ViolationType,
    pub severity: Severity,
    /// Observed value that breached the target (seconds for latency).
    pub observed: f64,
    pub threshold: f64,
}

/// Classify one completed request. Latency and outcome are independent,
/// so a slow failed request yields two violations.
pub fn classify(config: &SloConfig, duration: Duration, outcome: OutcomeKind) -> Vec<SloViolation> {
    let mut violations = Vec::new();
    let target = config.latency_target_seconds;
    let observed = duration.as_secs_f64();

    if observed > target {
        let severity = if observed > target * 2.0 {
            Severity::Critical
        } else {
            Severity::Warning
        };
        violations.push(SloViolation {
            violation_type: ViolationType::Latency,
            severity,
            observed,
            threshold: target,
        });
    }

    match outcome {
        OutcomeKind::Healthy => {}
        OutcomeKind::Fault(FaultKind::Outage) => violations.push(SloViolation {
            violation_type: ViolationType::Availability,
            severity: Severity::Critical,
            observed: 0.0,
            threshold: 1.0,
        }),
        OutcomeKind::Fault(FaultKind::ErrorRate) | OutcomeKind::HandlerFailure => {
            violations.push(SloViolation {
                violation_type: ViolationType::Error,
                severity: Severity::Major,
                observed: 1.0,
                threshold: 0.0,
            })
        }
    }

    violations
}
