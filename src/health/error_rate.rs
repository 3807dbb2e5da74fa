//! Rolling error-rate estimation.
//!
//! # Responsibilities
//! - Keep one exponentially-weighted error rate per service version
//! - Start each key at the configured error rate, not zero
//!
//! # Design Decisions
//! - DashMap entry guards make each read-modify-write one critical section
//! - Smoothing constant is fixed

use dashmap::DashMap;

/// EWMA smoothing constant.
pub const SMOOTHING_ALPHA: f64 = 0.1;

/// Process-wide EWMA of request failures, keyed by service version.
#[derive(Debug)]
pub struct RollingErrorRate {
    initial: f64,
    alpha: f64,
    rates: DashMap<String, f64>,
}

impl RollingErrorRate {
    /// `initial` is the value every key starts from.
    pub fn new(initial: f64) -> Self {
        Self {
            initial: initial.clamp(0.0, 1.0),
            alpha: SMOOTHING_ALPHA,
            rates: DashMap::new(),
        }
    }

    /// Smoothing constant applied on every update.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Fold one completed request into the estimate and return the new rate.
    pub fn update(&self, service_version: &str, is_error: bool) -> f64 {
        self.update_with(service_version, is_error, |_| {})
    }

    /// Like [`update`](Self::update), but hands the new rate to `publish`
    /// while the key is still locked. Publications for one key therefore
    /// happen in update order.
    pub fn update_with<P>(&self, service_version: &str, is_error: bool, publish: P) -> f64
    where
        P: FnOnce(f64),
    {
        let sample = if is_error { 1.0 } else { 0.0 };
        let alpha = self.alpha;
        let step = |rate: &mut f64| {
            *rate = *rate * (1.0 - alpha) + sample * alpha;
            publish(*rate);
            *rate
        };

        if let Some(mut rate) = self.rates.get_mut(service_version) {
            return step(rate.value_mut());
        }
        let mut rate = self
            .rates
            .entry(service_version.to_string())
            .or_insert(self.initial);
        step(rate.value_mut())
    }

    /// Current estimate, or the initial value for an unseen version.
    pub fn current(&self, service_version: &str) -> f64 {
        self.rates
            .get(service_version)
            .map(|r| *r.value())
            .unwrap_or(self.initial)
    }

    /// All tracked versions and their rates.
    pub fn snapshot(&self) -> Vec<(String, f64)> {
        let mut rates: Vec<_> = self
            .rates
            .iter()
            .map(|r| (r.key().clone(), *r.value()))
            .collect();
        rates.sort_by(|a, b| a.0.cmp(&b.0));
        rates
    }
}
