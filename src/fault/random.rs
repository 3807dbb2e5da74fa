//! Injectable random sources for fault decisions.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of the uniform draws consumed by the fault engine.
pub trait RandomSource: Send {
    /// A draw from [0, 1).
    fn unit(&mut self) -> f64;

    /// A draw from [low, high]. Callers guarantee `low <= high`.
    fn uniform(&mut self, low: f64, high: f64) -> f64;
}

/// Entropy-seeded generator used in production.
#[derive(Debug)]
pub struct SystemRandom {
    rng: StdRng,
}

impl SystemRandom {
    /// Seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sequence, handy for load generation.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for SystemRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for SystemRandom {
    fn unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if high <= low {
            return low;
        }
        self.rng.gen_range(low..=high)
    }
}

/// Replays a fixed list of draws, in order.
///
/// Each value is returned as-is, clamped into the requested range. Once the
/// script runs out every further draw yields `fallback`.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    draws: VecDeque<f64>,
    fallback: f64,
    consumed: usize,
}

impl ScriptedRandom {
    /// Replays `draws` in order.
    pub fn new(draws: impl IntoIterator<Item = f64>) -> Self {
        Self {
            draws: draws.into_iter().collect(),
            fallback: 0.999,
            consumed: 0,
        }
    }

    /// Every draw returns `value`.
    pub fn constant(value: f64) -> Self {
        Self {
            draws: VecDeque::new(),
            fallback: value,
            consumed: 0,
        }
    }

    /// Value returned once the script is exhausted.
    pub fn with_fallback(mut self, fallback: f64) -> Self {
        self.fallback = fallback;
        self
    }

    /// Number of draws taken so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Draws still queued.
    pub fn remaining(&self) -> usize {
        self.draws.len()
    }

    fn next(&mut self) -> f64 {
        self.consumed += 1;
        self.draws.pop_front().unwrap_or(self.fallback)
    }
}

impl RandomSource for ScriptedRandom {
    fn unit(&mut self) -> f64 {
        self.next().clamp(0.0, 1.0)
    }

    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        self.next().clamp(low, high.max(low))
    }
}
