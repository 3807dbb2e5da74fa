//! Fault decision subsystem.
//!
//! # Data Flow
//! ```text
//! SimulationConfig + RandomSource
//!     → engine.rs (outage draw → error draw → latency draw)
//!     → FaultDecision (immutable, one per request)
//! ```
//!
//! # Design Decisions
//! - Pure: no I/O, no sleeping, no telemetry
//! - Random source is injected so tests can force draws

pub mod decision;
pub mod engine;
pub mod random;

pub use decision::{FaultDecision, FaultKind, BASELINE_LATENCY_SECONDS};
pub use engine::decide;
pub use random::{RandomSource, ScriptedRandom, SystemRandom};
