//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → fixed environment surface (SIM_BAD, ERROR_RATE, ...)
//!     → validation.rs (clamp, collect warnings)
//!     → AppConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow running with no file at all
//! - Out-of-range values are clamped and logged, never fatal

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, LoadedConfig};
pub use schema::{
    AppConfig, LogFormat, ObservabilityConfig, ServerConfig, SimulationConfig, SloConfig,
};
pub use validation::ConfigWarning;
