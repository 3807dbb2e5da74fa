//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{AppConfig, SimulationConfig};
use crate::config::validation::{sanitize_config, ConfigWarning};

/// Environment variables recognized by the loader. No others are read.
pub const ENV_KEYS: [&str; 7] = [
    "SIM_BAD",
    "ERROR_RATE",
    "LATENCY_SIMULATION",
    "MAX_LATENCY",
    "OUTAGE_SIMULATION",
    "VERSION_LABEL",
    "SERVICE_VERSION",
];

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A loaded configuration together with every value that had to be fixed.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub warnings: Vec<ConfigWarning>,
}

fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

fn parse_float(
    key: &'static str,
    value: &str,
    current: f64,
    warnings: &mut Vec<ConfigWarning>,
) -> f64 {
    match value.trim().parse::<f64>() {
        Ok(v) => v,
        Err(_) => {
            warnings.push(ConfigWarning {
                field: key,
                original: value.to_string(),
                applied: current.to_string(),
            });
            current
        }
    }
}

/// Apply the fixed environment surface on top of `sim`.
///
/// `lookup` abstracts `std::env::var` so tests never touch the real
/// environment.
pub fn apply_env_overrides<F>(sim: &mut SimulationConfig, lookup: F) -> Vec<ConfigWarning>
where
    F: Fn(&str) -> Option<String>,
{
    let mut warnings = Vec::new();

    if let Some(v) = lookup("SIM_BAD") {
        sim.sim_bad_enabled = parse_flag(&v);
    }
    if let Some(v) = lookup("ERROR_RATE") {
        sim.error_rate = parse_float("ERROR_RATE", &v, sim.error_rate, &mut warnings);
    }
    if let Some(v) = lookup("LATENCY_SIMULATION") {
        sim.latency_sim_enabled = parse_flag(&v);
    }
    if let Some(v) = lookup("MAX_LATENCY") {
        sim.max_latency_seconds =
            parse_float("MAX_LATENCY", &v, sim.max_latency_seconds, &mut warnings);
    }
    if let Some(v) = lookup("OUTAGE_SIMULATION") {
        sim.outage_sim_enabled = parse_flag(&v);
    }
    if let Some(v) = lookup("VERSION_LABEL") {
        sim.version_label = v;
    }
    if let Some(v) = lookup("SERVICE_VERSION") {
        sim.service_version = v;
    }

    warnings
}

/// Build a configuration from an optional TOML file and an environment lookup.
pub fn load_config_with<F>(path: Option<&Path>, lookup: F) -> Result<LoadedConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str::<AppConfig>(&content)?
        }
        None => AppConfig::default(),
    };

    let mut warnings = apply_env_overrides(&mut config.simulation, lookup);
    warnings.extend(sanitize_config(&mut config));

    Ok(LoadedConfig { config, warnings })
}

/// Load configuration from an optional TOML file and the process environment.
pub fn load_config(path: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    load_config_with(path, |key| std::env::var(key).ok())
}
