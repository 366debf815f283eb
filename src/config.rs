//! Engine Configuration
//!
//! Defaults are the production values; each knob can be overridden from the
//! process environment. Loading `.env` files and secret management belong to
//! the deployment layer, not the engine.

use thiserror::Error;

use crate::game::outcome::MultiplierConfig;
use crate::game::scheduler::SchedulerConfig;
use crate::game::vehicle::VehicleConfig;

/// Errors from configuration loading.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// An environment variable was set but failed to parse.
    #[error("invalid value for {name}: {value:?}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// The raw value that failed to parse.
        value: String,
    },

    /// A parsed value is outside its permitted range.
    #[error("value for {name} is out of range: {reason}")]
    OutOfRange {
        /// Variable name.
        name: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },
}

/// Aggregate configuration for the whole engine.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Multiplier curve tunables.
    pub multiplier: MultiplierConfig,
    /// Vehicle growth tunables.
    pub vehicle: VehicleConfig,
    /// Phase timing tunables.
    pub scheduler: SchedulerConfig,
}

impl EngineConfig {
    /// Load configuration from the environment. Unset variables keep their
    /// defaults; set-but-invalid values are errors.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = read_f64("HOUSE_EDGE")? {
            if !(0.0..1.0).contains(&v) {
                return Err(ConfigError::OutOfRange {
                    name: "HOUSE_EDGE",
                    reason: "must be in [0, 1)",
                });
            }
            config.multiplier.house_edge = v;
        }
        if let Some(v) = read_f64("MAX_MULTIPLIER")? {
            if v < config.multiplier.min_multiplier {
                return Err(ConfigError::OutOfRange {
                    name: "MAX_MULTIPLIER",
                    reason: "must be at least the minimum multiplier",
                });
            }
            config.multiplier.max_multiplier = v;
        }
        if let Some(v) = read_f64("GROWTH_RATE")? {
            if v <= 0.0 {
                return Err(ConfigError::OutOfRange {
                    name: "GROWTH_RATE",
                    reason: "must be positive",
                });
            }
            config.vehicle.growth_rate = v;
        }
        if let Some(v) = read_u64("BETTING_DURATION_MS")? {
            config.scheduler.betting_ms = v;
        }
        if let Some(v) = read_u64("TICK_INTERVAL_MS")? {
            if v == 0 {
                return Err(ConfigError::OutOfRange {
                    name: "TICK_INTERVAL_MS",
                    reason: "must be positive",
                });
            }
            config.scheduler.tick_interval_ms = v;
        }
        if let Some(v) = read_u64("END_DURATION_MS")? {
            config.scheduler.end_ms = v;
        }

        Ok(config)
    }
}

fn read_f64(name: &'static str) -> Result<Option<f64>, ConfigError> {
    read_var(name)
}

fn read_u64(name: &'static str) -> Result<Option<u64>, ConfigError> {
    read_var(name)
}

fn read_var<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(None),
    }
}
