//! # Engine Configuration
//!
//! Tunables for the tick driver, the event bus and logging. All sections have
//! defaults, so a config file only needs the values it changes:
//!
//! ```toml
//! [timing]
//! target_ups = 30
//!
//! [events]
//! depth_limit = 4
//! ```

use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError, ConfigFormat};
use crate::foundation::logging::LogLevel;

/// Default number of dispatch passes a single `process()` call may run
pub const DEFAULT_DEPTH_LIMIT: usize = 10;

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fixed-step loop settings
    pub timing: TimingConfig,
    /// Event bus settings
    pub events: EventConfig,
    /// Logger settings
    pub logging: LoggingConfig,
}

/// Fixed-step loop settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Logic updates per second
    pub target_ups: u32,
    /// Cap on update steps run in one frame before the backlog is discarded
    pub max_updates_per_frame: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            target_ups: 60,
            max_updates_per_frame: 5,
        }
    }
}

/// Event bus settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Maximum cascade passes per `process()` call
    pub depth_limit: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            depth_limit: DEFAULT_DEPTH_LIMIT,
        }
    }
}

/// Logger settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum severity
    pub level: LogLevel,
    /// Extra `env_logger` filter directives, e.g. `"dungeon_engine::events=debug"`
    pub filter: Option<String>,
}

impl EngineConfig {
    /// Check ranges that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timing.target_ups == 0 {
            return Err(ConfigError::Invalid {
                field: "timing.target_ups",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.timing.max_updates_per_frame == 0 {
            return Err(ConfigError::Invalid {
                field: "timing.max_updates_per_frame",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.events.depth_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "events.depth_limit",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Config for EngineConfig {}
