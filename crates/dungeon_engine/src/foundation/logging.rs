//! Logging utilities and structured logging support
//!
//! The engine logs through the `log` facade. Games configure severity with the
//! six-level [`LogLevel`] scale, which collapses onto `log`'s five levels.

pub use log::{debug, error, info, trace, warn};

use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::core::config::LoggingConfig;

/// Severity levels understood by engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Developer diagnostics, lifecycle transitions
    Debug,
    /// Normal operation
    #[default]
    Info,
    /// Noteworthy but expected conditions
    Notice,
    /// Something was dropped or skipped
    Warn,
    /// A handler or subsystem failed
    Error,
    /// Unrecoverable misuse
    Fatal,
}

impl LogLevel {
    /// Equivalent `log` level; `Notice` logs as info and `Fatal` as error
    pub const fn as_level(self) -> log::Level {
        match self {
            Self::Debug => log::Level::Debug,
            Self::Info | Self::Notice => log::Level::Info,
            Self::Warn => log::Level::Warn,
            Self::Error | Self::Fatal => log::Level::Error,
        }
    }

    /// Filter admitting this level and everything more severe
    pub const fn as_filter(self) -> LevelFilter {
        match self {
            Self::Debug => LevelFilter::Debug,
            Self::Info | Self::Notice => LevelFilter::Info,
            Self::Warn => LevelFilter::Warn,
            Self::Error | Self::Fatal => LevelFilter::Error,
        }
    }
}

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    let _ = env_logger::try_init();
}

/// Initialize the logging system from engine configuration
///
/// `RUST_LOG` still wins when set. Calling this twice is harmless; the second
/// call leaves the first logger in place.
pub fn init_with(config: &LoggingConfig) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(config.level.as_filter());
    if let Some(filter) = &config.filter {
        builder.parse_filters(filter);
    }
    if let Ok(env_filter) = std::env::var("RUST_LOG") {
        builder.parse_filters(&env_filter);
    }
    if builder.try_init().is_err() {
        log::debug!("Logger already initialized, keeping existing configuration");
    }
}
