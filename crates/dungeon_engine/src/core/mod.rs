//! # Core Engine Module
//!
//! Shared configuration for the engine's subsystems.
//!
//! ## Organization
//!
//! - **Config**: engine, event bus and logging settings

pub mod config;

// Re-export commonly used config types
pub use config::{
    Config,
    ConfigError,
    ConfigFormat,
    EngineConfig,
    EventConfig,
    LoggingConfig,
    TimingConfig,
};
