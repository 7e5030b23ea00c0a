//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Time management (frame timer, fixed timestep, event clock)
//! - Logging utilities

pub mod time;
pub mod logging;
