//! Demo configuration: engine settings plus the knobs of the scripted run

use dungeon_engine::config::Config;
use dungeon_engine::core::config::EngineConfig;
use serde::{Deserialize, Serialize};

/// Top-level demo configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub engine: EngineConfig,
    pub demo: DemoSettings,
}

/// Scripted run parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoSettings {
    /// Frames to render before the display closes
    pub frames: u32,
    /// Nominal seconds per frame, jittered by the display
    pub frame_time: f32,
    /// Seed for the frame time jitter
    pub seed: u64,
    /// Event kinds logged by the tracer, by name
    pub trace_kinds: Vec<String>,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            frames: 240,
            frame_time: 0.008,
            seed: 7,
            trace_kinds: vec!["key.press".to_string(), "key.release".to_string()],
        }
    }
}

impl Config for DemoConfig {}
