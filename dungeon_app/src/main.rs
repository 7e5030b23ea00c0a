//! Dungeon demo application
//!
//! Runs the title menu and test scene headlessly against a scripted keyboard,
//! tracing the configured event kinds as they are dispatched.

mod config;
mod display;
mod scenes;

use std::path::PathBuf;

use dungeon_engine::config::{Config, ConfigError};
use dungeon_engine::foundation::logging;
use dungeon_engine::input;
use dungeon_engine::prelude::*;
use thiserror::Error;

use crate::config::DemoConfig;
use crate::display::{demo_script, ScriptedDisplay};
use crate::scenes::{CounterEvent, TitleMenuScene};

#[derive(Debug, Error)]
enum DemoError {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Engine failure: {0}")]
    Engine(#[from] EngineError),
}

/// Subscribe a logging tracer to every configured kind name
fn install_tracer(bus: &mut EventBus, kinds: &[String]) {
    input::declare_kinds(bus);
    bus.declare::<CounterEvent>();

    let tracer = bus.subscriber("tracer");
    for name in kinds {
        match bus.register_named(tracer, name, |_, event| {
            log::info!("[trace] {event:?}");
        }) {
            Ok(_) => log::debug!("Tracing '{name}'"),
            Err(e) => log::warn!("Not tracing '{name}': {e}"),
        }
    }
}

fn run() -> Result<(), DemoError> {
    let path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from("dungeon.toml"), PathBuf::from);
    let config = DemoConfig::load_or_default(&path)?;
    logging::init_with(&config.engine.logging);

    log::info!("Starting Dungeon demo");

    let mut engine = Engine::new(config.engine)?;
    install_tracer(engine.bus_mut(), &config.demo.trace_kinds);

    let mut display = ScriptedDisplay::new(
        demo_script(),
        config.demo.frames,
        config.demo.frame_time,
        config.demo.seed,
    );
    engine.run(&mut display, Box::new(TitleMenuScene::new()))?;

    log::info!(
        "Rendered {} frames, {:.2}s of game time",
        display.frames(),
        engine.timer().total_time()
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    match run() {
        Ok(()) => {
            log::info!("Dungeon demo completed successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Dungeon demo failed: {e}");
            Err(e.into())
        }
    }
}
