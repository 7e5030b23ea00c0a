//! Core engine implementation

use crate::{
    core::config::{ConfigError, EngineConfig},
    events::{BusError, EventBus, EventSender, ProcessReport},
    foundation::time::{FixedTimestep, Timer},
    scene::{ManagedScene, Scene, SceneError, SceneStack},
};
use thiserror::Error;

/// Window and input surface the engine drives
///
/// The engine never touches platform APIs itself; a display polls native
/// input into the bus and renders whatever scene is active.
pub trait Display {
    /// True once the user asked to close the window
    fn should_close(&self) -> bool;

    /// Translate pending native input into events on the bus
    fn poll_events(&mut self, sender: &EventSender);

    /// Present one frame of the active scene
    fn render(&mut self, scene: Option<&ManagedScene>, alpha: f32);

    /// Release platform resources
    fn destroy(&mut self);
}

/// What happened during one [`Engine::frame`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameReport {
    /// Fixed update steps run
    pub updates: u32,
    /// Steps dropped because the frame fell too far behind
    pub skipped: u32,
    /// Interpolation factor handed to the display
    pub alpha: f32,
    /// Event dispatch totals across all steps
    pub events: ProcessReport,
}

/// Main engine struct
///
/// Owns the event bus and the scene stack, and runs the fixed-timestep loop.
pub struct Engine {
    bus: EventBus,
    scenes: SceneStack,
    timestep: FixedTimestep,
    timer: Timer,
    config: EngineConfig,
}

impl Engine {
    /// Create a new engine instance
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        log::info!(
            "Initializing engine at {} UPS (max {} updates per frame, event depth {})",
            config.timing.target_ups,
            config.timing.max_updates_per_frame,
            config.events.depth_limit
        );

        Ok(Self {
            bus: EventBus::from_config(&config.events),
            scenes: SceneStack::new(),
            timestep: FixedTimestep::new(config.timing.target_ups),
            timer: Timer::new(),
            config,
        })
    }

    /// Get the event bus
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Get mutable access to the event bus
    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    /// Get the scene stack
    pub fn scenes(&self) -> &SceneStack {
        &self.scenes
    }

    /// Get the frame timer
    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    /// Get the engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Push a scene onto the stack
    pub fn push_scene(&mut self, scene: Box<dyn Scene>) -> Result<(), EngineError> {
        self.scenes.push_scene(&mut self.bus, scene)?;
        Ok(())
    }

    /// Run one frame that took `elapsed` seconds of wall time
    pub fn frame<D: Display + ?Sized>(&mut self, display: &mut D, elapsed: f32) -> Result<FrameReport, EngineError> {
        self.timer.advance(elapsed);
        self.step(display, elapsed)
    }

    fn step<D: Display + ?Sized>(&mut self, display: &mut D, elapsed: f32) -> Result<FrameReport, EngineError> {
        let mut report = FrameReport::default();
        display.poll_events(&self.bus.sender());

        self.timestep.accumulate(elapsed);
        let interval = self.timestep.interval();
        while report.updates < self.config.timing.max_updates_per_frame && self.timestep.consume_step() {
            report.events += self.bus.process();
            self.scenes.update(&mut self.bus, interval)?;
            self.timer.count_update();
            report.updates += 1;
        }

        if report.updates == self.config.timing.max_updates_per_frame {
            report.skipped = self.timestep.discard_backlog();
            if report.skipped > 0 {
                log::warn!("Running behind, skipped {} update(s)", report.skipped);
            }
        }

        report.alpha = self.timestep.alpha();
        display.render(self.scenes.active_scene(), report.alpha);
        self.timer.count_frame();
        Ok(report)
    }

    /// Run the main loop until the display closes or the scene stack empties
    ///
    /// Every remaining scene is cleaned up and the display destroyed before
    /// returning.
    pub fn run<D: Display + ?Sized>(&mut self, display: &mut D, initial: Box<dyn Scene>) -> Result<(), EngineError> {
        self.push_scene(initial)?;
        log::info!("Starting main loop...");

        self.timer = Timer::new();
        let mut last_report = 0.0;
        while !display.should_close() && !self.scenes.is_empty() {
            let elapsed = self.timer.tick();
            self.step(display, elapsed)?;

            if self.timer.total_time() - last_report >= 1.0 {
                last_report = self.timer.total_time();
                log::debug!("{} FPS, {} UPS", self.timer.fps(), self.timer.ups());
            }
        }

        self.shutdown(display)
    }

    /// Clean up every scene and destroy the display
    pub fn shutdown<D: Display + ?Sized>(&mut self, display: &mut D) -> Result<(), EngineError> {
        self.scenes.destroy(&mut self.bus)?;
        display.destroy();
        log::info!("Engine shutdown complete");
        Ok(())
    }
}

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// A scene transition was refused
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// An event registration failed
    #[error("Event error: {0}")]
    Bus(#[from] BusError),

    /// The configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
