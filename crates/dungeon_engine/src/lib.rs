//! # Dungeon Engine
//!
//! A small game-loop engine built around two pieces: a prioritized event bus
//! and a stack of scenes with a strict lifecycle.
//!
//! ## Features
//!
//! - **Event Bus**: typed subscriptions, priority ordering, cascading dispatch
//! - **Scene Stack**: push / pop / replace with pause and resume hooks
//! - **Fixed Timestep**: deterministic updates with interpolated rendering
//! - **Configuration**: TOML or RON engine settings
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dungeon_engine::prelude::*;
//!
//! struct Title;
//!
//! impl Scene for Title {
//!     fn on_update(&mut self, _ctx: &mut SceneContext<'_>, _delta: f32) -> Transition {
//!         Transition::None
//!     }
//! }
//!
//! struct Headless;
//!
//! impl Display for Headless {
//!     fn should_close(&self) -> bool { false }
//!     fn poll_events(&mut self, _sender: &EventSender) {}
//!     fn render(&mut self, scene: Option<&ManagedScene>, alpha: f32) {
//!         if let Some(scene) = scene {
//!             scene.draw(alpha);
//!         }
//!     }
//!     fn destroy(&mut self) {}
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut engine = Engine::new(EngineConfig::default())?;
//!     engine.run(&mut Headless, Box::new(Title))?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core engine modules
pub mod config;
pub mod core;
pub mod foundation;

pub mod events;
pub mod input;
pub mod scene;

mod engine;

pub use engine::{Display, Engine, EngineError, FrameReport};

#[cfg(test)]
mod tests;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        core::config::{Config, EngineConfig},
        events::{Event, EventBus, EventHeader, EventKind, EventSender, Kind, Priority, SubscriberId},
        foundation::time::{FixedTimestep, Timer},
        input::{keys, KeyEvent, KeyPressEvent, KeyReleaseEvent, KeyRepeatEvent, Modifiers},
        scene::{ManagedScene, Scene, SceneContext, SceneStack, SceneState, Transition},
        Display, Engine, EngineError,
    };
}
