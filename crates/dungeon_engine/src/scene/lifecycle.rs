//! Scene trait and the lifecycle state machine wrapped around it
//!
//! Application code implements [`Scene`] and only ever sees its hooks.
//! [`ManagedScene`] owns the scene, tracks its [`SceneState`], and refuses
//! transitions the state machine does not allow:
//!
//! ```text
//! NEW --init--> RUNNING --pause--> PAUSED
//!                  ^                  |
//!                  +------resume------+
//! RUNNING | PAUSED --cleanup--> DEAD
//! ```

use std::fmt;

use crate::events::{BusError, Event, EventBus, Kind, SubscriberId};

/// Lifecycle state of a scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneState {
    /// Constructed, not yet initialized
    New,
    /// Active and receiving updates
    Running,
    /// Covered by another scene
    Paused,
    /// Cleaned up; never used again
    Dead,
}

impl fmt::Display for SceneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::New => "NEW",
            Self::Running => "RUNNING",
            Self::Paused => "PAUSED",
            Self::Dead => "DEAD",
        })
    }
}

/// Lifecycle errors
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The requested transition is not allowed from the current state
    #[error("Cannot {operation} scene '{scene}' while it is {state}")]
    InvalidTransition {
        /// Scene name
        scene: String,
        /// Requested operation
        operation: &'static str,
        /// State the scene was in
        state: SceneState,
    },
}

/// Stack change requested by a scene's update
pub enum Transition {
    /// Stay on the current scene
    None,
    /// Pause the current scene and run a new one on top of it
    Push(Box<dyn Scene>),
    /// Clean up the current scene and resume the one below
    Pop,
    /// Clean up the current scene and run a new one in its place
    Replace(Box<dyn Scene>),
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Push(scene) => write!(f, "Push({})", scene.name()),
            Self::Pop => f.write_str("Pop"),
            Self::Replace(scene) => write!(f, "Replace({})", scene.name()),
        }
    }
}

/// What a scene hook can reach: the bus, and the scene's own subscriber identity
pub struct SceneContext<'a> {
    bus: &'a mut EventBus,
    subscriber: SubscriberId,
}

impl<'a> SceneContext<'a> {
    pub(crate) fn new(bus: &'a mut EventBus, subscriber: SubscriberId) -> Self {
        Self { bus, subscriber }
    }

    /// The scene's subscriber identity
    pub fn subscriber(&self) -> SubscriberId {
        self.subscriber
    }

    /// The event bus
    pub fn bus(&mut self) -> &mut EventBus {
        self.bus
    }

    /// Subscribe this scene to kind `K`
    ///
    /// The subscription is removed automatically when the scene is cleaned up.
    pub fn subscribe<K, F>(&mut self, handler: F) -> Result<bool, BusError>
    where
        K: Kind,
        F: FnMut(&mut EventBus, &K) + 'static,
    {
        self.bus.register::<K, F>(self.subscriber, handler)
    }

    /// Drop this scene's subscription to kind `K`
    pub fn unsubscribe<K: Kind>(&mut self) -> bool {
        self.bus.unregister::<K>(self.subscriber)
    }

    /// Raise an event for the next dispatch pass
    pub fn raise<E: Event>(&self, event: E) {
        self.bus.raise(event);
    }
}

/// One logical game state
///
/// Every hook except [`Scene::on_update`] has an empty default.
pub trait Scene {
    /// Name used in log lines
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Called once when the scene becomes active for the first time
    fn on_init(&mut self, _ctx: &mut SceneContext<'_>) {}

    /// Called when another scene is pushed on top of this one
    fn on_pause(&mut self, _ctx: &mut SceneContext<'_>) {}

    /// Called when the scene on top of this one is popped
    fn on_resume(&mut self, _ctx: &mut SceneContext<'_>) {}

    /// Called once before the scene is discarded; subscriptions are removed afterwards
    fn on_cleanup(&mut self, _ctx: &mut SceneContext<'_>) {}

    /// Advance the scene by one fixed step of `delta` seconds
    fn on_update(&mut self, ctx: &mut SceneContext<'_>, delta: f32) -> Transition;

    /// Render with `alpha` in `[0, 1)` interpolating between the last two updates
    fn draw(&self, _alpha: f32) {}
}

/// A scene together with its lifecycle state
pub struct ManagedScene {
    scene: Box<dyn Scene>,
    state: SceneState,
    subscriber: SubscriberId,
}

impl ManagedScene {
    /// Wrap a scene in state `New`
    pub fn new(scene: Box<dyn Scene>) -> Self {
        Self {
            scene,
            state: SceneState::New,
            subscriber: SubscriberId::default(),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SceneState {
        self.state
    }

    /// Scene name
    pub fn name(&self) -> &str {
        self.scene.name()
    }

    /// Subscriber identity, valid between `init` and `cleanup`
    pub fn subscriber(&self) -> SubscriberId {
        self.subscriber
    }

    /// The wrapped scene
    pub fn scene(&self) -> &dyn Scene {
        self.scene.as_ref()
    }

    fn require(&self, allowed: &[SceneState], operation: &'static str) -> Result<(), SceneError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(SceneError::InvalidTransition {
                scene: self.name().to_string(),
                operation,
                state: self.state,
            })
        }
    }

    fn enter(&mut self, state: SceneState) {
        log::debug!("Scene '{}' {} -> {}", self.scene.name(), self.state, state);
        self.state = state;
    }

    /// `New -> Running`
    pub fn init(&mut self, bus: &mut EventBus) -> Result<(), SceneError> {
        self.require(&[SceneState::New], "init")?;
        self.subscriber = bus.subscriber(self.scene.name());
        self.scene.on_init(&mut SceneContext::new(bus, self.subscriber));
        self.enter(SceneState::Running);
        Ok(())
    }

    /// `Running -> Paused`; subscriptions stay registered
    pub fn pause(&mut self, bus: &mut EventBus) -> Result<(), SceneError> {
        self.require(&[SceneState::Running], "pause")?;
        self.scene.on_pause(&mut SceneContext::new(bus, self.subscriber));
        self.enter(SceneState::Paused);
        Ok(())
    }

    /// `Paused -> Running`
    pub fn resume(&mut self, bus: &mut EventBus) -> Result<(), SceneError> {
        self.require(&[SceneState::Paused], "resume")?;
        self.scene.on_resume(&mut SceneContext::new(bus, self.subscriber));
        self.enter(SceneState::Running);
        Ok(())
    }

    /// `Running | Paused -> Dead`, removing every subscription the scene holds
    pub fn cleanup(&mut self, bus: &mut EventBus) -> Result<(), SceneError> {
        self.require(&[SceneState::Running, SceneState::Paused], "cleanup")?;
        self.scene.on_cleanup(&mut SceneContext::new(bus, self.subscriber));
        bus.release(self.subscriber);
        self.enter(SceneState::Dead);
        Ok(())
    }

    /// Advance a running scene by one fixed step
    ///
    /// # Panics
    ///
    /// Panics when the scene is not `Running`. Only the owning stack calls
    /// this, so any other state means the stack lost track of its scenes.
    pub fn update(&mut self, bus: &mut EventBus, delta: f32) -> Transition {
        if self.state != SceneState::Running {
            log::error!("update() called on scene '{}' while it is {}", self.scene.name(), self.state);
            panic!("update() called on scene '{}' while it is {}", self.scene.name(), self.state);
        }
        self.scene.on_update(&mut SceneContext::new(bus, self.subscriber), delta)
    }

    /// Render the scene
    pub fn draw(&self, alpha: f32) {
        self.scene.draw(alpha);
    }
}

impl fmt::Debug for ManagedScene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedScene")
            .field("name", &self.name())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
