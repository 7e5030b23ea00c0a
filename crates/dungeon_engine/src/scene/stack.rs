//! Scene stack
//!
//! Only the top scene runs. Every scene below it is paused, and the stack
//! re-derives which scene is active after each mutation.

use super::lifecycle::{ManagedScene, Scene, SceneError, SceneState, Transition};
use crate::events::EventBus;

/// Ordered stack of scenes, bottom first
#[derive(Debug, Default)]
pub struct SceneStack {
    scenes: Vec<ManagedScene>,
    active: Option<usize>,
}

impl SceneStack {
    /// Empty stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of scenes on the stack
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    /// True when no scene is left
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// The scene receiving updates, if any
    pub fn active_scene(&self) -> Option<&ManagedScene> {
        self.active.and_then(|index| self.scenes.get(index))
    }

    /// Lifecycle state of every scene, bottom first
    pub fn states(&self) -> Vec<SceneState> {
        self.scenes.iter().map(ManagedScene::state).collect()
    }

    /// Name of every scene, bottom first
    pub fn names(&self) -> Vec<&str> {
        self.scenes.iter().map(ManagedScene::name).collect()
    }

    /// True when the active index is the top of the stack, the top scene is
    /// running, and everything below it is paused
    pub fn is_consistent(&self) -> bool {
        if self.active != self.scenes.len().checked_sub(1) {
            return false;
        }
        match self.scenes.split_last() {
            None => true,
            Some((top, rest)) => {
                top.state() == SceneState::Running
                    && rest.iter().all(|scene| scene.state() == SceneState::Paused)
            }
        }
    }

    fn sync_active(&mut self) {
        self.active = self.scenes.len().checked_sub(1);
    }

    fn top_mut(&mut self) -> Option<&mut ManagedScene> {
        self.active.and_then(|index| self.scenes.get_mut(index))
    }

    /// Pause the active scene, then initialize `scene` on top of it
    pub fn push_scene(&mut self, bus: &mut EventBus, scene: Box<dyn Scene>) -> Result<(), SceneError> {
        if let Some(top) = self.top_mut() {
            top.pause(bus)?;
        }
        self.place(bus, scene)
    }

    /// Clean up and remove the active scene, then resume the one below
    ///
    /// Popping an empty stack does nothing.
    pub fn pop_scene(&mut self, bus: &mut EventBus) -> Result<(), SceneError> {
        if !self.remove_top(bus)? {
            return Ok(());
        }
        if let Some(top) = self.top_mut() {
            top.resume(bus)?;
        }
        debug_assert!(self.is_consistent());
        Ok(())
    }

    /// Replace the active scene with `scene`
    ///
    /// The scene below the old top stays paused throughout; it is neither
    /// resumed nor paused again.
    pub fn change_scene(&mut self, bus: &mut EventBus, scene: Box<dyn Scene>) -> Result<(), SceneError> {
        self.remove_top(bus)?;
        self.place(bus, scene)
    }

    /// Update the active scene and apply the transition it returns
    pub fn update(&mut self, bus: &mut EventBus, delta: f32) -> Result<(), SceneError> {
        let Some(top) = self.top_mut() else {
            return Ok(());
        };
        let transition = top.update(bus, delta);
        self.apply(bus, transition)
    }

    /// Apply a stack change
    pub fn apply(&mut self, bus: &mut EventBus, transition: Transition) -> Result<(), SceneError> {
        match transition {
            Transition::None => Ok(()),
            Transition::Push(scene) => self.push_scene(bus, scene),
            Transition::Pop => self.pop_scene(bus),
            Transition::Replace(scene) => self.change_scene(bus, scene),
        }
    }

    /// Draw the active scene
    pub fn draw(&self, alpha: f32) {
        if let Some(top) = self.active_scene() {
            top.draw(alpha);
        }
    }

    /// Clean up every scene from the top down, resuming none of them
    pub fn destroy(&mut self, bus: &mut EventBus) -> Result<(), SceneError> {
        let count = self.scenes.len();
        while self.remove_top(bus)? {}
        if count > 0 {
            log::info!("Destroyed {count} scene(s)");
        }
        Ok(())
    }

    fn place(&mut self, bus: &mut EventBus, scene: Box<dyn Scene>) -> Result<(), SceneError> {
        self.scenes.push(ManagedScene::new(scene));
        self.sync_active();
        if let Some(top) = self.top_mut() {
            top.init(bus)?;
        }
        debug_assert!(self.is_consistent());
        Ok(())
    }

    fn remove_top(&mut self, bus: &mut EventBus) -> Result<bool, SceneError> {
        let Some(top) = self.top_mut() else {
            return Ok(false);
        };
        top.cleanup(bus)?;
        self.scenes.pop();
        self.sync_active();
        Ok(true)
    }
}
