//! Scene management
//!
//! A game is a stack of scenes. The top scene is running and receives fixed
//! updates and draw calls; scenes beneath it are paused but keep their event
//! subscriptions. Scenes never touch the stack directly: an update returns a
//! [`Transition`] and the stack applies it.

mod lifecycle;
mod stack;

pub use self::lifecycle::{ManagedScene, Scene, SceneContext, SceneError, SceneState, Transition};
pub use self::stack::SceneStack;
