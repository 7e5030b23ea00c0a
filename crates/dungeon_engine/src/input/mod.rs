//! Input translation
//!
//! The display layer owns native input polling. It hands raw key callbacks to
//! [`raise_key`], which turns them into typed events on the bus.

mod events;

pub use self::events::{KeyEvent, KeyPressEvent, KeyReleaseEvent, KeyRepeatEvent};

use bitflags::bitflags;

use crate::events::{EventBus, EventSender};

bitflags! {
    /// Modifier keys held during a key event
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// Either shift key
        const SHIFT = 1 << 0;
        /// Either control key
        const CONTROL = 1 << 1;
        /// Either alt key
        const ALT = 1 << 2;
        /// Either meta / super key
        const SUPER = 1 << 3;
    }
}

impl Modifiers {
    /// Convert a raw platform bitmask, ignoring unknown bits
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_raw(mods: i32) -> Self {
        Self::from_bits_truncate((mods & 0xff) as u8)
    }
}

/// What happened to a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    /// Key released
    Release,
    /// Key pressed
    Press,
    /// Key held long enough to repeat
    Repeat,
}

impl KeyAction {
    /// Decode a platform action code (0 release, 1 press, 2 repeat)
    pub const fn from_raw(action: i32) -> Option<Self> {
        match action {
            0 => Some(Self::Release),
            1 => Some(Self::Press),
            2 => Some(Self::Repeat),
            _ => None,
        }
    }
}

/// Commonly used platform key codes
pub mod keys {
    /// Space bar
    pub const SPACE: i32 = 32;
    /// Escape
    pub const ESCAPE: i32 = 256;
    /// Enter / return
    pub const ENTER: i32 = 257;
    /// Right arrow
    pub const RIGHT: i32 = 262;
    /// Left arrow
    pub const LEFT: i32 = 263;
    /// Down arrow
    pub const DOWN: i32 = 264;
    /// Up arrow
    pub const UP: i32 = 265;
}

/// Translate a native key callback into a key event on the bus
///
/// Returns `false` for an unknown action code, in which case nothing is raised.
pub fn raise_key(sender: &EventSender, key: i32, scancode: i32, action: i32, mods: i32) -> bool {
    let modifiers = Modifiers::from_raw(mods);
    match KeyAction::from_raw(action) {
        Some(KeyAction::Press) => sender.raise(KeyPressEvent::new(key, scancode, modifiers)),
        Some(KeyAction::Release) => sender.raise(KeyReleaseEvent::new(key, scancode, modifiers)),
        Some(KeyAction::Repeat) => sender.raise(KeyRepeatEvent::new(key, scancode, modifiers)),
        None => {
            log::warn!("Ignoring key {key} with unknown action {action}");
            return false;
        }
    }
    true
}

/// Declare every input kind so it can be registered by name
pub fn declare_kinds(bus: &mut EventBus) {
    bus.declare::<KeyEvent>();
    bus.declare::<KeyPressEvent>();
    bus.declare::<KeyReleaseEvent>();
    bus.declare::<KeyRepeatEvent>();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_modifier_bits_match_platform_layout() {
        let mods = Modifiers::from_raw(0b1011);
        assert!(mods.contains(Modifiers::SHIFT | Modifiers::CONTROL | Modifiers::SUPER));
        assert!(!mods.contains(Modifiers::ALT));
        assert_eq!(Modifiers::from_raw(0x70), Modifiers::empty());
    }

    #[test]
    fn test_raise_key_picks_event_by_action() {
        let mut bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let id = bus.subscriber("listener");
        let presses = Rc::clone(&seen);
        bus.register::<KeyPressEvent, _>(id, move |_, _| presses.borrow_mut().push("press")).expect("registered");
        let releases = Rc::clone(&seen);
        bus.register::<KeyReleaseEvent, _>(id, move |_, _| releases.borrow_mut().push("release")).expect("registered");
        let repeats = Rc::clone(&seen);
        bus.register::<KeyRepeatEvent, _>(id, move |_, _| repeats.borrow_mut().push("repeat")).expect("registered");

        let sender = bus.sender();
        assert!(raise_key(&sender, keys::SPACE, 57, 1, 0));
        assert!(raise_key(&sender, keys::SPACE, 57, 2, 0));
        assert!(raise_key(&sender, keys::SPACE, 57, 0, 0));
        assert!(!raise_key(&sender, keys::SPACE, 57, 9, 0));
        bus.process();

        assert_eq!(*seen.borrow(), vec!["press", "repeat", "release"]);
    }

    #[test]
    fn test_declared_kinds_resolve_by_name() {
        let mut bus = EventBus::new();
        assert!(bus.kind_named("key").is_none());

        declare_kinds(&mut bus);
        for name in ["key", "key.press", "key.release", "key.repeat"] {
            assert!(bus.kind_named(name).is_some(), "{name} should be declared");
        }
    }
}
