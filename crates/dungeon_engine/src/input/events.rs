//! Keyboard events raised by the display layer

use std::any::Any;

use super::Modifiers;
use crate::events::{Event, EventHeader, EventKind, Kind, Priority};

/// Base kind shared by every keyboard event
///
/// Never raised on its own; subscribe to it to receive presses, releases and
/// repeats alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    header: EventHeader,
    key: i32,
    scancode: i32,
    modifiers: Modifiers,
}

impl KeyEvent {
    fn new(key: i32, scancode: i32, modifiers: Modifiers, priority: Priority) -> Self {
        Self {
            header: EventHeader::with_priority(priority),
            key,
            scancode,
            modifiers,
        }
    }

    /// Platform key code
    pub const fn key(&self) -> i32 {
        self.key
    }

    /// Hardware scancode
    pub const fn scancode(&self) -> i32 {
        self.scancode
    }

    /// Modifier keys held at the time of the event
    pub const fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Priority and timestamp
    pub const fn header(&self) -> &EventHeader {
        &self.header
    }
}

impl Kind for KeyEvent {
    const NAME: &'static str = "key";
}

macro_rules! key_event {
    ($(#[$doc:meta])* $name:ident, $kind:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name(KeyEvent);

        impl $name {
            /// Event with the default priority
            pub fn new(key: i32, scancode: i32, modifiers: Modifiers) -> Self {
                Self::with_priority(key, scancode, modifiers, Priority::default())
            }

            /// Event with an explicit priority
            pub fn with_priority(key: i32, scancode: i32, modifiers: Modifiers, priority: Priority) -> Self {
                Self(KeyEvent::new(key, scancode, modifiers, priority))
            }

            /// Shared keyboard fields
            pub const fn as_key(&self) -> &KeyEvent {
                &self.0
            }
        }

        impl Kind for $name {
            const NAME: &'static str = $kind;
        }

        impl Event for $name {
            fn header(&self) -> &EventHeader {
                &self.0.header
            }

            fn kinds(&self) -> Vec<EventKind> {
                vec![EventKind::of::<Self>(), EventKind::of::<KeyEvent>()]
            }

            fn view(&self, kind: EventKind) -> Option<&dyn Any> {
                if kind == EventKind::of::<Self>() {
                    Some(self as &dyn Any)
                } else if kind == EventKind::of::<KeyEvent>() {
                    Some(&self.0 as &dyn Any)
                } else {
                    None
                }
            }
        }
    };
}

key_event!(
    /// A key went down
    KeyPressEvent,
    "key.press"
);

key_event!(
    /// A key came up
    KeyReleaseEvent,
    "key.release"
);

key_event!(
    /// A held key auto-repeated
    KeyRepeatEvent,
    "key.repeat"
);
