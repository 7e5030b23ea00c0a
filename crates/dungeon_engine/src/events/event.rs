//! Event values and the kind tags used to route them
//!
//! An event is an immutable value with a [`Priority`] and a raise timestamp.
//! Every event type is also a [`Kind`]; an event additionally lists the
//! ancestor kinds it belongs to, so a subscription on a base kind (for
//! example "any key event") sees every derived event as well.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::foundation::time::monotonic_nanos;

/// Dispatch urgency; smaller values are dispatched first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(u8);

impl Priority {
    /// Most urgent priority
    pub const HIGHEST: Self = Self(0);
    /// Least urgent priority, and the default
    pub const LOWEST: Self = Self(10);

    /// Create a priority, clamping `value` into `[HIGHEST, LOWEST]`
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn new(value: i32) -> Self {
        Self(value.clamp(i32::from(Self::HIGHEST.0), i32::from(Self::LOWEST.0)) as u8)
    }

    /// Numeric value
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::LOWEST
    }
}

/// Fields shared by every event, fixed at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventHeader {
    priority: Priority,
    timestamp: u64,
}

impl EventHeader {
    /// Header with the default (lowest) priority
    pub fn new() -> Self {
        Self::with_priority(Priority::default())
    }

    /// Header with an explicit priority
    pub fn with_priority(priority: Priority) -> Self {
        Self {
            priority,
            timestamp: monotonic_nanos(),
        }
    }

    /// Dispatch priority
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Construction time in nanoseconds; only used to break priority ties
    pub const fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Dispatch ordering key
    pub const fn sort_key(&self) -> (Priority, u64) {
        (self.priority, self.timestamp)
    }
}

impl Default for EventHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// A type subscribers can register against
///
/// Concrete event types are kinds, and so are the base types they embed.
pub trait Kind: Any {
    /// Stable dotted name, used for registration by name and in logs
    const NAME: &'static str;
}

/// Runtime tag for a [`Kind`]
#[derive(Clone, Copy)]
pub struct EventKind {
    id: TypeId,
    name: &'static str,
}

impl EventKind {
    /// Tag for kind `K`
    pub fn of<K: Kind>() -> Self {
        Self {
            id: TypeId::of::<K>(),
            name: K::NAME,
        }
    }

    /// Registered name of the kind
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for EventKind {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EventKind {}

impl Hash for EventKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventKind({})", self.name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Something that happened, raised onto the bus for later dispatch
pub trait Event: Any + Send + fmt::Debug {
    /// Priority and timestamp
    fn header(&self) -> &EventHeader;

    /// Kinds this event belongs to: its own kind first, then its ancestors
    fn kinds(&self) -> Vec<EventKind>;

    /// The value handed to subscribers of `kind`
    ///
    /// For the event's own kind this is the event itself; for an ancestor
    /// kind it is the embedded base value.
    fn view(&self, kind: EventKind) -> Option<&dyn Any>;
}

impl dyn Event {
    /// Most specific kind, if the event declares any
    pub fn kind(&self) -> Option<EventKind> {
        self.kinds().first().copied()
    }

    /// Whether this event is of `kind` or derives from it
    pub fn satisfies(&self, kind: EventKind) -> bool {
        self.kinds().contains(&kind)
    }

    /// Typed view for kind `K`
    pub fn view_as<K: Kind>(&self) -> Option<&K> {
        self.view(EventKind::of::<K>())?.downcast_ref::<K>()
    }

    /// Dispatch priority
    pub fn priority(&self) -> Priority {
        self.header().priority()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Note {
        header: EventHeader,
    }

    impl Kind for Note {
        const NAME: &'static str = "test.note";
    }

    impl Event for Note {
        fn header(&self) -> &EventHeader {
            &self.header
        }

        fn kinds(&self) -> Vec<EventKind> {
            vec![EventKind::of::<Self>()]
        }

        fn view(&self, kind: EventKind) -> Option<&dyn Any> {
            (kind == EventKind::of::<Self>()).then_some(self as &dyn Any)
        }
    }

    #[test]
    fn test_priority_clamps_into_range() {
        assert_eq!(Priority::new(-5), Priority::HIGHEST);
        assert_eq!(Priority::new(42), Priority::LOWEST);
        assert_eq!(Priority::new(3).value(), 3);
        assert_eq!(Priority::default(), Priority::LOWEST);
        assert!(Priority::HIGHEST < Priority::LOWEST);
    }

    #[test]
    fn test_header_defaults_to_lowest_priority() {
        let header = EventHeader::new();
        assert_eq!(header.priority(), Priority::LOWEST);
    }

    #[test]
    fn test_headers_built_later_sort_later() {
        let first = EventHeader::with_priority(Priority::new(4));
        let second = EventHeader::with_priority(Priority::new(4));
        assert!(first.timestamp() < second.timestamp());
        assert!(first.sort_key() < second.sort_key());

        let urgent = EventHeader::with_priority(Priority::HIGHEST);
        assert!(urgent.sort_key() < first.sort_key());
    }

    #[test]
    fn test_kind_equality_ignores_name_storage() {
        assert_eq!(EventKind::of::<Note>(), EventKind::of::<Note>());
        assert_eq!(EventKind::of::<Note>().name(), "test.note");
        assert_eq!(EventKind::of::<Note>().to_string(), "test.note");
    }

    #[test]
    fn test_dyn_event_helpers() {
        let note: Box<dyn Event> = Box::new(Note { header: EventHeader::new() });
        assert_eq!(note.kind(), Some(EventKind::of::<Note>()));
        assert!(note.satisfies(EventKind::of::<Note>()));
        assert!(note.view_as::<Note>().is_some());
        assert_eq!(note.priority(), Priority::LOWEST);
    }
}
