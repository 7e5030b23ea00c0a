//! Event system
//!
//! Key principles:
//! - Raise now, dispatch later: nothing is delivered from inside `raise`
//! - Batches dispatch in `(priority, timestamp)` order
//! - Subscribers register typed handlers per event kind; a base kind also
//!   receives every derived kind
//! - Handlers may raise further events, which cascade within the same
//!   `process()` call up to a fixed depth

mod bus;
mod event;

pub use self::bus::{BusError, EventBus, EventSender, ProcessReport, SubscriberId};
pub use self::event::{Event, EventHeader, EventKind, Kind, Priority};
