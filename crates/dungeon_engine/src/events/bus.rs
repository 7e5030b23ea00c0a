//! Priority-ordered event bus
//!
//! Events are raised into a pending buffer and dispatched later, in batches,
//! by [`EventBus::process`]. Each batch is sorted by `(priority, timestamp)`
//! and delivered against a snapshot of the subscriber table. Events raised by
//! handlers land in the next batch of the same `process()` call, up to the
//! configured depth limit; whatever is still pending after that is dropped.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use slotmap::SlotMap;

use super::event::{Event, EventKind, Kind};
use crate::core::config::{EventConfig, DEFAULT_DEPTH_LIMIT};

slotmap::new_key_type! {
    /// Identity of a subscriber on one bus
    pub struct SubscriberId;
}

/// The event did not provide the view its kind list promised
struct ViewMismatch;

type Handler = dyn FnMut(&mut EventBus, &dyn Event, EventKind) -> Result<(), ViewMismatch>;
type HandlerRef = Rc<RefCell<Handler>>;
type PendingQueue = Arc<Mutex<Vec<Box<dyn Event>>>>;

fn lock(queue: &PendingQueue) -> MutexGuard<'_, Vec<Box<dyn Event>>> {
    queue.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone)]
struct Subscription {
    subscriber: SubscriberId,
    handler: HandlerRef,
}

#[derive(Clone)]
struct KindEntry {
    kind: EventKind,
    subscriptions: Vec<Subscription>,
}

/// Registration errors
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// No kind with this name has been declared on the bus
    #[error("Not a recognized event kind: {0}")]
    InvalidKind(String),

    /// The subscriber was never allocated or has been released
    #[error("Unknown subscriber: {0:?}")]
    UnknownSubscriber(SubscriberId),
}

/// Outcome of one [`EventBus::process`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessReport {
    /// Dispatch passes run
    pub passes: usize,
    /// Handler invocations that completed
    pub dispatched: usize,
    /// Handler invocations, or events, that panicked
    pub failed: usize,
    /// Pairings skipped because the event could not provide the subscribed view
    pub skipped: usize,
    /// Events discarded after the depth limit was reached
    pub dropped: usize,
}

impl std::ops::AddAssign for ProcessReport {
    fn add_assign(&mut self, other: Self) {
        self.passes += other.passes;
        self.dispatched += other.dispatched;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.dropped += other.dropped;
    }
}

/// Cloneable, thread-safe handle for raising events onto a bus
///
/// This is the only part of the bus that may cross threads; dispatch itself
/// stays on the thread that owns the [`EventBus`].
#[derive(Clone)]
pub struct EventSender {
    pending: PendingQueue,
}

impl EventSender {
    /// Append an event to the bus's pending buffer
    pub fn raise<E: Event>(&self, event: E) {
        self.raise_boxed(Box::new(event));
    }

    /// Append an already boxed event
    pub fn raise_boxed(&self, event: Box<dyn Event>) {
        lock(&self.pending).push(event);
    }
}

impl fmt::Debug for EventSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSender")
            .field("pending", &lock(&self.pending).len())
            .finish()
    }
}

/// Single-threaded publish/dispatch bus
pub struct EventBus {
    pending: PendingQueue,
    registry: Vec<KindEntry>,
    catalog: HashMap<&'static str, EventKind>,
    subscribers: SlotMap<SubscriberId, String>,
    depth_limit: usize,
    dispatching: bool,
}

impl EventBus {
    /// Create a bus with the default depth limit
    pub fn new() -> Self {
        Self::with_depth_limit(DEFAULT_DEPTH_LIMIT)
    }

    /// Create a bus allowing at most `depth_limit` passes per `process()` call
    pub fn with_depth_limit(depth_limit: usize) -> Self {
        Self {
            pending: Arc::new(Mutex::new(Vec::new())),
            registry: Vec::new(),
            catalog: HashMap::new(),
            subscribers: SlotMap::with_key(),
            depth_limit: depth_limit.max(1),
            dispatching: false,
        }
    }

    /// Create a bus from engine configuration
    pub fn from_config(config: &EventConfig) -> Self {
        Self::with_depth_limit(config.depth_limit)
    }

    /// Maximum passes per `process()` call
    pub fn depth_limit(&self) -> usize {
        self.depth_limit
    }

    /// Allocate a new subscriber identity; `label` is used in log lines
    pub fn subscriber(&mut self, label: impl Into<String>) -> SubscriberId {
        self.subscribers.insert(label.into())
    }

    /// Label a subscriber was created with
    pub fn label(&self, subscriber: SubscriberId) -> Option<&str> {
        self.subscribers.get(subscriber).map(String::as_str)
    }

    /// Unregister every kind for `subscriber` and forget the identity
    pub fn release(&mut self, subscriber: SubscriberId) -> bool {
        self.unregister_all(subscriber);
        self.subscribers.remove(subscriber).is_some()
    }

    /// Make kind `K` known for registration by name
    pub fn declare<K: Kind>(&mut self) -> EventKind {
        let kind = EventKind::of::<K>();
        let known = *self.catalog.entry(K::NAME).or_insert(kind);
        if known != kind {
            log::warn!("Event kind name '{}' is already taken by another type", K::NAME);
        }
        kind
    }

    /// Look up a declared kind by name
    pub fn kind_named(&self, name: &str) -> Option<EventKind> {
        self.catalog.get(name).copied()
    }

    /// Register a typed handler for kind `K`
    ///
    /// The handler receives every event that is, or derives from, `K`.
    /// Returns `Ok(false)` without replacing anything when the subscriber is
    /// already registered for `K`.
    pub fn register<K, F>(&mut self, subscriber: SubscriberId, mut handler: F) -> Result<bool, BusError>
    where
        K: Kind,
        F: FnMut(&mut EventBus, &K) + 'static,
    {
        let kind = self.declare::<K>();
        let handler: HandlerRef = Rc::new(RefCell::new(
            move |bus: &mut EventBus, event: &dyn Event, kind: EventKind| -> Result<(), ViewMismatch> {
                let Some(view) = event.view(kind).and_then(|view| view.downcast_ref::<K>()) else {
                    return Err(ViewMismatch);
                };
                handler(bus, view);
                Ok(())
            },
        ));
        self.insert(subscriber, kind, handler)
    }

    /// Register an untyped handler for a kind declared under `name`
    pub fn register_named<F>(&mut self, subscriber: SubscriberId, name: &str, mut handler: F) -> Result<bool, BusError>
    where
        F: FnMut(&mut EventBus, &dyn Event) + 'static,
    {
        let kind = self
            .kind_named(name)
            .ok_or_else(|| BusError::InvalidKind(name.to_string()))?;
        let handler: HandlerRef = Rc::new(RefCell::new(
            move |bus: &mut EventBus, event: &dyn Event, _kind: EventKind| -> Result<(), ViewMismatch> {
                handler(bus, event);
                Ok(())
            },
        ));
        self.insert(subscriber, kind, handler)
    }

    fn insert(&mut self, subscriber: SubscriberId, kind: EventKind, handler: HandlerRef) -> Result<bool, BusError> {
        let Some(label) = self.subscribers.get(subscriber) else {
            return Err(BusError::UnknownSubscriber(subscriber));
        };

        let index = match self.registry.iter().position(|entry| entry.kind == kind) {
            Some(index) => index,
            None => {
                self.registry.push(KindEntry {
                    kind,
                    subscriptions: Vec::new(),
                });
                self.registry.len() - 1
            }
        };

        let entry = &mut self.registry[index];
        if entry.subscriptions.iter().any(|sub| sub.subscriber == subscriber) {
            log::trace!("{label} already registered for {kind}");
            return Ok(false);
        }

        entry.subscriptions.push(Subscription { subscriber, handler });
        log::debug!("{label} registered for {kind}");
        Ok(true)
    }

    /// Remove the subscriber's registration for kind `K` only
    pub fn unregister<K: Kind>(&mut self, subscriber: SubscriberId) -> bool {
        self.remove(subscriber, EventKind::of::<K>())
    }

    /// Remove the subscriber's registration for the kind declared under `name`
    pub fn unregister_named(&mut self, subscriber: SubscriberId, name: &str) -> bool {
        self.kind_named(name)
            .is_some_and(|kind| self.remove(subscriber, kind))
    }

    /// Remove the subscriber from every kind, returning how many registrations went away
    pub fn unregister_all(&mut self, subscriber: SubscriberId) -> usize {
        let mut removed = 0;
        for entry in &mut self.registry {
            let before = entry.subscriptions.len();
            entry.subscriptions.retain(|sub| sub.subscriber != subscriber);
            removed += before - entry.subscriptions.len();
        }
        self.registry.retain(|entry| !entry.subscriptions.is_empty());
        removed
    }

    fn remove(&mut self, subscriber: SubscriberId, kind: EventKind) -> bool {
        let Some(index) = self.registry.iter().position(|entry| entry.kind == kind) else {
            return false;
        };

        let entry = &mut self.registry[index];
        let before = entry.subscriptions.len();
        entry.subscriptions.retain(|sub| sub.subscriber != subscriber);
        let removed = entry.subscriptions.len() != before;

        if entry.subscriptions.is_empty() {
            self.registry.remove(index);
        }
        removed
    }

    /// Whether `subscriber` currently has a registration for kind `K`
    pub fn is_registered<K: Kind>(&self, subscriber: SubscriberId) -> bool {
        let kind = EventKind::of::<K>();
        self.registry
            .iter()
            .filter(|entry| entry.kind == kind)
            .any(|entry| entry.subscriptions.iter().any(|sub| sub.subscriber == subscriber))
    }

    /// Number of kinds `subscriber` is registered for
    pub fn subscription_count(&self, subscriber: SubscriberId) -> usize {
        self.registry
            .iter()
            .filter(|entry| entry.subscriptions.iter().any(|sub| sub.subscriber == subscriber))
            .count()
    }

    /// Queue an event for the next `process()` call
    pub fn raise<E: Event>(&self, event: E) {
        self.raise_boxed(Box::new(event));
    }

    /// Queue an already boxed event
    pub fn raise_boxed(&self, event: Box<dyn Event>) {
        lock(&self.pending).push(event);
    }

    /// Handle for raising events from other threads
    pub fn sender(&self) -> EventSender {
        EventSender {
            pending: Arc::clone(&self.pending),
        }
    }

    /// Number of raised but undispatched events
    pub fn pending_len(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Dispatch everything pending, including events raised while dispatching
    pub fn process(&mut self) -> ProcessReport {
        let mut report = ProcessReport::default();

        if self.dispatching {
            log::warn!("EventBus::process called from inside a handler; ignoring nested call");
            return report;
        }
        if lock(&self.pending).is_empty() {
            return report;
        }

        self.dispatching = true;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run_passes(&mut report)));
        self.dispatching = false;
        if let Err(payload) = outcome {
            panic::resume_unwind(payload);
        }

        log::trace!("Processed events: {report:?}");
        report
    }

    fn run_passes(&mut self, report: &mut ProcessReport) {
        loop {
            let batch = std::mem::take(&mut *lock(&self.pending));
            let batch = Self::order(batch, report);
            report.passes += 1;

            let snapshot = self.registry.clone();
            for event in &batch {
                self.dispatch(event.as_ref(), &snapshot, report);
            }

            if lock(&self.pending).is_empty() {
                break;
            }
            if report.passes >= self.depth_limit {
                let leftover = std::mem::take(&mut *lock(&self.pending));
                report.dropped = leftover.len();
                log::warn!(
                    "Event cascade reached depth limit of {}, dropping {} pending event(s)",
                    self.depth_limit,
                    report.dropped
                );
                break;
            }
        }
    }

    /// Stable sort by `(priority, timestamp)`; events whose header panics are discarded
    fn order(batch: Vec<Box<dyn Event>>, report: &mut ProcessReport) -> Vec<Box<dyn Event>> {
        let mut keyed: Vec<_> = batch
            .into_iter()
            .filter_map(|event| match panic::catch_unwind(AssertUnwindSafe(|| event.header().sort_key())) {
                Ok(key) => Some((key, event)),
                Err(payload) => {
                    report.failed += 1;
                    log::error!("Discarding event whose header panicked: {}", panic_message(payload.as_ref()));
                    None
                }
            })
            .collect();
        keyed.sort_by_key(|(key, _)| *key);
        keyed.into_iter().map(|(_, event)| event).collect()
    }

    fn dispatch(&mut self, event: &dyn Event, snapshot: &[KindEntry], report: &mut ProcessReport) {
        let kinds = match panic::catch_unwind(AssertUnwindSafe(|| event.kinds())) {
            Ok(kinds) => kinds,
            Err(payload) => {
                report.failed += 1;
                log::error!("Discarding event whose kind list panicked: {}", panic_message(payload.as_ref()));
                return;
            }
        };
        let event_name = kinds.first().map_or("<unnamed>", EventKind::name);

        for entry in snapshot.iter().filter(|entry| kinds.contains(&entry.kind)) {
            for subscription in &entry.subscriptions {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    (&mut *subscription.handler.borrow_mut())(self, event, entry.kind)
                }));

                match outcome {
                    Ok(Ok(())) => report.dispatched += 1,
                    Ok(Err(ViewMismatch)) => {
                        report.skipped += 1;
                        log::warn!(
                            "Tried to pass {} to {} as {}, but the event has no such view",
                            event_name,
                            self.label(subscription.subscriber).unwrap_or("<released>"),
                            entry.kind
                        );
                    }
                    Err(payload) => {
                        report.failed += 1;
                        log::error!(
                            "Handler of {} for {} panicked: {}",
                            self.label(subscription.subscriber).unwrap_or("<released>"),
                            event_name,
                            panic_message(payload.as_ref())
                        );
                    }
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("pending", &self.pending_len())
            .field("kinds", &self.registry.iter().map(|entry| entry.kind).collect::<Vec<_>>())
            .field("subscribers", &self.subscribers.len())
            .field("depth_limit", &self.depth_limit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event::{EventHeader, Priority};
    use crate::input::{KeyEvent, KeyPressEvent, KeyReleaseEvent, KeyRepeatEvent, Modifiers};
    use std::any::Any;

    #[derive(Debug)]
    struct Ping {
        header: EventHeader,
        tag: &'static str,
    }

    impl Ping {
        fn new(tag: &'static str) -> Self {
            Self::with_priority(tag, Priority::LOWEST)
        }

        fn with_priority(tag: &'static str, priority: Priority) -> Self {
            Self {
                header: EventHeader::with_priority(priority),
                tag,
            }
        }
    }

    impl Kind for Ping {
        const NAME: &'static str = "test.ping";
    }

    impl Event for Ping {
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

    #[derive(Debug)]
    struct Pong {
        header: EventHeader,
    }

    impl Kind for Pong {
        const NAME: &'static str = "test.pong";
    }

    impl Event for Pong {
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

    /// Claims to be a Ping but cannot produce one
    #[derive(Debug)]
    struct Impostor {
        header: EventHeader,
    }

    impl Event for Impostor {
        fn header(&self) -> &EventHeader {
            &self.header
        }

        fn kinds(&self) -> Vec<EventKind> {
            vec![EventKind::of::<Ping>()]
        }

        fn view(&self, _kind: EventKind) -> Option<&dyn Any> {
            None
        }
    }

    type Log = Rc<RefCell<Vec<String>>>;

    fn record_pings(bus: &mut EventBus, label: &str, log: &Log) -> SubscriberId {
        let id = bus.subscriber(label);
        let log = Rc::clone(log);
        let label = label.to_string();
        bus.register::<Ping, _>(id, move |_, ping| {
            log.borrow_mut().push(format!("{label}:{}", ping.tag));
        })
        .expect("fresh subscriber");
        id
    }

    fn entries(log: &Log) -> Vec<String> {
        log.borrow().clone()
    }

    #[test]
    fn test_empty_process_is_noop() {
        let mut bus = EventBus::new();
        assert_eq!(bus.process(), ProcessReport::default());
    }

    #[test]
    fn test_more_urgent_event_dispatches_first() {
        let mut bus = EventBus::new();
        let log = Log::default();
        record_pings(&mut bus, "a", &log);

        bus.raise(Ping::with_priority("routine", Priority::new(7)));
        bus.raise(Ping::with_priority("urgent", Priority::new(1)));
        bus.raise(Ping::with_priority("lowest", Priority::LOWEST));
        let report = bus.process();

        assert_eq!(entries(&log), vec!["a:urgent", "a:routine", "a:lowest"]);
        assert_eq!(report.passes, 1);
        assert_eq!(report.dispatched, 3);
    }

    #[test]
    fn test_equal_priority_keeps_raise_order() {
        let mut bus = EventBus::new();
        let log = Log::default();
        record_pings(&mut bus, "a", &log);

        for tag in ["one", "two", "three", "four"] {
            bus.raise(Ping::with_priority(tag, Priority::new(5)));
        }
        bus.process();

        assert_eq!(entries(&log), vec!["a:one", "a:two", "a:three", "a:four"]);
    }

    #[test]
    fn test_duplicate_registration_is_noop() {
        let mut bus = EventBus::new();
        let log = Log::default();
        let id = record_pings(&mut bus, "a", &log);

        let again = bus.register::<Ping, _>(id, |_, _| panic!("replacement handler must not be installed"));
        assert_eq!(again, Ok(false));

        bus.raise(Ping::new("x"));
        let report = bus.process();

        assert_eq!(entries(&log), vec!["a:x"]);
        assert_eq!(report.dispatched, 1);
        assert_eq!(report.failed, 0);
    }

    #[test]
    fn test_unregister_one_kind_keeps_others() {
        let mut bus = EventBus::new();
        let log = Log::default();
        let id = record_pings(&mut bus, "a", &log);
        let pongs = Rc::clone(&log);
        bus.register::<Pong, _>(id, move |_, _| pongs.borrow_mut().push("a:pong".into()))
            .expect("registered");
        assert_eq!(bus.subscription_count(id), 2);

        assert!(bus.unregister::<Ping>(id));
        assert!(!bus.unregister::<Ping>(id));
        bus.raise(Ping::new("x"));
        bus.raise(Pong { header: EventHeader::new() });
        bus.process();

        assert_eq!(entries(&log), vec!["a:pong"]);
        assert!(!bus.is_registered::<Ping>(id));
        assert!(bus.is_registered::<Pong>(id));
    }

    #[test]
    fn test_unregister_all_silences_subscriber() {
        let mut bus = EventBus::new();
        let log = Log::default();
        let id = record_pings(&mut bus, "a", &log);
        let pongs = Rc::clone(&log);
        bus.register::<Pong, _>(id, move |_, _| pongs.borrow_mut().push("a:pong".into()))
            .expect("registered");
        record_pings(&mut bus, "b", &log);

        assert_eq!(bus.unregister_all(id), 2);
        assert_eq!(bus.unregister_all(id), 0);
        bus.raise(Ping::new("x"));
        bus.raise(Pong { header: EventHeader::new() });
        bus.process();

        assert_eq!(entries(&log), vec!["b:x"]);
        assert_eq!(bus.subscription_count(id), 0);
    }

    #[test]
    fn test_base_kind_receives_derived_kinds() {
        let mut bus = EventBus::new();
        let log = Log::default();

        let any_key = bus.subscriber("any-key");
        let keys = Rc::clone(&log);
        bus.register::<KeyEvent, _>(any_key, move |_, key| keys.borrow_mut().push(format!("key:{}", key.key())))
            .expect("registered");

        let presses = bus.subscriber("presses");
        let pressed = Rc::clone(&log);
        bus.register::<KeyPressEvent, _>(presses, move |_, press| {
            pressed.borrow_mut().push(format!("press:{}", press.as_key().key()));
        })
        .expect("registered");

        bus.raise(KeyPressEvent::new(65, 30, Modifiers::empty()));
        bus.raise(KeyRepeatEvent::new(66, 48, Modifiers::SHIFT));
        bus.raise(KeyReleaseEvent::new(67, 46, Modifiers::empty()));
        bus.process();

        let seen = entries(&log);
        assert_eq!(seen.iter().filter(|entry| entry.starts_with("key:")).count(), 3);
        assert_eq!(seen.iter().filter(|entry| entry.starts_with("press:")).count(), 1);
        assert!(seen.contains(&"press:65".to_string()));
        assert!(seen.contains(&"key:67".to_string()));
    }

    #[test]
    fn test_handler_raised_event_dispatches_in_same_process() {
        let mut bus = EventBus::new();
        let log = Log::default();

        let relay = bus.subscriber("relay");
        bus.register::<Ping, _>(relay, |bus, _| bus.raise(Pong { header: EventHeader::new() }))
            .expect("registered");
        let sink = bus.subscriber("sink");
        let pongs = Rc::clone(&log);
        bus.register::<Pong, _>(sink, move |_, _| pongs.borrow_mut().push("pong".into()))
            .expect("registered");

        bus.raise(Ping::new("start"));
        let report = bus.process();

        assert_eq!(entries(&log), vec!["pong"]);
        assert_eq!(report.passes, 2);
        assert_eq!(report.dropped, 0);
        assert_eq!(bus.pending_len(), 0);
    }

    #[test]
    fn test_cascade_waits_for_next_pass_even_when_urgent() {
        let mut bus = EventBus::new();
        let log = Log::default();
        record_pings(&mut bus, "a", &log);

        let escalate = bus.subscriber("escalate");
        bus.register::<Ping, _>(escalate, |bus, ping| {
            if ping.tag == "first" {
                bus.raise(Ping::with_priority("urgent", Priority::HIGHEST));
            }
        })
        .expect("registered");

        bus.raise(Ping::with_priority("first", Priority::new(2)));
        bus.raise(Ping::with_priority("second", Priority::new(9)));
        bus.process();

        assert_eq!(entries(&log), vec!["a:first", "a:second", "a:urgent"]);
    }

    #[test]
    fn test_depth_limit_drops_runaway_cascade() {
        let mut bus = EventBus::with_depth_limit(3);
        let count = Rc::new(RefCell::new(0));

        let echo = bus.subscriber("echo");
        let seen = Rc::clone(&count);
        bus.register::<Ping, _>(echo, move |bus, _| {
            *seen.borrow_mut() += 1;
            bus.raise(Ping::new("again"));
        })
        .expect("registered");

        bus.raise(Ping::new("start"));
        let report = bus.process();

        assert_eq!(*count.borrow(), 3);
        assert_eq!(report.passes, 3);
        assert_eq!(report.dropped, 1);
        assert_eq!(bus.pending_len(), 0);
        assert_eq!(bus.process(), ProcessReport::default());
    }

    #[test]
    fn test_panicking_handler_does_not_abort_pass() {
        let mut bus = EventBus::new();
        let log = Log::default();

        let faulty = bus.subscriber("faulty");
        bus.register::<Ping, _>(faulty, |_, ping| {
            if ping.tag == "boom" {
                panic!("handler failure");
            }
        })
        .expect("registered");
        record_pings(&mut bus, "steady", &log);

        bus.raise(Ping::new("boom"));
        bus.raise(Ping::new("calm"));
        let report = bus.process();

        assert_eq!(entries(&log), vec!["steady:boom", "steady:calm"]);
        assert_eq!(report.failed, 1);
        assert_eq!(report.dispatched, 3);
    }

    #[test]
    fn test_missing_view_skips_only_that_pairing() {
        let mut bus = EventBus::new();
        let log = Log::default();
        record_pings(&mut bus, "a", &log);

        bus.raise(Impostor { header: EventHeader::new() });
        bus.raise(Ping::new("real"));
        let report = bus.process();

        assert_eq!(entries(&log), vec!["a:real"]);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.dispatched, 1);
    }

    #[test]
    fn test_named_registration_requires_declared_kind() {
        let mut bus = EventBus::new();
        let id = bus.subscriber("tracer");

        let result = bus.register_named(id, "test.ping", |_, _| {});
        assert_eq!(result, Err(BusError::InvalidKind("test.ping".to_string())));

        bus.declare::<Ping>();
        let priorities = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&priorities);
        assert_eq!(
            bus.register_named(id, "test.ping", move |_, event| sink.borrow_mut().push(event.priority())),
            Ok(true)
        );

        bus.raise(Ping::with_priority("x", Priority::new(3)));
        bus.process();
        assert_eq!(*priorities.borrow(), vec![Priority::new(3)]);

        assert!(bus.unregister_named(id, "test.ping"));
        assert!(!bus.unregister_named(id, "test.unknown"));
    }

    #[test]
    fn test_registration_mid_pass_waits_for_next_pass() {
        let mut bus = EventBus::new();
        let log = Log::default();

        let recruiter = bus.subscriber("recruiter");
        let recruits = Rc::clone(&log);
        bus.register::<Ping, _>(recruiter, move |bus, ping| {
            if ping.tag == "first" {
                let late = bus.subscriber("late");
                let sink = Rc::clone(&recruits);
                bus.register::<Ping, _>(late, move |_, ping| sink.borrow_mut().push(format!("late:{}", ping.tag)))
                    .expect("registered");
            }
        })
        .expect("registered");

        bus.raise(Ping::new("first"));
        bus.raise(Ping::new("second"));
        bus.process();
        assert!(entries(&log).is_empty());

        bus.raise(Ping::new("third"));
        bus.process();
        assert_eq!(entries(&log), vec!["late:third"]);
    }

    #[test]
    fn test_release_mid_pass_waits_for_next_pass() {
        let mut bus = EventBus::new();
        let log = Log::default();
        let reaper = bus.subscriber("reaper");
        let doomed = bus.subscriber("doomed");

        // Registered ahead of the doomed subscriber so the release lands before its delivery
        bus.register::<Ping, _>(reaper, move |bus, ping| {
            if ping.tag == "first" {
                bus.release(doomed);
            }
        })
        .expect("registered");
        let seen = Rc::clone(&log);
        bus.register::<Ping, _>(doomed, move |_, ping| {
            seen.borrow_mut().push(format!("doomed:{}", ping.tag));
        })
        .expect("registered");

        bus.raise(Ping::new("first"));
        bus.raise(Ping::new("second"));
        bus.process();
        assert_eq!(entries(&log), vec!["doomed:first", "doomed:second"]);
        assert_eq!(bus.subscription_count(doomed), 0);
        assert_eq!(bus.label(doomed), None);

        bus.raise(Ping::new("third"));
        bus.process();
        assert_eq!(entries(&log), vec!["doomed:first", "doomed:second"]);
    }

    /// Event whose own accessors blow up
    #[derive(Debug)]
    struct Faulty {
        header: EventHeader,
        broken_header: bool,
    }

    impl Event for Faulty {
        fn header(&self) -> &EventHeader {
            assert!(!self.broken_header, "header unavailable");
            &self.header
        }

        fn kinds(&self) -> Vec<EventKind> {
            panic!("kind list unavailable");
        }

        fn view(&self, _kind: EventKind) -> Option<&dyn Any> {
            None
        }
    }

    #[test]
    fn test_faulty_event_does_not_wedge_bus() {
        let mut bus = EventBus::new();
        let log = Log::default();
        record_pings(&mut bus, "steady", &log);

        bus.raise(Faulty { header: EventHeader::new(), broken_header: false });
        bus.raise(Faulty { header: EventHeader::new(), broken_header: true });
        bus.raise(Ping::new("same batch"));
        let report = bus.process();
        assert_eq!(report.failed, 2);
        assert_eq!(report.dispatched, 1);

        bus.raise(Ping::new("later"));
        let report = bus.process();
        assert_eq!(report.passes, 1);
        assert_eq!(report.dispatched, 1);
        assert_eq!(entries(&log), vec!["steady:same batch", "steady:later"]);
    }

    #[test]
    fn test_released_subscriber_cannot_register() {
        let mut bus = EventBus::new();
        let id = bus.subscriber("gone");
        assert!(bus.release(id));
        assert!(!bus.release(id));
        assert_eq!(
            bus.register::<Ping, _>(id, |_, _| {}),
            Err(BusError::UnknownSubscriber(id))
        );
    }

    #[test]
    fn test_nested_process_is_refused() {
        let mut bus = EventBus::new();
        let nested = Rc::new(RefCell::new(None));

        let id = bus.subscriber("reentrant");
        let slot = Rc::clone(&nested);
        bus.register::<Ping, _>(id, move |bus, _| {
            bus.raise(Pong { header: EventHeader::new() });
            *slot.borrow_mut() = Some(bus.process());
        })
        .expect("registered");

        bus.raise(Ping::new("x"));
        let report = bus.process();

        assert_eq!(*nested.borrow(), Some(ProcessReport::default()));
        assert_eq!(report.passes, 2);
        assert_eq!(bus.pending_len(), 0);
    }

    #[test]
    fn test_sender_raises_from_another_thread() {
        let mut bus = EventBus::new();
        let log = Log::default();
        record_pings(&mut bus, "a", &log);

        let sender = bus.sender();
        std::thread::spawn(move || {
            sender.raise(Ping::new("remote"));
        })
        .join()
        .expect("sender thread panicked");

        assert_eq!(bus.pending_len(), 1);
        bus.process();
        assert_eq!(entries(&log), vec!["a:remote"]);
    }
}
