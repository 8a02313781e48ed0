//! In-process event bus
//!
//! One bus is constructed at the composition root and handed to every
//! producer and consumer. Delivery is synchronous and follows registration
//! order. Handlers registered during an emit do not see that emit, and nothing
//! is buffered for late subscribers.
//!
//! A panicking handler is caught and logged; the remaining handlers still run.

use parking_lot::Mutex;
use roster_core::{AppEvent, EventName};
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{trace, warn};

type Handler = Arc<dyn Fn(&AppEvent) + Send + Sync>;

/// Identifies one registration on an [`EventBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Registration {
    id: SubscriptionId,
    topic: Option<EventName>,
    handler: Handler,
}

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    registrations: Mutex<Vec<Registration>>,
}

impl BusInner {
    fn remove(&self, id: SubscriptionId) -> bool {
        let mut registrations = self.registrations.lock();
        let before = registrations.len();
        registrations.retain(|r| r.id != id);
        registrations.len() != before
    }
}

/// Synchronous publish/subscribe channel for [`AppEvent`]s.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Create a bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every event.
    pub fn on<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&AppEvent) + Send + Sync + 'static,
    {
        self.register(None, Arc::new(handler))
    }

    /// Register `handler` for events named `topic` only.
    pub fn on_topic<F>(&self, topic: EventName, handler: F) -> Subscription
    where
        F: Fn(&AppEvent) + Send + Sync + 'static,
    {
        self.register(Some(topic), Arc::new(handler))
    }

    /// Remove a registration. Returns `false` if it was already gone.
    pub fn off(&self, id: SubscriptionId) -> bool {
        self.inner.remove(id)
    }

    /// Deliver `event` to every handler registered right now, in registration order.
    ///
    /// Returns the number of handlers that completed without panicking.
    pub fn emit(&self, event: AppEvent) -> usize {
        let name = event.name();
        let handlers: Vec<(SubscriptionId, Handler)> = self
            .inner
            .registrations
            .lock()
            .iter()
            .filter(|r| r.topic.map_or(true, |topic| topic == name))
            .map(|r| (r.id, Arc::clone(&r.handler)))
            .collect();

        trace!(event = %name, handlers = handlers.len(), "emit");
        let mut delivered = 0;
        for (id, handler) in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                Ok(()) => delivered += 1,
                Err(payload) => warn!(
                    event = %name,
                    subscription = id.0,
                    panic = panic_message(payload.as_ref()),
                    "event handler panicked"
                ),
            }
        }
        delivered
    }

    /// Number of live registrations.
    pub fn handler_count(&self) -> usize {
        self.inner.registrations.lock().len()
    }

    fn register(&self, topic: Option<EventName>, handler: Handler) -> Subscription {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.registrations.lock().push(Registration { id, topic, handler });
        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.handler_count())
            .finish()
    }
}

/// Disposer returned by [`EventBus::on`].
///
/// Dropping it leaves the handler registered; call [`Subscription::unsubscribe`]
/// (or [`EventBus::off`] with its id) to remove it.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    bus: Weak<BusInner>,
}

impl Subscription {
    /// Registration id, usable with [`EventBus::off`].
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove the handler. Returns `false` if it was already removed or the bus is gone.
    pub fn unsubscribe(self) -> bool {
        self.bus.upgrade().is_some_and(|bus| bus.remove(self.id))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_core::ActiveRoleContext;

    fn switched() -> AppEvent {
        AppEvent::RoleSwitched(ActiveRoleContext::new("UnitLeader", Some("B".into())))
    }

    fn log() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> Handler) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let shared = Arc::clone(&log);
        let make = move |tag: &'static str| -> Handler {
            let log = Arc::clone(&shared);
            Arc::new(move |_: &AppEvent| log.lock().push(tag))
        };
        (log, make)
    }

    #[test]
    fn delivers_in_registration_order() {
        let bus = EventBus::new();
        let (log, make) = log();
        for tag in ["a", "b", "c"] {
            let handler = make(tag);
            bus.on(move |e| handler(e));
        }

        assert_eq!(bus.emit(AppEvent::AuthCleared), 3);
        assert_eq!(*log.lock(), vec!["a", "b", "c"]);
    }

    #[test]
    fn topic_handlers_only_see_their_topic() {
        let bus = EventBus::new();
        let (log, make) = log();
        let handler = make("switched");
        bus.on_topic(EventName::RoleSwitched, move |e| handler(e));

        bus.emit(AppEvent::AuthCleared);
        bus.emit(switched());

        assert_eq!(*log.lock(), vec!["switched"]);
    }

    #[test]
    fn unsubscribe_and_off_remove_handlers() {
        let bus = EventBus::new();
        let first = bus.on(|_| {});
        let second = bus.on(|_| {});
        assert_eq!(bus.handler_count(), 2);

        assert!(first.unsubscribe());
        assert!(bus.off(second.id()));
        assert!(!bus.off(second.id()));
        assert!(!second.unsubscribe());
        assert_eq!(bus.emit(AppEvent::AuthCleared), 0);
    }

    #[test]
    fn handler_registered_during_emit_misses_that_emit() {
        let bus = EventBus::new();
        let (log, make) = log();
        let late = make("late");
        let registrar = bus.clone();
        bus.on(move |_| {
            let late = Arc::clone(&late);
            registrar.on(move |e| late(e));
        });

        bus.emit(AppEvent::AuthCleared);
        assert!(log.lock().is_empty());
        assert_eq!(bus.handler_count(), 2);
    }

    #[test]
    fn unsubscribe_after_bus_dropped_is_a_no_op() {
        let bus = EventBus::new();
        let subscription = bus.on(|_| {});
        drop(bus);
        assert!(!subscription.unsubscribe());
    }
}
