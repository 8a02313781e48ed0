//! Event recorder for bus ordering assertions.

use parking_lot::Mutex;
use roster_core::{AppEvent, EventName};
use std::sync::Arc;

/// Collects every event delivered to its handler.
///
/// Register [`EventRecorder::handler`] on a bus; clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<AppEvent>>>,
}

impl EventRecorder {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bus handler appending to this recorder.
    pub fn handler(&self) -> impl Fn(&AppEvent) + Send + Sync + 'static {
        let events = Arc::clone(&self.events);
        move |event: &AppEvent| events.lock().push(event.clone())
    }

    /// Recorded events, in delivery order.
    pub fn events(&self) -> Vec<AppEvent> {
        self.events.lock().clone()
    }

    /// Names of recorded events, in delivery order.
    pub fn names(&self) -> Vec<EventName> {
        self.events.lock().iter().map(AppEvent::name).collect()
    }

    /// Number of recorded events named `name`.
    pub fn count(&self, name: EventName) -> usize {
        self.events.lock().iter().filter(|e| e.name() == name).count()
    }

    /// Most recent event.
    pub fn last(&self) -> Option<AppEvent> {
        self.events.lock().last().cloned()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_one_log() {
        let recorder = EventRecorder::new();
        let handler = recorder.clone().handler();

        handler(&AppEvent::AuthCleared);
        handler(&AppEvent::AuthCleared);

        assert_eq!(recorder.count(EventName::AuthCleared), 2);
        assert_eq!(recorder.names(), vec![EventName::AuthCleared; 2]);
        recorder.clear();
        assert!(recorder.events().is_empty());
    }
}
