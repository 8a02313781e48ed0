//! Composition root.

use roster_core::effects::{AuthGatewayEffects, PhysicalTimeEffects, SessionStoreEffects};
use roster_core::{AppEvent, Result, RosterConfig};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::bootstrap::SessionBootstrapper;
use crate::bus::EventBus;
use crate::effects::AppEffects;
use crate::notifications::{Toast, ToastQueue};
use crate::role_switch::RoleSwitchCoordinator;

/// One bus, one session bootstrapper and one role switch coordinator
/// sharing the same effect handlers.
///
/// Dropping the app cancels every timer it owns.
#[derive(Debug)]
pub struct RosterApp {
    config: RosterConfig,
    bus: EventBus,
    session: SessionBootstrapper,
    roles: RoleSwitchCoordinator,
    toasts: ToastQueue,
}

impl RosterApp {
    /// Validate `config` and wire the coordinators.
    pub fn new<S, G, T>(config: RosterConfig, store: S, gateway: G, time: T) -> Result<Self>
    where
        S: SessionStoreEffects + 'static,
        G: AuthGatewayEffects + 'static,
        T: PhysicalTimeEffects + 'static,
    {
        Self::with_effects(config, AppEffects::new(store, gateway, time))
    }

    /// Wire the coordinators over prebuilt effect handles.
    pub fn with_effects(config: RosterConfig, effects: AppEffects) -> Result<Self> {
        config.validate()?;
        let bus = EventBus::new();
        let toasts = ToastQueue::new(config.toast_capacity);
        let session = SessionBootstrapper::new(config.clone(), effects.clone(), bus.clone());
        let roles =
            RoleSwitchCoordinator::new(config.clone(), effects, bus.clone(), toasts.clone());
        Ok(Self {
            config,
            bus,
            session,
            roles,
            toasts,
        })
    }

    /// Validated configuration.
    pub fn config(&self) -> &RosterConfig {
        &self.config
    }

    /// The shared event bus.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Session bootstrapper.
    pub fn session(&self) -> &SessionBootstrapper {
        &self.session
    }

    /// Role switch coordinator.
    pub fn roles(&self) -> &RoleSwitchCoordinator {
        &self.roles
    }

    /// Receive toasts raised from now on.
    pub fn subscribe_toasts(&self) -> broadcast::Receiver<Toast> {
        self.toasts.subscribe()
    }

    /// Hint that event data changed elsewhere; re-broadcast only.
    pub fn notify_events_changed(&self, payload: Value) {
        self.bus.emit(AppEvent::EventsChanged(payload));
    }

    /// Hint that assignment data changed elsewhere; re-broadcast only.
    pub fn notify_assignments_changed(&self, payload: Value) {
        self.bus.emit(AppEvent::AssignmentsChanged(payload));
    }

    /// Cancel the timers of both coordinators.
    pub fn shutdown(&self) {
        debug!("roster app shutting down");
        self.session.shutdown();
        self.roles.shutdown();
    }
}

impl Drop for RosterApp {
    fn drop(&mut self) {
        self.shutdown();
    }
}
