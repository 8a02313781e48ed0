//! Effect handles shared by the coordinators.

use roster_core::effects::{
    AuthGatewayEffects, GatewayError, PhysicalTimeEffects, ProfileResponse, SessionStoreEffects,
};
use roster_core::AuthToken;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::tasks::SessionEpoch;

/// Store, gateway and clock as trait objects.
#[derive(Clone)]
pub struct AppEffects {
    /// Session key/value store.
    pub store: Arc<dyn SessionStoreEffects>,
    /// Remote auth RPCs.
    pub gateway: Arc<dyn AuthGatewayEffects>,
    /// Clock driving every timer.
    pub time: Arc<dyn PhysicalTimeEffects>,
    /// Fence shared by everything writing session keys.
    pub(crate) epoch: Arc<SessionEpoch>,
}

impl AppEffects {
    /// Box concrete handlers.
    pub fn new<S, G, T>(store: S, gateway: G, time: T) -> Self
    where
        S: SessionStoreEffects + 'static,
        G: AuthGatewayEffects + 'static,
        T: PhysicalTimeEffects + 'static,
    {
        Self {
            store: Arc::new(store),
            gateway: Arc::new(gateway),
            time: Arc::new(time),
            epoch: Arc::new(SessionEpoch::default()),
        }
    }

    /// `fetch_profile` bounded by `timeout` on the effect clock.
    pub async fn fetch_profile(
        &self,
        token: &AuthToken,
        timeout: Duration,
    ) -> Result<ProfileResponse, GatewayError> {
        tokio::select! {
            result = self.gateway.fetch_profile(token) => result,
            () = self.time.sleep(timeout) => Err(GatewayError::TimedOut),
        }
    }

    /// `switch_role` bounded by `timeout` on the effect clock.
    pub async fn switch_role(
        &self,
        token: &AuthToken,
        role: &str,
        timeout: Duration,
    ) -> Result<(), GatewayError> {
        tokio::select! {
            result = self.gateway.switch_role(token, role) => result,
            () = self.time.sleep(timeout) => Err(GatewayError::TimedOut),
        }
    }
}

impl fmt::Debug for AppEffects {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppEffects").finish_non_exhaustive()
    }
}
