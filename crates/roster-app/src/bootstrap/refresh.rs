//! Silent profile refresh while `Ready`.

use roster_core::effects::ProfileResponse;
use roster_core::{AppEvent, FailureKind, SessionPhase, SessionStoreExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{Inner, State};
use crate::tasks::FlagGuard;

/// Result of one silent refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Profile re-fetched, cached and broadcast as `profileRefreshed`.
    Refreshed,
    /// Nothing ran: another refresh was in flight, or the session is not an
    /// authenticated `Ready` session.
    Skipped,
    /// The server answered 401; the session is now `Unauthorized`.
    Unauthorized,
    /// Any other failure. Swallowed; the next tick tries again.
    Failed,
}

impl Inner {
    pub(super) fn start_refresh_loop(self: &Arc<Self>, state: &mut State, generation: u64) {
        let weak = Arc::downgrade(self);
        let time = Arc::clone(&self.effects.time);
        let interval = self.config.refresh_interval();
        state.refresh_loop.set(tokio::spawn(async move {
            loop {
                time.sleep(interval).await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                if inner.refresh(generation).await == RefreshOutcome::Unauthorized {
                    break;
                }
                if inner.state.lock().generation != generation {
                    break;
                }
            }
        }));
    }

    pub(super) async fn refresh(&self, generation: u64) -> RefreshOutcome {
        let Some(_in_flight) = FlagGuard::acquire(&self.refresh_in_flight) else {
            debug!("refresh already in flight, skipping");
            return RefreshOutcome::Skipped;
        };
        if !self.refreshable(generation) {
            return RefreshOutcome::Skipped;
        }

        let token = match self.effects.store.load_token().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!("no stored token, skipping refresh");
                return RefreshOutcome::Skipped;
            }
            Err(err) => {
                warn!(error = %err, "silent refresh could not read token");
                return RefreshOutcome::Failed;
            }
        };

        let response = self
            .effects
            .fetch_profile(&token, self.config.fetch_timeout())
            .await;
        if !self.refreshable(generation) {
            debug!("session changed during refresh, discarding result");
            return RefreshOutcome::Skipped;
        }

        match response {
            Ok(ProfileResponse {
                ok: true,
                user: Some(profile),
            }) => {
                {
                    let _writes = self.effects.epoch.lock().await;
                    if !self.refreshable(generation) {
                        debug!("session changed before caching, discarding refresh");
                        return RefreshOutcome::Skipped;
                    }
                    if let Err(err) = self.effects.store.store_profile(&profile).await {
                        warn!(error = %err, "failed to cache refreshed profile");
                    }
                }
                {
                    let mut state = self.state.lock();
                    if !Self::is_refreshable(&state, generation) {
                        return RefreshOutcome::Skipped;
                    }
                    state.session.profile = Some(profile.clone());
                    self.publish(&state);
                }
                self.bus.emit(AppEvent::ProfileRefreshed(profile));
                RefreshOutcome::Refreshed
            }
            Err(err) if err.is_unauthorized() => {
                let mut state = self.state.lock();
                if !Self::is_refreshable(&state, generation) {
                    return RefreshOutcome::Skipped;
                }
                info!("silent refresh rejected with 401");
                state.refresh_loop.cancel();
                state.session.profile = None;
                self.set_phase(&mut state, SessionPhase::Unauthorized);
                RefreshOutcome::Unauthorized
            }
            Err(err) => {
                warn!(
                    failure = %FailureKind::SilentRefreshFailure,
                    error = %err,
                    "silent refresh failed"
                );
                RefreshOutcome::Failed
            }
            Ok(_) => {
                warn!(
                    failure = %FailureKind::SilentRefreshFailure,
                    "silent refresh returned no profile"
                );
                RefreshOutcome::Failed
            }
        }
    }

    fn refreshable(&self, generation: u64) -> bool {
        Self::is_refreshable(&self.state.lock(), generation)
    }

    fn is_refreshable(state: &State, generation: u64) -> bool {
        state.generation == generation
            && state.session.phase == SessionPhase::Ready
            && state.session.profile.is_some()
    }
}
