//! Session bootstrapper
//!
//! Owns the [`Session`] and drives its phase machine:
//!
//! ```text
//! Idle ─start─▶ Loading ─ok─▶ Ready ──(60s silent refresh, 401)──▶ Unauthorized
//!                  │  ▲
//!                  │  └──── retry timer (1.5s, 3s, 5s) / manual_retry
//!                  ├─401 / not ok─▶ Unauthorized
//!                  └─other failure─▶ NetworkError
//! ```
//!
//! Every timer body checks the session generation before acting. The
//! generation moves on manual retry, a new session, sign-out and shutdown,
//! so callbacks that fire after those points are ignored. Profile caching
//! re-checks the generation under the session write fence, so a fetch that
//! lands after a clear never writes into the cleared store.

mod refresh;

pub use refresh::RefreshOutcome;

use parking_lot::Mutex;
use roster_core::{
    classify_fetch, AppEvent, AuthToken, FailureKind, FetchOutcome, RosterConfig, Session,
    SessionPhase, SessionStoreExt, MAX_AUTOMATIC_RETRIES,
};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::bus::{EventBus, Subscription};
use crate::effects::AppEffects;
use crate::errors::BootstrapError;
use crate::tasks::TaskSlot;

/// Establishes, revalidates and clears the authenticated session.
#[derive(Clone)]
pub struct SessionBootstrapper {
    inner: Arc<Inner>,
}

struct Inner {
    config: RosterConfig,
    effects: AppEffects,
    bus: EventBus,
    state: Mutex<State>,
    session_tx: watch::Sender<Session>,
    refresh_in_flight: AtomicBool,
    subscription: Mutex<Option<Subscription>>,
}

#[derive(Default)]
struct State {
    session: Session,
    generation: u64,
    retry_timer: TaskSlot,
    refresh_loop: TaskSlot,
}

impl SessionBootstrapper {
    /// Bootstrapper in `Idle`, publishing on `bus`.
    pub fn new(config: RosterConfig, effects: AppEffects, bus: EventBus) -> Self {
        let (session_tx, _rx) = watch::channel(Session::default());
        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let observer = weak.clone();
            let subscription = bus.on(move |event| {
                if let Some(inner) = observer.upgrade() {
                    inner.observe(event);
                }
            });
            Inner {
                config,
                effects,
                bus: bus.clone(),
                state: Mutex::new(State::default()),
                session_tx,
                refresh_in_flight: AtomicBool::new(false),
                subscription: Mutex::new(Some(subscription)),
            }
        });
        Self { inner }
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.inner.state.lock().session.clone()
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.inner.state.lock().session.phase
    }

    /// Receiver that observes every session change.
    pub fn watch_session(&self) -> watch::Receiver<Session> {
        self.inner.session_tx.subscribe()
    }

    /// Whether an automatic retry is waiting to fire.
    pub fn retry_pending(&self) -> bool {
        self.inner.state.lock().retry_timer.is_scheduled()
    }

    /// Whether the silent refresh loop is running.
    pub fn refresh_active(&self) -> bool {
        self.inner.state.lock().refresh_loop.is_scheduled()
    }

    /// `Idle -> Loading`, then resolve the stored token against the gateway.
    ///
    /// Without a stored token the session becomes `Ready` and anonymous.
    pub async fn start(&self) -> Result<SessionPhase, BootstrapError> {
        let generation = {
            let mut state = self.inner.state.lock();
            self.inner.require_phase(&state, "start", |s| s.phase == SessionPhase::Idle)?;
            self.inner.enter_loading(&mut state)
        };
        Ok(self.inner.load(generation).await)
    }

    /// Persist a freshly issued token and load its profile.
    ///
    /// Allowed from `Idle`, `Unauthorized`, or an anonymous `Ready` session.
    pub async fn begin_session(&self, token: AuthToken) -> Result<SessionPhase, BootstrapError> {
        let accepts = |s: &Session| match s.phase {
            SessionPhase::Idle | SessionPhase::Unauthorized => true,
            SessionPhase::Ready => s.profile.is_none(),
            SessionPhase::Loading | SessionPhase::NetworkError => false,
        };
        self.inner
            .require_phase(&self.inner.state.lock(), "begin_session", accepts)?;
        self.inner.effects.store.store_token(&token).await?;

        let generation = {
            let mut state = self.inner.state.lock();
            self.inner.require_phase(&state, "begin_session", accepts)?;
            state.session.retry_attempt = 0;
            self.inner.enter_loading(&mut state)
        };
        Ok(self.inner.load(generation).await)
    }

    /// Leave `NetworkError` immediately, with a fresh retry budget.
    pub async fn manual_retry(&self) -> Result<SessionPhase, BootstrapError> {
        let generation = {
            let mut state = self.inner.state.lock();
            self.inner.require_phase(&state, "manual_retry", |s| {
                s.phase == SessionPhase::NetworkError
            })?;
            state.session.retry_attempt = 0;
            self.inner.enter_loading(&mut state)
        };
        info!("manual retry");
        Ok(self.inner.load(generation).await)
    }

    /// Drop the credential and cached session, emit `authCleared`, land in `Ready`.
    ///
    /// The in-memory session is reset and the event is emitted even when the
    /// store fails to clear; the store error is still returned.
    pub async fn handle_unauthorized(&self) -> Result<(), BootstrapError> {
        self.inner.clear("unauthorized").await
    }

    /// User-initiated logout. Same effect as [`Self::handle_unauthorized`].
    pub async fn sign_out(&self) -> Result<(), BootstrapError> {
        self.inner.clear("sign-out").await
    }

    /// Run one silent refresh now.
    ///
    /// Overlapping calls are dropped: only one refresh fetch is ever in flight.
    pub async fn refresh_now(&self) -> RefreshOutcome {
        let generation = self.inner.state.lock().generation;
        self.inner.refresh(generation).await
    }

    /// Cancel every timer. The session keeps its current phase.
    pub fn shutdown(&self) {
        self.inner.stop_timers();
    }
}

impl std::fmt::Debug for SessionBootstrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("SessionBootstrapper")
            .field("phase", &state.session.phase)
            .field("generation", &state.generation)
            .finish_non_exhaustive()
    }
}

impl Inner {
    fn require_phase(
        &self,
        state: &State,
        operation: &'static str,
        allowed: impl Fn(&Session) -> bool,
    ) -> Result<(), BootstrapError> {
        if allowed(&state.session) {
            Ok(())
        } else {
            Err(BootstrapError::InvalidPhase {
                operation,
                phase: state.session.phase,
            })
        }
    }

    fn publish(&self, state: &State) {
        self.session_tx.send_replace(state.session.clone());
    }

    fn set_phase(&self, state: &mut State, phase: SessionPhase) {
        if state.session.phase != phase {
            info!(from = %state.session.phase, to = %phase, "session phase");
        }
        state.session.phase = phase;
        self.publish(state);
    }

    /// Start a new generation in `Loading`.
    fn enter_loading(&self, state: &mut State) -> u64 {
        state.generation += 1;
        state.retry_timer.cancel();
        state.refresh_loop.cancel();
        state.session.network_error_detail = None;
        self.set_phase(state, SessionPhase::Loading);
        state.generation
    }

    fn stop_timers(&self) {
        let mut state = self.state.lock();
        state.generation += 1;
        state.retry_timer.cancel();
        state.refresh_loop.cancel();
        debug!(generation = state.generation, "session timers stopped");
    }

    /// Resolve the stored token for a `Loading` session of `generation`.
    async fn load(self: &Arc<Self>, generation: u64) -> SessionPhase {
        let token = match self.effects.store.load_token().await {
            Ok(token) => token,
            Err(err) => {
                warn!(error = %err, "token unreadable, continuing anonymously");
                None
            }
        };

        let Some(token) = token else {
            let mut state = self.state.lock();
            if state.generation == generation {
                state.session.profile = None;
                self.set_phase(&mut state, SessionPhase::Ready);
            }
            return state.session.phase;
        };

        let outcome = classify_fetch(
            self.effects
                .fetch_profile(&token, self.config.fetch_timeout())
                .await,
        );

        match outcome {
            FetchOutcome::Authorized(profile) => {
                {
                    let _writes = self.effects.epoch.lock().await;
                    if self.state.lock().generation != generation {
                        debug!(generation, "session moved on during load, profile discarded");
                        return self.state.lock().session.phase;
                    }
                    if let Err(err) = self.effects.store.store_profile(&profile).await {
                        warn!(error = %err, "failed to cache profile");
                    }
                }
                {
                    let mut state = self.state.lock();
                    if state.generation != generation {
                        return state.session.phase;
                    }
                    state.session.profile = Some(profile.clone());
                    state.session.network_error_detail = None;
                    state.session.retry_attempt = 0;
                    self.set_phase(&mut state, SessionPhase::Ready);
                    self.start_refresh_loop(&mut state, generation);
                }
                self.bus.emit(AppEvent::ProfileLoaded(profile));
                SessionPhase::Ready
            }
            FetchOutcome::Unauthorized => {
                let mut state = self.state.lock();
                if state.generation == generation {
                    info!(failure = %FailureKind::Unauthorized, "profile fetch rejected");
                    state.session.profile = None;
                    state.session.network_error_detail = None;
                    self.set_phase(&mut state, SessionPhase::Unauthorized);
                }
                state.session.phase
            }
            FetchOutcome::NetworkError(detail) => {
                let mut state = self.state.lock();
                if state.generation != generation {
                    return state.session.phase;
                }
                let failure = FailureKind::NetworkError;
                warn!(
                    %failure,
                    transient = failure.is_transient(),
                    %detail,
                    attempt = state.session.retry_attempt,
                    "profile fetch failed"
                );
                state.session.network_error_detail = Some(detail);
                self.set_phase(&mut state, SessionPhase::NetworkError);
                self.schedule_retry(&mut state, generation);
                SessionPhase::NetworkError
            }
        }
    }

    fn schedule_retry(self: &Arc<Self>, state: &mut State, generation: u64) {
        let attempt = state.session.retry_attempt;
        let delay = match self.config.retry_delay(attempt) {
            Some(delay) if attempt < MAX_AUTOMATIC_RETRIES => delay,
            _ => {
                info!(attempt, "automatic retries exhausted, waiting for manual retry");
                return;
            }
        };

        debug!(attempt, delay_ms = delay.as_millis(), "scheduling retry");
        let weak = Arc::downgrade(self);
        let time = Arc::clone(&self.effects.time);
        state.retry_timer.set(tokio::spawn(async move {
            time.sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.retry_fired(generation).await;
            }
        }));
    }

    async fn retry_fired(self: &Arc<Self>, generation: u64) {
        {
            let mut state = self.state.lock();
            if state.generation != generation || state.session.phase != SessionPhase::NetworkError
            {
                debug!(generation, "stale retry timer ignored");
                return;
            }
            state.retry_timer.release();
            state.session.retry_attempt += 1;
            self.set_phase(&mut state, SessionPhase::Loading);
        }
        self.load(generation).await;
    }

    async fn clear(&self, reason: &'static str) -> Result<(), BootstrapError> {
        self.stop_timers();
        let cleared = {
            let _fence = self.effects.epoch.invalidate().await;
            self.effects.store.clear_session().await
        };
        if let Err(err) = &cleared {
            warn!(error = %err, "failed to clear session store");
        }
        {
            let mut state = self.state.lock();
            state.generation += 1;
            state.session = Session::default();
            self.set_phase(&mut state, SessionPhase::Ready);
        }
        info!(reason, "session cleared");
        self.bus.emit(AppEvent::AuthCleared);
        cleared.map_err(BootstrapError::from)
    }

    /// Mirror role switches and canonical profile syncs into the session.
    fn observe(&self, event: &AppEvent) {
        let mut state = self.state.lock();
        let Some(profile) = state.session.profile.as_mut() else {
            return;
        };
        match event {
            AppEvent::RoleSwitchOptimistic(ctx)
            | AppEvent::RoleSwitched(ctx)
            | AppEvent::RoleSwitchRevert(ctx) => {
                if profile.active_role == ctx.active_role {
                    return;
                }
                profile.active_role = ctx.active_role.clone();
            }
            AppEvent::ProfileRefreshed(refreshed) => {
                if *profile == *refreshed {
                    return;
                }
                *profile = refreshed.clone();
            }
            _ => return,
        }
        self.publish(&state);
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.get_mut().take() {
            subscription.unsubscribe();
        }
    }
}
