//! Role switch coordinator
//!
//! Switching the active role is a two-phase optimistic commit on
//! `Profile.active_role`:
//!
//! 1. `open_selection` lists the profile's assignments.
//! 2. `confirm_selection` scopes `activeUnitId`, creates a `Selecting`
//!    request and starts the countdown.
//! 3. The countdown ends exactly one way: `cancel`, `confirm_now`, or expiry.
//! 4. Commit applies the role locally and broadcasts `roleSwitchOptimistic`,
//!    then asks the server. Success broadcasts `roleSwitched` and
//!    `profileRefreshed`; failure restores the captured role, broadcasts
//!    `roleSwitchRevert` and raises an error toast.
//!
//! While a request is `Committing` the switching flag is held and every new
//! selection is rejected. The flag is released on every commit exit path,
//! before the terminal event is broadcast.
//!
//! Clearing the session (`authCleared`) drops a `Selecting` request without
//! touching the store. Every store write is fenced by the session epoch taken
//! at `confirm_selection`, so a commit still in flight when the session is
//! cleared writes nothing and broadcasts nothing further.

mod countdown;
mod option;

pub use countdown::CountdownState;
pub use option::RoleOption;

use parking_lot::Mutex;
use roster_core::effects::{GatewayError, ProfileResponse};
use roster_core::{
    ActiveRoleContext, AppEvent, EventName, FailureKind, Profile, RosterConfig, RosterError,
    RoleSwitchRequest, SelectionKey, SessionStoreExt, SwitchStatus,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bus::{EventBus, Subscription};
use crate::effects::AppEffects;
use crate::errors::RoleSwitchError;
use crate::notifications::{Toast, ToastQueue};
use crate::tasks::FlagGuard;
use countdown::{Claim, Countdown};

/// How a committed switch settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The server confirmed; carries the canonical role and the selected unit.
    Confirmed(ActiveRoleContext),
    /// The switch failed; carries the restored role and unit.
    RolledBack(ActiveRoleContext),
}

/// Drives role selection, countdown and the optimistic commit.
#[derive(Clone)]
pub struct RoleSwitchCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    config: RosterConfig,
    effects: AppEffects,
    bus: EventBus,
    toasts: ToastQueue,
    switching: AtomicBool,
    state: Mutex<State>,
    subscription: Mutex<Option<Subscription>>,
}

struct State {
    selection: Option<Profile>,
    request: Option<RoleSwitchRequest>,
    /// Session epoch the live request was created in.
    epoch: u64,
    countdown: Countdown,
}

/// A `Selecting` request taken out of the state by a cancel or a supersede.
struct Superseded {
    request: RoleSwitchRequest,
    epoch: u64,
}

/// Everything a commit needs, including the held switching flag.
struct CommitTicket<'a> {
    switching: FlagGuard<'a>,
    key: SelectionKey,
    previous_unit_id: Option<String>,
    snapshot: Profile,
    epoch: u64,
}

#[derive(Debug, thiserror::Error)]
enum RemoteFailure {
    #[error(transparent)]
    Store(#[from] RosterError),
    #[error("no stored token")]
    MissingToken,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("server returned no profile after switching")]
    Rejected,
}

impl RoleSwitchCoordinator {
    /// Coordinator publishing on `bus` and raising toasts on `toasts`.
    pub fn new(
        config: RosterConfig,
        effects: AppEffects,
        bus: EventBus,
        toasts: ToastQueue,
    ) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let observer = weak.clone();
            let subscription = bus.on_topic(EventName::AuthCleared, move |_| {
                if let Some(inner) = observer.upgrade() {
                    inner.drop_selection();
                }
            });
            Inner {
                config,
                effects,
                bus: bus.clone(),
                toasts,
                switching: AtomicBool::new(false),
                state: Mutex::new(State {
                    selection: None,
                    request: None,
                    epoch: 0,
                    countdown: Countdown::new(),
                }),
                subscription: Mutex::new(Some(subscription)),
            }
        });
        Self { inner }
    }

    /// List the selectable assignments of `profile`.
    ///
    /// A countdown still running for an earlier selection is cancelled as if
    /// by [`Self::cancel`].
    pub async fn open_selection(
        &self,
        profile: &Profile,
    ) -> Result<Vec<RoleOption>, RoleSwitchError> {
        let superseded = {
            let mut state = self.inner.state.lock();
            self.inner.ensure_idle()?;
            let superseded = self.inner.cancel_pending(&mut state);
            state.selection = Some(profile.clone());
            superseded
        };
        if let Some(pending) = superseded {
            debug!(selection_key = %pending.request.selection_key, "pending selection superseded");
            self.inner.restore_unit(&pending).await?;
        }
        Ok(profile.roles.iter().map(RoleOption::from).collect())
    }

    /// Scope `activeUnitId` to `key` and start the countdown.
    pub async fn confirm_selection(&self, key: &SelectionKey) -> Result<(), RoleSwitchError> {
        let epoch = self.inner.effects.epoch.current();
        let carried = {
            let mut state = self.inner.state.lock();
            self.inner.ensure_idle()?;
            let Some(profile) = state.selection.as_ref() else {
                return Err(RoleSwitchError::NoSelection);
            };
            if profile.assignment(key).is_none() {
                return Err(RoleSwitchError::UnknownSelection(key.clone()));
            }
            self.inner.cancel_pending(&mut state)
        };

        let previous_unit_id = match carried {
            Some(pending) => pending.request.previous_unit_id,
            None => self.inner.effects.store.active_unit_id().await?,
        };
        {
            let Some(_writes) = self.inner.effects.epoch.enter(epoch).await else {
                return Err(RoleSwitchError::SessionCleared);
            };
            self.inner
                .effects
                .store
                .set_active_unit_id(key.unit_id())
                .await?;
        }

        let mut state = self.inner.state.lock();
        self.inner.ensure_idle()?;
        if state.selection.is_none() {
            return Err(RoleSwitchError::SessionCleared);
        }
        let previous_unit_id = match self.inner.cancel_pending(&mut state) {
            Some(pending) => pending.request.previous_unit_id,
            None => previous_unit_id,
        };
        let generation = state.countdown.begin();
        state.request = Some(RoleSwitchRequest::new(key.clone(), previous_unit_id));
        state.epoch = epoch;
        let handle = self.inner.spawn_countdown(generation);
        state.countdown.attach(handle);
        info!(selection_key = %key, generation, "role switch countdown started");
        Ok(())
    }

    /// Stop the countdown and discard the request. Returns `false` if none was running.
    ///
    /// The role is untouched and `activeUnitId` gets its pre-selection value back.
    pub async fn cancel(&self) -> Result<bool, RoleSwitchError> {
        let pending = {
            let mut state = self.inner.state.lock();
            self.inner.cancel_pending(&mut state)
        };
        let Some(pending) = pending else {
            return Ok(false);
        };
        self.inner.restore_unit(&pending).await?;
        info!(selection_key = %pending.request.selection_key, "role switch cancelled");
        Ok(true)
    }

    /// Commit the pending selection without waiting for the countdown.
    pub async fn confirm_now(&self) -> Result<SwitchOutcome, RoleSwitchError> {
        let ticket = {
            let mut state = self.inner.state.lock();
            if !state.countdown.claim(Claim::Forced) {
                return Err(RoleSwitchError::NoCountdown);
            }
            self.inner.begin_commit(&mut state)?
        };
        self.inner.commit(ticket).await
    }

    /// Status of the live request, if any.
    pub fn status(&self) -> Option<SwitchStatus> {
        self.inner.state.lock().request.as_ref().map(RoleSwitchRequest::status)
    }

    /// Countdown state machine position.
    pub fn countdown_state(&self) -> CountdownState {
        self.inner.state.lock().countdown.state()
    }

    /// Elapsed ratio of the running countdown, from `0.0` to `1.0`.
    pub fn countdown_progress(&self) -> watch::Receiver<f32> {
        self.inner.state.lock().countdown.progress()
    }

    /// Whether a commit currently holds the switching flag.
    pub fn is_switching(&self) -> bool {
        self.inner.switching.load(Ordering::Acquire)
    }

    /// Receive rollback toasts raised from now on.
    pub fn subscribe_toasts(&self) -> broadcast::Receiver<Toast> {
        self.inner.toasts.subscribe()
    }

    /// Abort the countdown timer. A commit already under way runs to completion.
    pub fn shutdown(&self) {
        let mut state = self.inner.state.lock();
        if self.inner.cancel_pending(&mut state).is_some() {
            debug!("pending selection dropped on shutdown");
        }
    }
}

impl std::fmt::Debug for RoleSwitchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleSwitchCoordinator")
            .field("status", &self.status())
            .field("switching", &self.is_switching())
            .finish_non_exhaustive()
    }
}

impl Inner {
    fn ensure_idle(&self) -> Result<(), RoleSwitchError> {
        if self.switching.load(Ordering::Acquire) {
            Err(RoleSwitchError::SwitchInFlight)
        } else {
            Ok(())
        }
    }

    /// Cancel a running countdown and hand back its `Selecting` request.
    fn cancel_pending(&self, state: &mut State) -> Option<Superseded> {
        if !state.countdown.cancel() {
            return None;
        }
        state.request.take().map(|request| Superseded {
            request,
            epoch: state.epoch,
        })
    }

    /// Put back the `activeUnitId` seen before the request, unless the session was cleared since.
    async fn restore_unit(&self, pending: &Superseded) -> Result<(), RosterError> {
        let Some(_writes) = self.effects.epoch.enter(pending.epoch).await else {
            debug!("session cleared, active unit left as is");
            return Ok(());
        };
        self.effects
            .store
            .set_active_unit_id(pending.request.previous_unit_id.as_deref())
            .await
    }

    /// `authCleared`: forget the open selection and any `Selecting` request.
    fn drop_selection(&self) {
        let mut state = self.state.lock();
        state.selection = None;
        if let Some(pending) = self.cancel_pending(&mut state) {
            info!(
                selection_key = %pending.request.selection_key,
                "pending role switch dropped, session cleared"
            );
        }
    }

    /// Give up on a commit whose session was cleared; nothing more is written or broadcast.
    fn abandon(&self, key: &SelectionKey) -> RoleSwitchError {
        self.state.lock().request = None;
        info!(selection_key = %key, "session cleared mid-commit, role switch abandoned");
        RoleSwitchError::SessionCleared
    }

    fn spawn_countdown(self: &Arc<Self>, generation: u64) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let time = Arc::clone(&self.effects.time);
        let total = self.config.countdown();
        let tick = self.config.countdown_tick().max(Duration::from_millis(1));
        tokio::spawn(async move {
            let started = time.monotonic_ms();
            let elapsed = || Duration::from_millis(time.monotonic_ms().saturating_sub(started));
            let mut so_far = Duration::ZERO;
            while so_far < total {
                time.sleep(tick.min(total - so_far)).await;
                so_far = elapsed();
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let ratio = so_far.as_secs_f32() / total.as_secs_f32();
                if !inner.state.lock().countdown.tick(generation, ratio) {
                    return;
                }
            }
            if let Some(inner) = weak.upgrade() {
                inner.expire(generation).await;
            }
        })
    }

    async fn expire(&self, generation: u64) {
        let ticket = {
            let mut state = self.state.lock();
            if !state.countdown.claim(Claim::Expired(generation)) {
                debug!(generation, "stale countdown expiry ignored");
                return;
            }
            self.begin_commit(&mut state)
        };
        let ticket = match ticket {
            Ok(ticket) => ticket,
            Err(err) => {
                warn!(error = %err, "countdown expired but commit could not start");
                return;
            }
        };
        if let Err(err) = self.commit(ticket).await {
            debug!(error = %err, "expired countdown did not settle");
        }
    }

    /// `Selecting -> Committing` under the switching flag.
    fn begin_commit<'a>(&'a self, state: &mut State) -> Result<CommitTicket<'a>, RoleSwitchError> {
        let snapshot = state.selection.clone().ok_or(RoleSwitchError::NoSelection)?;
        let request = state.request.as_mut().ok_or(RoleSwitchError::NoCountdown)?;
        let switching =
            FlagGuard::acquire(&self.switching).ok_or(RoleSwitchError::SwitchInFlight)?;
        request.transition(SwitchStatus::Committing)?;
        Ok(CommitTicket {
            switching,
            key: request.selection_key.clone(),
            previous_unit_id: request.previous_unit_id.clone(),
            snapshot,
            epoch: state.epoch,
        })
    }

    async fn commit(&self, ticket: CommitTicket<'_>) -> Result<SwitchOutcome, RoleSwitchError> {
        let CommitTicket {
            switching,
            key,
            previous_unit_id,
            snapshot,
            epoch,
        } = ticket;
        let target = key.role().to_owned();
        let unit_id = key.unit_id().map(str::to_owned);

        let mut profile = match self.effects.store.load_profile().await {
            Ok(Some(cached)) => cached,
            Ok(None) => snapshot,
            Err(err) => {
                warn!(error = %err, "cached profile unreadable, using selection snapshot");
                snapshot
            }
        };
        let captured = {
            let mut state = self.state.lock();
            let captured = state.request.as_mut().and_then(|request| {
                request.capture_original_role(&profile.active_role);
                request.original_role.clone()
            });
            captured
        };
        let original_role = captured.unwrap_or_else(|| profile.active_role.clone());

        profile.active_role = target.clone();
        let applied = {
            let Some(_writes) = self.effects.epoch.enter(epoch).await else {
                return Err(self.abandon(&key));
            };
            let applied = self.effects.store.store_profile(&profile).await;
            self.bus.emit(AppEvent::RoleSwitchOptimistic(ActiveRoleContext::new(
                target.clone(),
                unit_id.clone(),
            )));
            applied
        };
        info!(selection_key = %key, from = %original_role, "role applied optimistically");

        let remote = match applied {
            Ok(()) => self.confirm_remote(&target).await,
            Err(err) => Err(RemoteFailure::Store(err)),
        };

        let Some(_writes) = self.effects.epoch.enter(epoch).await else {
            return Err(self.abandon(&key));
        };
        let outcome = match remote {
            Ok(canonical) => {
                let merged = profile.merged_with(&canonical);
                if let Err(err) = self.effects.store.store_profile(&merged).await {
                    warn!(error = %err, "failed to cache confirmed profile");
                }
                let confirmed = ActiveRoleContext::new(merged.active_role.clone(), unit_id);
                self.settle(SwitchStatus::Confirmed);
                drop(switching);
                self.bus.emit(AppEvent::RoleSwitched(confirmed.clone()));
                self.bus.emit(AppEvent::ProfileRefreshed(merged));
                info!(role = %confirmed.active_role, "role switch confirmed");
                SwitchOutcome::Confirmed(confirmed)
            }
            Err(failure) => {
                warn!(
                    failure = %FailureKind::SwitchFailure,
                    error = %failure,
                    selection_key = %key,
                    "role switch failed, rolling back"
                );
                profile.active_role = original_role.clone();
                if let Err(err) = self.effects.store.store_profile(&profile).await {
                    warn!(error = %err, "failed to restore cached profile");
                }
                if let Err(err) = self
                    .effects
                    .store
                    .set_active_unit_id(previous_unit_id.as_deref())
                    .await
                {
                    warn!(error = %err, "failed to restore active unit");
                }
                let restored = ActiveRoleContext::new(original_role, previous_unit_id);
                self.settle(SwitchStatus::RolledBack);
                drop(switching);
                self.bus.emit(AppEvent::RoleSwitchRevert(restored.clone()));
                self.toasts.raise(
                    FailureKind::SwitchFailure,
                    format!("Could not switch to {target}. Your previous role was restored."),
                );
                SwitchOutcome::RolledBack(restored)
            }
        };
        Ok(outcome)
    }

    async fn confirm_remote(&self, role: &str) -> Result<Profile, RemoteFailure> {
        let token = self
            .effects
            .store
            .load_token()
            .await?
            .ok_or(RemoteFailure::MissingToken)?;
        let timeout = self.config.fetch_timeout();
        self.effects.switch_role(&token, role, timeout).await?;
        match self.effects.fetch_profile(&token, timeout).await? {
            ProfileResponse {
                ok: true,
                user: Some(profile),
            } => Ok(profile),
            _ => Err(RemoteFailure::Rejected),
        }
    }

    /// Move the request to its terminal status and retire it.
    fn settle(&self, status: SwitchStatus) {
        let mut state = self.state.lock();
        if let Some(mut request) = state.request.take() {
            if let Err(err) = request.transition(status) {
                warn!(error = %err, "unexpected request status at settle");
            }
            debug!(status = %request.status(), "role switch request retired");
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.get_mut().take() {
            subscription.unsubscribe();
        }
    }
}
