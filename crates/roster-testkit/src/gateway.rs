//! Scripted auth gateway
//!
//! Replies are popped from per-RPC queues; once a queue is empty the gateway
//! falls back to serving its current profile (or a configured failure). A
//! successful unscripted `switch_role` rewrites that profile's active role so
//! the follow-up fetch returns the canonical post-switch state, like a real
//! server would.
//!
//! Every call is timestamped against the tokio clock, so tests running with
//! `start_paused = true` can assert exact retry and refresh schedules.

use async_trait::async_trait;
use parking_lot::Mutex;
use roster_core::effects::{AuthGatewayEffects, GatewayError, ProfileResponse};
use roster_core::{AuthToken, Profile};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Reply to a `fetch_profile` call.
pub type FetchReply = Result<ProfileResponse, GatewayError>;

#[derive(Debug)]
struct MockState {
    profile: Profile,
    fetch_failure: Option<GatewayError>,
    fetch_script: VecDeque<FetchReply>,
    switch_script: VecDeque<Result<(), GatewayError>>,
    fetch_calls: Vec<Duration>,
    switch_calls: Vec<String>,
    fetch_latency: Duration,
    switch_latency: Duration,
}

/// Mock [`AuthGatewayEffects`] with scripted replies.
#[derive(Debug, Clone)]
pub struct MockAuthGateway {
    origin: Instant,
    state: Arc<Mutex<MockState>>,
}

impl MockAuthGateway {
    /// Gateway that serves `profile` until scripted otherwise.
    pub fn new(profile: Profile) -> Self {
        Self {
            origin: Instant::now(),
            state: Arc::new(Mutex::new(MockState {
                profile,
                fetch_failure: None,
                fetch_script: VecDeque::new(),
                switch_script: VecDeque::new(),
                fetch_calls: Vec::new(),
                switch_calls: Vec::new(),
                fetch_latency: Duration::ZERO,
                switch_latency: Duration::ZERO,
            })),
        }
    }

    /// Queue a reply for the next unanswered `fetch_profile`.
    pub fn push_fetch(&self, reply: FetchReply) -> &Self {
        self.state.lock().fetch_script.push_back(reply);
        self
    }

    /// Queue `count` copies of the same fetch failure.
    pub fn push_fetch_failures(&self, error: GatewayError, count: usize) -> &Self {
        let mut state = self.state.lock();
        for _ in 0..count {
            state.fetch_script.push_back(Err(error.clone()));
        }
        drop(state);
        self
    }

    /// Make every unscripted fetch fail with `error` (`None` restores success).
    pub fn set_fetch_failure(&self, error: Option<GatewayError>) -> &Self {
        self.state.lock().fetch_failure = error;
        self
    }

    /// Queue a result for the next unanswered `switch_role`.
    pub fn push_switch(&self, result: Result<(), GatewayError>) -> &Self {
        self.state.lock().switch_script.push_back(result);
        self
    }

    /// Delay every fetch by `latency` on the tokio clock.
    pub fn set_fetch_latency(&self, latency: Duration) -> &Self {
        self.state.lock().fetch_latency = latency;
        self
    }

    /// Delay every switch by `latency` on the tokio clock.
    pub fn set_switch_latency(&self, latency: Duration) -> &Self {
        self.state.lock().switch_latency = latency;
        self
    }

    /// Replace the served profile.
    pub fn set_profile(&self, profile: Profile) -> &Self {
        self.state.lock().profile = profile;
        self
    }

    /// Profile the gateway currently serves.
    pub fn profile(&self) -> Profile {
        self.state.lock().profile.clone()
    }

    /// Number of `fetch_profile` calls so far.
    pub fn fetch_count(&self) -> usize {
        self.state.lock().fetch_calls.len()
    }

    /// Offsets from gateway creation at which each fetch arrived.
    pub fn fetch_call_times(&self) -> Vec<Duration> {
        self.state.lock().fetch_calls.clone()
    }

    /// Roles passed to `switch_role`, in call order.
    pub fn switch_calls(&self) -> Vec<String> {
        self.state.lock().switch_calls.clone()
    }
}

#[async_trait]
impl AuthGatewayEffects for MockAuthGateway {
    async fn fetch_profile(&self, _token: &AuthToken) -> FetchReply {
        let latency = {
            let mut state = self.state.lock();
            state.fetch_calls.push(self.origin.elapsed());
            state.fetch_latency
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock();
        if let Some(reply) = state.fetch_script.pop_front() {
            return reply;
        }
        match &state.fetch_failure {
            Some(error) => Err(error.clone()),
            None => Ok(ProfileResponse::ok(state.profile.clone())),
        }
    }

    async fn switch_role(&self, _token: &AuthToken, role: &str) -> Result<(), GatewayError> {
        let latency = {
            let mut state = self.state.lock();
            state.switch_calls.push(role.to_owned());
            state.switch_latency
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock();
        let result = state.switch_script.pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            state.profile.active_role = role.to_owned();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn token() -> AuthToken {
        AuthToken::new("t").unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn scripted_replies_come_first_then_profile() {
        let gateway = MockAuthGateway::new(fixtures::member_profile());
        gateway.push_fetch(Err(GatewayError::TimedOut));

        assert_eq!(
            gateway.fetch_profile(&token()).await,
            Err(GatewayError::TimedOut)
        );
        let reply = gateway.fetch_profile(&token()).await.unwrap();
        assert_eq!(reply.user, Some(fixtures::member_profile()));
        assert_eq!(gateway.fetch_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_switch_updates_served_profile() {
        let gateway = MockAuthGateway::new(fixtures::member_profile());
        gateway.switch_role(&token(), "UnitLeader").await.unwrap();

        assert_eq!(gateway.profile().active_role, "UnitLeader");
        assert_eq!(gateway.switch_calls(), vec!["UnitLeader".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn latency_is_measured_on_the_tokio_clock() {
        let gateway = MockAuthGateway::new(fixtures::member_profile());
        gateway.set_fetch_latency(Duration::from_millis(250));

        gateway.fetch_profile(&token()).await.unwrap();
        gateway.fetch_profile(&token()).await.unwrap();

        assert_eq!(
            gateway.fetch_call_times(),
            vec![Duration::ZERO, Duration::from_millis(250)]
        );
    }
}
