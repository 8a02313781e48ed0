//! Fixture-backed auth gateway for offline and demo runs
//!
//! Serves a single profile from memory (typically loaded from a JSON file)
//! and applies role switches to it, so the full bootstrap and switch flows can
//! run without a server.

use async_trait::async_trait;
use roster_core::effects::{AuthGatewayEffects, GatewayError, ProfileResponse};
use roster_core::{AuthToken, Profile, Result, RosterError};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Auth gateway answering from a local profile fixture.
#[derive(Debug, Clone)]
pub struct FixtureGateway {
    profile: Arc<RwLock<Profile>>,
    accepted_token: Option<String>,
}

impl FixtureGateway {
    /// Serve `profile` to any token.
    pub fn new(profile: Profile) -> Self {
        Self {
            profile: Arc::new(RwLock::new(profile)),
            accepted_token: None,
        }
    }

    /// Load the fixture from a JSON file holding a profile.
    pub async fn from_file(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read(path).await.map_err(|e| {
            RosterError::not_found(format!("fixture {}: {e}", path.display()))
        })?;
        let profile: Profile = serde_json::from_slice(&raw)?;
        Ok(Self::new(profile))
    }

    /// Answer 401 to every token except `token`.
    #[must_use]
    pub fn with_accepted_token(mut self, token: impl Into<String>) -> Self {
        self.accepted_token = Some(token.into());
        self
    }

    /// Current fixture state.
    pub async fn profile(&self) -> Profile {
        self.profile.read().await.clone()
    }

    fn check_token(&self, token: &AuthToken) -> std::result::Result<(), GatewayError> {
        match &self.accepted_token {
            Some(accepted) if accepted != token.expose() => {
                Err(GatewayError::Status { status: 401 })
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl AuthGatewayEffects for FixtureGateway {
    async fn fetch_profile(
        &self,
        token: &AuthToken,
    ) -> std::result::Result<ProfileResponse, GatewayError> {
        self.check_token(token)?;
        Ok(ProfileResponse::ok(self.profile.read().await.clone()))
    }

    async fn switch_role(
        &self,
        token: &AuthToken,
        role: &str,
    ) -> std::result::Result<(), GatewayError> {
        self.check_token(token)?;
        let mut profile = self.profile.write().await;
        if !profile.holds_role(role) {
            debug!(role, "fixture rejects switch to a role the user does not hold");
            return Err(GatewayError::Status { status: 403 });
        }
        profile.active_role = role.to_owned();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_core::RoleAssignment;

    fn fixture() -> FixtureGateway {
        FixtureGateway::new(Profile::new(
            "u-1",
            "Member",
            vec![
                RoleAssignment::scoped("Member", "A"),
                RoleAssignment::scoped("UnitLeader", "B"),
            ],
        ))
    }

    #[tokio::test]
    async fn switch_to_held_role_updates_fixture() {
        let gateway = fixture();
        let token = AuthToken::new("t").unwrap();

        gateway.switch_role(&token, "UnitLeader").await.unwrap();
        let response = gateway.fetch_profile(&token).await.unwrap();
        assert_eq!(response.user.unwrap().active_role, "UnitLeader");
    }

    #[tokio::test]
    async fn switch_to_unheld_role_is_forbidden() {
        let gateway = fixture();
        let token = AuthToken::new("t").unwrap();

        let err = gateway.switch_role(&token, "Pastor").await.unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert_eq!(gateway.profile().await.active_role, "Member");
    }

    #[tokio::test]
    async fn unexpected_token_is_unauthorized() {
        let gateway = fixture().with_accepted_token("good");
        let err = gateway
            .fetch_profile(&AuthToken::new("bad").unwrap())
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
    }
}
