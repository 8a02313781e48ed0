//! Auth gateway effects and HTTP status classification.
//!
//! Only the classification of outcomes is defined here; how the RPCs travel
//! over the wire is up to the handler.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::token::AuthToken;
use crate::types::{NetworkErrorDetail, Profile};

/// Body of a profile fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileResponse {
    /// Server-side success flag
    pub ok: bool,
    /// Profile, present when `ok`
    #[serde(default)]
    pub user: Option<Profile>,
}

impl ProfileResponse {
    /// Successful response carrying `profile`.
    pub fn ok(profile: Profile) -> Self {
        Self {
            ok: true,
            user: Some(profile),
        }
    }

    /// Response with `ok: false`.
    pub fn rejected() -> Self {
        Self {
            ok: false,
            user: None,
        }
    }
}

/// Failure reaching the gateway or an error status from it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The server answered with a non-success HTTP status
    #[error("server responded with status {status}")]
    Status {
        /// HTTP status code
        status: u16,
    },
    /// The request exceeded its time bound
    #[error("request timed out")]
    TimedOut,
    /// No response arrived (offline, DNS, connection reset)
    #[error("no response: {message}")]
    NoResponse {
        /// Transport-level description
        message: String,
    },
    /// The response body could not be decoded
    #[error("malformed response: {message}")]
    Decode {
        /// Decoder message
        message: String,
    },
}

impl GatewayError {
    /// HTTP status, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status } => Some(*status),
            _ => None,
        }
    }

    /// Whether this is an HTTP 401.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

/// Remote RPCs consumed by the bootstrapper and the role switch coordinator.
#[async_trait]
pub trait AuthGatewayEffects: Send + Sync {
    /// Fetch the profile for `token`.
    async fn fetch_profile(&self, token: &AuthToken) -> Result<ProfileResponse, GatewayError>;

    /// Ask the server to make `role` the active role.
    async fn switch_role(&self, token: &AuthToken, role: &str) -> Result<(), GatewayError>;
}

#[async_trait]
impl<T: AuthGatewayEffects + ?Sized> AuthGatewayEffects for Arc<T> {
    async fn fetch_profile(&self, token: &AuthToken) -> Result<ProfileResponse, GatewayError> {
        (**self).fetch_profile(token).await
    }

    async fn switch_role(&self, token: &AuthToken, role: &str) -> Result<(), GatewayError> {
        (**self).switch_role(token, role).await
    }
}

/// A profile fetch reduced to what the session state machine acts on.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// `ok` with a profile
    Authorized(Profile),
    /// HTTP 401, `ok: false`, or `ok` without a profile
    Unauthorized,
    /// Anything transient
    NetworkError(NetworkErrorDetail),
}

/// Classify a profile fetch result.
///
/// `401` and not-ok bodies are `Unauthorized`; every other status (5xx and
/// non-401 4xx), timeouts and transport failures are `NetworkError` with a
/// detail that keeps the causes apart.
pub fn classify_fetch(result: Result<ProfileResponse, GatewayError>) -> FetchOutcome {
    match result {
        Ok(ProfileResponse {
            ok: true,
            user: Some(profile),
        }) => FetchOutcome::Authorized(profile),
        Ok(_) => FetchOutcome::Unauthorized,
        Err(GatewayError::Status { status: 401 }) => FetchOutcome::Unauthorized,
        Err(GatewayError::Status { status }) => {
            FetchOutcome::NetworkError(NetworkErrorDetail::ServerStatus { status })
        }
        Err(GatewayError::TimedOut) => FetchOutcome::NetworkError(NetworkErrorDetail::TimedOut),
        Err(GatewayError::NoResponse { message }) => {
            FetchOutcome::NetworkError(NetworkErrorDetail::NoResponse { message })
        }
        Err(GatewayError::Decode { message }) => {
            FetchOutcome::NetworkError(NetworkErrorDetail::MalformedResponse { message })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RoleAssignment;

    fn profile() -> Profile {
        Profile::new("u-1", "Member", vec![RoleAssignment::global("Member")])
    }

    #[test]
    fn ok_with_profile_is_authorized() {
        assert_eq!(
            classify_fetch(Ok(ProfileResponse::ok(profile()))),
            FetchOutcome::Authorized(profile())
        );
    }

    #[test]
    fn not_ok_and_401_are_unauthorized() {
        assert_eq!(
            classify_fetch(Ok(ProfileResponse::rejected())),
            FetchOutcome::Unauthorized
        );
        assert_eq!(
            classify_fetch(Err(GatewayError::Status { status: 401 })),
            FetchOutcome::Unauthorized
        );
    }

    #[test]
    fn other_statuses_are_network_errors() {
        for status in [400, 403, 404, 429, 500, 503] {
            assert_eq!(
                classify_fetch(Err(GatewayError::Status { status })),
                FetchOutcome::NetworkError(NetworkErrorDetail::ServerStatus { status }),
                "status {status}"
            );
        }
    }

    #[test]
    fn timeouts_are_never_unauthorized() {
        assert_eq!(
            classify_fetch(Err(GatewayError::TimedOut)),
            FetchOutcome::NetworkError(NetworkErrorDetail::TimedOut)
        );
    }

    #[test]
    fn transport_failures_keep_their_message() {
        let outcome = classify_fetch(Err(GatewayError::NoResponse {
            message: "connection reset".into(),
        }));
        assert_eq!(
            outcome,
            FetchOutcome::NetworkError(NetworkErrorDetail::NoResponse {
                message: "connection reset".into()
            })
        );
    }
}
