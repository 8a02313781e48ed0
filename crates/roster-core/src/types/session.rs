//! Session phase state and the network failure detail carried with it.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::profile::Profile;

/// Number of automatic bootstrap retries before manual retry is required.
pub const MAX_AUTOMATIC_RETRIES: u8 = 3;

/// Phase of the session state machine. Exactly one value holds at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Nothing has been attempted yet
    #[default]
    Idle,
    /// A bootstrap profile fetch is in flight
    Loading,
    /// Session usable; authenticated when a profile is present, anonymous otherwise
    Ready,
    /// Bootstrap failed for a transient reason
    NetworkError,
    /// Credential rejected; requires `handle_unauthorized`
    Unauthorized,
}

impl SessionPhase {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::NetworkError => "network-error",
            Self::Unauthorized => "unauthorized",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a bootstrap fetch ended in [`SessionPhase::NetworkError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkErrorDetail {
    /// The fetch exceeded its time bound
    TimedOut,
    /// No HTTP response arrived at all
    NoResponse {
        /// Transport-level description
        message: String,
    },
    /// The server answered with a status other than 401
    ServerStatus {
        /// HTTP status code
        status: u16,
    },
    /// The server answered but the body was unreadable
    MalformedResponse {
        /// Decoder message
        message: String,
    },
}

impl fmt::Display for NetworkErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimedOut => write!(f, "request timed out"),
            Self::NoResponse { .. } => write!(f, "no response from server, possibly offline"),
            Self::ServerStatus { status } => write!(f, "server responded with status {status}"),
            Self::MalformedResponse { .. } => write!(f, "server sent an unreadable response"),
        }
    }
}

/// In-memory session state owned by the bootstrapper.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Session {
    /// Current phase
    pub phase: SessionPhase,
    /// Loaded profile, `None` while unauthenticated
    pub profile: Option<Profile>,
    /// Present only in [`SessionPhase::NetworkError`]
    pub network_error_detail: Option<NetworkErrorDetail>,
    /// Automatic retries performed since the last manual retry, `0..=3`
    pub retry_attempt: u8,
}

impl Session {
    /// Authenticated and ready.
    pub fn is_authenticated(&self) -> bool {
        self.phase == SessionPhase::Ready && self.profile.is_some()
    }

    /// In `NetworkError` with the automatic retry budget spent.
    pub fn retries_exhausted(&self) -> bool {
        self.phase == SessionPhase::NetworkError && self.retry_attempt >= MAX_AUTOMATIC_RETRIES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn details_distinguish_causes() {
        assert_eq!(NetworkErrorDetail::TimedOut.to_string(), "request timed out");
        assert!(NetworkErrorDetail::NoResponse {
            message: "dns".into()
        }
        .to_string()
        .contains("possibly offline"));
        assert_eq!(
            NetworkErrorDetail::ServerStatus { status: 503 }.to_string(),
            "server responded with status 503"
        );
    }

    #[test]
    fn fresh_session_is_idle() {
        let session = Session::default();
        assert_eq!(session.phase, SessionPhase::Idle);
        assert!(!session.is_authenticated());
        assert!(!session.retries_exhausted());
    }
}
