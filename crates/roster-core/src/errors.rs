//! Contract errors and the failure taxonomy
//!
//! [`RosterError`] covers config, parsing and storage. [`FailureKind`] says how
//! a gateway failure is handled once a coordinator sees it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure of a contract-level operation: config loading, key parsing, or a
/// session store handler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RosterError {
    /// A config value, selection key or token was rejected
    #[error("invalid: {message}")]
    Invalid {
        /// What was rejected and why
        message: String,
    },

    /// A config or fixture file does not exist
    #[error("missing: {message}")]
    NotFound {
        /// The missing path
        message: String,
    },

    /// The session store could not be read or written
    #[error("session store: {message}")]
    Storage {
        /// Underlying I/O failure
        message: String,
    },

    /// A stored value or fixture did not decode
    #[error("malformed data: {message}")]
    Serialization {
        /// Decoder message
        message: String,
    },

    /// A handler broke its own invariant
    #[error("internal: {message}")]
    Internal {
        /// What went wrong
        message: String,
    },
}

impl RosterError {
    /// [`RosterError::Invalid`] with `message`.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// [`RosterError::NotFound`] with `message`.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// [`RosterError::Storage`] with `message`.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// [`RosterError::Serialization`] with `message`.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// [`RosterError::Internal`] with `message`.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Result alias for contract-level operations.
pub type Result<T> = std::result::Result<T, RosterError>;

impl From<serde_json::Error> for RosterError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<std::io::Error> for RosterError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            _ => Self::storage(err.to_string()),
        }
    }
}

// ============================================================================
// Failure taxonomy
// ============================================================================

/// Severity of a transient user-facing notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToastLevel {
    /// Informational
    Info,
    /// Something degraded but recoverable
    Warning,
    /// An action the user requested did not take effect
    Error,
}

/// How a failure is classified once it reaches a coordinator.
///
/// Only [`FailureKind::Unauthorized`] and an exhausted
/// [`FailureKind::NetworkError`] ever reach the session phase. A switch
/// failure is compensated by rollback, and a silent refresh failure is dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Invalid or expired credential
    Unauthorized,
    /// Transport or server failure during bootstrap or manual retry
    NetworkError,
    /// `switchRole` or the post-switch profile fetch failed
    SwitchFailure,
    /// A periodic refresh failed with anything other than 401
    SilentRefreshFailure,
}

impl FailureKind {
    /// Whether the failure may resolve without user action.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NetworkError | Self::SilentRefreshFailure)
    }

    /// Toast severity, or `None` when the failure is never shown as a toast.
    #[must_use]
    pub fn toast_level(&self) -> Option<ToastLevel> {
        match self {
            Self::SwitchFailure => Some(ToastLevel::Error),
            Self::Unauthorized | Self::NetworkError | Self::SilentRefreshFailure => None,
        }
    }

    /// Short label for logging.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::NetworkError => "network",
            Self::SwitchFailure => "switch",
            Self::SilentRefreshFailure => "silent-refresh",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
