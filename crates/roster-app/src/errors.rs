//! Errors raised by the session and role-switch coordinators.

use roster_core::{InvalidTransition, RosterError, SelectionKey, SessionPhase};

/// Failure of a [`crate::SessionBootstrapper`] entry point.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BootstrapError {
    /// The operation is not allowed from the current phase.
    #[error("{operation} is not allowed while the session is {phase}")]
    InvalidPhase {
        /// Rejected entry point.
        operation: &'static str,
        /// Phase at the time of the call.
        phase: SessionPhase,
    },

    /// The session store failed.
    #[error(transparent)]
    Store(#[from] RosterError),
}

/// Failure of a [`crate::RoleSwitchCoordinator`] entry point.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoleSwitchError {
    /// Another request holds the switching lock.
    #[error("a role switch is already committing")]
    SwitchInFlight,

    /// `confirm_selection` without a prior `open_selection`.
    #[error("no role selection is open")]
    NoSelection,

    /// Nothing to confirm or cancel.
    #[error("no countdown is running")]
    NoCountdown,

    /// The key names no assignment of the open profile.
    #[error("selection {0} does not match any role assignment")]
    UnknownSelection(SelectionKey),

    /// The session was cleared before the switch could take effect.
    #[error("the session was cleared while the role switch was pending")]
    SessionCleared,

    /// Request status table violation.
    #[error(transparent)]
    Transition(#[from] InvalidTransition),

    /// The session store failed.
    #[error(transparent)]
    Store(#[from] RosterError),
}
