//! Role switch request and its status transition table.

use std::fmt;

use super::selection::SelectionKey;

/// Lifecycle of a [`RoleSwitchRequest`].
///
/// Legal transitions:
///
/// | from         | to            |
/// |--------------|---------------|
/// | `Selecting`  | `Committing`  |
/// | `Committing` | `Confirmed`   |
/// | `Committing` | `RolledBack`  |
///
/// A `Selecting` request that is cancelled is discarded, not transitioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchStatus {
    /// Countdown running, nothing applied yet
    Selecting,
    /// Optimistically applied, awaiting the server
    Committing,
    /// Server confirmed the switch
    Confirmed,
    /// Switch failed and was compensated
    RolledBack,
}

impl SwitchStatus {
    /// Whether the transition table allows `self -> next`.
    pub fn can_transition_to(self, next: SwitchStatus) -> bool {
        matches!(
            (self, next),
            (Self::Selecting, Self::Committing)
                | (Self::Committing, Self::Confirmed)
                | (Self::Committing, Self::RolledBack)
        )
    }

    /// `Confirmed` and `RolledBack` end the request.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::RolledBack)
    }
}

impl fmt::Display for SwitchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Selecting => "selecting",
            Self::Committing => "committing",
            Self::Confirmed => "confirmed",
            Self::RolledBack => "rolled-back",
        };
        f.write_str(label)
    }
}

/// A transition the table does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal role switch transition {from} -> {to}")]
pub struct InvalidTransition {
    /// Status the request was in
    pub from: SwitchStatus,
    /// Status that was requested
    pub to: SwitchStatus,
}

/// A user's confirmed choice of role, from countdown to settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSwitchRequest {
    /// Role being switched to
    pub target_role: String,
    /// Assignment the user picked
    pub selection_key: SelectionKey,
    /// `Profile.active_role` captured right before the optimistic apply
    pub original_role: Option<String>,
    /// `activeUnitId` stored before the selection was confirmed
    pub previous_unit_id: Option<String>,
    status: SwitchStatus,
}

impl RoleSwitchRequest {
    /// New request in [`SwitchStatus::Selecting`].
    pub fn new(selection_key: SelectionKey, previous_unit_id: Option<String>) -> Self {
        Self {
            target_role: selection_key.role().to_owned(),
            selection_key,
            original_role: None,
            previous_unit_id,
            status: SwitchStatus::Selecting,
        }
    }

    /// Current status.
    pub fn status(&self) -> SwitchStatus {
        self.status
    }

    /// Move to `next` if the transition table allows it.
    pub fn transition(&mut self, next: SwitchStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Record the pre-commit role once; later calls keep the first capture.
    pub fn capture_original_role(&mut self, active_role: &str) {
        if self.original_role.is_none() {
            self.original_role = Some(active_role.to_owned());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RoleSwitchRequest {
        RoleSwitchRequest::new(SelectionKey::new("UnitLeader", Some("B".into())), None)
    }

    #[test]
    fn happy_path_transitions() {
        let mut req = request();
        assert_eq!(req.target_role, "UnitLeader");
        req.transition(SwitchStatus::Committing).unwrap();
        req.transition(SwitchStatus::Confirmed).unwrap();
        assert!(req.status().is_terminal());
    }

    #[test]
    fn cannot_commit_twice() {
        let mut req = request();
        req.transition(SwitchStatus::Committing).unwrap();
        let err = req.transition(SwitchStatus::Committing).unwrap_err();
        assert_eq!(err.from, SwitchStatus::Committing);
        assert_eq!(req.status(), SwitchStatus::Committing);
    }

    #[test]
    fn cannot_settle_without_committing() {
        let mut req = request();
        assert!(req.transition(SwitchStatus::Confirmed).is_err());
        assert!(req.transition(SwitchStatus::RolledBack).is_err());
    }

    #[test]
    fn terminal_states_are_final() {
        let mut req = request();
        req.transition(SwitchStatus::Committing).unwrap();
        req.transition(SwitchStatus::RolledBack).unwrap();
        assert!(req.transition(SwitchStatus::Committing).is_err());
        assert!(req.transition(SwitchStatus::Confirmed).is_err());
    }

    #[test]
    fn original_role_is_captured_once() {
        let mut req = request();
        req.capture_original_role("Member");
        req.capture_original_role("UnitLeader");
        assert_eq!(req.original_role.as_deref(), Some("Member"));
    }
}
