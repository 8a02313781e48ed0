//! Closed catalogue of events fanned out to UI consumers.
//!
//! Each variant carries its own payload type so producers and consumers are
//! checked exhaustively at compile time.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::types::Profile;

/// Role context carried by the role switch events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveRoleContext {
    /// Role now (or again) active
    pub active_role: String,
    /// Unit the role is scoped to, `None` for global roles
    pub active_unit_id: Option<String>,
}

impl ActiveRoleContext {
    /// Build a context from its parts.
    pub fn new(active_role: impl Into<String>, active_unit_id: Option<String>) -> Self {
        Self {
            active_role: active_role.into(),
            active_unit_id,
        }
    }
}

/// An event published on the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// First successful bootstrap fetch
    ProfileLoaded(Profile),
    /// Periodic silent refresh success, or post-switch canonical sync
    ProfileRefreshed(Profile),
    /// Local apply, pre-confirmation
    RoleSwitchOptimistic(ActiveRoleContext),
    /// Server-confirmed switch
    RoleSwitched(ActiveRoleContext),
    /// Switch failed; state restored
    RoleSwitchRevert(ActiveRoleContext),
    /// Session invalidated or logged out
    AuthCleared,
    /// Hint for external event caches; re-broadcast only
    EventsChanged(Value),
    /// Hint for external assignment caches; re-broadcast only
    AssignmentsChanged(Value),
}

impl AppEvent {
    /// Topic of this event.
    pub fn name(&self) -> EventName {
        match self {
            Self::ProfileLoaded(_) => EventName::ProfileLoaded,
            Self::ProfileRefreshed(_) => EventName::ProfileRefreshed,
            Self::RoleSwitchOptimistic(_) => EventName::RoleSwitchOptimistic,
            Self::RoleSwitched(_) => EventName::RoleSwitched,
            Self::RoleSwitchRevert(_) => EventName::RoleSwitchRevert,
            Self::AuthCleared => EventName::AuthCleared,
            Self::EventsChanged(_) => EventName::EventsChanged,
            Self::AssignmentsChanged(_) => EventName::AssignmentsChanged,
        }
    }

    /// The profile carried by profile events.
    pub fn profile(&self) -> Option<&Profile> {
        match self {
            Self::ProfileLoaded(profile) | Self::ProfileRefreshed(profile) => Some(profile),
            _ => None,
        }
    }

    /// The role context carried by role switch events.
    pub fn role_context(&self) -> Option<&ActiveRoleContext> {
        match self {
            Self::RoleSwitchOptimistic(ctx)
            | Self::RoleSwitched(ctx)
            | Self::RoleSwitchRevert(ctx) => Some(ctx),
            _ => None,
        }
    }
}

/// Event topics, used for topic-scoped subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    /// See [`AppEvent::ProfileLoaded`]
    ProfileLoaded,
    /// See [`AppEvent::ProfileRefreshed`]
    ProfileRefreshed,
    /// See [`AppEvent::RoleSwitchOptimistic`]
    RoleSwitchOptimistic,
    /// See [`AppEvent::RoleSwitched`]
    RoleSwitched,
    /// See [`AppEvent::RoleSwitchRevert`]
    RoleSwitchRevert,
    /// See [`AppEvent::AuthCleared`]
    AuthCleared,
    /// See [`AppEvent::EventsChanged`]
    EventsChanged,
    /// See [`AppEvent::AssignmentsChanged`]
    AssignmentsChanged,
}

impl EventName {
    /// Wire-style name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProfileLoaded => "profileLoaded",
            Self::ProfileRefreshed => "profileRefreshed",
            Self::RoleSwitchOptimistic => "roleSwitchOptimistic",
            Self::RoleSwitched => "roleSwitched",
            Self::RoleSwitchRevert => "roleSwitchRevert",
            Self::AuthCleared => "authCleared",
            Self::EventsChanged => "eventsChanged",
            Self::AssignmentsChanged => "assignmentsChanged",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
