//! # Roster Core
//!
//! Contracts shared by every layer of the Roster session core:
//!
//! - **Domain types**: [`Profile`], [`RoleAssignment`], [`SelectionKey`],
//!   [`Session`] and [`RoleSwitchRequest`]
//! - **Events**: the closed [`AppEvent`] catalogue fanned out to UI consumers
//! - **Effect traits**: [`SessionStoreEffects`], [`AuthGatewayEffects`] and
//!   [`PhysicalTimeEffects`], implemented in `roster-effects` and the testkit
//! - **Errors**: [`RosterError`], [`GatewayError`] and the [`FailureKind`] taxonomy
//! - **Configuration**: [`RosterConfig`]
//!
//! This crate performs no I/O of its own beyond configuration file loading.

pub mod config;
pub mod effects;
pub mod errors;
pub mod events;
pub mod token;
pub mod types;

pub use config::RosterConfig;
pub use effects::{
    classify_fetch, AuthGatewayEffects, FetchOutcome, GatewayError, PhysicalTimeEffects,
    ProfileResponse, SessionStoreEffects, SessionStoreExt, StoreKey,
};
pub use errors::{FailureKind, Result, RosterError, ToastLevel};
pub use events::{ActiveRoleContext, AppEvent, EventName};
pub use token::AuthToken;
pub use types::{
    InvalidTransition, NetworkErrorDetail, Profile, RoleAssignment, RoleSwitchRequest,
    SelectionKey, Session, SessionPhase, SwitchStatus, GLOBAL_SCOPE, MAX_AUTOMATIC_RETRIES,
};
