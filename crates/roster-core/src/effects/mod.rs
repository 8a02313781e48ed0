//! Effect traits for the collaborators the core consumes.
//!
//! # Effect Classification
//!
//! - `SessionStoreEffects`: key/value persistence, medium-agnostic
//! - `AuthGatewayEffects`: remote profile and role switch RPCs
//! - `PhysicalTimeEffects`: sleeping and a monotonic clock for timers
//!
//! Implementations live in `roster-effects` (production) and
//! `roster-testkit` (scripted test doubles).

pub mod gateway;
pub mod storage;
pub mod time;

pub use gateway::{classify_fetch, AuthGatewayEffects, FetchOutcome, GatewayError, ProfileResponse};
pub use storage::{SessionStoreEffects, SessionStoreExt, StoreKey};
pub use time::PhysicalTimeEffects;
