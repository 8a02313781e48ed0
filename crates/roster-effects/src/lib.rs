//! # Roster Effects
//!
//! Handlers for the effect traits defined in `roster-core`:
//!
//! - [`MemorySessionStore`] and [`FileSessionStore`] for `SessionStoreEffects`
//! - [`TokioTimeHandler`] for `PhysicalTimeEffects`
//! - [`FixtureGateway`] for `AuthGatewayEffects` in offline and demo runs
//!
//! Handlers are stateless apart from the data they own and are meant to be
//! shared behind `Arc`.

pub mod gateway;
pub mod storage;
pub mod time;

pub use gateway::FixtureGateway;
pub use storage::{FileSessionStore, MemorySessionStore};
pub use time::TokioTimeHandler;
