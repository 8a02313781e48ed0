//! Test infrastructure for the Roster workspace
//!
//! - [`MockAuthGateway`]: scripted gateway with call counters and timestamps
//! - [`EventRecorder`]: collects bus events for ordering assertions
//! - [`fixtures`]: canned profiles and role assignments

#![allow(clippy::unwrap_used, clippy::expect_used)]

pub mod fixtures;
pub mod gateway;
pub mod recorder;

pub use gateway::{FetchReply, MockAuthGateway};
pub use recorder::EventRecorder;
