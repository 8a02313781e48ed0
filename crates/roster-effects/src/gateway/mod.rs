//! Auth gateway handlers.

mod fixture;

pub use fixture::FixtureGateway;
