//! # Roster App
//!
//! Headless session core for the Roster client: session bootstrap with
//! bounded retry and silent refresh, optimistic role switching with a
//! cancellable countdown, and the event bus UI layers subscribe to.
//!
//! [`RosterApp`] wires one [`EventBus`], one [`SessionBootstrapper`] and one
//! [`RoleSwitchCoordinator`] over a shared set of effect handlers:
//!
//! ```rust,no_run
//! use roster_app::RosterApp;
//! use roster_core::RosterConfig;
//! use roster_effects::{FixtureGateway, MemorySessionStore, TokioTimeHandler};
//! # async fn demo(gateway: FixtureGateway) -> Result<(), Box<dyn std::error::Error>> {
//! let app = RosterApp::new(
//!     RosterConfig::default(),
//!     MemorySessionStore::new(),
//!     gateway,
//!     TokioTimeHandler::new(),
//! )?;
//! let _log = app.bus().on(|event| println!("{}", event.name()));
//! app.session().start().await?;
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod bus;
pub mod effects;
pub mod errors;
pub mod notifications;
pub mod role_switch;

mod app;
mod tasks;

pub use app::RosterApp;
pub use bootstrap::{RefreshOutcome, SessionBootstrapper};
pub use bus::{EventBus, Subscription, SubscriptionId};
pub use effects::AppEffects;
pub use errors::{BootstrapError, RoleSwitchError};
pub use notifications::{Toast, ToastQueue};
pub use role_switch::{CountdownState, RoleOption, RoleSwitchCoordinator, SwitchOutcome};
