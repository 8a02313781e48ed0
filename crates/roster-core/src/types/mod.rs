//! Domain types owned by the session and role-switch coordinators.

mod profile;
mod role_switch;
mod selection;
mod session;

pub use profile::{Profile, RoleAssignment};
pub use role_switch::{InvalidTransition, RoleSwitchRequest, SwitchStatus};
pub use selection::{SelectionKey, GLOBAL_SCOPE};
pub use session::{NetworkErrorDetail, Session, SessionPhase, MAX_AUTOMATIC_RETRIES};
