//! Canned profiles.

use roster_core::{Profile, RoleAssignment};
use serde_json::json;

/// Token seeded into stores by most tests.
pub const TOKEN: &str = "test-token";

/// Member of unit A who also leads unit B.
pub fn member_profile() -> Profile {
    let mut profile = Profile::new(
        "user-1",
        "Member",
        vec![
            RoleAssignment::scoped("Member", "A"),
            RoleAssignment::scoped("UnitLeader", "B").with_ministry("Choir"),
        ],
    );
    profile.extra.insert("displayName".into(), json!("Ada Obi"));
    profile
}

/// Leads both unit A and unit B under the same role name.
pub fn dual_unit_leader_profile() -> Profile {
    Profile::new(
        "user-2",
        "Member",
        vec![
            RoleAssignment::global("Member"),
            RoleAssignment::scoped("UnitLeader", "A"),
            RoleAssignment::scoped("UnitLeader", "B"),
        ],
    )
}

/// `profile` with its active role replaced.
pub fn with_active_role(profile: &Profile, role: &str) -> Profile {
    Profile {
        active_role: role.to_owned(),
        ..profile.clone()
    }
}
