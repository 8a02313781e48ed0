//! User profile and role assignments as delivered by the auth gateway.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::selection::{SelectionKey, GLOBAL_SCOPE};

/// A `(role, scope)` pair the user holds.
///
/// Several assignments may share the same `role` and differ only by `unit_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignment {
    /// Role name, e.g. `UnitLeader`
    pub role: String,
    /// Unit the role is scoped to, if any. Never empty when decoded.
    #[serde(
        default,
        deserialize_with = "non_empty_unit_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub unit_id: Option<String>,
    /// Display name of the ministry the unit belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ministry_name: Option<String>,
    /// Church the assignment belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub church_id: Option<String>,
    /// Free-form duty descriptions
    #[serde(default)]
    pub duties: Vec<String>,
}

fn non_empty_unit_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(id) if id.is_empty() => Err(D::Error::custom(
            "unitId must not be empty, omit it for a global assignment",
        )),
        id => Ok(id),
    }
}

impl RoleAssignment {
    /// Create an unscoped assignment.
    pub fn global(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            unit_id: None,
            ministry_name: None,
            church_id: None,
            duties: Vec::new(),
        }
    }

    /// Create an assignment scoped to a unit.
    pub fn scoped(role: impl Into<String>, unit_id: impl Into<String>) -> Self {
        Self {
            unit_id: Some(unit_id.into()),
            ..Self::global(role)
        }
    }

    /// Attach a ministry display name.
    #[must_use]
    pub fn with_ministry(mut self, ministry_name: impl Into<String>) -> Self {
        self.ministry_name = Some(ministry_name.into());
        self
    }

    /// The unit this assignment is scoped to.
    ///
    /// Empty ids and the reserved `global` marker are treated as unscoped.
    pub fn scope_unit_id(&self) -> Option<&str> {
        self.unit_id
            .as_deref()
            .filter(|id| !id.is_empty() && *id != GLOBAL_SCOPE)
    }

    /// Selection key disambiguating this assignment from others with the same role.
    pub fn selection_key(&self) -> SelectionKey {
        SelectionKey::new(self.role.clone(), self.scope_unit_id().map(str::to_owned))
    }

    /// Human-readable scope label for selection lists.
    pub fn display_scope(&self) -> String {
        self.ministry_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or_else(|| self.scope_unit_id())
            .unwrap_or("Global")
            .to_owned()
    }
}

/// The authenticated user's profile.
///
/// Display fields the core does not interpret are kept verbatim in `extra`
/// so that persisting and merging never drops server data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Server-side user id
    pub id: String,
    /// Role the user currently operates as
    pub active_role: String,
    /// Every role assignment the user holds
    #[serde(default)]
    pub roles: Vec<RoleAssignment>,
    /// Opaque display fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Profile {
    /// Create a profile with no opaque fields.
    pub fn new(
        id: impl Into<String>,
        active_role: impl Into<String>,
        roles: Vec<RoleAssignment>,
    ) -> Self {
        Self {
            id: id.into(),
            active_role: active_role.into(),
            roles,
            extra: Map::new(),
        }
    }

    /// Find the assignment a selection key refers to.
    pub fn assignment(&self, key: &SelectionKey) -> Option<&RoleAssignment> {
        self.roles.iter().find(|a| a.selection_key() == *key)
    }

    /// Whether the user holds `role` in any scope.
    pub fn holds_role(&self, role: &str) -> bool {
        self.roles.iter().any(|a| a.role == role)
    }

    /// Overlay a canonical server profile onto this cached copy.
    ///
    /// Typed fields come from `canonical`; opaque fields are merged key by key
    /// with `canonical` winning.
    #[must_use]
    pub fn merged_with(&self, canonical: &Profile) -> Profile {
        let mut extra = self.extra.clone();
        for (key, value) in &canonical.extra {
            extra.insert(key.clone(), value.clone());
        }
        Profile {
            id: canonical.id.clone(),
            active_role: canonical.active_role.clone(),
            roles: canonical.roles.clone(),
            extra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn profile_round_trips_opaque_fields() {
        let raw = json!({
            "id": "u-1",
            "activeRole": "Member",
            "roles": [{"role": "Member", "unitId": "A", "duties": ["ushering"]}],
            "displayName": "Ada",
            "avatar": {"url": "https://example.test/a.png"}
        });

        let profile: Profile = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(profile.extra.get("displayName"), Some(&json!("Ada")));
        assert_eq!(profile.roles[0].duties, vec!["ushering".to_string()]);
        assert_eq!(serde_json::to_value(&profile).unwrap(), raw);
    }

    #[test]
    fn missing_roles_and_duties_default_to_empty() {
        let profile: Profile =
            serde_json::from_value(json!({"id": "u-1", "activeRole": "Member"})).unwrap();
        assert!(profile.roles.is_empty());
    }

    #[test]
    fn merge_keeps_cached_display_fields_and_takes_canonical_role() {
        let mut cached = Profile::new("u-1", "Member", vec![RoleAssignment::global("Member")]);
        cached.extra.insert("displayName".into(), json!("Ada"));
        cached.extra.insert("theme".into(), json!("dark"));

        let mut canonical = Profile::new(
            "u-1",
            "UnitLeader",
            vec![RoleAssignment::scoped("UnitLeader", "B")],
        );
        canonical.extra.insert("theme".into(), json!("light"));

        let merged = cached.merged_with(&canonical);
        assert_eq!(merged.active_role, "UnitLeader");
        assert_eq!(merged.roles, canonical.roles);
        assert_eq!(merged.extra.get("displayName"), Some(&json!("Ada")));
        assert_eq!(merged.extra.get("theme"), Some(&json!("light")));
    }

    #[test]
    fn display_scope_prefers_ministry_then_unit() {
        let with_ministry = RoleAssignment::scoped("UnitLeader", "A").with_ministry("Choir");
        assert_eq!(with_ministry.display_scope(), "Choir");
        assert_eq!(RoleAssignment::scoped("UnitLeader", "A").display_scope(), "A");
        assert_eq!(RoleAssignment::global("Pastor").display_scope(), "Global");
    }

    #[test]
    fn reserved_global_unit_is_unscoped() {
        let assignment = RoleAssignment::scoped("Member", GLOBAL_SCOPE);
        assert_eq!(assignment.scope_unit_id(), None);
        assert_eq!(assignment.selection_key().to_string(), "Member::global");
    }

    #[test]
    fn empty_unit_id_is_rejected_but_absent_means_global() {
        let err = serde_json::from_value::<RoleAssignment>(json!({"role": "Member", "unitId": ""}))
            .unwrap_err()
            .to_string();
        assert!(err.contains("unitId must not be empty"), "{err}");

        let absent: RoleAssignment = serde_json::from_value(json!({"role": "Member"})).unwrap();
        let null: RoleAssignment =
            serde_json::from_value(json!({"role": "Member", "unitId": null})).unwrap();
        assert_eq!(absent.unit_id, None);
        assert_eq!(null, absent);
        assert_eq!(absent.selection_key().to_string(), "Member::global");
    }
}
