//! Selection keys: `role::unitId`, or `role::global` for unscoped roles.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::errors::RosterError;

/// Scope marker used for assignments without a unit.
pub const GLOBAL_SCOPE: &str = "global";

const SEPARATOR: &str = "::";

/// Disambiguates role assignments that share a role name but differ by unit.
///
/// Two assignments with equal roles and different (normalized) unit ids always
/// produce different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectionKey {
    role: String,
    unit_id: Option<String>,
}

impl SelectionKey {
    /// Build a key from its parts. `None`, empty ids and `global` mean unscoped.
    pub fn new(role: impl Into<String>, unit_id: Option<String>) -> Self {
        let unit_id = unit_id.filter(|id| !id.is_empty() && id.as_str() != GLOBAL_SCOPE);
        Self {
            role: role.into(),
            unit_id,
        }
    }

    /// Role portion of the key.
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Unit portion of the key, `None` for global selections.
    pub fn unit_id(&self) -> Option<&str> {
        self.unit_id.as_deref()
    }

    /// Whether this key selects an unscoped role.
    pub fn is_global(&self) -> bool {
        self.unit_id.is_none()
    }
}

impl fmt::Display for SelectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEPARATOR}{}",
            self.role,
            self.unit_id.as_deref().unwrap_or(GLOBAL_SCOPE)
        )
    }
}

impl FromStr for SelectionKey {
    type Err = RosterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Unit ids never contain the separator; role names might.
        let (role, unit) = s
            .rsplit_once(SEPARATOR)
            .ok_or_else(|| RosterError::invalid(format!("malformed selection key: {s:?}")))?;
        if role.is_empty() {
            return Err(RosterError::invalid(format!(
                "selection key has an empty role: {s:?}"
            )));
        }
        Ok(Self::new(role, Some(unit.to_owned())))
    }
}

impl Serialize for SelectionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SelectionKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
