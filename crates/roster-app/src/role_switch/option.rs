use roster_core::{RoleAssignment, SelectionKey};

/// One selectable row of the role picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleOption {
    /// Role name as the server knows it.
    pub role: String,
    /// Key to pass back to `confirm_selection`.
    pub selection_key: SelectionKey,
    /// Ministry name, else unit id, else `Global`.
    pub display_scope: String,
}

impl From<&RoleAssignment> for RoleOption {
    fn from(assignment: &RoleAssignment) -> Self {
        Self {
            role: assignment.role.clone(),
            selection_key: assignment.selection_key(),
            display_scope: assignment.display_scope(),
        }
    }
}
