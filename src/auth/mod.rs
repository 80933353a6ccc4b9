use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ArchiveError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
}

/// Capabilities gating archive and module-lock operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    RestoreRecords,
    PermanentlyDelete,
    ManageAdmins,
    ViewAllSections,
    ManageModuleLocks,
}

impl Capability {
    /// Key under which the capability is stored in an operator's
    /// permission map.
    pub fn key(&self) -> &'static str {
        match self {
            Capability::RestoreRecords => "restore_records",
            Capability::PermanentlyDelete => "permanently_delete",
            Capability::ManageAdmins => "manage_admins",
            Capability::ViewAllSections => "view_all_sections",
            Capability::ManageModuleLocks => "manage_module_locks",
        }
    }
}

/// Returns whether the role/permission pair grants a capability.
/// Super admins hold every capability; everyone else needs an explicit
/// grant in the map (absent means denied).
pub fn has_capability(
    role: Role,
    permissions: &HashMap<String, bool>,
    capability: Capability,
) -> bool {
    role == Role::SuperAdmin || permissions.get(capability.key()).copied().unwrap_or(false)
}

/// The authenticated staff user performing archive actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operator {
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub permissions: HashMap<String, bool>,
}

impl Operator {
    pub fn new(email: impl Into<String>, role: Role) -> Self {
        Self { email: email.into(), role, permissions: HashMap::new() }
    }

    pub fn grant(mut self, capability: Capability) -> Self {
        self.permissions.insert(capability.key().to_string(), true);
        self
    }

    pub fn can(&self, capability: Capability) -> bool {
        has_capability(self.role, &self.permissions, capability)
    }

    /// Capability gate checked before any write is issued.
    pub fn require(&self, capability: Capability) -> Result<()> {
        if self.can(capability) {
            Ok(())
        } else {
            Err(ArchiveError::permission_denied(format!(
                "{} lacks the '{}' capability",
                self.email,
                capability.key()
            )))
        }
    }
}
