use crate::permission::PermissionSet;
use serde::{Deserialize, Deserializer, Serialize};

/// A backend-owned role: a name plus one permission set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    #[serde(default, deserialize_with = "nullable_permissions")]
    pub permissions: PermissionSet,
}

/// An explicit `null` permission map grants nothing, same as a missing one.
fn nullable_permissions<'de, D>(deserializer: D) -> Result<PermissionSet, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<PermissionSet>::deserialize(deserializer)?.unwrap_or_default())
}

impl Role {
    pub fn new(name: impl Into<String>, permissions: PermissionSet) -> Self {
        Self {
            name: name.into(),
            permissions,
        }
    }
}

/// Optional identity fields the profile endpoint may include.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUser {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Body of the backend profile endpoint: `{ role: { name, permissions } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<ProfileUser>,
}

impl Profile {
    pub fn with_role(role: Role) -> Self {
        Self {
            role: Some(role),
            user: None,
        }
    }

    pub fn role_name(&self) -> Option<&str> {
        self.role.as_ref().map(|role| role.name.as_str())
    }

    pub fn permissions(&self) -> Option<&PermissionSet> {
        self.role.as_ref().map(|role| &role.permissions)
    }
}
