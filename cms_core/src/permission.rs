//! Permission model.
//!
//! A [`PermissionSet`] maps each [`Capability`] of the fixed vocabulary to a
//! boolean, plus a wildcard `all` flag that satisfies every capability.
//! [`has_permission`] is the single predicate the rest of the crate uses to
//! answer "does this set satisfy this requirement".

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Key of the wildcard flag in the wire mapping.
pub const WILDCARD_KEY: &str = "all";

/// A named boolean permission flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    UsersView,
    UsersCreate,
    UsersEdit,
    UsersDelete,
    UsersDeactivate,
    UsersReactivate,
    RolesView,
    RolesCreate,
    RolesEdit,
    RolesDelete,
    ContentView,
    ContentCreate,
    ContentEdit,
    ContentDelete,
    MediaView,
    MediaUpload,
    MediaDelete,
    SettingsEdit,
    AuditView,
    AnalyticsView,
    SeoManage,
}

impl Capability {
    /// Every capability of the vocabulary, in declaration order.
    pub const ALL: [Capability; 21] = [
        Capability::UsersView,
        Capability::UsersCreate,
        Capability::UsersEdit,
        Capability::UsersDelete,
        Capability::UsersDeactivate,
        Capability::UsersReactivate,
        Capability::RolesView,
        Capability::RolesCreate,
        Capability::RolesEdit,
        Capability::RolesDelete,
        Capability::ContentView,
        Capability::ContentCreate,
        Capability::ContentEdit,
        Capability::ContentDelete,
        Capability::MediaView,
        Capability::MediaUpload,
        Capability::MediaDelete,
        Capability::SettingsEdit,
        Capability::AuditView,
        Capability::AnalyticsView,
        Capability::SeoManage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Capability::UsersView => "users_view",
            Capability::UsersCreate => "users_create",
            Capability::UsersEdit => "users_edit",
            Capability::UsersDelete => "users_delete",
            Capability::UsersDeactivate => "users_deactivate",
            Capability::UsersReactivate => "users_reactivate",
            Capability::RolesView => "roles_view",
            Capability::RolesCreate => "roles_create",
            Capability::RolesEdit => "roles_edit",
            Capability::RolesDelete => "roles_delete",
            Capability::ContentView => "content_view",
            Capability::ContentCreate => "content_create",
            Capability::ContentEdit => "content_edit",
            Capability::ContentDelete => "content_delete",
            Capability::MediaView => "media_view",
            Capability::MediaUpload => "media_upload",
            Capability::MediaDelete => "media_delete",
            Capability::SettingsEdit => "settings_edit",
            Capability::AuditView => "audit_view",
            Capability::AnalyticsView => "analytics_view",
            Capability::SeoManage => "seo_manage",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no capability of the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown capability: {0}")]
pub struct UnknownCapability(pub String);

impl FromStr for Capability {
    type Err = UnknownCapability;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .into_iter()
            .find(|capability| capability.as_str() == value)
            .ok_or_else(|| UnknownCapability(value.to_string()))
    }
}

/// What a caller needs: a single capability, or any one of several.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    One(Capability),
    /// Satisfied when at least one listed capability is granted.
    AnyOf(Vec<Capability>),
}

impl Requirement {
    pub fn capabilities(&self) -> &[Capability] {
        match self {
            Requirement::One(capability) => std::slice::from_ref(capability),
            Requirement::AnyOf(list) => list,
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.capabilities().iter().map(|c| c.as_str()).collect();
        f.write_str(&names.join(" | "))
    }
}

impl From<Capability> for Requirement {
    fn from(capability: Capability) -> Self {
        Requirement::One(capability)
    }
}

impl From<Vec<Capability>> for Requirement {
    fn from(list: Vec<Capability>) -> Self {
        Requirement::AnyOf(list)
    }
}

impl From<&[Capability]> for Requirement {
    fn from(list: &[Capability]) -> Self {
        Requirement::AnyOf(list.to_vec())
    }
}

impl<const N: usize> From<[Capability; N]> for Requirement {
    fn from(list: [Capability; N]) -> Self {
        Requirement::AnyOf(list.to_vec())
    }
}

impl From<&Requirement> for Requirement {
    fn from(requirement: &Requirement) -> Self {
        requirement.clone()
    }
}

/// The full capability mapping of a role, plus the wildcard flag.
///
/// Capabilities absent from the map are treated as `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    all: bool,
    flags: BTreeMap<Capability, bool>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set whose wildcard satisfies every capability.
    pub fn wildcard() -> Self {
        Self {
            all: true,
            flags: BTreeMap::new(),
        }
    }

    /// Builds a set granting exactly the given capabilities.
    pub fn from_granted<I>(capabilities: I) -> Self
    where
        I: IntoIterator<Item = Capability>,
    {
        Self {
            all: false,
            flags: capabilities.into_iter().map(|c| (c, true)).collect(),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.all
    }

    pub fn set_wildcard(&mut self, all: bool) {
        self.all = all;
    }

    /// Sets an explicit flag for a capability.
    pub fn set(&mut self, capability: Capability, granted: bool) {
        self.flags.insert(capability, granted);
    }

    pub fn grant(&mut self, capability: Capability) {
        self.set(capability, true);
    }

    pub fn revoke(&mut self, capability: Capability) {
        self.set(capability, false);
    }

    /// The explicit flag for a capability, ignoring the wildcard.
    pub fn flag(&self, capability: Capability) -> bool {
        self.flags.get(&capability).copied().unwrap_or(false)
    }

    /// Checks a requirement against this set.
    ///
    /// The wildcard short-circuits to `true`; otherwise at least one required
    /// capability must carry an explicit `true`.
    pub fn allows(&self, required: impl Into<Requirement>) -> bool {
        if self.all {
            return true;
        }
        required
            .into()
            .capabilities()
            .iter()
            .any(|capability| self.flag(*capability))
    }

    /// Capabilities effectively granted, in vocabulary order.
    pub fn granted(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|capability| self.all || self.flag(*capability))
            .collect()
    }
}

/// Answers whether an optional permission set satisfies a requirement.
///
/// `None` always yields `false`. A list requirement is satisfied when ANY of
/// its capabilities is granted; an empty list is satisfied only by the
/// wildcard.
///
/// # Example
///
/// ```
/// use cms_core::permission::{has_permission, Capability, PermissionSet};
///
/// let set = PermissionSet::from_granted([Capability::UsersView]);
/// assert!(has_permission(Some(&set), [Capability::RolesView, Capability::UsersView]));
/// assert!(!has_permission(None, Capability::UsersView));
/// ```
pub fn has_permission(permissions: Option<&PermissionSet>, required: impl Into<Requirement>) -> bool {
    match permissions {
        Some(set) => set.allows(required),
        None => false,
    }
}

impl Serialize for PermissionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map: BTreeMap<&str, bool> = self
            .flags
            .iter()
            .map(|(capability, granted)| (capability.as_str(), *granted))
            .collect();
        map.insert(WILDCARD_KEY, self.all);
        map.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PermissionSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: HashMap<String, Value> = HashMap::deserialize(deserializer)?;
        let mut set = PermissionSet::new();
        for (key, value) in raw {
            // Only a literal `true` grants; null, strings and numbers read as false.
            let granted = matches!(value, Value::Bool(true));
            if key == WILDCARD_KEY {
                set.all = granted;
                continue;
            }
            match key.parse::<Capability>() {
                Ok(capability) => set.set(capability, granted),
                Err(_) => debug!(key = %key, "ignoring unknown permission key"),
            }
        }
        Ok(set)
    }
}
