use core::str::FromStr;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use orgguard_core::DomainError;

use crate::PermissionMap;

/// Well-known role template a membership refers to.
///
/// Anything the membership store carries that is not a known template name
/// maps to [`RoleKey::Custom`], which resolves to no template grants at all.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleKey {
    Owner,
    Admin,
    Manager,
    Member,
    Viewer,
    Custom,
}

impl RoleKey {
    /// Parse a stored role key, falling back to `Custom` for unknown names.
    pub fn resolve(raw: &str) -> Self {
        raw.parse().unwrap_or(RoleKey::Custom)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleKey::Owner => "OWNER",
            RoleKey::Admin => "ADMIN",
            RoleKey::Manager => "MANAGER",
            RoleKey::Member => "MEMBER",
            RoleKey::Viewer => "VIEWER",
            RoleKey::Custom => "CUSTOM",
        }
    }

    /// The template this role inherits grants from.
    pub fn parent(&self) -> Option<RoleKey> {
        match self {
            RoleKey::Owner => Some(RoleKey::Admin),
            RoleKey::Admin => Some(RoleKey::Manager),
            RoleKey::Manager => Some(RoleKey::Member),
            RoleKey::Member => Some(RoleKey::Viewer),
            RoleKey::Viewer | RoleKey::Custom => None,
        }
    }

    /// Scope applied when the membership does not state one explicitly.
    pub fn default_scope(&self) -> Option<RoleScope> {
        match self {
            RoleKey::Owner | RoleKey::Admin => Some(RoleScope::Organization),
            RoleKey::Manager => Some(RoleScope::Team),
            RoleKey::Member => Some(RoleScope::Own),
            RoleKey::Viewer | RoleKey::Custom => None,
        }
    }
}

impl FromStr for RoleKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OWNER" => Ok(RoleKey::Owner),
            "ADMIN" => Ok(RoleKey::Admin),
            "MANAGER" => Ok(RoleKey::Manager),
            "MEMBER" => Ok(RoleKey::Member),
            "VIEWER" => Ok(RoleKey::Viewer),
            "CUSTOM" => Ok(RoleKey::Custom),
            other => Err(DomainError::validation(format!("unknown role key '{other}'"))),
        }
    }
}

impl core::fmt::Display for RoleKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Breadth of data a role acts on. Ordered narrowest to broadest.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleScope {
    Own,
    Team,
    Organization,
}

impl RoleScope {
    pub const ALL: [RoleScope; 3] = [RoleScope::Own, RoleScope::Team, RoleScope::Organization];

    /// This scope and every narrower one, narrowest first.
    pub fn inherited(self) -> impl Iterator<Item = RoleScope> {
        Self::ALL.into_iter().filter(move |s| *s <= self)
    }
}

impl FromStr for RoleScope {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OWN" | "SELF" => Ok(RoleScope::Own),
            "TEAM" => Ok(RoleScope::Team),
            "ORGANIZATION" | "ORG" => Ok(RoleScope::Organization),
            other => Err(DomainError::validation(format!("unknown role scope '{other}'"))),
        }
    }
}

/// Registry of role-template and role-scope grants.
///
/// Template entries hold only the grants a role adds on top of its parent;
/// inheritance is applied by [`RoleTemplates::template`].
#[derive(Debug, Clone, Default)]
pub struct RoleTemplates {
    roles: BTreeMap<RoleKey, PermissionMap>,
    scopes: BTreeMap<RoleScope, PermissionMap>,
}

impl RoleTemplates {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_role(mut self, role: RoleKey, grants: PermissionMap) -> Self {
        if role != RoleKey::Custom {
            self.roles.insert(role, grants);
        }
        self
    }

    pub fn with_scope(mut self, scope: RoleScope, grants: PermissionMap) -> Self {
        self.scopes.insert(scope, grants);
        self
    }

    /// Full template of a role, including everything inherited from its parents.
    pub fn template(&self, role: RoleKey) -> PermissionMap {
        let mut map = PermissionMap::new();
        let mut current = Some(role);
        while let Some(key) = current {
            if let Some(grants) = self.roles.get(&key) {
                map.merge(grants);
            }
            current = key.parent();
        }
        map
    }

    /// Grants contributed by a scope, including every narrower scope.
    pub fn scope_grants(&self, scope: RoleScope) -> PermissionMap {
        let mut map = PermissionMap::new();
        for s in scope.inherited() {
            if let Some(grants) = self.scopes.get(&s) {
                map.merge(grants);
            }
        }
        map
    }

    /// Default HR-application templates.
    pub fn standard() -> Self {
        Self::empty()
            .with_role(
                RoleKey::Viewer,
                PermissionMap::new()
                    .with("org.profile", ["read"])
                    .with("hr.employee", ["read"])
                    .with("hr.document", ["read"]),
            )
            .with_role(
                RoleKey::Member,
                PermissionMap::new()
                    .with("hr.time-entry", ["read", "create", "update"])
                    .with("hr.leave", ["read", "create"]),
            )
            .with_role(
                RoleKey::Manager,
                PermissionMap::new()
                    .with("hr.employee", ["update"])
                    .with("hr.time-entry", ["approve"])
                    .with("hr.leave", ["approve"])
                    .with("hr.report", ["read"]),
            )
            .with_role(
                RoleKey::Admin,
                PermissionMap::new()
                    .with("org.members", ["read", "invite", "update", "remove"])
                    .with("org.settings", ["read", "update"])
                    .with("hr.employee", ["create", "delete"])
                    .with("hr.document", ["create", "update", "delete"])
                    .with("hr.policy", ["read", "update"])
                    .with("audit.log", ["read"]),
            )
            .with_role(
                RoleKey::Owner,
                PermissionMap::new()
                    .with("org.settings", ["*"])
                    .with("billing", ["read", "update"]),
            )
            .with_scope(
                RoleScope::Own,
                PermissionMap::new()
                    .with("hr.time-entry", ["read"])
                    .with("hr.leave", ["read"]),
            )
            .with_scope(
                RoleScope::Team,
                PermissionMap::new()
                    .with("hr.employee", ["list"])
                    .with("hr.time-entry", ["list"]),
            )
            .with_scope(
                RoleScope::Organization,
                PermissionMap::new()
                    .with("hr.employee", ["export"])
                    .with("hr.report", ["export"]),
            )
    }
}
