//! Effective RBAC permission resolution.

use crate::{Membership, PermissionMap, RoleKey, RoleTemplates};

/// Resolves the effective permission map of a membership.
///
/// - No IO
/// - No panics
/// - Unknown roles resolve to an empty map (fails closed)
#[derive(Debug, Clone)]
pub struct PermissionResolutionService {
    templates: RoleTemplates,
}

impl Default for PermissionResolutionService {
    fn default() -> Self {
        Self::new(RoleTemplates::standard())
    }
}

impl PermissionResolutionService {
    pub fn new(templates: RoleTemplates) -> Self {
        Self { templates }
    }

    /// Template defaults, then scope grants (additive), then overrides (replacing).
    pub fn resolve(&self, membership: &Membership) -> PermissionMap {
        let role = membership.role();
        let mut permissions = self.templates.template(role);

        // Custom and unrecognized roles get no scope grants either.
        if role != RoleKey::Custom {
            if let Some(scope) = membership.role_scope.or_else(|| role.default_scope()) {
                permissions.merge(&self.templates.scope_grants(scope));
            }
        }

        if let Some(overrides) = &membership.permission_overrides {
            for (resource, actions) in overrides.iter() {
                permissions.replace(resource.clone(), actions.clone());
            }
        }

        tracing::debug!(
            org_id = %membership.org_id,
            user_id = %membership.user_id,
            role = %role,
            resources = permissions.len(),
            "resolved effective permissions"
        );

        permissions
    }
}
