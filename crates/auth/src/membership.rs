use std::str::FromStr;

use serde::{Deserialize, Serialize};

use orgguard_core::{DomainError, OrgId, UserId};

use crate::{Classification, PermissionMap, Residency, RoleKey, RoleScope};

/// Lifecycle state of a membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipStatus {
    /// Membership is active and may act in the organization.
    #[default]
    Active,
    /// Invitation sent but not yet accepted.
    Invited,
    Suspended,
    Revoked,
}

impl MembershipStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, MembershipStatus::Active)
    }
}

impl core::fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MembershipStatus::Active => write!(f, "active"),
            MembershipStatus::Invited => write!(f, "invited"),
            MembershipStatus::Suspended => write!(f, "suspended"),
            MembershipStatus::Revoked => write!(f, "revoked"),
        }
    }
}

impl FromStr for MembershipStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(MembershipStatus::Active),
            "INVITED" => Ok(MembershipStatus::Invited),
            "SUSPENDED" => Ok(MembershipStatus::Suspended),
            "REVOKED" => Ok(MembershipStatus::Revoked),
            other => Err(DomainError::validation(format!("unknown membership status '{other}'"))),
        }
    }
}

/// A user's membership in an organization, as read from the membership store.
///
/// Owned by the membership store; the engine only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub org_id: OrgId,
    pub user_id: UserId,
    /// Raw role key as stored; see [`Membership::role`].
    pub role_key: String,
    #[serde(default)]
    pub role_name: Option<String>,
    #[serde(default)]
    pub role_scope: Option<RoleScope>,
    #[serde(default)]
    pub status: MembershipStatus,
    pub org_classification: Classification,
    pub org_residency: Residency,
    /// Replaces the resolved action set per resource-kind.
    #[serde(default)]
    pub permission_overrides: Option<PermissionMap>,
}

impl Membership {
    pub fn new(
        org_id: OrgId,
        user_id: UserId,
        role_key: impl Into<String>,
        org_classification: Classification,
        org_residency: Residency,
    ) -> Self {
        Self {
            org_id,
            user_id,
            role_key: role_key.into(),
            role_name: None,
            role_scope: None,
            status: MembershipStatus::Active,
            org_classification,
            org_residency,
            permission_overrides: None,
        }
    }

    pub fn with_role_name(mut self, name: impl Into<String>) -> Self {
        self.role_name = Some(name.into());
        self
    }

    pub fn with_scope(mut self, scope: RoleScope) -> Self {
        self.role_scope = Some(scope);
        self
    }

    pub fn with_status(mut self, status: MembershipStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_overrides(mut self, overrides: PermissionMap) -> Self {
        self.permission_overrides = Some(overrides);
        self
    }

    pub fn role(&self) -> RoleKey {
        RoleKey::resolve(&self.role_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_store_record() {
        let org_id = OrgId::new();
        let user_id = UserId::new();
        let json = serde_json::json!({
            "orgId": org_id,
            "userId": user_id,
            "roleKey": "manager",
            "roleScope": "TEAM",
            "orgClassification": "SECRET",
            "orgResidency": "uk-south",
            "permissionOverrides": { "billing": ["read"] }
        });

        let membership: Membership = serde_json::from_value(json).unwrap();
        assert_eq!(membership.role(), RoleKey::Manager);
        assert_eq!(membership.status, MembershipStatus::Active);
        assert_eq!(membership.role_scope, Some(RoleScope::Team));
        assert_eq!(membership.org_classification, Classification::Secret);
        assert!(membership.permission_overrides.unwrap().allows("billing", "read"));
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("suspended".parse::<MembershipStatus>().unwrap(), MembershipStatus::Suspended);
        assert_eq!(" ACTIVE ".parse::<MembershipStatus>().unwrap(), MembershipStatus::Active);
        assert!("archived".parse::<MembershipStatus>().is_err());
    }
}
