//! Authorization failure taxonomy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use orgguard_core::{OrgId, UserId};

use crate::{Classification, MembershipStatus, Residency};

/// Failure raised by a collaborator store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Stored data could not be decoded into the expected shape.
    #[error("corrupt stored data: {0}")]
    Corrupt(String),

    #[error("lock poisoned")]
    LockPoisoned,
}

/// Authorization failure.
///
/// Every variant keeps its kind all the way to the caller; the boundary layer
/// maps kinds to outcomes (not-found, forbidden, bad request).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("no membership for user {user_id} in organization {org_id}")]
    MembershipNotFound { org_id: OrgId, user_id: UserId },

    #[error("membership is {status}, not active")]
    MembershipInactive { status: MembershipStatus },

    #[error("classification {actual} is below required {required}")]
    ClassificationInsufficient {
        required: Classification,
        actual: Classification,
    },

    #[error("data residency mismatch: expected '{expected}', found '{actual}'")]
    ResidencyMismatch { expected: Residency, actual: Residency },

    #[error("forbidden: missing permission(s) {}", missing.join(", "))]
    RbacDenied { missing: Vec<String> },

    #[error("forbidden: policy denied '{action}' on '{resource_type}'")]
    AbacDenied {
        action: String,
        resource_type: String,
        /// Policy that produced the deny, `None` when the default decision applied.
        policy_id: Option<String>,
    },

    #[error("invalid authorization input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Stable, serializable kind of an [`AuthzError`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthzErrorKind {
    MembershipNotFound,
    MembershipInactive,
    ClassificationInsufficient,
    ResidencyMismatch,
    RbacDenied,
    AbacDenied,
    InvalidInput,
    Store,
}

impl AuthzError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn kind(&self) -> AuthzErrorKind {
        match self {
            AuthzError::MembershipNotFound { .. } => AuthzErrorKind::MembershipNotFound,
            AuthzError::MembershipInactive { .. } => AuthzErrorKind::MembershipInactive,
            AuthzError::ClassificationInsufficient { .. } => {
                AuthzErrorKind::ClassificationInsufficient
            }
            AuthzError::ResidencyMismatch { .. } => AuthzErrorKind::ResidencyMismatch,
            AuthzError::RbacDenied { .. } => AuthzErrorKind::RbacDenied,
            AuthzError::AbacDenied { .. } => AuthzErrorKind::AbacDenied,
            AuthzError::InvalidInput(_) => AuthzErrorKind::InvalidInput,
            AuthzError::Store(_) => AuthzErrorKind::Store,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == AuthzErrorKind::MembershipNotFound
    }

    /// Denials the boundary reports as "forbidden".
    pub fn is_authorization_failure(&self) -> bool {
        matches!(
            self.kind(),
            AuthzErrorKind::MembershipInactive
                | AuthzErrorKind::ClassificationInsufficient
                | AuthzErrorKind::ResidencyMismatch
                | AuthzErrorKind::RbacDenied
                | AuthzErrorKind::AbacDenied
        )
    }

    pub fn is_invalid_input(&self) -> bool {
        self.kind() == AuthzErrorKind::InvalidInput
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinguishable() {
        let not_found = AuthzError::MembershipNotFound {
            org_id: OrgId::new(),
            user_id: UserId::new(),
        };
        let denied = AuthzError::AbacDenied {
            action: "update".into(),
            resource_type: "hr.time-entry".into(),
            policy_id: Some("deny-blocked".into()),
        };

        assert!(not_found.is_not_found());
        assert!(!not_found.is_authorization_failure());
        assert!(denied.is_authorization_failure());
        assert!(AuthzError::invalid_input("bad").is_invalid_input());
    }

    #[test]
    fn rbac_message_lists_missing_pairs() {
        let err = AuthzError::RbacDenied {
            missing: vec!["hr.leave:approve".into(), "billing:read".into()],
        };
        assert_eq!(
            err.to_string(),
            "forbidden: missing permission(s) hr.leave:approve, billing:read"
        );
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&AuthzErrorKind::ClassificationInsufficient).unwrap();
        assert_eq!(json, "\"classification_insufficient\"");
    }
}
