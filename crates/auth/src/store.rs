//! Collaborator boundaries the engine depends on.
//!
//! The engine only sees these traits; relational, in-memory and caching
//! implementations live in `orgguard-infra`.

use std::sync::Arc;

use orgguard_core::{OrgId, UserId};

use crate::{AbacPolicy, AuditEvent, Membership, StoreError};

/// Read access to organization memberships.
#[async_trait::async_trait]
pub trait MembershipStore: Send + Sync {
    async fn find_membership(
        &self,
        org_id: OrgId,
        user_id: UserId,
    ) -> Result<Option<Membership>, StoreError>;
}

/// Per-organization ABAC policy sets.
///
/// The write path belongs to policy administration; the engine only reads.
#[async_trait::async_trait]
pub trait AbacPolicyStore: Send + Sync {
    async fn get_policies_for_org(&self, org_id: OrgId) -> Result<Vec<AbacPolicy>, StoreError>;

    async fn set_policies_for_org(
        &self,
        org_id: OrgId,
        policies: Vec<AbacPolicy>,
    ) -> Result<(), StoreError>;
}

/// Best-effort audit side channel.
///
/// Implementations must not block and must not fail the caller; delivery
/// problems are theirs to log.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

#[async_trait::async_trait]
impl<S> MembershipStore for Arc<S>
where
    S: MembershipStore + ?Sized,
{
    async fn find_membership(
        &self,
        org_id: OrgId,
        user_id: UserId,
    ) -> Result<Option<Membership>, StoreError> {
        (**self).find_membership(org_id, user_id).await
    }
}

#[async_trait::async_trait]
impl<S> AbacPolicyStore for Arc<S>
where
    S: AbacPolicyStore + ?Sized,
{
    async fn get_policies_for_org(&self, org_id: OrgId) -> Result<Vec<AbacPolicy>, StoreError> {
        (**self).get_policies_for_org(org_id).await
    }

    async fn set_policies_for_org(
        &self,
        org_id: OrgId,
        policies: Vec<AbacPolicy>,
    ) -> Result<(), StoreError> {
        (**self).set_policies_for_org(org_id, policies).await
    }
}

impl<S> AuditSink for Arc<S>
where
    S: AuditSink + ?Sized,
{
    fn record(&self, event: AuditEvent) {
        (**self).record(event)
    }
}
