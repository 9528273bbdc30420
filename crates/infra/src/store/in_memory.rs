use std::collections::HashMap;
use std::sync::RwLock;

use orgguard_auth::{AbacPolicy, AbacPolicyStore, Membership, MembershipStore, StoreError};
use orgguard_core::{OrgId, UserId};

/// In-memory membership store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryMembershipStore {
    inner: RwLock<HashMap<(OrgId, UserId), Membership>>,
}

impl InMemoryMembershipStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the membership for its `(org_id, user_id)` pair.
    pub fn upsert(&self, membership: Membership) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        map.insert((membership.org_id, membership.user_id), membership);
        Ok(())
    }

    pub fn remove(&self, org_id: OrgId, user_id: UserId) -> Result<Option<Membership>, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        Ok(map.remove(&(org_id, user_id)))
    }

    pub fn list_for_org(&self, org_id: OrgId) -> Result<Vec<Membership>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(map
            .iter()
            .filter_map(|((org, _), m)| if *org == org_id { Some(m.clone()) } else { None })
            .collect())
    }
}

#[async_trait::async_trait]
impl MembershipStore for InMemoryMembershipStore {
    async fn find_membership(
        &self,
        org_id: OrgId,
        user_id: UserId,
    ) -> Result<Option<Membership>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(map.get(&(org_id, user_id)).cloned())
    }
}

/// In-memory per-organization policy sets.
///
/// Stores policies exactly as given; normalization happens at evaluation time.
#[derive(Debug, Default)]
pub struct InMemoryAbacPolicyStore {
    inner: RwLock<HashMap<OrgId, Vec<AbacPolicy>>>,
}

impl InMemoryAbacPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl AbacPolicyStore for InMemoryAbacPolicyStore {
    async fn get_policies_for_org(&self, org_id: OrgId) -> Result<Vec<AbacPolicy>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(map.get(&org_id).cloned().unwrap_or_default())
    }

    async fn set_policies_for_org(
        &self,
        org_id: OrgId,
        policies: Vec<AbacPolicy>,
    ) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        if policies.is_empty() {
            map.remove(&org_id);
        } else {
            map.insert(org_id, policies);
        }
        Ok(())
    }
}
