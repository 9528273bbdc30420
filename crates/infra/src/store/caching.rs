//! Read-through cache in front of a policy store.
//!
//! Policy sets change rarely but are read on every ABAC decision. Writes go
//! through this decorator, so invalidating on `set_policies_for_org` keeps the
//! next read consistent with what was written. A fetch that overlaps a write
//! is returned to its caller but never cached. Writes made directly against
//! the inner store (another process, a migration) are only picked up after
//! [`CachingPolicyStore::invalidate`].

use std::collections::HashMap;
use std::sync::RwLock;

use orgguard_auth::{AbacPolicy, AbacPolicyStore, StoreError};
use orgguard_core::OrgId;

/// `(epoch, per-org generation)`; a fetched set is only cached if this is
/// unchanged between the start of the fetch and the insert.
type Generation = (u64, u64);

#[derive(Debug, Default)]
struct CacheState {
    policies: HashMap<OrgId, Vec<AbacPolicy>>,
    generations: HashMap<OrgId, u64>,
    epoch: u64,
}

impl CacheState {
    fn generation(&self, org_id: OrgId) -> Generation {
        (self.epoch, self.generations.get(&org_id).copied().unwrap_or(0))
    }

    fn invalidate(&mut self, org_id: OrgId) {
        self.policies.remove(&org_id);
        *self.generations.entry(org_id).or_insert(0) += 1;
    }
}

#[derive(Debug)]
pub struct CachingPolicyStore<S> {
    inner: S,
    state: RwLock<CacheState>,
}

impl<S> CachingPolicyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            state: RwLock::new(CacheState::default()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Drop the cached set for one organization and discard in-flight fetches for it.
    pub fn invalidate(&self, org_id: OrgId) {
        if let Ok(mut state) = self.state.write() {
            state.invalidate(org_id);
        }
    }

    pub fn invalidate_all(&self) {
        if let Ok(mut state) = self.state.write() {
            state.policies.clear();
            state.epoch += 1;
        }
    }

    /// Cached set, or the generation to check before caching a fresh fetch.
    fn lookup(&self, org_id: OrgId) -> Result<Vec<AbacPolicy>, Option<Generation>> {
        let Ok(state) = self.state.read() else {
            return Err(None);
        };
        match state.policies.get(&org_id) {
            Some(policies) => Ok(policies.clone()),
            None => Err(Some(state.generation(org_id))),
        }
    }
}

#[async_trait::async_trait]
impl<S> AbacPolicyStore for CachingPolicyStore<S>
where
    S: AbacPolicyStore,
{
    async fn get_policies_for_org(&self, org_id: OrgId) -> Result<Vec<AbacPolicy>, StoreError> {
        let observed = match self.lookup(org_id) {
            Ok(policies) => {
                tracing::trace!(%org_id, "policy cache hit");
                return Ok(policies);
            }
            Err(observed) => observed,
        };

        let policies = self.inner.get_policies_for_org(org_id).await?;

        // A poisoned cache only costs us the memoization.
        if let (Some(observed), Ok(mut state)) = (observed, self.state.write()) {
            if state.generation(org_id) == observed {
                state.policies.insert(org_id, policies.clone());
            } else {
                tracing::trace!(%org_id, "policy set changed during fetch; not caching");
            }
        }
        Ok(policies)
    }

    async fn set_policies_for_org(
        &self,
        org_id: OrgId,
        policies: Vec<AbacPolicy>,
    ) -> Result<(), StoreError> {
        self.invalidate(org_id);
        let result = self.inner.set_policies_for_org(org_id, policies).await;
        self.invalidate(org_id);
        result
    }
}
