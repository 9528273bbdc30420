//! The guard composed with the in-memory stores, the policy cache and the
//! audit outbox, as a composition root would wire it.

use std::sync::Arc;

use orgguard_auth::{
    AbacPolicy, AbacPolicyStore, AuditOutcome, AuthorizationInput, AuthzConfig, AuthzErrorKind,
    Classification, Membership, OrgAccessGuard, PermissionMap, Residency, RoleScope,
};
use orgguard_core::{OrgId, UserId};
use orgguard_infra::{CachingPolicyStore, InMemoryAbacPolicyStore, InMemoryMembershipStore, OutboxAuditSink};

#[tokio::test]
async fn manager_flow_through_infra_collaborators() {
    let org_id = OrgId::new();
    let manager = UserId::new();

    let memberships = Arc::new(InMemoryMembershipStore::new());
    memberships
        .upsert(
            Membership::new(org_id, manager, "manager", Classification::Secret, Residency::new("uk"))
                .with_scope(RoleScope::Team),
        )
        .unwrap();

    let policies = Arc::new(CachingPolicyStore::new(InMemoryAbacPolicyStore::new()));
    let (sink, mut outbox) = OutboxAuditSink::channel();

    let guard = OrgAccessGuard::new(memberships.clone(), policies.clone(), AuthzConfig::default())
        .with_audit_sink(Arc::new(sink));

    let approve = || {
        AuthorizationInput::new(org_id, manager)
            .require(PermissionMap::new().with("hr.leave", ["approve"]))
            .expect_classification(Classification::OfficialSensitive)
            .on("approve", "hr.leave")
    };

    // Default-deny until a policy set exists.
    let err = guard.authorize_with_abac(approve()).await.unwrap_err();
    assert_eq!(err.kind(), AuthzErrorKind::AbacDenied);

    policies
        .set_policies_for_org(
            org_id,
            vec![
                AbacPolicy::deny("frozen-period", ["approve"], ["hr.leave"])
                    .with_priority(100)
                    .when_resource("period", "eq", "FROZEN"),
                AbacPolicy::allow("approvals", ["approve"], ["hr.leave"]).with_priority(10),
            ],
        )
        .await
        .unwrap();

    let ctx = guard.authorize_with_abac(approve()).await.unwrap();
    assert_eq!(ctx.org_id(), org_id);

    let frozen = approve().with_resource_attributes(
        serde_json::json!({ "period": "FROZEN" })
            .as_object()
            .cloned()
            .unwrap(),
    );
    let err = guard.authorize_with_abac(frozen).await.unwrap_err();
    assert_eq!(err.kind(), AuthzErrorKind::AbacDenied);

    let outcomes: Vec<_> = outbox.drain().into_iter().map(|e| e.outcome).collect();
    assert_eq!(
        outcomes,
        vec![AuditOutcome::Denied, AuditOutcome::Allowed, AuditOutcome::Denied]
    );
}

#[tokio::test]
async fn removed_membership_is_not_found() {
    let org_id = OrgId::new();
    let user_id = UserId::new();
    let memberships = Arc::new(InMemoryMembershipStore::new());
    memberships
        .upsert(Membership::new(org_id, user_id, "viewer", Classification::Official, Residency::new("uk")))
        .unwrap();

    let guard = OrgAccessGuard::new(
        memberships.clone(),
        Arc::new(InMemoryAbacPolicyStore::new()),
        AuthzConfig::default(),
    );

    assert!(guard.authorize(AuthorizationInput::new(org_id, user_id)).await.is_ok());

    memberships.remove(org_id, user_id).unwrap();
    let err = guard.authorize(AuthorizationInput::new(org_id, user_id)).await.unwrap_err();
    assert!(err.is_not_found());
}
