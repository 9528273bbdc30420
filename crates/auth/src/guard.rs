//! Entry point for privileged operations.
//!
//! Loads the caller's membership, resolves permissions, builds the
//! request-scoped [`AuthorizationContext`] and runs the engine. Construct one
//! at the composition root and share it; it holds no per-request state.

use std::sync::Arc;

use tracing::instrument;

use orgguard_core::CorrelationId;

use crate::{
    AbacEvaluator, AbacPolicyStore, AuditEvent, AuditSink, AuthorizationContext,
    AuthorizationEngine, AuthorizationInput, AuthzConfig, AuthzError, MembershipStore,
    PermissionResolutionService,
};

pub struct OrgAccessGuard {
    memberships: Arc<dyn MembershipStore>,
    resolver: PermissionResolutionService,
    engine: AuthorizationEngine,
    audit: Option<Arc<dyn AuditSink>>,
    config: AuthzConfig,
}

impl OrgAccessGuard {
    pub fn new(
        memberships: Arc<dyn MembershipStore>,
        policies: Arc<dyn AbacPolicyStore>,
        config: AuthzConfig,
    ) -> Self {
        Self {
            memberships,
            resolver: PermissionResolutionService::default(),
            engine: AuthorizationEngine::new(policies, AbacEvaluator::new(config.abac_default)),
            audit: None,
            config,
        }
    }

    pub fn with_resolver(mut self, resolver: PermissionResolutionService) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Tenant constraints and RBAC.
    #[instrument(level = "debug", skip_all, fields(org_id = %input.org_id, user_id = %input.user_id))]
    pub async fn authorize(&self, input: AuthorizationInput) -> Result<AuthorizationContext, AuthzError> {
        let correlation_id = input.correlation_id.unwrap_or_default();
        let result = match self.load_context(&input, correlation_id).await {
            Ok(context) => self.engine.authorize_rbac(&input, &context).map(|()| context),
            Err(err) => Err(err),
        };
        self.emit(&input, correlation_id, &result, false);
        result
    }

    /// Tenant constraints, RBAC and ABAC (when `action` and `resource_type` are set).
    #[instrument(
        level = "debug",
        skip_all,
        fields(
            org_id = %input.org_id,
            user_id = %input.user_id,
            action = input.action.as_deref().unwrap_or(""),
            resource_type = input.resource_type.as_deref().unwrap_or(""),
        )
    )]
    pub async fn authorize_with_abac(
        &self,
        input: AuthorizationInput,
    ) -> Result<AuthorizationContext, AuthzError> {
        let correlation_id = input.correlation_id.unwrap_or_default();
        let result = match self.load_context(&input, correlation_id).await {
            Ok(context) => self.engine.authorize(&input, &context).await.map(|()| context),
            Err(err) => Err(err),
        };
        self.emit(&input, correlation_id, &result, true);
        result
    }

    async fn load_context(
        &self,
        input: &AuthorizationInput,
        correlation_id: CorrelationId,
    ) -> Result<AuthorizationContext, AuthzError> {
        let membership = self
            .memberships
            .find_membership(input.org_id, input.user_id)
            .await?
            .ok_or(AuthzError::MembershipNotFound {
                org_id: input.org_id,
                user_id: input.user_id,
            })?;

        if !membership.status.is_active() {
            tracing::warn!(status = %membership.status, "membership not active");
            return Err(AuthzError::MembershipInactive {
                status: membership.status,
            });
        }

        let permissions = self.resolver.resolve(&membership);

        Ok(AuthorizationContext::new(
            membership.org_id,
            membership.user_id,
            membership.role(),
            membership.role_name,
            permissions,
            membership.org_residency,
            membership.org_classification,
            correlation_id,
        ))
    }

    fn emit(
        &self,
        input: &AuthorizationInput,
        correlation_id: CorrelationId,
        result: &Result<AuthorizationContext, AuthzError>,
        abac: bool,
    ) {
        match result {
            Ok(_) => tracing::debug!(%correlation_id, "authorized"),
            Err(err) => tracing::debug!(%correlation_id, kind = ?err.kind(), %err, "authorization failed"),
        }

        if !self.config.audit_enabled {
            return;
        }
        let Some(sink) = &self.audit else {
            return;
        };

        let event = match result {
            Ok(_) => AuditEvent::allowed(input.org_id, input.user_id, correlation_id),
            Err(err) => AuditEvent::denied(input.org_id, input.user_id, correlation_id, err.kind()),
        };
        // The target is only meaningful when the ABAC stage was asked to run.
        let event = if abac {
            event.for_target(input.action.as_deref(), input.resource_type.as_deref())
        } else {
            event
        };
        sink.record(event);
    }
}
