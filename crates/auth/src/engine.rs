//! Authorization pipeline: tenant constraints, then RBAC, then ABAC.
//!
//! Each stage fails fast with its own error kind; nothing is retried or
//! partially applied.

use std::sync::Arc;

use crate::{
    AbacEvaluator, AbacPolicyNormalizer, AbacPolicyStore, AuthorizationContext, AuthorizationInput,
    AuthzError, PermissionMap, TenantConstraintGuard,
};

pub struct AuthorizationEngine {
    policies: Arc<dyn AbacPolicyStore>,
    tenant_guard: TenantConstraintGuard,
    normalizer: AbacPolicyNormalizer,
    evaluator: AbacEvaluator,
}

impl AuthorizationEngine {
    pub fn new(policies: Arc<dyn AbacPolicyStore>, evaluator: AbacEvaluator) -> Self {
        Self {
            policies,
            tenant_guard: TenantConstraintGuard::new(),
            normalizer: AbacPolicyNormalizer::new(),
            evaluator,
        }
    }

    /// Tenant constraints and RBAC only.
    pub fn authorize_rbac(
        &self,
        input: &AuthorizationInput,
        context: &AuthorizationContext,
    ) -> Result<(), AuthzError> {
        if input.org_id != context.org_id() || input.user_id != context.user_id() {
            return Err(AuthzError::invalid_input(
                "input identity does not match the authorization context",
            ));
        }

        self.tenant_guard
            .assert_constraints(&input.tenant_expectation(), &context.tenant_attributes())?;

        check_rbac(input, context.permissions())
    }

    /// Full pipeline. The ABAC stage runs only when both `action` and
    /// `resource_type` are present; the policy set is fetched fresh.
    pub async fn authorize(
        &self,
        input: &AuthorizationInput,
        context: &AuthorizationContext,
    ) -> Result<(), AuthzError> {
        self.authorize_rbac(input, context)?;

        let (Some(action), Some(resource_type)) =
            (input.action.as_deref(), input.resource_type.as_deref())
        else {
            return Ok(());
        };
        if action.trim().is_empty() || resource_type.trim().is_empty() {
            return Err(AuthzError::invalid_input("action and resource type must be non-empty"));
        }

        let raw = self.policies.get_policies_for_org(context.org_id()).await?;
        let policies = self.normalizer.normalize(&raw);

        let subject = context.subject(input.subject_attributes.as_ref());
        let resource = context.resource_attributes(input.resource_attributes.as_ref());

        let decision = self
            .evaluator
            .decide(&policies, &subject, action, resource_type, &resource);

        if decision.allowed {
            Ok(())
        } else {
            Err(AuthzError::AbacDenied {
                action: action.to_string(),
                resource_type: resource_type.to_string(),
                policy_id: decision.matched_policy,
            })
        }
    }
}

/// All-of and any-of RBAC requirements against the granted map.
///
/// No requirement at all is a pass.
pub fn check_rbac(input: &AuthorizationInput, granted: &PermissionMap) -> Result<(), AuthzError> {
    if let Some(required) = &input.required_permissions {
        validate_profile(required)?;
        let missing = granted.missing(required);
        if !missing.is_empty() {
            return Err(AuthzError::RbacDenied { missing });
        }
    }

    if let Some(profiles) = &input.required_any_permissions {
        if profiles.is_empty() {
            return Err(AuthzError::invalid_input(
                "required_any_permissions must list at least one profile",
            ));
        }
        for profile in profiles {
            validate_profile(profile)?;
        }

        if !profiles.iter().any(|profile| granted.satisfies(profile)) {
            // One entry per alternative profile.
            let missing = profiles
                .iter()
                .map(|profile| granted.missing(profile).join(" + "))
                .collect();
            return Err(AuthzError::RbacDenied { missing });
        }
    }

    Ok(())
}

fn validate_profile(profile: &PermissionMap) -> Result<(), AuthzError> {
    for (resource, actions) in profile.iter() {
        if resource.trim().is_empty() {
            return Err(AuthzError::invalid_input("empty resource kind in permission requirement"));
        }
        if actions.is_empty() {
            return Err(AuthzError::invalid_input(format!(
                "no actions listed for '{resource}' in permission requirement"
            )));
        }
        if actions.iter().any(|a| a.trim().is_empty()) {
            return Err(AuthzError::invalid_input(format!(
                "empty action name for '{resource}' in permission requirement"
            )));
        }
    }
    Ok(())
}
