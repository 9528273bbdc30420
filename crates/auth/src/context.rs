use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{Map, Value};

use orgguard_core::{CorrelationId, OrgId, UserId};

use crate::{Classification, PermissionMap, Residency, RoleKey, TenantAttributes, TenantExpectation};

/// Attribute key under which classification is exposed to ABAC predicates.
pub const CLASSIFICATION_ATTR: &str = "classification";
/// Attribute key under which residency is exposed to ABAC predicates.
pub const RESIDENCY_ATTR: &str = "residency";

/// The acting identity plus contextual attributes, as seen by ABAC predicates.
#[derive(Debug, Clone, PartialEq)]
pub struct Subject {
    pub org_id: OrgId,
    pub user_id: UserId,
    pub roles: BTreeSet<String>,
    pub attributes: Map<String, Value>,
}

impl Subject {
    pub fn new(org_id: OrgId, user_id: UserId) -> Self {
        Self {
            org_id,
            user_id,
            roles: BTreeSet::new(),
            attributes: Map::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Top-level attribute lookup. `orgId`, `userId` and `roles` are built in.
    pub fn attribute(&self, key: &str) -> Option<Value> {
        match key {
            "orgId" => Some(Value::String(self.org_id.to_string())),
            "userId" => Some(Value::String(self.user_id.to_string())),
            "roles" => Some(Value::Array(
                self.roles.iter().cloned().map(Value::String).collect(),
            )),
            _ => self.attributes.get(key).cloned(),
        }
    }
}

/// Outcome of a successful authorization.
///
/// Immutable and request-scoped: create per privileged operation, hand to
/// downstream logic, drop at request end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationContext {
    org_id: OrgId,
    user_id: UserId,
    role_key: RoleKey,
    role_name: Option<String>,
    permissions: PermissionMap,
    data_residency: Residency,
    data_classification: Classification,
    correlation_id: CorrelationId,
}

impl AuthorizationContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        org_id: OrgId,
        user_id: UserId,
        role_key: RoleKey,
        role_name: Option<String>,
        permissions: PermissionMap,
        data_residency: Residency,
        data_classification: Classification,
        correlation_id: CorrelationId,
    ) -> Self {
        Self {
            org_id,
            user_id,
            role_key,
            role_name,
            permissions,
            data_residency,
            data_classification,
            correlation_id,
        }
    }

    pub fn org_id(&self) -> OrgId {
        self.org_id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn role_key(&self) -> RoleKey {
        self.role_key
    }

    pub fn role_name(&self) -> Option<&str> {
        self.role_name.as_deref()
    }

    pub fn permissions(&self) -> &PermissionMap {
        &self.permissions
    }

    pub fn data_residency(&self) -> &Residency {
        &self.data_residency
    }

    pub fn data_classification(&self) -> Classification {
        self.data_classification
    }

    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    pub fn tenant_attributes(&self) -> TenantAttributes {
        TenantAttributes {
            classification: self.data_classification,
            residency: self.data_residency.clone(),
        }
    }

    /// ABAC subject: identity, role key and name, caller attributes, and the
    /// context's classification/residency (which override caller values).
    pub fn subject(&self, extra: Option<&Map<String, Value>>) -> Subject {
        let mut subject = Subject::new(self.org_id, self.user_id).with_role(self.role_key.as_str());
        if let Some(name) = &self.role_name {
            subject.roles.insert(name.clone());
        }
        if let Some(extra) = extra {
            subject.attributes.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        subject
            .with_attribute(CLASSIFICATION_ATTR, self.data_classification.as_str())
            .with_attribute(RESIDENCY_ATTR, self.data_residency.as_str())
    }

    /// Resource attributes with classification/residency filled in from the
    /// context when the caller did not describe them.
    pub fn resource_attributes(&self, supplied: Option<&Map<String, Value>>) -> Map<String, Value> {
        let mut attrs = supplied.cloned().unwrap_or_default();
        attrs
            .entry(CLASSIFICATION_ATTR)
            .or_insert_with(|| Value::String(self.data_classification.as_str().to_string()));
        attrs
            .entry(RESIDENCY_ATTR)
            .or_insert_with(|| Value::String(self.data_residency.as_str().to_string()));
        attrs
    }
}

/// Request to authorize a privileged operation.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationInput {
    pub org_id: OrgId,
    pub user_id: UserId,
    /// Every resource/action pair must be granted.
    pub required_permissions: Option<PermissionMap>,
    /// At least one profile must be granted in full.
    pub required_any_permissions: Option<Vec<PermissionMap>>,
    pub expected_classification: Option<Classification>,
    pub expected_residency: Option<Residency>,
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub resource_attributes: Option<Map<String, Value>>,
    pub subject_attributes: Option<Map<String, Value>>,
    /// Reused for the context when set; otherwise a fresh id is generated.
    pub correlation_id: Option<CorrelationId>,
}

impl AuthorizationInput {
    pub fn new(org_id: OrgId, user_id: UserId) -> Self {
        Self {
            org_id,
            user_id,
            required_permissions: None,
            required_any_permissions: None,
            expected_classification: None,
            expected_residency: None,
            action: None,
            resource_type: None,
            resource_attributes: None,
            subject_attributes: None,
            correlation_id: None,
        }
    }

    pub fn require(mut self, permissions: PermissionMap) -> Self {
        self.required_permissions = Some(permissions);
        self
    }

    pub fn require_any(mut self, profiles: Vec<PermissionMap>) -> Self {
        self.required_any_permissions = Some(profiles);
        self
    }

    pub fn expect_classification(mut self, classification: Classification) -> Self {
        self.expected_classification = Some(classification);
        self
    }

    pub fn expect_residency(mut self, residency: Residency) -> Self {
        self.expected_residency = Some(residency);
        self
    }

    pub fn on(mut self, action: impl Into<String>, resource_type: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self.resource_type = Some(resource_type.into());
        self
    }

    pub fn with_resource_attributes(mut self, attributes: Map<String, Value>) -> Self {
        self.resource_attributes = Some(attributes);
        self
    }

    pub fn with_subject_attributes(mut self, attributes: Map<String, Value>) -> Self {
        self.subject_attributes = Some(attributes);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    pub fn tenant_expectation(&self) -> TenantExpectation {
        TenantExpectation {
            classification: self.expected_classification,
            residency: self.expected_residency.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn context() -> AuthorizationContext {
        AuthorizationContext::new(
            OrgId::new(),
            UserId::new(),
            RoleKey::Manager,
            Some("Shift Lead".into()),
            PermissionMap::new(),
            Residency::new("uk"),
            Classification::OfficialSensitive,
            CorrelationId::new(),
        )
    }

    #[test]
    fn subject_carries_roles_and_tenant_attributes() {
        let ctx = context();
        let extra = json!({ "department": "ops", "classification": "TOP_SECRET" });
        let subject = ctx.subject(extra.as_object());

        assert!(subject.roles.contains("MANAGER"));
        assert!(subject.roles.contains("Shift Lead"));
        assert_eq!(subject.attribute("department"), Some(json!("ops")));
        assert_eq!(subject.attribute("classification"), Some(json!("OFFICIAL_SENSITIVE")));
        assert_eq!(subject.attribute("userId"), Some(json!(ctx.user_id().to_string())));
    }

    #[test]
    fn caller_resource_attributes_win_over_context_defaults() {
        let ctx = context();
        let supplied = json!({ "residency": "eu", "status": "OPEN" });
        let attrs = ctx.resource_attributes(supplied.as_object());

        assert_eq!(attrs.get("residency"), Some(&json!("eu")));
        assert_eq!(attrs.get("classification"), Some(&json!("OFFICIAL_SENSITIVE")));
        assert_eq!(attrs.get("status"), Some(&json!("OPEN")));
    }
}
