use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use orgguard_core::{CorrelationId, OrgId, UserId};

use crate::AuthzErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditOutcome {
    Allowed,
    Denied,
}

/// Record of one authorization decision.
///
/// Emitted by the guard; durable storage is the sink's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub org_id: OrgId,
    pub user_id: UserId,
    pub correlation_id: CorrelationId,
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub outcome: AuditOutcome,
    /// Set when `outcome` is `Denied`.
    pub error_kind: Option<AuthzErrorKind>,
}

impl AuditEvent {
    pub fn allowed(org_id: OrgId, user_id: UserId, correlation_id: CorrelationId) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            occurred_at: Utc::now(),
            org_id,
            user_id,
            correlation_id,
            action: None,
            resource_type: None,
            outcome: AuditOutcome::Allowed,
            error_kind: None,
        }
    }

    pub fn denied(
        org_id: OrgId,
        user_id: UserId,
        correlation_id: CorrelationId,
        kind: AuthzErrorKind,
    ) -> Self {
        Self {
            outcome: AuditOutcome::Denied,
            error_kind: Some(kind),
            ..Self::allowed(org_id, user_id, correlation_id)
        }
    }

    pub fn for_target(mut self, action: Option<&str>, resource_type: Option<&str>) -> Self {
        self.action = action.map(str::to_string);
        self.resource_type = resource_type.map(str::to_string);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denied_event_serializes_kind() {
        let event = AuditEvent::denied(
            OrgId::new(),
            UserId::new(),
            CorrelationId::new(),
            AuthzErrorKind::AbacDenied,
        )
        .for_target(Some("update"), Some("hr.time-entry"));

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["outcome"], "DENIED");
        assert_eq!(json["errorKind"], "abac_denied");
        assert_eq!(json["resourceType"], "hr.time-entry");
    }
}
