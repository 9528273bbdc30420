//! ABAC policy model: the stored (raw) shape and the compiled shape evaluated at runtime.

use core::str::FromStr;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wildcard entry for a policy's `actions` or `resources`.
pub const WILDCARD: &str = "*";

const SUBJECT_REF: &str = "$subject";
const RESOURCE_REF: &str = "$resource";

/// A policy as written by policy administration and held by the policy store.
///
/// Nothing here is validated; see [`crate::AbacPolicyNormalizer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbacPolicy {
    pub id: String,
    /// `"allow"` or `"deny"`.
    pub effect: String,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(default)]
    pub priority: i64,
}

/// Attribute predicates on the subject and/or the resource. All must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<BTreeMap<String, PredicateSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<BTreeMap<String, PredicateSpec>>,
}

/// `{ op, value }` where `value` is a literal or a `$subject.<path>` / `$resource.<path>` reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredicateSpec {
    pub op: String,
    pub value: Value,
}

impl AbacPolicy {
    pub fn new<A, R>(id: impl Into<String>, effect: impl Into<String>, actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            id: id.into(),
            effect: effect.into(),
            actions: actions.into_iter().map(Into::into).collect(),
            resources: resources.into_iter().map(Into::into).collect(),
            condition: None,
            priority: 0,
        }
    }

    pub fn allow<A, R>(id: impl Into<String>, actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self::new(id, "allow", actions, resources)
    }

    pub fn deny<A, R>(id: impl Into<String>, actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self::new(id, "deny", actions, resources)
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn when_subject(mut self, field: impl Into<String>, op: impl Into<String>, value: impl Into<Value>) -> Self {
        self.condition
            .get_or_insert_with(Condition::default)
            .subject
            .get_or_insert_with(BTreeMap::new)
            .insert(field.into(), PredicateSpec { op: op.into(), value: value.into() });
        self
    }

    pub fn when_resource(mut self, field: impl Into<String>, op: impl Into<String>, value: impl Into<Value>) -> Self {
        self.condition
            .get_or_insert_with(Condition::default)
            .resource
            .get_or_insert_with(BTreeMap::new)
            .insert(field.into(), PredicateSpec { op: op.into(), value: value.into() });
        self
    }
}

// ---------- compiled form ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
    Deny,
}

impl FromStr for Effect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow" => Ok(Effect::Allow),
            "deny" => Ok(Effect::Deny),
            other => Err(format!("unknown effect '{other}'")),
        }
    }
}

/// Which side of the evaluation context an attribute lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Subject,
    Resource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    In,
    NotIn,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eq" => Ok(Operator::Eq),
            "ne" | "neq" => Ok(Operator::Ne),
            "in" => Ok(Operator::In),
            "not_in" | "nin" => Ok(Operator::NotIn),
            "gt" => Ok(Operator::Gt),
            "gte" => Ok(Operator::Gte),
            "lt" => Ok(Operator::Lt),
            "lte" => Ok(Operator::Lte),
            "contains" => Ok(Operator::Contains),
            other => Err(format!("unsupported operator '{other}'")),
        }
    }
}

/// Right-hand side of a predicate, parsed once at normalization time.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Value),
    /// Resolved against the live subject/resource on every evaluation.
    Reference { side: Side, path: Vec<String> },
}

impl Operand {
    pub fn parse(value: &Value) -> Result<Self, String> {
        let Value::String(s) = value else {
            return Ok(Operand::Literal(value.clone()));
        };

        let (side, rest) = if let Some(rest) = s.strip_prefix(SUBJECT_REF) {
            (Side::Subject, rest)
        } else if let Some(rest) = s.strip_prefix(RESOURCE_REF) {
            (Side::Resource, rest)
        } else {
            return Ok(Operand::Literal(value.clone()));
        };

        // "$subjectivity" is a literal, "$subject" alone or "$subject." is malformed.
        if !rest.is_empty() && !rest.starts_with('.') {
            return Ok(Operand::Literal(value.clone()));
        }
        let path = parse_path(rest.strip_prefix('.').unwrap_or(""))
            .ok_or_else(|| format!("malformed reference '{s}'"))?;

        Ok(Operand::Reference { side, path })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub side: Side,
    pub field: Vec<String>,
    pub op: Operator,
    pub value: Operand,
}

impl Predicate {
    pub fn compile(side: Side, field: &str, spec: &PredicateSpec) -> Result<Self, String> {
        let path = parse_path(field).ok_or_else(|| format!("malformed attribute field '{field}'"))?;
        Ok(Self {
            side,
            field: path,
            op: spec.op.parse()?,
            value: Operand::parse(&spec.value)?,
        })
    }
}

/// A validated policy, ready for evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPolicy {
    pub id: String,
    pub effect: Effect,
    pub actions: Vec<String>,
    pub resources: Vec<String>,
    /// Conjunction; empty means unconditional.
    pub predicates: Vec<Predicate>,
    pub priority: i64,
}

impl NormalizedPolicy {
    /// Validate and compile a raw policy.
    pub fn compile(raw: &AbacPolicy) -> Result<Self, String> {
        if raw.id.trim().is_empty() {
            return Err("empty id".to_string());
        }
        if raw.actions.is_empty() {
            return Err("no actions".to_string());
        }
        if raw.resources.is_empty() {
            return Err("no resources".to_string());
        }
        let effect: Effect = raw.effect.parse()?;

        let mut predicates = Vec::new();
        if let Some(condition) = &raw.condition {
            for (side, specs) in [(Side::Subject, &condition.subject), (Side::Resource, &condition.resource)] {
                for (field, spec) in specs.iter().flatten() {
                    predicates.push(Predicate::compile(side, field, spec)?);
                }
            }
        }

        Ok(Self {
            id: raw.id.clone(),
            effect,
            actions: raw.actions.clone(),
            resources: raw.resources.clone(),
            predicates,
            priority: raw.priority,
        })
    }

    pub fn covers_action(&self, action: &str) -> bool {
        self.actions.iter().any(|a| a == action || a == WILDCARD)
    }

    pub fn covers_resource(&self, resource_type: &str) -> bool {
        self.resources.iter().any(|r| r == resource_type || r == WILDCARD)
    }
}

fn parse_path(raw: &str) -> Option<Vec<String>> {
    let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return None;
    }
    Some(segments)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn references_are_parsed_into_side_and_path() {
        assert_eq!(
            Operand::parse(&json!("$subject.userId")).unwrap(),
            Operand::Reference { side: Side::Subject, path: vec!["userId".into()] }
        );
        assert_eq!(
            Operand::parse(&json!("$resource.owner.id")).unwrap(),
            Operand::Reference { side: Side::Resource, path: vec!["owner".into(), "id".into()] }
        );
    }

    #[test]
    fn non_reference_values_stay_literal() {
        assert_eq!(Operand::parse(&json!("BLOCKED")).unwrap(), Operand::Literal(json!("BLOCKED")));
        assert_eq!(Operand::parse(&json!(42)).unwrap(), Operand::Literal(json!(42)));
        assert_eq!(Operand::parse(&json!("$subjectivity")).unwrap(), Operand::Literal(json!("$subjectivity")));
    }

    #[test]
    fn malformed_references_are_rejected() {
        assert!(Operand::parse(&json!("$subject")).is_err());
        assert!(Operand::parse(&json!("$subject.")).is_err());
        assert!(Operand::parse(&json!("$resource.a..b")).is_err());
    }

    #[test]
    fn compile_rejects_unknown_operator() {
        let raw = AbacPolicy::allow("p", ["read"], ["hr.leave"]).when_resource("status", "matches", "OPEN");
        assert!(NormalizedPolicy::compile(&raw).unwrap_err().contains("unsupported operator"));
    }

    #[test]
    fn deserializes_stored_policy() {
        let raw: AbacPolicy = serde_json::from_value(json!({
            "id": "owner-only",
            "effect": "allow",
            "actions": ["read"],
            "resources": ["hr.time-entry"],
            "condition": { "resource": { "ownerId": { "op": "eq", "value": "$subject.userId" } } }
        }))
        .unwrap();

        assert_eq!(raw.priority, 0);
        let compiled = NormalizedPolicy::compile(&raw).unwrap();
        assert_eq!(compiled.effect, Effect::Allow);
        assert_eq!(compiled.predicates.len(), 1);
        assert_eq!(compiled.predicates[0].side, Side::Resource);
        assert_eq!(compiled.predicates[0].field, vec!["ownerId".to_string()]);
    }
}
