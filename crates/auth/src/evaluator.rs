//! First-match ABAC evaluation over a normalized, priority-ordered policy list.
//!
//! Policies are visited highest priority first and the first one whose
//! action, resource and condition all match decides. A higher-priority allow
//! therefore beats a lower-priority deny and vice versa. When nothing matches
//! the configured [`AbacDefault`] applies.
//!
//! Evaluation is pure: references such as `$subject.userId` are resolved against
//! the subject and resource of each call, never cached.

use std::cmp::Ordering;

use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::{AbacDefault, Effect, NormalizedPolicy, Operand, Operator, Predicate, Side, Subject};

/// Result of evaluation, including which policy (if any) decided it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbacDecision {
    pub allowed: bool,
    /// `None` when the default decision applied.
    pub matched_policy: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AbacEvaluator {
    default: AbacDefault,
}

impl AbacEvaluator {
    pub fn new(default: AbacDefault) -> Self {
        Self { default }
    }

    pub fn evaluate(
        &self,
        policies: &[NormalizedPolicy],
        subject: &Subject,
        action: &str,
        resource_type: &str,
        resource: &Map<String, Value>,
    ) -> bool {
        self.decide(policies, subject, action, resource_type, resource).allowed
    }

    pub fn decide(
        &self,
        policies: &[NormalizedPolicy],
        subject: &Subject,
        action: &str,
        resource_type: &str,
        resource: &Map<String, Value>,
    ) -> AbacDecision {
        let scope = Scope { subject, resource };

        let matched = policies.iter().find(|policy| {
            policy.covers_action(action)
                && policy.covers_resource(resource_type)
                && policy.predicates.iter().all(|p| scope.holds(p))
        });

        let decision = match matched {
            Some(policy) => AbacDecision {
                allowed: policy.effect == Effect::Allow,
                matched_policy: Some(policy.id.clone()),
            },
            None => AbacDecision {
                allowed: self.default.allows(),
                matched_policy: None,
            },
        };

        tracing::debug!(
            user_id = %subject.user_id,
            action,
            resource_type,
            allowed = decision.allowed,
            policy = decision.matched_policy.as_deref().unwrap_or("<default>"),
            "abac decision"
        );

        decision
    }
}

/// Live attribute sources for one evaluation.
struct Scope<'a> {
    subject: &'a Subject,
    resource: &'a Map<String, Value>,
}

impl Scope<'_> {
    fn lookup(&self, side: Side, path: &[String]) -> Option<Value> {
        let (head, rest) = path.split_first()?;
        let root = match side {
            Side::Subject => self.subject.attribute(head)?,
            Side::Resource => self.resource.get(head)?.clone(),
        };
        rest.iter().try_fold(root, |value, segment| value.get(segment.as_str()).cloned())
    }

    /// A predicate with a missing left-hand attribute or unresolvable reference is false.
    fn holds(&self, predicate: &Predicate) -> bool {
        let Some(lhs) = self.lookup(predicate.side, &predicate.field) else {
            return false;
        };
        let rhs = match &predicate.value {
            Operand::Literal(value) => value.clone(),
            Operand::Reference { side, path } => match self.lookup(*side, path) {
                Some(value) => value,
                None => return false,
            },
        };
        apply(predicate.op, &lhs, &rhs)
    }
}

fn apply(op: Operator, lhs: &Value, rhs: &Value) -> bool {
    match op {
        Operator::Eq => same(lhs, rhs),
        Operator::Ne => !same(lhs, rhs),
        Operator::In => rhs.as_array().is_some_and(|set| set.iter().any(|v| same(lhs, v))),
        Operator::NotIn => rhs.as_array().is_some_and(|set| !set.iter().any(|v| same(lhs, v))),
        Operator::Gt => compare(lhs, rhs) == Some(Ordering::Greater),
        Operator::Gte => matches!(compare(lhs, rhs), Some(Ordering::Greater | Ordering::Equal)),
        Operator::Lt => compare(lhs, rhs) == Some(Ordering::Less),
        Operator::Lte => matches!(compare(lhs, rhs), Some(Ordering::Less | Ordering::Equal)),
        Operator::Contains => match (lhs, rhs) {
            (Value::Array(items), needle) => items.iter().any(|v| same(v, needle)),
            (Value::String(haystack), Value::String(needle)) => haystack.contains(needle.as_str()),
            _ => false,
        },
    }
}

/// Equality where `1` and `1.0` are the same number.
fn same(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Number(l), Value::Number(r)) => compare_numbers(l, r) == Some(Ordering::Equal),
        _ => lhs == rhs,
    }
}

fn compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::Number(l), Value::Number(r)) => compare_numbers(l, r),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

/// Integers compare exactly; f64 only when either side is a float.
fn compare_numbers(lhs: &Number, rhs: &Number) -> Option<Ordering> {
    match (integer(lhs), integer(rhs)) {
        (Some(l), Some(r)) => Some(l.cmp(&r)),
        _ => lhs.as_f64()?.partial_cmp(&rhs.as_f64()?),
    }
}

fn integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}
