//! Validation, deduplication and priority ordering of a tenant's policy set.

use std::collections::HashMap;

use serde::Serialize;

use crate::{AbacPolicy, NormalizedPolicy};

/// A raw policy that did not survive normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedPolicy {
    pub id: String,
    pub reason: String,
}

/// Normalization output with the drop list, for policy administration.
#[derive(Debug, Clone, Default)]
pub struct NormalizationReport {
    pub policies: Vec<NormalizedPolicy>,
    pub dropped: Vec<DroppedPolicy>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AbacPolicyNormalizer;

impl AbacPolicyNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, raw: &[AbacPolicy]) -> Vec<NormalizedPolicy> {
        self.normalize_with_report(raw).policies
    }

    /// Invalid policies are dropped. Duplicate ids keep the highest priority
    /// (first seen wins a tie). Output is sorted by descending priority, equal
    /// priorities keeping first-seen order.
    pub fn normalize_with_report(&self, raw: &[AbacPolicy]) -> NormalizationReport {
        let mut dropped = Vec::new();
        let mut kept: Vec<NormalizedPolicy> = Vec::with_capacity(raw.len());
        let mut slot_by_id: HashMap<String, usize> = HashMap::new();

        for policy in raw {
            let compiled = match NormalizedPolicy::compile(policy) {
                Ok(compiled) => compiled,
                Err(reason) => {
                    tracing::warn!(policy_id = %policy.id, %reason, "dropping invalid ABAC policy");
                    dropped.push(DroppedPolicy {
                        id: policy.id.clone(),
                        reason,
                    });
                    continue;
                }
            };

            match slot_by_id.get(&compiled.id) {
                Some(&slot) => {
                    let existing = &kept[slot];
                    if compiled.priority > existing.priority {
                        dropped.push(superseded(existing));
                        kept[slot] = compiled;
                    } else {
                        dropped.push(superseded(&compiled));
                    }
                }
                None => {
                    slot_by_id.insert(compiled.id.clone(), kept.len());
                    kept.push(compiled);
                }
            }
        }

        // Stable: ties keep first-seen order.
        kept.sort_by(|a, b| b.priority.cmp(&a.priority));

        NormalizationReport {
            policies: kept,
            dropped,
        }
    }
}

fn superseded(policy: &NormalizedPolicy) -> DroppedPolicy {
    DroppedPolicy {
        id: policy.id.clone(),
        reason: format!("duplicate id superseded (priority {})", policy.priority),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn ids(policies: &[NormalizedPolicy]) -> Vec<&str> {
        policies.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn drops_policies_with_empty_actions_or_resources() {
        let raw = vec![
            AbacPolicy::allow("no-actions", Vec::<String>::new(), ["hr.leave"]),
            AbacPolicy::allow("no-resources", ["read"], Vec::<String>::new()),
            AbacPolicy::new("bad-effect", "maybe", ["read"], ["hr.leave"]),
            AbacPolicy::allow("ok", ["read"], ["hr.leave"]),
        ];

        let report = AbacPolicyNormalizer::new().normalize_with_report(&raw);
        assert_eq!(ids(&report.policies), vec!["ok"]);
        assert_eq!(report.dropped.len(), 3);
    }

    #[test]
    fn duplicate_ids_keep_highest_priority() {
        let raw = vec![
            AbacPolicy::allow("dup", ["read"], ["hr.leave"]).with_priority(1),
            AbacPolicy::deny("dup", ["read"], ["hr.leave"]).with_priority(5),
        ];

        let normalized = AbacPolicyNormalizer::new().normalize(&raw);
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].priority, 5);
    }

    #[test]
    fn duplicate_ids_with_equal_priority_keep_first_seen() {
        let raw = vec![
            AbacPolicy::allow("dup", ["read"], ["hr.leave"]).with_priority(3),
            AbacPolicy::deny("dup", ["read"], ["hr.leave"]).with_priority(3),
        ];

        let normalized = AbacPolicyNormalizer::new().normalize(&raw);
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].effect, crate::Effect::Allow);
    }

    #[test]
    fn equal_priorities_preserve_input_order() {
        let raw = vec![
            AbacPolicy::allow("a", ["read"], ["x"]),
            AbacPolicy::allow("high", ["read"], ["x"]).with_priority(9),
            AbacPolicy::allow("b", ["read"], ["x"]),
            AbacPolicy::allow("c", ["read"], ["x"]),
        ];

        let normalized = AbacPolicyNormalizer::new().normalize(&raw);
        assert_eq!(ids(&normalized), vec!["high", "a", "b", "c"]);
    }

    fn arb_policy() -> impl Strategy<Value = AbacPolicy> {
        (
            "[a-e]",
            prop_oneof![Just("allow"), Just("deny"), Just("audit")],
            prop::collection::vec("[a-z]{1,6}", 0..3),
            prop::collection::vec("[a-z]{1,6}", 0..3),
            -20i64..20,
        )
            .prop_map(|(id, effect, actions, resources, priority)| {
                AbacPolicy::new(id, effect, actions, resources).with_priority(priority)
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: no normalized policy has empty actions/resources or an unknown effect.
        #[test]
        fn normalized_policies_are_always_valid(raw in prop::collection::vec(arb_policy(), 0..16)) {
            let normalized = AbacPolicyNormalizer::new().normalize(&raw);
            for p in &normalized {
                prop_assert!(!p.actions.is_empty());
                prop_assert!(!p.resources.is_empty());
            }
        }

        /// Property: priorities are non-increasing and ids unique.
        #[test]
        fn normalized_policies_are_sorted_and_unique(raw in prop::collection::vec(arb_policy(), 0..16)) {
            let normalized = AbacPolicyNormalizer::new().normalize(&raw);
            for pair in normalized.windows(2) {
                prop_assert!(pair[0].priority >= pair[1].priority);
            }
            let mut seen = std::collections::HashSet::new();
            for p in &normalized {
                prop_assert!(seen.insert(p.id.clone()));
            }
        }

        /// Property: the surviving instance of an id carries the highest valid priority for that id.
        #[test]
        fn surviving_instance_has_max_priority(raw in prop::collection::vec(arb_policy(), 0..16)) {
            let normalized = AbacPolicyNormalizer::new().normalize(&raw);
            for p in &normalized {
                let max = raw
                    .iter()
                    .filter(|r| r.id == p.id && NormalizedPolicy::compile(r).is_ok())
                    .map(|r| r.priority)
                    .max();
                prop_assert_eq!(Some(p.priority), max);
            }
        }
    }
}
