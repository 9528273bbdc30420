use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Action name that grants every action on a resource-kind.
pub const WILDCARD_ACTION: &str = "*";

/// Effective RBAC grants for one subject in one organization.
///
/// Maps a resource-kind (e.g. `"hr.time-entry"`) to the set of actions allowed
/// on it. Backed by ordered collections so iteration and serialization are
/// deterministic; semantically the map is unordered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionMap(BTreeMap<String, BTreeSet<String>>);

impl PermissionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style grant, handy for templates and tests.
    pub fn with<I, S>(mut self, resource: impl Into<String>, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.grant(resource, actions);
        self
    }

    /// Add actions to a resource-kind (union with anything already granted).
    pub fn grant<I, S>(&mut self, resource: impl Into<String>, actions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .entry(resource.into())
            .or_default()
            .extend(actions.into_iter().map(Into::into));
    }

    /// Replace the action set of a resource-kind.
    ///
    /// An empty set removes the resource-kind entirely.
    pub fn replace(&mut self, resource: impl Into<String>, actions: BTreeSet<String>) {
        let resource = resource.into();
        if actions.is_empty() {
            self.0.remove(&resource);
        } else {
            self.0.insert(resource, actions);
        }
    }

    /// Additive union with another map. Never removes a grant.
    pub fn merge(&mut self, other: &PermissionMap) {
        for (resource, actions) in &other.0 {
            self.grant(resource.clone(), actions.iter().cloned());
        }
    }

    pub fn actions(&self, resource: &str) -> Option<&BTreeSet<String>> {
        self.0.get(resource)
    }

    pub fn allows(&self, resource: &str, action: &str) -> bool {
        self.0
            .get(resource)
            .is_some_and(|actions| actions.contains(action) || actions.contains(WILDCARD_ACTION))
    }

    /// Every resource/action pair of `required` is granted here.
    pub fn satisfies(&self, required: &PermissionMap) -> bool {
        required.pairs().all(|(resource, action)| self.allows(resource, action))
    }

    /// Resource/action pairs of `required` that are not granted here.
    pub fn missing(&self, required: &PermissionMap) -> Vec<String> {
        required
            .pairs()
            .filter(|(resource, action)| !self.allows(resource, action))
            .map(|(resource, action)| format!("{resource}:{action}"))
            .collect()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().flat_map(|(resource, actions)| {
            actions.iter().map(move |action| (resource.as_str(), action.as_str()))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<R, A> FromIterator<(R, A)> for PermissionMap
where
    R: Into<String>,
    A: IntoIterator,
    A::Item: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (R, A)>>(iter: T) -> Self {
        let mut map = PermissionMap::new();
        for (resource, actions) in iter {
            map.grant(resource, actions);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_is_additive() {
        let mut map = PermissionMap::new().with("hr.employee", ["read"]);
        map.grant("hr.employee", ["update"]);
        assert!(map.allows("hr.employee", "read"));
        assert!(map.allows("hr.employee", "update"));
    }

    #[test]
    fn replace_with_empty_set_removes_resource() {
        let mut map = PermissionMap::new().with("billing", ["read", "update"]);
        map.replace("billing", BTreeSet::new());
        assert!(map.actions("billing").is_none());
        assert!(map.is_empty());
    }

    #[test]
    fn wildcard_action_grants_everything_on_the_resource() {
        let map = PermissionMap::new().with("hr.document", [WILDCARD_ACTION]);
        assert!(map.allows("hr.document", "delete"));
        assert!(!map.allows("hr.employee", "read"));
    }

    #[test]
    fn satisfies_requires_every_pair() {
        let granted = PermissionMap::new()
            .with("hr.employee", ["read", "update"])
            .with("hr.leave", ["read"]);

        let ok = PermissionMap::new().with("hr.employee", ["read"]).with("hr.leave", ["read"]);
        let not_ok = PermissionMap::new().with("hr.employee", ["read"]).with("hr.leave", ["approve"]);

        assert!(granted.satisfies(&ok));
        assert!(!granted.satisfies(&not_ok));
        assert_eq!(granted.missing(&not_ok), vec!["hr.leave:approve".to_string()]);
    }

    #[test]
    fn serializes_as_plain_object() {
        let map = PermissionMap::new().with("hr.leave", ["read", "approve"]);
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json, serde_json::json!({ "hr.leave": ["approve", "read"] }));
    }
}
