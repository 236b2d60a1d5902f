//! Build settings patcher
//!
//! Patches apply to every configuration of one target and nothing else.
//! Scalar values overwrite; list values are set-union merged into whatever
//! the configuration already holds, so reapplying a patch is a no-op.

use std::collections::BTreeMap;

use graft_index::LookupIndex;
use graft_model::{ObjectId, ProjectGraph, SettingValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ComposeResult;

/// Setting key to value, applied to each configuration of a target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsPatch(BTreeMap<String, SettingValue>);

impl SettingsPatch {
    /// Empty patch
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace one entry
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: SettingValue) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    /// Add or replace one entry in place
    pub fn set(&mut self, key: impl Into<String>, value: SettingValue) {
        self.0.insert(key.into(), value);
    }

    /// Entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &SettingValue)> {
        self.0.iter()
    }

    /// Look up one entry
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.0.get(key)
    }

    /// True when the patch has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<K: Into<String>> FromIterator<(K, SettingValue)> for SettingsPatch {
    fn from_iter<I: IntoIterator<Item = (K, SettingValue)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// What `incoming` turns `current` into, or `None` when nothing changes
fn merged(current: Option<&SettingValue>, incoming: &SettingValue) -> Option<SettingValue> {
    match (current, incoming) {
        (Some(current), SettingValue::Text(_)) if current == incoming => None,
        (_, SettingValue::Text(_)) | (None, SettingValue::List(_)) => Some(incoming.clone()),
        (Some(current), SettingValue::List(items)) => {
            let union = current.union(items);
            (union.entries() != current.entries()).then_some(union)
        }
    }
}

/// Apply `patch` to every configuration of `target`
///
/// Returns the number of configurations that changed.
///
/// # Errors
/// Returns error if a configuration listed by the target cannot be borrowed
/// mutably.
pub fn apply_settings(graph: &mut ProjectGraph, target: &ObjectId, patch: &SettingsPatch) -> ComposeResult<usize> {
    let configurations = LookupIndex::new(graph).configurations_of_target(target);
    let mut changed = 0;
    for id in &configurations {
        let config = graph.configuration_mut(id)?;
        let mut touched = false;
        for (key, value) in patch.iter() {
            if let Some(next) = merged(config.build_settings.get(key), value) {
                debug!(configuration = %config.name, key = %key, "updated setting");
                config.build_settings.insert(key.clone(), next);
                touched = true;
            }
        }
        changed += usize::from(touched);
    }
    debug!(target = %target, configurations = configurations.len(), changed, "applied settings");
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_test_utils::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const APP_DEBUG: &str = "13B07F941A680F5B00A75B9A";
    const TESTS_DEBUG: &str = "00E356F61AD99517003FC87E";
    const PROJECT_DEBUG: &str = "83CBBA201A601CBA00E9B192";

    fn entitlements_patch() -> SettingsPatch {
        SettingsPatch::new()
            .with("CODE_SIGN_ENTITLEMENTS", SettingValue::text("Ext/Ext.entitlements"))
            .with("SWIFT_VERSION", SettingValue::text("5.0"))
    }

    #[test]
    fn patch_touches_only_target_configurations() {
        let mut doc = host_app_document();
        let graph = doc.graph_mut();
        let tests_before = graph.configuration(&oid(TESTS_DEBUG)).unwrap().clone();
        let project_before = graph.configuration(&oid(PROJECT_DEBUG)).unwrap().clone();

        let changed = apply_settings(graph, &oid(HOST_TARGET_ID), &entitlements_patch()).unwrap();
        assert_eq!(changed, 2);

        let debug = graph.configuration(&oid(APP_DEBUG)).unwrap();
        assert_eq!(
            debug.build_settings["CODE_SIGN_ENTITLEMENTS"],
            SettingValue::text("Ext/Ext.entitlements")
        );
        assert_eq!(graph.configuration(&oid(TESTS_DEBUG)).unwrap(), &tests_before);
        assert_eq!(graph.configuration(&oid(PROJECT_DEBUG)).unwrap(), &project_before);
    }

    #[test]
    fn reapplying_changes_nothing() {
        let mut doc = host_app_document();
        let graph = doc.graph_mut();
        let patch = entitlements_patch().with("OTHER_SWIFT_FLAGS", SettingValue::list(["-DEXT"]));
        apply_settings(graph, &oid(HOST_TARGET_ID), &patch).unwrap();
        assert_eq!(apply_settings(graph, &oid(HOST_TARGET_ID), &patch).unwrap(), 0);
    }

    #[test]
    fn list_values_union_with_existing() {
        let current = SettingValue::list(["$(inherited)", "-DA"]);
        let incoming = SettingValue::list(["-DB", "$(inherited)"]);
        assert_eq!(
            merged(Some(&current), &incoming),
            Some(SettingValue::list(["$(inherited)", "-DA", "-DB"]))
        );
        assert_eq!(merged(Some(&current), &SettingValue::list(["-DA"])), None);
        assert_eq!(
            merged(Some(&SettingValue::text("$(inherited)")), &SettingValue::list(["$(inherited)"])),
            None
        );
    }

    #[test]
    fn scalar_values_overwrite() {
        let current = SettingValue::list(["a", "b"]);
        assert_eq!(
            merged(Some(&current), &SettingValue::text("c")),
            Some(SettingValue::text("c"))
        );
        assert_eq!(merged(None, &SettingValue::text("c")), Some(SettingValue::text("c")));
    }

    #[test]
    fn unknown_target_applies_nowhere() {
        let mut doc = host_app_document();
        let changed = apply_settings(doc.graph_mut(), &oid("FFFFFFFFFFFFFFFFFFFFFFFF"), &entitlements_patch()).unwrap();
        assert_eq!(changed, 0);
        assert!(!doc.is_modified());
    }

    proptest! {
        #[test]
        fn union_is_idempotent(
            current in proptest::collection::vec("[a-z]{1,4}", 0..6),
            incoming in proptest::collection::vec("[a-z]{1,4}", 0..6),
        ) {
            let once = merged(Some(&SettingValue::List(current.clone())), &SettingValue::List(incoming.clone()))
                .unwrap_or(SettingValue::List(current));
            prop_assert_eq!(merged(Some(&once), &SettingValue::List(incoming)), None);
        }
    }
}
