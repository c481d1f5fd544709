use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Resolved state of one experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureState {
    /// Experiment with a single variant: whether it is on.
    Enabled(bool),
    /// Experiment with several variants: whether each variant is on, in registration order.
    ///
    /// Several variants may be on at once when their rules overlap. The first one that is on
    /// counts as the active variant.
    Variants(IndexMap<String, bool>),
}

impl FeatureState {
    /// Name of the first variant that is on, for multi-variant experiments.
    pub fn active_variant(&self) -> Option<&str> {
        match self {
            FeatureState::Enabled(_) => None,
            FeatureState::Variants(variants) => variants
                .iter()
                .find(|(_, is_on)| **is_on)
                .map(|(name, _)| name.as_str()),
        }
    }

    /// Return `true` if the experiment is on, or any of its variants is.
    pub fn is_active(&self) -> bool {
        match self {
            FeatureState::Enabled(is_on) => *is_on,
            FeatureState::Variants(_) => self.active_variant().is_some(),
        }
    }
}

impl From<bool> for FeatureState {
    fn from(value: bool) -> Self {
        Self::Enabled(value)
    }
}

/// State of every registered experiment for one [`Context`](crate::Context).
///
/// Snapshots are serializable so they can be kept in a user session and passed back on the next
/// request. Features listed in `dirty_features` are pinned: re-resolving the snapshot carries them
/// forward verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    session_id: u64,
    #[serde(default)]
    features: IndexMap<String, FeatureState>,
    #[serde(default)]
    dirty_features: BTreeSet<String>,
}

impl Snapshot {
    /// Create an empty snapshot for the given session.
    pub fn new(session_id: u64) -> Snapshot {
        Snapshot {
            session_id,
            features: IndexMap::new(),
            dirty_features: BTreeSet::new(),
        }
    }

    /// Session this snapshot was first resolved for.
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// State of one experiment, `None` if it was not resolved.
    pub fn feature(&self, name: &str) -> Option<&FeatureState> {
        self.features.get(name)
    }

    /// States of all experiments, in resolution order.
    pub fn features(&self) -> &IndexMap<String, FeatureState> {
        &self.features
    }

    /// Names of experiments with an active variant.
    pub fn active_features(&self) -> impl Iterator<Item = &str> {
        self.features
            .iter()
            .filter(|(_, state)| state.is_active())
            .map(|(name, _)| name.as_str())
    }

    /// Set a feature without pinning it. Pinned features are left untouched.
    ///
    /// Returns `true` if the state was stored.
    pub fn set_feature(&mut self, name: impl Into<String>, state: FeatureState) -> bool {
        let name = name.into();
        if self.dirty_features.contains(&name) {
            return false;
        }
        self.features.insert(name, state);
        true
    }

    /// Set a feature and pin it, so later resolutions keep this state.
    pub fn pin(&mut self, name: impl Into<String>, state: FeatureState) {
        let name = name.into();
        self.features.insert(name.clone(), state);
        self.dirty_features.insert(name);
    }

    /// Pin the current state of a feature. Returns `false` if the feature is absent.
    pub fn mark_dirty(&mut self, name: &str) -> bool {
        if !self.features.contains_key(name) {
            return false;
        }
        self.dirty_features.insert(name.to_owned());
        true
    }

    /// Allow the feature to be recomputed again. Returns `true` if it was pinned.
    pub fn unpin(&mut self, name: &str) -> bool {
        self.dirty_features.remove(name)
    }

    /// Whether `name` is pinned.
    pub fn is_dirty(&self, name: &str) -> bool {
        self.dirty_features.contains(name)
    }

    /// Names of pinned experiments, sorted.
    pub fn dirty_features(&self) -> impl Iterator<Item = &str> {
        self.dirty_features.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use serde_json::json;

    use super::{FeatureState, Snapshot};

    fn variants(entries: &[(&str, bool)]) -> FeatureState {
        FeatureState::Variants(
            entries
                .iter()
                .map(|(name, is_on)| (name.to_string(), *is_on))
                .collect::<IndexMap<_, _>>(),
        )
    }

    #[test]
    fn first_active_variant_wins() {
        let state = variants(&[("red", false), ("green", true), ("blue", true)]);
        assert_eq!(state.active_variant(), Some("green"));
        assert!(state.is_active());

        let state = variants(&[("red", false)]);
        assert_eq!(state.active_variant(), None);
        assert!(!state.is_active());

        assert_eq!(FeatureState::Enabled(true).active_variant(), None);
        assert!(FeatureState::Enabled(true).is_active());
    }

    #[test]
    fn pinned_features_are_not_overwritten() {
        let mut snapshot = Snapshot::new(1);
        snapshot.pin("checkout", true.into());

        assert!(!snapshot.set_feature("checkout", false.into()));
        assert_eq!(snapshot.feature("checkout"), Some(&FeatureState::Enabled(true)));

        assert!(snapshot.unpin("checkout"));
        assert!(snapshot.set_feature("checkout", false.into()));
        assert_eq!(snapshot.feature("checkout"), Some(&FeatureState::Enabled(false)));
    }

    #[test]
    fn mark_dirty_requires_existing_feature() {
        let mut snapshot = Snapshot::new(1);
        assert!(!snapshot.mark_dirty("missing"));
        snapshot.set_feature("search", true.into());
        assert!(snapshot.mark_dirty("search"));
        assert!(snapshot.is_dirty("search"));
        assert_eq!(snapshot.dirty_features().collect::<Vec<_>>(), ["search"]);
    }

    #[test]
    fn serialization_keeps_variant_order() {
        let mut snapshot = Snapshot::new(9);
        snapshot.set_feature("search", true.into());
        snapshot.pin("buttonColor", variants(&[("red", false), ("green", true)]));

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(
            value,
            json!({
                "sessionId": 9,
                "features": {
                    "search": true,
                    "buttonColor": {"red": false, "green": true}
                },
                "dirtyFeatures": ["buttonColor"]
            })
        );

        let text = serde_json::to_string(&snapshot).unwrap();
        let parsed: Snapshot = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, snapshot);
        assert_eq!(
            parsed.active_features().collect::<Vec<_>>(),
            ["search", "buttonColor"]
        );
    }
}
