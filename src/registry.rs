//! Registry of groups and experiments, and resolution of [`Snapshot`]s against it.
use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::{
    config::is_valid_name,
    error::ConfigurationError,
    experiment::Experiment,
    group::Group,
    identity::NormalizedId,
    snapshot::{FeatureState, Snapshot},
    Context, Result,
};

/// All groups and experiments known to the process.
///
/// A `Registry` is normally produced by [`configure`](crate::configure) and treated as read-only
/// afterwards, so it can be shared between threads (see
/// [`RegistryStore`](crate::RegistryStore)).
#[derive(Debug, Clone)]
pub struct Registry {
    /// When this registry was configured.
    pub configured_at: DateTime<Utc>,
    groups: HashMap<String, Arc<Group>>,
    experiments: IndexMap<String, Experiment>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Registry {
        Registry {
            configured_at: Utc::now(),
            groups: HashMap::new(),
            experiments: IndexMap::new(),
        }
    }

    /// Register a group under its name, replacing a group with the same name.
    pub fn register_group(&mut self, group: Group) -> Arc<Group> {
        let group = Arc::new(group);
        self.groups.insert(group.name().to_owned(), group.clone());
        group
    }

    /// Register an experiment under its name, replacing an experiment with the same name.
    pub fn register_experiment(&mut self, experiment: Experiment) {
        self.experiments
            .insert(experiment.name().to_owned(), experiment);
    }

    /// Move a group to a new name.
    ///
    /// Variants that already reference the group keep their membership rules; only the registry
    /// key and the group's name change.
    pub fn rename_group(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        if self.groups.contains_key(new_name) {
            return Err(ConfigurationError::AlreadyRegistered {
                kind: "group",
                name: new_name.to_owned(),
            }
            .into());
        }
        let group = self
            .groups
            .remove(old_name)
            .ok_or_else(|| ConfigurationError::NotRegistered {
                kind: "group",
                name: old_name.to_owned(),
            })?;

        let mut group = Arc::unwrap_or_clone(group);
        group.set_name(new_name.to_owned());
        self.register_group(group);
        Ok(())
    }

    /// Move an experiment to a new name. The new name must be a valid experiment name.
    pub fn rename_experiment(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        if !is_valid_name(new_name) {
            return Err(ConfigurationError::InvalidExperimentName {
                name: new_name.to_owned(),
            }
            .into());
        }
        if self.experiments.contains_key(new_name) {
            return Err(ConfigurationError::AlreadyRegistered {
                kind: "experiment",
                name: new_name.to_owned(),
            }
            .into());
        }
        let mut experiment = self.experiments.shift_remove(old_name).ok_or_else(|| {
            ConfigurationError::NotRegistered {
                kind: "experiment",
                name: old_name.to_owned(),
            }
        })?;

        experiment.set_name(new_name.to_owned());
        self.register_experiment(experiment);
        Ok(())
    }

    /// Look up a group by name.
    pub fn group(&self, name: &str) -> Option<&Arc<Group>> {
        self.groups.get(name)
    }

    /// All groups containing `id`.
    pub fn groups_for(&self, id: NormalizedId) -> Vec<&Group> {
        self.groups
            .values()
            .filter(|group| group.contains(id))
            .map(AsRef::as_ref)
            .collect()
    }

    /// Look up an experiment by name.
    pub fn experiment(&self, name: &str) -> Option<&Experiment> {
        self.experiments.get(name)
    }

    /// Names of all experiments, in registration order.
    pub fn experiment_names(&self) -> impl Iterator<Item = &str> {
        self.experiments.keys().map(String::as_str)
    }

    /// Number of registered groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Number of registered experiments.
    pub fn experiment_count(&self) -> usize {
        self.experiments.len()
    }

    /// Resolve a single experiment for the context. Returns `None` for unknown experiments.
    pub fn state_for(&self, name: &str, context: &Context) -> Result<Option<FeatureState>> {
        self.experiment(name)
            .map(|experiment| experiment.state_for(context))
            .transpose()
    }

    /// Compute the state of every registered experiment for `context`.
    ///
    /// When `previous` is given, it is updated in place: its pinned (dirty) features are carried
    /// forward verbatim and every other experiment is recomputed against `context`. Otherwise a
    /// fresh snapshot is started for `context`'s session.
    pub fn for_context(&self, context: &Context, previous: Option<Snapshot>) -> Result<Snapshot> {
        let mut snapshot = previous.unwrap_or_else(|| Snapshot::new(context.session_id()));

        let mut recomputed = 0;
        for (name, experiment) in &self.experiments {
            if snapshot.is_dirty(name) {
                continue;
            }
            snapshot.set_feature(name.as_str(), experiment.state_for(context)?);
            recomputed += 1;
        }

        log::trace!(target: "experiments",
                    session_id = snapshot.session_id(),
                    recomputed,
                    pinned = snapshot.dirty_features().count();
                    "resolved snapshot");

        Ok(snapshot)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::Registry;
    use crate::{
        experiment::{Experiment, DEFAULT_VARIANT},
        group::Group,
        identity::{NormalizedId, PercentRange, RawId},
        snapshot::FeatureState,
        variant::Variant,
        Context, ConfigurationError, Error,
    };

    fn registry() -> Registry {
        let mut registry = Registry::new();

        let mut staff = Group::new("staff");
        staff.add_member(&RawId::from(1001)).unwrap();
        let staff = registry.register_group(staff);

        let mut search = Experiment::new("search");
        let mut variant = Variant::new(DEFAULT_VARIANT);
        variant.add_group(staff);
        variant.set_percentage(PercentRange::up_to(9));
        search.add_variant(variant);
        registry.register_experiment(search);

        let mut color = Experiment::new("buttonColor");
        for (name, low, high) in [("redButton", 0, 10), ("greenButton", 11, 20)] {
            let mut variant = Variant::new(name);
            variant.set_percentage(PercentRange::new(Some(low), Some(high)));
            color.add_variant(variant);
        }
        registry.register_experiment(color);

        registry
    }

    fn colors(red: bool, green: bool) -> FeatureState {
        FeatureState::Variants(IndexMap::from([
            ("redButton".to_owned(), red),
            ("greenButton".to_owned(), green),
        ]))
    }

    #[test]
    fn fresh_snapshot_resolves_everything() {
        let _ = env_logger::builder().is_test(true).try_init();

        let snapshot = registry().for_context(&Context::new(5, None), None).unwrap();
        assert_eq!(snapshot.session_id(), 5);
        assert_eq!(snapshot.feature("search"), Some(&FeatureState::Enabled(true)));
        assert_eq!(snapshot.feature("buttonColor"), Some(&colors(true, false)));
        assert_eq!(snapshot.dirty_features().count(), 0);
    }

    #[test]
    fn dirty_features_survive_re_resolution() {
        let _ = env_logger::builder().is_test(true).try_init();
        let registry = registry();

        // Anonymous session bucketed into red, pin the button color.
        let mut snapshot = registry.for_context(&Context::new(5, None), None).unwrap();
        assert!(snapshot.mark_dirty("buttonColor"));

        // Once the user logs in, only unpinned features follow the user id.
        let context = Context::new(5, None).with_user(1001);
        let snapshot = registry.for_context(&context, Some(snapshot)).unwrap();
        assert_eq!(snapshot.session_id(), 5);
        assert_eq!(snapshot.feature("buttonColor"), Some(&colors(true, false)));
        assert_eq!(snapshot.feature("search"), Some(&FeatureState::Enabled(true)));

        let context = Context::new(5, None).with_user(15);
        let again = registry.for_context(&context, Some(snapshot.clone())).unwrap();
        assert_eq!(again.feature("buttonColor"), snapshot.feature("buttonColor"));
        assert_eq!(again.feature("search"), Some(&FeatureState::Enabled(false)));

        let twice = registry.for_context(&context, Some(again.clone())).unwrap();
        assert_eq!(twice, again);
    }

    #[test]
    fn unpinned_features_follow_context() {
        let registry = registry();
        let snapshot = registry.for_context(&Context::new(5, None), None).unwrap();
        let snapshot = registry
            .for_context(&Context::new(5, None).with_user(15), Some(snapshot))
            .unwrap();
        assert_eq!(snapshot.feature("buttonColor"), Some(&colors(false, true)));
    }

    #[test]
    fn invalid_user_id_fails_resolution() {
        let context = Context::new(5, Some(RawId::Number(f64::INFINITY)));
        assert!(matches!(
            registry().for_context(&context, None),
            Err(Error::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn lookups() {
        let registry = registry();
        assert!(registry.group("staff").is_some());
        assert!(registry.group("nobody").is_none());
        assert_eq!(
            registry
                .groups_for(NormalizedId::from(1001))
                .iter()
                .map(|g| g.name())
                .collect::<Vec<_>>(),
            ["staff"]
        );
        assert!(registry.groups_for(NormalizedId::from(1)).is_empty());
        assert_eq!(
            registry.experiment_names().collect::<Vec<_>>(),
            ["search", "buttonColor"]
        );
        assert_eq!(
            registry.state_for("search", &Context::new(1, None)).unwrap(),
            Some(FeatureState::Enabled(true))
        );
        assert_eq!(registry.state_for("missing", &Context::new(1, None)).unwrap(), None);
    }

    #[test]
    fn rename_moves_registry_entries() {
        let mut registry = registry();

        registry.rename_group("staff", "employees").unwrap();
        assert!(registry.group("staff").is_none());
        assert_eq!(registry.group("employees").unwrap().name(), "employees");

        registry.rename_experiment("search", "newSearch").unwrap();
        assert!(registry.experiment("search").is_none());
        assert_eq!(registry.experiment("newSearch").unwrap().name(), "newSearch");

        assert!(matches!(
            registry.rename_group("staff", "other"),
            Err(Error::InvalidConfiguration(ConfigurationError::NotRegistered { .. }))
        ));
        assert!(matches!(
            registry.rename_experiment("newSearch", "buttonColor"),
            Err(Error::InvalidConfiguration(ConfigurationError::AlreadyRegistered { .. }))
        ));
        assert!(matches!(
            registry.rename_experiment("newSearch", "1abc"),
            Err(Error::InvalidConfiguration(ConfigurationError::InvalidExperimentName { .. }))
        ));
    }
}
