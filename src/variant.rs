use std::sync::Arc;

use crate::{
    group::Group,
    identity::{Identity, PercentRange},
    Result,
};

/// A named outcome of an experiment.
///
/// Membership is decided by, in order:
/// 1. an explicit on/off override (`is_on`), which wins unconditionally;
/// 2. membership in any referenced [`Group`];
/// 3. the variant's own percentage range.
///
/// Groups and percentage are OR-ed: matching either one is sufficient.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    name: String,
    is_on: Option<bool>,
    groups: Vec<Arc<Group>>,
    percent_range: Option<PercentRange>,
}

impl Variant {
    /// Create a variant that matches nobody until rules are added.
    pub fn new(name: impl Into<String>) -> Variant {
        Variant {
            name: name.into(),
            is_on: None,
            groups: Vec::new(),
            percent_range: None,
        }
    }

    /// Name of the variant.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Force the variant on or off for everyone.
    pub fn set_is_on(&mut self, is_on: bool) {
        self.is_on = Some(is_on);
    }

    /// Unconditional override, if set.
    pub fn is_on(&self) -> Option<bool> {
        self.is_on
    }

    /// Match every member of `group`.
    pub fn add_group(&mut self, group: Arc<Group>) {
        self.groups.push(group);
    }

    /// Referenced groups, in the order they were added.
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter().map(AsRef::as_ref)
    }

    /// Set the percentage of the population this variant covers, replacing any previous range.
    pub fn set_percentage(&mut self, range: PercentRange) {
        self.percent_range = Some(range);
    }

    /// Percentage of the population matched by the variant, if any.
    pub fn percent_range(&self) -> Option<PercentRange> {
        self.percent_range
    }

    /// Return `true` if the identity gets this variant.
    ///
    /// The identity is only normalized when no override is set, so a forced variant never fails.
    pub fn contains<I: Identity + ?Sized>(&self, identity: &I) -> Result<bool> {
        if let Some(is_on) = self.is_on {
            return Ok(is_on);
        }

        let id = identity.normalized_id()?;

        Ok(self.groups.iter().any(|group| group.contains(id))
            || self.percent_range.is_some_and(|range| range.contains(id)))
    }
}
