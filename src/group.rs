use std::collections::HashSet;

use crate::identity::{Identity, NormalizedId, PercentRange};
use crate::Result;

/// A named set of identities: explicit members, a percentage of the population, or both.
///
/// Groups are defined once in the configuration document and referenced by name from variants.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    name: String,
    member_ids: HashSet<NormalizedId>,
    percent_range: Option<PercentRange>,
}

impl Group {
    /// Create an empty group.
    pub fn new(name: impl Into<String>) -> Group {
        Group {
            name: name.into(),
            member_ids: HashSet::new(),
            percent_range: None,
        }
    }

    /// Name of the group.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Add an explicit member. The identity is normalized before being stored.
    pub fn add_member(&mut self, id: &impl Identity) -> Result<()> {
        self.member_ids.insert(id.normalized_id()?);
        Ok(())
    }

    /// Set the percentage of the population in this group, replacing any previous range.
    pub fn set_percentage(&mut self, range: PercentRange) {
        self.percent_range = Some(range);
    }

    /// Percentage of the population in the group, if any.
    pub fn percent_range(&self) -> Option<PercentRange> {
        self.percent_range
    }

    /// Explicit members.
    pub fn member_ids(&self) -> &HashSet<NormalizedId> {
        &self.member_ids
    }

    /// Return `true` if `id` is an explicit member or falls within the group's percentage.
    pub fn contains(&self, id: NormalizedId) -> bool {
        self.member_ids.contains(&id) || self.percent_range.is_some_and(|r| r.contains(id))
    }
}

#[cfg(test)]
mod tests {
    use super::Group;
    use crate::identity::{NormalizedId, PercentRange, RawId};

    #[test]
    fn empty_group_contains_nobody() {
        let group = Group::new("empty");
        assert!(!group.contains(NormalizedId::from(0)));
        assert!(!group.contains(NormalizedId::from(42)));
    }

    #[test]
    fn explicit_members() {
        let mut group = Group::new("staff");
        group.add_member(&RawId::from(7)).unwrap();
        group.add_member(&RawId::from(-12)).unwrap();
        group.add_member(&RawId::from("my string")).unwrap();

        assert!(group.contains(NormalizedId::from(7)));
        assert!(group.contains(NormalizedId::from(12)));
        assert!(group.contains(NormalizedId::from(365786686)));
        assert!(!group.contains(NormalizedId::from(107)));
    }

    #[test]
    fn members_or_percentage() {
        let mut group = Group::new("phase one");
        group.set_percentage(PercentRange::new(Some(10), Some(19)));
        group.add_member(&RawId::from(55)).unwrap();

        assert!(group.contains(NormalizedId::from(55)));
        assert!(group.contains(NormalizedId::from(110)));
        assert!(group.contains(NormalizedId::from(219)));
        assert!(!group.contains(NormalizedId::from(120)));
        assert!(!group.contains(NormalizedId::from(155)));
    }

    #[test]
    fn invalid_member_is_rejected() {
        let mut group = Group::new("broken");
        assert!(group.add_member(&RawId::Number(f64::NAN)).is_err());
        assert!(group.member_ids().is_empty());
    }
}
