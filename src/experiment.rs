use crate::{
    identity::Identity,
    snapshot::FeatureState,
    variant::Variant,
    Result,
};

/// Name of the implicit variant created for shorthand experiment configurations such as
/// `"featureOne": "10%"`.
pub const DEFAULT_VARIANT: &str = "default";

/// A named experiment (feature flag) with an ordered list of variants.
#[derive(Debug, Clone, PartialEq)]
pub struct Experiment {
    name: String,
    variants: Vec<Variant>,
}

impl Experiment {
    /// Create an experiment with no variants.
    pub fn new(name: impl Into<String>) -> Experiment {
        Experiment {
            name: name.into(),
            variants: Vec::new(),
        }
    }

    /// Name of the experiment.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Append a variant. Registration order decides which variant is active when several match.
    pub fn add_variant(&mut self, variant: Variant) {
        self.variants.push(variant);
    }

    /// Variants in registration order.
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    /// Look up a variant by name.
    pub fn variant(&self, name: &str) -> Option<&Variant> {
        self.variants.iter().find(|variant| variant.name() == name)
    }

    /// Name that a boolean [`FeatureState`] of this experiment stands for: the only variant's name.
    pub fn implicit_variant(&self) -> &str {
        match self.variants.as_slice() {
            [variant] => variant.name(),
            _ => DEFAULT_VARIANT,
        }
    }

    /// Evaluate every variant for the given identity.
    ///
    /// A single-variant experiment resolves to a plain boolean. Otherwise each variant is
    /// evaluated independently and more than one may be on.
    pub fn state_for<I: Identity + ?Sized>(&self, identity: &I) -> Result<FeatureState> {
        if let [variant] = self.variants.as_slice() {
            return Ok(FeatureState::Enabled(variant.contains(identity)?));
        }

        let variants = self
            .variants
            .iter()
            .map(|variant| Ok((variant.name().to_owned(), variant.contains(identity)?)))
            .collect::<Result<_>>()?;

        Ok(FeatureState::Variants(variants))
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::{Experiment, DEFAULT_VARIANT};
    use crate::{
        identity::{PercentRange, RawId},
        snapshot::FeatureState,
        variant::Variant,
        Context,
    };

    fn ranged(name: &str, low: u64, high: u64) -> Variant {
        let mut variant = Variant::new(name);
        variant.set_percentage(PercentRange::new(Some(low), Some(high)));
        variant
    }

    #[test]
    fn single_variant_is_boolean() {
        let mut experiment = Experiment::new("search");
        experiment.add_variant(ranged(DEFAULT_VARIANT, 0, 9));

        assert_eq!(
            experiment.state_for(&RawId::from(5)).unwrap(),
            FeatureState::Enabled(true)
        );
        assert_eq!(
            experiment.state_for(&Context::new(50, None)).unwrap(),
            FeatureState::Enabled(false)
        );
        assert_eq!(experiment.implicit_variant(), DEFAULT_VARIANT);
    }

    #[test]
    fn variants_are_evaluated_independently() {
        let mut experiment = Experiment::new("buttonColor");
        experiment.add_variant(ranged("redButton", 0, 10));
        experiment.add_variant(ranged("greenButton", 5, 20));

        let state = experiment.state_for(&RawId::from(7)).unwrap();
        assert_eq!(
            state,
            FeatureState::Variants(IndexMap::from([
                ("redButton".to_owned(), true),
                ("greenButton".to_owned(), true),
            ]))
        );
        assert_eq!(state.active_variant(), Some("redButton"));

        let state = experiment.state_for(&RawId::from(15)).unwrap();
        assert_eq!(state.active_variant(), Some("greenButton"));
    }

    #[test]
    fn experiment_without_variants_is_inactive() {
        let experiment = Experiment::new("empty");
        let state = experiment.state_for(&RawId::from(1)).unwrap();
        assert_eq!(state, FeatureState::Variants(IndexMap::new()));
        assert!(!state.is_active());
    }

    #[test]
    fn invalid_identity_fails() {
        let mut experiment = Experiment::new("search");
        experiment.add_variant(ranged("a", 0, 10));
        experiment.add_variant(ranged("b", 11, 20));
        assert!(experiment.state_for(&RawId::Number(f64::NAN)).is_err());
    }
}
