//! Helpers that turn a resolved experiment into caller behavior: pick a callback for the active
//! variant, run it, or just report which variant is active.
//!
//! Experiment names may carry an explicit variant, `"buttonColor/redButton"`, in which case only
//! that variant counts as a match.
//!
//! Unknown experiments never fail. They are reported once through the [`LogSink`] and treated as
//! inactive, so a typo or a stale flag name in a template does not break the page.
use std::borrow::Cow;

use indexmap::IndexMap;

use crate::{
    experiment::DEFAULT_VARIANT,
    log_sink::LogSink,
    registry::Registry,
    snapshot::{FeatureState, Snapshot},
    Context, Result,
};

/// Key of the callback used when no variant callback matches.
pub const FALLBACK: &str = "fallback";

/// Where to read experiment state from: an already resolved [`Snapshot`], or a [`Context`] that
/// gets resolved against the registry on demand.
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    /// Read states recorded in a snapshot.
    Snapshot(&'a Snapshot),
    /// Resolve states for a context on demand.
    Context(&'a Context),
}

impl<'a> From<&'a Snapshot> for Source<'a> {
    fn from(value: &'a Snapshot) -> Self {
        Self::Snapshot(value)
    }
}

impl<'a> From<&'a Context> for Source<'a> {
    fn from(value: &'a Context) -> Self {
        Self::Context(value)
    }
}

/// Outcome of [`Dispatcher::feature`] and [`Dispatcher::variant_for`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feature {
    /// Experiment is unknown, off, or no variant is active.
    Off,
    /// Single-variant experiment that is on.
    On,
    /// Name of the active variant.
    Variant(String),
}

impl Feature {
    /// `false` only for [`Feature::Off`].
    pub fn is_active(&self) -> bool {
        !matches!(self, Feature::Off)
    }

    /// Name of the active variant, if there is one.
    pub fn variant(&self) -> Option<&str> {
        match self {
            Feature::Variant(name) => Some(name),
            _ => None,
        }
    }
}

/// Callbacks to choose from: either one callback for the experiment, or one per variant with an
/// optional fallback.
#[derive(Debug, Clone)]
pub enum Callbacks<F> {
    /// Called when the experiment (or the explicitly named variant) is active.
    Single(F),
    /// One callback per variant, plus an optional fallback.
    Variants(VariantCallbacks<F>),
}

impl<F> Callbacks<F> {
    /// Use one callback regardless of the active variant.
    pub fn single(callback: F) -> Callbacks<F> {
        Callbacks::Single(callback)
    }

    /// Start a per-variant set of callbacks.
    ///
    /// ```
    /// # use experiments::Callbacks;
    /// type Render = fn(()) -> &'static str;
    ///
    /// let callbacks: Callbacks<Render> = Callbacks::<Render>::variants()
    ///     .on("redButton", |_| "red")
    ///     .on("greenButton", |_| "green")
    ///     .fallback(|_| "grey")
    ///     .into();
    /// ```
    pub fn variants() -> VariantCallbacks<F> {
        VariantCallbacks {
            variants: IndexMap::new(),
            fallback: None,
        }
    }

    /// Build callbacks from a name→callback map, as produced by templating adapters. An entry
    /// named [`FALLBACK`] becomes the fallback.
    pub fn from_map(mut map: IndexMap<String, F>) -> Callbacks<F> {
        let fallback = map.shift_remove(FALLBACK);
        Callbacks::Variants(VariantCallbacks {
            variants: map,
            fallback,
        })
    }
}

/// Per-variant callbacks. See [`Callbacks::variants`].
#[derive(Debug, Clone)]
pub struct VariantCallbacks<F> {
    variants: IndexMap<String, F>,
    fallback: Option<F>,
}

impl<F> VariantCallbacks<F> {
    /// Register the callback for `variant`.
    pub fn on(mut self, variant: impl Into<String>, callback: F) -> Self {
        self.variants.insert(variant.into(), callback);
        self
    }

    /// Register the callback used when nothing else matches.
    pub fn fallback(mut self, callback: F) -> Self {
        self.fallback = Some(callback);
        self
    }

    fn get(&self, variant: &str) -> Option<&F> {
        self.variants.get(variant)
    }
}

impl<F> From<VariantCallbacks<F>> for Callbacks<F> {
    fn from(value: VariantCallbacks<F>) -> Self {
        Callbacks::Variants(value)
    }
}

/// What a name resolved to.
struct Outcome {
    /// Name of the active variant. For single-variant experiments that are on, this is the
    /// variant's own name.
    active: Option<String>,
    single_variant: bool,
}

/// Resolves experiment names against a snapshot or context and dispatches to callbacks.
///
/// ```
/// # use experiments::{configure_for_env, ConfigDocument, Context, Dispatcher, Feature};
/// let registry = configure_for_env(
///     ConfigDocument::from_json(r#"{"experiments": {"search": "10%"}}"#).unwrap(),
///     None,
/// )
/// .unwrap();
/// let sink = |message: &str| eprintln!("{message}");
/// let dispatcher = Dispatcher::new(Some(&registry), &sink);
///
/// let context = Context::new(1, None);
/// assert_eq!(dispatcher.feature("search", (&context).into()).unwrap(), Feature::On);
/// ```
pub struct Dispatcher<'a> {
    registry: Option<&'a Registry>,
    sink: &'a dyn LogSink,
}

impl<'a> Dispatcher<'a> {
    /// Create a dispatcher. `registry` may be `None` if nothing has been configured yet, in which
    /// case only snapshots can be consulted.
    pub fn new(registry: Option<&'a Registry>, sink: &'a dyn LogSink) -> Dispatcher<'a> {
        Dispatcher { registry, sink }
    }

    /// Return the active variant of `experiment`: [`Feature::On`]/[`Feature::Off`] for
    /// single-variant experiments, otherwise the first active variant's name.
    pub fn variant_for(&self, experiment: &str, source: Source) -> Result<Feature> {
        let outcome = self.resolve(experiment, source)?;
        Ok(match outcome.active {
            None => Feature::Off,
            Some(_) if outcome.single_variant => Feature::On,
            Some(active) => Feature::Variant(active),
        })
    }

    /// Like [`Dispatcher::variant_for`], but `name` may request an explicit variant
    /// (`"experiment/variant"`), which is returned only if it is the active one.
    pub fn feature(&self, name: &str, source: Source) -> Result<Feature> {
        let (experiment, variant) = split_name(name);
        let Some(variant) = variant else {
            return self.variant_for(experiment, source);
        };

        let outcome = self.resolve(experiment, source)?;
        Ok(match outcome.active {
            Some(active) if active == variant => Feature::Variant(active),
            _ => Feature::Off,
        })
    }

    /// Pick the callback to run for `name`, or `None` if nothing applies.
    ///
    /// With per-variant callbacks, the active variant's callback is chosen, falling back to the
    /// fallback callback when the experiment is inactive, the requested variant is not the active
    /// one, or the active variant has no callback.
    pub fn select<'c, F>(
        &self,
        name: &str,
        source: Source,
        callbacks: &'c Callbacks<F>,
    ) -> Result<Option<&'c F>> {
        let (experiment, variant) = split_name(name);
        let outcome = self.resolve(experiment, source)?;

        let active = outcome
            .active
            .filter(|active| variant.map_or(true, |variant| variant == active));

        Ok(match callbacks {
            Callbacks::Single(callback) => active.map(|_| callback),
            Callbacks::Variants(callbacks) => active
                .and_then(|active| {
                    callbacks.get(&active).or_else(|| {
                        if outcome.single_variant {
                            callbacks.get(DEFAULT_VARIANT)
                        } else {
                            None
                        }
                    })
                })
                .or(callbacks.fallback.as_ref()),
        })
    }

    /// Run the callback chosen by [`Dispatcher::select`] with `args` and return its result.
    pub fn protect<A, R, F: Fn(A) -> R>(
        &self,
        name: &str,
        source: Source,
        callbacks: &Callbacks<F>,
        args: A,
    ) -> Result<Option<R>> {
        Ok(self
            .select(name, source, callbacks)?
            .map(|callback| callback(args)))
    }

    fn resolve(&self, experiment: &str, source: Source) -> Result<Outcome> {
        let Some(state) = self.lookup(experiment, source)? else {
            return Ok(Outcome {
                active: None,
                single_variant: false,
            });
        };

        Ok(match &*state {
            FeatureState::Enabled(is_on) => Outcome {
                active: is_on.then(|| self.implicit_variant(experiment).to_owned()),
                single_variant: true,
            },
            FeatureState::Variants(_) => Outcome {
                active: state.active_variant().map(str::to_owned),
                single_variant: false,
            },
        })
    }

    fn lookup<'s>(
        &self,
        experiment: &str,
        source: Source<'s>,
    ) -> Result<Option<Cow<'s, FeatureState>>> {
        let state = match source {
            Source::Snapshot(snapshot) => snapshot.feature(experiment).map(Cow::Borrowed),
            Source::Context(context) => match self.registry {
                Some(registry) => registry.state_for(experiment, context)?.map(Cow::Owned),
                None => {
                    self.sink.log(&format!(
                        "experiments are not configured, treating \"{experiment}\" as inactive"
                    ));
                    return Ok(None);
                }
            },
        };

        if state.is_none() {
            self.sink.log(&format!("unknown experiment \"{experiment}\""));
        }

        Ok(state)
    }

    fn implicit_variant(&self, experiment: &str) -> &str {
        self.registry
            .and_then(|registry| registry.experiment(experiment))
            .map_or(DEFAULT_VARIANT, |experiment| experiment.implicit_variant())
    }
}

fn split_name(name: &str) -> (&str, Option<&str>) {
    match name.split_once('/') {
        Some((experiment, variant)) => (experiment, Some(variant)),
        None => (name, None),
    }
}
