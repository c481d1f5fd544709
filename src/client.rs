use std::{path::Path, sync::Arc};

use crate::{
    config::{configure, configure_for_env, ConfigDocument},
    context::SessionIds,
    dispatch::{Callbacks, Dispatcher, Feature, Source},
    identity::RawId,
    registry_store::RegistryStore,
    Context, Error, ExperimentsConfig, Registry, Result, Snapshot,
};

/// Entry point tying together configuration, contexts, snapshots, and dispatch.
///
/// Configure once at startup, then create a [`Context`] per request and resolve experiments
/// against it.
///
/// # Examples
/// ```
/// # use experiments::{ConfigDocument, Experiments, ExperimentsConfig, Feature};
/// let experiments = Experiments::new(ExperimentsConfig::new());
/// experiments
///     .configure(ConfigDocument::from_json(r#"{
///         "experiments": {"buttonColor": {"redButton": "0-10%", "greenButton": "11-20%"}}
///     }"#)?)?;
///
/// let context = experiments.context_for(None, Some(15.into()));
/// let snapshot = experiments.read_for(&context, None)?;
/// assert_eq!(
///     experiments.feature("buttonColor", &snapshot)?,
///     Feature::Variant("greenButton".to_owned())
/// );
/// # Ok::<(), experiments::Error>(())
/// ```
pub struct Experiments<'a> {
    store: Arc<RegistryStore>,
    session_ids: SessionIds,
    config: ExperimentsConfig<'a>,
}

impl<'a> Experiments<'a> {
    /// Create a new `Experiments` using the specified configuration. Nothing is configured yet.
    pub fn new(config: ExperimentsConfig<'a>) -> Self {
        Experiments {
            store: Arc::new(RegistryStore::new()),
            session_ids: SessionIds::new(),
            config,
        }
    }

    #[cfg(test)]
    fn new_with_store(config: ExperimentsConfig<'a>, store: Arc<RegistryStore>) -> Self {
        Experiments {
            store,
            session_ids: SessionIds::starting_at(1),
            config,
        }
    }

    /// Build a registry from `doc` and make it active.
    ///
    /// On error the previously active registry (if any) stays in place.
    pub fn configure(&self, doc: ConfigDocument) -> Result<()> {
        let registry = match &self.config.target_env {
            Some(target_env) => configure_for_env(doc, Some(target_env)),
            None => configure(doc),
        }?;
        self.store.set_registry(registry);
        Ok(())
    }

    /// Read a JSON document from `path` and [`configure`](Experiments::configure) it.
    pub fn configure_from_file(&self, path: impl AsRef<Path>) -> Result<()> {
        self.configure(ConfigDocument::from_file(path)?)
    }

    /// Currently active registry.
    pub fn registry(&self) -> Option<Arc<Registry>> {
        self.store.get_registry()
    }

    /// Create a context. A fresh session id is generated if none is given.
    pub fn context_for(&self, session_id: Option<u64>, user_id: Option<RawId>) -> Context {
        let session_id = session_id.unwrap_or_else(|| self.session_ids.next_id());
        Context::new(session_id, user_id)
    }

    /// Resolve every experiment for `context`, keeping pinned features of `previous`.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConfigured`] if nothing has been configured yet.
    /// - [`Error::InvalidIdentifier`] if the context's user id cannot be normalized.
    pub fn read_for(&self, context: &Context, previous: Option<Snapshot>) -> Result<Snapshot> {
        let Some(registry) = self.store.get_registry() else {
            log::warn!(target: "experiments",
                       session_id = context.session_id();
                       "resolving experiments before configuration");
            return Err(Error::NotConfigured);
        };

        registry.for_context(context, previous)
    }

    /// See [`Dispatcher::select`].
    pub fn select<'s, 'c, F>(
        &self,
        name: &str,
        source: impl Into<Source<'s>>,
        callbacks: &'c Callbacks<F>,
    ) -> Result<Option<&'c F>> {
        self.with_dispatcher(|dispatcher| dispatcher.select(name, source.into(), callbacks))
    }

    /// See [`Dispatcher::protect`].
    pub fn protect<'s, A, R, F: Fn(A) -> R>(
        &self,
        name: &str,
        source: impl Into<Source<'s>>,
        callbacks: &Callbacks<F>,
        args: A,
    ) -> Result<Option<R>> {
        self.with_dispatcher(|dispatcher| dispatcher.protect(name, source.into(), callbacks, args))
    }

    /// See [`Dispatcher::feature`].
    pub fn feature<'s>(&self, name: &str, source: impl Into<Source<'s>>) -> Result<Feature> {
        self.with_dispatcher(|dispatcher| dispatcher.feature(name, source.into()))
    }

    /// See [`Dispatcher::variant_for`].
    pub fn variant_for<'s>(&self, name: &str, source: impl Into<Source<'s>>) -> Result<Feature> {
        self.with_dispatcher(|dispatcher| dispatcher.variant_for(name, source.into()))
    }

    fn with_dispatcher<T>(&self, f: impl FnOnce(&Dispatcher) -> T) -> T {
        let registry = self.store.get_registry();
        f(&Dispatcher::new(
            registry.as_deref(),
            self.config.log_sink.as_ref(),
        ))
    }
}
