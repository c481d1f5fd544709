use crate::{
    log_sink::{LogCrateSink, LogSink},
    Experiments,
};

/// Configuration for [`Experiments`].
pub struct ExperimentsConfig<'a> {
    pub(crate) log_sink: Box<dyn LogSink + Send + Sync + 'a>,
    pub(crate) target_env: Option<String>,
}

impl<'a> ExperimentsConfig<'a> {
    /// Create a default configuration: warnings go to the [`log`] crate and the deployment
    /// environment is read from the process environment.
    ///
    /// ```
    /// # use experiments::ExperimentsConfig;
    /// ExperimentsConfig::new();
    /// ```
    pub fn new() -> Self {
        ExperimentsConfig {
            log_sink: Box::new(LogCrateSink),
            target_env: None,
        }
    }

    /// Set the sink receiving warnings about unknown experiments.
    ///
    /// ```
    /// # use experiments::ExperimentsConfig;
    /// let mut config = ExperimentsConfig::new();
    /// config.log_sink(|message: &str| println!("{message}"));
    /// ```
    pub fn log_sink(&mut self, log_sink: impl LogSink + Send + Sync + 'a) -> &mut Self {
        self.log_sink = Box::new(log_sink);
        self
    }

    /// Use `target_env` as the deployment environment instead of reading the environment variable
    /// named by the configuration document.
    pub fn target_env(&mut self, target_env: impl Into<String>) -> &mut Self {
        self.target_env = Some(target_env.into());
        self
    }

    /// Create a new [`Experiments`] using the specified configuration.
    ///
    /// ```
    /// # use experiments::{Experiments, ExperimentsConfig};
    /// let experiments: Experiments = ExperimentsConfig::new().to_client();
    /// ```
    pub fn to_client(self) -> Experiments<'a> {
        Experiments::new(self)
    }
}

impl<'a> Default for ExperimentsConfig<'a> {
    fn default() -> Self {
        ExperimentsConfig::new()
    }
}
