/// Receiver of warnings produced while resolving experiments, such as lookups of unknown
/// experiment names.
///
/// Closures taking `&str` implement this trait, so a custom sink can be attached with
/// [`ExperimentsConfig::log_sink`](crate::ExperimentsConfig::log_sink):
///
/// ```
/// # use experiments::ExperimentsConfig;
/// let mut config = ExperimentsConfig::new();
/// config.log_sink(|message: &str| eprintln!("experiments: {message}"));
/// ```
///
/// # Errors
///
/// This method should not return errors and should not panic. It is called synchronously from
/// resolution functions, so it should not block either.
pub trait LogSink {
    /// Record one warning.
    fn log(&self, message: &str);
}

/// Default sink: forwards messages to the [`log`] facade as warnings. Messages are dropped if no
/// logger is installed.
pub(crate) struct LogCrateSink;

impl LogSink for LogCrateSink {
    fn log(&self, message: &str) {
        log::warn!(target: "experiments", "{message}");
    }
}

impl<T: Fn(&str)> LogSink for T {
    fn log(&self, message: &str) {
        self(message);
    }
}
