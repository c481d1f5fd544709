use std::{path::PathBuf, sync::Arc};

/// Represents a result type for operations in this crate.
///
/// Configuration functions return [`Error::InvalidConfiguration`] and resolution functions may
/// return [`Error::InvalidIdentifier`]. Unknown experiment names are never an error.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum representing possible errors that can occur while configuring or resolving experiments.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// Configuration document could not be loaded or is invalid.
    #[error(transparent)]
    InvalidConfiguration(#[from] ConfigurationError),

    /// The supplied identifier cannot be normalized (not a finite number or a string).
    #[error("invalid identifier: {value}")]
    InvalidIdentifier {
        /// Debug representation of the rejected value.
        value: String,
    },

    /// A snapshot was requested before any configuration was stored.
    #[error("experiments have not been configured yet")]
    NotConfigured,
}

/// Reasons a configuration document gets rejected.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// Configuration file is missing.
    #[error("file \"{}\" does not exist", .path.display())]
    FileNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// Configuration file could not be read.
    #[error(transparent)]
    // std::io::Error is not clonable, so we're wrapping it in an Arc.
    Io(Arc<std::io::Error>),

    /// Configuration file is not valid JSON.
    #[error("file \"{}\" does not contain valid JSON", .path.display())]
    InvalidJson {
        /// Path of the file.
        path: PathBuf,
        /// Parser error, with line and column.
        #[source]
        source: Arc<serde_json::Error>,
    },

    /// Document is valid JSON but does not follow the configuration grammar.
    #[error("malformed configuration: {0}")]
    Malformed(#[source] Arc<serde_json::Error>),

    /// Document has no `experiments` key.
    #[error("no experiments to configure")]
    MissingExperiments,

    #[error("experiment named '{name}' must start with an ASCII letter and contain only ASCII letters and numbers")]
    #[allow(missing_docs)]
    InvalidExperimentName { name: String },

    #[error("variant named '{experiment}/{variant}' must start with an ASCII letter and contain only ASCII letters and numbers")]
    #[allow(missing_docs)]
    InvalidVariantName { experiment: String, variant: String },

    /// A variant references a group that was not defined.
    #[error("no group named \"{group}\" for experiment {experiment}/{variant}")]
    #[allow(missing_docs)]
    UnknownGroup {
        group: String,
        experiment: String,
        variant: String,
    },

    /// Only the first element of a variant rule list may be a boolean.
    #[error("variant values cannot be booleans ({experiment}/{variant})")]
    #[allow(missing_docs)]
    UnexpectedBoolean { experiment: String, variant: String },

    /// Percentage with a lower bound above its upper bound, e.g. `"50-20%"`.
    #[error("invalid percentage \"{value}\"")]
    #[allow(missing_docs)]
    InvalidPercentage { value: String },

    /// A literal member of a group could not be normalized.
    #[error("invalid member {value} in group \"{group}\"")]
    #[allow(missing_docs)]
    InvalidGroupMember { group: String, value: String },

    #[error("no {kind} named \"{name}\" is registered")]
    #[allow(missing_docs)]
    NotRegistered { kind: &'static str, name: String },

    #[error("a {kind} named \"{name}\" is already registered")]
    #[allow(missing_docs)]
    AlreadyRegistered { kind: &'static str, name: String },
}

impl From<std::io::Error> for ConfigurationError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}

impl From<serde_json::Error> for ConfigurationError {
    fn from(value: serde_json::Error) -> Self {
        Self::Malformed(Arc::new(value))
    }
}
