//! Deterministic, in-process experiment and feature flag assignment.
//!
//! # Overview
//!
//! Experiments are declared in a JSON [`ConfigDocument`] and built into a [`Registry`] of
//! [`Group`]s and [`Experiment`]s. Every experiment has one or more [`Variant`]s; a variant is
//! active for an identity when the identity belongs to one of its groups, falls into its percentage
//! range, or when the variant is switched on unconditionally.
//!
//! Identities are user ids (numbers or strings) or session ids. They are normalized into a
//! [`NormalizedId`], so the same identity lands in the same bucket on every run and on every host.
//!
//! The [`Experiments`] facade ties everything together:
//!
//! - [`Experiments::configure`] builds and activates a registry.
//! - [`Experiments::context_for`] creates a [`Context`] for a request.
//! - [`Experiments::read_for`] resolves all experiments for a context into a [`Snapshot`]. Features
//!   marked dirty in the previous snapshot keep their state.
//! - [`Experiments::select`], [`Experiments::protect`], [`Experiments::feature`] and
//!   [`Experiments::variant_for`] dispatch on the resolved state.
//!
//! # Error Handling
//!
//! Errors are represented by the [`Error`] enum. Configuration problems are reported as
//! [`Error::InvalidConfiguration`] with a [`ConfigurationError`] describing the offending entry.
//!
//! Looking up an unknown experiment is not an error: it is reported to the [`LogSink`] and the
//! experiment is treated as inactive.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate for logging messages under
//! the `experiments` target. Unless a custom [`LogSink`] is configured, warnings about unknown
//! experiments are logged there as well, at `warn` level.
//!
//! Nothing is printed to standard output. Without a `log` backend (such as `env_logger`) and
//! without a custom [`LogSink`], these warnings are discarded. To print them, set a sink with
//! [`ExperimentsConfig::log_sink`]:
//!
//! ```
//! # use experiments::ExperimentsConfig;
//! let mut config = ExperimentsConfig::new();
//! config.log_sink(|message: &str| println!("{message}"));
//! ```
//!
//! # Examples
//!
//! A runnable example can be found in the `demos/simple` directory of this crate.

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]

mod client;
mod client_config;
mod config;
mod context;
mod dispatch;
mod error;
mod experiment;
mod group;
mod identity;
mod log_sink;
mod registry;
mod registry_store;
mod snapshot;
mod variant;

pub use client::Experiments;
pub use client_config::ExperimentsConfig;
pub use config::{
    configure, configure_for_env, configure_from_file, ConfigDocument, ExperimentConfig,
    GroupConfig, Rule, VariantConfig, DEFAULT_ENV_VARIABLE, EVERYONE,
};
pub use context::{Context, SessionIds};
pub use dispatch::{Callbacks, Dispatcher, Feature, Source, VariantCallbacks, FALLBACK};
pub use error::{ConfigurationError, Error, Result};
pub use experiment::{Experiment, DEFAULT_VARIANT};
pub use group::Group;
pub use identity::{in_range, normalize, Identity, NormalizedId, PercentRange, RawId, BUCKETS};
pub use log_sink::LogSink;
pub use registry::Registry;
pub use registry_store::RegistryStore;
pub use snapshot::{FeatureState, Snapshot};
pub use variant::Variant;
