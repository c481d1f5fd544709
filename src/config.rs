//! Loading of the declarative configuration document into a [`Registry`].
//!
//! ```json
//! {
//!   "DEPLOYMENT_ENV_VARIABLE": "TARGET_ENV",
//!   "envs": { "test": { "featureFour": false } },
//!   "groups": { "staff": [1, 2, "owner@example.com"], "phase 1": "0-10%" },
//!   "experiments": {
//!     "featureOne": "37%",
//!     "featureTwo": ["staff", "phase 1"],
//!     "buttonColor": { "redButton": "0-10%", "greenButton": "11-20%" },
//!     "featureFour": true
//!   }
//! }
//! ```
use std::{collections::HashMap, path::Path, sync::OnceLock};

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigurationError,
    experiment::{Experiment, DEFAULT_VARIANT},
    group::Group,
    identity::{PercentRange, RawId},
    registry::Registry,
    variant::Variant,
    Result,
};

/// Environment variable holding the deployment environment, unless the document overrides it.
pub const DEFAULT_ENV_VARIABLE: &str = "TARGET_ENV";

/// Rule string that matches the whole population, same as `"100%"`.
pub const EVERYONE: &str = "everyone";

/// The configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    /// Name of the environment variable that selects an entry of `envs`.
    #[serde(
        rename = "DEPLOYMENT_ENV_VARIABLE",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub deployment_env_variable: Option<String>,
    /// Per-environment experiment overrides. Each entry replaces the same-named experiment
    /// completely.
    #[serde(default)]
    pub envs: HashMap<String, IndexMap<String, ExperimentConfig>>,
    #[serde(default)]
    /// Named groups, referenced from experiment rules.
    pub groups: IndexMap<String, GroupConfig>,
    /// Required. A document without experiments is rejected by [`configure`].
    #[serde(default)]
    pub experiments: Option<IndexMap<String, ExperimentConfig>>,
}

/// Members of a group: literal ids and/or percentages. A single value stands for a one-element
/// list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupConfig {
    /// Ids and percentages.
    Members(Vec<RawId>),
    /// A single id or percentage.
    Member(RawId),
}

/// Configuration of one experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExperimentConfig {
    /// `true`/`false`: a single always-on/always-off variant.
    Flag(bool),
    /// A percentage or a group name for a single variant.
    Rule(String),
    /// Rules of a single variant.
    Rules(Vec<Rule>),
    /// Named variants, in registration order.
    Variants(IndexMap<String, VariantConfig>),
}

/// Rules of a single variant. A single rule stands for a one-element list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariantConfig {
    /// Rules, an optional leading override first.
    Rules(Vec<Rule>),
    /// A single rule.
    Rule(Rule),
}

/// One element of a variant rule list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rule {
    /// On/off override. Only allowed as the first element.
    Flag(bool),
    /// Percentage (`"37%"`, `"11-20%"`, `"everyone"`) or group name.
    Text(String),
}

impl ConfigDocument {
    /// Parse a document from a JSON value, e.g. one built with `serde_json::json!`.
    pub fn from_value(value: serde_json::Value) -> Result<ConfigDocument> {
        serde_json::from_value(value).map_err(|err| ConfigurationError::from(err).into())
    }

    /// Parse a document from a JSON string.
    pub fn from_json(json: &str) -> Result<ConfigDocument> {
        serde_json::from_str(json).map_err(|err| ConfigurationError::from(err).into())
    }

    /// Read and parse a JSON document from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<ConfigDocument> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigurationError::FileNotFound {
                path: path.to_owned(),
            }
            .into());
        }

        let contents = std::fs::read_to_string(path).map_err(ConfigurationError::from)?;

        serde_json::from_str(&contents).map_err(|err| {
            if err.is_syntax() || err.is_eof() {
                ConfigurationError::InvalidJson {
                    path: path.to_owned(),
                    source: err.into(),
                }
                .into()
            } else {
                ConfigurationError::from(err).into()
            }
        })
    }

    /// Name of the environment variable selecting the deployment environment.
    pub fn env_variable(&self) -> &str {
        self.deployment_env_variable
            .as_deref()
            .unwrap_or(DEFAULT_ENV_VARIABLE)
    }
}

/// Build a [`Registry`] from `doc`, taking the deployment environment from the process
/// environment variable named by [`ConfigDocument::env_variable`].
pub fn configure(doc: ConfigDocument) -> Result<Registry> {
    let target_env = std::env::var(doc.env_variable()).ok();
    configure_for_env(doc, target_env.as_deref())
}

/// Read a JSON document from `path` and [`configure`] it.
pub fn configure_from_file(path: impl AsRef<Path>) -> Result<Registry> {
    configure(ConfigDocument::from_file(path)?)
}

/// Build a [`Registry`] from `doc` for an explicitly given deployment environment.
///
/// If `target_env` names an entry of `doc.envs`, its experiments replace the same-named entries of
/// `doc.experiments`.
pub fn configure_for_env(mut doc: ConfigDocument, target_env: Option<&str>) -> Result<Registry> {
    let mut registry = Registry::new();

    for (name, config) in &doc.groups {
        registry.register_group(build_group(name, config)?);
    }

    let mut experiments = doc
        .experiments
        .take()
        .ok_or(ConfigurationError::MissingExperiments)?;

    if let Some(overrides) = target_env.and_then(|env| doc.envs.remove(env)) {
        experiments.extend(overrides);
    }

    for (name, config) in experiments {
        let experiment = build_experiment(&registry, name, config)?;
        registry.register_experiment(experiment);
    }

    log::debug!(target: "experiments",
                groups = registry.group_count(),
                experiments = registry.experiment_count(),
                target_env:debug,
                configured_at:display = registry.configured_at;
                "configured experiments");

    Ok(registry)
}

pub(crate) fn is_valid_name(name: &str) -> bool {
    static NAME: OnceLock<Regex> = OnceLock::new();
    NAME.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]*$").expect("valid regex"))
        .is_match(name)
}

/// Parse `"37%"`, `"11-20%"` or `"everyone"`. Returns `None` if `rule` is not a percentage.
fn parse_percentage(rule: &str) -> Option<std::result::Result<PercentRange, ConfigurationError>> {
    static PERCENTAGE: OnceLock<Regex> = OnceLock::new();

    if rule == EVERYONE {
        return Some(Ok(PercentRange::EVERYONE));
    }

    let captures = PERCENTAGE
        .get_or_init(|| Regex::new(r"^(?:(\d{1,3})-)?(\d{1,3})%$").expect("valid regex"))
        .captures(rule)?;
    // At most three digits, so parsing cannot overflow.
    let bound = |i: usize| captures.get(i).and_then(|m| m.as_str().parse::<u64>().ok());

    let (low, high) = (bound(1).unwrap_or(0), bound(2)?);
    if low > high {
        return Some(Err(ConfigurationError::InvalidPercentage {
            value: rule.to_owned(),
        }));
    }

    Some(Ok(PercentRange::new(Some(low), Some(high))))
}

fn build_group(name: &str, config: &GroupConfig) -> Result<Group> {
    let members = match config {
        GroupConfig::Members(members) => members.as_slice(),
        GroupConfig::Member(member) => std::slice::from_ref(member),
    };

    let mut group = Group::new(name);
    for member in members {
        match member {
            RawId::String(s) => match parse_percentage(s) {
                Some(range) => group.set_percentage(range?),
                None => group.add_member(member)?,
            },
            _ => group
                .add_member(member)
                .map_err(|_| ConfigurationError::InvalidGroupMember {
                    group: name.to_owned(),
                    value: format!("{member:?}"),
                })?,
        }
    }

    Ok(group)
}

fn default_variant(rules: Vec<Rule>) -> IndexMap<String, Vec<Rule>> {
    IndexMap::from([(DEFAULT_VARIANT.to_owned(), rules)])
}

fn build_experiment(
    registry: &Registry,
    name: String,
    config: ExperimentConfig,
) -> Result<Experiment> {
    if !is_valid_name(&name) {
        return Err(ConfigurationError::InvalidExperimentName { name }.into());
    }

    let variants = match config {
        ExperimentConfig::Flag(flag) => default_variant(vec![Rule::Flag(flag)]),
        ExperimentConfig::Rule(rule) => default_variant(vec![Rule::Text(rule)]),
        ExperimentConfig::Rules(rules) => default_variant(rules),
        ExperimentConfig::Variants(variants) => variants
            .into_iter()
            .map(|(name, config)| {
                let rules = match config {
                    VariantConfig::Rules(rules) => rules,
                    VariantConfig::Rule(rule) => vec![rule],
                };
                (name, rules)
            })
            .collect(),
    };

    let mut experiment = Experiment::new(name);
    for (variant_name, rules) in variants {
        let variant = build_variant(registry, experiment.name(), variant_name, rules)?;
        experiment.add_variant(variant);
    }

    Ok(experiment)
}

fn build_variant(
    registry: &Registry,
    experiment: &str,
    name: String,
    rules: Vec<Rule>,
) -> Result<Variant> {
    if !is_valid_name(&name) {
        return Err(ConfigurationError::InvalidVariantName {
            experiment: experiment.to_owned(),
            variant: name,
        }
        .into());
    }

    let mut variant = Variant::new(name);
    for (i, rule) in rules.into_iter().enumerate() {
        match rule {
            Rule::Flag(is_on) if i == 0 => variant.set_is_on(is_on),
            Rule::Flag(_) => {
                return Err(ConfigurationError::UnexpectedBoolean {
                    experiment: experiment.to_owned(),
                    variant: variant.name().to_owned(),
                }
                .into())
            }
            Rule::Text(text) => match parse_percentage(&text) {
                Some(range) => variant.set_percentage(range?),
                None => {
                    let group = registry.group(&text).ok_or_else(|| {
                        ConfigurationError::UnknownGroup {
                            group: text.clone(),
                            experiment: experiment.to_owned(),
                            variant: variant.name().to_owned(),
                        }
                    })?;
                    variant.add_group(group.clone());
                }
            },
        }
    }

    Ok(variant)
}
