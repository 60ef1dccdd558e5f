//! Policies, station profiles and their lookup tables
//!
//! Definitions are deserialized in the legacy `studies.json` / `stations.json`
//! shape (PascalCase keys) and compiled into immutable [`PolicyConfig`] and
//! [`StationProfile`] values shared read-only by every record of a batch.

use crate::domain::{normalize_key, DeidError, Result, Seed, StudyKey, Tag, Vr};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Name of the fallback station profile
pub const DEFAULT_STATION: &str = "default";

/// Literal value sentinel requesting the batch "now" instant
pub const NOW_SENTINEL: &str = "@now";

/// Value written by the `value` action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiteralValue {
    /// `null` or no value: the field becomes empty
    Empty,
    /// A fixed string
    Text(String),
    /// The batch "now" instant, formatted per the field's temporal VR
    Now,
}

/// The closed set of field actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawActionSpec", into = "RawActionSpec")]
pub enum ActionSpec {
    Keep,
    Delete,
    Clear,
    Hash { salt: Option<Seed> },
    Literal { value: LiteralValue },
    Offset { delta: Option<i64>, seed: Option<Seed> },
    Regenerate { seed: Option<Seed> },
}

impl ActionSpec {
    /// Wire name of the action
    pub fn name(&self) -> &'static str {
        match self {
            Self::Keep => "keep",
            Self::Delete => "delete",
            Self::Clear => "clear",
            Self::Hash { .. } => "hash",
            Self::Literal { .. } => "value",
            Self::Offset { .. } => "offset",
            Self::Regenerate { .. } => "regen",
        }
    }
}

impl fmt::Display for ActionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Wire form of an action: `{ "action": "hash", "salt": "..." }`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawActionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    salt: Option<Seed>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    delta: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    seed: Option<Seed>,
}

impl TryFrom<RawActionSpec> for ActionSpec {
    type Error = String;

    fn try_from(raw: RawActionSpec) -> std::result::Result<Self, Self::Error> {
        // A rule without an action deletes the field.
        let action = raw
            .action
            .as_deref()
            .map(|a| a.trim().to_lowercase())
            .unwrap_or_else(|| "delete".to_string());

        let unexpected = |key: &str| format!("'{key}' is not valid for action '{action}'");
        let takes_seed = matches!(action.as_str(), "offset" | "regen" | "regenerate");

        if raw.salt.is_some() && action != "hash" {
            return Err(unexpected("salt"));
        }
        if raw.value.is_some() && !matches!(action.as_str(), "value" | "literal") {
            return Err(unexpected("value"));
        }
        if raw.delta.is_some() && action != "offset" {
            return Err(unexpected("delta"));
        }
        if raw.seed.is_some() && !takes_seed {
            return Err(unexpected("seed"));
        }
        for seed in [&raw.salt, &raw.seed].into_iter().flatten() {
            if seed.is_empty() {
                return Err(format!("empty salt/seed for action '{action}'"));
            }
        }

        match action.as_str() {
            "keep" => Ok(Self::Keep),
            "delete" => Ok(Self::Delete),
            "clear" => Ok(Self::Clear),
            "hash" => Ok(Self::Hash { salt: raw.salt }),
            "value" | "literal" => Ok(Self::Literal {
                value: match raw.value {
                    None => LiteralValue::Empty,
                    Some(v) if v == NOW_SENTINEL => LiteralValue::Now,
                    Some(v) => LiteralValue::Text(v),
                },
            }),
            "offset" => {
                if let Some(delta) = raw.delta {
                    if delta.abs() > crate::anonymization::derive::MAX_OFFSET_SECONDS {
                        return Err(format!("offset delta {delta} exceeds ±100 years"));
                    }
                }
                Ok(Self::Offset {
                    delta: raw.delta,
                    seed: raw.seed,
                })
            }
            "regen" | "regenerate" => Ok(Self::Regenerate { seed: raw.seed }),
            other => Err(format!("unknown action '{other}'")),
        }
    }
}

impl From<ActionSpec> for RawActionSpec {
    fn from(spec: ActionSpec) -> Self {
        let mut raw = RawActionSpec {
            action: Some(spec.name().to_string()),
            ..Default::default()
        };
        match spec {
            ActionSpec::Keep | ActionSpec::Delete | ActionSpec::Clear => {}
            ActionSpec::Hash { salt } => raw.salt = salt,
            ActionSpec::Literal { value } => {
                raw.value = match value {
                    LiteralValue::Empty => None,
                    LiteralValue::Text(v) => Some(v),
                    LiteralValue::Now => Some(NOW_SENTINEL.to_string()),
                }
            }
            ActionSpec::Offset { delta, seed } => {
                raw.delta = delta;
                raw.seed = seed;
            }
            ActionSpec::Regenerate { seed } => raw.seed = seed,
        }
        raw
    }
}

fn default_remove_private_tags() -> bool {
    true
}

/// One study's rules, as written in configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudyDefinition {
    #[serde(rename = "RemovePrivateTags", default = "default_remove_private_tags")]
    pub remove_private_tags: bool,

    #[serde(rename = "SavePrivateTags", default)]
    pub save_private_tags: Vec<Tag>,

    #[serde(rename = "AnonymizeTag", default)]
    pub anonymize_tag: BTreeMap<String, ActionSpec>,

    #[serde(rename = "AnonymizeVR", default)]
    pub anonymize_vr: BTreeMap<String, ActionSpec>,

    #[serde(rename = "RandomSeed", default, skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<Seed>,
}

/// Compiled, immutable policy for one study
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyConfig {
    /// Normalized study name
    pub name: String,
    pub strip_private: bool,
    pub preserved_private_tags: BTreeSet<Tag>,
    pub tag_rules: BTreeMap<Tag, ActionSpec>,
    pub vr_rules: BTreeMap<Vr, ActionSpec>,
    pub default_seed: Seed,
}

impl PolicyConfig {
    /// An empty policy: keep everything, strip nothing
    pub fn new(name: &str, default_seed: Seed) -> Self {
        Self {
            name: normalize_key(name),
            strip_private: false,
            preserved_private_tags: BTreeSet::new(),
            tag_rules: BTreeMap::new(),
            vr_rules: BTreeMap::new(),
            default_seed,
        }
    }

    /// Compiles a definition, falling back to `global_seed` when it names no seed
    pub fn from_definition(
        name: &str,
        definition: &StudyDefinition,
        global_seed: &Seed,
    ) -> std::result::Result<Self, String> {
        let default_seed = definition
            .random_seed
            .clone()
            .unwrap_or_else(|| global_seed.clone());
        if default_seed.is_empty() {
            return Err(format!("study '{name}' has an empty RandomSeed"));
        }

        let mut tag_rules = BTreeMap::new();
        for (tag, action) in &definition.anonymize_tag {
            let tag = Tag::new(tag.as_str()).map_err(|e| format!("study '{name}': {e}"))?;
            tag_rules.insert(tag, action.clone());
        }

        let mut vr_rules = BTreeMap::new();
        for (vr, action) in &definition.anonymize_vr {
            let vr = Vr::from_str(vr).map_err(|e| format!("study '{name}': {e}"))?;
            vr_rules.insert(vr, action.clone());
        }

        Ok(Self {
            name: normalize_key(name),
            strip_private: definition.remove_private_tags,
            preserved_private_tags: definition.save_private_tags.iter().cloned().collect(),
            tag_rules,
            vr_rules,
            default_seed,
        })
    }

    /// Adds a tag rule (builder style, mostly for tests and embedding)
    pub fn with_tag_rule(mut self, tag: Tag, action: ActionSpec) -> Self {
        self.tag_rules.insert(tag, action);
        self
    }

    /// Adds a VR rule
    pub fn with_vr_rule(mut self, vr: Vr, action: ActionSpec) -> Self {
        self.vr_rules.insert(vr, action);
        self
    }

    /// Enables private-field stripping, preserving the given tags
    pub fn with_private_stripping(mut self, preserved: impl IntoIterator<Item = Tag>) -> Self {
        self.strip_private = true;
        self.preserved_private_tags = preserved.into_iter().collect();
        self
    }
}

/// How to find the study key on records from one station
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationProfile {
    #[serde(rename = "TagForStudy")]
    pub study_tag: Tag,

    #[serde(
        rename = "StudySplit",
        alias = "Split",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub split_delimiter: Option<String>,

    #[serde(rename = "StudySplitIndex", alias = "SplitIndex", default)]
    pub split_index: usize,
}

impl StationProfile {
    /// Profile reading the study key straight from `study_tag`
    pub fn new(study_tag: Tag) -> Self {
        Self {
            study_tag,
            split_delimiter: None,
            split_index: 0,
        }
    }

    /// Profile splitting the study field on `delimiter` and taking component `index`
    pub fn with_split(mut self, delimiter: impl Into<String>, index: usize) -> Self {
        self.split_delimiter = Some(delimiter.into());
        self.split_index = index;
        self
    }

    /// Delimiter, treating an empty string as "no split"
    pub fn delimiter(&self) -> Option<&str> {
        self.split_delimiter.as_deref().filter(|d| !d.is_empty())
    }
}

/// Policy table keyed by normalized study name
#[derive(Debug, Clone)]
pub struct PolicyTable {
    policies: HashMap<String, Arc<PolicyConfig>>,
    default_policy: Option<String>,
}

impl PolicyTable {
    /// Compiles study definitions
    ///
    /// # Errors
    ///
    /// Configuration errors for duplicate normalized names, malformed rules,
    /// or a `default_policy` naming no study.
    pub fn build<'a>(
        definitions: impl IntoIterator<Item = (&'a String, &'a StudyDefinition)>,
        default_policy: Option<&str>,
        global_seed: &Seed,
    ) -> Result<Self> {
        let mut policies = HashMap::new();
        for (name, definition) in definitions {
            let policy = PolicyConfig::from_definition(name, definition, global_seed)
                .map_err(DeidError::Configuration)?;
            let key = policy.name.clone();
            if policies.insert(key.clone(), Arc::new(policy)).is_some() {
                return Err(DeidError::Configuration(format!(
                    "study '{key}' is defined more than once (names are case-insensitive)"
                )));
            }
        }

        let default_policy = default_policy.map(normalize_key);
        if let Some(ref name) = default_policy {
            if !policies.contains_key(name) {
                return Err(DeidError::Configuration(format!(
                    "default_policy '{name}' does not name a configured study"
                )));
            }
        }

        Ok(Self {
            policies,
            default_policy,
        })
    }

    /// Table from already compiled policies
    pub fn from_policies(
        policies: impl IntoIterator<Item = PolicyConfig>,
        default_policy: Option<&str>,
    ) -> Self {
        Self {
            policies: policies
                .into_iter()
                .map(|p| (p.name.clone(), Arc::new(p)))
                .collect(),
            default_policy: default_policy.map(normalize_key),
        }
    }

    /// Policy for `key`, falling back to the default policy
    pub fn lookup(&self, key: &StudyKey) -> Option<Arc<PolicyConfig>> {
        self.policies
            .get(key.as_str())
            .or_else(|| {
                self.default_policy
                    .as_ref()
                    .and_then(|name| self.policies.get(name))
            })
            .cloned()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<PolicyConfig>> {
        self.policies.get(&normalize_key(name))
    }

    pub fn default_policy(&self) -> Option<&str> {
        self.default_policy.as_deref()
    }

    /// Sorted policy names
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.policies.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

/// Station table keyed by normalized station name, with a mandatory `default`
#[derive(Debug, Clone)]
pub struct StationTable {
    stations: HashMap<String, StationProfile>,
    fallback: StationProfile,
}

impl StationTable {
    /// Builds the table
    ///
    /// # Errors
    ///
    /// Configuration errors for duplicate normalized names or a missing
    /// `default` entry.
    pub fn build<'a>(
        definitions: impl IntoIterator<Item = (&'a String, &'a StationProfile)>,
    ) -> Result<Self> {
        let mut stations = HashMap::new();
        for (name, profile) in definitions {
            let key = normalize_key(name);
            if stations.insert(key.clone(), profile.clone()).is_some() {
                return Err(DeidError::Configuration(format!(
                    "station '{key}' is defined more than once (names are case-insensitive)"
                )));
            }
        }

        let fallback = stations.get(DEFAULT_STATION).cloned().ok_or_else(|| {
            DeidError::Configuration(format!(
                "station table must contain a '{DEFAULT_STATION}' entry"
            ))
        })?;

        Ok(Self { stations, fallback })
    }

    /// Profile for a raw station name, falling back to `default`
    pub fn lookup(&self, station: &str) -> &StationProfile {
        self.stations
            .get(&normalize_key(station))
            .unwrap_or(&self.fallback)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}
