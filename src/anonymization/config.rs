//! Anonymization configuration

use crate::anonymization::derive;
use crate::anonymization::dictionary::TagDictionary;
use crate::domain::{Seed, Tag, UidRoot};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// `[anonymization]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnonymizationConfig {
    /// Global salt for hashing and derivation, used when a study names no seed
    pub random_seed: Seed,

    /// Tag holding the station name
    #[serde(default = "default_station_tag")]
    pub station_tag: Tag,

    /// Study used when a record's study key has no policy of its own
    #[serde(default)]
    pub default_policy: Option<String>,

    /// Root of derived unique identifiers
    #[serde(default)]
    pub uid_root: UidRoot,

    /// Extra `Tag = "VR"` dictionary entries
    #[serde(default)]
    pub dictionary: BTreeMap<String, String>,
}

fn default_station_tag() -> Tag {
    Tag::new("StationName").expect("constant tag is non-empty")
}

impl AnonymizationConfig {
    /// Configuration with defaults around the given seed
    pub fn with_seed(random_seed: Seed) -> Self {
        Self {
            random_seed,
            station_tag: default_station_tag(),
            default_policy: None,
            uid_root: UidRoot::default(),
            dictionary: BTreeMap::new(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.random_seed.is_empty() {
            anyhow::bail!("anonymization.random_seed cannot be empty");
        }

        if let Some(ref name) = self.default_policy {
            if name.trim().is_empty() {
                anyhow::bail!("anonymization.default_policy cannot be blank");
            }
        }

        self.tag_dictionary()
            .map_err(anyhow::Error::msg)
            .context("Invalid anonymization.dictionary")?;

        derive::self_check(&self.uid_root).context("Identifier derivation self-check failed")?;

        Ok(())
    }

    /// Built-in tag dictionary extended with configured entries
    pub fn tag_dictionary(&self) -> std::result::Result<TagDictionary, String> {
        let mut dictionary = TagDictionary::builtin();
        dictionary.extend_from_config(&self.dictionary)?;
        Ok(dictionary)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("DEIDENT_ANONYMIZATION_RANDOM_SEED") {
            self.random_seed = Seed::new(val);
        }

        if let Ok(val) = std::env::var("DEIDENT_ANONYMIZATION_STATION_TAG") {
            self.station_tag = Tag::new(val)
                .map_err(anyhow::Error::msg)
                .context("Invalid DEIDENT_ANONYMIZATION_STATION_TAG value")?;
        }

        if let Ok(val) = std::env::var("DEIDENT_ANONYMIZATION_DEFAULT_POLICY") {
            self.default_policy = Some(val);
        }

        if let Ok(val) = std::env::var("DEIDENT_ANONYMIZATION_UID_ROOT") {
            self.uid_root = UidRoot::new(&val)
                .map_err(anyhow::Error::msg)
                .context("Invalid DEIDENT_ANONYMIZATION_UID_ROOT value")?;
        }

        Ok(())
    }
}

/// `[audit]` section: the diagnostic trail written next to the outputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Enable the diagnostic log
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,

    /// Diagnostic log file path
    #[serde(default = "default_audit_log_path")]
    pub log_path: PathBuf,

    /// Use JSON lines instead of plain text
    #[serde(default = "default_audit_json_format")]
    pub json_format: bool,
}

fn default_audit_enabled() -> bool {
    true
}

fn default_audit_log_path() -> PathBuf {
    PathBuf::from("./audit/diagnostics.log")
}

fn default_audit_json_format() -> bool {
    true
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            log_path: default_audit_log_path(),
            json_format: default_audit_json_format(),
        }
    }
}

impl AuditConfig {
    /// Validate audit configuration
    pub fn validate(&self) -> Result<()> {
        if self.enabled && self.log_path.as_os_str().is_empty() {
            anyhow::bail!("audit.log_path cannot be empty when audit is enabled");
        }
        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("DEIDENT_AUDIT_ENABLED") {
            self.enabled = val.parse().context("Invalid DEIDENT_AUDIT_ENABLED value")?;
        }

        if let Ok(val) = std::env::var("DEIDENT_AUDIT_LOG_PATH") {
            self.log_path = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("DEIDENT_AUDIT_JSON_FORMAT") {
            self.json_format = val
                .parse()
                .context("Invalid DEIDENT_AUDIT_JSON_FORMAT value")?;
        }

        Ok(())
    }
}
