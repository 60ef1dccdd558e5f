//! Configuration schema types
//!
//! This module defines the configuration structure that maps to `deident.toml`.

use crate::anonymization::config::{AnonymizationConfig, AuditConfig};
use crate::anonymization::policy::{PolicyTable, StationProfile, StationTable, StudyDefinition};
use crate::domain::{DeidError, Result as DeidResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Main deident configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeidConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Seeds, identifier root and dictionary
    pub anonymization: AnonymizationConfig,

    /// Input/output and worker pool settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Diagnostic trail
    #[serde(default)]
    pub audit: AuditConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// External policy/station table files
    #[serde(default)]
    pub tables: TablesConfig,

    /// Inline study policies keyed by study name
    #[serde(default)]
    pub studies: BTreeMap<String, StudyDefinition>,

    /// Inline station profiles keyed by station name
    #[serde(default)]
    pub stations: BTreeMap<String, StationProfile>,
}

impl DeidConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.anonymization
            .validate()
            .map_err(|e| format!("{e:#}"))?;
        self.batch.validate()?;
        self.audit.validate().map_err(|e| format!("{e:#}"))?;
        self.logging.validate()?;
        Ok(())
    }

    /// Compiles the study definitions into a policy table
    pub fn policy_table(&self) -> DeidResult<PolicyTable> {
        PolicyTable::build(
            &self.studies,
            self.anonymization.default_policy.as_deref(),
            &self.anonymization.random_seed,
        )
    }

    /// Builds the station table
    pub fn station_table(&self) -> DeidResult<StationTable> {
        StationTable::build(&self.stations)
    }

    /// Merges table definitions loaded from an external file
    ///
    /// A name defined both inline and in the file is a configuration error.
    pub fn merge_studies(&mut self, studies: BTreeMap<String, StudyDefinition>) -> DeidResult<()> {
        merge_unique(&mut self.studies, studies, "study")
    }

    /// Merges station profiles loaded from an external file
    pub fn merge_stations(
        &mut self,
        stations: BTreeMap<String, StationProfile>,
    ) -> DeidResult<()> {
        merge_unique(&mut self.stations, stations, "station")
    }
}

fn merge_unique<T>(
    target: &mut BTreeMap<String, T>,
    source: BTreeMap<String, T>,
    kind: &str,
) -> DeidResult<()> {
    for (name, value) in source {
        if target.contains_key(&name) {
            return Err(DeidError::Configuration(format!(
                "{kind} '{name}' is defined both inline and in a table file"
            )));
        }
        target.insert(name, value);
    }
    Ok(())
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Dry run mode (process and report, write nothing)
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dry_run: false,
        }
    }
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// Batch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Directory scanned recursively for input records
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,

    /// Directory receiving de-identified records
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Records processed concurrently
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Replace existing output files
    #[serde(default)]
    pub overwrite: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
            max_concurrency: default_max_concurrency(),
            overwrite: false,
        }
    }
}

impl BatchConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_concurrency == 0 || self.max_concurrency > 256 {
            return Err(format!(
                "batch.max_concurrency must be between 1 and 256, got {}",
                self.max_concurrency
            ));
        }

        if self.input_dir.as_os_str().is_empty() {
            return Err("batch.input_dir cannot be empty".to_string());
        }

        if self.output_dir.as_os_str().is_empty() {
            return Err("batch.output_dir cannot be empty".to_string());
        }

        if self.input_dir == self.output_dir {
            return Err("batch.output_dir must differ from batch.input_dir".to_string());
        }

        Ok(())
    }
}

/// Paths to tables kept outside the main configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TablesConfig {
    /// Study policies (`.json` or `.toml`)
    #[serde(default)]
    pub studies_file: Option<PathBuf>,

    /// Station profiles (`.json` or `.toml`)
    #[serde(default)]
    pub stations_file: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    /// Validates rotation and path settings
    pub fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.is_empty() {
            return Err("logging.local_path cannot be empty when local logging is enabled".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("./input")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

fn default_max_concurrency() -> usize {
    4
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Seed;

    fn config() -> DeidConfig {
        DeidConfig {
            application: ApplicationConfig::default(),
            anonymization: AnonymizationConfig::with_seed(Seed::new("seed")),
            batch: BatchConfig::default(),
            audit: AuditConfig::default(),
            logging: LoggingConfig::default(),
            tables: TablesConfig::default(),
            studies: BTreeMap::new(),
            stations: BTreeMap::new(),
        }
    }

    #[test]
    fn test_application_config_validation() {
        let mut config = ApplicationConfig::default();
        assert!(config.validate().is_ok());

        config.log_level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_batch_config_validation() {
        let mut config = BatchConfig::default();
        assert!(config.validate().is_ok());

        config.max_concurrency = 0;
        assert!(config.validate().is_err());

        config.max_concurrency = 257;
        assert!(config.validate().is_err());

        config.max_concurrency = 256;
        config.output_dir = config.input_dir.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert!(!config.local_enabled);
        assert_eq!(config.local_path, "./logs");
        assert_eq!(config.local_rotation, "daily");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_logging_rotation_validation() {
        let config = LoggingConfig {
            local_rotation: "size".to_string(),
            ..LoggingConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_rejects_duplicates() {
        let mut config = config();
        config
            .studies
            .insert("Brain".to_string(), StudyDefinition::default());

        let mut from_file = BTreeMap::new();
        from_file.insert("Liver".to_string(), StudyDefinition::default());
        assert!(config.merge_studies(from_file.clone()).is_ok());
        assert_eq!(config.studies.len(), 2);
        assert!(config.merge_studies(from_file).is_err());
    }

    #[test]
    fn test_station_table_requires_default() {
        let mut config = config();
        assert!(config.station_table().is_err());

        config.stations.insert(
            "default".to_string(),
            StationProfile::new(crate::domain::Tag::new("StudyDescription").unwrap()),
        );
        assert!(config.station_table().is_ok());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_values() {
        assert_eq!(default_log_level(), "info");
        assert_eq!(default_max_concurrency(), 4);
        assert_eq!(default_local_rotation(), "daily");
    }
}
