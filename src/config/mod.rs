//! Configuration management for deident.
//!
//! This module provides TOML-based configuration loading, parsing, and validation.
//!
//! # Overview
//!
//! deident uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `DEIDENT_<SECTION>_<KEY>` overrides
//! - Study and station tables kept inline or in separate JSON/TOML files
//! - Studies tables converted from confidentiality profile CSV exports
//! - Validation of every section before anything is processed
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use deident::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("deident.toml")?;
//!
//! println!("Input: {}", config.batch.input_dir.display());
//! println!("Studies: {}", config.studies.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level and dry-run
//! - [`AnonymizationConfig`] - Global seed, station tag, identifier root, dictionary
//! - [`BatchConfig`] - Input/output directories and concurrency
//! - [`AuditConfig`] - Diagnostic trail
//! - [`LoggingConfig`] - Local log files
//! - [`TablesConfig`] - External study/station tables
//!
//! # Example Configuration
//!
//! ```toml
//! [anonymization]
//! random_seed = "${DEIDENT_RANDOM_SEED}"
//! station_tag = "StationName"
//! default_policy = "Research"
//!
//! [batch]
//! input_dir = "./incoming"
//! output_dir = "./deidentified"
//!
//! [stations.default]
//! TagForStudy = "StudyDescription"
//!
//! [stations.CT01]
//! TagForStudy = "StudyDescription"
//! StudySplit = "^"
//! StudySplitIndex = 1
//!
//! [studies.Research]
//! RemovePrivateTags = true
//! SavePrivateTags = ["Vendor1234"]
//! AnonymizeTag = { PatientID = { action = "hash" }, StudyDate = { action = "offset", delta = 86400 } }
//! AnonymizeVR = { PN = { action = "clear" } }
//! ```

pub mod loader;
pub mod schema;
pub mod secret;
pub mod studies_csv;

// Re-export commonly used types
pub use crate::anonymization::config::{AnonymizationConfig, AuditConfig};
pub use loader::{load_config, load_tables};
pub use schema::{ApplicationConfig, BatchConfig, DeidConfig, LoggingConfig, TablesConfig};
pub use secret::{secret_string, SecretString, SecretValue};
pub use studies_csv::{import_studies_csv, import_studies_csv_file, CsvImport, DEFAULT_CSV_STUDY};
