//! De-identification policy engine
//!
//! Applies per-study policies to tag-addressed records: each field is deleted,
//! kept, cleared, hashed, overwritten, date-shifted or regenerated according
//! to the policy chosen for the record's study.
//!
//! # Architecture
//!
//! The pipeline consists of:
//! - **Matching**: station table → study key → policy ([`matcher`])
//! - **Resolution**: tag rule, else VR rule, else keep ([`resolver`])
//! - **Execution**: the per-record state machine ([`engine`])
//! - **Derivation**: keyed hashes, identifiers and offsets ([`derive`])
//! - **Temporal codec**: DA/TM/DT parsing, shifting and formatting ([`temporal`])
//! - **Diagnostics**: per-record trail and batch report ([`audit`], [`report`])
//!
//! # Usage
//!
//! ```rust
//! use deident::anonymization::{
//!     AnonymizationEngine, PolicyTable, StationProfile, StationTable, StudyMatcher,
//! };
//! use deident::domain::{Dataset, Field, Record, Seed, Tag, Value, Vr};
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut stations = BTreeMap::new();
//! stations.insert("default".to_string(), StationProfile::new(Tag::new("StudyDescription")?));
//! let studies = BTreeMap::new();
//!
//! let matcher = StudyMatcher::new(
//!     Tag::new("StationName")?,
//!     Arc::new(StationTable::build(&stations)?),
//!     Arc::new(PolicyTable::build(&studies, None, &Seed::new("seed"))?),
//! );
//! let engine = AnonymizationEngine::with_defaults(chrono::Utc::now().naive_utc());
//!
//! let record = Record::new("1.2.3", Dataset::from_fields([
//!     Field::new(Tag::new("StudyDescription")?, Vr::LO, Value::text("Brain")),
//! ]));
//! let outcome = engine.process(record, &matcher, "inline")?;
//! assert!(!outcome.is_processed());
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod config;
pub mod derive;
pub mod dictionary;
pub mod engine;
pub mod matcher;
pub mod models;
pub mod policy;
pub mod report;
pub mod resolver;
pub mod temporal;

// Re-export main types
pub use audit::DiagnosticLogger;
pub use config::{AnonymizationConfig, AuditConfig};
pub use dictionary::TagDictionary;
pub use engine::{AnonymizationEngine, ExecutorState};
pub use matcher::{MatchedPolicy, StudyMatcher};
pub use models::{
    ActionKind, FieldDiagnostic, FieldOutcome, ProcessedRecord, RecordOutcome, RecordReport,
};
pub use policy::{
    ActionSpec, LiteralValue, PolicyConfig, PolicyTable, StationProfile, StationTable,
    StudyDefinition,
};
pub use report::BatchReport;
