//! Domain error types
//!
//! Errors are split by blast radius:
//! - [`DeidError`] aborts the whole batch (configuration, derivation, sink failures),
//!   except [`DeidError::OutputExists`], which the orchestrator turns into a skip
//! - [`RecordError`] skips one record while the batch continues
//! - [`FieldError`] leaves one field unchanged while the record continues
//!
//! None of these types carry original field values, since those are PHI.

use crate::domain::vr::Vr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main deident error type
///
/// Anything surfacing as a `DeidError` is fatal to the batch it occurs in.
#[derive(Debug, Error)]
pub enum DeidError {
    /// Configuration-related errors (missing tables, malformed rules)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Deterministic derivation failures
    #[error("Derivation error: {0}")]
    Derivation(#[from] DerivationError),

    /// Output sink failures
    #[error("Sink error: {0}")]
    Sink(String),

    /// The sink already holds an output at this location and may not replace it
    #[error("Output {} already exists (set batch.overwrite to replace)", .0.display())]
    OutputExists(std::path::PathBuf),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Record-level failures
///
/// The affected record is skipped and logged; the batch proceeds.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordError {
    /// The station-identifying field is absent
    #[error("Record has no station identifier ({tag})")]
    MissingStationIdentifier { tag: String },

    /// The study-identifying field is absent, or no policy applies
    #[error("Record has no usable study identifier ({tag})")]
    MissingStudyIdentifier { tag: String },

    /// Splitting the study field did not yield the configured component
    #[error("Study field {tag} split on '{delimiter}' has {parts} part(s), index {index} requested")]
    MalformedStudyKey {
        tag: String,
        delimiter: String,
        index: usize,
        parts: usize,
    },

    /// The record could not be parsed or is structurally unusable
    #[error("Invalid input record: {reason}")]
    InvalidInputRecord { reason: String },

    /// Another record in this or an earlier batch already produced the same output
    #[error("Output {output} already exists")]
    OutputCollision { output: String },
}

impl RecordError {
    /// Short machine-friendly label used for aggregation
    pub fn label(&self) -> &'static str {
        match self {
            Self::MissingStationIdentifier { .. } => "missing_station_identifier",
            Self::MissingStudyIdentifier { .. } => "missing_study_identifier",
            Self::MalformedStudyKey { .. } => "malformed_study_key",
            Self::InvalidInputRecord { .. } => "invalid_input_record",
            Self::OutputCollision { .. } => "output_collision",
        }
    }
}

/// Field-level failures
///
/// The field is left unchanged (or the operation is a no-op) and the walk continues.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldError {
    /// Tag is not in the tag dictionary; treated as keep
    #[error("Unrecognized tag")]
    UnrecognizedTag,

    /// Temporal value does not match any length bucket of its grammar
    #[error("Invalid {vr} value of length {length}")]
    InvalidTemporalValue { vr: Vr, length: usize },

    /// The action cannot be applied to a field of this VR
    #[error("Action '{action}' is not supported for VR {vr}")]
    UnsupportedActionForVr { action: String, vr: Vr },

    /// A parent sequence was already removed
    #[error("Parent sequence already deleted")]
    AlreadyDeletedParent,
}

impl FieldError {
    /// Short machine-friendly label used for aggregation
    pub fn label(&self) -> &'static str {
        match self {
            Self::UnrecognizedTag => "unrecognized_tag",
            Self::InvalidTemporalValue { .. } => "invalid_temporal_value",
            Self::UnsupportedActionForVr { .. } => "unsupported_action_for_vr",
            Self::AlreadyDeletedParent => "already_deleted_parent",
        }
    }
}

/// Failures of the deterministic derivation functions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DerivationError {
    /// A derived identifier does not satisfy the identifier grammar
    #[error("Derived identifier violates identifier grammar: {0}")]
    IdentifierGrammar(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for DeidError {
    fn from(err: std::io::Error) -> Self {
        DeidError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for DeidError {
    fn from(err: serde_json::Error) -> Self {
        DeidError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for DeidError {
    fn from(err: toml::de::Error) -> Self {
        DeidError::Configuration(format!("TOML parse error: {err}"))
    }
}
