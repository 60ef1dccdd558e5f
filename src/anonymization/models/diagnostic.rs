//! Diagnostic data models
//!
//! The engine reports what it did as data. Nothing here ever carries an
//! original field value.

use crate::anonymization::policy::ActionSpec;
use crate::domain::{FieldError, FieldPath, Record, RecordError, StudyKey, Tag};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Action attempted on a field, without its parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Keep,
    Delete,
    Clear,
    Hash,
    Literal,
    Offset,
    Regenerate,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keep => "keep",
            Self::Delete => "delete",
            Self::Clear => "clear",
            Self::Hash => "hash",
            Self::Literal => "literal",
            Self::Offset => "offset",
            Self::Regenerate => "regenerate",
        }
    }
}

impl From<&ActionSpec> for ActionKind {
    fn from(spec: &ActionSpec) -> Self {
        match spec {
            ActionSpec::Keep => Self::Keep,
            ActionSpec::Delete => Self::Delete,
            ActionSpec::Clear => Self::Clear,
            ActionSpec::Hash { .. } => Self::Hash,
            ActionSpec::Literal { .. } => Self::Literal,
            ActionSpec::Offset { .. } => Self::Offset,
            ActionSpec::Regenerate { .. } => Self::Regenerate,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one transform attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FieldOutcome {
    /// The action changed the field (or removed it)
    Applied,
    /// The action ran and left the field as it was (`keep`, empty values)
    Unchanged,
    /// The field was left unchanged because of a field-local error
    Skipped { error: FieldError },
}

impl FieldOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    pub fn error(&self) -> Option<&FieldError> {
        match self {
            Self::Skipped { error } => Some(error),
            _ => None,
        }
    }
}

/// One diagnostic entry per field transform attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDiagnostic {
    /// Rendered field path, e.g. `ReferencedSeriesSequence[0].SeriesInstanceUID`
    pub path: String,
    pub tag: Tag,
    pub action: ActionKind,
    #[serde(flatten)]
    pub outcome: FieldOutcome,
    /// Set when the tag is not in the dictionary; the field was still handled
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unrecognized: bool,
}

impl FieldDiagnostic {
    pub fn new(path: &FieldPath, action: ActionKind, outcome: FieldOutcome) -> Self {
        Self {
            path: path.to_string(),
            tag: path.tag.clone(),
            action,
            outcome,
            unrecognized: false,
        }
    }

    /// Issue worth surfacing, if any
    pub fn issue(&self) -> Option<FieldError> {
        match &self.outcome {
            FieldOutcome::Skipped { error } => Some(error.clone()),
            _ if self.unrecognized => Some(FieldError::UnrecognizedTag),
            _ => None,
        }
    }
}

/// Per-record diagnostic trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordReport {
    /// Instance identifier before regeneration
    pub original_instance_uid: String,
    /// Regenerated instance identifier
    pub instance_uid: String,
    /// Normalized study key that selected the policy
    pub study: String,
    /// Name of the applied policy
    pub policy: String,
    /// Number of private fields removed
    pub private_removed: usize,
    pub diagnostics: Vec<FieldDiagnostic>,
}

impl RecordReport {
    /// Entries that carry a field-local issue
    pub fn issues(&self) -> impl Iterator<Item = (&FieldDiagnostic, FieldError)> {
        self.diagnostics
            .iter()
            .filter_map(|d| d.issue().map(|issue| (d, issue)))
    }

    pub fn issue_count(&self) -> usize {
        self.issues().count()
    }
}

/// A processed record with its trail
#[derive(Debug, Clone)]
pub struct ProcessedRecord {
    pub record: Record,
    pub study: StudyKey,
    pub report: RecordReport,
}

/// Per-record result of a batch pass
#[derive(Debug, Clone)]
pub enum RecordOutcome {
    Processed(Box<ProcessedRecord>),
    Skipped { origin: String, reason: RecordError },
}

impl RecordOutcome {
    pub fn is_processed(&self) -> bool {
        matches!(self, Self::Processed(_))
    }
}
