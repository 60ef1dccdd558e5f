//! Data models produced by the anonymization engine

pub mod diagnostic;

pub use diagnostic::{
    ActionKind, FieldDiagnostic, FieldOutcome, ProcessedRecord, RecordOutcome, RecordReport,
};
