//! Source and sink traits
//!
//! Adapters implement these to feed records to the batch orchestrator and
//! receive the de-identified results.

use crate::domain::{Record, Result, StudyKey};
use async_trait::async_trait;
use std::path::PathBuf;

/// One item pulled from a source
#[derive(Debug, Clone)]
pub enum Incoming {
    /// A parsed record and where it came from
    Record { origin: String, record: Record },

    /// Input that could not be parsed into a record
    Invalid { origin: String, reason: String },
}

impl Incoming {
    /// Where the item came from (file path, queue position)
    pub fn origin(&self) -> &str {
        match self {
            Self::Record { origin, .. } | Self::Invalid { origin, .. } => origin,
        }
    }
}

/// Supplies records to a batch
#[async_trait]
pub trait RecordSource: Send {
    /// Next item, or `None` when the source is exhausted
    ///
    /// # Errors
    ///
    /// Returns an error when the source itself fails (not when a single
    /// item is malformed; that is [`Incoming::Invalid`]).
    async fn next_record(&mut self) -> Result<Option<Incoming>>;

    /// Number of items remaining, when known
    fn remaining(&self) -> Option<usize> {
        None
    }
}

/// Receives de-identified records
///
/// Output names derive from the regenerated instance identifier, so two
/// records never target the same name.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Writes one record grouped under its study
    ///
    /// # Returns
    ///
    /// The location written to.
    ///
    /// # Errors
    ///
    /// Returns [`DeidError::Sink`](crate::domain::DeidError::Sink) when the
    /// record cannot be written.
    async fn write(&self, study: &StudyKey, record: &Record) -> Result<PathBuf>;
}
