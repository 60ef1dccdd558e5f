//! Batch summary
//!
//! Tracks what happened to every record of a batch without retaining the
//! records themselves.

use crate::domain::RecordError;
use std::path::PathBuf;
use std::time::Duration;

/// What happened to one input
#[derive(Debug, Clone, PartialEq)]
pub enum RecordStatus {
    /// De-identified; `output` is `None` in dry-run mode
    Processed {
        study: String,
        instance_uid: String,
        output: Option<PathBuf>,
    },

    /// Not processed; the batch moved on
    Skipped { reason: RecordError },
}

/// One entry per input, in completion order
#[derive(Debug, Clone, PartialEq)]
pub struct RecordEntry {
    pub origin: String,
    pub status: RecordStatus,
}

/// Summary of a batch run
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    /// Records pulled from the source
    pub total_records: usize,

    /// Records de-identified
    pub processed: usize,

    /// Records skipped
    pub skipped: usize,

    /// Records written to the sink
    pub written: usize,

    /// Field-local issues across processed records
    pub field_issues: usize,

    /// Whether a shutdown signal stopped the batch early
    pub interrupted: bool,

    /// Whether outputs were withheld
    pub dry_run: bool,

    /// Duration of the batch
    pub duration: Duration,

    /// Per-record outcomes
    pub entries: Vec<RecordEntry>,
}

impl BatchSummary {
    /// Create a new empty summary
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Record a processed input
    pub fn add_processed(
        &mut self,
        origin: String,
        study: String,
        instance_uid: String,
        output: Option<PathBuf>,
        field_issues: usize,
    ) {
        self.total_records += 1;
        self.processed += 1;
        self.field_issues += field_issues;
        if output.is_some() {
            self.written += 1;
        }
        self.entries.push(RecordEntry {
            origin,
            status: RecordStatus::Processed {
                study,
                instance_uid,
                output,
            },
        });
    }

    /// Record a skipped input
    pub fn add_skipped(&mut self, origin: String, reason: RecordError) {
        self.total_records += 1;
        self.skipped += 1;
        self.entries.push(RecordEntry {
            origin,
            status: RecordStatus::Skipped { reason },
        });
    }

    /// Whether every input was processed and the batch ran to completion
    pub fn is_successful(&self) -> bool {
        self.skipped == 0 && !self.interrupted
    }

    /// Processed share as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.total_records == 0 {
            return 100.0;
        }
        (self.processed as f64 / self.total_records as f64) * 100.0
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            total_records = self.total_records,
            processed = self.processed,
            skipped = self.skipped,
            written = self.written,
            field_issues = self.field_issues,
            dry_run = self.dry_run,
            interrupted = self.interrupted,
            duration_secs = self.duration.as_secs(),
            success_rate = format!("{:.2}%", self.success_rate()),
            "Batch completed"
        );

        if self.skipped > 0 {
            tracing::warn!(skipped = self.skipped, "Batch completed with skipped records");
        }
    }
}
