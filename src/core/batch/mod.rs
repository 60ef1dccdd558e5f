//! Batch orchestration
//!
//! This module drives a whole batch:
//! - Pulling records from a source
//! - Processing them on a bounded worker pool
//! - Writing results to a sink and summarizing the run

pub mod orchestrator;
pub mod summary;

pub use orchestrator::{BatchOptions, BatchOrchestrator, BatchOutcome};
pub use summary::{BatchSummary, RecordEntry, RecordStatus};
