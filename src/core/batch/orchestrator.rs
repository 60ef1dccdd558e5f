//! Batch orchestrator - feeds records from a source through the engine to a sink
//!
//! Per-record work depends only on the record, the read-only tables and the
//! batch "now" instant, so records run on a bounded pool in any order. The
//! engine is synchronous and runs on the blocking pool; sink writes stay on
//! the async runtime.

use crate::adapters::traits::{Incoming, RecordSink, RecordSource};
use crate::anonymization::audit::DiagnosticLogger;
use crate::anonymization::engine::AnonymizationEngine;
use crate::anonymization::matcher::StudyMatcher;
use crate::anonymization::models::RecordOutcome;
use crate::anonymization::report::BatchReport;
use crate::config::DeidConfig;
use crate::core::batch::summary::BatchSummary;
use crate::domain::{DeidError, RecordError, Result};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;

/// Records between progress log lines
const PROGRESS_INTERVAL: usize = 100;

/// Runtime options of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Records processed concurrently
    pub max_concurrency: usize,

    /// Process and report without writing
    pub dry_run: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            dry_run: false,
        }
    }
}

/// Result of a finished batch
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub summary: BatchSummary,
    pub report: BatchReport,
}

/// Output of one worker task
struct Completed {
    origin: String,
    outcome: RecordOutcome,
    output: Option<PathBuf>,
}

/// Batch orchestrator
pub struct BatchOrchestrator {
    engine: Arc<AnonymizationEngine>,
    matcher: Arc<StudyMatcher>,
    diagnostics: DiagnosticLogger,
    options: BatchOptions,
    shutdown: watch::Receiver<bool>,
}

impl BatchOrchestrator {
    pub fn new(
        engine: Arc<AnonymizationEngine>,
        matcher: Arc<StudyMatcher>,
        diagnostics: DiagnosticLogger,
        options: BatchOptions,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            engine,
            matcher,
            diagnostics,
            options,
            shutdown,
        }
    }

    /// Builds the engine, matcher and diagnostic trail from configuration
    ///
    /// Fixes the batch "now" instant.
    ///
    /// # Errors
    ///
    /// Configuration errors for malformed tables or an unwritable diagnostic log.
    pub fn from_config(config: &DeidConfig, shutdown: watch::Receiver<bool>) -> Result<Self> {
        let policies = Arc::new(config.policy_table()?);
        let stations = Arc::new(config.station_table()?);
        let dictionary = config
            .anonymization
            .tag_dictionary()
            .map_err(DeidError::Configuration)?;

        let now = Utc::now().naive_utc();
        let engine = AnonymizationEngine::new(
            Arc::new(dictionary),
            config.anonymization.uid_root.clone(),
            now,
        );
        let matcher = StudyMatcher::new(config.anonymization.station_tag.clone(), stations, policies);

        let diagnostics = DiagnosticLogger::new(
            config.audit.log_path.clone(),
            config.audit.json_format,
            config.audit.enabled,
        )
        .map_err(|e| DeidError::Configuration(format!("{e:#}")))?;

        tracing::info!(
            now = %now,
            studies = matcher.policies().len(),
            station_tag = %matcher.station_tag(),
            "Batch configured"
        );

        Ok(Self::new(
            Arc::new(engine),
            Arc::new(matcher),
            diagnostics,
            BatchOptions {
                max_concurrency: config.batch.max_concurrency,
                dry_run: config.application.dry_run,
            },
            shutdown,
        ))
    }

    pub fn options(&self) -> BatchOptions {
        self.options
    }

    /// Runs the batch to completion, shutdown, or the first batch-fatal error
    ///
    /// In-flight records finish when shutdown is signalled; remaining inputs
    /// are left untouched.
    ///
    /// # Errors
    ///
    /// Source failures, sink failures and derivation failures abort the batch.
    /// An output that already exists only skips the record that produced it.
    pub async fn run(
        &self,
        source: &mut dyn RecordSource,
        sink: Arc<dyn RecordSink>,
    ) -> Result<BatchOutcome> {
        let start_time = Instant::now();
        let concurrency = self.options.max_concurrency.max(1);
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut tasks: JoinSet<Result<Completed>> = JoinSet::new();
        let mut summary = BatchSummary::new(self.options.dry_run);
        let mut report = BatchReport::new(self.options.dry_run);

        tracing::info!(
            concurrency,
            dry_run = self.options.dry_run,
            pending = ?source.remaining(),
            "Starting batch"
        );

        loop {
            if *self.shutdown.borrow() {
                tracing::warn!("Shutdown requested, not starting further records");
                summary.interrupted = true;
                break;
            }

            // Keep finished results from piling up
            while tasks.len() >= concurrency {
                if let Some(joined) = tasks.join_next().await {
                    self.collect(joined, &mut summary, &mut report)?;
                }
            }

            let Some(item) = source.next_record().await? else {
                break;
            };

            let (origin, record) = match item {
                Incoming::Record { origin, record } => (origin, record),
                Incoming::Invalid { origin, reason } => {
                    let reason = RecordError::InvalidInputRecord { reason };
                    crate::log_record_skipped!(origin, &reason);
                    self.collect_outcome(
                        Completed {
                            origin: origin.clone(),
                            outcome: RecordOutcome::Skipped { origin, reason },
                            output: None,
                        },
                        &mut summary,
                        &mut report,
                    );
                    continue;
                }
            };

            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| DeidError::Other(format!("Worker pool closed: {e}")))?;
            let engine = Arc::clone(&self.engine);
            let matcher = Arc::clone(&self.matcher);
            let sink = Arc::clone(&sink);
            let dry_run = self.options.dry_run;

            tasks.spawn(async move {
                let _permit = permit;
                let worker_origin = origin.clone();
                let outcome = tokio::task::spawn_blocking(move || {
                    engine.process(record, &matcher, &worker_origin)
                })
                .await
                .map_err(|e| DeidError::Other(format!("Record worker failed: {e}")))??;

                let output = match &outcome {
                    RecordOutcome::Processed(processed) if !dry_run => {
                        match sink.write(&processed.study, &processed.record).await {
                            Ok(path) => Some(path),
                            Err(DeidError::OutputExists(path)) => {
                                let reason = RecordError::OutputCollision {
                                    output: path.display().to_string(),
                                };
                                crate::log_record_skipped!(origin, &reason);
                                return Ok(Completed {
                                    origin: origin.clone(),
                                    outcome: RecordOutcome::Skipped { origin, reason },
                                    output: None,
                                });
                            }
                            Err(e) => return Err(e),
                        }
                    }
                    _ => None,
                };

                Ok(Completed {
                    origin,
                    outcome,
                    output,
                })
            });
        }

        while let Some(joined) = tasks.join_next().await {
            self.collect(joined, &mut summary, &mut report)?;
        }

        if summary.interrupted {
            report.add_warning("Batch interrupted by shutdown signal".to_string());
        }
        if self.options.dry_run {
            report.add_warning("Dry run: no records were written".to_string());
        }

        let summary = summary.with_duration(start_time.elapsed());
        summary.log_summary();

        Ok(BatchOutcome { summary, report })
    }

    fn collect(
        &self,
        joined: std::result::Result<Result<Completed>, tokio::task::JoinError>,
        summary: &mut BatchSummary,
        report: &mut BatchReport,
    ) -> Result<()> {
        let completed =
            joined.map_err(|e| DeidError::Other(format!("Record task failed: {e}")))??;
        self.collect_outcome(completed, summary, report);
        Ok(())
    }

    fn collect_outcome(
        &self,
        completed: Completed,
        summary: &mut BatchSummary,
        report: &mut BatchReport,
    ) {
        let Completed {
            origin,
            outcome,
            output,
        } = completed;

        match outcome {
            RecordOutcome::Processed(processed) => {
                let record_report = &processed.report;
                if let Err(e) = self.diagnostics.log_processed(record_report) {
                    tracing::warn!(error = %e, "Failed to write diagnostic entry");
                    report.add_warning(format!("Diagnostic entry lost for {origin}: {e}"));
                }
                report.add_record(record_report);
                summary.add_processed(
                    origin,
                    record_report.study.clone(),
                    record_report.instance_uid.clone(),
                    output,
                    record_report.issue_count(),
                );
            }
            RecordOutcome::Skipped { origin, reason } => {
                if let Err(e) = self.diagnostics.log_skipped(&origin, &reason) {
                    tracing::warn!(error = %e, "Failed to write diagnostic entry");
                    report.add_warning(format!("Diagnostic entry lost for {origin}: {e}"));
                }
                report.add_skipped(&reason);
                summary.add_skipped(origin, reason);
            }
        }

        if summary.total_records % PROGRESS_INTERVAL == 0 {
            crate::log_batch_progress!(summary.processed, summary.skipped);
        }
    }
}
