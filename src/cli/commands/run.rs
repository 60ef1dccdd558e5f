//! Run command implementation
//!
//! This module implements the `run` command: de-identify every record under
//! the input directory and write the results under the output directory.

use crate::adapters::{JsonDirectorySink, JsonDirectorySource, RecordSink, RecordSource};
use crate::config::load_config;
use crate::core::batch::{BatchOrchestrator, BatchSummary};
use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the run command
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Override the input directory
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Override the output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Process and report without writing any output
    #[arg(long)]
    pub dry_run: bool,

    /// Override the number of records processed concurrently
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Also write the batch report as JSON to this path
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting run command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                crate::log_error_with_context!(&e, "Failed to load configuration");
                eprintln!("Configuration error: {e}");
                return Ok(2);
            }
        };

        // Apply CLI overrides
        if let Some(input) = &self.input {
            tracing::info!(input = %input.display(), "Overriding input directory from CLI");
            config.batch.input_dir = input.clone();
        }
        if let Some(output) = &self.output {
            tracing::info!(output = %output.display(), "Overriding output directory from CLI");
            config.batch.output_dir = output.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.batch.max_concurrency = concurrency;
        }
        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }

        let orchestrator = match BatchOrchestrator::from_config(&config, shutdown_signal) {
            Ok(o) => o,
            Err(e) => {
                tracing::error!(error = %e, "Failed to configure batch");
                eprintln!("Configuration error: {e}");
                return Ok(2);
            }
        };

        if config.application.dry_run {
            println!("🔍 DRY RUN MODE - No records will be written");
            println!();
        }

        let mut source = JsonDirectorySource::scan(&config.batch.input_dir)
            .await
            .with_context(|| {
                format!(
                    "Failed to scan input directory {}",
                    config.batch.input_dir.display()
                )
            })?;
        let sink: Arc<dyn RecordSink> = Arc::new(JsonDirectorySink::new(
            config.batch.output_dir.clone(),
            config.batch.overwrite,
        ));

        println!(
            "🚀 De-identifying {} record file(s) from {}",
            source.remaining().unwrap_or(0),
            config.batch.input_dir.display()
        );
        println!();

        let outcome = match orchestrator.run(&mut source, sink).await {
            Ok(outcome) => outcome,
            Err(e) => {
                crate::log_error_with_context!(&e, "Batch failed");
                eprintln!("Batch failed: {e}");
                return Ok(5);
            }
        };

        print!("{}", outcome.report.format_console());
        print_summary(&outcome.summary);

        if let Some(path) = &self.report {
            outcome
                .report
                .write_to_file(path)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!("📄 Report written to {}", path.display());
        }

        Ok(exit_code(&outcome.summary))
    }
}

fn print_summary(summary: &BatchSummary) {
    println!("📊 Batch Summary:");
    println!("  Total Records: {}", summary.total_records);
    println!("  Processed: {}", summary.processed);
    println!("  Skipped: {}", summary.skipped);
    println!("  Written: {}", summary.written);
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!("  Success Rate: {:.2}%", summary.success_rate());
    println!();
}

/// 0 when every record was processed, 1 when some were skipped or the batch was interrupted
fn exit_code(summary: &BatchSummary) -> i32 {
    if summary.interrupted {
        println!("⚠️  Batch interrupted; remaining records were not processed");
        tracing::info!("Batch interrupted by user signal");
        1
    } else if summary.skipped > 0 {
        println!("⚠️  Batch completed with skipped records");
        1
    } else {
        println!("✅ Batch completed successfully!");
        0
    }
}
