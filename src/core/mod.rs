//! Core batch logic for deident.
//!
//! # Modules
//!
//! - [`batch`] - Batch orchestration, worker pool and run summary
//!
//! # Batch Workflow
//!
//! 1. **Configure**: Compile policy and station tables, fix the batch "now" instant
//! 2. **Pull**: Read records from the source
//! 3. **Process**: Match, resolve and transform each record on the worker pool
//! 4. **Write**: Hand de-identified records to the sink (skipped in dry-run)
//! 5. **Report**: Append diagnostics and aggregate the batch report
//!
//! # Example
//!
//! ```rust,no_run
//! use deident::adapters::{JsonDirectorySink, JsonDirectorySource};
//! use deident::config::load_config;
//! use deident::core::batch::BatchOrchestrator;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("deident.toml")?;
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//! let orchestrator = BatchOrchestrator::from_config(&config, shutdown_rx)?;
//! let mut source = JsonDirectorySource::scan(&config.batch.input_dir).await?;
//! let sink = Arc::new(JsonDirectorySink::new(&config.batch.output_dir, config.batch.overwrite));
//!
//! let outcome = orchestrator.run(&mut source, sink).await?;
//! println!("Processed: {}", outcome.summary.processed);
//! println!("Skipped: {}", outcome.summary.skipped);
//! # Ok(())
//! # }
//! ```

pub mod batch;
