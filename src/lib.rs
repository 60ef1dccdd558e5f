// Deident - De-identification policy engine for tag-addressed medical records
// Copyright (c) 2025 Deident Contributors
// Licensed under the MIT License

//! # deident - per-study de-identification of medical records
//!
//! deident applies per-study de-identification policies to tag-addressed
//! medical records (DICOM-like datasets of tagged, typed fields with nested
//! sequences).
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Matching** a record to its study policy through a station table
//! - **Resolving** each field's action: tag rule, else VR rule, else keep
//! - **Transforming** fields: delete, keep, clear, hash, literal, date shift, regenerate
//! - **Deriving** hashes, identifiers and offsets deterministically from seeds
//! - **Orchestrating** batches on a bounded worker pool with dry-run and diagnostics
//!
//! ## Architecture
//!
//! deident follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Batch orchestration
//! - [`anonymization`] - Policy engine (matcher, resolver, executor, derivation, temporal codec)
//! - [`adapters`] - Record sources and sinks
//! - [`domain`] - Record model, identifiers and error types
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use deident::adapters::{JsonDirectorySink, JsonDirectorySource};
//! use deident::config::load_config;
//! use deident::core::batch::BatchOrchestrator;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("deident.toml")?;
//!     let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//!     let orchestrator = BatchOrchestrator::from_config(&config, shutdown_rx)?;
//!     let mut source = JsonDirectorySource::scan(&config.batch.input_dir).await?;
//!     let sink = Arc::new(JsonDirectorySink::new(&config.batch.output_dir, false));
//!
//!     let outcome = orchestrator.run(&mut source, sink).await?;
//!     println!("De-identified {} records", outcome.summary.processed);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! ### Deterministic Derivation
//!
//! Every replacement value is a pure function of the original value and a
//! seed, so the same input always maps to the same output across runs and
//! workers, with no shared identifier registry:
//!
//! ```rust
//! use deident::anonymization::derive::derive_identifier;
//! use deident::domain::Seed;
//!
//! let seed = Seed::new("be76acfcfdb04e64");
//! let first = derive_identifier("1.2.840.113619.2.55.3", &seed).unwrap();
//! let second = derive_identifier("1.2.840.113619.2.55.3", &seed).unwrap();
//! assert_eq!(first, second);
//! assert!(first.starts_with("2.25."));
//! ```
//!
//! ### Temporal Shifting
//!
//! Dates, times and date-times are parsed per their length buckets, shifted
//! by whole seconds and written back in canonical form:
//!
//! ```rust
//! use deident::anonymization::temporal;
//! use deident::domain::Vr;
//!
//! let shifted = temporal::parse(Vr::TM, "153045").unwrap().shifted(3600).unwrap();
//! assert_eq!(shifted.format(), "163045.000000");
//! ```
//!
//! ## Error Handling
//!
//! Errors are split by blast radius: [`domain::DeidError`] aborts a batch,
//! [`domain::RecordError`] skips a record and [`domain::FieldError`] leaves a
//! field unchanged.
//!
//! ## Logging
//!
//! deident uses structured logging with the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn};
//!
//! info!("Starting batch");
//! warn!(origin = "scan/0001.json", "Record skipped");
//! ```

pub mod adapters;
pub mod anonymization;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
