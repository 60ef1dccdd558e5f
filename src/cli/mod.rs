//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for deident using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// deident - de-identification policy engine for tag-addressed medical records
#[derive(Parser, Debug)]
#[command(name = "deident")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "deident.toml", env = "DEIDENT_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "DEIDENT_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// De-identify every record under the input directory
    Run(commands::run::RunArgs),

    /// Validate configuration file and tables
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),

    /// Convert a confidentiality profile CSV into a studies table
    ImportCsv(commands::import_csv::ImportCsvArgs),
}
