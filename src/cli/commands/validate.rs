//! Validate config command implementation
//!
//! This module implements the `validate-config` command: load the
//! configuration, compile both tables and run the derivation self-check
//! without touching any record.

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // Loading already validates sections and compiles both tables
        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let (policies, stations) = match (config.policy_table(), config.station_table()) {
            (Ok(policies), Ok(stations)) => (policies, stations),
            (Err(e), _) | (_, Err(e)) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                return Ok(2);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Dry Run: {}", config.application.dry_run);
        println!("  Station Tag: {}", config.anonymization.station_tag);
        println!("  Identifier Root: {}", config.anonymization.uid_root);
        println!(
            "  Default Policy: {}",
            policies.default_policy().unwrap_or("(none)")
        );
        println!("  Studies ({}): {}", policies.len(), policies.names().join(", "));
        println!("  Stations: {}", stations.len());
        println!("  Input: {}", config.batch.input_dir.display());
        println!("  Output: {}", config.batch.output_dir.display());
        println!("  Max Concurrency: {}", config.batch.max_concurrency);
        println!(
            "  Diagnostics: {}",
            if config.audit.enabled {
                config.audit.log_path.display().to_string()
            } else {
                "disabled".to_string()
            }
        );
        println!();
        Ok(0)
    }
}
