//! Init command implementation
//!
//! This module implements the `init` command for generating a starter
//! configuration file with a freshly generated random seed.

use clap::Args;
use std::fs;
use std::path::Path;
use uuid::Uuid;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "deident.toml")]
    pub output: String,

    /// Include example studies, stations and comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing deident configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        let seed = Uuid::new_v4().simple().to_string();
        let config_content = if self.with_examples {
            Self::generate_config_with_examples(&seed)
        } else {
            Self::generate_minimal_config(&seed)
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your studies and stations", self.output);
                println!("  2. Keep random_seed secret; it links outputs back to inputs");
                println!("  3. Validate configuration: deident validate-config");
                println!("  4. Preview: deident run --dry-run");
                println!("  5. Run: deident run");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {}", e);
                Ok(5)
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config(seed: &str) -> String {
        format!(
            r#"# deident configuration file

[application]
log_level = "info"
dry_run = false

[anonymization]
random_seed = "{seed}"
station_tag = "StationName"
uid_root = "2.25"

[batch]
input_dir = "./input"
output_dir = "./output"
max_concurrency = 4
overwrite = false

[audit]
enabled = true
log_path = "./audit/diagnostics.log"
json_format = true

[logging]
local_enabled = false
local_path = "./logs"
local_rotation = "daily"

[stations.default]
TagForStudy = "StudyDescription"
"#
        )
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples(seed: &str) -> String {
        format!(
            r#"# deident configuration file
#
# Every ${{VAR}} placeholder is replaced from the environment before parsing,
# and DEIDENT_<SECTION>_<KEY> variables override individual settings.

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# Process and report without writing any output
dry_run = false

# ============================================================================
# Anonymization
# ============================================================================
[anonymization]
# Global salt for hashes, derived identifiers and date shifts.
# Used by every study that does not set its own RandomSeed.
random_seed = "{seed}"

# Field naming the acquiring station
station_tag = "StationName"

# Study used when a record's study key has no policy of its own
# default_policy = "Research"

# Root of regenerated identifiers (digits and dots, at most 24 characters)
uid_root = "2.25"

# Extra tag dictionary entries (Tag = "VR") for site-specific fields
[anonymization.dictionary]
# ScannerCode = "LO"

# ============================================================================
# Batch
# ============================================================================
[batch]
input_dir = "./input"
output_dir = "./output"

# Records processed concurrently (1-256)
max_concurrency = 4

# Replace existing output files
overwrite = false

# ============================================================================
# Diagnostics and Logging
# ============================================================================
[audit]
enabled = true
log_path = "./audit/diagnostics.log"
json_format = true

[logging]
local_enabled = false
local_path = "./logs"
# daily, hourly or never
local_rotation = "daily"

# ============================================================================
# Tables
# ============================================================================
# Studies and stations may also live in separate JSON or TOML files,
# resolved relative to this file. Names must not repeat inline entries.
[tables]
# studies_file = "studies.json"
# stations_file = "stations.json"

# ============================================================================
# Stations: where to find the study key
# ============================================================================
[stations.default]
TagForStudy = "StudyDescription"

# Records from CT01 carry "SITE^STUDY" in StudyDescription
[stations.CT01]
TagForStudy = "StudyDescription"
StudySplit = "^"
StudySplitIndex = 1

# ============================================================================
# Studies: what to do with each field
# ============================================================================
# Actions: keep | delete | clear | hash | value | offset | regen
#   hash:   optional salt
#   value:  optional value ("@now" for the batch start instant)
#   offset: optional delta in seconds, else derived from seed
#   regen:  optional seed
[studies.Research]
RemovePrivateTags = true
SavePrivateTags = []
# RandomSeed = "${{DEIDENT_RESEARCH_SEED}}"

[studies.Research.AnonymizeTag]
PatientID = {{ action = "hash" }}
PatientBirthDate = {{ action = "offset" }}
StudyDate = {{ action = "offset" }}
StudyTime = {{ action = "offset" }}
InstitutionName = {{ action = "value", value = "ANONYMIZED" }}
ContentDate = {{ action = "value", value = "@now" }}
OtherPatientIDsSequence = {{ action = "delete" }}

[studies.Research.AnonymizeVR]
PN = {{ action = "clear" }}
UI = {{ action = "regen" }}
"#
        )
    }
}
