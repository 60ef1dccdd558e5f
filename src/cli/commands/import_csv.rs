//! Import-csv command implementation
//!
//! This module implements the `import-csv` command: convert a confidentiality
//! profile CSV into a studies table for `[tables] studies_file`.

use crate::config::{import_studies_csv_file, CsvImport, DEFAULT_CSV_STUDY};
use anyhow::Context;
use clap::Args;
use std::fs;
use std::path::{Path, PathBuf};

/// Arguments for the import-csv command
#[derive(Args, Debug)]
pub struct ImportCsvArgs {
    /// Profile CSV with tag, attribute name and action columns
    pub csv: PathBuf,

    /// Name of the generated study
    #[arg(short, long, default_value = DEFAULT_CSV_STUDY)]
    pub study: String,

    /// Write the table here (.toml or .json) instead of printing JSON
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Overwrite an existing output file
    #[arg(long)]
    pub force: bool,
}

impl ImportCsvArgs {
    /// Execute the import-csv command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(csv = %self.csv.display(), study = %self.study, "Importing profile CSV");

        if let Some(output) = &self.output {
            if output.exists() && !self.force {
                eprintln!("❌ Output file already exists: {}", output.display());
                eprintln!("   Use --force to overwrite");
                return Ok(2);
            }
        }

        let import = match import_studies_csv_file(&self.csv, &self.study) {
            Ok(import) => import,
            Err(e) => {
                tracing::error!(error = %e, "Profile CSV rejected");
                eprintln!("❌ {e}");
                return Ok(2);
            }
        };

        let Some(output) = &self.output else {
            println!("{}", import.to_json()?);
            return Ok(0);
        };

        let content = if is_toml(output) {
            import.to_toml()?
        } else {
            import.to_json()?
        };
        fs::write(output, content)
            .with_context(|| format!("Failed to write {}", output.display()))?;

        print_summary(&import, output);
        Ok(0)
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}

fn print_summary(import: &CsvImport, output: &Path) {
    println!("✅ Studies table written: {}", output.display());
    println!("  Rules: {}", import.rows);
    if !import.unrecognized.is_empty() {
        println!(
            "  ⚠️  Not in the built-in dictionary: {}",
            import.unrecognized.join(", ")
        );
        println!("     Add them under [anonymization.dictionary] if VR rules should see their VR");
    }
    println!();
    println!("Next steps:");
    println!("  1. Point [tables] studies_file at {}", output.display());
    println!("  2. Validate configuration: deident validate-config");
}
