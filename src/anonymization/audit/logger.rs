//! Diagnostic logger for processed and skipped records

use crate::anonymization::models::{FieldDiagnostic, RecordReport};
use crate::domain::RecordError;
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// Diagnostic log entry
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum DiagnosticEntry<'a> {
    Processed {
        timestamp: String,
        /// SHA-256 of the original instance identifier (never log it in plaintext)
        original_uid_hash: String,
        instance_uid: &'a str,
        study: &'a str,
        policy: &'a str,
        private_removed: usize,
        fields: &'a [FieldDiagnostic],
    },
    Skipped {
        timestamp: String,
        origin: &'a str,
        reason: &'a RecordError,
    },
}

/// Appends one line per record to the diagnostic log
pub struct DiagnosticLogger {
    log_path: PathBuf,
    json_format: bool,
    enabled: bool,
}

impl DiagnosticLogger {
    /// Create a new diagnostic logger
    pub fn new(log_path: PathBuf, json_format: bool, enabled: bool) -> Result<Self> {
        if enabled {
            if let Some(parent) = log_path.parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create diagnostic log directory: {}",
                        parent.display()
                    )
                })?;
            }
        }

        Ok(Self {
            log_path,
            json_format,
            enabled,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Log a processed record with its field entries
    pub fn log_processed(&self, report: &RecordReport) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let entry = DiagnosticEntry::Processed {
            timestamp: Utc::now().to_rfc3339(),
            original_uid_hash: hash_identifier(&report.original_instance_uid),
            instance_uid: &report.instance_uid,
            study: &report.study,
            policy: &report.policy,
            private_removed: report.private_removed,
            fields: &report.diagnostics,
        };

        if self.json_format {
            self.write_json(&entry)
        } else {
            let mut lines = vec![format!(
                "[{}] Processed: {} | Study: {} | Policy: {} | Fields: {} | Issues: {}",
                Utc::now().to_rfc3339(),
                report.instance_uid,
                report.study,
                report.policy,
                report.diagnostics.len(),
                report.issue_count()
            )];
            for (diagnostic, issue) in report.issues() {
                lines.push(format!(
                    "    {} ({}): {}",
                    diagnostic.path, diagnostic.action, issue
                ));
            }
            self.write_lines(&lines)
        }
    }

    /// Log a skipped record with its reason
    pub fn log_skipped(&self, origin: &str, reason: &RecordError) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if self.json_format {
            self.write_json(&DiagnosticEntry::Skipped {
                timestamp: Utc::now().to_rfc3339(),
                origin,
                reason,
            })
        } else {
            self.write_lines(&[format!(
                "[{}] Skipped: {} | Reason: {}",
                Utc::now().to_rfc3339(),
                origin,
                reason
            )])
        }
    }

    fn write_json(&self, entry: &DiagnosticEntry<'_>) -> Result<()> {
        let json_line =
            serde_json::to_string(entry).context("Failed to serialize diagnostic entry")?;
        self.write_lines(&[json_line])
    }

    fn write_lines(&self, lines: &[String]) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .with_context(|| {
                format!("Failed to open diagnostic log: {}", self.log_path.display())
            })?;

        for line in lines {
            writeln!(file, "{line}").context("Failed to write diagnostic entry")?;
        }
        Ok(())
    }
}

/// SHA-256 of an identifier, as lowercase hex
fn hash_identifier(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}
