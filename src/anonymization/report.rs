//! Batch reporting
//!
//! Aggregates per-record diagnostics into counts by action, by field issue
//! and by skip reason. Rendered on the console after a run (and always after
//! a dry run) or written as JSON.

use crate::anonymization::models::{FieldOutcome, RecordReport};
use crate::domain::RecordError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregated outcome of a batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    /// Whether outputs were withheld
    pub dry_run: bool,

    /// Records processed
    pub records_processed: usize,

    /// Records skipped
    pub records_skipped: usize,

    /// Records per study key
    pub records_by_study: BTreeMap<String, usize>,

    /// Transform attempts per action
    pub actions: BTreeMap<String, ActionCounts>,

    /// Field-local issues per kind
    pub field_issues: BTreeMap<String, usize>,

    /// Skipped records per reason
    pub skip_reasons: BTreeMap<String, usize>,

    /// Private fields removed across the batch
    pub private_fields_removed: usize,

    /// Free-form warnings
    pub warnings: Vec<String>,
}

/// Outcome counts for one action
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCounts {
    pub applied: usize,
    pub unchanged: usize,
    pub skipped: usize,
}

impl BatchReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    /// Add a processed record's diagnostics
    pub fn add_record(&mut self, report: &RecordReport) {
        self.records_processed += 1;
        self.private_fields_removed += report.private_removed;
        *self.records_by_study.entry(report.study.clone()).or_insert(0) += 1;

        for diagnostic in &report.diagnostics {
            let counts = self
                .actions
                .entry(diagnostic.action.as_str().to_string())
                .or_default();
            match diagnostic.outcome {
                FieldOutcome::Applied => counts.applied += 1,
                FieldOutcome::Unchanged => counts.unchanged += 1,
                FieldOutcome::Skipped { .. } => counts.skipped += 1,
            }
            if let Some(issue) = diagnostic.issue() {
                *self
                    .field_issues
                    .entry(issue.label().to_string())
                    .or_insert(0) += 1;
            }
        }
    }

    /// Add a skipped record
    pub fn add_skipped(&mut self, reason: &RecordError) {
        self.records_skipped += 1;
        *self
            .skip_reasons
            .entry(reason.label().to_string())
            .or_insert(0) += 1;
    }

    /// Add a warning
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Total field issues
    pub fn total_field_issues(&self) -> usize {
        self.field_issues.values().sum()
    }

    /// Format report for console output
    pub fn format_console(&self) -> String {
        let mut output = String::new();
        let title = if self.dry_run {
            "              DE-IDENTIFICATION DRY-RUN REPORT                 "
        } else {
            "                 DE-IDENTIFICATION REPORT                      "
        };

        output.push('\n');
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push_str(title);
        output.push('\n');
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push('\n');

        output.push_str("📊 SUMMARY\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        output.push_str(&format!(
            "  Records Processed:       {}\n",
            self.records_processed
        ));
        output.push_str(&format!("  Records Skipped:         {}\n", self.records_skipped));
        output.push_str(&format!(
            "  Private Fields Removed:  {}\n",
            self.private_fields_removed
        ));
        output.push_str(&format!(
            "  Field Issues:            {}\n",
            self.total_field_issues()
        ));
        output.push('\n');

        if !self.records_by_study.is_empty() {
            output.push_str("📁 RECORDS BY STUDY\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            for (study, count) in &self.records_by_study {
                output.push_str(&format!("  {:30} {:>8}\n", study, count));
            }
            output.push('\n');
        }

        if !self.actions.is_empty() {
            output.push_str("🔧 ACTIONS\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            output.push_str(&format!(
                "  {:14} {:>10} {:>10} {:>10}\n",
                "action", "applied", "unchanged", "skipped"
            ));
            for (action, counts) in &self.actions {
                output.push_str(&format!(
                    "  {:14} {:>10} {:>10} {:>10}\n",
                    action, counts.applied, counts.unchanged, counts.skipped
                ));
            }
            output.push('\n');
        }

        if !self.field_issues.is_empty() {
            output.push_str("🔍 FIELD ISSUES\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            for (issue, count) in &self.field_issues {
                output.push_str(&format!("  {:30} {:>8}\n", issue, count));
            }
            output.push('\n');
        }

        if !self.skip_reasons.is_empty() {
            output.push_str("⏭️  SKIPPED RECORDS\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            for (reason, count) in &self.skip_reasons {
                output.push_str(&format!("  {:30} {:>8}\n", reason, count));
            }
            output.push('\n');
        }

        if !self.warnings.is_empty() {
            output.push_str("⚠️  WARNINGS\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            for warning in &self.warnings {
                output.push_str(&format!("  • {}\n", warning));
            }
            output.push('\n');
        }

        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push('\n');

        output
    }

    /// Format report as JSON
    pub fn format_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write report to file
    pub fn write_to_file(&self, path: &std::path::Path) -> std::io::Result<()> {
        let json = self.format_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anonymization::models::{ActionKind, FieldDiagnostic};
    use crate::domain::{FieldError, FieldPath, Tag};

    fn record_report() -> RecordReport {
        let path = |name: &str| FieldPath::top_level(Tag::new(name).unwrap());
        let mut unrecognized =
            FieldDiagnostic::new(&path("VendorCode"), ActionKind::Keep, FieldOutcome::Unchanged);
        unrecognized.unrecognized = true;

        RecordReport {
            original_instance_uid: "1.2.3".to_string(),
            instance_uid: "2.25.9".to_string(),
            study: "brain".to_string(),
            policy: "brain".to_string(),
            private_removed: 3,
            diagnostics: vec![
                FieldDiagnostic::new(&path("PatientName"), ActionKind::Hash, FieldOutcome::Applied),
                FieldDiagnostic::new(
                    &path("StudyTime"),
                    ActionKind::Offset,
                    FieldOutcome::Skipped {
                        error: FieldError::AlreadyDeletedParent,
                    },
                ),
                unrecognized,
            ],
        }
    }

    #[test]
    fn test_batch_report_creation() {
        let report = BatchReport::new(true);
        assert!(report.dry_run);
        assert_eq!(report.records_processed, 0);
        assert!(report.actions.is_empty());
    }

    #[test]
    fn test_add_record() {
        let mut report = BatchReport::new(false);
        report.add_record(&record_report());
        report.add_record(&record_report());

        assert_eq!(report.records_processed, 2);
        assert_eq!(report.private_fields_removed, 6);
        assert_eq!(report.records_by_study.get("brain"), Some(&2));
        assert_eq!(report.actions["hash"].applied, 2);
        assert_eq!(report.actions["offset"].skipped, 2);
        assert_eq!(report.actions["keep"].unchanged, 2);
        assert_eq!(report.field_issues.get("unrecognized_tag"), Some(&2));
        assert_eq!(report.total_field_issues(), 4);
    }

    #[test]
    fn test_add_skipped() {
        let mut report = BatchReport::new(false);
        report.add_skipped(&RecordError::MissingStudyIdentifier {
            tag: "StudyDescription".to_string(),
        });
        assert_eq!(report.records_skipped, 1);
        assert_eq!(report.skip_reasons.get("missing_study_identifier"), Some(&1));
    }

    #[test]
    fn test_format_console() {
        let mut report = BatchReport::new(true);
        report.add_record(&record_report());
        report.add_warning("output withheld".to_string());

        let output = report.format_console();
        assert!(output.contains("DRY-RUN REPORT"));
        assert!(output.contains("Records Processed:       1"));
        assert!(output.contains("unrecognized_tag"));
        assert!(output.contains("output withheld"));
    }

    #[test]
    fn test_format_json() {
        let mut report = BatchReport::new(false);
        report.add_record(&record_report());
        let json: serde_json::Value = serde_json::from_str(&report.format_json().unwrap()).unwrap();
        assert_eq!(json["actions"]["hash"]["applied"], 1);
    }
}
