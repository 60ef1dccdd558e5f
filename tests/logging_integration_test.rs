//! Integration tests for logging and the diagnostic trail

use chrono::Utc;
use deident::anonymization::{
    ActionSpec, AnonymizationEngine, BatchReport, DiagnosticLogger, PolicyConfig, PolicyTable,
    RecordOutcome, RecordReport, StationProfile, StationTable, StudyMatcher,
};
use deident::config::LoggingConfig;
use deident::domain::{Dataset, Field, Record, RecordError, Seed, Tag, Value, Vr};
use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::TempDir;

fn tag(name: &str) -> Tag {
    Tag::new(name).unwrap()
}

fn processed_report() -> RecordReport {
    let policy = PolicyConfig::new("Cardiac", Seed::new("seed"))
        .with_tag_rule(
            tag("StudyTime"),
            ActionSpec::Offset {
                delta: Some(60),
                seed: None,
            },
        )
        .with_vr_rule(Vr::PN, ActionSpec::Hash { salt: None });

    let mut stations = BTreeMap::new();
    stations.insert(
        "default".to_string(),
        StationProfile::new(tag("StudyDescription")),
    );
    let matcher = StudyMatcher::new(
        tag("StationName"),
        Arc::new(StationTable::build(&stations).unwrap()),
        Arc::new(PolicyTable::from_policies([policy], None)),
    );

    let record = Record::new(
        "1.2.840.5.5",
        Dataset::from_fields([
            Field::new(tag("StationName"), Vr::SH, Value::text("US01")),
            Field::new(tag("StudyDescription"), Vr::LO, Value::text("cardiac")),
            Field::new(tag("PatientName"), Vr::PN, Value::text("Roe^Jane")),
            Field::new(tag("StudyTime"), Vr::TM, Value::text("1530451")),
        ]),
    );

    let engine = AnonymizationEngine::with_defaults(Utc::now().naive_utc());
    match engine.process(record, &matcher, "memory:0").unwrap() {
        RecordOutcome::Processed(processed) => processed.report,
        RecordOutcome::Skipped { reason, .. } => panic!("record skipped: {reason}"),
    }
}

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(!config.local_enabled);
    assert_eq!(config.local_path, "./logs");
    assert_eq!(config.local_rotation, "daily");
    assert!(config.validate().is_ok());
}

#[test]
fn test_logging_config_rotations() {
    for rotation in ["daily", "hourly", "never"] {
        let config = LoggingConfig {
            local_rotation: rotation.to_string(),
            ..LoggingConfig::default()
        };
        assert!(config.validate().is_ok(), "{rotation} should be accepted");
    }

    let config = LoggingConfig {
        local_enabled: true,
        local_path: String::new(),
        ..LoggingConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_diagnostic_logger_disabled_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("audit").join("diagnostics.log");
    let logger = DiagnosticLogger::new(log_path.clone(), true, false).unwrap();

    logger.log_processed(&processed_report()).unwrap();
    assert!(!log_path.exists());
}

#[test]
fn test_plain_text_trail_lists_field_issues() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("diagnostics.log");
    let logger = DiagnosticLogger::new(log_path.clone(), false, true).unwrap();

    let report = processed_report();
    assert_eq!(report.issue_count(), 1);
    logger.log_processed(&report).unwrap();
    logger
        .log_skipped(
            "scan/0002.json",
            &RecordError::MissingStationIdentifier {
                tag: "StationName".to_string(),
            },
        )
        .unwrap();

    let content = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("Processed:"));
    assert!(lines[0].contains("Study: cardiac"));
    assert!(lines[1].contains("StudyTime (offset)"));
    assert!(lines[2].contains("Skipped: scan/0002.json"));

    assert!(!content.contains("Roe^Jane"));
    assert!(!content.contains("1.2.840.5.5"));
}

#[test]
fn test_batch_report_renders_counts() {
    let mut report = BatchReport::new(true);
    report.add_record(&processed_report());
    report.add_skipped(&RecordError::MissingStudyIdentifier {
        tag: "StudyDescription".to_string(),
    });
    report.add_warning("Dry run: no records were written".to_string());

    let console = report.format_console();
    assert!(console.contains("DRY-RUN"));
    assert!(console.contains("cardiac"));
    assert!(console.contains("invalid_temporal_value"));
    assert!(console.contains("missing_study_identifier"));

    let json: serde_json::Value = serde_json::from_str(&report.format_json().unwrap()).unwrap();
    assert_eq!(json["records_processed"], 1);
    assert_eq!(json["records_skipped"], 1);
    assert_eq!(json["actions"]["hash"]["applied"], 1);
    assert_eq!(json["actions"]["offset"]["skipped"], 1);
}
