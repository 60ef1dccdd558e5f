//! End-to-end engine tests: configuration tables, matching and the executor

use chrono::{NaiveDate, NaiveDateTime};
use deident::anonymization::models::{ProcessedRecord, RecordOutcome};
use deident::anonymization::{AnonymizationEngine, StudyMatcher};
use deident::config::DeidConfig;
use deident::domain::{Dataset, Field, FieldError, Record, RecordError, Tag, Value, Vr};
use std::sync::Arc;

const CONFIG: &str = r#"
[anonymization]
random_seed = "be76acfcfdb04e64ba7525dbf745fe5f"

[stations.default]
TagForStudy = "StudyDescription"

[stations.CT01]
TagForStudy = "StudyDescription"
StudySplit = "^"
StudySplitIndex = 1

[studies.Research]
RemovePrivateTags = true
SavePrivateTags = ["SiemensCsaHeader"]

[studies.Research.AnonymizeTag]
PatientName = { action = "keep" }
PatientID = { action = "hash" }
StudyTime = { action = "offset", delta = 3600 }
InstitutionName = { action = "value", value = "ANONYMIZED" }
StudyDate = { action = "regen", seed = "date-seed" }

[studies.Research.AnonymizeVR]
PN = { action = "delete" }
UI = { action = "regen" }
"#;

fn tag(name: &str) -> Tag {
    Tag::new(name).unwrap()
}

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn config(extra: &str) -> DeidConfig {
    let config: DeidConfig = toml::from_str(&format!("{CONFIG}{extra}")).unwrap();
    config.validate().unwrap();
    config
}

fn matcher(config: &DeidConfig) -> StudyMatcher {
    StudyMatcher::new(
        config.anonymization.station_tag.clone(),
        Arc::new(config.station_table().unwrap()),
        Arc::new(config.policy_table().unwrap()),
    )
}

fn engine() -> AnonymizationEngine {
    AnonymizationEngine::with_defaults(now())
}

fn text(name: &str, vr: Vr, value: &str) -> Field {
    Field::new(tag(name), vr, Value::text(value))
}

fn record(fields: impl IntoIterator<Item = Field>) -> Record {
    Record::new("1.2.840.113619.2.55.3.1", Dataset::from_fields(fields))
}

fn processed(outcome: RecordOutcome) -> ProcessedRecord {
    match outcome {
        RecordOutcome::Processed(processed) => *processed,
        RecordOutcome::Skipped { reason, .. } => panic!("record skipped: {reason}"),
    }
}

fn skipped(outcome: RecordOutcome) -> RecordError {
    match outcome {
        RecordOutcome::Skipped { reason, .. } => reason,
        RecordOutcome::Processed(_) => panic!("record unexpectedly processed"),
    }
}

fn value_of(processed: &ProcessedRecord, name: &str) -> Option<Value> {
    processed
        .record
        .dataset
        .get(&tag(name))
        .map(|field| field.value.clone())
}

fn research_record() -> Record {
    record([
        text("StationName", Vr::SH, "CT01"),
        text("StudyDescription", Vr::LO, "SITE^Research"),
        text("PatientName", Vr::PN, "Doe^John"),
        text("ReferringPhysicianName", Vr::PN, "House^Gregory"),
        text("PatientID", Vr::LO, "MRN-0042"),
        text("StudyTime", Vr::TM, "153045"),
        text("StudyDate", Vr::DA, "20200101"),
        text("SeriesInstanceUID", Vr::UI, "1.2.840.113619.2.55.3.2"),
        Field::private(tag("SiemensCsaHeader"), Vr::OB, Value::Binary(vec![7, 7])),
        Field::private(tag("VendorNotes"), Vr::LO, Value::text("internal")),
    ])
}

#[test]
fn test_full_policy_over_split_study_key() {
    let config = config("");
    let outcome = engine()
        .process(research_record(), &matcher(&config), "scan/0001.json")
        .unwrap();
    let processed = processed(outcome);

    assert_eq!(processed.study.as_str(), "research");
    assert_eq!(processed.report.policy, "research");

    // Tag rule keep wins over the PN delete rule
    assert_eq!(value_of(&processed, "PatientName"), Some(Value::text("Doe^John")));
    assert!(value_of(&processed, "ReferringPhysicianName").is_none());

    let Some(Value::Text(hashed)) = value_of(&processed, "PatientID") else {
        panic!("PatientID not hashed to text");
    };
    assert_ne!(hashed, "MRN-0042");

    assert_eq!(
        value_of(&processed, "StudyTime"),
        Some(Value::text("163045.000000"))
    );
    assert_eq!(
        value_of(&processed, "InstitutionName"),
        Some(Value::text("ANONYMIZED"))
    );

    let Some(Value::Text(series)) = value_of(&processed, "SeriesInstanceUID") else {
        panic!("SeriesInstanceUID missing");
    };
    assert!(series.starts_with("2.25."));

    assert_eq!(processed.report.private_removed, 1);
    assert!(value_of(&processed, "SiemensCsaHeader").is_some());
    assert!(value_of(&processed, "VendorNotes").is_none());

    assert_ne!(processed.record.instance_uid, "1.2.840.113619.2.55.3.1");
    assert_eq!(
        processed.report.original_instance_uid,
        "1.2.840.113619.2.55.3.1"
    );
}

#[test]
fn test_same_input_same_output() {
    let config = config("");
    let matcher = matcher(&config);
    let first = processed(engine().process(research_record(), &matcher, "a").unwrap());
    let second = processed(engine().process(research_record(), &matcher, "b").unwrap());
    assert_eq!(first.record, second.record);
}

#[test]
fn test_date_regeneration_is_stable_for_fixed_now() {
    let config = config("");
    let matcher = matcher(&config);
    let mut other = research_record();
    other
        .dataset
        .upsert(text("StudyDate", Vr::DA, "19991231"));

    let first = processed(engine().process(research_record(), &matcher, "a").unwrap());
    let second = processed(engine().process(other, &matcher, "b").unwrap());

    let regenerated = value_of(&first, "StudyDate");
    assert_eq!(regenerated, value_of(&second, "StudyDate"));
    assert_ne!(regenerated, Some(Value::text("20200101")));
}

#[test]
fn test_private_stripping_is_idempotent() {
    let config = config(
        r#"
[studies.Strip]
RemovePrivateTags = true
"#,
    );
    let matcher = matcher(&config);
    let input = record([
        text("StationName", Vr::SH, "MR02"),
        text("StudyDescription", Vr::LO, "strip"),
        Field::private(tag("VendorNotes"), Vr::LO, Value::text("internal")),
        text("Modality", Vr::CS, "MR"),
    ]);

    let once = processed(engine().process(input, &matcher, "a").unwrap());
    assert_eq!(once.report.private_removed, 1);

    let twice = processed(engine().process(once.record.clone(), &matcher, "b").unwrap());
    assert_eq!(twice.report.private_removed, 0);
    assert_eq!(twice.record.dataset, once.record.dataset);
}

#[test]
fn test_default_station_reads_study_directly() {
    let config = config("");
    let input = record([
        text("StationName", Vr::SH, "UNKNOWN-SCANNER"),
        text("StudyDescription", Vr::LO, "  RESEARCH "),
    ]);
    let processed = processed(engine().process(input, &matcher(&config), "a").unwrap());
    assert_eq!(processed.study.as_str(), "research");
}

#[test]
fn test_missing_station_field_skips_record() {
    let config = config("");
    let input = record([text("StudyDescription", Vr::LO, "Research")]);
    let reason = skipped(engine().process(input, &matcher(&config), "a").unwrap());
    assert_eq!(
        reason,
        RecordError::MissingStationIdentifier {
            tag: "StationName".to_string()
        }
    );
}

#[test]
fn test_split_index_out_of_range_skips_record() {
    let config = config("");
    let input = record([
        text("StationName", Vr::SH, "ct01"),
        text("StudyDescription", Vr::LO, "Research"),
    ]);
    let reason = skipped(engine().process(input, &matcher(&config), "a").unwrap());
    assert_eq!(
        reason,
        RecordError::MalformedStudyKey {
            tag: "StudyDescription".to_string(),
            delimiter: "^".to_string(),
            index: 1,
            parts: 1,
        }
    );
}

#[test]
fn test_unknown_study_without_default_skips_record() {
    let config = config("");
    let input = record([
        text("StationName", Vr::SH, "CT01"),
        text("StudyDescription", Vr::LO, "SITE^Oncology"),
    ]);
    let reason = skipped(engine().process(input, &matcher(&config), "a").unwrap());
    assert!(matches!(reason, RecordError::MissingStudyIdentifier { .. }));
}

#[test]
fn test_unknown_study_uses_default_policy() {
    let mut config = config("");
    config.anonymization.default_policy = Some("Research".to_string());
    let input = record([
        text("StationName", Vr::SH, "CT01"),
        text("StudyDescription", Vr::LO, "SITE^Oncology"),
        text("ReferringPhysicianName", Vr::PN, "House^Gregory"),
    ]);
    let processed = processed(engine().process(input, &matcher(&config), "a").unwrap());
    assert_eq!(processed.study.as_str(), "oncology");
    assert_eq!(processed.report.policy, "research");
    assert!(value_of(&processed, "ReferringPhysicianName").is_none());
}

#[test]
fn test_invalid_record_skipped() {
    let config = config("");
    let input = Record::new(
        "  ",
        Dataset::from_fields([text("StationName", Vr::SH, "CT01")]),
    );
    let reason = skipped(engine().process(input, &matcher(&config), "a").unwrap());
    assert_eq!(reason.label(), "invalid_input_record");
}

#[test]
fn test_unrecognized_tag_is_kept_and_reported() {
    let config = config("");
    let input = record([
        text("StationName", Vr::SH, "CT01"),
        text("StudyDescription", Vr::LO, "SITE^Research"),
        text("ScannerCode", Vr::LO, "X1"),
    ]);
    let processed = processed(engine().process(input, &matcher(&config), "a").unwrap());
    assert_eq!(value_of(&processed, "ScannerCode"), Some(Value::text("X1")));
    assert!(processed
        .report
        .issues()
        .any(|(d, issue)| d.tag == tag("ScannerCode") && issue == FieldError::UnrecognizedTag));
}

#[test]
fn test_vr_rule_covers_tags_outside_the_dictionary() {
    let config = config("");
    let input = record([
        text("StationName", Vr::SH, "CT01"),
        text("StudyDescription", Vr::LO, "SITE^Research"),
        text("PatientMotherBirthName", Vr::PN, "Doe^Mary"),
        text("NameOfPhysiciansReadingStudy", Vr::PN, "Smith^Ann"),
    ]);
    let processed = processed(engine().process(input, &matcher(&config), "a").unwrap());

    assert!(value_of(&processed, "PatientMotherBirthName").is_none());
    assert!(value_of(&processed, "NameOfPhysiciansReadingStudy").is_none());
    let flagged: Vec<Tag> = processed
        .report
        .issues()
        .filter(|(_, issue)| *issue == FieldError::UnrecognizedTag)
        .map(|(d, _)| d.tag.clone())
        .collect();
    assert_eq!(
        flagged,
        vec![tag("PatientMotherBirthName"), tag("NameOfPhysiciansReadingStudy")]
    );
}

#[test]
fn test_dictionary_extension_recognizes_site_tags() {
    let config = config(
        r#"
[anonymization.dictionary]
ScannerCode = "LO"
"#,
    );
    let dictionary = config.anonymization.tag_dictionary().unwrap();
    let engine = AnonymizationEngine::new(
        Arc::new(dictionary),
        config.anonymization.uid_root.clone(),
        now(),
    );
    let input = record([
        text("StationName", Vr::SH, "CT01"),
        text("StudyDescription", Vr::LO, "SITE^Research"),
        text("ScannerCode", Vr::LO, "X1"),
    ]);
    let processed = processed(engine.process(input, &matcher(&config), "a").unwrap());
    assert_eq!(processed.report.issue_count(), 0);
}

const VENDOR_STUDIES: &str = r#"
[studies.VendorKeep]
RemovePrivateTags = true
SavePrivateTags = ["SiemensCsaHeader", "VendorNotes", "VendorImageFlags"]

[studies.VendorStrip]
RemovePrivateTags = true
SavePrivateTags = []
"#;

fn vendor_record(study: &str) -> Record {
    let item = Dataset::from_fields([
        text("ReferencedSOPInstanceUID", Vr::UI, "1.2.840.113619.2.55.3.7"),
        Field::private(tag("VendorImageFlags"), Vr::LO, Value::text("nested")),
    ]);
    record([
        text("StationName", Vr::SH, "MR02"),
        text("StudyDescription", Vr::LO, study),
        text("Modality", Vr::CS, "MR"),
        Field::private(tag("SiemensCsaHeader"), Vr::OB, Value::Binary(vec![1, 2, 3])),
        Field::private(tag("VendorNotes"), Vr::LO, Value::text("internal")),
        Field::new(
            tag("ReferencedImageSequence"),
            Vr::SQ,
            Value::Sequence(vec![item]),
        ),
    ])
}

#[test]
fn test_preserving_every_private_tag_leaves_fields_unchanged() {
    let config = config(VENDOR_STUDIES);
    let input = vendor_record("VendorKeep");
    let processed = processed(engine().process(input.clone(), &matcher(&config), "a").unwrap());

    assert_eq!(processed.report.policy, "vendorkeep");
    assert_eq!(processed.report.private_removed, 0);
    assert_eq!(processed.record.dataset, input.dataset);
}

#[test]
fn test_empty_preserved_set_removes_all_private_fields() {
    let config = config(VENDOR_STUDIES);
    let processed = processed(
        engine()
            .process(vendor_record("VendorStrip"), &matcher(&config), "a")
            .unwrap(),
    );
    let dataset = &processed.record.dataset;

    assert_eq!(processed.report.private_removed, 3);
    assert!(dataset
        .field_paths()
        .iter()
        .all(|path| dataset.locate(path).is_some_and(|field| !field.private)));

    let Some(Value::Sequence(items)) = value_of(&processed, "ReferencedImageSequence") else {
        panic!("ReferencedImageSequence missing");
    };
    assert_eq!(items.len(), 1);
    assert!(items[0].get(&tag("VendorImageFlags")).is_none());
    assert_eq!(
        items[0]
            .get(&tag("ReferencedSOPInstanceUID"))
            .map(|field| field.value.clone()),
        Some(Value::text("1.2.840.113619.2.55.3.7"))
    );
    assert_eq!(value_of(&processed, "Modality"), Some(Value::text("MR")));
}
