//! Profile CSV import: from the CSV export to a working policy

use chrono::NaiveDate;
use deident::anonymization::{ActionSpec, AnonymizationEngine, RecordOutcome, StudyMatcher};
use deident::cli::commands::import_csv::ImportCsvArgs;
use deident::config::{load_config, DEFAULT_CSV_STUDY};
use deident::domain::{Dataset, Field, Record, Tag, Value, Vr};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const PROFILE: &str = "\u{feff}Tag,Attribute Name,Basic Profile
\"(0008,0050)\",Accession Number,Z
\"(0010,0010)\",Patient's Name,Z
\"(0010,0020)\",Patient ID,Z
\"(0010,1060)\",Patient's Mother's Birth Name,X
\"(0008,0090)\",Referring Physician's Name,Z
\"(0020,000D)\",Study Instance UID,U
\"(0008,1030)\",Study Description,X/D
\"(0008,0080)\",Institution Name,X/Z/D
Modality,Modality,K
";

const CONFIG: &str = r#"
[anonymization]
random_seed = "be76acfcfdb04e64ba7525dbf745fe5f"
station_tag = "StationName"

[batch]
input_dir = "./input"
output_dir = "./output"

[tables]
studies_file = "STUDIES"

[stations.default]
TagForStudy = "ProtocolName"
"#;

fn tag(name: &str) -> Tag {
    Tag::new(name).unwrap()
}

fn text(name: &str, vr: Vr, value: &str) -> Field {
    Field::new(tag(name), vr, Value::text(value))
}

async fn import(dir: &Path, table: &str) {
    let csv = dir.join("Supplement142.csv");
    fs::write(&csv, PROFILE).unwrap();
    let args = ImportCsvArgs {
        csv,
        study: DEFAULT_CSV_STUDY.to_string(),
        output: Some(dir.join(table)),
        force: false,
    };
    assert_eq!(args.execute().await.unwrap(), 0);

    fs::write(dir.join("deident.toml"), CONFIG.replace("STUDIES", table)).unwrap();
}

#[tokio::test]
async fn test_imported_table_loads_as_policy() {
    for table in ["studies.json", "studies.toml"] {
        let dir = TempDir::new().unwrap();
        import(dir.path(), table).await;

        let config = load_config(dir.path().join("deident.toml")).unwrap();
        let policies = config.policy_table().unwrap();
        let policy = policies.get(DEFAULT_CSV_STUDY).unwrap();

        assert!(policy.strip_private);
        assert_eq!(policy.tag_rules.len(), 9);
        assert_eq!(policy.tag_rules[&tag("AccessionNumber")], ActionSpec::Clear);
        assert_eq!(policy.tag_rules[&tag("PatientMotherBirthName")], ActionSpec::Delete);
        assert_eq!(policy.tag_rules[&tag("InstitutionName")], ActionSpec::Delete);
        assert_eq!(policy.tag_rules[&tag("Modality")], ActionSpec::Keep);
        assert_eq!(
            policy.tag_rules[&tag("StudyInstanceUID")],
            ActionSpec::Regenerate { seed: None }
        );
    }
}

#[tokio::test]
async fn test_imported_policy_deidentifies_records() {
    let dir = TempDir::new().unwrap();
    import(dir.path(), "studies.json").await;
    let config = load_config(dir.path().join("deident.toml")).unwrap();

    let matcher = StudyMatcher::new(
        config.anonymization.station_tag.clone(),
        Arc::new(config.station_table().unwrap()),
        Arc::new(config.policy_table().unwrap()),
    );
    let now = NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();

    let record = Record::new(
        "1.2.840.113619.2.55.3.1",
        Dataset::from_fields([
            text("StationName", Vr::SH, "MR02"),
            text("ProtocolName", Vr::LO, "supplement142"),
            text("AccessionNumber", Vr::SH, "ACC-77"),
            text("PatientName", Vr::PN, "Doe^John"),
            text("PatientMotherBirthName", Vr::PN, "Roe^Mary"),
            text("StudyInstanceUID", Vr::UI, "1.2.840.113619.2.55.3"),
            text("StudyDescription", Vr::LO, "Brain MRI"),
            text("Modality", Vr::CS, "MR"),
            Field::private(tag("VendorNotes"), Vr::LO, Value::text("internal")),
        ]),
    );

    let outcome = AnonymizationEngine::with_defaults(now)
        .process(record, &matcher, "scan/0001.json")
        .unwrap();
    let RecordOutcome::Processed(processed) = outcome else {
        panic!("record skipped");
    };
    let dataset = &processed.record.dataset;

    assert!(dataset.get(&tag("AccessionNumber")).unwrap().value.is_empty());
    assert!(dataset.get(&tag("PatientName")).unwrap().value.is_empty());
    assert!(dataset.get(&tag("PatientMotherBirthName")).is_none());
    assert!(dataset.get(&tag("StudyDescription")).is_none());
    assert!(dataset.get(&tag("VendorNotes")).is_none());
    assert_eq!(
        dataset.get(&tag("Modality")).map(|f| f.value.clone()),
        Some(Value::text("MR"))
    );
    let Some(Value::Text(study_uid)) = dataset.get(&tag("StudyInstanceUID")).map(|f| f.value.clone())
    else {
        panic!("StudyInstanceUID missing");
    };
    assert!(study_uid.starts_with("2.25."));
}
