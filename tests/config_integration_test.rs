//! Configuration loading: files, environment and external tables

use deident::config::{load_config, DeidConfig};
use deident::domain::DeidError;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const BASE: &str = r#"
[anonymization]
random_seed = "be76acfcfdb04e64ba7525dbf745fe5f"

[batch]
input_dir = "./input"
output_dir = "./output"

[stations.default]
TagForStudy = "StudyDescription"

[studies.Research]
AnonymizeTag = { PatientID = { action = "hash" } }
"#;

fn write_config(dir: &Path, content: &str) -> std::path::PathBuf {
    let path = dir.join("deident.toml");
    fs::write(&path, content).unwrap();
    path
}

fn load(content: &str) -> Result<DeidConfig, DeidError> {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), content);
    load_config(&path)
}

fn configuration_message(result: Result<DeidConfig, DeidError>) -> String {
    match result {
        Err(DeidError::Configuration(message)) => message,
        Err(other) => panic!("expected a configuration error, got {other}"),
        Ok(_) => panic!("expected a configuration error"),
    }
}

#[test]
fn test_defaults_applied() {
    let config = load(BASE).unwrap();

    assert_eq!(config.anonymization.station_tag.as_str(), "StationName");
    assert_eq!(config.anonymization.uid_root.as_str(), "2.25");
    assert!(config.anonymization.default_policy.is_none());
    assert!(config.audit.enabled);
    assert!(!config.batch.overwrite);
    assert!(!config.logging.local_enabled);
    assert_eq!(config.logging.local_rotation, "daily");
}

#[test]
fn test_seed_substituted_from_environment() {
    std::env::set_var("DEIDENT_IT_STUDY_SEED", "per-study-secret");
    let content = format!(
        "{BASE}RandomSeed = \"${{DEIDENT_IT_STUDY_SEED}}\"\n# ${{DEIDENT_IT_UNSET_IN_COMMENT}}\n"
    );
    let config = load(&content).unwrap();
    std::env::remove_var("DEIDENT_IT_STUDY_SEED");

    let seed = config.studies["Research"].random_seed.as_ref().unwrap();
    assert_eq!(seed.expose(), "per-study-secret");
}

#[test]
fn test_missing_variables_reported_together() {
    let content = format!(
        "{BASE}RandomSeed = \"${{DEIDENT_IT_MISSING_ONE}}\"\n[studies.Other]\nRandomSeed = \"${{DEIDENT_IT_MISSING_TWO}}\"\n"
    );
    let message = configuration_message(load(&content));
    assert!(message.contains("DEIDENT_IT_MISSING_ONE"));
    assert!(message.contains("DEIDENT_IT_MISSING_TWO"));
}

#[test]
fn test_environment_overrides() {
    std::env::set_var("DEIDENT_BATCH_MAX_CONCURRENCY", "16");
    std::env::set_var("DEIDENT_APPLICATION_DRY_RUN", "true");
    let result = load(BASE);
    std::env::remove_var("DEIDENT_BATCH_MAX_CONCURRENCY");
    std::env::remove_var("DEIDENT_APPLICATION_DRY_RUN");

    let config = result.unwrap();
    assert_eq!(config.batch.max_concurrency, 16);
    assert!(config.application.dry_run);
}

#[test]
fn test_missing_default_station_rejected() {
    let content = BASE.replace("[stations.default]", "[stations.CT01]");
    let message = configuration_message(load(&content));
    assert!(message.contains("default"));
}

#[test]
fn test_case_insensitive_duplicate_study_rejected() {
    let content = format!("{BASE}\n[studies.RESEARCH]\nRemovePrivateTags = false\n");
    let message = configuration_message(load(&content));
    assert!(message.contains("research"));
}

#[test]
fn test_default_policy_must_name_a_study() {
    let content = BASE.replace(
        "random_seed = \"be76acfcfdb04e64ba7525dbf745fe5f\"",
        "random_seed = \"be76acfcfdb04e64ba7525dbf745fe5f\"\ndefault_policy = \"Oncology\"",
    );
    let message = configuration_message(load(&content));
    assert!(message.contains("oncology"));
}

#[test]
fn test_invalid_uid_root_rejected() {
    let content = BASE.replace(
        "random_seed = \"be76acfcfdb04e64ba7525dbf745fe5f\"",
        "random_seed = \"be76acfcfdb04e64ba7525dbf745fe5f\"\nuid_root = \"1.02.3\"",
    );
    assert!(load(&content).is_err());
}

#[test]
fn test_offset_delta_beyond_century_rejected() {
    let content = BASE.replace(
        "{ action = \"hash\" }",
        "{ action = \"offset\", delta = 9999999999 }",
    );
    assert!(load(&content).is_err());
}

#[test]
fn test_salt_on_non_hash_action_rejected() {
    let content = BASE.replace(
        "{ action = \"hash\" }",
        "{ action = \"keep\", salt = \"x\" }",
    );
    assert!(load(&content).is_err());
}

#[test]
fn test_same_input_and_output_rejected() {
    let content = BASE.replace("./output", "./input");
    let message = configuration_message(load(&content));
    assert!(message.contains("output_dir"));
}

#[test]
fn test_unknown_rotation_rejected() {
    let content = format!("{BASE}\n[logging]\nlocal_rotation = \"weekly\"\n");
    assert!(load(&content).is_err());
}

#[test]
fn test_table_files_resolved_next_to_config() {
    let dir = TempDir::new().unwrap();
    let tables = dir.path().join("tables");
    fs::create_dir(&tables).unwrap();
    fs::write(
        tables.join("studies.toml"),
        "[Liver.AnonymizeVR]\nPN = { action = \"clear\" }\n",
    )
    .unwrap();
    fs::write(
        tables.join("stations.json"),
        r#"{ "MR02": { "TagForStudy": "StudyID" } }"#,
    )
    .unwrap();

    let content = format!(
        "[tables]\nstudies_file = \"tables/studies.toml\"\nstations_file = \"tables/stations.json\"\n{BASE}"
    );
    let config = load_config(write_config(dir.path(), &content)).unwrap();

    let policies = config.policy_table().unwrap();
    assert_eq!(policies.names(), vec!["liver", "research"]);
    assert_eq!(config.station_table().unwrap().len(), 2);
    assert_eq!(config.stations["MR02"].study_tag.as_str(), "StudyID");
}

#[test]
fn test_missing_table_file_rejected() {
    let content = format!("[tables]\nstudies_file = \"absent.json\"\n{BASE}");
    let message = configuration_message(load(&content));
    assert!(message.contains("absent.json"));
}
