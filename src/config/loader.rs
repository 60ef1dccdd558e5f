//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::DeidConfig;
use crate::domain::errors::DeidError;
use crate::domain::result::Result;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

static ENV_VAR_REGEX: OnceLock<Regex> = OnceLock::new();

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into DeidConfig
/// 4. Applies environment variable overrides (DEIDENT_* prefix)
/// 5. Merges study/station tables from `[tables]` files
/// 6. Validates the configuration and compiles both tables
///
/// # Errors
///
/// Returns a configuration error if:
/// - File cannot be read
/// - TOML parsing fails
/// - Environment variable substitution fails
/// - A table file is unreadable or redefines an inline entry
/// - Configuration validation or table compilation fails
///
/// # Examples
///
/// ```no_run
/// use deident::config::loader::load_config;
///
/// let config = load_config("deident.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<DeidConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(DeidError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        DeidError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: DeidConfig = toml::from_str(&contents)
        .map_err(|e| DeidError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    // Table paths are relative to the configuration file
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    load_tables(&mut config, base)?;

    config.validate().map_err(|e| {
        DeidError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    config.policy_table()?;
    config.station_table()?;

    Ok(config)
}

/// Merges the study and station table files named in `[tables]`
///
/// Relative paths are resolved against `base`.
pub fn load_tables(config: &mut DeidConfig, base: &Path) -> Result<()> {
    if let Some(file) = config.tables.studies_file.clone() {
        let studies = read_table(&base.join(file))?;
        config.merge_studies(studies)?;
    }

    if let Some(file) = config.tables.stations_file.clone() {
        let stations = read_table(&base.join(file))?;
        config.merge_stations(stations)?;
    }

    Ok(())
}

/// Reads a JSON or TOML table keyed by name, chosen by extension
fn read_table<T: DeserializeOwned>(path: &Path) -> Result<BTreeMap<String, T>> {
    let contents = fs::read_to_string(path).map_err(|e| {
        DeidError::Configuration(format!("Failed to read table {}: {}", path.display(), e))
    })?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&contents).map_err(|e| {
            DeidError::Configuration(format!("Failed to parse {}: {}", path.display(), e))
        })
    } else {
        let contents = substitute_env_vars(&contents)?;
        toml::from_str(&contents).map_err(|e| {
            DeidError::Configuration(format!("Failed to parse {}: {}", path.display(), e))
        })
    }
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// # Errors
///
/// Returns an error listing every referenced environment variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = ENV_VAR_REGEX.get_or_init(|| {
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("static regex is valid")
    });
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    for line in input.lines() {
        let trimmed = line.trim_start();

        // Comments are passed through untouched
        if trimmed.starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(DeidError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using DEIDENT_* prefix
///
/// Environment variables follow the pattern: DEIDENT_<SECTION>_<KEY>
/// For example: DEIDENT_BATCH_MAX_CONCURRENCY, DEIDENT_ANONYMIZATION_RANDOM_SEED
fn apply_env_overrides(config: &mut DeidConfig) -> Result<()> {
    if let Ok(val) = std::env::var("DEIDENT_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("DEIDENT_APPLICATION_DRY_RUN") {
        config.application.dry_run = parse_override("DEIDENT_APPLICATION_DRY_RUN", &val)?;
    }

    config
        .anonymization
        .apply_env_overrides()
        .map_err(|e| DeidError::Configuration(format!("{e:#}")))?;

    if let Ok(val) = std::env::var("DEIDENT_BATCH_INPUT_DIR") {
        config.batch.input_dir = val.into();
    }
    if let Ok(val) = std::env::var("DEIDENT_BATCH_OUTPUT_DIR") {
        config.batch.output_dir = val.into();
    }
    if let Ok(val) = std::env::var("DEIDENT_BATCH_MAX_CONCURRENCY") {
        config.batch.max_concurrency = parse_override("DEIDENT_BATCH_MAX_CONCURRENCY", &val)?;
    }
    if let Ok(val) = std::env::var("DEIDENT_BATCH_OVERWRITE") {
        config.batch.overwrite = parse_override("DEIDENT_BATCH_OVERWRITE", &val)?;
    }

    config
        .audit
        .apply_env_overrides()
        .map_err(|e| DeidError::Configuration(format!("{e:#}")))?;

    if let Ok(val) = std::env::var("DEIDENT_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = parse_override("DEIDENT_LOGGING_LOCAL_ENABLED", &val)?;
    }
    if let Ok(val) = std::env::var("DEIDENT_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Ok(val) = std::env::var("DEIDENT_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    Ok(())
}

fn parse_override<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| DeidError::Configuration(format!("Invalid {name} value: '{value}'")))
}
