//! Studies tables from confidentiality profile CSV exports
//!
//! Each row names an attribute and what to do with it: `tag, attribute name,
//! action`, the column layout of the basic application confidentiality
//! profile table (Supplement 142). The tag column may hold a keyword or a
//! `(gggg,eeee)` number; numbers are replaced by a keyword built from the
//! attribute name. The action column takes either an action name (`keep`,
//! `hash`, `regen`, ...) or a profile code (`X`, `Z`, `D`, `K`, `C`, `U`,
//! with compound codes such as `X/Z/D` resolved to their first option).
//!
//! The result is one study in the legacy `studies.json` shape, suitable for
//! `[tables] studies_file`.

use crate::anonymization::{ActionSpec, StudyDefinition, TagDictionary};
use crate::domain::{DeidError, Result, Tag};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

/// Study name used when none is given
pub const DEFAULT_CSV_STUDY: &str = "Supplement142";

/// A converted profile
#[derive(Debug, Clone)]
pub struct CsvImport {
    /// One study, keyed by its name
    pub studies: BTreeMap<String, StudyDefinition>,
    /// Rule rows read (header and blank rows excluded)
    pub rows: usize,
    /// Keywords the built-in dictionary does not know
    pub unrecognized: Vec<String>,
}

impl CsvImport {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.studies)
            .map_err(|e| DeidError::Configuration(format!("Failed to encode studies: {e}")))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(&self.studies)
            .map_err(|e| DeidError::Configuration(format!("Failed to encode studies: {e}")))
    }

    /// Rule of `keyword` in the imported study
    pub fn rule(&self, keyword: &str) -> Option<&ActionSpec> {
        self.studies
            .values()
            .next()
            .and_then(|study| study.anonymize_tag.get(keyword))
    }
}

/// Converts a profile CSV file
///
/// # Errors
///
/// Configuration errors naming the file and line for unreadable rows,
/// rows without a usable keyword, or unknown actions.
pub fn import_studies_csv_file(path: &Path, study: &str) -> Result<CsvImport> {
    let file = std::fs::File::open(path).map_err(|e| {
        DeidError::Configuration(format!("Failed to open {}: {e}", path.display()))
    })?;
    import_studies_csv(file, study).map_err(|e| match e {
        DeidError::Configuration(message) => {
            DeidError::Configuration(format!("{}: {message}", path.display()))
        }
        other => other,
    })
}

/// Converts profile CSV content read from `reader`
///
/// A first row whose action cell is not an action is taken as a header.
/// Later rows for the same keyword replace earlier ones.
///
/// # Errors
///
/// See [`import_studies_csv_file`].
pub fn import_studies_csv<R: io::Read>(reader: R, study: &str) -> Result<CsvImport> {
    let study = study.trim();
    if study.is_empty() {
        return Err(DeidError::Configuration(
            "Study name cannot be empty".to_string(),
        ));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut anonymize_tag = BTreeMap::new();
    let mut rows = 0;
    let mut first = true;

    for result in reader.records() {
        let record = result.map_err(|e| DeidError::Configuration(format!("Invalid CSV: {e}")))?;
        let line = record.position().map_or(0, |p| p.line());

        if record.iter().all(str::is_empty) {
            continue;
        }
        let is_first = std::mem::replace(&mut first, false);

        let cell = |index: usize| record.get(index).unwrap_or("");
        let Some(action) = profile_action(cell(2)) else {
            if is_first {
                tracing::debug!(line, "Skipping header row");
                continue;
            }
            return Err(DeidError::Configuration(format!(
                "line {line}: unknown action '{}'",
                cell(2)
            )));
        };

        let keyword = keyword_for(cell(0), cell(1)).ok_or_else(|| {
            DeidError::Configuration(format!(
                "line {line}: cannot derive a keyword from '{}' / '{}'",
                cell(0),
                cell(1)
            ))
        })?;

        if anonymize_tag.insert(keyword.clone(), action).is_some() {
            tracing::debug!(line, keyword = %keyword, "Keyword listed again; later row wins");
        }
        rows += 1;
    }

    let dictionary = TagDictionary::builtin();
    let unrecognized: Vec<String> = anonymize_tag
        .keys()
        .filter(|keyword| {
            Tag::new(keyword.as_str()).map_or(true, |tag| !dictionary.contains(&tag))
        })
        .cloned()
        .collect();
    if !unrecognized.is_empty() {
        tracing::warn!(
            count = unrecognized.len(),
            "Imported keywords missing from the built-in dictionary"
        );
    }

    let definition = StudyDefinition {
        remove_private_tags: true,
        anonymize_tag,
        ..Default::default()
    };

    Ok(CsvImport {
        studies: BTreeMap::from([(study.to_string(), definition)]),
        rows,
        unrecognized,
    })
}

/// Action for a cell: a profile code, an action name, or nothing (delete)
fn profile_action(cell: &str) -> Option<ActionSpec> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Some(ActionSpec::Delete);
    }

    let code = cell.split('/').next().unwrap_or(cell).trim_end_matches('*');
    let by_code = match code.to_ascii_uppercase().as_str() {
        "X" => Some(ActionSpec::Delete),
        "Z" | "D" => Some(ActionSpec::Clear),
        "K" | "C" => Some(ActionSpec::Keep),
        "U" => Some(ActionSpec::Regenerate { seed: None }),
        _ => None,
    };

    by_code.or_else(|| serde_json::from_value(serde_json::json!({ "action": cell })).ok())
}

/// Keyword from the tag cell when it already is one, else from the name
fn keyword_for(tag: &str, name: &str) -> Option<String> {
    let tag = tag.trim_start_matches('\u{feff}').trim();
    if is_keyword(tag) {
        return Some(tag.to_string());
    }
    keyword_from_name(name)
}

fn is_keyword(text: &str) -> bool {
    text.starts_with(|c: char| c.is_ascii_alphabetic())
        && text.chars().all(|c| c.is_ascii_alphanumeric())
}

/// `Referring Physician's Name` becomes `ReferringPhysicianName`
fn keyword_from_name(name: &str) -> Option<String> {
    let name = name.replace("'s", "").replace("\u{2019}s", "");
    let keyword: String = name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars
                .next()
                .map(|c| c.to_ascii_uppercase().to_string() + chars.as_str())
                .unwrap_or_default()
        })
        .collect();
    is_keyword(&keyword).then_some(keyword)
}
