//! Domain identifier types with validation
//!
//! Newtype wrappers keep tags, study keys, seeds and identifier roots from
//! being mixed up with each other or with plain field values.

use crate::config::{secret_string, SecretString};
use regex::Regex;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Field tag newtype wrapper
///
/// A tag is an opaque, stable key for a field; in practice a DICOM keyword.
///
/// # Examples
///
/// ```
/// use deident::domain::ids::Tag;
/// use std::str::FromStr;
///
/// let tag = Tag::from_str("PatientName").unwrap();
/// assert_eq!(tag.as_str(), "PatientName");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Tag(String);

impl Tag {
    /// Creates a new Tag, rejecting blank keys
    pub fn new(tag: impl Into<String>) -> Result<Self, String> {
        let tag = tag.into();
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            return Err("Tag cannot be empty".to_string());
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the tag as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Tag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Tag {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.0
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalizes a table name or field value for lookup (trim + case-fold)
pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Normalized study key
///
/// Study keys are case-folded so that `"Supplement142"` and `"SUPPLEMENT142"`
/// select the same policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudyKey(String);

impl StudyKey {
    /// Creates a study key from a raw field value
    pub fn new(raw: &str) -> Self {
        Self(normalize_key(raw))
    }

    /// Returns the normalized key
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key usable as a single path component for output grouping
    pub fn as_path_component(&self) -> String {
        let cleaned: String = self
            .0
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        if cleaned.is_empty() {
            "unnamed".to_string()
        } else {
            cleaned
        }
    }
}

impl fmt::Display for StudyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Salt or seed controlling deterministic derivation
///
/// Wraps a secret string so that seeds never end up in `Debug` output or logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Seed(SecretString);

impl Seed {
    /// Creates a new seed
    pub fn new(value: impl Into<String>) -> Self {
        Self(secret_string(value.into()))
    }

    /// Exposes the seed material
    pub fn expose(&self) -> &str {
        self.0.expose_secret().as_ref()
    }

    /// Whether the seed is empty
    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed([REDACTED])")
    }
}

impl PartialEq for Seed {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for Seed {}

impl From<SecretString> for Seed {
    fn from(secret: SecretString) -> Self {
        Self(secret)
    }
}

const UID_ROOT_MAX_LENGTH: usize = 24;
const UID_ROOT_DEFAULT_VALUE: &str = "2.25";

static UID_ROOT_REGEX: OnceLock<Regex> = OnceLock::new();

/// Root prefix for derived unique identifiers
///
/// Must be dot-separated numeric components without leading zeros and no longer
/// than 24 characters, leaving room for a 39-digit derived suffix within the
/// 64-character identifier limit.
///
/// ```
/// use deident::domain::ids::UidRoot;
///
/// assert!("1.2.840.99999".parse::<UidRoot>().is_ok());
/// assert!("0.1.2".parse::<UidRoot>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UidRoot(String);

impl UidRoot {
    /// Creates a validated identifier root
    pub fn new(root: &str) -> Result<Self, String> {
        let regex = UID_ROOT_REGEX.get_or_init(|| {
            Regex::new(r"^[1-9][0-9]*(\.(0|[1-9][0-9]*))*$").expect("static regex is valid")
        });

        let root = root.trim().trim_end_matches('.');
        if root.len() > UID_ROOT_MAX_LENGTH || !regex.is_match(root) {
            return Err(format!(
                "{root} is not a valid UID root: use numeric components without leading zeros, at most {UID_ROOT_MAX_LENGTH} characters"
            ));
        }
        Ok(Self(root.to_string()))
    }

    /// Returns the root as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for UidRoot {
    fn default() -> Self {
        Self(UID_ROOT_DEFAULT_VALUE.to_string())
    }
}

impl FromStr for UidRoot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for UidRoot {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<UidRoot> for String {
    fn from(root: UidRoot) -> Self {
        root.0
    }
}

impl fmt::Display for UidRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
