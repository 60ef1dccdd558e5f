//! Record model
//!
//! A [`Record`] is a tree: a top-level [`Dataset`] of tagged, typed [`Field`]s,
//! where a field of VR `SQ` holds nested datasets. Every record also carries a
//! distinguished instance identifier that is regenerated on every pass.

use crate::domain::ids::Tag;
use crate::domain::vr::Vr;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;

/// Field payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// No value (a present but empty field)
    Empty,
    /// Character data, including numbers, dates and identifiers in their textual form
    Text(String),
    /// Opaque bytes; base64 in serialized records
    Binary(#[serde(with = "base64_bytes")] Vec<u8>),
    /// Sequence items
    Sequence(Vec<Dataset>),
}

impl Value {
    /// Convenience constructor for text values
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Textual form used for hashing and derivation
    ///
    /// Binary payloads render as lowercase hex; sequences have no textual form.
    pub fn textual(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Empty => Some(Cow::Borrowed("")),
            Self::Text(s) => Some(Cow::Borrowed(s.as_str())),
            Self::Binary(bytes) => Some(Cow::Owned(
                bytes.iter().map(|b| format!("{b:02x}")).collect(),
            )),
            Self::Sequence(_) => None,
        }
    }

    /// Whether the value is empty
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.is_empty(),
            Self::Binary(bytes) => bytes.is_empty(),
            Self::Sequence(items) => items.is_empty(),
        }
    }
}

mod base64_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64.decode(encoded).map_err(serde::de::Error::custom)
    }
}

/// A single tagged, typed field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub tag: Tag,
    pub vr: Vr,
    pub value: Value,
    #[serde(default)]
    pub private: bool,
}

impl Field {
    /// Creates a public field
    pub fn new(tag: Tag, vr: Vr, value: Value) -> Self {
        Self {
            tag,
            vr,
            value,
            private: false,
        }
    }

    /// Creates a private (vendor-specific) field
    pub fn private(tag: Tag, vr: Vr, value: Value) -> Self {
        Self {
            tag,
            vr,
            value,
            private: true,
        }
    }
}

/// One level of fields; tags are unique within a dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    fields: Vec<Field>,
}

impl Dataset {
    /// Creates an empty dataset
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a dataset, later duplicates replacing earlier ones
    pub fn from_fields(fields: impl IntoIterator<Item = Field>) -> Self {
        let mut dataset = Self::new();
        for field in fields {
            dataset.upsert(field);
        }
        dataset
    }

    pub fn get(&self, tag: &Tag) -> Option<&Field> {
        self.fields.iter().find(|f| &f.tag == tag)
    }

    pub fn get_mut(&mut self, tag: &Tag) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| &f.tag == tag)
    }

    pub fn contains(&self, tag: &Tag) -> bool {
        self.get(tag).is_some()
    }

    /// Inserts the field, replacing any field with the same tag in place
    pub fn upsert(&mut self, field: Field) {
        match self.get_mut(&field.tag) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    /// Removes and returns the field with the given tag
    pub fn remove(&mut self, tag: &Tag) -> Option<Field> {
        let index = self.fields.iter().position(|f| &f.tag == tag)?;
        Some(self.fields.remove(index))
    }

    pub fn retain(&mut self, keep: impl FnMut(&Field) -> bool) {
        self.fields.retain(keep);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Field> {
        self.fields.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Paths of every field in the tree, depth-first, parents before children
    pub fn field_paths(&self) -> Vec<FieldPath> {
        let mut paths = Vec::new();
        self.collect_paths(&[], &mut paths);
        paths
    }

    fn collect_paths(&self, parents: &[PathStep], out: &mut Vec<FieldPath>) {
        for field in &self.fields {
            out.push(FieldPath {
                parents: parents.to_vec(),
                tag: field.tag.clone(),
            });
            if let Value::Sequence(items) = &field.value {
                for (index, item) in items.iter().enumerate() {
                    let mut nested = parents.to_vec();
                    nested.push(PathStep {
                        sequence: field.tag.clone(),
                        item: index,
                    });
                    item.collect_paths(&nested, out);
                }
            }
        }
    }

    /// The addressed field, if it and all of its parents exist
    pub fn locate(&self, path: &FieldPath) -> Option<&Field> {
        let mut current = self;
        for step in &path.parents {
            match &current.get(&step.sequence)?.value {
                Value::Sequence(items) => current = items.get(step.item)?,
                _ => return None,
            }
        }
        current.get(&path.tag)
    }

    /// Dataset containing the addressed field, if every parent still exists
    pub fn parent_mut(&mut self, path: &FieldPath) -> Option<&mut Dataset> {
        let mut current = self;
        for step in &path.parents {
            let field = current.get_mut(&step.sequence)?;
            match &mut field.value {
                Value::Sequence(items) => current = items.get_mut(step.item)?,
                _ => return None,
            }
        }
        Some(current)
    }

    /// The addressed field, if it and all of its parents still exist
    pub fn locate_mut(&mut self, path: &FieldPath) -> Option<&mut Field> {
        self.parent_mut(path)?.get_mut(&path.tag)
    }
}

/// One step down into a sequence item
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathStep {
    pub sequence: Tag,
    pub item: usize,
}

/// Address of a field anywhere in a record tree
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    pub parents: Vec<PathStep>,
    pub tag: Tag,
}

impl FieldPath {
    /// Path of a top-level field
    pub fn top_level(tag: Tag) -> Self {
        Self {
            parents: Vec::new(),
            tag,
        }
    }

    /// Whether the field sits inside a sequence
    pub fn is_nested(&self) -> bool {
        !self.parents.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.parents {
            write!(f, "{}[{}].", step.sequence, step.item)?;
        }
        write!(f, "{}", self.tag)
    }
}

/// A parsed record handed to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Distinguished instance identifier, always regenerated
    pub instance_uid: String,
    /// Top-level fields
    pub dataset: Dataset,
}

impl Record {
    pub fn new(instance_uid: impl Into<String>, dataset: Dataset) -> Self {
        Self {
            instance_uid: instance_uid.into(),
            dataset,
        }
    }

    /// Structural checks run before a record enters the engine
    pub fn validate(&self) -> Result<(), String> {
        if self.instance_uid.trim().is_empty() {
            return Err("instance identifier is empty".to_string());
        }
        validate_dataset(&self.dataset)
    }
}

fn validate_dataset(dataset: &Dataset) -> Result<(), String> {
    let mut seen = std::collections::HashSet::new();
    for field in dataset.iter() {
        if !seen.insert(&field.tag) {
            return Err(format!("duplicate tag {} within one level", field.tag));
        }
        match (&field.value, field.vr) {
            (Value::Sequence(items), Vr::SQ) => {
                for item in items {
                    validate_dataset(item)?;
                }
            }
            (Value::Sequence(_), vr) => {
                return Err(format!("field {} holds a sequence but has VR {vr}", field.tag));
            }
            _ => {}
        }
    }
    Ok(())
}
