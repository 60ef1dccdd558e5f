//! JSON directory source and sink
//!
//! Each file holds one serialized [`Record`]. The source scans a directory
//! tree once, in sorted order; the sink writes
//! `<output>/<study>/<instance uid>.json`.

use crate::adapters::traits::{Incoming, RecordSink, RecordSource};
use crate::domain::{DeidError, Record, Result, StudyKey};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

const RECORD_EXTENSION: &str = "json";

/// Reads `*.json` records from a directory tree
#[derive(Debug)]
pub struct JsonDirectorySource {
    root: PathBuf,
    pending: VecDeque<PathBuf>,
}

impl JsonDirectorySource {
    /// Scans `root` recursively for record files
    ///
    /// # Errors
    ///
    /// Returns an I/O error if `root` or one of its subdirectories cannot be read.
    pub async fn scan(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let mut files = Vec::new();
        let mut dirs = vec![root.clone()];

        while let Some(dir) = dirs.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await.map_err(|e| {
                DeidError::Io(format!("Failed to read directory {}: {}", dir.display(), e))
            })?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    dirs.push(path);
                } else if is_record_file(&path) {
                    files.push(path);
                }
            }
        }

        files.sort();
        tracing::info!(
            root = %root.display(),
            files = files.len(),
            "Scanned input directory"
        );

        Ok(Self {
            root,
            pending: files.into(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn is_record_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(RECORD_EXTENSION))
}

#[async_trait]
impl RecordSource for JsonDirectorySource {
    async fn next_record(&mut self) -> Result<Option<Incoming>> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };
        let origin = path.display().to_string();

        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) => {
                return Ok(Some(Incoming::Invalid {
                    origin,
                    reason: format!("unreadable: {e}"),
                }))
            }
        };

        Ok(Some(match serde_json::from_str::<Record>(&contents) {
            Ok(record) => Incoming::Record { origin, record },
            Err(e) => Incoming::Invalid {
                origin,
                reason: format!("malformed record: {e}"),
            },
        }))
    }

    fn remaining(&self) -> Option<usize> {
        Some(self.pending.len())
    }
}

/// Writes records as pretty-printed JSON grouped by study
#[derive(Debug, Clone)]
pub struct JsonDirectorySink {
    root: PathBuf,
    overwrite: bool,
}

impl JsonDirectorySink {
    pub fn new(root: impl Into<PathBuf>, overwrite: bool) -> Self {
        Self {
            root: root.into(),
            overwrite,
        }
    }

    /// Output location for a record
    pub fn path_for(&self, study: &StudyKey, record: &Record) -> PathBuf {
        self.root
            .join(study.as_path_component())
            .join(format!("{}.{}", record.instance_uid, RECORD_EXTENSION))
    }
}

#[async_trait]
impl RecordSink for JsonDirectorySink {
    async fn write(&self, study: &StudyKey, record: &Record) -> Result<PathBuf> {
        let path = self.path_for(study, record);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                DeidError::Sink(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let json = serde_json::to_vec_pretty(record)?;

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true);
        if self.overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }

        let mut file = options.open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                DeidError::OutputExists(path.clone())
            } else {
                DeidError::Sink(format!("Failed to open {}: {}", path.display(), e))
            }
        })?;
        file.write_all(&json)
            .await
            .map_err(|e| DeidError::Sink(format!("Failed to write {}: {}", path.display(), e)))?;
        file.flush()
            .await
            .map_err(|e| DeidError::Sink(format!("Failed to flush {}: {}", path.display(), e)))?;

        tracing::debug!(path = %path.display(), "Wrote record");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Dataset, Field, Tag, Value, Vr};
    use tempfile::TempDir;

    fn record(uid: &str) -> Record {
        Record::new(
            uid,
            Dataset::from_fields([Field::new(
                Tag::new("StudyDescription").unwrap(),
                Vr::LO,
                Value::text("Brain"),
            )]),
        )
    }

    #[tokio::test]
    async fn test_scan_is_recursive_and_sorted() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("b")).unwrap();
        for name in ["b/2.json", "a.json", "notes.txt"] {
            std::fs::write(
                dir.path().join(name),
                serde_json::to_string(&record("1.2.3")).unwrap(),
            )
            .unwrap();
        }

        let mut source = JsonDirectorySource::scan(dir.path()).await.unwrap();
        assert_eq!(source.remaining(), Some(2));

        let first = source.next_record().await.unwrap().unwrap();
        assert!(first.origin().ends_with("a.json"));
        let second = source.next_record().await.unwrap().unwrap();
        assert!(second.origin().ends_with("2.json"));
        assert!(source.next_record().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_file_is_invalid() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

        let mut source = JsonDirectorySource::scan(dir.path()).await.unwrap();
        match source.next_record().await.unwrap() {
            Some(Incoming::Invalid { reason, .. }) => assert!(reason.contains("malformed")),
            other => panic!("expected invalid item, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_scan_missing_directory() {
        assert!(JsonDirectorySource::scan("/nonexistent/deident/input").await.is_err());
    }

    #[tokio::test]
    async fn test_sink_writes_grouped_by_study() {
        let dir = TempDir::new().unwrap();
        let sink = JsonDirectorySink::new(dir.path(), false);
        let study = StudyKey::new("Brain MRI");

        let path = sink.write(&study, &record("2.25.42")).await.unwrap();
        assert_eq!(path, dir.path().join("brain_mri").join("2.25.42.json"));

        let written: Record =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.instance_uid, "2.25.42");
    }

    #[tokio::test]
    async fn test_sink_reports_unwritable_root() {
        let dir = TempDir::new().unwrap();
        let occupied = dir.path().join("occupied");
        std::fs::write(&occupied, "not a directory").unwrap();

        let sink = JsonDirectorySink::new(&occupied, false);
        let err = sink
            .write(&StudyKey::new("brain"), &record("2.25.1"))
            .await
            .unwrap_err();
        assert!(matches!(err, DeidError::Sink(_)));
    }

    #[tokio::test]
    async fn test_sink_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let study = StudyKey::new("brain");

        let sink = JsonDirectorySink::new(dir.path(), false);
        sink.write(&study, &record("2.25.1")).await.unwrap();
        let err = sink.write(&study, &record("2.25.1")).await.unwrap_err();
        assert!(matches!(err, DeidError::OutputExists(path) if path.ends_with("2.25.1.json")));

        let sink = JsonDirectorySink::new(dir.path(), true);
        assert!(sink.write(&study, &record("2.25.1")).await.is_ok());
    }
}
