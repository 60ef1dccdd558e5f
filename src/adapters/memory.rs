//! In-memory source and sink

use crate::adapters::traits::{Incoming, RecordSink, RecordSource};
use crate::domain::{Record, Result, StudyKey};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Source over a fixed list of records
#[derive(Debug, Default)]
pub struct MemorySource {
    items: VecDeque<Incoming>,
}

impl MemorySource {
    /// Source yielding `records` in order, labelled `memory:<index>`
    pub fn new(records: impl IntoIterator<Item = Record>) -> Self {
        let items = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| Incoming::Record {
                origin: format!("memory:{index}"),
                record,
            })
            .collect();
        Self { items }
    }

    /// Appends an arbitrary item, including unparsable input
    pub fn push(&mut self, item: Incoming) {
        self.items.push_back(item);
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    async fn next_record(&mut self) -> Result<Option<Incoming>> {
        Ok(self.items.pop_front())
    }

    fn remaining(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

/// Sink collecting written records
///
/// Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    written: Arc<Mutex<Vec<(StudyKey, Record)>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far
    pub fn records(&self) -> Vec<(StudyKey, Record)> {
        self.written
            .lock()
            .map(|written| written.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.written.lock().map(|w| w.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn write(&self, study: &StudyKey, record: &Record) -> Result<PathBuf> {
        let mut written = self
            .written
            .lock()
            .map_err(|_| crate::domain::DeidError::Sink("memory sink poisoned".to_string()))?;
        written.push((study.clone(), record.clone()));
        Ok(PathBuf::from(study.as_path_component()).join(&record.instance_uid))
    }
}
