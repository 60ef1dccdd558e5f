//! Transform executor
//!
//! [`AnonymizationEngine`] applies a matched policy to one record at a time.
//! Every record moves through the same fixed sequence of states:
//!
//! ```text
//! Start -> PrivateStripped -> LiteralsApplied -> FieldsWalked -> IdentifierRegenerated -> Done
//! ```
//!
//! Field-local failures are recorded as diagnostics and the walk moves on to
//! the next field. Only a derivation failure (a derived identifier violating
//! the identifier grammar) escapes as an error, and it is fatal to the batch.
//!
//! # Examples
//!
//! ```
//! use deident::anonymization::{AnonymizationEngine, ActionSpec, PolicyConfig};
//! use deident::anonymization::matcher::MatchedPolicy;
//! use deident::domain::{Dataset, Field, Record, Seed, StudyKey, Tag, Value, Vr};
//! use std::sync::Arc;
//!
//! let policy = PolicyConfig::new("study", Seed::new("seed"))
//!     .with_tag_rule(Tag::new("StudyTime").unwrap(), ActionSpec::Offset { delta: Some(3600), seed: None });
//! let matched = MatchedPolicy { policy: Arc::new(policy), study: StudyKey::new("study") };
//!
//! let record = Record::new(
//!     "1.2.840.1",
//!     Dataset::from_fields([Field::new(Tag::new("StudyTime").unwrap(), Vr::TM, Value::text("153045"))]),
//! );
//!
//! let engine = AnonymizationEngine::with_defaults(chrono::Utc::now().naive_utc());
//! let processed = engine.anonymize_record(record, &matched).unwrap();
//! let field = processed.record.dataset.get(&Tag::new("StudyTime").unwrap()).unwrap();
//! assert_eq!(field.value, Value::text("163045.000000"));
//! ```

use crate::anonymization::derive::{derive_identifier_with_root, derive_offset_seconds, hash_value};
use crate::anonymization::dictionary::TagDictionary;
use crate::anonymization::matcher::{MatchedPolicy, StudyMatcher};
use crate::anonymization::models::{
    ActionKind, FieldDiagnostic, FieldOutcome, ProcessedRecord, RecordOutcome, RecordReport,
};
use crate::anonymization::policy::{ActionSpec, LiteralValue, PolicyConfig};
use crate::anonymization::resolver::{resolve_field, RuleSource};
use crate::anonymization::temporal::{self, TemporalValue};
use crate::domain::{
    Dataset, Field, FieldError, FieldPath, Record, RecordError, Result, Seed, Tag, UidRoot, Value,
    Vr,
};
use chrono::NaiveDateTime;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Per-record executor state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    Start,
    PrivateStripped,
    LiteralsApplied,
    FieldsWalked,
    IdentifierRegenerated,
    Done,
}

impl ExecutorState {
    /// The only state reachable from `self`
    pub fn next(self) -> Self {
        match self {
            Self::Start => Self::PrivateStripped,
            Self::PrivateStripped => Self::LiteralsApplied,
            Self::LiteralsApplied => Self::FieldsWalked,
            Self::FieldsWalked => Self::IdentifierRegenerated,
            Self::IdentifierRegenerated | Self::Done => Self::Done,
        }
    }
}

/// Applies policies to records
///
/// The engine holds only read-only batch state (tag dictionary, identifier
/// root, the batch "now" instant) and can be shared across workers.
#[derive(Debug, Clone)]
pub struct AnonymizationEngine {
    dictionary: Arc<TagDictionary>,
    uid_root: UidRoot,
    now: NaiveDateTime,
}

impl AnonymizationEngine {
    pub fn new(dictionary: Arc<TagDictionary>, uid_root: UidRoot, now: NaiveDateTime) -> Self {
        Self {
            dictionary,
            uid_root,
            now,
        }
    }

    /// Engine with the built-in dictionary and the default identifier root
    pub fn with_defaults(now: NaiveDateTime) -> Self {
        Self::new(
            Arc::new(TagDictionary::builtin()),
            UidRoot::default(),
            now,
        )
    }

    /// The batch "now" instant
    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    pub fn uid_root(&self) -> &UidRoot {
        &self.uid_root
    }

    pub fn dictionary(&self) -> &TagDictionary {
        &self.dictionary
    }

    /// Validates, matches and anonymizes one record
    ///
    /// Record-level problems come back as [`RecordOutcome::Skipped`].
    ///
    /// # Errors
    ///
    /// Only batch-fatal derivation failures.
    pub fn process(
        &self,
        record: Record,
        matcher: &StudyMatcher,
        origin: &str,
    ) -> Result<RecordOutcome> {
        let skip = |reason: RecordError| {
            crate::log_record_skipped!(origin, &reason);
            Ok(RecordOutcome::Skipped {
                origin: origin.to_string(),
                reason,
            })
        };

        if let Err(reason) = record.validate() {
            return skip(RecordError::InvalidInputRecord { reason });
        }
        let matched = match matcher.match_record(&record) {
            Ok(matched) => matched,
            Err(reason) => return skip(reason),
        };

        let processed = self.anonymize_record(record, &matched)?;
        Ok(RecordOutcome::Processed(Box::new(processed)))
    }

    /// Runs the executor state machine over one record
    pub fn anonymize_record(&self, record: Record, matched: &MatchedPolicy) -> Result<ProcessedRecord> {
        let mut execution = Execution::new(self, &matched.policy, record);
        execution.run()?;
        Ok(execution.finish(matched))
    }

    /// Applies `action` to the field `tag` of `parent`
    fn apply(
        &self,
        parent: &mut Dataset,
        tag: &Tag,
        action: &ActionSpec,
        policy: &PolicyConfig,
    ) -> Result<FieldOutcome> {
        match action {
            ActionSpec::Keep => return Ok(FieldOutcome::Unchanged),
            ActionSpec::Delete => {
                return Ok(match parent.remove(tag) {
                    Some(_) => FieldOutcome::Applied,
                    None => skipped(FieldError::AlreadyDeletedParent),
                })
            }
            _ => {}
        }

        let Some(field) = parent.get_mut(tag) else {
            return Ok(skipped(FieldError::AlreadyDeletedParent));
        };
        match self.replacement(field, action, policy)? {
            Err(error) => Ok(skipped(error)),
            Ok(value) if value == field.value => Ok(FieldOutcome::Unchanged),
            Ok(value) => {
                field.value = value;
                Ok(FieldOutcome::Applied)
            }
        }
    }

    /// New value for `field` under `action`
    ///
    /// The outer `Result` is batch-fatal; the inner one is field-local.
    fn replacement(
        &self,
        field: &Field,
        action: &ActionSpec,
        policy: &PolicyConfig,
    ) -> Result<std::result::Result<Value, FieldError>> {
        let value = match action {
            ActionSpec::Keep | ActionSpec::Delete => Ok(field.value.clone()),
            ActionSpec::Clear => Ok(field.vr.empty_value()),
            ActionSpec::Hash { salt } => {
                let salt = salt.as_ref().unwrap_or(&policy.default_seed);
                field
                    .value
                    .textual()
                    .map(|text| Value::Text(hash_value(&text, salt)))
                    .ok_or_else(|| unsupported(action, field.vr))
            }
            ActionSpec::Literal { value } => literal_value(field.vr, value, self.now),
            ActionSpec::Offset { delta, seed } => {
                let seed = seed.as_ref().unwrap_or(&policy.default_seed);
                offset(field, *delta, seed, action)
            }
            ActionSpec::Regenerate { seed } => {
                let seed = seed.as_ref().unwrap_or(&policy.default_seed);
                return self.regenerate(field, seed, action);
            }
        };
        Ok(value)
    }

    fn regenerate(
        &self,
        field: &Field,
        seed: &Seed,
        action: &ActionSpec,
    ) -> Result<std::result::Result<Value, FieldError>> {
        let text = match &field.value {
            Value::Sequence(_) | Value::Binary(_) => return Ok(Err(unsupported(action, field.vr))),
            Value::Empty => return Ok(Ok(Value::Empty)),
            Value::Text(text) if text.trim().is_empty() => return Ok(Ok(field.value.clone())),
            Value::Text(text) => text.trim(),
        };

        if field.vr.family().is_temporal() {
            // Independent of the original value: batch "now" shifted by the seed alone.
            let regenerated = TemporalValue::from_instant(field.vr, self.now)
                .and_then(|now| now.shifted(derive_offset_seconds(seed.expose())))
                .map(|value| Value::Text(value.format()))
                .ok_or(FieldError::InvalidTemporalValue {
                    vr: field.vr,
                    length: text.len(),
                });
            return Ok(regenerated);
        }

        let derived = derive_identifier_with_root(&self.uid_root, text, seed)?;
        Ok(Ok(Value::Text(derived)))
    }
}

fn skipped(error: FieldError) -> FieldOutcome {
    FieldOutcome::Skipped { error }
}

fn unsupported(action: &ActionSpec, vr: Vr) -> FieldError {
    FieldError::UnsupportedActionForVr {
        action: action.name().to_string(),
        vr,
    }
}

fn literal_value(
    vr: Vr,
    literal: &LiteralValue,
    now: NaiveDateTime,
) -> std::result::Result<Value, FieldError> {
    let unsupported = || FieldError::UnsupportedActionForVr {
        action: "value".to_string(),
        vr,
    };
    match literal {
        LiteralValue::Empty => Ok(vr.empty_value()),
        LiteralValue::Text(_) if vr == Vr::SQ => Err(unsupported()),
        LiteralValue::Text(text) => Ok(Value::Text(text.clone())),
        LiteralValue::Now => TemporalValue::from_instant(vr, now)
            .map(|value| Value::Text(value.format()))
            .ok_or_else(unsupported),
    }
}

fn offset(
    field: &Field,
    delta: Option<i64>,
    seed: &Seed,
    action: &ActionSpec,
) -> std::result::Result<Value, FieldError> {
    let vr = field.vr;
    if !vr.family().is_temporal() {
        return Err(unsupported(action, vr));
    }
    let text = match &field.value {
        Value::Empty => return Ok(Value::Empty),
        Value::Text(text) if text.trim().is_empty() => return Ok(field.value.clone()),
        Value::Text(text) => text.trim(),
        Value::Binary(_) | Value::Sequence(_) => return Err(unsupported(action, vr)),
    };

    let parsed = temporal::parse(vr, text)?;
    let delta =
        delta.unwrap_or_else(|| derive_offset_seconds(&format!("{}{}", seed.expose(), text)));
    parsed
        .shifted(delta)
        .map(|value| Value::Text(value.format()))
        .ok_or(FieldError::InvalidTemporalValue {
            vr,
            length: text.len(),
        })
}

fn strip_private(dataset: &mut Dataset, preserved: &BTreeSet<Tag>) -> usize {
    let before = dataset.len();
    dataset.retain(|field| !field.private || preserved.contains(&field.tag));
    let mut removed = before - dataset.len();
    for field in dataset.iter_mut() {
        if let Value::Sequence(items) = &mut field.value {
            for item in items.iter_mut() {
                removed += strip_private(item, preserved);
            }
        }
    }
    removed
}

/// One pass of the state machine over one record
struct Execution<'a> {
    engine: &'a AnonymizationEngine,
    policy: &'a PolicyConfig,
    record: Record,
    original_uid: String,
    state: ExecutorState,
    diagnostics: Vec<FieldDiagnostic>,
    private_removed: usize,
}

impl<'a> Execution<'a> {
    fn new(engine: &'a AnonymizationEngine, policy: &'a PolicyConfig, record: Record) -> Self {
        Self {
            engine,
            policy,
            original_uid: record.instance_uid.clone(),
            record,
            state: ExecutorState::Start,
            diagnostics: Vec::new(),
            private_removed: 0,
        }
    }

    fn run(&mut self) -> Result<()> {
        while self.state != ExecutorState::Done {
            match self.state {
                ExecutorState::Start => self.strip_private(),
                ExecutorState::PrivateStripped => self.apply_literals(),
                ExecutorState::LiteralsApplied => self.walk_fields()?,
                ExecutorState::FieldsWalked => self.regenerate_instance_uid()?,
                ExecutorState::IdentifierRegenerated | ExecutorState::Done => {}
            }
            let next = self.state.next();
            tracing::trace!(from = ?self.state, to = ?next, "Executor transition");
            self.state = next;
        }
        Ok(())
    }

    fn strip_private(&mut self) {
        if self.policy.strip_private {
            self.private_removed =
                strip_private(&mut self.record.dataset, &self.policy.preserved_private_tags);
        }
    }

    fn apply_literals(&mut self) {
        let policy = self.policy;
        let engine = self.engine;

        for (tag, action) in &policy.tag_rules {
            let ActionSpec::Literal { value } = action else {
                continue;
            };
            let existing = self.record.dataset.get(tag);
            let vr = existing
                .map(|field| field.vr)
                .or_else(|| engine.dictionary.lookup(tag))
                .unwrap_or(Vr::UN);
            let private = existing.is_some_and(|field| field.private);

            let outcome = match literal_value(vr, value, engine.now) {
                Ok(value) => {
                    self.record.dataset.upsert(Field {
                        tag: tag.clone(),
                        vr,
                        value,
                        private,
                    });
                    FieldOutcome::Applied
                }
                Err(error) => skipped(error),
            };
            self.note(&FieldPath::top_level(tag.clone()), ActionKind::Literal, outcome, false);
        }
    }

    fn walk_fields(&mut self) -> Result<()> {
        let policy = self.policy;
        let engine = self.engine;

        let targets: Vec<(FieldPath, Vr)> = self
            .record
            .dataset
            .field_paths()
            .into_iter()
            .filter_map(|path| {
                let vr = self.record.dataset.locate(&path)?.vr;
                Some((path, vr))
            })
            .collect();

        for (path, vr) in targets {
            let resolution = resolve_field(&path.tag, vr, policy, &engine.dictionary);
            let kind = ActionKind::from(resolution.action);

            // Top-level literals were written in the previous state.
            if !path.is_nested()
                && resolution.source == RuleSource::TagRule
                && kind == ActionKind::Literal
            {
                continue;
            }

            let outcome = match self.record.dataset.parent_mut(&path) {
                Some(parent) => engine.apply(parent, &path.tag, resolution.action, policy)?,
                None => skipped(FieldError::AlreadyDeletedParent),
            };
            self.note(&path, kind, outcome, resolution.unrecognized);
        }
        Ok(())
    }

    fn regenerate_instance_uid(&mut self) -> Result<()> {
        let derived = derive_identifier_with_root(
            &self.engine.uid_root,
            self.original_uid.trim(),
            &self.policy.default_seed,
        )?;
        self.record.instance_uid = derived;
        Ok(())
    }

    fn note(&mut self, path: &FieldPath, kind: ActionKind, outcome: FieldOutcome, unrecognized: bool) {
        if let Some(error) = outcome.error() {
            crate::log_field_issue!(path, kind, error);
        }
        if unrecognized {
            crate::log_field_issue!(path, kind, &FieldError::UnrecognizedTag);
        }
        let mut diagnostic = FieldDiagnostic::new(path, kind, outcome);
        diagnostic.unrecognized = unrecognized;
        self.diagnostics.push(diagnostic);
    }

    fn finish(self, matched: &MatchedPolicy) -> ProcessedRecord {
        let report = RecordReport {
            original_instance_uid: self.original_uid,
            instance_uid: self.record.instance_uid.clone(),
            study: matched.study.to_string(),
            policy: self.policy.name.clone(),
            private_removed: self.private_removed,
            diagnostics: self.diagnostics,
        };
        ProcessedRecord {
            record: self.record,
            study: matched.study.clone(),
            report,
        }
    }
}
