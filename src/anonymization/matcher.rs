//! Study/station matching
//!
//! Picks the policy for an incoming record: the station field selects a
//! [`StationProfile`], which says where to read the study key, which selects
//! the [`PolicyConfig`].

use crate::anonymization::policy::{PolicyConfig, PolicyTable, StationProfile, StationTable};
use crate::domain::{Record, RecordError, StudyKey, Tag, Value};
use std::borrow::Cow;
use std::sync::Arc;

/// Policy selected for one record
#[derive(Debug, Clone)]
pub struct MatchedPolicy {
    pub policy: Arc<PolicyConfig>,
    pub study: StudyKey,
}

/// Read-only matcher shared by all workers of a batch
#[derive(Debug, Clone)]
pub struct StudyMatcher {
    station_tag: Tag,
    stations: Arc<StationTable>,
    policies: Arc<PolicyTable>,
}

impl StudyMatcher {
    pub fn new(station_tag: Tag, stations: Arc<StationTable>, policies: Arc<PolicyTable>) -> Self {
        Self {
            station_tag,
            stations,
            policies,
        }
    }

    pub fn station_tag(&self) -> &Tag {
        &self.station_tag
    }

    pub fn policies(&self) -> &PolicyTable {
        &self.policies
    }

    /// Station profile for the record
    pub fn station_for(&self, record: &Record) -> Result<&StationProfile, RecordError> {
        let field = record.dataset.get(&self.station_tag).ok_or_else(|| {
            RecordError::MissingStationIdentifier {
                tag: self.station_tag.to_string(),
            }
        })?;
        let station = textual(&field.value, &self.station_tag)?;
        Ok(self.stations.lookup(&station))
    }

    /// Study key read per the station profile
    pub fn study_key(
        &self,
        record: &Record,
        profile: &StationProfile,
    ) -> Result<StudyKey, RecordError> {
        let tag = &profile.study_tag;
        let field = record
            .dataset
            .get(tag)
            .ok_or_else(|| RecordError::MissingStudyIdentifier {
                tag: tag.to_string(),
            })?;
        let raw = textual(&field.value, tag)?;

        let Some(delimiter) = profile.delimiter() else {
            return Ok(StudyKey::new(&raw));
        };
        let parts: Vec<&str> = raw.split(delimiter).collect();
        parts
            .get(profile.split_index)
            .map(|part| StudyKey::new(part))
            .ok_or_else(|| RecordError::MalformedStudyKey {
                tag: tag.to_string(),
                delimiter: delimiter.to_string(),
                index: profile.split_index,
                parts: parts.len(),
            })
    }

    /// Full match: station → study key → policy
    pub fn match_record(&self, record: &Record) -> Result<MatchedPolicy, RecordError> {
        let profile = self.station_for(record)?;
        let study = self.study_key(record, profile)?;
        let policy =
            self.policies
                .lookup(&study)
                .ok_or_else(|| RecordError::MissingStudyIdentifier {
                    tag: profile.study_tag.to_string(),
                })?;
        tracing::trace!(study = %study, policy = %policy.name, "Matched record to policy");
        Ok(MatchedPolicy { policy, study })
    }
}

fn textual<'a>(value: &'a Value, tag: &Tag) -> Result<Cow<'a, str>, RecordError> {
    match value {
        Value::Empty => Ok(Cow::Borrowed("")),
        Value::Text(text) => Ok(Cow::Borrowed(text.as_str())),
        Value::Binary(_) | Value::Sequence(_) => Err(RecordError::InvalidInputRecord {
            reason: format!("identifying field {tag} is not textual"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Dataset, Field, Seed, Vr};
    use std::collections::BTreeMap;

    fn tag(name: &str) -> Tag {
        Tag::new(name).unwrap()
    }

    fn matcher(default_policy: Option<&str>) -> StudyMatcher {
        let mut stations = BTreeMap::new();
        stations.insert(
            "default".to_string(),
            StationProfile::new(tag("StudyDescription")),
        );
        stations.insert(
            "MRC12345".to_string(),
            StationProfile::new(tag("StudyDescription")).with_split("^", 1),
        );
        let stations = StationTable::build(&stations).unwrap();

        let policies = PolicyTable::from_policies(
            [
                PolicyConfig::new("Supplement142", Seed::new("a")),
                PolicyConfig::new("Brain", Seed::new("b")),
            ],
            default_policy,
        );
        StudyMatcher::new(tag("StationName"), Arc::new(stations), Arc::new(policies))
    }

    fn record(fields: Vec<(&str, &str)>) -> Record {
        Record::new(
            "1.2.3",
            Dataset::from_fields(
                fields
                    .into_iter()
                    .map(|(t, v)| Field::new(tag(t), Vr::LO, Value::text(v))),
            ),
        )
    }

    #[test]
    fn test_default_station_direct_study() {
        let matched = matcher(None)
            .match_record(&record(vec![
                ("StationName", "CT01"),
                ("StudyDescription", "SUPPLEMENT142"),
            ]))
            .unwrap();
        assert_eq!(matched.study.as_str(), "supplement142");
        assert_eq!(matched.policy.name, "supplement142");
    }

    #[test]
    fn test_station_split() {
        let matched = matcher(None)
            .match_record(&record(vec![
                ("StationName", "mrc12345"),
                ("StudyDescription", "Research^Brain^v2"),
            ]))
            .unwrap();
        assert_eq!(matched.study.as_str(), "brain");
    }

    #[test]
    fn test_split_index_out_of_range() {
        let err = matcher(None)
            .match_record(&record(vec![
                ("StationName", "MRC12345"),
                ("StudyDescription", "Brain"),
            ]))
            .unwrap_err();
        assert!(matches!(
            err,
            RecordError::MalformedStudyKey {
                index: 1,
                parts: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_station_field() {
        let err = matcher(None)
            .match_record(&record(vec![("StudyDescription", "Brain")]))
            .unwrap_err();
        assert!(matches!(err, RecordError::MissingStationIdentifier { .. }));
    }

    #[test]
    fn test_missing_study_field() {
        let err = matcher(None)
            .match_record(&record(vec![("StationName", "CT01")]))
            .unwrap_err();
        assert!(matches!(err, RecordError::MissingStudyIdentifier { .. }));
    }

    #[test]
    fn test_unknown_study_falls_back_to_default_policy() {
        let fields = vec![("StationName", "CT01"), ("StudyDescription", "Liver")];
        assert!(matches!(
            matcher(None).match_record(&record(fields.clone())),
            Err(RecordError::MissingStudyIdentifier { .. })
        ));

        let matched = matcher(Some("Brain")).match_record(&record(fields)).unwrap();
        assert_eq!(matched.study.as_str(), "liver");
        assert_eq!(matched.policy.name, "brain");
    }

    #[test]
    fn test_binary_station_value_is_invalid() {
        let record = Record::new(
            "1.2.3",
            Dataset::from_fields([Field::new(
                tag("StationName"),
                Vr::OB,
                Value::Binary(vec![1]),
            )]),
        );
        assert!(matches!(
            matcher(None).match_record(&record),
            Err(RecordError::InvalidInputRecord { .. })
        ));
    }
}
