//! Tag dictionary
//!
//! Maps known tags to their expected VR. Tags missing from the dictionary are
//! "unrecognized": they are kept unless a tag rule names them explicitly.

use crate::domain::{Tag, Vr};
use std::collections::HashMap;
use std::str::FromStr;

/// Keywords and VRs of the attributes that matter for de-identification
const BUILTIN: &[(&str, Vr)] = &[
    ("AccessionNumber", Vr::SH),
    ("AcquisitionDate", Vr::DA),
    ("AcquisitionDateTime", Vr::DT),
    ("AcquisitionTime", Vr::TM),
    ("AdmittingDiagnosesDescription", Vr::LO),
    ("BodyPartExamined", Vr::CS),
    ("ContentDate", Vr::DA),
    ("ContentTime", Vr::TM),
    ("DeviceSerialNumber", Vr::LO),
    ("EthnicGroup", Vr::SH),
    ("FrameOfReferenceUID", Vr::UI),
    ("ImageComments", Vr::LT),
    ("ImageType", Vr::CS),
    ("InstanceCreationDate", Vr::DA),
    ("InstanceCreationTime", Vr::TM),
    ("InstanceNumber", Vr::IS),
    ("InstitutionAddress", Vr::ST),
    ("InstitutionName", Vr::LO),
    ("InstitutionalDepartmentName", Vr::LO),
    ("Manufacturer", Vr::LO),
    ("ManufacturerModelName", Vr::LO),
    ("MediaStorageSOPInstanceUID", Vr::UI),
    ("Modality", Vr::CS),
    ("OperatorsName", Vr::PN),
    ("OtherPatientIDs", Vr::LO),
    ("OtherPatientNames", Vr::PN),
    ("PatientAddress", Vr::LO),
    ("PatientAge", Vr::AS),
    ("PatientBirthDate", Vr::DA),
    ("PatientBirthTime", Vr::TM),
    ("PatientComments", Vr::LT),
    ("PatientID", Vr::LO),
    ("PatientName", Vr::PN),
    ("PatientSex", Vr::CS),
    ("PatientSize", Vr::DS),
    ("PatientTelephoneNumbers", Vr::SH),
    ("PatientWeight", Vr::DS),
    ("PerformedProcedureStepDescription", Vr::LO),
    ("PerformedProcedureStepID", Vr::SH),
    ("PerformedProcedureStepStartDate", Vr::DA),
    ("PerformedProcedureStepStartTime", Vr::TM),
    ("PerformingPhysicianName", Vr::PN),
    ("PhysiciansOfRecord", Vr::PN),
    ("PixelData", Vr::OW),
    ("ProtocolName", Vr::LO),
    ("ReferencedImageSequence", Vr::SQ),
    ("ReferencedPerformedProcedureStepSequence", Vr::SQ),
    ("ReferencedSOPInstanceUID", Vr::UI),
    ("ReferencedSeriesSequence", Vr::SQ),
    ("ReferencedStudySequence", Vr::SQ),
    ("ReferringPhysicianName", Vr::PN),
    ("RequestAttributesSequence", Vr::SQ),
    ("RequestedProcedureDescription", Vr::LO),
    ("RequestedProcedureID", Vr::SH),
    ("SOPClassUID", Vr::UI),
    ("SOPInstanceUID", Vr::UI),
    ("SeriesDate", Vr::DA),
    ("SeriesDescription", Vr::LO),
    ("SeriesInstanceUID", Vr::UI),
    ("SeriesNumber", Vr::IS),
    ("SeriesTime", Vr::TM),
    ("SoftwareVersions", Vr::LO),
    ("StationName", Vr::SH),
    ("StudyDate", Vr::DA),
    ("StudyDescription", Vr::LO),
    ("StudyID", Vr::SH),
    ("StudyInstanceUID", Vr::UI),
    ("StudyTime", Vr::TM),
];

/// Tag → VR lookup
#[derive(Debug, Clone)]
pub struct TagDictionary {
    entries: HashMap<Tag, Vr>,
}

impl TagDictionary {
    /// Dictionary with no entries; every tag is unrecognized
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Built-in dictionary
    pub fn builtin() -> Self {
        let entries = BUILTIN
            .iter()
            .filter_map(|(keyword, vr)| Tag::new(*keyword).ok().map(|tag| (tag, *vr)))
            .collect();
        Self { entries }
    }

    /// Adds or replaces an entry
    pub fn insert(&mut self, tag: Tag, vr: Vr) {
        self.entries.insert(tag, vr);
    }

    /// Merges `Tag = "VR"` entries from configuration
    pub fn extend_from_config<'a>(
        &mut self,
        extra: impl IntoIterator<Item = (&'a String, &'a String)>,
    ) -> Result<(), String> {
        for (tag, vr) in extra {
            let tag = Tag::new(tag.as_str())?;
            let vr = Vr::from_str(vr).map_err(|e| format!("dictionary entry {tag}: {e}"))?;
            self.entries.insert(tag, vr);
        }
        Ok(())
    }

    pub fn lookup(&self, tag: &Tag) -> Option<Vr> {
        self.entries.get(tag).copied()
    }

    pub fn contains(&self, tag: &Tag) -> bool {
        self.entries.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TagDictionary {
    fn default() -> Self {
        Self::builtin()
    }
}
