//! Value representations
//!
//! A VR decides the textual grammar of a field's value. The engine only needs
//! to know which family a VR belongs to; the two-letter codes are kept so that
//! policies can address them directly (`AnonymizeVR`).

use crate::domain::record::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// DICOM value representation code
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Vr {
    AE,
    AS,
    AT,
    CS,
    DA,
    DS,
    DT,
    FD,
    FL,
    IS,
    LO,
    LT,
    OB,
    OD,
    OF,
    OL,
    OV,
    OW,
    PN,
    SH,
    SL,
    SQ,
    SS,
    ST,
    SV,
    TM,
    UC,
    UI,
    UL,
    UN,
    UR,
    US,
    UT,
    UV,
}

/// Grammar family of a VR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VrFamily {
    /// `TM`
    Time,
    /// `DA`
    Date,
    /// `DT`
    DateTime,
    /// `UI`
    Identifier,
    /// Character strings and person names
    Text,
    /// Decimal, integer and binary numbers
    Numeric,
    /// Opaque byte payloads
    Binary,
    /// `SQ`
    Sequence,
}

impl VrFamily {
    /// Whether the family is one of the three partial-precision temporal grammars
    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::Time | Self::Date | Self::DateTime)
    }
}

const ALL: [Vr; 34] = [
    Vr::AE,
    Vr::AS,
    Vr::AT,
    Vr::CS,
    Vr::DA,
    Vr::DS,
    Vr::DT,
    Vr::FD,
    Vr::FL,
    Vr::IS,
    Vr::LO,
    Vr::LT,
    Vr::OB,
    Vr::OD,
    Vr::OF,
    Vr::OL,
    Vr::OV,
    Vr::OW,
    Vr::PN,
    Vr::SH,
    Vr::SL,
    Vr::SQ,
    Vr::SS,
    Vr::ST,
    Vr::SV,
    Vr::TM,
    Vr::UC,
    Vr::UI,
    Vr::UL,
    Vr::UN,
    Vr::UR,
    Vr::US,
    Vr::UT,
    Vr::UV,
];

impl Vr {
    /// Two-letter code
    pub fn code(&self) -> &'static str {
        match self {
            Self::AE => "AE",
            Self::AS => "AS",
            Self::AT => "AT",
            Self::CS => "CS",
            Self::DA => "DA",
            Self::DS => "DS",
            Self::DT => "DT",
            Self::FD => "FD",
            Self::FL => "FL",
            Self::IS => "IS",
            Self::LO => "LO",
            Self::LT => "LT",
            Self::OB => "OB",
            Self::OD => "OD",
            Self::OF => "OF",
            Self::OL => "OL",
            Self::OV => "OV",
            Self::OW => "OW",
            Self::PN => "PN",
            Self::SH => "SH",
            Self::SL => "SL",
            Self::SQ => "SQ",
            Self::SS => "SS",
            Self::ST => "ST",
            Self::SV => "SV",
            Self::TM => "TM",
            Self::UC => "UC",
            Self::UI => "UI",
            Self::UL => "UL",
            Self::UN => "UN",
            Self::UR => "UR",
            Self::US => "US",
            Self::UT => "UT",
            Self::UV => "UV",
        }
    }

    /// Grammar family of this VR
    pub fn family(&self) -> VrFamily {
        match self {
            Self::TM => VrFamily::Time,
            Self::DA => VrFamily::Date,
            Self::DT => VrFamily::DateTime,
            Self::UI => VrFamily::Identifier,
            Self::SQ => VrFamily::Sequence,
            Self::DS
            | Self::IS
            | Self::FD
            | Self::FL
            | Self::SL
            | Self::SS
            | Self::SV
            | Self::UL
            | Self::US
            | Self::UV => VrFamily::Numeric,
            Self::OB | Self::OD | Self::OF | Self::OL | Self::OV | Self::OW | Self::UN => {
                VrFamily::Binary
            }
            Self::AE
            | Self::AS
            | Self::AT
            | Self::CS
            | Self::LO
            | Self::LT
            | Self::PN
            | Self::SH
            | Self::ST
            | Self::UC
            | Self::UR
            | Self::UT => VrFamily::Text,
        }
    }

    /// Empty representation used by the `clear` action
    pub fn empty_value(&self) -> Value {
        match self {
            Self::SQ => Value::Sequence(Vec::new()),
            _ => Value::Empty,
        }
    }
}

impl fmt::Display for Vr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Vr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        ALL.iter()
            .copied()
            .find(|vr| vr.code() == code)
            .ok_or_else(|| format!("Unknown value representation: {s}"))
    }
}
