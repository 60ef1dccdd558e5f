//! Partial-precision temporal codec
//!
//! Parses and formats the three temporal grammars (`TM`, `DA`, `DT`). The exact
//! string length selects the grammar; there is no fuzzy parsing. Missing
//! components default to their minimum (month/day 1, time 00:00:00.000000).
//!
//! | VR | accepted lengths | canonical output |
//! |----|------------------|------------------|
//! | TM | 1-6, 8-13 | `HHMMSS.FFFFFF` |
//! | DA | 8 | `YYYYMMDD` |
//! | DT | 4,6,8,10,12,14,16-21 (no zone) / 9,11,13,15,17,19,21-26 (zone) | `YYYYMMDDHHMMSS.FFFFFF[&ZZXX]` |

use crate::domain::{FieldError, Vr, VrFamily};
use chrono::{Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};

/// A parsed temporal value at the precision of its VR family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalValue {
    Time(NaiveTime),
    Date(NaiveDate),
    DateTime {
        value: NaiveDateTime,
        offset: Option<FixedOffset>,
    },
}

impl TemporalValue {
    /// Canonical maximal-precision text for the value's family
    pub fn format(&self) -> String {
        match self {
            Self::Time(t) => t.format("%H%M%S%.6f").to_string(),
            Self::Date(d) => d.format("%Y%m%d").to_string(),
            Self::DateTime { value, offset } => {
                let mut out = value.format("%Y%m%d%H%M%S%.6f").to_string();
                if let Some(offset) = offset {
                    out.push_str(&format_offset(offset));
                }
                out
            }
        }
    }

    /// Shifts the value by a signed number of seconds
    ///
    /// Times wrap around midnight. Dates and date-times fail if the result leaves
    /// the four-digit year range.
    pub fn shifted(&self, seconds: i64) -> Option<Self> {
        let delta = Duration::try_seconds(seconds)?;
        match self {
            Self::Time(t) => Some(Self::Time(t.overflowing_add_signed(delta).0)),
            Self::Date(d) => {
                let shifted = d.and_time(NaiveTime::MIN).checked_add_signed(delta)?;
                in_year_range(shifted).then(|| Self::Date(shifted.date()))
            }
            Self::DateTime { value, offset } => {
                let shifted = value.checked_add_signed(delta)?;
                in_year_range(shifted).then_some(Self::DateTime {
                    value: shifted,
                    offset: *offset,
                })
            }
        }
    }

    /// Projects an instant onto the given temporal VR
    ///
    /// Used for the "now" literal and for regenerated temporal values, which
    /// carry no zone.
    pub fn from_instant(vr: Vr, instant: NaiveDateTime) -> Option<Self> {
        match vr.family() {
            VrFamily::Time => Some(Self::Time(instant.time())),
            VrFamily::Date => Some(Self::Date(instant.date())),
            VrFamily::DateTime => Some(Self::DateTime {
                value: instant,
                offset: None,
            }),
            _ => None,
        }
    }
}

fn in_year_range(value: NaiveDateTime) -> bool {
    use chrono::Datelike;
    (0..=9999).contains(&value.year())
}

fn format_offset(offset: &FixedOffset) -> String {
    let seconds = offset.local_minus_utc();
    let sign = if seconds < 0 { '-' } else { '+' };
    let minutes = seconds.abs() / 60;
    format!("{sign}{:02}{:02}", minutes / 60, minutes % 60)
}

/// Parses `text` according to the grammar of `vr`
///
/// Surrounding whitespace (DICOM padding) is ignored.
pub fn parse(vr: Vr, text: &str) -> Result<TemporalValue, FieldError> {
    let text = text.trim();
    let invalid = || FieldError::InvalidTemporalValue {
        vr,
        length: text.len(),
    };

    if !text.is_ascii() {
        return Err(invalid());
    }

    let parsed = match vr.family() {
        VrFamily::Time => parse_time(text).map(TemporalValue::Time),
        VrFamily::Date => parse_date(text).map(TemporalValue::Date),
        VrFamily::DateTime => {
            parse_datetime(text).map(|(value, offset)| TemporalValue::DateTime { value, offset })
        }
        _ => None,
    };
    parsed.ok_or_else(invalid)
}

/// Parses and re-emits `text` in canonical form
pub fn canonicalize(vr: Vr, text: &str) -> Result<String, FieldError> {
    parse(vr, text).map(|value| value.format())
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    let (hour, minute, second, micros) = match text.len() {
        1..=2 => (number(text)?, 0, 0, 0),
        3..=4 => (number(&text[..2])?, number(&text[2..])?, 0, 0),
        5..=6 => (
            number(&text[..2])?,
            number(&text[2..4])?,
            number(&text[4..])?,
            0,
        ),
        8..=13 => (
            number(&text[..2])?,
            number(&text[2..4])?,
            number(&text[4..6])?,
            fraction(&text[6..])?,
        ),
        _ => return None,
    };
    NaiveTime::from_hms_micro_opt(hour, minute, second, micros)
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    if text.len() != 8 {
        return None;
    }
    NaiveDate::from_ymd_opt(
        number::<i32>(&text[..4])?,
        number(&text[4..6])?,
        number(&text[6..8])?,
    )
}

fn parse_datetime(text: &str) -> Option<(NaiveDateTime, Option<FixedOffset>)> {
    let has_zone = text.contains('+') || text.contains('-');
    let (body, offset) = if has_zone {
        if !matches!(text.len(), 9 | 11 | 13 | 15 | 17 | 19 | 21..=26) {
            return None;
        }
        let (body, zone) = text.split_at(text.len() - 5);
        (body, Some(parse_offset(zone)?))
    } else {
        if !matches!(text.len(), 4 | 6 | 8 | 10 | 12 | 14 | 16..=21) {
            return None;
        }
        (text, None)
    };

    let component = |range: std::ops::Range<usize>, default: u32| -> Option<u32> {
        if body.len() >= range.end {
            number(&body[range])
        } else {
            Some(default)
        }
    };

    let year: i32 = number(body.get(..4)?)?;
    let month = component(4..6, 1)?;
    let day = component(6..8, 1)?;
    let hour = component(8..10, 0)?;
    let minute = component(10..12, 0)?;
    let second = component(12..14, 0)?;
    let micros = if body.len() > 14 {
        fraction(&body[14..])?
    } else {
        0
    };

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = NaiveTime::from_hms_micro_opt(hour, minute, second, micros)?;
    Some((date.and_time(time), offset))
}

fn parse_offset(zone: &str) -> Option<FixedOffset> {
    let sign = match zone.as_bytes().first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let hours: i32 = number(&zone[1..3])?;
    let minutes: i32 = number(&zone[3..5])?;
    if hours > 14 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// `.F` through `.FFFFFF`, scaled to microseconds
fn fraction(text: &str) -> Option<u32> {
    let digits = text.strip_prefix('.')?;
    if digits.is_empty() || digits.len() > 6 {
        return None;
    }
    let value: u32 = number(digits)?;
    Some(value * 10u32.pow(6 - digits.len() as u32))
}

fn number<T: std::str::FromStr>(text: &str) -> Option<T> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_offset_scenario() {
        let parsed = parse(Vr::TM, "153045").unwrap();
        let shifted = parsed.shifted(3600).unwrap();
        assert_eq!(shifted.format(), "163045.000000");
    }

    #[test]
    fn test_time_wraps_midnight() {
        let parsed = parse(Vr::TM, "2330").unwrap();
        assert_eq!(parsed.shifted(3600).unwrap().format(), "003000.000000");
    }

    #[test]
    fn test_time_rejects_length_seven() {
        assert!(parse(Vr::TM, "153045.").is_err());
        assert!(parse(Vr::TM, "").is_err());
        assert!(parse(Vr::TM, "15304512345678").is_err());
    }

    #[test]
    fn test_time_out_of_range_components() {
        assert!(parse(Vr::TM, "25").is_err());
        assert!(parse(Vr::TM, "1275").is_err());
    }

    #[test]
    fn test_date_exact_length() {
        assert_eq!(canonicalize(Vr::DA, "20200101").unwrap(), "20200101");
        assert!(parse(Vr::DA, "2020011").is_err());
        assert!(parse(Vr::DA, "2020-01-01").is_err());
        assert!(parse(Vr::DA, "20200230").is_err());
    }

    #[test]
    fn test_date_padding_trimmed() {
        assert_eq!(canonicalize(Vr::DA, "20200101 ").unwrap(), "20200101");
    }

    #[test]
    fn test_datetime_with_zone() {
        assert_eq!(
            canonicalize(Vr::DT, "20200101120000+0100").unwrap(),
            "20200101120000.000000+0100"
        );
        assert_eq!(
            canonicalize(Vr::DT, "2020-0500").unwrap(),
            "20200101000000.000000-0500"
        );
    }

    #[test]
    fn test_datetime_invalid_lengths() {
        assert!(parse(Vr::DT, "202001011200001").is_err());
        assert!(parse(Vr::DT, "20200+0100").is_err());
        assert!(parse(Vr::DT, "20200101+01").is_err());
    }

    #[test]
    fn test_date_shift_out_of_range() {
        let parsed = parse(Vr::DA, "00010101").unwrap();
        assert!(parsed.shifted(-1_576_800_000).is_none());
    }

    #[test]
    fn test_non_temporal_vr_rejected() {
        assert!(matches!(
            parse(Vr::PN, "20200101"),
            Err(FieldError::InvalidTemporalValue { vr: Vr::PN, .. })
        ));
    }

    #[test]
    fn test_from_instant() {
        let instant = NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_micro_opt(7, 8, 9, 10)
            .unwrap();
        assert_eq!(
            TemporalValue::from_instant(Vr::TM, instant).unwrap().format(),
            "070809.000010"
        );
        assert_eq!(
            TemporalValue::from_instant(Vr::DA, instant).unwrap().format(),
            "20240506"
        );
        assert_eq!(
            TemporalValue::from_instant(Vr::DT, instant).unwrap().format(),
            "20240506070809.000010"
        );
        assert!(TemporalValue::from_instant(Vr::UI, instant).is_none());
    }
}
