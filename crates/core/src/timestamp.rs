//! Date and timestamp codec.
//!
//! Timestamps are always written as `YYYY-MM-DD HH:MM:SS` (UTC, no
//! sub-second part, no zone suffix). Reading is permissive and accepts every
//! format older files were written in.

use crate::error::{Result, ValidationError};
use crate::Time;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Canonical on-disk timestamp layout.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Canonical on-disk date layout.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Canonical time-of-day layout.
pub const TIME_OF_DAY_FORMAT: &str = "%H:%M";

static DATE_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date regex"));

const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];
const BARE_TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M"];
const ISO_NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.fZ", "%Y-%m-%dT%H:%M:%S%.f"];
const ISO_OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%.f%z"];

/// Parse a strict `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    if !DATE_SHAPE.is_match(s) {
        return Err(ValidationError::format(format!(
            "invalid date format '{}': expected YYYY-MM-DD",
            s
        )));
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| {
        ValidationError::format(format!("invalid date '{}': {}", s, e))
    })
}

/// Validate an optional date field, naming the field in the error.
pub(crate) fn validate_optional_date(field: &str, value: Option<&str>) -> Result<()> {
    match value {
        Some(s) if !s.is_empty() => parse_date(s)
            .map(|_| ())
            .map_err(|e| e.context(format!("invalid {}", field))),
        _ => Ok(()),
    }
}

/// Render a timestamp in the canonical form.
pub fn format_timestamp(time: &Time) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp written in any supported historical format.
///
/// Formats are tried in a fixed order and the first one that parses wins:
/// human readable date-times, bare times of day (placed on year zero),
/// RFC 3339, ISO-8601 variants and finally a Unix epoch in seconds.
pub fn parse_timestamp(s: &str) -> Result<Time> {
    let s = s.trim();

    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    for fmt in BARE_TIME_FORMATS {
        if let Ok(time) = NaiveTime::parse_from_str(s, fmt) {
            return Ok(on_zero_year(time));
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in ISO_OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    for fmt in ISO_NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(secs) = s.parse::<i64>() {
        return epoch_to_time(secs);
    }

    Err(ValidationError::format(format!("unable to parse timestamp '{}'", s)))
}

/// Convert Unix epoch seconds into a timestamp.
pub fn epoch_to_time(secs: i64) -> Result<Time> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| ValidationError::format(format!("epoch seconds out of range: {}", secs)))
}

/// Parse a time of day.
///
/// Accepts bare `HH:MM` / `HH:MM:SS` and full timestamps on the zero-year
/// sentinel, which is how older files stored a time without a date.
pub fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    for fmt in BARE_TIME_FORMATS {
        if let Ok(time) = NaiveTime::parse_from_str(s, fmt) {
            return Some(time);
        }
    }
    match parse_timestamp(s) {
        Ok(ts) if is_zero_year(&ts) => Some(ts.time()),
        _ => None,
    }
}

/// Render a time of day as `HH:MM`.
pub fn format_time_of_day(time: &NaiveTime) -> String {
    time.format(TIME_OF_DAY_FORMAT).to_string()
}

fn on_zero_year(time: NaiveTime) -> Time {
    // Year zero is always representable in chrono's proleptic calendar.
    let date = NaiveDate::from_ymd_opt(0, 1, 1).unwrap_or(NaiveDate::MIN);
    Utc.from_utc_datetime(&date.and_time(time))
}

fn is_zero_year(time: &Time) -> bool {
    use chrono::Datelike;
    time.year() == 0
}

/// Timestamp as it appears in YAML: text, or a bare epoch integer.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Epoch(i64),
    Text(String),
}

impl RawTimestamp {
    fn into_time(self) -> Result<Time> {
        match self {
            RawTimestamp::Epoch(secs) => epoch_to_time(secs),
            RawTimestamp::Text(s) => parse_timestamp(&s),
        }
    }
}

/// Serde adapter writing required timestamps in canonical form.
///
/// Required timestamps are read through the optional adapter so a missing
/// value can be defaulted by the owning record.
pub mod canonical {
    use super::*;
    use serde::Serializer;

    /// Serialize as `YYYY-MM-DD HH:MM:SS`.
    pub fn serialize<S: Serializer>(
        time: &Time,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_timestamp(time))
    }
}

/// Serde adapter for optional timestamps in canonical form.
pub mod canonical_option {
    use super::*;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as `YYYY-MM-DD HH:MM:SS` when present.
    pub fn serialize<S: Serializer>(
        time: &Option<Time>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        match time {
            Some(t) => serializer.serialize_str(&format_timestamp(t)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize from any supported format; null stays `None`.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Option<Time>, D::Error> {
        Option::<RawTimestamp>::deserialize(deserializer)?
            .map(RawTimestamp::into_time)
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn ymd_hms(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> Time {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_format_timestamp() {
        let t = ymd_hms(2025, 7, 15, 9, 11, 27);
        assert_eq!(format_timestamp(&t), "2025-07-15 09:11:27");
    }

    #[test]
    fn test_parse_human_readable() {
        assert_eq!(
            parse_timestamp("2025-07-15 09:11:27").unwrap(),
            ymd_hms(2025, 7, 15, 9, 11, 27)
        );
        assert_eq!(
            parse_timestamp("2025-07-15 09:11").unwrap(),
            ymd_hms(2025, 7, 15, 9, 11, 0)
        );
    }

    #[test]
    fn test_parse_bare_time_lands_on_zero_year() {
        let t = parse_timestamp("08:30").unwrap();
        assert_eq!(t.year(), 0);
        assert_eq!((t.hour(), t.minute()), (8, 30));

        let t = parse_timestamp("23:59:58").unwrap();
        assert_eq!((t.hour(), t.minute(), t.second()), (23, 59, 58));
    }

    #[test]
    fn test_parse_rfc3339_and_iso_variants() {
        let expected = ymd_hms(2025, 7, 15, 9, 11, 27);
        assert_eq!(parse_timestamp("2025-07-15T09:11:27Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2025-07-15T11:11:27+02:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2025-07-15T09:11:27").unwrap(), expected);

        let nanos = parse_timestamp("2025-07-15T09:11:27.123456789Z").unwrap();
        assert_eq!(nanos.nanosecond(), 123_456_789);

        let frac = parse_timestamp("2025-07-15T09:11:27.5").unwrap();
        assert_eq!(frac.timestamp(), expected.timestamp());
    }

    #[test]
    fn test_parse_epoch() {
        assert_eq!(
            parse_timestamp("1752570687").unwrap(),
            ymd_hms(2025, 7, 15, 9, 11, 27)
        );
    }

    #[test]
    fn test_parse_exhaustion_is_error() {
        let err = parse_timestamp("next tuesday").unwrap_err();
        assert!(err.to_string().contains("unable to parse timestamp"));
    }

    #[test]
    fn test_parse_date_strict() {
        assert!(parse_date("2024-01-31").is_ok());
        assert!(parse_date("2024-02-30").is_err());
        assert!(parse_date("2024-1-5").is_err());
        assert!(parse_date("01/05/2024").is_err());
        assert!(parse_date("").is_err());
    }

    #[test]
    fn test_parse_time_of_day() {
        let t = parse_time_of_day("08:30").unwrap();
        assert_eq!((t.hour(), t.minute()), (8, 30));
        let t = parse_time_of_day("0000-01-01T08:30:00Z").unwrap();
        assert_eq!((t.hour(), t.minute()), (8, 30));
        assert!(parse_time_of_day("2025-07-15T08:30:00Z").is_none());
        assert!(parse_time_of_day("ratio 1:2").is_none());
    }

    #[derive(serde::Serialize)]
    struct Stamped {
        #[serde(serialize_with = "canonical::serialize")]
        at: Time,
        #[serde(with = "canonical_option")]
        seen: Option<Time>,
    }

    #[derive(serde::Deserialize)]
    struct Seen {
        #[serde(default, with = "canonical_option")]
        seen: Option<Time>,
    }

    fn read_seen(yaml: &str) -> std::result::Result<Option<Time>, serde_yaml::Error> {
        serde_yaml::from_str::<Seen>(yaml).map(|s| s.seen)
    }

    #[test]
    fn test_serde_adapters_read_text_and_epoch() {
        let at = ymd_hms(2025, 7, 15, 9, 11, 27);
        let out = serde_yaml::to_string(&Stamped { at, seen: Some(at) }).unwrap();
        assert!(out.contains("at: 2025-07-15 09:11:27"), "{out}");
        assert!(out.contains("seen: 2025-07-15 09:11:27"), "{out}");

        assert_eq!(read_seen("seen: 2025-07-15T09:11:27Z\n").unwrap(), Some(at));
        assert_eq!(read_seen("seen: 1752570687\n").unwrap(), Some(at));
        assert_eq!(read_seen("seen: null\n").unwrap(), None);
        assert_eq!(read_seen("{}\n").unwrap(), None);
        assert!(read_seen("seen: soon\n").is_err());
    }
}
