//! Polymorphic entry values.
//!
//! An entry's `value` is one of five scalar kinds. In memory it always carries
//! its own discriminant ([`EntryValue`]); on disk it is a bare YAML scalar.
//! Reading a scalar back either follows the historical shape heuristic
//! ([`EntryValue::sniff`]) or, when the owning habit is known, the habit's
//! declared field type ([`EntryValue::interpret`]).

use crate::error::{Result, ValidationError};
use crate::field_type::FieldKind;
use crate::timestamp::{format_time_of_day, parse_time_of_day};
use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A typed scalar recorded for a habit on a given day.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryValue {
    /// Yes/no outcome
    Bool(bool),
    /// Whole number
    Int(i64),
    /// Decimal number
    Float(f64),
    /// Free text
    Text(String),
    /// Clock time without a date
    TimeOfDay(NaiveTime),
}

/// How scalar values are turned into [`EntryValue`]s on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeMode {
    /// Infer the kind from the scalar's shape (`:` → time, `.` → float).
    #[default]
    Heuristic,
    /// Use the owning habit's field type; falls back to the heuristic for
    /// habits the schema does not know.
    SchemaTyped,
}

/// A scalar exactly as YAML produced it, before any interpretation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// YAML boolean
    Bool(bool),
    /// YAML integer
    Int(i64),
    /// YAML float
    Float(f64),
    /// YAML string
    Text(String),
}

impl EntryValue {
    /// Interpret a raw scalar by its shape, the way older files were read.
    ///
    /// Strings containing `:` are tried as a time of day, then strings
    /// containing `.` as a float; anything else stays text. Non-string
    /// scalars pass through untouched. Note that a text value such as
    /// `"3.0"` comes back as a float under this rule.
    pub fn sniff(raw: RawValue) -> Self {
        match raw {
            RawValue::Bool(b) => EntryValue::Bool(b),
            RawValue::Int(i) => EntryValue::Int(i),
            RawValue::Float(f) => EntryValue::Float(f),
            RawValue::Text(s) => {
                if s.contains(':') {
                    match parse_time_of_day(&s) {
                        Some(t) => EntryValue::TimeOfDay(t),
                        None => EntryValue::Text(s),
                    }
                } else if s.contains('.') {
                    match s.parse::<f64>() {
                        Ok(f) => EntryValue::Float(f),
                        Err(_) => EntryValue::Text(s),
                    }
                } else {
                    EntryValue::Text(s)
                }
            }
        }
    }

    /// Interpret a raw scalar as the given field kind.
    pub fn interpret(raw: RawValue, kind: FieldKind) -> Result<Self> {
        let mismatch = |raw: &RawValue| {
            ValidationError::format(format!(
                "value '{}' is not a valid {} value",
                raw_text(raw),
                kind.as_str()
            ))
        };

        match kind {
            FieldKind::Text => Ok(EntryValue::Text(raw_text(&raw))),
            FieldKind::Boolean => match &raw {
                RawValue::Bool(b) => Ok(EntryValue::Bool(*b)),
                RawValue::Text(s) => match s.trim() {
                    "true" => Ok(EntryValue::Bool(true)),
                    "false" => Ok(EntryValue::Bool(false)),
                    _ => Err(mismatch(&raw)),
                },
                _ => Err(mismatch(&raw)),
            },
            FieldKind::UnsignedInt => {
                let n = match &raw {
                    RawValue::Int(i) => Some(*i),
                    RawValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
                    RawValue::Text(s) => s.trim().parse::<i64>().ok(),
                    _ => None,
                };
                match n {
                    Some(n) if n >= 0 => Ok(EntryValue::Int(n)),
                    _ => Err(mismatch(&raw)),
                }
            }
            FieldKind::UnsignedDecimal | FieldKind::Decimal => {
                let f = match &raw {
                    RawValue::Int(i) => Some(*i as f64),
                    RawValue::Float(f) => Some(*f),
                    RawValue::Text(s) => s.trim().parse::<f64>().ok(),
                    RawValue::Bool(_) => None,
                };
                match f {
                    Some(f) if kind == FieldKind::UnsignedDecimal && f < 0.0 => Err(mismatch(&raw)),
                    Some(f) => Ok(EntryValue::Float(f)),
                    None => Err(mismatch(&raw)),
                }
            }
            FieldKind::Time => match &raw {
                RawValue::Text(s) => parse_time_of_day(s)
                    .map(EntryValue::TimeOfDay)
                    .ok_or_else(|| mismatch(&raw)),
                _ => Err(mismatch(&raw)),
            },
            FieldKind::Duration => match raw {
                RawValue::Int(i) => Ok(EntryValue::Int(i)),
                RawValue::Float(f) => Ok(EntryValue::Float(f)),
                RawValue::Text(ref s) => {
                    let trimmed = s.trim();
                    if let Ok(i) = trimmed.parse::<i64>() {
                        Ok(EntryValue::Int(i))
                    } else if let Ok(f) = trimmed.parse::<f64>() {
                        Ok(EntryValue::Float(f))
                    } else if parse_duration_minutes(trimmed).is_some() {
                        Ok(EntryValue::Text(trimmed.to_string()))
                    } else {
                        Err(mismatch(&raw))
                    }
                }
                RawValue::Bool(_) => Err(mismatch(&raw)),
            },
            FieldKind::Checklist => Ok(Self::sniff(raw)),
        }
    }

    /// Numeric reading of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            EntryValue::Int(i) => Some(*i as f64),
            EntryValue::Float(f) => Some(*f),
            EntryValue::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Numeric reading for comparison against criteria of a field kind.
    ///
    /// Times of day and `HH:MM[:SS]` durations compare as minutes.
    pub fn numeric_for(&self, kind: FieldKind) -> Option<f64> {
        match (self, kind) {
            (EntryValue::TimeOfDay(t), _) => {
                Some(t.hour() as f64 * 60.0 + t.minute() as f64 + t.second() as f64 / 60.0)
            }
            (EntryValue::Text(s), FieldKind::Duration) => parse_duration_minutes(s),
            (EntryValue::Bool(b), FieldKind::Boolean) => Some(if *b { 1.0 } else { 0.0 }),
            _ => self.as_f64(),
        }
    }

    /// Boolean reading of the value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            EntryValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Time-of-day reading of the value.
    pub fn as_time_of_day(&self) -> Option<NaiveTime> {
        match self {
            EntryValue::TimeOfDay(t) => Some(*t),
            _ => None,
        }
    }

    /// Short name of the variant, for messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            EntryValue::Bool(_) => "boolean",
            EntryValue::Int(_) => "integer",
            EntryValue::Float(_) => "float",
            EntryValue::Text(_) => "string",
            EntryValue::TimeOfDay(_) => "time",
        }
    }
}

/// Parse `HH:MM:SS`, `HH:MM` or a bare number of minutes into minutes.
pub fn parse_duration_minutes(s: &str) -> Option<f64> {
    let s = s.trim();
    if let Ok(m) = s.parse::<f64>() {
        return Some(m);
    }
    let parts: Vec<&str> = s.split(':').collect();
    let nums: Option<Vec<u32>> = parts.iter().map(|p| p.parse::<u32>().ok()).collect();
    match nums?.as_slice() {
        [h, m] if *m < 60 => Some(*h as f64 * 60.0 + *m as f64),
        [h, m, sec] if *m < 60 && *sec < 60 => {
            Some(*h as f64 * 60.0 + *m as f64 + *sec as f64 / 60.0)
        }
        _ => None,
    }
}

fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 {
        format!("{:.1}", f)
    } else {
        f.to_string()
    }
}

fn raw_text(raw: &RawValue) -> String {
    match raw {
        RawValue::Bool(b) => b.to_string(),
        RawValue::Int(i) => i.to_string(),
        RawValue::Float(f) => format_float(*f),
        RawValue::Text(s) => s.clone(),
    }
}

impl fmt::Display for EntryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryValue::Bool(b) => write!(f, "{}", b),
            EntryValue::Int(i) => write!(f, "{}", i),
            EntryValue::Float(x) => f.write_str(&format_float(*x)),
            EntryValue::Text(s) => f.write_str(s),
            EntryValue::TimeOfDay(t) => f.write_str(&format_time_of_day(t)),
        }
    }
}

impl Serialize for EntryValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            EntryValue::Bool(b) => serializer.serialize_bool(*b),
            EntryValue::Int(i) => serializer.serialize_i64(*i),
            // A float keeps its decimal point on output (`3.0`), so it is not
            // read back as an integer.
            EntryValue::Float(f) => serializer.serialize_f64(*f),
            EntryValue::Text(s) => serializer.serialize_str(s),
            EntryValue::TimeOfDay(t) => serializer.serialize_str(&format_time_of_day(t)),
        }
    }
}

impl<'de> Deserialize<'de> for EntryValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        RawValue::deserialize(deserializer).map(EntryValue::sniff)
    }
}

impl From<bool> for EntryValue {
    fn from(v: bool) -> Self {
        EntryValue::Bool(v)
    }
}

impl From<i64> for EntryValue {
    fn from(v: i64) -> Self {
        EntryValue::Int(v)
    }
}

impl From<f64> for EntryValue {
    fn from(v: f64) -> Self {
        EntryValue::Float(v)
    }
}

impl From<&str> for EntryValue {
    fn from(v: &str) -> Self {
        EntryValue::Text(v.to_string())
    }
}

impl From<String> for EntryValue {
    fn from(v: String) -> Self {
        EntryValue::Text(v)
    }
}

impl From<NaiveTime> for EntryValue {
    fn from(v: NaiveTime) -> Self {
        EntryValue::TimeOfDay(v)
    }
}
