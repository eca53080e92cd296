//! Decoding of historical entry-log shapes.
//!
//! Every shape ever written is read into the raw types here and upgraded to
//! the one canonical model in [`crate::entry`]:
//!
//! - `goals:` instead of `habits:` inside a day,
//! - `goal_id` instead of `habit_id`,
//! - entries carrying `completed: true|false` instead of `status` (written by
//!   the first file format, before skipped days existed).
//!
//! Values are interpreted either by shape or by the owning habit's declared
//! field type, see [`DecodeMode`].

use serde::Deserialize;
use tracing::{debug, info};

use crate::entry::{AchievementLevel, DayEntry, EntryLog, EntryStatus, HabitEntry};
use crate::error::{Result, ResultExt, ValidationError};
use crate::field_type::FieldKind;
use crate::schema::Schema;
use crate::timestamp;
use crate::value::{DecodeMode, EntryValue, RawValue};
use crate::Time;

/// A habit entry as found on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct RawHabitEntry {
    #[serde(default, alias = "goal_id")]
    habit_id: String,
    #[serde(default)]
    value: Option<RawValue>,
    #[serde(default)]
    achievement_level: Option<AchievementLevel>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default, deserialize_with = "timestamp::canonical_option::deserialize")]
    created_at: Option<Time>,
    #[serde(default, deserialize_with = "timestamp::canonical_option::deserialize")]
    updated_at: Option<Time>,
    #[serde(default)]
    status: Option<EntryStatus>,
    #[serde(default)]
    completed: Option<bool>,
}

/// A day entry as found on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDayEntry {
    #[serde(default)]
    date: String,
    #[serde(default, alias = "goals")]
    habits: Vec<RawHabitEntry>,
}

/// An entry log as found on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEntryLog {
    #[serde(default)]
    version: String,
    #[serde(default)]
    entries: Vec<RawDayEntry>,
}

/// Result of decoding, with the number of records that needed upgrading.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    /// Canonical value
    pub value: T,
    /// Records rewritten from an older shape
    pub upgraded: usize,
}

impl RawHabitEntry {
    /// Upgrade to the canonical entry. `kind` selects schema-typed value
    /// interpretation; `None` uses the shape heuristic.
    pub fn upgrade(self, kind: Option<FieldKind>) -> Result<Decoded<HabitEntry>> {
        let habit_id = self.habit_id;

        let mut value = match (self.value, kind) {
            (Some(raw), Some(kind)) => Some(
                EntryValue::interpret(raw, kind)
                    .context_with(|| format!("value for habit '{}'", habit_id))?,
            ),
            (Some(raw), None) => Some(EntryValue::sniff(raw)),
            (None, _) => None,
        };

        let mut upgraded = 0;
        let status = match (self.status, self.completed) {
            (Some(status), _) => status,
            (None, Some(done)) => {
                upgraded = 1;
                if value.is_none() {
                    value = Some(EntryValue::Bool(done));
                }
                if done {
                    EntryStatus::Completed
                } else {
                    EntryStatus::Failed
                }
            }
            (None, None) => {
                return Err(ValidationError::required(format!(
                    "status is required for habit '{}'",
                    habit_id
                )))
            }
        };

        Ok(Decoded {
            value: HabitEntry {
                habit_id,
                value,
                achievement_level: self.achievement_level,
                notes: self.notes.unwrap_or_default(),
                created_at: self.created_at.unwrap_or_default(),
                updated_at: self.updated_at,
                status,
            },
            upgraded,
        })
    }
}

impl RawDayEntry {
    /// Upgrade every record in the day.
    pub fn upgrade(self, mode: DecodeMode, schema: Option<&Schema>) -> Result<Decoded<DayEntry>> {
        let mut habits = Vec::with_capacity(self.habits.len());
        let mut upgraded = 0;

        for (i, raw) in self.habits.into_iter().enumerate() {
            let kind = match mode {
                DecodeMode::Heuristic => None,
                DecodeMode::SchemaTyped => schema
                    .and_then(|s| s.get(&raw.habit_id))
                    .and_then(|h| h.field_kind()),
            };
            let decoded = raw
                .upgrade(kind)
                .context_with(|| format!("goal entry at index {}", i))?;
            upgraded += decoded.upgraded;
            habits.push(decoded.value);
        }

        Ok(Decoded {
            value: DayEntry {
                date: self.date,
                habits,
            },
            upgraded,
        })
    }
}

impl RawEntryLog {
    /// Upgrade the whole log.
    pub fn upgrade(self, mode: DecodeMode, schema: Option<&Schema>) -> Result<Decoded<EntryLog>> {
        let mut entries = Vec::with_capacity(self.entries.len());
        let mut upgraded = 0;

        for (i, raw) in self.entries.into_iter().enumerate() {
            let decoded = raw
                .upgrade(mode, schema)
                .context_with(|| format!("day entry at index {}", i))?;
            upgraded += decoded.upgraded;
            entries.push(decoded.value);
        }

        if upgraded > 0 {
            info!(version = %self.version, upgraded, "upgraded legacy habit entries");
        }

        Ok(Decoded {
            value: EntryLog {
                version: self.version,
                entries,
            },
            upgraded,
        })
    }
}

impl TryFrom<RawHabitEntry> for HabitEntry {
    type Error = ValidationError;

    fn try_from(raw: RawHabitEntry) -> Result<Self> {
        let decoded = raw.upgrade(None)?;
        if decoded.upgraded > 0 {
            debug!(habit_id = %decoded.value.habit_id, "upgraded legacy habit entry");
        }
        Ok(decoded.value)
    }
}

impl TryFrom<RawDayEntry> for DayEntry {
    type Error = ValidationError;

    fn try_from(raw: RawDayEntry) -> Result<Self> {
        raw.upgrade(DecodeMode::Heuristic, None).map(|d| d.value)
    }
}

impl TryFrom<RawEntryLog> for EntryLog {
    type Error = ValidationError;

    fn try_from(raw: RawEntryLog) -> Result<Self> {
        raw.upgrade(DecodeMode::Heuristic, None).map(|d| d.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field_type::FieldType;
    use crate::habit::{Habit, HabitType, ScoringType};

    const LEGACY_LOG: &str = r#"
version: "1.0"
entries:
  - date: "2024-01-01"
    goals:
      - goal_id: meditate
        completed: true
        created_at: "2024-01-01T07:30:00Z"
      - goal_id: journal
        completed: false
        created_at: 1704094200
      - goal_id: mood
        value: "3.0"
        status: completed
        created_at: "2024-01-01 20:00"
"#;

    fn schema() -> Schema {
        let mut schema = Schema::new("1.0");
        schema.habits.push(
            Habit::new("Mood", HabitType::Informational, FieldType::new(FieldKind::Text)),
        );
        schema.normalize().unwrap().value
    }

    #[test]
    fn test_legacy_shapes_upgrade() {
        let raw: RawEntryLog = serde_yaml::from_str(LEGACY_LOG).unwrap();
        let decoded = raw.upgrade(DecodeMode::Heuristic, None).unwrap();
        assert_eq!(decoded.upgraded, 2);

        let day = &decoded.value.entries[0];
        let meditate = day.habit_entry("meditate").unwrap();
        assert_eq!(meditate.status, EntryStatus::Completed);
        assert_eq!(meditate.value, Some(EntryValue::Bool(true)));

        let journal = day.habit_entry("journal").unwrap();
        assert_eq!(journal.status, EntryStatus::Failed);
        assert_eq!(journal.value, Some(EntryValue::Bool(false)));
        assert_eq!(timestamp::format_timestamp(&journal.created_at), "2024-01-01 07:30:00");

        decoded.value.validate().unwrap();
    }

    #[test]
    fn test_upgraded_log_writes_canonical_shape() {
        let log: EntryLog = serde_yaml::from_str(LEGACY_LOG).unwrap();
        let out = serde_yaml::to_string(&log).unwrap();
        assert!(out.contains("habits:"));
        assert!(out.contains("habit_id: meditate"));
        assert!(out.contains("status: completed"));
        assert!(out.contains("2024-01-01 07:30:00"));
        assert!(!out.contains("goal_id"));
        assert!(!out.contains("completed: true"));

        let again: EntryLog = serde_yaml::from_str(&out).unwrap();
        assert_eq!(again, log);
    }

    #[test]
    fn test_heuristic_vs_schema_typed_values() {
        let raw: RawEntryLog = serde_yaml::from_str(LEGACY_LOG).unwrap();
        let sniffed = raw.clone().upgrade(DecodeMode::Heuristic, None).unwrap().value;
        assert_eq!(
            sniffed.entries[0].habit_entry("mood").unwrap().value,
            Some(EntryValue::Float(3.0))
        );

        let schema = schema();
        let typed = raw.upgrade(DecodeMode::SchemaTyped, Some(&schema)).unwrap().value;
        assert_eq!(
            typed.entries[0].habit_entry("mood").unwrap().value,
            Some(EntryValue::Text("3.0".into()))
        );
        // Habits the schema does not know fall back to the heuristic.
        assert_eq!(
            typed.entries[0].habit_entry("meditate").unwrap().value,
            Some(EntryValue::Bool(true))
        );
    }

    #[test]
    fn test_schema_typed_mismatch_reports_position() {
        let mut schema = Schema::new("1.0");
        schema.habits.push(
            Habit::new("Meditate", HabitType::Simple, FieldType::new(FieldKind::UnsignedInt))
                .with_scoring(ScoringType::Manual),
        );
        let schema = schema.normalize().unwrap().value;

        let raw: RawEntryLog = serde_yaml::from_str(LEGACY_LOG).unwrap();
        let err = raw.upgrade(DecodeMode::SchemaTyped, Some(&schema)).unwrap_err();
        assert!(err
            .to_string()
            .starts_with(
                "day entry at index 0: goal entry at index 0: value for habit 'meditate'"
            ));
    }

    #[test]
    fn test_missing_status_without_legacy_flag() {
        let yaml = "habit_id: run\nvalue: true\ncreated_at: \"2024-01-01 07:00:00\"\n";
        let err = serde_yaml::from_str::<HabitEntry>(yaml).unwrap_err();
        assert!(err.to_string().contains("status is required"));
    }

    #[test]
    fn test_missing_created_at_surfaces_in_validation() {
        let yaml = "habit_id: run\nvalue: true\nstatus: completed\n";
        let entry: HabitEntry = serde_yaml::from_str(yaml).unwrap();
        assert!(entry.validate().unwrap_err().to_string().contains("created_at"));
    }
}
