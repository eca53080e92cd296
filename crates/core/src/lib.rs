//! Vice core data models.
//!
//! This crate defines the habit definitions, daily entries and checklists of
//! the tracker, together with their validation rules and the YAML codec that
//! reads every historical file shape and writes one canonical shape.

#![warn(missing_docs)]

// Codec primitives
mod clock;
mod error;
mod id;
mod timestamp;
mod value;

// Habit definitions
mod criteria;
mod field_type;
mod habit;
mod schema;

// Daily records
mod entry;
mod legacy;

// Checklists and cross-references
mod checklist;
mod crossref;

// Evaluation
mod scoring;
mod srs;

pub mod yaml;

// Re-exports
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ErrorKind, Result, ValidationError};
pub use id::{generate_id_from_title, is_valid_id, FALLBACK_ID};
pub use timestamp::{
    epoch_to_time, format_time_of_day, format_timestamp, parse_date, parse_time_of_day,
    parse_timestamp, DATE_FORMAT, TIMESTAMP_FORMAT, TIME_OF_DAY_FORMAT,
};
pub use value::{parse_duration_minutes, DecodeMode, EntryValue, RawValue};

pub use criteria::{
    ChecklistCompletionCondition, CompareOp, Condition, Criteria, EvalInput, RangeCondition,
    REQUIRED_ITEMS_ALL,
};
pub use field_type::{FieldKind, FieldType, DURATION_FORMATS, TIME_FORMAT_HH_MM};
pub use habit::{Direction, Habit, HabitType, ScoringType};
pub use schema::Schema;

pub use entry::{AchievementLevel, DayEntry, EntryLog, EntryStatus, HabitEntry};
pub use legacy::{Decoded, RawDayEntry, RawEntryLog, RawHabitEntry};

pub use checklist::{
    is_heading, Checklist, ChecklistEntriesLog, ChecklistEntry, ChecklistProgress,
    ChecklistSchema, DailyChecklistEntries, HEADING_PREFIX,
};

pub use scoring::{score_checklist, score_elastic, score_simple};
pub use srs::{SrsData, DEFAULT_EASINESS, MAX_EASINESS, MIN_EASINESS};

/// Timestamp type used across all records.
pub type Time = chrono::DateTime<chrono::Utc>;

/// Outcome of a pure normalization pass.
///
/// `value` is the validated copy with defaults filled in. `id_generated` is
/// set when an ID had to be derived from a title, so the caller knows the
/// normalized value differs from what was loaded and may want to save it.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    /// Validated value
    pub value: T,
    /// Whether any ID was derived from a title
    pub id_generated: bool,
}

impl<T> Normalized<T> {
    /// Drop the flag.
    pub fn into_inner(self) -> T {
        self.value
    }
}
