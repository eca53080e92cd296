//! Entry log - what happened to each habit on each day.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::Clock;
use crate::error::{Result, ResultExt, ValidationError};
use crate::legacy::{RawDayEntry, RawEntryLog, RawHabitEntry};
use crate::timestamp::{self, parse_date, DATE_FORMAT};
use crate::value::EntryValue;
use crate::Time;

/// Final outcome of a day's attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Done
    Completed,
    /// Deliberately not attempted
    Skipped,
    /// Attempted and not achieved
    Failed,
}

impl EntryStatus {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Completed => "completed",
            EntryStatus::Skipped => "skipped",
            EntryStatus::Failed => "failed",
        }
    }
}

/// Elastic tier reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementLevel {
    /// No tier reached
    None,
    /// Lowest tier
    Mini,
    /// Middle tier
    Midi,
    /// Highest tier
    Maxi,
}

/// One habit's record for one day.
///
/// Status is fixed at construction; later changes go through the setters,
/// which only touch value, level, notes and `updated_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawHabitEntry")]
pub struct HabitEntry {
    /// Habit this record belongs to
    pub habit_id: String,

    /// Recorded value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<EntryValue>,

    /// Elastic tier reached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub achievement_level: Option<AchievementLevel>,

    /// Free-form notes
    #[serde(skip_serializing_if = "String::is_empty")]
    pub notes: String,

    /// When the record was created
    #[serde(serialize_with = "timestamp::canonical::serialize")]
    pub created_at: Time,

    /// When the record was last changed
    #[serde(
        serialize_with = "timestamp::canonical_option::serialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<Time>,

    /// Outcome
    pub status: EntryStatus,
}

impl HabitEntry {
    fn with_status(habit_id: impl Into<String>, status: EntryStatus, clock: &dyn Clock) -> Self {
        let mut entry = Self {
            habit_id: habit_id.into(),
            value: None,
            achievement_level: None,
            notes: String::new(),
            created_at: Time::default(),
            updated_at: None,
            status,
        };
        entry.mark_created(clock);
        entry
    }

    /// Yes/no record: `true` completes, `false` fails.
    pub fn boolean(habit_id: impl Into<String>, done: bool, clock: &dyn Clock) -> Self {
        let status = if done { EntryStatus::Completed } else { EntryStatus::Failed };
        let mut entry = Self::with_status(habit_id, status, clock);
        entry.value = Some(EntryValue::Bool(done));
        entry
    }

    /// Elastic record: any tier completes, [`AchievementLevel::None`] fails.
    pub fn elastic(
        habit_id: impl Into<String>,
        value: EntryValue,
        level: AchievementLevel,
        clock: &dyn Clock,
    ) -> Self {
        let status = if level == AchievementLevel::None {
            EntryStatus::Failed
        } else {
            EntryStatus::Completed
        };
        let mut entry = Self::with_status(habit_id, status, clock);
        entry.value = Some(value);
        entry.achievement_level = Some(level);
        entry
    }

    /// Value-only record (informational habits); always completed.
    pub fn value_only(habit_id: impl Into<String>, value: EntryValue, clock: &dyn Clock) -> Self {
        let mut entry = Self::with_status(habit_id, EntryStatus::Completed, clock);
        entry.value = Some(value);
        entry
    }

    /// Skipped record; carries no value.
    pub fn skipped(habit_id: impl Into<String>, clock: &dyn Clock) -> Self {
        Self::with_status(habit_id, EntryStatus::Skipped, clock)
    }

    /// Stamp `created_at` with the current time.
    pub fn mark_created(&mut self, clock: &dyn Clock) {
        self.created_at = clock.now();
    }

    /// Stamp `updated_at` with the current time.
    pub fn mark_updated(&mut self, clock: &dyn Clock) {
        self.updated_at = Some(clock.now());
    }

    /// `updated_at` if set, else `created_at`.
    pub fn last_modified(&self) -> Time {
        self.updated_at.unwrap_or(self.created_at)
    }

    /// Replace the value.
    pub fn set_value(&mut self, value: EntryValue, clock: &dyn Clock) {
        self.value = Some(value);
        self.mark_updated(clock);
    }

    /// Replace the achievement level.
    pub fn set_achievement_level(&mut self, level: AchievementLevel, clock: &dyn Clock) {
        self.achievement_level = Some(level);
        self.mark_updated(clock);
    }

    /// Replace the notes.
    pub fn set_notes(&mut self, notes: impl Into<String>, clock: &dyn Clock) {
        self.notes = notes.into();
        self.mark_updated(clock);
    }

    /// Whether a value is recorded.
    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    /// Status is completed.
    pub fn is_completed(&self) -> bool {
        self.status == EntryStatus::Completed
    }

    /// Status is skipped.
    pub fn is_skipped(&self) -> bool {
        self.status == EntryStatus::Skipped
    }

    /// Check the record on its own.
    pub fn validate(&self) -> Result<()> {
        if self.habit_id.trim().is_empty() {
            return Err(ValidationError::required("habit_id is required"));
        }

        match self.status {
            // A skipped entry may keep its achievement level for history.
            EntryStatus::Skipped if self.value.is_some() => {
                return Err(ValidationError::inconsistent("skipped entries cannot have values"));
            }
            EntryStatus::Completed | EntryStatus::Failed if self.value.is_none() => {
                return Err(ValidationError::inconsistent(format!(
                    "{} entries must have a value",
                    self.status.as_str()
                )));
            }
            _ => {}
        }

        if self.created_at == Time::default() {
            return Err(ValidationError::required("created_at timestamp is required"));
        }
        Ok(())
    }
}

/// All habit records for one date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDayEntry")]
pub struct DayEntry {
    /// Date (`YYYY-MM-DD`)
    pub date: String,

    /// Records for that date
    pub habits: Vec<HabitEntry>,
}

impl DayEntry {
    /// Empty day.
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            habits: Vec::new(),
        }
    }

    /// Empty day for today.
    pub fn today(clock: &dyn Clock) -> Self {
        Self::new(clock.today().format(DATE_FORMAT).to_string())
    }

    /// Parsed date.
    pub fn parsed_date(&self) -> Result<NaiveDate> {
        parse_date(&self.date)
    }

    /// Whether this entry is for today's date.
    pub fn is_today(&self, clock: &dyn Clock) -> bool {
        self.parsed_date().is_ok_and(|d| d == clock.today())
    }

    /// Record for a habit.
    pub fn habit_entry(&self, habit_id: &str) -> Option<&HabitEntry> {
        self.habits.iter().find(|h| h.habit_id == habit_id)
    }

    /// Mutable record for a habit.
    pub fn habit_entry_mut(&mut self, habit_id: &str) -> Option<&mut HabitEntry> {
        self.habits.iter_mut().find(|h| h.habit_id == habit_id)
    }

    /// Add a record; fails if the habit already has one today.
    pub fn add_habit_entry(&mut self, entry: HabitEntry) -> Result<()> {
        entry.validate()?;
        if self.habit_entry(&entry.habit_id).is_some() {
            return Err(ValidationError::duplicate(format!(
                "entry for goal {} already exists on date {}",
                entry.habit_id, self.date
            )));
        }
        self.habits.push(entry);
        Ok(())
    }

    /// Replace the habit's record, or append it if there is none.
    pub fn update_habit_entry(&mut self, entry: HabitEntry) -> Result<()> {
        entry.validate()?;
        match self.habit_entry_mut(&entry.habit_id) {
            Some(existing) => *existing = entry,
            None => self.habits.push(entry),
        }
        Ok(())
    }

    /// Check the day and every record in it.
    pub fn validate(&self) -> Result<()> {
        if self.date.is_empty() {
            return Err(ValidationError::required("date is required"));
        }
        parse_date(&self.date)?;

        let mut seen = HashSet::new();
        for (i, entry) in self.habits.iter().enumerate() {
            entry
                .validate()
                .context_with(|| format!("goal entry at index {}", i))?;
            if !seen.insert(entry.habit_id.as_str()) {
                return Err(ValidationError::duplicate(format!(
                    "duplicate habit ID: {}",
                    entry.habit_id
                )));
            }
        }
        Ok(())
    }
}

/// The daily completions file: `{version, entries}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEntryLog")]
pub struct EntryLog {
    /// Format version
    pub version: String,

    /// Days, in file order
    pub entries: Vec<DayEntry>,
}

impl EntryLog {
    /// Empty log at `version`.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            entries: Vec::new(),
        }
    }

    /// Day entry for a date.
    pub fn day_entry(&self, date: &str) -> Option<&DayEntry> {
        self.entries.iter().find(|e| e.date == date)
    }

    /// Mutable day entry for a date.
    pub fn day_entry_mut(&mut self, date: &str) -> Option<&mut DayEntry> {
        self.entries.iter_mut().find(|e| e.date == date)
    }

    /// Add a day; fails if the date already exists.
    pub fn add_day_entry(&mut self, entry: DayEntry) -> Result<()> {
        entry.validate()?;
        if self.day_entry(&entry.date).is_some() {
            return Err(ValidationError::duplicate(format!(
                "entry for date {} already exists",
                entry.date
            )));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Replace the day with the same date, or append it.
    pub fn update_day_entry(&mut self, entry: DayEntry) -> Result<()> {
        entry.validate()?;
        match self.day_entry_mut(&entry.date) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        Ok(())
    }

    /// Days within `[start, end]`, in file order.
    ///
    /// Days whose date does not parse are skipped.
    pub fn entries_for_date_range(&self, start: &str, end: &str) -> Result<Vec<&DayEntry>> {
        let start_date = parse_date(start).context_with(|| "invalid start date".to_string())?;
        let end_date = parse_date(end).context_with(|| "invalid end date".to_string())?;
        if start_date > end_date {
            return Err(ValidationError::inconsistent(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }

        Ok(self
            .entries
            .iter()
            .filter(|e| match parse_date(&e.date) {
                Ok(d) => d >= start_date && d <= end_date,
                Err(err) => {
                    debug!(date = %e.date, error = %err, "skipping day entry with unparsable date");
                    false
                }
            })
            .collect())
    }

    /// Every record of one habit, paired with its date, in file order.
    pub fn habit_history<'a>(
        &'a self,
        habit_id: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a HabitEntry)> + 'a {
        self.entries.iter().filter_map(move |day| {
            day.habit_entry(habit_id).map(|h| (day.date.as_str(), h))
        })
    }

    /// Check the whole log.
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(ValidationError::required("version is required"));
        }

        let mut seen = HashSet::new();
        for (i, day) in self.entries.iter().enumerate() {
            day.validate()
                .context_with(|| format!("day entry at index {}", i))?;
            if !seen.insert(day.date.as_str()) {
                return Err(ValidationError::duplicate(format!("duplicate date: {}", day.date)));
            }
        }
        Ok(())
    }
}
