//! Checklists - reusable item lists and their daily completion state.
//!
//! Items starting with `"# "` are headings: they structure the list on screen
//! but never count towards totals or completion.

use std::collections::{BTreeMap, HashSet};

use crate::clock::Clock;
use crate::error::{Result, ResultExt, ValidationError};
use crate::id::{generate_id_from_title, is_valid_id};
use crate::timestamp::{parse_date, validate_optional_date, DATE_FORMAT};
use crate::Normalized;
use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Prefix marking a heading item.
pub const HEADING_PREFIX: &str = "# ";

/// Whether an item is a heading.
pub fn is_heading(item: &str) -> bool {
    item.starts_with(HEADING_PREFIX)
}

/// Completed vs. countable items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChecklistProgress {
    /// Non-heading items marked complete
    pub completed: usize,
    /// Non-heading items in the checklist
    pub total: usize,
}

impl ChecklistProgress {
    /// All countable items complete.
    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }

    /// Some but not all items complete.
    pub fn is_partial(&self) -> bool {
        self.completed > 0 && !self.is_complete()
    }

    /// Completion ratio in `[0, 1]`; an empty checklist counts as done.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            (self.completed as f64 / self.total as f64).min(1.0)
        }
    }
}

/// A reusable checklist template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checklist {
    /// Slug identifier (derived from the title when empty)
    #[serde(default)]
    pub id: String,

    /// Display title
    #[serde(default)]
    pub title: String,

    /// Longer description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Items, in display order
    #[serde(default)]
    pub items: Vec<String>,

    /// Creation date (`YYYY-MM-DD`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,

    /// Last modification date (`YYYY-MM-DD`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_date: Option<String>,
}

impl Checklist {
    /// New checklist dated today.
    pub fn new(title: impl Into<String>, items: Vec<String>, clock: &dyn Clock) -> Self {
        let today = clock.today().format(DATE_FORMAT).to_string();
        Self {
            id: String::new(),
            title: title.into(),
            description: None,
            items,
            created_date: Some(today.clone()),
            modified_date: Some(today),
        }
    }

    /// Items that count towards completion.
    pub fn countable_items(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str).filter(|i| !is_heading(i))
    }

    /// Number of non-heading items.
    pub fn total_item_count(&self) -> usize {
        self.countable_items().count()
    }

    /// Number of heading items.
    pub fn heading_count(&self) -> usize {
        self.items.len() - self.total_item_count()
    }

    /// Stamp `modified_date` with today's date.
    pub fn touch(&mut self, clock: &dyn Clock) {
        self.modified_date = Some(clock.today().format(DATE_FORMAT).to_string());
    }

    /// Validate, returning a copy with a generated ID when none was given.
    pub fn normalize(&self) -> Result<Normalized<Checklist>> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::required("checklist title is required"));
        }

        let mut checklist = self.clone();
        let mut id_generated = false;
        if checklist.id.is_empty() {
            checklist.id = generate_id_from_title(&checklist.title);
            id_generated = true;
            debug!(
                id = %checklist.id,
                title = %checklist.title,
                "generated checklist id from title"
            );
        }

        if !is_valid_id(&checklist.id) {
            return Err(ValidationError::format(format!(
                "invalid checklist ID '{}': must contain only lowercase letters, \
                 numbers, and underscores",
                checklist.id
            )));
        }

        if checklist.items.is_empty() {
            return Err(ValidationError::required("checklist must have at least one item"));
        }
        for (i, item) in checklist.items.iter().enumerate() {
            if item.trim().is_empty() {
                return Err(ValidationError::required(format!(
                    "checklist item at index {} cannot be empty",
                    i
                )));
            }
        }

        validate_optional_date("created_date", checklist.created_date.as_deref())?;
        validate_optional_date("modified_date", checklist.modified_date.as_deref())?;

        Ok(Normalized {
            value: checklist,
            id_generated,
        })
    }

    /// Validate without keeping the normalized copy.
    pub fn validate(&self) -> Result<()> {
        self.normalize().map(|_| ())
    }
}

/// The checklist templates file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChecklistSchema {
    /// Format version
    #[serde(default)]
    pub version: String,

    /// Creation date (`YYYY-MM-DD`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,

    /// Checklist templates
    #[serde(default)]
    pub checklists: Vec<Checklist>,
}

impl ChecklistSchema {
    /// Look up a checklist by ID.
    pub fn get(&self, id: &str) -> Option<&Checklist> {
        self.checklists.iter().find(|c| c.id == id)
    }

    /// Whether a checklist with this ID exists.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Validate every checklist; `id_generated` reports whether any ID was filled in.
    pub fn normalize(&self) -> Result<Normalized<ChecklistSchema>> {
        if self.version.trim().is_empty() {
            return Err(ValidationError::required("version is required"));
        }
        validate_optional_date("created_date", self.created_date.as_deref())?;

        let mut seen = HashSet::new();
        let mut checklists = Vec::with_capacity(self.checklists.len());
        let mut id_generated = false;

        for (i, checklist) in self.checklists.iter().enumerate() {
            let normalized = checklist
                .normalize()
                .context_with(|| format!("checklist at index {}", i))?;
            if !seen.insert(normalized.value.id.clone()) {
                return Err(ValidationError::duplicate(format!(
                    "duplicate checklist ID: {}",
                    normalized.value.id
                )));
            }
            id_generated |= normalized.id_generated;
            checklists.push(normalized.value);
        }

        Ok(Normalized {
            value: ChecklistSchema {
                version: self.version.clone(),
                created_date: self.created_date.clone(),
                checklists,
            },
            id_generated,
        })
    }

    /// Validate without keeping the normalized copy.
    pub fn validate(&self) -> Result<()> {
        self.normalize().map(|_| ())
    }
}

/// One day's completion state for one checklist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChecklistEntry {
    /// Checklist this state belongs to
    #[serde(default)]
    pub checklist_id: String,

    /// Item text → done
    #[serde(default)]
    pub completed_items: BTreeMap<String, bool>,

    /// When the checklist became complete (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<String>,

    /// Some but not all items done
    #[serde(default)]
    pub partial_complete: bool,
}

impl ChecklistEntry {
    /// Empty completion state for a checklist.
    pub fn new(checklist_id: impl Into<String>) -> Self {
        Self {
            checklist_id: checklist_id.into(),
            ..Default::default()
        }
    }

    /// Non-heading items of `checklist` marked complete here.
    pub fn completed_item_count(&self, checklist: &Checklist) -> usize {
        checklist
            .countable_items()
            .filter(|item| self.completed_items.get(*item).copied().unwrap_or(false))
            .count()
    }

    /// Progress against `checklist`.
    pub fn progress(&self, checklist: &Checklist) -> ChecklistProgress {
        ChecklistProgress {
            completed: self.completed_item_count(checklist),
            total: checklist.total_item_count(),
        }
    }

    /// Every non-heading item complete.
    pub fn is_complete(&self, checklist: &Checklist) -> bool {
        self.progress(checklist).is_complete()
    }

    /// Mark one item done or not done and refresh the derived fields.
    pub fn set_item(
        &mut self,
        checklist: &Checklist,
        item: &str,
        done: bool,
        clock: &dyn Clock,
    ) -> Result<()> {
        if is_heading(item) {
            return Err(ValidationError::inconsistent(format!(
                "heading '{}' cannot be completed",
                item
            )));
        }
        if !checklist.items.iter().any(|i| i == item) {
            return Err(ValidationError::missing_reference(format!(
                "item '{}' is not part of checklist '{}'",
                item, checklist.id
            )));
        }
        self.completed_items.insert(item.to_string(), done);
        self.refresh(checklist, clock);
        Ok(())
    }

    /// Recompute `partial_complete` and `completion_time`.
    pub fn refresh(&mut self, checklist: &Checklist, clock: &dyn Clock) {
        let progress = self.progress(checklist);
        self.partial_complete = progress.is_partial();
        if progress.is_complete() {
            if self.completion_time.is_none() {
                self.completion_time = Some(clock.now().to_rfc3339_opts(SecondsFormat::Secs, true));
            }
        } else {
            self.completion_time = None;
        }
    }

    /// Check the entry on its own.
    pub fn validate(&self) -> Result<()> {
        if self.checklist_id.trim().is_empty() {
            return Err(ValidationError::required("checklist_id is required"));
        }
        if let Some(ts) = self.completion_time.as_deref().filter(|s| !s.is_empty()) {
            DateTime::parse_from_rfc3339(ts).map_err(|e| {
                ValidationError::format(format!("invalid completion_time '{}': {}", ts, e))
            })?;
        }
        Ok(())
    }
}

/// All checklist completions recorded on one date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyChecklistEntries {
    /// Date (`YYYY-MM-DD`)
    #[serde(default)]
    pub date: String,

    /// Checklist ID → completion state
    #[serde(default)]
    pub completed: BTreeMap<String, ChecklistEntry>,
}

impl DailyChecklistEntries {
    /// Empty day.
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            completed: BTreeMap::new(),
        }
    }

    /// Check the day and every entry in it.
    pub fn validate(&self) -> Result<()> {
        if self.date.is_empty() {
            return Err(ValidationError::required("date is required"));
        }
        parse_date(&self.date)?;
        for (id, entry) in &self.completed {
            entry
                .validate()
                .context_with(|| format!("checklist entry '{}'", id))?;
            if entry.checklist_id != *id {
                return Err(ValidationError::inconsistent(format!(
                    "checklist entry keyed '{}' has checklist_id '{}'",
                    id, entry.checklist_id
                )));
            }
        }
        Ok(())
    }
}

/// The checklist completion log file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChecklistEntriesLog {
    /// Format version
    #[serde(default)]
    pub version: String,

    /// Date → that day's completions
    #[serde(default)]
    pub entries: BTreeMap<String, DailyChecklistEntries>,
}

impl ChecklistEntriesLog {
    /// Empty log at `version`.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Completion state of one checklist on one date.
    pub fn get(&self, date: &str, checklist_id: &str) -> Option<&ChecklistEntry> {
        self.entries.get(date)?.completed.get(checklist_id)
    }

    /// Mutable completion state, created empty when missing.
    pub fn entry_mut(&mut self, date: &str, checklist_id: &str) -> Result<&mut ChecklistEntry> {
        parse_date(date)?;
        let day = self
            .entries
            .entry(date.to_string())
            .or_insert_with(|| DailyChecklistEntries::new(date));
        Ok(day
            .completed
            .entry(checklist_id.to_string())
            .or_insert_with(|| ChecklistEntry::new(checklist_id)))
    }

    /// Validate then store an entry, replacing any previous state.
    pub fn record(&mut self, date: &str, entry: ChecklistEntry) -> Result<()> {
        entry.validate()?;
        parse_date(date)?;
        self.entries
            .entry(date.to_string())
            .or_insert_with(|| DailyChecklistEntries::new(date))
            .completed
            .insert(entry.checklist_id.clone(), entry);
        Ok(())
    }

    /// Check the whole log.
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(ValidationError::required("version is required"));
        }
        for (date, day) in &self.entries {
            day.validate()
                .context_with(|| format!("checklist entries for {}", date))?;
            if day.date != *date {
                return Err(ValidationError::inconsistent(format!(
                    "checklist entries keyed '{}' are dated '{}'",
                    date, day.date
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{TimeZone, Utc};

    fn clock() -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 10, 7, 0, 0).unwrap())
    }

    fn morning() -> Checklist {
        Checklist {
            id: "morning".into(),
            title: "Morning".into(),
            items: vec!["# Morning".into(), "Meditate".into(), "Stretch".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_headings_excluded_from_counts() {
        let checklist = morning();
        assert_eq!(checklist.total_item_count(), 2);
        assert_eq!(checklist.heading_count(), 1);
        assert!(!is_heading("#hashtag"));
    }

    #[test]
    fn test_is_complete_with_headings() {
        let checklist = morning();
        let mut entry = ChecklistEntry::new("morning");
        entry.completed_items.insert("Meditate".into(), true);
        assert!(!entry.is_complete(&checklist));

        entry.completed_items.insert("Stretch".into(), true);
        assert!(entry.is_complete(&checklist));
        assert_eq!(entry.completed_item_count(&checklist), 2);
    }

    #[test]
    fn test_completed_heading_does_not_count() {
        let checklist = morning();
        let mut entry = ChecklistEntry::new("morning");
        entry.completed_items.insert("# Morning".into(), true);
        entry.completed_items.insert("Meditate".into(), true);
        assert_eq!(entry.completed_item_count(&checklist), 1);
        assert!(!entry.is_complete(&checklist));
    }

    #[test]
    fn test_set_item_tracks_partial_and_completion_time() {
        let checklist = morning();
        let clock = clock();
        let mut entry = ChecklistEntry::new("morning");

        entry.set_item(&checklist, "Meditate", true, &clock).unwrap();
        assert!(entry.partial_complete);
        assert!(entry.completion_time.is_none());

        entry.set_item(&checklist, "Stretch", true, &clock).unwrap();
        assert!(!entry.partial_complete);
        assert_eq!(entry.completion_time.as_deref(), Some("2024-03-10T07:00:00Z"));
        assert!(entry.validate().is_ok());

        entry.set_item(&checklist, "Stretch", false, &clock).unwrap();
        assert!(entry.completion_time.is_none());

        assert!(entry.set_item(&checklist, "# Morning", true, &clock).is_err());
        assert!(entry.set_item(&checklist, "Jog", true, &clock).is_err());
    }

    #[test]
    fn test_progress_ratio() {
        let p = ChecklistProgress { completed: 1, total: 4 };
        assert_eq!(p.ratio(), 0.25);
        assert!(p.is_partial());
        assert_eq!(ChecklistProgress::default().ratio(), 1.0);
    }

    #[test]
    fn test_checklist_normalize_generates_id() {
        let mut checklist = morning();
        checklist.id.clear();
        checklist.title = "Evening Wind-Down".into();
        let normalized = checklist.normalize().unwrap();
        assert!(normalized.id_generated);
        assert_eq!(normalized.value.id, "evening_wind_down");
        assert!(checklist.id.is_empty());
    }

    #[test]
    fn test_checklist_validation_errors() {
        let mut c = morning();
        c.title = "  ".into();
        assert_eq!(c.validate().unwrap_err().to_string(), "checklist title is required");

        let mut c = morning();
        c.items.clear();
        assert!(c.validate().unwrap_err().to_string().contains("at least one item"));

        let mut c = morning();
        c.items.push("   ".into());
        assert!(c.validate().unwrap_err().to_string().contains("index 3 cannot be empty"));

        let mut c = morning();
        c.id = "Morning-Routine".into();
        assert!(c.validate().unwrap_err().to_string().contains("invalid checklist ID"));

        let mut c = morning();
        c.created_date = Some("2024/01/01".into());
        assert!(c.validate().unwrap_err().to_string().starts_with("invalid created_date"));
    }

    #[test]
    fn test_schema_rejects_duplicate_ids() {
        let schema = ChecklistSchema {
            version: "1.0".into(),
            created_date: Some("2024-01-01".into()),
            checklists: vec![morning(), morning()],
        };
        assert_eq!(
            schema.validate().unwrap_err().to_string(),
            "duplicate checklist ID: morning"
        );
    }

    #[test]
    fn test_entry_validation() {
        assert!(ChecklistEntry::new(" ").validate().is_err());
        let mut entry = ChecklistEntry::new("morning");
        entry.completion_time = Some("yesterday".into());
        assert!(entry.validate().unwrap_err().to_string().contains("completion_time"));
    }

    #[test]
    fn test_entries_log_yaml_shape() {
        let checklist = morning();
        let clock = clock();
        let mut log = ChecklistEntriesLog::new("1.0");
        log.entry_mut("2024-03-10", "morning")
            .unwrap()
            .set_item(&checklist, "Meditate", true, &clock)
            .unwrap();
        log.validate().unwrap();

        let yaml = serde_yaml::to_string(&log).unwrap();
        assert!(yaml.contains("2024-03-10"));
        assert!(yaml.contains("completed_items"));
        assert!(yaml.contains("partial_complete: true"));
        assert!(!yaml.contains("completion_time"));

        let back: ChecklistEntriesLog = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, log);
        assert_eq!(back.get("2024-03-10", "morning").unwrap().completed_item_count(&checklist), 1);
    }

    #[test]
    fn test_entries_log_rejects_mismatched_keys() {
        let mut log = ChecklistEntriesLog::new("1.0");
        log.record("2024-03-10", ChecklistEntry::new("morning")).unwrap();
        log.entries.get_mut("2024-03-10").unwrap().date = "2024-03-11".into();
        assert!(log.validate().is_err());
        assert!(log.record("not-a-date", ChecklistEntry::new("morning")).is_err());
    }
}
