//! Schema - the habit definitions file.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ResultExt, ValidationError};
use crate::habit::{Habit, HabitType};
use crate::timestamp::validate_optional_date;
use crate::Normalized;

/// Habit definitions file: `{version, created_date, habits}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Format version
    #[serde(default)]
    pub version: String,

    /// Creation date (`YYYY-MM-DD`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,

    /// Habit definitions, in display order
    #[serde(default, alias = "goals")]
    pub habits: Vec<Habit>,
}

impl Schema {
    /// Empty schema at `version`.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            created_date: None,
            habits: Vec::new(),
        }
    }

    /// Look up a habit by ID.
    pub fn get(&self, id: &str) -> Option<&Habit> {
        self.habits.iter().find(|h| h.id == id)
    }

    /// Habits of one type, in order.
    pub fn habits_of_type(&self, habit_type: HabitType) -> impl Iterator<Item = &Habit> {
        self.habits
            .iter()
            .filter(move |h| h.habit_type == Some(habit_type))
    }

    /// Validate every habit and return the normalized schema.
    ///
    /// Positions are rewritten to `index + 1` regardless of what was stored.
    /// `id_generated` is true when any habit received an ID derived from its
    /// title, which is the signal for callers to persist the result.
    pub fn normalize(&self) -> Result<Normalized<Schema>> {
        if self.version.trim().is_empty() {
            return Err(ValidationError::required("version is required"));
        }
        validate_optional_date("created_date", self.created_date.as_deref())?;

        let mut seen = HashSet::new();
        let mut habits = Vec::with_capacity(self.habits.len());
        let mut id_generated = false;

        for (i, habit) in self.habits.iter().enumerate() {
            let Normalized { value: mut habit, id_generated: generated } = habit
                .normalize()
                .context_with(|| format!("habit at index {}", i))?;
            habit.position = i + 1;

            if !seen.insert(habit.id.clone()) {
                return Err(ValidationError::duplicate(format!(
                    "duplicate habit ID: {}",
                    habit.id
                )));
            }
            id_generated |= generated;
            habits.push(habit);
        }

        Ok(Normalized {
            value: Schema {
                version: self.version.clone(),
                created_date: self.created_date.clone(),
                habits,
            },
            id_generated,
        })
    }

    /// Validate without keeping the normalized copy.
    pub fn validate(&self) -> Result<()> {
        self.normalize().map(|_| ())
    }

    /// Replace `self` with its normalized form and report whether IDs were
    /// generated. On error `self` is left untouched.
    pub fn validate_and_track_changes(&mut self) -> Result<bool> {
        let Normalized { value, id_generated } = self.normalize()?;
        *self = value;
        Ok(id_generated)
    }
}
