//! Automatic scoring of a day's value against a habit's criteria.

use tracing::debug;

use crate::checklist::{Checklist, ChecklistEntry};
use crate::criteria::{Criteria, EvalInput};
use crate::entry::AchievementLevel;
use crate::error::{Result, ResultExt, ValidationError};
use crate::field_type::FieldKind;
use crate::habit::{Habit, HabitType};
use crate::value::EntryValue;

/// Whether a simple habit's criteria hold for `value`.
pub fn score_simple(habit: &Habit, value: &EntryValue) -> Result<bool> {
    expect_type(habit, HabitType::Simple)?;
    let criteria = habit.criteria.as_ref().ok_or_else(|| {
        ValidationError::inconsistent(format!("habit '{}' has no criteria to score", habit.id))
    })?;
    let kind = value_kind(habit)?;
    criteria
        .evaluate(&EvalInput::value(value, kind))
        .context_with(|| format!("scoring habit '{}'", habit.id))
}

/// Highest elastic tier reached by `value`.
///
/// Tiers are tried from maxi down to mini; the first that holds wins.
pub fn score_elastic(habit: &Habit, value: &EntryValue) -> Result<AchievementLevel> {
    expect_type(habit, HabitType::Elastic)?;
    let kind = value_kind(habit)?;
    let input = EvalInput::value(value, kind);

    let tiers: [(AchievementLevel, Option<&Criteria>); 3] = [
        (AchievementLevel::Maxi, habit.maxi_criteria.as_ref()),
        (AchievementLevel::Midi, habit.midi_criteria.as_ref()),
        (AchievementLevel::Mini, habit.mini_criteria.as_ref()),
    ];

    for (level, criteria) in tiers {
        let Some(criteria) = criteria else { continue };
        let met = criteria
            .evaluate(&input)
            .context_with(|| format!("scoring habit '{}'", habit.id))?;
        if met {
            debug!(habit_id = %habit.id, ?level, "elastic tier reached");
            return Ok(level);
        }
    }
    Ok(AchievementLevel::None)
}

/// Whether a checklist habit is achieved by today's checklist state.
///
/// Without criteria the checklist must simply be complete.
pub fn score_checklist(
    habit: &Habit,
    checklist: &Checklist,
    entry: &ChecklistEntry,
) -> Result<bool> {
    expect_type(habit, HabitType::Checklist)?;

    if habit.checklist_id() != Some(checklist.id.as_str()) {
        return Err(ValidationError::inconsistent(format!(
            "habit '{}' does not use checklist '{}'",
            habit.id, checklist.id
        )));
    }
    if entry.checklist_id != checklist.id {
        return Err(ValidationError::inconsistent(format!(
            "entry for checklist '{}' cannot score checklist '{}'",
            entry.checklist_id, checklist.id
        )));
    }

    let progress = entry.progress(checklist);
    match &habit.criteria {
        Some(criteria) => criteria
            .evaluate(&EvalInput::checklist(progress))
            .context_with(|| format!("scoring habit '{}'", habit.id)),
        None => Ok(progress.is_complete()),
    }
}

fn expect_type(habit: &Habit, expected: HabitType) -> Result<()> {
    match habit.habit_type {
        Some(t) if t == expected => Ok(()),
        Some(t) => Err(ValidationError::inconsistent(format!(
            "habit '{}' is {}, not {}",
            habit.id,
            t.as_str(),
            expected.as_str()
        ))),
        None => Err(ValidationError::required("habit_type is required")),
    }
}

fn value_kind(habit: &Habit) -> Result<FieldKind> {
    habit
        .field_kind()
        .ok_or_else(|| ValidationError::required("field type is required"))
}
