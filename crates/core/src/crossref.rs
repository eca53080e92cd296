//! Checks that span more than one file: checklist habits against the
//! checklist templates, and checklist completions against the templates
//! they claim to record.

use crate::checklist::{ChecklistEntriesLog, ChecklistSchema};
use crate::error::{Result, ResultExt, ValidationError};
use crate::habit::Habit;
use crate::schema::Schema;
use crate::Normalized;

impl Habit {
    /// Validate, then confirm that a checklist habit's `checklist_id` names
    /// an existing checklist according to `exists`.
    ///
    /// `exists` is only called once base validation has passed.
    pub fn validate_with_checklist_context<F>(&self, exists: F) -> Result<Normalized<Habit>>
    where
        F: Fn(&str) -> bool,
    {
        let normalized = self.normalize()?;
        if let Some(checklist_id) = normalized.value.checklist_id() {
            if !exists(checklist_id) {
                return Err(ValidationError::missing_reference(format!(
                    "references non-existent checklist '{}'",
                    checklist_id
                )));
            }
        }
        Ok(normalized)
    }
}

impl Schema {
    /// [`Schema::normalize`] plus the checklist reference check for every
    /// checklist habit.
    ///
    /// References resolve against the normalized templates, so a checklist
    /// stored without an ID is found under the ID derived from its title.
    pub fn normalize_with_checklists(
        &self,
        checklists: &ChecklistSchema,
    ) -> Result<Normalized<Schema>> {
        let checklists = normalized_templates(checklists)?;
        let normalized = self.normalize()?;
        for (i, habit) in normalized.value.habits.iter().enumerate() {
            habit
                .validate_with_checklist_context(|id| checklists.contains(id))
                .context_with(|| format!("habit at index {}", i))?;
        }
        Ok(normalized)
    }
}

impl ChecklistEntriesLog {
    /// Validate, then confirm every recorded checklist and item exists in
    /// `checklists`.
    pub fn validate_against(&self, checklists: &ChecklistSchema) -> Result<()> {
        let checklists = normalized_templates(checklists)?;
        self.validate()?;
        for (date, day) in &self.entries {
            for (id, entry) in &day.completed {
                let checklist = checklists.get(id).ok_or_else(|| {
                    ValidationError::missing_reference(format!(
                        "references non-existent checklist '{}'",
                        id
                    ))
                    .context(format!("checklist entries for {}", date))
                })?;
                if let Some(item) = entry
                    .completed_items
                    .keys()
                    .find(|item| !checklist.items.contains(item))
                {
                    return Err(ValidationError::missing_reference(format!(
                        "item '{}' is not part of checklist '{}'",
                        item, id
                    ))
                    .context(format!("checklist entries for {}", date)));
                }
            }
        }
        Ok(())
    }
}

fn normalized_templates(checklists: &ChecklistSchema) -> Result<ChecklistSchema> {
    checklists
        .normalize()
        .map(Normalized::into_inner)
        .context_with(|| "invalid checklist templates".to_string())
}
