//! Habit definitions.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::criteria::{Criteria, REQUIRED_ITEMS_ALL};
use crate::error::{Result, ResultExt, ValidationError};
use crate::field_type::{FieldKind, FieldType};
use crate::id::{generate_id_from_title, is_valid_id};
use crate::Normalized;

/// How a habit is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HabitType {
    /// Pass/fail
    Simple,
    /// Mini/midi/maxi tiers
    Elastic,
    /// Recorded without scoring
    Informational,
    /// Backed by a checklist
    Checklist,
}

impl HabitType {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            HabitType::Simple => "simple",
            HabitType::Elastic => "elastic",
            HabitType::Informational => "informational",
            HabitType::Checklist => "checklist",
        }
    }
}

/// Who decides whether a habit was achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringType {
    /// The user says so
    Manual,
    /// Criteria decide
    Automatic,
}

/// Which way is better for informational values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Larger values are better
    HigherBetter,
    /// Smaller values are better
    LowerBetter,
    /// No preference
    Neutral,
}

/// A trackable habit definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    /// Display title (required)
    #[serde(default)]
    pub title: String,

    /// Slug identifier; derived from the title when empty
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// 1-based position, rewritten on every schema normalization
    #[serde(default)]
    pub position: usize,

    /// Longer description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Tracking style
    #[serde(default, alias = "goal_type", skip_serializing_if = "Option::is_none")]
    pub habit_type: Option<HabitType>,

    /// Value kind and constraints
    #[serde(default)]
    pub field_type: FieldType,

    /// Manual or automatic scoring
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scoring_type: Option<ScoringType>,

    /// Criteria for simple and checklist habits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria: Option<Criteria>,

    /// Lowest elastic tier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mini_criteria: Option<Criteria>,

    /// Middle elastic tier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub midi_criteria: Option<Criteria>,

    /// Highest elastic tier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxi_criteria: Option<Criteria>,

    /// Preferred direction for informational values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,

    /// Question shown when recording
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    /// Extra guidance shown when recording
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
}

impl Habit {
    /// New habit with a title, type and field type. The ID is generated on
    /// normalization.
    pub fn new(title: impl Into<String>, habit_type: HabitType, field_type: FieldType) -> Self {
        Self {
            title: title.into(),
            habit_type: Some(habit_type),
            field_type,
            ..Default::default()
        }
    }

    /// Set an explicit ID.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the scoring type.
    pub fn with_scoring(mut self, scoring: ScoringType) -> Self {
        self.scoring_type = Some(scoring);
        self
    }

    /// Set the criteria.
    pub fn with_criteria(mut self, criteria: Criteria) -> Self {
        self.criteria = Some(criteria);
        self
    }

    /// Set all three elastic tiers.
    pub fn with_tiers(mut self, mini: Criteria, midi: Criteria, maxi: Criteria) -> Self {
        self.mini_criteria = Some(mini);
        self.midi_criteria = Some(midi);
        self.maxi_criteria = Some(maxi);
        self
    }

    /// Declared field kind, if any.
    pub fn field_kind(&self) -> Option<FieldKind> {
        self.field_type.kind
    }

    /// Whether scoring is automatic.
    pub fn is_automatic(&self) -> bool {
        self.scoring_type == Some(ScoringType::Automatic)
    }

    /// Referenced checklist for checklist habits.
    pub fn checklist_id(&self) -> Option<&str> {
        match self.habit_type {
            Some(HabitType::Checklist) => self.field_type.checklist_ref(),
            _ => None,
        }
    }

    /// Validate, returning a copy with a generated ID when none was given.
    ///
    /// Checks run in a fixed order and the first failure is returned: title,
    /// ID, habit type, field type, scoring type, then type-specific rules.
    pub fn normalize(&self) -> Result<Normalized<Habit>> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::required("habit title is required"));
        }

        let mut habit = self.clone();
        let mut id_generated = false;
        if habit.id.is_empty() {
            habit.id = generate_id_from_title(&habit.title);
            id_generated = true;
            debug!(id = %habit.id, title = %habit.title, "generated habit id from title");
        }

        if !is_valid_id(&habit.id) {
            return Err(ValidationError::format(format!(
                "invalid habit ID '{}': must contain only lowercase letters, \
                 numbers, and underscores",
                habit.id
            )));
        }

        let habit_type = habit
            .habit_type
            .ok_or_else(|| ValidationError::required("habit_type is required"))?;

        habit
            .field_type
            .validate()
            .context_with(|| "invalid field_type".to_string())?;

        match habit_type {
            HabitType::Simple => habit.validate_simple()?,
            HabitType::Elastic => habit.validate_elastic()?,
            HabitType::Checklist => habit.validate_checklist()?,
            HabitType::Informational => {}
        }

        Ok(Normalized {
            value: habit,
            id_generated,
        })
    }

    /// Validate without keeping the normalized copy.
    pub fn validate(&self) -> Result<()> {
        self.normalize().map(|_| ())
    }

    fn require_scoring_type(&self, habit_type: HabitType) -> Result<ScoringType> {
        self.scoring_type.ok_or_else(|| {
            ValidationError::required(format!(
                "scoring_type is required for {} habits",
                habit_type.as_str()
            ))
        })
    }

    fn validate_simple(&self) -> Result<()> {
        let scoring = self.require_scoring_type(HabitType::Simple)?;
        if scoring == ScoringType::Automatic && self.criteria.is_none() {
            return Err(ValidationError::inconsistent(
                "automatic scoring requires criteria to be defined",
            ));
        }
        Ok(())
    }

    fn validate_elastic(&self) -> Result<()> {
        let scoring = self.require_scoring_type(HabitType::Elastic)?;
        if scoring != ScoringType::Automatic {
            return Ok(());
        }

        let (mini, midi, maxi) = match (
            &self.mini_criteria,
            &self.midi_criteria,
            &self.maxi_criteria,
        ) {
            (Some(mini), Some(midi), Some(maxi)) => (mini, midi, maxi),
            _ => {
                return Err(ValidationError::inconsistent(
                    "elastic habits with automatic scoring require mini_criteria, \
                     midi_criteria, and maxi_criteria",
                ))
            }
        };

        if self.field_kind().is_some_and(|k| k.is_numeric()) {
            validate_tier_order(mini, midi, maxi)?;
        }
        Ok(())
    }

    fn validate_checklist(&self) -> Result<()> {
        let scoring = self.require_scoring_type(HabitType::Checklist)?;

        if self.field_type.kind != Some(FieldKind::Checklist) {
            return Err(ValidationError::inconsistent(
                "checklist habits must use field_type 'checklist'",
            ));
        }
        if self.field_type.checklist_ref().is_none() {
            return Err(ValidationError::required(
                "checklist habits require field_type.checklist_id",
            ));
        }

        if scoring == ScoringType::Automatic {
            let criteria = self.criteria.as_ref().ok_or_else(|| {
                ValidationError::inconsistent("automatic scoring requires criteria to be defined")
            })?;
            let required_items = criteria
                .condition
                .as_ref()
                .and_then(|c| c.checklist_completion())
                .map(|cc| cc.required_items.as_str());
            if required_items != Some(REQUIRED_ITEMS_ALL) {
                return Err(ValidationError::inconsistent(
                    "checklist criteria must specify checklist_completion.required_items: \"all\"",
                ));
            }
        }
        Ok(())
    }
}

/// Tier bounds must not decrease from mini to maxi. Tiers without an
/// extractable bound are not compared.
fn validate_tier_order(mini: &Criteria, midi: &Criteria, maxi: &Criteria) -> Result<()> {
    let (Some(mini), Some(midi), Some(maxi)) =
        (mini.numeric_bound(), midi.numeric_bound(), maxi.numeric_bound())
    else {
        return Ok(());
    };

    if mini > midi {
        return Err(ValidationError::inconsistent(format!(
            "mini criteria value ({:.2}) must be ≤ midi criteria value ({:.2})",
            mini, midi
        )));
    }
    if midi > maxi {
        return Err(ValidationError::inconsistent(format!(
            "midi criteria value ({:.2}) must be ≤ maxi criteria value ({:.2})",
            midi, maxi
        )));
    }
    Ok(())
}
