//! Spaced-repetition review state.
//!
//! Scheduling happens elsewhere; this module only holds the numbers and
//! checks that they stay inside the ranges the scheduler relies on.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::timestamp::parse_date;

/// Lowest allowed easiness factor.
pub const MIN_EASINESS: f64 = 1.3;

/// Highest allowed easiness factor.
pub const MAX_EASINESS: f64 = 5.0;

/// Starting easiness factor for new items.
pub const DEFAULT_EASINESS: f64 = 2.5;

/// Review state of one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SrsData {
    /// SM-2 easiness factor
    pub easiness_factor: f64,

    /// Days until the next review
    #[serde(default)]
    pub interval_days: i64,

    /// Consecutive successful reviews
    #[serde(default)]
    pub repetitions: u32,

    /// All reviews ever
    #[serde(default)]
    pub total_reviews: u32,

    /// Next review date (`YYYY-MM-DD`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,

    /// Last review date (`YYYY-MM-DD`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_review: Option<String>,
}

impl Default for SrsData {
    fn default() -> Self {
        Self {
            easiness_factor: DEFAULT_EASINESS,
            interval_days: 0,
            repetitions: 0,
            total_reviews: 0,
            due_date: None,
            last_review: None,
        }
    }
}

impl SrsData {
    /// Check numeric bounds and date ordering.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_EASINESS..=MAX_EASINESS).contains(&self.easiness_factor) {
            return Err(ValidationError::inconsistent(format!(
                "easiness factor {:.2} must be between {:.1} and {:.1}",
                self.easiness_factor, MIN_EASINESS, MAX_EASINESS
            )));
        }
        if self.interval_days < 0 {
            return Err(ValidationError::inconsistent(format!(
                "interval_days cannot be negative: {}",
                self.interval_days
            )));
        }
        if self.repetitions > self.total_reviews {
            return Err(ValidationError::inconsistent(format!(
                "repetitions ({}) cannot exceed total_reviews ({})",
                self.repetitions, self.total_reviews
            )));
        }

        let due = parse_optional("due_date", self.due_date.as_deref())?;
        let last = parse_optional("last_review", self.last_review.as_deref())?;
        if let (Some(due), Some(last)) = (due, last) {
            if last > due {
                return Err(ValidationError::inconsistent(format!(
                    "last_review {} is after due_date {}",
                    last, due
                )));
            }
        }
        Ok(())
    }
}

fn parse_optional(field: &str, value: Option<&str>) -> Result<Option<chrono::NaiveDate>> {
    match value.filter(|s| !s.is_empty()) {
        Some(s) => parse_date(s)
            .map(Some)
            .map_err(|e| e.context(format!("invalid {}", field))),
        None => Ok(None),
    }
}
