//! Field types - what kind of value a habit records.

use crate::error::{Result, ValidationError};
use crate::value::EntryValue;
use serde::{Deserialize, Serialize};

/// Allowed `format` for time fields.
pub const TIME_FORMAT_HH_MM: &str = "HH:MM";

/// Allowed `format` values for duration fields.
pub const DURATION_FORMATS: &[&str] = &["HH:MM:SS", "minutes", "seconds"];

/// Kind of value a habit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Free text
    Text,
    /// Yes/no
    Boolean,
    /// Non-negative whole number
    UnsignedInt,
    /// Non-negative decimal
    UnsignedDecimal,
    /// Signed decimal
    Decimal,
    /// Time of day
    Time,
    /// Elapsed time
    Duration,
    /// Completion of a checklist
    Checklist,
}

impl FieldKind {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Boolean => "boolean",
            FieldKind::UnsignedInt => "unsigned_int",
            FieldKind::UnsignedDecimal => "unsigned_decimal",
            FieldKind::Decimal => "decimal",
            FieldKind::Time => "time",
            FieldKind::Duration => "duration",
            FieldKind::Checklist => "checklist",
        }
    }

    /// Kinds whose criteria carry comparable numeric bounds.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldKind::UnsignedInt
                | FieldKind::UnsignedDecimal
                | FieldKind::Decimal
                | FieldKind::Duration
        )
    }

    /// Kinds that reject negative values.
    pub fn is_unsigned(&self) -> bool {
        matches!(self, FieldKind::UnsignedInt | FieldKind::UnsignedDecimal)
    }
}

/// Field type definition for a habit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldType {
    /// Value kind (required)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FieldKind>,

    /// Multi-line text input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiline: Option<bool>,

    /// Pre-filled value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<EntryValue>,

    /// Display unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// Lower bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    /// Upper bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    /// Input/display format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Referenced checklist (checklist kind only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checklist_id: Option<String>,
}

impl FieldType {
    /// Field type of the given kind with no other settings.
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind: Some(kind),
            ..Default::default()
        }
    }

    /// Checklist field type pointing at `checklist_id`.
    pub fn checklist(checklist_id: impl Into<String>) -> Self {
        Self {
            kind: Some(FieldKind::Checklist),
            checklist_id: Some(checklist_id.into()),
            ..Default::default()
        }
    }

    /// Set bounds.
    pub fn with_bounds(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Set the format.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Referenced checklist, if non-blank.
    pub fn checklist_ref(&self) -> Option<&str> {
        self.checklist_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Check the field type on its own.
    pub fn validate(&self) -> Result<()> {
        let kind = self
            .kind
            .ok_or_else(|| ValidationError::required("field type is required"))?;

        if kind.is_unsigned() {
            if let Some(min) = self.min {
                if min < 0.0 {
                    return Err(ValidationError::inconsistent(format!(
                        "min value cannot be negative for {} fields",
                        kind.as_str()
                    )));
                }
            }
        }

        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(ValidationError::inconsistent(format!(
                    "min value ({}) cannot be greater than max value ({})",
                    min, max
                )));
            }
        }

        match kind {
            FieldKind::Time => {
                if let Some(format) = self.format.as_deref().filter(|f| !f.is_empty()) {
                    if format != TIME_FORMAT_HH_MM {
                        return Err(ValidationError::format(format!(
                            "invalid time format '{}': must be '{}'",
                            format, TIME_FORMAT_HH_MM
                        )));
                    }
                }
            }
            FieldKind::Duration => {
                if let Some(format) = self.format.as_deref().filter(|f| !f.is_empty()) {
                    if !DURATION_FORMATS.contains(&format) {
                        return Err(ValidationError::format(format!(
                            "invalid duration format '{}': must be one of {}",
                            format,
                            DURATION_FORMATS.join(", ")
                        )));
                    }
                }
            }
            FieldKind::Checklist => {
                if self.checklist_ref().is_none() {
                    return Err(ValidationError::required(
                        "checklist_id is required for checklist field type",
                    ));
                }
            }
            _ => {}
        }

        Ok(())
    }
}
