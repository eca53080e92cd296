//! YAML codec for the four tracker files.
//!
//! Reading never validates; callers decide when to normalize. Writing always
//! validates first so an invalid document never reaches disk.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::checklist::{ChecklistEntriesLog, ChecklistSchema};
use crate::entry::EntryLog;
use crate::error::ValidationError;
use crate::legacy::{Decoded, RawEntryLog};
use crate::schema::Schema;
use crate::value::DecodeMode;

/// Version written into newly created documents.
pub const CURRENT_VERSION: &str = "1.0";

// Plain scalars shaped like `HH:MM` or `YYYY-MM-DD HH:MM:SS` read back as
// sexagesimal numbers or timestamps under YAML 1.1, so they are always quoted.
static TIME_SCALAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?m)^(\s*(?:- )?[A-Za-z_][A-Za-z0-9_]*: )'?",
        r"(\d{2}:\d{2}(?::\d{2})?|\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})'?$",
    ))
    .expect("valid time scalar regex")
});

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum YamlError {
    /// Malformed YAML or an unexpected shape
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The document parsed but is not valid
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, YamlError>;

/// A top-level tracker file.
pub trait Document: Serialize + DeserializeOwned + Clone {
    /// Human readable name, for logs.
    const NAME: &'static str;

    /// Empty document at [`CURRENT_VERSION`].
    fn empty() -> Self;

    /// Validate and return the form that is written to disk.
    fn canonical(&self) -> crate::Result<Cow<'_, Self>>;
}

impl Document for Schema {
    const NAME: &'static str = "habit schema";

    fn empty() -> Self {
        Schema::new(CURRENT_VERSION)
    }

    fn canonical(&self) -> crate::Result<Cow<'_, Self>> {
        self.normalize().map(|n| Cow::Owned(n.value))
    }
}

impl Document for EntryLog {
    const NAME: &'static str = "entry log";

    fn empty() -> Self {
        EntryLog::new(CURRENT_VERSION)
    }

    fn canonical(&self) -> crate::Result<Cow<'_, Self>> {
        self.validate().map(|_| Cow::Borrowed(self))
    }
}

impl Document for ChecklistSchema {
    const NAME: &'static str = "checklist schema";

    fn empty() -> Self {
        ChecklistSchema {
            version: CURRENT_VERSION.to_string(),
            ..Default::default()
        }
    }

    fn canonical(&self) -> crate::Result<Cow<'_, Self>> {
        self.normalize().map(|n| Cow::Owned(n.value))
    }
}

impl Document for ChecklistEntriesLog {
    const NAME: &'static str = "checklist entries";

    fn empty() -> Self {
        ChecklistEntriesLog::new(CURRENT_VERSION)
    }

    fn canonical(&self) -> crate::Result<Cow<'_, Self>> {
        self.validate().map(|_| Cow::Borrowed(self))
    }
}

/// Parse a document. Blank input yields [`Document::empty`].
pub fn from_yaml<T: Document>(yaml: &str) -> Result<T> {
    if yaml.trim().is_empty() {
        return Ok(T::empty());
    }
    Ok(serde_yaml::from_str(yaml)?)
}

/// Validate and render a document in canonical form.
///
/// Habit and checklist schemas are written normalized: generated IDs are
/// filled in and positions renumbered.
pub fn to_yaml<T: Document>(doc: &T) -> Result<String> {
    let canonical = doc.canonical()?;
    render(&*canonical)
}

/// Serialize any record, quoting time-of-day and timestamp scalars.
pub(crate) fn render<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let text = serde_yaml::to_string(value)?;
    Ok(TIME_SCALAR.replace_all(&text, "$1\"$2\"").into_owned())
}

/// Parse an entry log, choosing how values are interpreted.
///
/// With [`DecodeMode::SchemaTyped`] each value is read as its habit's field
/// type from `schema`; habits missing from the schema use the heuristic.
pub fn decode_entry_log(
    yaml: &str,
    mode: DecodeMode,
    schema: Option<&Schema>,
) -> Result<Decoded<EntryLog>> {
    if yaml.trim().is_empty() {
        return Ok(Decoded {
            value: EntryLog::empty(),
            upgraded: 0,
        });
    }
    let raw: RawEntryLog = serde_yaml::from_str(yaml)?;
    Ok(raw.upgrade(mode, schema)?)
}

impl EntryLog {
    /// Parse with values typed by the habit definitions in `schema`.
    pub fn from_yaml_typed(yaml: &str, schema: &Schema) -> Result<EntryLog> {
        decode_entry_log(yaml, DecodeMode::SchemaTyped, Some(schema)).map(|d| d.value)
    }
}
