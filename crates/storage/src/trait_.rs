//! Storage trait abstraction.

use async_trait::async_trait;
use vice_core::yaml::YamlError;
use vice_core::{ChecklistEntriesLog, ChecklistSchema, EntryLog, Schema, ValidationError};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Loaded or about-to-be-saved data is invalid
    #[error("validation error in {file}: {source}")]
    Validation {
        /// File the data belongs to
        file: String,
        /// Underlying error
        #[source]
        source: ValidationError,
    },
}

impl StorageError {
    /// Attach the file name to a codec error.
    pub(crate) fn from_codec(file: &str, err: YamlError) -> Self {
        match err {
            YamlError::Yaml(e) => StorageError::Yaml(e),
            YamlError::Validation(source) => StorageError::Validation {
                file: file.to_string(),
                source,
            },
        }
    }

    /// Attach the file name to a validation error.
    pub(crate) fn invalid(file: &str, source: ValidationError) -> Self {
        StorageError::Validation {
            file: file.to_string(),
            source,
        }
    }
}

/// Storage abstraction for tracker data.
///
/// Loads return validated documents; a missing file loads as an empty
/// document. Saves validate before anything is written.
#[async_trait]
pub trait Storage: Send + Sync {
    // === Habit definitions ===

    /// Load and normalize the habit schema.
    async fn load_schema(&self) -> Result<Schema>;

    /// Save the habit schema.
    async fn save_schema(&mut self, schema: &Schema) -> Result<()>;

    // === Daily entries ===

    /// Load the entry log.
    async fn load_entries(&self) -> Result<EntryLog>;

    /// Save the entry log.
    async fn save_entries(&mut self, log: &EntryLog) -> Result<()>;

    // === Checklists ===

    /// Load and normalize the checklist templates.
    async fn load_checklists(&self) -> Result<ChecklistSchema>;

    /// Save the checklist templates.
    async fn save_checklists(&mut self, checklists: &ChecklistSchema) -> Result<()>;

    /// Load the checklist completion log.
    async fn load_checklist_entries(&self) -> Result<ChecklistEntriesLog>;

    /// Save the checklist completion log.
    async fn save_checklist_entries(&mut self, log: &ChecklistEntriesLog) -> Result<()>;

    // === Cross-file checks ===

    /// Check that checklist habits and checklist completions only reference
    /// checklists that exist.
    async fn check_references(&self) -> Result<()>;
}
