//! Validation errors shared by every model in the crate.

/// Result type for validation and CRUD operations.
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Broad category of a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required field is missing or blank.
    Structural,
    /// A date, time, number or ID failed to parse.
    Format,
    /// A key that must be unique appears twice.
    Uniqueness,
    /// Two or more fields disagree with each other.
    Consistency,
    /// A reference points at something that does not exist.
    CrossReference,
}

/// Errors produced while validating or mutating the data model.
///
/// Validators stop at the first violation. Positional context is layered on
/// with [`ValidationError::context`], so the rendered message reads like
/// `day entry at index 2: goal entry at index 0: habit_id is required`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Required field missing or blank
    #[error("{0}")]
    Required(String),

    /// Unparsable date/time/number or malformed ID
    #[error("{0}")]
    Format(String),

    /// Duplicate key
    #[error("{0}")]
    Duplicate(String),

    /// Cross-field inconsistency
    #[error("{0}")]
    Inconsistent(String),

    /// Reference to an entity that does not exist
    #[error("{0}")]
    MissingReference(String),

    /// Another error with positional context prepended
    #[error("{context}: {source}")]
    Context {
        /// Where the error happened
        context: String,
        /// Underlying error
        #[source]
        source: Box<ValidationError>,
    },
}

impl ValidationError {
    /// Shorthand for a structural error.
    pub fn required(msg: impl Into<String>) -> Self {
        Self::Required(msg.into())
    }

    /// Shorthand for a format error.
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Shorthand for a uniqueness error.
    pub fn duplicate(msg: impl Into<String>) -> Self {
        Self::Duplicate(msg.into())
    }

    /// Shorthand for a consistency error.
    pub fn inconsistent(msg: impl Into<String>) -> Self {
        Self::Inconsistent(msg.into())
    }

    /// Shorthand for a cross-reference error.
    pub fn missing_reference(msg: impl Into<String>) -> Self {
        Self::MissingReference(msg.into())
    }

    /// Wrap this error with positional context.
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Category of the innermost error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Required(_) => ErrorKind::Structural,
            Self::Format(_) => ErrorKind::Format,
            Self::Duplicate(_) => ErrorKind::Uniqueness,
            Self::Inconsistent(_) => ErrorKind::Consistency,
            Self::MissingReference(_) => ErrorKind::CrossReference,
            Self::Context { source, .. } => source.kind(),
        }
    }
}

/// Adds positional context to the error side of a [`Result`].
pub(crate) trait ResultExt<T> {
    fn context_with(self, f: impl FnOnce() -> String) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context_with(self, f: impl FnOnce() -> String) -> Result<T> {
        self.map_err(|e| e.context(f()))
    }
}
