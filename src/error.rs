//! Error types for budget replay.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for budget operations.
#[derive(Debug, Error)]
pub enum BudgetError {
    /// Malformed version token, filename, or structured document.
    #[error("Format error: {message} (in {raw:?})")]
    Format { raw: String, message: String },

    /// A directory or file pattern was absent or ambiguous.
    #[error("Structure error: expected {expected}, found {found}")]
    Structure { expected: String, found: String },

    /// Requested replay version is not available.
    #[error("Version {requested} is not available (valid: {valid:?})")]
    Range { requested: String, valid: Vec<u64> },

    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Budget is locked by another process")]
    Locked,
}

impl BudgetError {
    pub(crate) fn format(raw: impl Into<String>, message: impl Into<String>) -> Self {
        BudgetError::Format {
            raw: raw.into(),
            message: message.into(),
        }
    }

    pub(crate) fn structure(expected: impl Into<String>, found: impl Into<String>) -> Self {
        BudgetError::Structure {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Map an I/O error on `path`, keeping missing files distinct.
    pub(crate) fn from_io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            BudgetError::NotFound(path.into())
        } else {
            BudgetError::Io(err)
        }
    }

    /// Taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BudgetError::Format { .. } => ErrorKind::Format,
            BudgetError::Structure { .. } => ErrorKind::Structure,
            BudgetError::Range { .. } => ErrorKind::Range,
            BudgetError::NotFound(_) => ErrorKind::NotFound,
            BudgetError::Io(_) => ErrorKind::Io,
            BudgetError::Serialization(_) => ErrorKind::Serialization,
            BudgetError::Locked => ErrorKind::Locked,
        }
    }
}

/// Error kinds, stable across releases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Format,
    Structure,
    Range,
    NotFound,
    Io,
    Serialization,
    Locked,
}

impl ErrorKind {
    /// Process exit code a command-line front end should use for this kind.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Range => 64,
            ErrorKind::Format => 65,
            ErrorKind::Structure => 66,
            ErrorKind::NotFound => 67,
            ErrorKind::Serialization => 70,
            ErrorKind::Io => 74,
            ErrorKind::Locked => 75,
        }
    }
}

impl From<serde_json::Error> for BudgetError {
    fn from(e: serde_json::Error) -> Self {
        BudgetError::Serialization(e.to_string())
    }
}

/// An input that was skipped without failing the whole operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedItem {
    /// File the item came from.
    pub source: PathBuf,
    /// Entity or record identifier within the file, if any.
    pub item: Option<String>,
    pub reason: String,
}

impl SkippedItem {
    pub(crate) fn new(
        source: impl Into<PathBuf>,
        item: Option<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            item,
            reason: reason.into(),
        }
    }
}

/// Result type for budget operations.
pub type Result<T> = std::result::Result<T, BudgetError>;
