//! Error types for the IOD schema extractor.
//!
//! Library crates use [`SchemaError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Only fatal conditions are errors. Recoverable anomalies (unparsable rows,
//! unresolved cross-references, unrecognized phrasing) are reported as
//! [`Diagnostic`](crate::Diagnostic)s and never surface here.

use std::path::PathBuf;

/// Top-level error type for all schema extraction operations.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while retrieving a source document.
    #[error("network error: {0}")]
    Network(String),

    /// The source text is not well-formed XML.
    #[error("XML error: {message}")]
    Xml { message: String },

    /// The document cannot be traversed as a DocBook book.
    #[error("document structure error: {message}")]
    Structure { message: String },

    /// An attribute row references a tag the data dictionary does not know.
    #[error("Tag {tag} was not in the dictionary.")]
    UnknownTag { tag: String },

    /// A macro inclusion row points at a table that is not in the document.
    #[error("macro table {table_id} was not found in the document")]
    MissingTable { table_id: String },

    /// A module reference points at a section that is not in the document.
    #[error("module section {section_id} was not found in the document")]
    MissingSection { section_id: String },

    /// A macro table includes itself, directly or through other macros.
    #[error("macro table {table_id} includes itself")]
    MacroCycle { table_id: String },

    /// Rows were left at a depth no sequence claimed.
    #[error("table {table}: rows at depth {depths:?} were not consumed by any sequence")]
    UnconsumedDepth { table: String, depths: Vec<usize> },

    /// Requested IODs that are not defined in the document.
    #[error("IODs {} were not found in part 3 of the standard!", .names.join(", "))]
    IodsNotFound { names: Vec<String> },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (malformed cache file, serialization failure, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SchemaError>;

impl SchemaError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an XML error from any displayable message.
    pub fn xml(msg: impl Into<String>) -> Self {
        Self::Xml {
            message: msg.into(),
        }
    }

    /// Create a structure error from any displayable message.
    pub fn structure(msg: impl Into<String>) -> Self {
        Self::Structure {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
