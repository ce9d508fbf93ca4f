//! Error types for the library crate.
//!
//! Adapter implementations report lookup failures through [`LibraryError`];
//! the pipeline decides per lookup whether a failure degrades a feature or
//! drops the item.

use thiserror::Error;

/// Errors that can occur while loading a library or answering lookups
#[derive(Error, Debug)]
pub enum LibraryError {
    /// Snapshot file could not be found or opened
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading a snapshot
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Snapshot JSON was malformed
    #[error("Parse error in {file}: {reason}")]
    ParseError { file: String, reason: String },

    /// A field had an invalid value
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// Referenced entity doesn't exist (e.g., play state for an unknown item)
    #[error("Missing reference: {entity} with id {id}")]
    MissingReference { entity: String, id: String },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, LibraryError>;
