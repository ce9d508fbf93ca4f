//! Error types surfaced by the engine entry points.

use library::LibraryError;
use pipeline::PipelineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// The owner or a user referenced by a condition does not exist.
    /// The whole refresh is abandoned rather than falling back to the owner.
    #[error("User '{user_id}' referenced by '{field}' was not found")]
    UserNotFound { user_id: String, field: String },

    #[error("Refresh cancelled after {processed} items")]
    Cancelled { processed: usize },

    #[error("Another refresh is still running")]
    Busy,

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[source] PipelineError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, EngineError>;
