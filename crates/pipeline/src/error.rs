//! Error types for a filtering pass.

use library::LibraryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// A user referenced by the rule (or the owner) cannot be resolved.
    /// Fatal for the whole pass.
    #[error("User '{user_id}' referenced by the rule does not exist")]
    UserNotFound { user_id: String },

    #[error("Filtering was cancelled after {processed} items")]
    Cancelled { processed: usize },

    /// A cheap lookup failed for one item; the item is skipped
    #[error("Item {item} could not be evaluated: {source}")]
    Item {
        item: uuid::Uuid,
        #[source]
        source: LibraryError,
    },

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("Unknown sort order '{0}'")]
    InvalidOrder(String),

    #[error("Unknown similarity field '{0}'")]
    InvalidSimilarityField(String),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, PipelineError>;
