//! Core trait for ordering matched items.
//!
//! Every sort strategy implements [`Order`] and declares which kind of
//! input it reads, so callers know whether it needs play state or
//! similarity scores prepared.

use std::collections::HashMap;

use library::{ItemId, LibraryAdapter, MediaItem, User};

/// What an ordering reads besides the items themselves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderInput {
    /// Inline item metadata only
    Metadata,
    /// Per-user play statistics of the list owner
    UserStatistics,
    /// Scores from the similarity pass
    Similarity,
    /// Nothing at all
    None,
}

/// Inputs available to an ordering
pub struct OrderContext<'a> {
    pub adapter: &'a dyn LibraryAdapter,
    pub owner: &'a User,
    pub scores: &'a HashMap<ItemId, f64>,
}

/// A sort strategy over matched items.
///
/// ## Design Note
/// - `Send + Sync` so one strategy can be shared between refreshes
/// - Takes ownership of the items and returns them reordered
pub trait Order: Send + Sync {
    /// Name of this ordering (for logging/debugging)
    fn name(&self) -> &str;

    fn input(&self) -> OrderInput;

    fn apply(&self, items: Vec<MediaItem>, context: &OrderContext<'_>) -> Vec<MediaItem>;
}
