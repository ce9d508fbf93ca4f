//! The host boundary.
//!
//! The engine never reaches into a media server directly. Everything it
//! needs beyond the inline [`MediaItem`] metadata is asked for through
//! [`LibraryAdapter`], which the host implements. [`LibraryIndex`] is the
//! in-memory implementation used by the CLI and the tests.
//!
//! [`LibraryIndex`]: crate::index::LibraryIndex

use std::collections::HashMap;

use tracing::warn;

use crate::error::Result;
use crate::types::{ItemId, ItemKind, MediaItem, Person, User, UserData, UserId};

/// Lookups the engine needs from the host library.
///
/// `Send + Sync` so one adapter can serve the parallel cheap pass.
pub trait LibraryAdapter: Send + Sync {
    /// Items of the given coarse kinds visible to `user`, in catalog order
    fn items_for_user(&self, user: &User, kinds: &[ItemKind]) -> Result<Vec<MediaItem>>;

    /// Single item by id (parent series, reference items)
    fn get_item(&self, id: ItemId) -> Option<MediaItem>;

    /// Resolve a user; `None` when no such account exists
    fn get_user(&self, id: UserId) -> Option<User>;

    /// Play state of `item` for `user`; `Ok(None)` when the user never touched it
    fn get_user_data(&self, user: &User, item: &MediaItem) -> Result<Option<UserData>>;

    /// Cast and crew credited on `item`
    fn get_people(&self, item: &MediaItem) -> Result<Vec<Person>>;

    /// Cast and crew for many items at once.
    ///
    /// Hosts backed by a database should override this with a single query;
    /// the default falls back to one lookup per item. Failed items are
    /// logged and left out of the map.
    fn get_people_batch(&self, items: &[&MediaItem]) -> HashMap<ItemId, Vec<Person>> {
        items
            .iter()
            .filter_map(|item| match self.get_people(item) {
                Ok(people) => Some((item.id, people)),
                Err(e) => {
                    warn!("Failed to read people of '{}': {}", item.name, e);
                    None
                }
            })
            .collect()
    }

    /// Languages of the audio streams of `item`
    fn get_audio_languages(&self, item: &MediaItem) -> Result<Vec<String>>;

    /// Names of the collections that contain `item`
    fn get_collections(&self, item: &MediaItem) -> Result<Vec<String>>;

    /// All episodes of a series, in any order
    fn get_episodes(&self, series_id: ItemId) -> Result<Vec<MediaItem>>;
}
