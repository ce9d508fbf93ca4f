//! In-memory library with the secondary indices the adapter needs.
//!
//! `LibraryIndex` owns every item, user and play-state record, plus
//! derived lookups (episodes per series, collections per item) built once
//! after loading. It answers the [`LibraryAdapter`] contract without any
//! I/O, which makes it the reference host for the CLI and for tests.

use std::collections::HashMap;

use tracing::debug;

use crate::adapter::LibraryAdapter;
use crate::error::Result;
use crate::types::*;

/// Main data structure that holds a whole library in memory.
#[derive(Debug, Default)]
pub struct LibraryIndex {
    // Primary data stores
    pub(crate) users: HashMap<UserId, User>,
    pub(crate) items: HashMap<ItemId, MediaItem>,
    /// Insertion order, so catalog queries are deterministic
    pub(crate) item_order: Vec<ItemId>,

    // Expensive lookups, keyed by item
    pub(crate) people: HashMap<ItemId, Vec<Person>>,
    pub(crate) audio_languages: HashMap<ItemId, Vec<String>>,
    pub(crate) collections: Vec<Collection>,

    /// Play state per (user, item)
    pub(crate) user_data: HashMap<(UserId, ItemId), UserData>,

    // Secondary indices, rebuilt by `build_secondary_indices`
    pub(crate) series_episodes: HashMap<ItemId, Vec<ItemId>>,
    pub(crate) item_collections: HashMap<ItemId, Vec<String>>,
}

impl LibraryIndex {
    /// Creates a new, empty index
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_item_ref(&self, id: ItemId) -> Option<&MediaItem> {
        self.items.get(&id)
    }

    /// Find an account by display name, case-insensitively
    pub fn find_user_by_name(&self, name: &str) -> Option<&User> {
        self.users
            .values()
            .find(|u| u.name.eq_ignore_ascii_case(name))
    }

    /// Every item in insertion order
    pub fn all_items(&self) -> impl Iterator<Item = &MediaItem> {
        self.item_order.iter().filter_map(|id| self.items.get(id))
    }

    // Mutators used while loading

    pub fn insert_user(&mut self, user: User) {
        self.users.insert(user.id, user);
    }

    /// Insert or replace an item; replacing keeps the original position
    pub fn insert_item(&mut self, item: MediaItem) {
        if !self.items.contains_key(&item.id) {
            self.item_order.push(item.id);
        }
        if let Some(series_id) = item.series_id {
            let episodes = self.series_episodes.entry(series_id).or_default();
            if item.kind == ItemKind::Episode && !episodes.contains(&item.id) {
                episodes.push(item.id);
            }
        }
        self.items.insert(item.id, item);
    }

    pub fn insert_people(&mut self, item_id: ItemId, people: Vec<Person>) {
        self.people.insert(item_id, people);
    }

    pub fn insert_audio_languages(&mut self, item_id: ItemId, languages: Vec<String>) {
        self.audio_languages.insert(item_id, languages);
    }

    pub fn insert_collection(&mut self, collection: Collection) {
        for item_id in &collection.item_ids {
            self.item_collections
                .entry(*item_id)
                .or_default()
                .push(collection.name.clone());
        }
        self.collections.push(collection);
    }

    pub fn insert_user_data(&mut self, user_id: UserId, item_id: ItemId, data: UserData) {
        self.user_data.insert((user_id, item_id), data);
    }

    /// Rebuild the episode and collection indices from the primary stores.
    ///
    /// The incremental inserts keep these current already; this exists for
    /// callers that mutate the primary maps in bulk.
    pub fn build_secondary_indices(&mut self) {
        self.series_episodes.clear();
        for id in &self.item_order {
            if let Some(item) = self.items.get(id) {
                if let (ItemKind::Episode, Some(series_id)) = (item.kind, item.series_id) {
                    self.series_episodes.entry(series_id).or_default().push(item.id);
                }
            }
        }

        self.item_collections.clear();
        for collection in &self.collections {
            for item_id in &collection.item_ids {
                self.item_collections
                    .entry(*item_id)
                    .or_default()
                    .push(collection.name.clone());
            }
        }
        debug!(
            series = self.series_episodes.len(),
            collections = self.collections.len(),
            "Rebuilt secondary indices"
        );
    }

    /// Get counts for debugging/validation: (users, items, play-state records)
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.users.len(), self.items.len(), self.user_data.len())
    }
}

impl LibraryAdapter for LibraryIndex {
    fn items_for_user(&self, _user: &User, kinds: &[ItemKind]) -> Result<Vec<MediaItem>> {
        Ok(self
            .all_items()
            .filter(|item| kinds.is_empty() || kinds.contains(&item.kind))
            .cloned()
            .collect())
    }

    fn get_item(&self, id: ItemId) -> Option<MediaItem> {
        self.items.get(&id).cloned()
    }

    fn get_user(&self, id: UserId) -> Option<User> {
        self.users.get(&id).cloned()
    }

    fn get_user_data(&self, user: &User, item: &MediaItem) -> Result<Option<UserData>> {
        Ok(self.user_data.get(&(user.id, item.id)).cloned())
    }

    fn get_people(&self, item: &MediaItem) -> Result<Vec<Person>> {
        Ok(self.people.get(&item.id).cloned().unwrap_or_default())
    }

    fn get_audio_languages(&self, item: &MediaItem) -> Result<Vec<String>> {
        Ok(self.audio_languages.get(&item.id).cloned().unwrap_or_default())
    }

    fn get_collections(&self, item: &MediaItem) -> Result<Vec<String>> {
        Ok(self.item_collections.get(&item.id).cloned().unwrap_or_default())
    }

    fn get_episodes(&self, series_id: ItemId) -> Result<Vec<MediaItem>> {
        Ok(self
            .series_episodes
            .get(&series_id)
            .map(|ids| ids.iter().filter_map(|id| self.items.get(id).cloned()).collect())
            .unwrap_or_default())
    }
}
