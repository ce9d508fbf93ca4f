//! Building [`FeatureRecord`]s from library items.
//!
//! The extractor always fills cheap scalars and per-user play state for
//! every user in the [`UserContext`]. Everything behind an adapter lookup
//! that spans more than the item itself is filled only when the
//! [`Requirements`] ask for it.
//!
//! ## Failure policy
//! A failed play-state lookup fails the item. A failed expensive lookup
//! (people, languages, collections, episodes) degrades that one feature to
//! empty and is logged.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use library::{ItemId, ItemKind, LibraryAdapter, MediaItem, Person, User};
use rules::{FeatureRecord, Requirements, UserPlayState};
use tracing::{debug, warn};

use crate::context::UserContext;
use crate::error::{PipelineError, Result};

/// Unix seconds, with missing and sentinel (year <= 1) dates as zero
pub fn epoch_seconds(date: Option<DateTime<Utc>>) -> i64 {
    date.filter(|d| d.year() > 1)
        .map(|d| d.timestamp())
        .unwrap_or(0)
}

/// Lookups shared by every item of one pass, dropped when the pass ends
#[derive(Debug, Default)]
pub struct RefreshCache {
    /// Episodes per series, in season/episode order
    episodes: HashMap<ItemId, Arc<Vec<MediaItem>>>,
    series: HashMap<ItemId, Option<MediaItem>>,
    people: HashMap<ItemId, Vec<Person>>,
    /// First unwatched episode per (series, user key)
    next_unwatched: HashMap<(ItemId, String), Option<ItemId>>,
}

impl RefreshCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Episodes of `series_id`, fetched once per pass
    pub fn episodes(&mut self, adapter: &dyn LibraryAdapter, series_id: ItemId) -> Arc<Vec<MediaItem>> {
        self.episodes
            .entry(series_id)
            .or_insert_with(|| {
                let mut episodes = adapter.get_episodes(series_id).unwrap_or_else(|e| {
                    warn!("Failed to fetch episodes of series {}: {}", series_id, e);
                    Vec::new()
                });
                episodes.sort_by(|a, b| {
                    let key = |e: &MediaItem| {
                        (
                            e.season_number.unwrap_or(i32::MAX),
                            e.episode_number.unwrap_or(i32::MAX),
                        )
                    };
                    key(a).cmp(&key(b)).then_with(|| a.name.cmp(&b.name))
                });
                Arc::new(episodes)
            })
            .clone()
    }

    /// Parent series item, fetched once per pass
    pub fn series(&mut self, adapter: &dyn LibraryAdapter, series_id: ItemId) -> Option<&MediaItem> {
        self.series
            .entry(series_id)
            .or_insert_with(|| adapter.get_item(series_id))
            .as_ref()
    }

    /// Fetch people for every item not yet cached, in one batch call
    pub fn preload_people(&mut self, adapter: &dyn LibraryAdapter, items: &[&MediaItem]) {
        let missing: Vec<&MediaItem> = items
            .iter()
            .copied()
            .filter(|item| !self.people.contains_key(&item.id))
            .collect();
        if missing.is_empty() {
            return;
        }

        let mut loaded = adapter.get_people_batch(&missing);
        for item in &missing {
            let people = loaded.remove(&item.id).unwrap_or_default();
            self.people.insert(item.id, people);
        }
        debug!(items = missing.len(), "Preloaded people");
    }

    pub fn people(&mut self, adapter: &dyn LibraryAdapter, item: &MediaItem) -> Vec<Person> {
        self.people
            .entry(item.id)
            .or_insert_with(|| {
                adapter.get_people(item).unwrap_or_else(|e| {
                    warn!("Failed to fetch people of '{}': {}", item.name, e);
                    Vec::new()
                })
            })
            .clone()
    }
}

/// Builds feature records for one pass
#[derive(Clone, Copy)]
pub struct FeatureExtractor<'a> {
    adapter: &'a dyn LibraryAdapter,
    context: &'a UserContext,
}

impl<'a> FeatureExtractor<'a> {
    pub fn new(adapter: &'a dyn LibraryAdapter, context: &'a UserContext) -> Self {
        Self { adapter, context }
    }

    /// Cheap scalars and play state only. Needs no shared cache, so it can
    /// run on many items in parallel.
    pub fn build_cheap(&self, item: &MediaItem) -> Result<FeatureRecord> {
        let mut record = FeatureRecord::new(
            item.id,
            item.kind,
            self.context.owner_key.clone(),
            self.context.reference_time,
        );

        record.name = item.name.clone();
        record.official_rating = item.official_rating.clone().unwrap_or_default();
        record.overview = item.overview.clone().unwrap_or_default();
        record.folder_path = item.path.clone().unwrap_or_default();
        record.file_name = item.file_name().to_string();
        record.album = item.album.clone().unwrap_or_default();

        record.genres = item.genres.clone();
        record.studios = item.studios.clone();
        record.tags = item.tags.clone();
        record.artists = item.artists.clone();

        record.production_year = item.production_year.map(f64::from);
        record.community_rating = item.community_rating.map(f64::from);
        record.critic_rating = item.critic_rating.map(f64::from);
        record.runtime_minutes = item.runtime_minutes();
        record.season_number = item.season_number.map(f64::from);
        record.episode_number = item.episode_number.map(f64::from);

        record.date_created = epoch_seconds(item.date_created);
        record.release_date = epoch_seconds(item.premiere_date);
        record.date_modified = epoch_seconds(item.date_modified);

        for (key, user) in self.context.users() {
            let state = self.play_state(user, item)?;
            record.user_data.insert(key.clone(), state);
        }

        Ok(record)
    }

    /// Cheap features plus every expensive feature `requirements` asks for
    pub fn build(
        &self,
        item: &MediaItem,
        requirements: &Requirements,
        cache: &mut RefreshCache,
    ) -> Result<FeatureRecord> {
        let record = self.build_cheap(item)?;
        Ok(self.build_from(record, item, requirements, cache))
    }

    /// Complete a record made by [`Self::build_cheap`] with the expensive
    /// features. Expensive lookups degrade instead of failing, so this
    /// cannot fail.
    pub fn build_from(
        &self,
        mut record: FeatureRecord,
        item: &MediaItem,
        requirements: &Requirements,
        cache: &mut RefreshCache,
    ) -> FeatureRecord {
        if !requirements.needs_expensive() {
            return record;
        }

        if requirements.people {
            record.people = cache.people(self.adapter, item);
        }

        if requirements.audio_languages {
            record.audio_languages = self.adapter.get_audio_languages(item).unwrap_or_else(|e| {
                warn!("Failed to read audio streams of '{}': {}", item.name, e);
                Vec::new()
            });
        }

        if requirements.collections {
            record.collections = self.adapter.get_collections(item).unwrap_or_else(|e| {
                warn!("Failed to read collections of '{}': {}", item.name, e);
                Vec::new()
            });
        }

        if requirements.series_name {
            record.series_name = self.series_name(item, cache);
        }

        if requirements.parent_series_tags {
            if let Some(series) = item.series_id.and_then(|id| cache.series(self.adapter, id)) {
                for tag in &series.tags {
                    if !record.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                        record.tags.push(tag.clone());
                    }
                }
            }
        }

        if requirements.next_unwatched {
            if let (ItemKind::Episode, Some(series_id)) = (item.kind, item.series_id) {
                for (key, user) in self.context.users() {
                    let next = self.next_unwatched(
                        series_id,
                        key,
                        user,
                        requirements.include_unwatched_series,
                        cache,
                    );
                    record.next_unwatched.insert(key.clone(), next == Some(item.id));
                }
            }
        }

        record
    }

    fn play_state(&self, user: &User, item: &MediaItem) -> Result<UserPlayState> {
        let data = self
            .adapter
            .get_user_data(user, item)
            .map_err(|source| PipelineError::Item {
                item: item.id,
                source,
            })?
            .unwrap_or_default();

        Ok(UserPlayState {
            played: data.is_played(),
            play_count: data.play_count,
            is_favorite: data.is_favorite,
            last_played: epoch_seconds(data.last_played),
        })
    }

    fn series_name(&self, item: &MediaItem, cache: &mut RefreshCache) -> String {
        if let Some(name) = item.series_name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        if item.kind == ItemKind::Series {
            return item.name.clone();
        }
        item.series_id
            .and_then(|id| cache.series(self.adapter, id))
            .map(|series| series.name.clone())
            .unwrap_or_default()
    }

    /// First unwatched regular episode of a series for one user.
    ///
    /// Specials (season 0) never count. With `include_unwatched_series`
    /// off, a series the user has not started has no next episode.
    fn next_unwatched(
        &self,
        series_id: ItemId,
        user_key: &str,
        user: &User,
        include_unwatched_series: bool,
        cache: &mut RefreshCache,
    ) -> Option<ItemId> {
        let cache_key = (series_id, user_key.to_string());
        if let Some(cached) = cache.next_unwatched.get(&cache_key) {
            return *cached;
        }

        let episodes = cache.episodes(self.adapter, series_id);
        let mut started = false;
        let mut first_unwatched = None;
        for episode in episodes.iter().filter(|e| e.season_number != Some(0)) {
            let played = self
                .adapter
                .get_user_data(user, episode)
                .ok()
                .flatten()
                .is_some_and(|d| d.is_played());
            if played {
                started = true;
            } else if first_unwatched.is_none() {
                first_unwatched = Some(episode.id);
            }
        }

        let next = if started || include_unwatched_series {
            first_unwatched
        } else {
            None
        };
        cache.next_unwatched.insert(cache_key, next);
        next
    }
}
