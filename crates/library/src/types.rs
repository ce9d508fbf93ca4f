//! Core domain types for a media library.
//!
//! These are the shapes the host hands to the engine: items, users and
//! per-user play state. Everything here is plain data; lookups that cost
//! something (people, streams, collections, episodes) live behind the
//! [`LibraryAdapter`](crate::adapter::LibraryAdapter) trait instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::LibraryError;

// =============================================================================
// Type Aliases
// =============================================================================

/// Unique identifier for a library item
pub type ItemId = Uuid;

/// Unique identifier for a library user
pub type UserId = Uuid;

/// Runtime is stored in whole seconds; rules and limits work in minutes.
pub const SECONDS_PER_MINUTE: f64 = 60.0;

// =============================================================================
// Item Kinds
// =============================================================================

/// Coarse item type, used both for list scope and the `ItemType` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemKind {
    Movie,
    Series,
    Season,
    Episode,
    Audio,
    MusicVideo,
    Video,
    Photo,
    Book,
    AudioBook,
}

impl ItemKind {
    /// Name as it appears in rule files and in the `ItemType` feature
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Movie => "Movie",
            ItemKind::Series => "Series",
            ItemKind::Season => "Season",
            ItemKind::Episode => "Episode",
            ItemKind::Audio => "Audio",
            ItemKind::MusicVideo => "MusicVideo",
            ItemKind::Video => "Video",
            ItemKind::Photo => "Photo",
            ItemKind::Book => "Book",
            ItemKind::AudioBook => "AudioBook",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movie" => Ok(ItemKind::Movie),
            "series" => Ok(ItemKind::Series),
            "season" => Ok(ItemKind::Season),
            "episode" => Ok(ItemKind::Episode),
            "audio" => Ok(ItemKind::Audio),
            "musicvideo" => Ok(ItemKind::MusicVideo),
            "video" => Ok(ItemKind::Video),
            "photo" => Ok(ItemKind::Photo),
            "book" => Ok(ItemKind::Book),
            "audiobook" => Ok(ItemKind::AudioBook),
            _ => Err(LibraryError::InvalidValue {
                field: "kind".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

// =============================================================================
// Item Type
// =============================================================================

/// A single catalog entry.
///
/// Only the cheap, always-present metadata is carried inline. Optional
/// values stay `Option` here; normalization to feature defaults happens in
/// the pipeline's feature extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: ItemId,
    pub kind: ItemKind,
    pub name: String,
    #[serde(default)]
    pub sort_name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub production_year: Option<i32>,
    #[serde(default)]
    pub community_rating: Option<f32>,
    #[serde(default)]
    pub critic_rating: Option<f32>,
    #[serde(default)]
    pub official_rating: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub studios: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Runtime in whole seconds
    #[serde(default)]
    pub runtime_seconds: Option<u64>,
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub premiere_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub path: Option<String>,

    // Episode hierarchy
    #[serde(default)]
    pub series_id: Option<ItemId>,
    #[serde(default)]
    pub series_name: Option<String>,
    #[serde(default)]
    pub season_number: Option<i32>,
    #[serde(default)]
    pub episode_number: Option<i32>,

    // Music
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub artists: Vec<String>,
}

impl MediaItem {
    /// Create an item with only identity, kind and name set.
    pub fn new(id: ItemId, kind: ItemKind, name: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            sort_name: None,
            overview: None,
            production_year: None,
            community_rating: None,
            critic_rating: None,
            official_rating: None,
            genres: Vec::new(),
            studios: Vec::new(),
            tags: Vec::new(),
            runtime_seconds: None,
            date_created: None,
            premiere_date: None,
            date_modified: None,
            path: None,
            series_id: None,
            series_name: None,
            season_number: None,
            episode_number: None,
            album: None,
            artists: Vec::new(),
        }
    }

    /// Runtime in minutes, zero when unknown
    pub fn runtime_minutes(&self) -> f64 {
        self.runtime_seconds
            .map(|secs| secs as f64 / SECONDS_PER_MINUTE)
            .unwrap_or(0.0)
    }

    /// Name used for display ordering: the sort name when set, otherwise the name
    pub fn sort_key(&self) -> &str {
        self.sort_name.as_deref().unwrap_or(&self.name)
    }

    /// Last path segment, empty when the item has no path
    pub fn file_name(&self) -> &str {
        self.path
            .as_deref()
            .and_then(|p| p.rsplit(['/', '\\']).next())
            .unwrap_or("")
    }
}

// =============================================================================
// People
// =============================================================================

/// Credited role of a person on an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PersonRole {
    Actor,
    GuestStar,
    Director,
    Writer,
    Producer,
    Composer,
    Other,
}

/// Cast or crew member credited on an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub role: PersonRole,
}

impl Person {
    pub fn new(name: impl Into<String>, role: PersonRole) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }
}

// =============================================================================
// Users and Play State
// =============================================================================

/// A library account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
}

/// Per-user play state for one item.
///
/// A missing record means "never touched": not played, zero plays,
/// not a favorite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    #[serde(default)]
    pub play_count: u32,
    #[serde(default)]
    pub played: bool,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub last_played: Option<DateTime<Utc>>,
}

impl UserData {
    /// Whether the item counts as watched
    pub fn is_played(&self) -> bool {
        self.played || self.play_count > 0
    }
}

// =============================================================================
// Collections
// =============================================================================

/// A named box set grouping arbitrary items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: ItemId,
    pub name: String,
    #[serde(default)]
    pub item_ids: Vec<ItemId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_kind_round_trip_names() {
        assert_eq!("episode".parse::<ItemKind>().unwrap(), ItemKind::Episode);
        assert_eq!("MusicVideo".parse::<ItemKind>().unwrap(), ItemKind::MusicVideo);
        assert!("podcast".parse::<ItemKind>().is_err());
    }

    #[test]
    fn test_runtime_minutes() {
        let mut item = MediaItem::new(Uuid::new_v4(), ItemKind::Movie, "Heat");
        assert_eq!(item.runtime_minutes(), 0.0);
        item.runtime_seconds = Some(90 * 60);
        assert_eq!(item.runtime_minutes(), 90.0);
    }

    #[test]
    fn test_file_name_handles_both_separators() {
        let mut item = MediaItem::new(Uuid::new_v4(), ItemKind::Movie, "Heat");
        assert_eq!(item.file_name(), "");
        item.path = Some("/media/movies/Heat (1995)/Heat.mkv".to_string());
        assert_eq!(item.file_name(), "Heat.mkv");
        item.path = Some("D:\\movies\\Heat.mkv".to_string());
        assert_eq!(item.file_name(), "Heat.mkv");
    }

    #[test]
    fn test_user_data_played() {
        let mut data = UserData::default();
        assert!(!data.is_played());
        data.play_count = 2;
        assert!(data.is_played());
    }
}
