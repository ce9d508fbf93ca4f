//! The per-item feature snapshot predicates run against.
//!
//! A [`FeatureRecord`] is built by the pipeline's feature extractor for one
//! item in one filtering pass and dropped right after. Fields that were not
//! requested stay at their defaults (empty lists, `false`, zero dates).
//! Typed accessors map each [`Field`] to its value; the match is exhaustive,
//! so adding a field without an extraction is a compile error.

use std::collections::HashMap;

use library::{ItemId, ItemKind, Person, PersonRole};

use crate::field::Field;

/// Play state of one item for one user, normalized
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserPlayState {
    pub played: bool,
    pub play_count: u32,
    pub is_favorite: bool,
    /// Unix seconds, zero when never played
    pub last_played: i64,
}

#[derive(Debug, Clone)]
pub struct FeatureRecord {
    pub item_id: ItemId,
    pub kind: ItemKind,

    pub name: String,
    pub series_name: String,
    pub official_rating: String,
    pub overview: String,
    pub folder_path: String,
    pub file_name: String,
    pub album: String,

    pub genres: Vec<String>,
    pub studios: Vec<String>,
    pub tags: Vec<String>,
    pub artists: Vec<String>,

    pub production_year: Option<f64>,
    pub community_rating: Option<f64>,
    pub critic_rating: Option<f64>,
    pub runtime_minutes: f64,
    pub season_number: Option<f64>,
    pub episode_number: Option<f64>,

    /// Unix seconds; zero means unknown
    pub date_created: i64,
    pub release_date: i64,
    pub date_modified: i64,

    // Expensive, filled only when requested
    pub people: Vec<Person>,
    pub audio_languages: Vec<String>,
    pub collections: Vec<String>,

    /// Play state keyed by normalized user identity
    pub user_data: HashMap<String, UserPlayState>,
    /// Next-unwatched flag keyed by normalized user identity
    pub next_unwatched: HashMap<String, bool>,
    /// Key of the list owner in the per-user maps
    pub owner_key: String,

    /// Wall-clock instant of the pass, for relative date operators
    pub reference_time: i64,
}

impl FeatureRecord {
    /// Empty record for an item; the extractor fills it in
    pub fn new(item_id: ItemId, kind: ItemKind, owner_key: impl Into<String>, reference_time: i64) -> Self {
        Self {
            item_id,
            kind,
            name: String::new(),
            series_name: String::new(),
            official_rating: String::new(),
            overview: String::new(),
            folder_path: String::new(),
            file_name: String::new(),
            album: String::new(),
            genres: Vec::new(),
            studios: Vec::new(),
            tags: Vec::new(),
            artists: Vec::new(),
            production_year: None,
            community_rating: None,
            critic_rating: None,
            runtime_minutes: 0.0,
            season_number: None,
            episode_number: None,
            date_created: 0,
            release_date: 0,
            date_modified: 0,
            people: Vec::new(),
            audio_languages: Vec::new(),
            collections: Vec::new(),
            user_data: HashMap::new(),
            next_unwatched: HashMap::new(),
            owner_key: owner_key.into(),
            reference_time,
        }
    }

    /// Play state for `user_key`, or the owner when `None`; defaults when absent
    pub fn user_state(&self, user_key: Option<&str>) -> UserPlayState {
        let key = user_key.unwrap_or(&self.owner_key);
        self.user_data.get(key).copied().unwrap_or_default()
    }

    pub fn is_next_unwatched(&self, user_key: Option<&str>) -> bool {
        let key = user_key.unwrap_or(&self.owner_key);
        self.next_unwatched.get(key).copied().unwrap_or(false)
    }

    /// Single-valued text features
    pub fn text(&self, field: Field) -> Option<&str> {
        match field {
            Field::Name | Field::SimilarTo => Some(&self.name),
            Field::SeriesName => Some(&self.series_name),
            Field::OfficialRating => Some(&self.official_rating),
            Field::Overview => Some(&self.overview),
            Field::ItemType => Some(self.kind.as_str()),
            Field::FolderPath => Some(&self.folder_path),
            Field::FileName => Some(&self.file_name),
            Field::Album => Some(&self.album),
            _ => None,
        }
    }

    /// Multi-valued text features
    pub fn list(&self, field: Field) -> Vec<&str> {
        fn strs(values: &[String]) -> Vec<&str> {
            values.iter().map(String::as_str).collect()
        }
        match field {
            Field::Genres => strs(&self.genres),
            Field::Studios => strs(&self.studios),
            Field::Tags => strs(&self.tags),
            Field::Artists => strs(&self.artists),
            Field::AudioLanguages => strs(&self.audio_languages),
            Field::Collections => strs(&self.collections),
            Field::People => self.people.iter().map(|p| p.name.as_str()).collect(),
            Field::Actors => self.people_with(&[PersonRole::Actor, PersonRole::GuestStar]),
            Field::Directors => self.people_with(&[PersonRole::Director]),
            Field::Writers => self.people_with(&[PersonRole::Writer]),
            Field::Producers => self.people_with(&[PersonRole::Producer]),
            _ => Vec::new(),
        }
    }

    /// Numeric features; `None` when the item has no value
    pub fn number(&self, field: Field, user_key: Option<&str>) -> Option<f64> {
        match field {
            Field::ProductionYear => self.production_year,
            Field::CommunityRating => self.community_rating,
            Field::CriticRating => self.critic_rating,
            Field::RuntimeMinutes => Some(self.runtime_minutes),
            Field::SeasonNumber => self.season_number,
            Field::EpisodeNumber => self.episode_number,
            Field::PlayCount => Some(self.user_state(user_key).play_count as f64),
            _ => None,
        }
    }

    /// Date features as Unix seconds; zero when unknown
    pub fn date(&self, field: Field, user_key: Option<&str>) -> i64 {
        match field {
            Field::DateCreated => self.date_created,
            Field::ReleaseDate => self.release_date,
            Field::DateModified => self.date_modified,
            Field::LastPlayed => self.user_state(user_key).last_played,
            _ => 0,
        }
    }

    pub fn boolean(&self, field: Field, user_key: Option<&str>) -> bool {
        match field {
            Field::IsPlayed => self.user_state(user_key).played,
            Field::IsFavorite => self.user_state(user_key).is_favorite,
            Field::NextUnwatched => self.is_next_unwatched(user_key),
            _ => false,
        }
    }

    fn people_with(&self, roles: &[PersonRole]) -> Vec<&str> {
        self.people
            .iter()
            .filter(|p| roles.contains(&p.role))
            .map(|p| p.name.as_str())
            .collect()
    }
}
