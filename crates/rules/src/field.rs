//! The closed vocabulary of fields a condition can test.
//!
//! Each [`Field`] knows its value type and its extraction cost tier. The
//! compiler dispatches on these at compile time, so an unknown field name is
//! a compile failure for one condition instead of a lookup miss per item.

use std::fmt;
use std::str::FromStr;

use crate::error::RuleError;
use crate::model::Condition;

/// Every feature a rule may reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    // Text
    Name,
    SeriesName,
    OfficialRating,
    Overview,
    ItemType,
    FolderPath,
    FileName,
    Album,

    // Lists
    Genres,
    Studios,
    Tags,
    Artists,
    People,
    Actors,
    Directors,
    Writers,
    Producers,
    AudioLanguages,
    Collections,

    // Numbers
    ProductionYear,
    CommunityRating,
    CriticRating,
    RuntimeMinutes,
    SeasonNumber,
    EpisodeNumber,

    // Dates
    DateCreated,
    ReleaseDate,
    DateModified,

    // Per-user
    IsPlayed,
    IsFavorite,
    PlayCount,
    LastPlayed,
    NextUnwatched,

    /// Scored against reference items instead of compiled to a predicate
    SimilarTo,
}

/// Shape of the value a field yields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    TextList,
    Number,
    Date,
    Boolean,
}

/// Extraction cost tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FieldCost {
    /// Inline metadata or a single per-item play-state lookup
    Cheap,
    /// Cross-item or external lookups
    Expensive,
}

impl Field {
    pub const ALL: [Field; 34] = [
        Field::Name,
        Field::SeriesName,
        Field::OfficialRating,
        Field::Overview,
        Field::ItemType,
        Field::FolderPath,
        Field::FileName,
        Field::Album,
        Field::Genres,
        Field::Studios,
        Field::Tags,
        Field::Artists,
        Field::People,
        Field::Actors,
        Field::Directors,
        Field::Writers,
        Field::Producers,
        Field::AudioLanguages,
        Field::Collections,
        Field::ProductionYear,
        Field::CommunityRating,
        Field::CriticRating,
        Field::RuntimeMinutes,
        Field::SeasonNumber,
        Field::EpisodeNumber,
        Field::DateCreated,
        Field::ReleaseDate,
        Field::DateModified,
        Field::IsPlayed,
        Field::IsFavorite,
        Field::PlayCount,
        Field::LastPlayed,
        Field::NextUnwatched,
        Field::SimilarTo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::SeriesName => "SeriesName",
            Field::OfficialRating => "OfficialRating",
            Field::Overview => "Overview",
            Field::ItemType => "ItemType",
            Field::FolderPath => "FolderPath",
            Field::FileName => "FileName",
            Field::Album => "Album",
            Field::Genres => "Genres",
            Field::Studios => "Studios",
            Field::Tags => "Tags",
            Field::Artists => "Artists",
            Field::People => "People",
            Field::Actors => "Actors",
            Field::Directors => "Directors",
            Field::Writers => "Writers",
            Field::Producers => "Producers",
            Field::AudioLanguages => "AudioLanguages",
            Field::Collections => "Collections",
            Field::ProductionYear => "ProductionYear",
            Field::CommunityRating => "CommunityRating",
            Field::CriticRating => "CriticRating",
            Field::RuntimeMinutes => "RuntimeMinutes",
            Field::SeasonNumber => "SeasonNumber",
            Field::EpisodeNumber => "EpisodeNumber",
            Field::DateCreated => "DateCreated",
            Field::ReleaseDate => "ReleaseDate",
            Field::DateModified => "DateModified",
            Field::IsPlayed => "IsPlayed",
            Field::IsFavorite => "IsFavorite",
            Field::PlayCount => "PlayCount",
            Field::LastPlayed => "LastPlayed",
            Field::NextUnwatched => "NextUnwatched",
            Field::SimilarTo => "SimilarTo",
        }
    }

    pub fn value_kind(&self) -> ValueKind {
        match self {
            Field::Name
            | Field::SeriesName
            | Field::OfficialRating
            | Field::Overview
            | Field::ItemType
            | Field::FolderPath
            | Field::FileName
            | Field::Album
            | Field::SimilarTo => ValueKind::Text,
            Field::Genres
            | Field::Studios
            | Field::Tags
            | Field::Artists
            | Field::People
            | Field::Actors
            | Field::Directors
            | Field::Writers
            | Field::Producers
            | Field::AudioLanguages
            | Field::Collections => ValueKind::TextList,
            Field::ProductionYear
            | Field::CommunityRating
            | Field::CriticRating
            | Field::RuntimeMinutes
            | Field::SeasonNumber
            | Field::EpisodeNumber
            | Field::PlayCount => ValueKind::Number,
            Field::DateCreated | Field::ReleaseDate | Field::DateModified | Field::LastPlayed => {
                ValueKind::Date
            }
            Field::IsPlayed | Field::IsFavorite | Field::NextUnwatched => ValueKind::Boolean,
        }
    }

    /// Cost tier ignoring per-condition modifiers
    pub fn base_cost(&self) -> FieldCost {
        match self {
            Field::SeriesName
            | Field::People
            | Field::Actors
            | Field::Directors
            | Field::Writers
            | Field::Producers
            | Field::AudioLanguages
            | Field::Collections
            | Field::NextUnwatched
            | Field::SimilarTo => FieldCost::Expensive,
            _ => FieldCost::Cheap,
        }
    }

    /// Whether the value depends on which user is asking
    pub fn is_per_user(&self) -> bool {
        matches!(
            self,
            Field::IsPlayed
                | Field::IsFavorite
                | Field::PlayCount
                | Field::LastPlayed
                | Field::NextUnwatched
        )
    }

    /// Path-like fields compare ordinally; everything else ignores case
    pub fn is_case_sensitive(&self) -> bool {
        matches!(self, Field::FolderPath | Field::FileName)
    }

    pub fn is_people(&self) -> bool {
        matches!(
            self,
            Field::People | Field::Actors | Field::Directors | Field::Writers | Field::Producers
        )
    }
}

/// Cost of evaluating `field` as configured by `condition`
pub fn condition_cost(field: Field, condition: &Condition) -> FieldCost {
    match field {
        Field::Tags if condition.include_parent_series_tags == Some(true) => FieldCost::Expensive,
        _ => field.base_cost(),
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        // A few legacy spellings seen in older rule files
        let wanted = match wanted {
            "Genre" => "Genres",
            "Studio" => "Studios",
            "Tag" => "Tags",
            "Title" => "Name",
            "Runtime" => "RuntimeMinutes",
            "Collection" => "Collections",
            "MediaType" => "ItemType",
            other => other,
        };
        Field::ALL
            .iter()
            .copied()
            .find(|f| f.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| RuleError::UnknownField {
                field: s.to_string(),
            })
    }
}
