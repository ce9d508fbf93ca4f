//! Orderings over inline item metadata.

use std::cmp::Ordering;

use library::MediaItem;

use crate::features::epoch_seconds;
use crate::natural::natural_cmp;
use crate::traits::{Order, OrderContext, OrderInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataKey {
    Name,
    SeriesName,
    ProductionYear,
    CommunityRating,
    CriticRating,
    DateCreated,
    ReleaseDate,
    Runtime,
    SeasonEpisode,
    /// Keep catalog order
    Unordered,
}

/// Sorts by one metadata key, then by natural name.
///
/// Items without a value sort first when ascending and last when
/// descending.
pub struct MetadataOrder {
    key: MetadataKey,
    descending: bool,
}

impl MetadataOrder {
    pub fn new(key: MetadataKey, descending: bool) -> Self {
        Self { key, descending }
    }

    fn compare(&self, a: &MediaItem, b: &MediaItem) -> Ordering {
        fn float(a: Option<f32>, b: Option<f32>) -> Ordering {
            match (a, b) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (x, y) => x.is_some().cmp(&y.is_some()),
            }
        }
        fn series(item: &MediaItem) -> &str {
            item.series_name.as_deref().unwrap_or(&item.name)
        }

        match self.key {
            MetadataKey::Name => natural_cmp(a.sort_key(), b.sort_key()),
            MetadataKey::SeriesName => natural_cmp(series(a), series(b)),
            MetadataKey::ProductionYear => a.production_year.cmp(&b.production_year),
            MetadataKey::CommunityRating => float(a.community_rating, b.community_rating),
            MetadataKey::CriticRating => float(a.critic_rating, b.critic_rating),
            MetadataKey::DateCreated => epoch_seconds(a.date_created).cmp(&epoch_seconds(b.date_created)),
            MetadataKey::ReleaseDate => epoch_seconds(a.premiere_date).cmp(&epoch_seconds(b.premiere_date)),
            MetadataKey::Runtime => a.runtime_seconds.cmp(&b.runtime_seconds),
            MetadataKey::SeasonEpisode => natural_cmp(series(a), series(b))
                .then_with(|| a.season_number.cmp(&b.season_number))
                .then_with(|| a.episode_number.cmp(&b.episode_number)),
            MetadataKey::Unordered => Ordering::Equal,
        }
    }
}

impl Order for MetadataOrder {
    fn name(&self) -> &str {
        match self.key {
            MetadataKey::Name => "Name",
            MetadataKey::SeriesName => "SeriesName",
            MetadataKey::ProductionYear => "ProductionYear",
            MetadataKey::CommunityRating => "CommunityRating",
            MetadataKey::CriticRating => "CriticRating",
            MetadataKey::DateCreated => "DateCreated",
            MetadataKey::ReleaseDate => "ReleaseDate",
            MetadataKey::Runtime => "Runtime",
            MetadataKey::SeasonEpisode => "SeasonEpisode",
            MetadataKey::Unordered => "NoOrder",
        }
    }

    fn input(&self) -> OrderInput {
        if self.key == MetadataKey::Unordered {
            OrderInput::None
        } else {
            OrderInput::Metadata
        }
    }

    fn apply(&self, mut items: Vec<MediaItem>, _context: &OrderContext<'_>) -> Vec<MediaItem> {
        if self.key == MetadataKey::Unordered {
            return items;
        }
        items.sort_by(|a, b| {
            let primary = self.compare(a, b);
            let primary = if self.descending { primary.reverse() } else { primary };
            primary.then_with(|| natural_cmp(a.sort_key(), b.sort_key()))
        });
        items
    }
}
