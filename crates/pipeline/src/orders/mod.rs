//! Ordering strategies and the `"Name Ascending"` style selector that picks one.

pub mod metadata;
pub mod random;
pub mod similarity;
pub mod user_stats;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::traits::Order;

pub use metadata::{MetadataKey, MetadataOrder};
pub use random::RandomOrder;
pub use similarity::SimilarityOrder;
pub use user_stats::{UserStat, UserStatOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderKind {
    Name,
    SeriesName,
    ProductionYear,
    CommunityRating,
    CriticRating,
    DateCreated,
    ReleaseDate,
    Runtime,
    SeasonEpisode,
    PlayCount,
    LastPlayed,
    IsFavorite,
    Similarity,
    Random,
    #[default]
    NoOrder,
}

impl OrderKind {
    pub const ALL: [OrderKind; 15] = [
        OrderKind::Name,
        OrderKind::SeriesName,
        OrderKind::ProductionYear,
        OrderKind::CommunityRating,
        OrderKind::CriticRating,
        OrderKind::DateCreated,
        OrderKind::ReleaseDate,
        OrderKind::Runtime,
        OrderKind::SeasonEpisode,
        OrderKind::PlayCount,
        OrderKind::LastPlayed,
        OrderKind::IsFavorite,
        OrderKind::Similarity,
        OrderKind::Random,
        OrderKind::NoOrder,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderKind::Name => "Name",
            OrderKind::SeriesName => "SeriesName",
            OrderKind::ProductionYear => "ProductionYear",
            OrderKind::CommunityRating => "CommunityRating",
            OrderKind::CriticRating => "CriticRating",
            OrderKind::DateCreated => "DateCreated",
            OrderKind::ReleaseDate => "ReleaseDate",
            OrderKind::Runtime => "Runtime",
            OrderKind::SeasonEpisode => "SeasonEpisode",
            OrderKind::PlayCount => "PlayCount",
            OrderKind::LastPlayed => "LastPlayed",
            OrderKind::IsFavorite => "IsFavorite",
            OrderKind::Similarity => "Similarity",
            OrderKind::Random => "Random",
            OrderKind::NoOrder => "NoOrder",
        }
    }
}

/// Selected ordering: a kind plus a direction.
///
/// Parsed from strings such as `"Name Ascending"`, `"PlayCount Descending"`
/// or just `"Random"` (direction defaults to ascending).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderSpec {
    pub kind: OrderKind,
    pub direction: Direction,
}

impl OrderSpec {
    pub fn new(kind: OrderKind, direction: Direction) -> Self {
        Self { kind, direction }
    }

    /// The strategy implementing this ordering
    pub fn strategy(&self) -> Box<dyn Order> {
        let descending = self.direction == Direction::Descending;
        match self.kind {
            OrderKind::Name => Box::new(MetadataOrder::new(MetadataKey::Name, descending)),
            OrderKind::SeriesName => Box::new(MetadataOrder::new(MetadataKey::SeriesName, descending)),
            OrderKind::ProductionYear => {
                Box::new(MetadataOrder::new(MetadataKey::ProductionYear, descending))
            }
            OrderKind::CommunityRating => {
                Box::new(MetadataOrder::new(MetadataKey::CommunityRating, descending))
            }
            OrderKind::CriticRating => Box::new(MetadataOrder::new(MetadataKey::CriticRating, descending)),
            OrderKind::DateCreated => Box::new(MetadataOrder::new(MetadataKey::DateCreated, descending)),
            OrderKind::ReleaseDate => Box::new(MetadataOrder::new(MetadataKey::ReleaseDate, descending)),
            OrderKind::Runtime => Box::new(MetadataOrder::new(MetadataKey::Runtime, descending)),
            OrderKind::SeasonEpisode => {
                Box::new(MetadataOrder::new(MetadataKey::SeasonEpisode, descending))
            }
            OrderKind::NoOrder => Box::new(MetadataOrder::new(MetadataKey::Unordered, descending)),
            OrderKind::PlayCount => Box::new(UserStatOrder::new(UserStat::PlayCount, descending)),
            OrderKind::LastPlayed => Box::new(UserStatOrder::new(UserStat::LastPlayed, descending)),
            OrderKind::IsFavorite => Box::new(UserStatOrder::new(UserStat::IsFavorite, descending)),
            OrderKind::Similarity => Box::new(SimilarityOrder::new(descending)),
            OrderKind::Random => Box::new(RandomOrder),
        }
    }
}

impl fmt::Display for OrderSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = match self.direction {
            Direction::Ascending => "Ascending",
            Direction::Descending => "Descending",
        };
        write!(f, "{} {}", self.kind.as_str(), direction)
    }
}

impl FromStr for OrderSpec {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PipelineError::InvalidOrder(s.to_string());
        let mut parts = s.split_whitespace();

        let kind_name = parts.next().ok_or_else(invalid)?;
        let kind = match kind_name.to_ascii_lowercase().as_str() {
            "none" => OrderKind::NoOrder,
            "sortname" | "title" => OrderKind::Name,
            "runtimeminutes" => OrderKind::Runtime,
            "premieredate" => OrderKind::ReleaseDate,
            other => OrderKind::ALL
                .into_iter()
                .find(|k| k.as_str().eq_ignore_ascii_case(other))
                .ok_or_else(invalid)?,
        };

        let direction = match parts.next().map(str::to_ascii_lowercase).as_deref() {
            None | Some("ascending") | Some("asc") => Direction::Ascending,
            Some("descending") | Some("desc") => Direction::Descending,
            Some(_) => return Err(invalid()),
        };
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(OrderSpec { kind, direction })
    }
}

impl TryFrom<String> for OrderSpec {
    type Error = PipelineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OrderSpec> for String {
    fn from(spec: OrderSpec) -> Self {
        spec.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::OrderInput;

    #[test]
    fn test_parse_order_strings() {
        assert_eq!(
            "Name Ascending".parse::<OrderSpec>().unwrap(),
            OrderSpec::new(OrderKind::Name, Direction::Ascending)
        );
        assert_eq!(
            "playcount descending".parse::<OrderSpec>().unwrap(),
            OrderSpec::new(OrderKind::PlayCount, Direction::Descending)
        );
        assert_eq!("Random".parse::<OrderSpec>().unwrap().kind, OrderKind::Random);
        assert!("Name Sideways".parse::<OrderSpec>().is_err());
        assert!("Popularity Ascending".parse::<OrderSpec>().is_err());
        assert!("".parse::<OrderSpec>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for kind in OrderKind::ALL {
            let spec = OrderSpec::new(kind, Direction::Descending);
            assert_eq!(spec.to_string().parse::<OrderSpec>().unwrap(), spec);
        }
    }

    #[test]
    fn test_strategy_inputs() {
        let input = |s: &str| s.parse::<OrderSpec>().unwrap().strategy().input();
        assert_eq!(input("Name Ascending"), OrderInput::Metadata);
        assert_eq!(input("LastPlayed Descending"), OrderInput::UserStatistics);
        assert_eq!(input("Similarity Descending"), OrderInput::Similarity);
        assert_eq!(input("Random"), OrderInput::None);
        assert_eq!(input("NoOrder"), OrderInput::None);
    }
}

#[cfg(test)]
pub(crate) mod tests_support {
    use std::collections::HashMap;

    use library::{ItemId, ItemKind, LibraryIndex, MediaItem, User};
    use uuid::Uuid;

    pub fn context_fixture() -> (LibraryIndex, User, HashMap<ItemId, f64>) {
        let mut index = LibraryIndex::new();
        let owner = User {
            id: Uuid::new_v4(),
            name: "owner".to_string(),
        };
        index.insert_user(owner.clone());
        (index, owner, HashMap::new())
    }

    pub fn movie(name: &str, year: Option<i32>) -> MediaItem {
        let mut item = MediaItem::new(Uuid::new_v4(), ItemKind::Movie, name);
        item.production_year = year;
        item
    }
}
