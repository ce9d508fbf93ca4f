//! Orderings over the owner's play statistics.

use std::cmp::Ordering;

use library::MediaItem;
use tracing::warn;

use crate::features::epoch_seconds;
use crate::traits::{Order, OrderContext, OrderInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserStat {
    PlayCount,
    LastPlayed,
    IsFavorite,
}

/// Sorts by one play statistic, then newest-created first.
///
/// Each item's statistic is fetched once before sorting rather than on
/// every comparison.
pub struct UserStatOrder {
    stat: UserStat,
    descending: bool,
}

impl UserStatOrder {
    pub fn new(stat: UserStat, descending: bool) -> Self {
        Self { stat, descending }
    }

    fn statistic(&self, item: &MediaItem, context: &OrderContext<'_>) -> i64 {
        let data = context
            .adapter
            .get_user_data(context.owner, item)
            .unwrap_or_else(|e| {
                warn!("Failed to read play state of '{}': {}", item.name, e);
                None
            })
            .unwrap_or_default();
        match self.stat {
            UserStat::PlayCount => i64::from(data.play_count),
            UserStat::LastPlayed => epoch_seconds(data.last_played),
            UserStat::IsFavorite => i64::from(data.is_favorite),
        }
    }
}

impl Order for UserStatOrder {
    fn name(&self) -> &str {
        match self.stat {
            UserStat::PlayCount => "PlayCount",
            UserStat::LastPlayed => "LastPlayed",
            UserStat::IsFavorite => "IsFavorite",
        }
    }

    fn input(&self) -> OrderInput {
        OrderInput::UserStatistics
    }

    fn apply(&self, items: Vec<MediaItem>, context: &OrderContext<'_>) -> Vec<MediaItem> {
        let mut keyed: Vec<(i64, i64, MediaItem)> = items
            .into_iter()
            .map(|item| {
                let stat = self.statistic(&item, context);
                (stat, epoch_seconds(item.date_created), item)
            })
            .collect();

        keyed.sort_by(|(sa, ca, _), (sb, cb, _)| {
            let primary: Ordering = sa.cmp(sb);
            let primary = if self.descending { primary.reverse() } else { primary };
            primary.then_with(|| cb.cmp(ca))
        });
        keyed.into_iter().map(|(_, _, item)| item).collect()
    }
}
