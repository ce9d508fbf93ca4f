//! Item-count and play-time caps applied after ordering.

use library::MediaItem;
use serde::{Deserialize, Serialize};

/// Caps on the final list; `None` means unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Limits {
    pub max_items: Option<usize>,
    pub max_play_time_minutes: Option<f64>,
}

impl Limits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    pub fn with_max_play_time_minutes(mut self, minutes: f64) -> Self {
        self.max_play_time_minutes = Some(minutes);
        self
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_items.is_none() && self.max_play_time_minutes.is_none()
    }

    /// Keep items in order until the first one that would break a cap.
    ///
    /// Zero caps count as unset.
    pub fn apply(&self, items: Vec<MediaItem>) -> Vec<MediaItem> {
        if self.is_unbounded() {
            return items;
        }
        let max_items = self.max_items.filter(|&n| n > 0);
        let max_minutes = self.max_play_time_minutes.filter(|&m| m > 0.0);

        let mut kept = Vec::with_capacity(max_items.unwrap_or(items.len()).min(items.len()));
        let mut minutes = 0.0;

        for item in items {
            if max_items.is_some_and(|n| kept.len() >= n) {
                break;
            }
            if let Some(limit) = max_minutes {
                let runtime = item.runtime_minutes();
                if minutes + runtime > limit {
                    break;
                }
                minutes += runtime;
            }
            kept.push(item);
        }
        kept
    }
}
