//! List and engine configuration.

use std::time::Duration;

use library::ItemKind;
use pipeline::{DEFAULT_CHUNK_SIZE, Limits, OrderSpec, SimilarityField};
use rules::CacheConfig;
use serde::{Deserialize, Serialize};

/// Per-list settings supplied alongside a rule definition.
///
/// Deserialized from the same JSON document as the rule, so every field
/// has a default and unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListConfig {
    /// Item kinds the list draws from; empty means every kind
    pub media_types: Vec<ItemKind>,
    pub order: OrderSpec,
    pub max_items: Option<usize>,
    pub max_play_time_minutes: Option<f64>,
    /// Fields compared by `SimilarTo`; empty means Genre and Tags
    pub similarity_fields: Vec<SimilarityField>,
    pub min_similarity: f64,
    /// Default for series nobody has started when computing next-unwatched
    pub include_unwatched_series: bool,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            media_types: Vec::new(),
            order: OrderSpec::default(),
            max_items: None,
            max_play_time_minutes: None,
            similarity_fields: Vec::new(),
            min_similarity: 0.0,
            include_unwatched_series: true,
        }
    }
}

impl ListConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_media_types(mut self, media_types: Vec<ItemKind>) -> Self {
        self.media_types = media_types;
        self
    }

    pub fn with_order(mut self, order: OrderSpec) -> Self {
        self.order = order;
        self
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    pub fn with_max_play_time_minutes(mut self, minutes: f64) -> Self {
        self.max_play_time_minutes = Some(minutes);
        self
    }

    pub fn with_similarity(mut self, fields: Vec<SimilarityField>, min_similarity: f64) -> Self {
        self.similarity_fields = fields;
        self.min_similarity = min_similarity;
        self
    }

    pub fn with_unwatched_series(mut self, include: bool) -> Self {
        self.include_unwatched_series = include;
        self
    }

    pub fn limits(&self) -> Limits {
        Limits {
            max_items: self.max_items,
            max_play_time_minutes: self.max_play_time_minutes,
        }
    }

    pub fn includes(&self, kind: ItemKind) -> bool {
        self.media_types.is_empty() || self.media_types.contains(&kind)
    }
}

/// Process-wide tuning for the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Items per chunk between cancellation checks
    pub chunk_size: usize,
    pub cache_max_entries: usize,
    pub cache_eviction_interval_secs: u64,
    /// How long a refresh waits for the gate before reporting busy
    pub refresh_wait_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let cache = CacheConfig::default();
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            cache_max_entries: cache.max_entries,
            cache_eviction_interval_secs: cache.min_eviction_interval.as_secs(),
            refresh_wait_ms: 5_000,
        }
    }
}

impl EngineConfig {
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            max_entries: self.cache_max_entries,
            min_eviction_interval: Duration::from_secs(self.cache_eviction_interval_secs),
        }
    }

    pub fn refresh_wait(&self) -> Duration {
        Duration::from_millis(self.refresh_wait_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline::{Direction, OrderKind};

    #[test]
    fn test_list_config_from_json() {
        let json = r#"{
            "mediaTypes": ["Movie", "Episode"],
            "order": "PlayCount Descending",
            "maxItems": 25,
            "similarityFields": ["Genre", "Actors"],
            "minSimilarity": 0.3,
            "somethingElse": 1
        }"#;
        let config: ListConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.media_types, vec![ItemKind::Movie, ItemKind::Episode]);
        assert_eq!(config.order, OrderSpec::new(OrderKind::PlayCount, Direction::Descending));
        assert_eq!(config.max_items, Some(25));
        assert_eq!(config.max_play_time_minutes, None);
        assert_eq!(
            config.similarity_fields,
            vec![SimilarityField::Genre, SimilarityField::Actors]
        );
        assert!(config.include_unwatched_series);
    }

    #[test]
    fn test_empty_media_types_include_everything() {
        let config = ListConfig::new();
        assert!(config.includes(ItemKind::Book));

        let config = config.with_media_types(vec![ItemKind::Movie]);
        assert!(config.includes(ItemKind::Movie));
        assert!(!config.includes(ItemKind::Episode));
    }

    #[test]
    fn test_engine_config_cache_config() {
        let config = EngineConfig {
            cache_max_entries: 8,
            cache_eviction_interval_secs: 2,
            ..EngineConfig::default()
        };
        let cache = config.cache_config();
        assert_eq!(cache.max_entries, 8);
        assert_eq!(cache.min_eviction_interval, Duration::from_secs(2));
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
    }
}
