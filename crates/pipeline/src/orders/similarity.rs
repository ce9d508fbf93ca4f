//! Ordering by similarity score.

use library::MediaItem;

use crate::natural::natural_cmp;
use crate::traits::{Order, OrderContext, OrderInput};

/// Sorts by the score from the similarity pass, then by natural name.
/// Items without a score count as zero.
pub struct SimilarityOrder {
    descending: bool,
}

impl SimilarityOrder {
    pub fn new(descending: bool) -> Self {
        Self { descending }
    }
}

impl Order for SimilarityOrder {
    fn name(&self) -> &str {
        "Similarity"
    }

    fn input(&self) -> OrderInput {
        OrderInput::Similarity
    }

    fn apply(&self, mut items: Vec<MediaItem>, context: &OrderContext<'_>) -> Vec<MediaItem> {
        let score = |item: &MediaItem| context.scores.get(&item.id).copied().unwrap_or(0.0);
        items.sort_by(|a, b| {
            let primary = score(a).total_cmp(&score(b));
            let primary = if self.descending { primary.reverse() } else { primary };
            primary.then_with(|| natural_cmp(a.sort_key(), b.sort_key()))
        });
        items
    }
}
