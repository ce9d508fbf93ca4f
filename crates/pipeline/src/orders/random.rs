//! Random shuffle, reseeded from the clock on every call.

use std::time::{SystemTime, UNIX_EPOCH};

use library::MediaItem;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::traits::{Order, OrderContext, OrderInput};

pub struct RandomOrder;

impl Order for RandomOrder {
    fn name(&self) -> &str {
        "Random"
    }

    fn input(&self) -> OrderInput {
        OrderInput::None
    }

    fn apply(&self, mut items: Vec<MediaItem>, _context: &OrderContext<'_>) -> Vec<MediaItem> {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        let mut rng = StdRng::seed_from_u64(seed);
        items.shuffle(&mut rng);
        items
    }
}
