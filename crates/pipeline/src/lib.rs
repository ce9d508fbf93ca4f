//! Filtering, ordering and limiting of library items against compiled rules.
//!
//! This crate provides:
//! - `build_user_context` for resolving the owner and referenced users
//! - `FeatureExtractor` and the per-pass `RefreshCache`
//! - `FilterPipeline`, the chunked two-phase executor
//! - `SimilarityScorer` for `SimilarTo` conditions
//! - `Order` strategies and `Limits` for the final list
//!
//! ## Architecture
//! A pass processes the catalog in stages:
//! 1. Cheap conditions reject or accept most items without expensive lookups
//! 2. Survivors get full features and the complete rule set is evaluated
//! 3. Similarity gating and series expansion shape the match set
//! 4. An `Order` sorts the matches and `Limits` trims them
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::{build_user_context, FilterPipeline, Limits, OrderContext, OrderSpec};
//!
//! let context = build_user_context(&index, owner_id, compiled.requirements())?;
//! let result = FilterPipeline::new(&index).run(items, &compiled, &context, compiled.requirements())?;
//!
//! let order = "Name Ascending".parse::<OrderSpec>()?.strategy();
//! let ctx = OrderContext { adapter: &index, owner: &context.owner, scores: &result.scores };
//! let list = Limits::new().with_max_items(50).apply(order.apply(result.items, &ctx));
//! ```

pub mod cancel;
pub mod context;
pub mod error;
pub mod features;
pub mod filter_pipeline;
pub mod limits;
pub mod natural;
pub mod orders;
pub mod similarity;
pub mod traits;

// Re-export main types
pub use cancel::CancellationFlag;
pub use context::{UserContext, build_user_context, owner_key};
pub use error::{PipelineError, Result};
pub use features::{FeatureExtractor, RefreshCache, epoch_seconds};
pub use filter_pipeline::{DEFAULT_CHUNK_SIZE, FilterPipeline, FilterResult, PassStats};
pub use limits::Limits;
pub use natural::natural_cmp;
pub use orders::{Direction, OrderKind, OrderSpec};
pub use similarity::{SimilarityField, SimilarityScorer};
pub use traits::{Order, OrderContext, OrderInput};
