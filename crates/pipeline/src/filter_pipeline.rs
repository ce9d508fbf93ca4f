//! The two-phase filter executor.
//!
//! ## Algorithm
//! The catalog is processed in fixed-size chunks. For each chunk:
//! 1. If the rule has any cheap condition, build cheap-only records in
//!    parallel and get a [`CheapVerdict`] per item. Rejected items stop
//!    here; accepted items need nothing more.
//! 2. Remaining items get a full record (people preloaded for the whole
//!    chunk in one batch) and the complete rule set is evaluated.
//! 3. Matches pass the similarity gate, matched series are expanded into
//!    their matching episodes, and everything is de-duplicated by id.
//!
//! Cancellation is checked before each chunk.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use library::{ItemId, ItemKind, LibraryAdapter, MediaItem};
use rayon::prelude::*;
use rules::{CheapVerdict, CompiledRuleSet, FeatureRecord, Requirements};
use tracing::{debug, info, instrument, warn};

use crate::cancel::CancellationFlag;
use crate::context::UserContext;
use crate::error::{PipelineError, Result};
use crate::features::{FeatureExtractor, RefreshCache};
use crate::similarity::{SimilarityField, SimilarityScorer};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Counters for one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    pub scanned: usize,
    pub cheap_rejected: usize,
    pub cheap_accepted: usize,
    pub fully_evaluated: usize,
    pub failed: usize,
    pub expanded: usize,
    pub matched: usize,
}

/// Matched items in catalog order, with similarity scores when computed
#[derive(Debug, Default)]
pub struct FilterResult {
    pub items: Vec<MediaItem>,
    pub scores: HashMap<ItemId, f64>,
    pub stats: PassStats,
}

/// Configured executor; one instance can run many passes.
///
/// ## Usage
/// ```ignore
/// let pipeline = FilterPipeline::new(&index)
///     .with_chunk_size(500)
///     .with_scope(vec![ItemKind::Episode])
///     .with_cancellation(flag.clone());
///
/// let result = pipeline.run(items, &compiled, &context, compiled.requirements())?;
/// ```
pub struct FilterPipeline<'a> {
    adapter: &'a dyn LibraryAdapter,
    chunk_size: usize,
    scope: Vec<ItemKind>,
    similarity_fields: Vec<SimilarityField>,
    min_similarity: f64,
    cancellation: Option<CancellationFlag>,
}

impl<'a> FilterPipeline<'a> {
    pub fn new(adapter: &'a dyn LibraryAdapter) -> Self {
        Self {
            adapter,
            chunk_size: DEFAULT_CHUNK_SIZE,
            scope: Vec::new(),
            similarity_fields: SimilarityField::DEFAULT.to_vec(),
            min_similarity: 0.0,
            cancellation: None,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Item kinds the list holds; empty means every kind
    pub fn with_scope(mut self, scope: Vec<ItemKind>) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_similarity(mut self, fields: Vec<SimilarityField>, min_score: f64) -> Self {
        self.similarity_fields = fields;
        self.min_similarity = min_score;
        self
    }

    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancellation = Some(flag);
        self
    }

    fn in_scope(&self, kind: ItemKind) -> bool {
        self.scope.is_empty() || self.scope.contains(&kind)
    }

    /// Run one filtering pass over `items`.
    ///
    /// # Returns
    /// * `Ok(FilterResult)` - matches in catalog order
    /// * `Err(Cancelled)` - the flag was raised between chunks
    #[instrument(skip_all, fields(rule = %compiled.rule_id, items = items.len()))]
    pub fn run(
        &self,
        items: Vec<MediaItem>,
        compiled: &CompiledRuleSet,
        context: &UserContext,
        requirements: &Requirements,
    ) -> Result<FilterResult> {
        let start = Instant::now();

        if compiled.is_pass_through() {
            debug!("Rule has no conditions, every item matches");
            let stats = PassStats {
                scanned: items.len(),
                matched: items.len(),
                ..PassStats::default()
            };
            return Ok(FilterResult {
                items,
                scores: HashMap::new(),
                stats,
            });
        }

        let mut requirements = requirements.clone();
        if requirements.similarity && self.similarity_fields.iter().any(SimilarityField::needs_people) {
            requirements = requirements.with_people();
        }

        let extractor = FeatureExtractor::new(self.adapter, context);
        let mut pass = Pass {
            pipeline: self,
            compiled,
            extractor,
            expand: requirements.expand_series
                && compiled.expands_series()
                && self.in_scope(ItemKind::Episode),
            requirements,
            scorer: None,
            cache: RefreshCache::new(),
            seen: HashSet::new(),
            result: FilterResult::default(),
        };

        if pass.requirements.similarity {
            pass.build_scorer(&items);
        }

        for (n, chunk) in items.chunks(self.chunk_size).enumerate() {
            if self.cancellation.as_ref().is_some_and(CancellationFlag::is_cancelled) {
                info!("Filtering cancelled after {} items", pass.result.stats.scanned);
                return Err(PipelineError::Cancelled {
                    processed: pass.result.stats.scanned,
                });
            }
            if n > 0 {
                std::thread::yield_now();
            }
            pass.run_chunk(chunk);
        }

        let mut result = pass.result;
        result.stats.matched = result.items.len();
        info!(
            "Filtered {} items to {} in {:.2?} (cheap rejected {}, accepted {}, full {}, failed {})",
            result.stats.scanned,
            result.stats.matched,
            start.elapsed(),
            result.stats.cheap_rejected,
            result.stats.cheap_accepted,
            result.stats.fully_evaluated,
            result.stats.failed,
        );
        Ok(result)
    }
}

enum Decision {
    Skip,
    Accept,
    /// Needs a full record; carries the cheap one when it was built
    Evaluate(Option<FeatureRecord>),
}

/// State of one pass; the refresh cache lives and dies with it
struct Pass<'p, 'a> {
    pipeline: &'p FilterPipeline<'a>,
    compiled: &'p CompiledRuleSet,
    extractor: FeatureExtractor<'p>,
    requirements: Requirements,
    expand: bool,
    scorer: Option<SimilarityScorer>,
    cache: RefreshCache,
    seen: HashSet<ItemId>,
    result: FilterResult,
}

impl Pass<'_, '_> {
    fn build_scorer(&mut self, items: &[MediaItem]) {
        let targets = self.compiled.similar_to();
        let mut references: Vec<FeatureRecord> = Vec::new();
        for item in items {
            if !targets.iter().any(|t| t.matches_name(&item.name)) {
                continue;
            }
            match self.extractor.build(item, &self.requirements, &mut self.cache) {
                Ok(record) => references.push(record),
                Err(e) => warn!("Skipping similarity reference '{}': {}", item.name, e),
            }
        }

        let scorer = SimilarityScorer::from_references(&self.pipeline.similarity_fields, &references);
        if scorer.has_references() {
            debug!(references = references.len(), "Built similarity reference vector");
        } else {
            warn!("No catalog item matches the similarity references; nothing will match");
        }
        self.scorer = Some(scorer);
    }

    fn run_chunk(&mut self, chunk: &[MediaItem]) {
        self.result.stats.scanned += chunk.len();

        let decisions: Vec<Decision> = if self.compiled.has_cheap_conditions() {
            let extractor = self.extractor;
            let compiled = self.compiled;
            let verdicts: Vec<Result<(FeatureRecord, CheapVerdict)>> = chunk
                .par_iter()
                .map(|item| {
                    extractor.build_cheap(item).map(|r| {
                        let verdict = compiled.cheap_verdict(&r);
                        (r, verdict)
                    })
                })
                .collect();

            let expand = self.expand;
            chunk
                .iter()
                .zip(verdicts)
                .map(|(item, verdict)| match verdict {
                    Ok((_, CheapVerdict::Reject)) => {
                        self.result.stats.cheap_rejected += 1;
                        Decision::Skip
                    }
                    // Similarity and series expansion still need a full record
                    Ok((_, CheapVerdict::Accept))
                        if self.scorer.is_none() && !(expand && item.kind == ItemKind::Series) =>
                    {
                        self.result.stats.cheap_accepted += 1;
                        Decision::Accept
                    }
                    Ok((record, _)) => Decision::Evaluate(Some(record)),
                    Err(e) => {
                        warn!("Skipping '{}': {}", item.name, e);
                        self.result.stats.failed += 1;
                        Decision::Skip
                    }
                })
                .collect()
        } else {
            chunk.iter().map(|_| Decision::Evaluate(None)).collect()
        };

        if self.requirements.people {
            let pending: Vec<&MediaItem> = chunk
                .iter()
                .zip(&decisions)
                .filter(|(_, d)| matches!(d, Decision::Evaluate(_)))
                .map(|(item, _)| item)
                .collect();
            if !pending.is_empty() {
                self.cache.preload_people(self.pipeline.adapter, &pending);
            }
        }

        for (item, decision) in chunk.iter().zip(decisions) {
            match decision {
                Decision::Skip => {}
                Decision::Accept => self.admit(item, None),
                Decision::Evaluate(cheap) => {
                    self.result.stats.fully_evaluated += 1;
                    let record = match cheap {
                        Some(record) => Ok(self.extractor.build_from(record, item, &self.requirements, &mut self.cache)),
                        None => self.extractor.build(item, &self.requirements, &mut self.cache),
                    };
                    match record {
                        Ok(record) if self.compiled.matches(&record) => self.admit(item, Some(&record)),
                        Ok(_) => {}
                        Err(e) => {
                            warn!("Skipping '{}': {}", item.name, e);
                            self.result.stats.failed += 1;
                        }
                    }
                }
            }
        }
    }

    /// Series that may be expanded into episodes in this pass
    fn expands(&self, item: &MediaItem) -> bool {
        self.expand && item.kind == ItemKind::Series
    }

    /// Handle an item that satisfied the groups
    fn admit(&mut self, item: &MediaItem, record: Option<&FeatureRecord>) {
        if self.expands(item) {
            // Only groups holding the expanding Collections condition pass
            // their membership down to the episodes
            let inherited = record
                .map(|r| self.compiled.expansion_groups(r))
                .unwrap_or_default();
            if !inherited.is_empty() {
                self.expand_series(item, &inherited);
            }
            if !self.pipeline.in_scope(ItemKind::Series) {
                return;
            }
        }

        if let Some(record) = record {
            if !self.passes_similarity(record) {
                return;
            }
        }
        if self.seen.insert(item.id) {
            self.result.items.push(item.clone());
        }
    }

    /// Add the episodes of `series` that satisfy the rule with its
    /// Collections conditions taken as met
    fn expand_series(&mut self, series: &MediaItem, inherited: &[usize]) {
        let adapter = self.pipeline.adapter;
        let episodes = self.cache.episodes(adapter, series.id);
        if self.requirements.people {
            let refs: Vec<&MediaItem> = episodes.iter().collect();
            self.cache.preload_people(adapter, &refs);
        }

        let mut added = 0usize;
        for episode in episodes.iter() {
            if self.seen.contains(&episode.id) {
                continue;
            }
            let record = match self.extractor.build(episode, &self.requirements, &mut self.cache) {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipping episode '{}': {}", episode.name, e);
                    self.result.stats.failed += 1;
                    continue;
                }
            };
            if self.compiled.matches_inheriting_collections(&record, inherited) && self.passes_similarity(&record) {
                self.seen.insert(episode.id);
                self.result.items.push(episode.clone());
                added += 1;
            }
        }

        self.result.stats.expanded += added;
        debug!(series = %series.name, episodes = added, "Expanded series");
    }

    /// Extra AND for `SimilarTo`; records the score of passing items
    fn passes_similarity(&mut self, record: &FeatureRecord) -> bool {
        let Some(scorer) = &self.scorer else {
            return true;
        };
        if scorer.is_reference(record.item_id) {
            return false;
        }
        let score = scorer.score(record);
        if score > 0.0 && score >= self.pipeline.min_similarity {
            self.result.scores.insert(record.item_id, score);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use library::{LibraryIndex, User};
    use rules::{Condition, ConditionGroup, RuleCompiler, RuleDefinition};
    use uuid::Uuid;

    fn create_test_index() -> (LibraryIndex, User, Vec<MediaItem>) {
        let mut index = LibraryIndex::new();
        let owner = User {
            id: Uuid::new_v4(),
            name: "owner".to_string(),
        };
        index.insert_user(owner.clone());

        let mut items = Vec::new();
        for (name, genre, year) in [
            ("Alien", "Horror", 1979),
            ("Heat", "Crime", 1995),
            ("Halloween", "Horror", 1978),
            ("Up", "Animation", 2009),
        ] {
            let mut item = MediaItem::new(Uuid::new_v4(), ItemKind::Movie, name);
            item.genres = vec![genre.to_string()];
            item.production_year = Some(year);
            index.insert_item(item.clone());
            items.push(item);
        }
        (index, owner, items)
    }

    fn run(index: &LibraryIndex, owner: &User, items: Vec<MediaItem>, rule: &RuleDefinition) -> FilterResult {
        let compiled = RuleCompiler::new().compile(rule, &owner.id.to_string());
        let context = UserContext::new(owner.clone());
        FilterPipeline::new(index)
            .with_chunk_size(2)
            .run(items, &compiled, &context, compiled.requirements())
            .unwrap()
    }

    fn names(result: &FilterResult) -> Vec<&str> {
        result.items.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn test_pass_through_returns_everything() {
        let (index, owner, items) = create_test_index();
        let result = run(&index, &owner, items, &RuleDefinition::new("r", vec![]));
        assert_eq!(result.items.len(), 4);
    }

    #[test]
    fn test_cheap_rule_across_chunks() {
        let (index, owner, items) = create_test_index();
        let rule = RuleDefinition::new(
            "r",
            vec![ConditionGroup::new(vec![Condition::new("Genres", "Contains", "horror")])],
        );
        let result = run(&index, &owner, items, &rule);
        assert_eq!(names(&result), vec!["Alien", "Halloween"]);
        assert_eq!(result.stats.cheap_accepted, 2);
        assert_eq!(result.stats.cheap_rejected, 2);
        assert_eq!(result.stats.fully_evaluated, 0);
    }

    #[test]
    fn test_cancelled_before_start() {
        let (index, owner, items) = create_test_index();
        let rule = RuleDefinition::new(
            "r",
            vec![ConditionGroup::new(vec![Condition::new("Name", "Contains", "a")])],
        );
        let compiled = RuleCompiler::new().compile(&rule, "owner");
        let flag = CancellationFlag::new();
        flag.cancel();

        let err = FilterPipeline::new(&index)
            .with_cancellation(flag)
            .run(items, &compiled, &UserContext::new(owner), compiled.requirements())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled { processed: 0 }));
    }
}
