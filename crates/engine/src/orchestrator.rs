//! # SmartList Engine
//!
//! Coordinates one list refresh end to end:
//! 1. Fetch (or reuse) the compiled rule set from the shared cache
//! 2. Resolve the owner and every user the rule references
//! 3. Run the two-phase filter pass
//! 4. Order the matches
//! 5. Apply item-count and play-time limits
//! 6. Return the item ids
//!
//! `filter` never fails: errors and panics are logged and turn into an
//! empty outcome carrying the error message. `try_filter` is the same
//! flow with the error surfaced.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, instrument, warn};

use library::{ItemId, ItemKind, LibraryAdapter, MediaItem, UserId};
use pipeline::{
    CancellationFlag, FilterPipeline, OrderContext, PassStats, PipelineError, build_user_context,
    owner_key,
};
use rules::{CacheStats, CompiledRuleSet, RuleCache, RuleDefinition};

use crate::config::{EngineConfig, ListConfig};
use crate::error::{EngineError, Result};

/// Result of one refresh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOutcome {
    /// Final list, ordered and limited
    pub item_ids: Vec<ItemId>,
    /// Matches before limits were applied
    pub matched: usize,
    /// Conditions that failed to compile, as readable messages
    pub dropped_conditions: Vec<String>,
    pub stats: PassStats,
    /// Set when the refresh failed and the list is empty because of it
    pub error: Option<String>,
}

impl FilterOutcome {
    fn failed(message: String) -> Self {
        Self {
            error: Some(message),
            ..Self::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Entry point for filtering, ordering and limiting smart lists
#[derive(Clone)]
pub struct SmartListEngine {
    adapter: Arc<dyn LibraryAdapter>,
    cache: Arc<RuleCache>,
    config: EngineConfig,
}

impl SmartListEngine {
    /// Create an engine with its own rule cache
    ///
    /// # Arguments
    /// * `adapter` - Host library lookups, shared with other engines if needed
    pub fn new(adapter: Arc<dyn LibraryAdapter>) -> Self {
        let config = EngineConfig::default();
        Self {
            adapter,
            cache: Arc::new(RuleCache::new().with_config(config.cache_config())),
            config,
        }
    }

    /// Replace the tuning; also rebuilds the rule cache with the new limits
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.cache = Arc::new(RuleCache::new().with_config(config.cache_config()));
        self.config = config;
        self
    }

    /// Share one rule cache between several engines
    pub fn with_cache(mut self, cache: Arc<RuleCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn adapter(&self) -> &Arc<dyn LibraryAdapter> {
        &self.adapter
    }

    /// Compiled form of `rule` for `owner`, from the cache when possible
    pub fn compile(&self, rule: &RuleDefinition, owner: UserId) -> Arc<CompiledRuleSet> {
        self.cache.get_or_compile(rule, &owner_key(owner))
    }

    /// Filter, order and limit `items`; failures become an empty outcome.
    ///
    /// Panics inside the pass are caught as well, so a single bad list
    /// cannot take down the host's refresh loop.
    pub fn filter(
        &self,
        items: Vec<MediaItem>,
        rule: &RuleDefinition,
        owner: UserId,
        config: &ListConfig,
    ) -> FilterOutcome {
        let result = catch_unwind(AssertUnwindSafe(|| {
            self.try_filter(items, rule, owner, config)
        }));

        match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!("Smart list '{}' failed: {}", rule.name, e);
                FilterOutcome::failed(e.to_string())
            }
            Err(panic) => {
                let message = panic_message(&*panic);
                error!("Smart list '{}' panicked: {}", rule.name, message);
                FilterOutcome::failed(format!("internal error: {}", message))
            }
        }
    }

    /// Filter, order and limit `items`, surfacing any error
    pub fn try_filter(
        &self,
        items: Vec<MediaItem>,
        rule: &RuleDefinition,
        owner: UserId,
        config: &ListConfig,
    ) -> Result<FilterOutcome> {
        self.run(items, rule, owner, config, None)
    }

    /// Like `try_filter`, aborting between chunks once `cancel` is raised
    pub fn try_filter_cancellable(
        &self,
        items: Vec<MediaItem>,
        rule: &RuleDefinition,
        owner: UserId,
        config: &ListConfig,
        cancel: CancellationFlag,
    ) -> Result<FilterOutcome> {
        self.run(items, rule, owner, config, Some(cancel))
    }

    /// Fetch the owner's catalog through the adapter and filter it.
    ///
    /// Series are fetched too when the rule expands them into episodes.
    pub fn refresh(
        &self,
        rule: &RuleDefinition,
        owner: UserId,
        config: &ListConfig,
    ) -> Result<FilterOutcome> {
        self.refresh_inner(rule, owner, config, None)
    }

    pub fn refresh_cancellable(
        &self,
        rule: &RuleDefinition,
        owner: UserId,
        config: &ListConfig,
        cancel: CancellationFlag,
    ) -> Result<FilterOutcome> {
        self.refresh_inner(rule, owner, config, Some(cancel))
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Drop the compiled form of `rule`; returns whether it was cached
    pub fn invalidate(&self, rule: &RuleDefinition, owner: UserId) -> bool {
        self.cache.invalidate(rule, &owner_key(owner))
    }

    fn refresh_inner(
        &self,
        rule: &RuleDefinition,
        owner: UserId,
        config: &ListConfig,
        cancel: Option<CancellationFlag>,
    ) -> Result<FilterOutcome> {
        let user = self
            .adapter
            .get_user(owner)
            .ok_or_else(|| EngineError::UserNotFound {
                user_id: owner.to_string(),
                field: "owner".to_string(),
            })?;

        let compiled = self.compile(rule, owner);
        let mut kinds = config.media_types.clone();
        if compiled.expands_series()
            && config.includes(ItemKind::Episode)
            && !kinds.is_empty()
            && !kinds.contains(&ItemKind::Series)
        {
            kinds.push(ItemKind::Series);
        }

        let items = self.adapter.items_for_user(&user, &kinds)?;
        info!(
            "Fetched {} items of {:?} for '{}'",
            items.len(),
            kinds,
            user.name
        );
        self.run(items, rule, owner, config, cancel)
    }

    #[instrument(skip_all, fields(rule = %rule.id, owner = %owner, items = items.len()))]
    fn run(
        &self,
        items: Vec<MediaItem>,
        rule: &RuleDefinition,
        owner: UserId,
        config: &ListConfig,
        cancel: Option<CancellationFlag>,
    ) -> Result<FilterOutcome> {
        let start = Instant::now();

        // Step 1: compiled rule set
        let compiled = self.compile(rule, owner);
        let dropped_conditions: Vec<String> = compiled
            .dropped()
            .iter()
            .map(|d| format!("group {} condition {}: {}", d.group + 1, d.index + 1, d.error))
            .collect();

        let mut requirements = compiled.requirements().clone();
        if !config.include_unwatched_series {
            requirements.include_unwatched_series = false;
        }

        // Step 2: users
        let context = build_user_context(self.adapter.as_ref(), owner, &requirements)
            .map_err(|e| self.map_pipeline_error(e, rule))?;

        // Step 3: filter pass
        let mut pipeline = FilterPipeline::new(self.adapter.as_ref())
            .with_chunk_size(self.config.chunk_size)
            .with_scope(config.media_types.clone())
            .with_similarity(config.similarity_fields.clone(), config.min_similarity);
        if let Some(flag) = cancel {
            pipeline = pipeline.with_cancellation(flag);
        }
        let result = pipeline
            .run(items, &compiled, &context, &requirements)
            .map_err(|e| self.map_pipeline_error(e, rule))?;
        let matched = result.items.len();

        // Step 4: ordering
        let order = config.order.strategy();
        let order_context = OrderContext {
            adapter: self.adapter.as_ref(),
            owner: &context.owner,
            scores: &result.scores,
        };
        let ordered = order.apply(result.items, &order_context);

        // Step 5: limits
        let limited = config.limits().apply(ordered);

        info!(
            "Smart list '{}': {} matched, {} kept, ordered by {} in {:?}",
            rule.name,
            matched,
            limited.len(),
            order.name(),
            start.elapsed()
        );

        Ok(FilterOutcome {
            item_ids: limited.iter().map(|item| item.id).collect(),
            matched,
            dropped_conditions,
            stats: result.stats,
            error: None,
        })
    }

    fn map_pipeline_error(&self, error: PipelineError, rule: &RuleDefinition) -> EngineError {
        match error {
            PipelineError::UserNotFound { user_id } => {
                let field = rule
                    .conditions()
                    .find(|c| c.user_key().as_deref() == Some(user_id.as_str()))
                    .map(|c| c.field.clone())
                    .unwrap_or_else(|| "owner".to_string());
                warn!("Rule '{}' references missing user '{}' in {}", rule.id, user_id, field);
                EngineError::UserNotFound { user_id, field }
            }
            PipelineError::Cancelled { processed } => EngineError::Cancelled { processed },
            PipelineError::Library(e) => EngineError::Library(e),
            other => EngineError::Pipeline(other),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================
