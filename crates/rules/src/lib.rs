//! # Rules Crate
//!
//! Declarative smart-list rules and their compiled, executable form.
//!
//! ## Main Components
//!
//! - **model**: authored rule shapes ([`RuleDefinition`], groups, conditions)
//! - **field** / **operator**: closed sets of fields and operators
//! - **record**: [`FeatureRecord`], the per-item snapshot predicates read
//! - **requirements**: which expensive features a rule needs
//! - **compiler**: conditions to predicates, with per-condition failure isolation
//! - **cache**: [`RuleCache`], compile-once sharing keyed by content hash
//!
//! ## Example Usage
//!
//! ```ignore
//! use rules::{Condition, ConditionGroup, RuleCache, RuleDefinition};
//!
//! let rule = RuleDefinition::new(
//!     "recent-horror",
//!     vec![ConditionGroup::new(vec![
//!         Condition::new("Genres", "Contains", "Horror"),
//!         Condition::new("DateCreated", "NewerThan", "30:days"),
//!     ])],
//! );
//! let cache = RuleCache::new();
//! let compiled = cache.get_or_compile(&rule, "owner-id");
//! ```

pub mod cache;
pub mod compiler;
pub mod error;
pub mod field;
pub mod hash;
pub mod model;
pub mod operator;
pub mod record;
pub mod regex_cache;
pub mod requirements;

pub use cache::{CacheConfig, CacheStats, RuleCache};
pub use compiler::{
    CheapVerdict, CompiledCondition, CompiledGroup, CompiledRuleSet, DroppedCondition, Predicate,
    RuleCompiler, SimilarityTarget,
};
pub use error::{Result, RuleError};
pub use field::{Field, FieldCost, ValueKind};
pub use hash::RuleSetHash;
pub use model::{Condition, ConditionGroup, RuleDefinition, normalize_user_key};
pub use operator::Operator;
pub use record::{FeatureRecord, UserPlayState};
pub use regex_cache::RegexCache;
pub use requirements::Requirements;
