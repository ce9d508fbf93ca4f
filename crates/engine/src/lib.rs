//! SmartList engine: the entry point hosts call to refresh rule-based lists.
//!
//! Wires the rule cache, the filter pipeline, ordering and limits behind
//! [`SmartListEngine`], plus a [`RefreshGate`] for hosts that allow only
//! one refresh at a time.
//!
//! ## Example Usage
//! ```ignore
//! use engine::{ListConfig, SmartListEngine};
//!
//! let engine = SmartListEngine::new(Arc::new(index));
//! let config = ListConfig::new().with_order("Name Ascending".parse()?).with_max_items(50);
//! let outcome = engine.refresh(&rule, owner_id, &config)?;
//! println!("{} items", outcome.item_ids.len());
//! ```

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod refresh;

pub use config::{EngineConfig, ListConfig};
pub use error::{EngineError, Result};
pub use orchestrator::{FilterOutcome, SmartListEngine};
pub use refresh::RefreshGate;
