//! Shared cache of compiled regular expressions.
//!
//! Invalid patterns are cached too (as `None`) so a broken rule logs once
//! and then simply never matches.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use regex::Regex;
use tracing::warn;

#[derive(Debug, Default)]
pub struct RegexCache {
    patterns: RwLock<HashMap<String, Option<Arc<Regex>>>>,
}

impl RegexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiled pattern, or `None` if it does not compile
    pub fn get(&self, pattern: &str) -> Option<Arc<Regex>> {
        if let Some(cached) = self.patterns.read().get(pattern) {
            return cached.clone();
        }

        let compiled = match Regex::new(pattern) {
            Ok(regex) => Some(Arc::new(regex)),
            Err(e) => {
                warn!("Invalid regex '{}' will never match: {}", pattern, e);
                None
            }
        };
        self.patterns
            .write()
            .entry(pattern.to_string())
            .or_insert(compiled)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.patterns.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.patterns.write().clear();
    }
}
