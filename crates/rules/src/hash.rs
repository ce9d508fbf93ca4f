//! Content hash identifying a compiled rule set.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::model::RuleDefinition;

/// SHA-256 over rule identity, owner and every condition field, hex encoded
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleSetHash(String);

impl RuleSetHash {
    /// Hash everything that changes comparison or extraction.
    ///
    /// Each piece is length-prefixed so adjacent values cannot run together.
    pub fn compute(definition: &RuleDefinition, owner_key: &str) -> Self {
        fn put(hasher: &mut Sha256, value: &str) {
            hasher.update((value.len() as u64).to_le_bytes());
            hasher.update(value.as_bytes());
        }
        fn put_flag(hasher: &mut Sha256, flag: Option<bool>) {
            hasher.update([match flag {
                None => 0u8,
                Some(false) => 1,
                Some(true) => 2,
            }]);
        }

        let mut hasher = Sha256::new();
        put(&mut hasher, &definition.id);
        put(&mut hasher, owner_key);
        hasher.update((definition.groups.len() as u64).to_le_bytes());
        for group in &definition.groups {
            hasher.update((group.conditions.len() as u64).to_le_bytes());
            for condition in &group.conditions {
                put(&mut hasher, &condition.field);
                put(&mut hasher, &condition.operator);
                put(&mut hasher, &condition.value);
                put(&mut hasher, condition.user_id.as_deref().unwrap_or(""));
                put_flag(&mut hasher, condition.include_parent_series_tags);
                put_flag(&mut hasher, condition.include_unwatched_series);
                put_flag(&mut hasher, condition.include_episodes_within_series);
            }
        }
        RuleSetHash(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleSetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short prefix is plenty for logs
        f.write_str(&self.0[..self.0.len().min(12)])
    }
}
