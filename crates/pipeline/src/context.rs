//! Resolving the users a filtering pass evaluates against.
//!
//! The owner plus every identity referenced through a condition's `userId`
//! is resolved once, up front. Any identity that cannot be resolved aborts
//! the pass: silently evaluating such a condition against the owner would
//! produce a list for the wrong person.

use std::collections::HashMap;

use chrono::Utc;
use library::{LibraryAdapter, User, UserId};
use rules::{Requirements, normalize_user_key};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{PipelineError, Result};

/// Everything per-user a pass needs, gathered once
#[derive(Debug, Clone)]
pub struct UserContext {
    pub owner: User,
    /// Normalized key of the owner in the per-user feature maps
    pub owner_key: String,
    /// Owner and every referenced user, by normalized key
    pub users: HashMap<String, User>,
    /// Unix seconds captured when the pass started
    pub reference_time: i64,
}

impl UserContext {
    /// Context for the owner alone, stamped with the current time
    pub fn new(owner: User) -> Self {
        let owner_key = owner_key(owner.id);
        let mut users = HashMap::new();
        users.insert(owner_key.clone(), owner.clone());
        Self {
            owner,
            owner_key,
            users,
            reference_time: Utc::now().timestamp(),
        }
    }

    pub fn with_reference_time(mut self, reference_time: i64) -> Self {
        self.reference_time = reference_time;
        self
    }

    /// Users whose play state must be extracted, keyed by normalized identity
    pub fn users(&self) -> impl Iterator<Item = (&String, &User)> {
        self.users.iter()
    }
}

/// Normalized feature-map key for a user id
pub fn owner_key(id: UserId) -> String {
    normalize_user_key(&id.to_string())
}

/// Build a UserContext for `owner_id` and every user `requirements` names.
///
/// Fails with [`PipelineError::UserNotFound`] for the first identity that
/// does not parse as a user id or that the adapter does not know.
pub fn build_user_context(
    adapter: &dyn LibraryAdapter,
    owner_id: UserId,
    requirements: &Requirements,
) -> Result<UserContext> {
    let owner = adapter
        .get_user(owner_id)
        .ok_or_else(|| PipelineError::UserNotFound {
            user_id: owner_id.to_string(),
        })?;

    let mut context = UserContext::new(owner);

    for key in &requirements.extra_users {
        if context.users.contains_key(key) {
            continue;
        }
        let user = Uuid::parse_str(key)
            .ok()
            .and_then(|id| adapter.get_user(id))
            .ok_or_else(|| {
                warn!("Rule references unknown user '{}'", key);
                PipelineError::UserNotFound {
                    user_id: key.clone(),
                }
            })?;
        context.users.insert(key.clone(), user);
    }

    debug!(
        owner = %context.owner.name,
        users = context.users.len(),
        "Built user context"
    );
    Ok(context)
}
