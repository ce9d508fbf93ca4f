//! Declarative rule shapes as authored by users.
//!
//! A [`RuleDefinition`] is an OR over [`ConditionGroup`]s, each of which is
//! an AND over [`Condition`]s. Field and operator stay as the strings the
//! author wrote; they are resolved to closed enums by the compiler, so one
//! misspelled field only costs that one condition.

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Atomic test against one feature of an item
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(alias = "memberName")]
    pub field: String,
    pub operator: String,
    #[serde(default, alias = "targetValue")]
    pub value: String,
    /// Evaluate per-user fields against this user instead of the list owner
    #[serde(default)]
    pub user_id: Option<String>,
    /// `Tags`: also match tags of the parent series
    #[serde(default)]
    pub include_parent_series_tags: Option<bool>,
    /// `NextUnwatched`: consider series nobody has started
    #[serde(default)]
    pub include_unwatched_series: Option<bool>,
    /// `Collections`: expand matching series into their episodes
    #[serde(default)]
    pub include_episodes_within_series: Option<bool>,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
            user_id: None,
            include_parent_series_tags: None,
            include_unwatched_series: None,
            include_episodes_within_series: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_parent_series_tags(mut self, include: bool) -> Self {
        self.include_parent_series_tags = Some(include);
        self
    }

    pub fn with_unwatched_series(mut self, include: bool) -> Self {
        self.include_unwatched_series = Some(include);
        self
    }

    pub fn with_episodes_within_series(mut self, include: bool) -> Self {
        self.include_episodes_within_series = Some(include);
        self
    }

    /// Normalized identity of the referenced user, if the condition names one
    pub fn user_key(&self) -> Option<String> {
        self.user_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(normalize_user_key)
    }
}

/// AND-combined conditions
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConditionGroup {
    #[serde(default, alias = "expressions", deserialize_with = "null_as_default")]
    pub conditions: Vec<Condition>,
}

impl ConditionGroup {
    pub fn new(conditions: Vec<Condition>) -> Self {
        Self { conditions }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// A whole rule set: OR over groups
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDefinition {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "expressionSets", deserialize_with = "groups_skip_null")]
    pub groups: Vec<ConditionGroup>,
}

impl RuleDefinition {
    pub fn new(id: impl Into<String>, groups: Vec<ConditionGroup>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            groups,
        }
    }

    /// All conditions across all groups, in authored order
    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        self.groups.iter().flat_map(|g| g.conditions.iter())
    }

    /// Zero groups or zero conditions overall: every item matches
    pub fn is_pass_through(&self) -> bool {
        self.conditions().next().is_none()
    }
}

/// Canonical form of a user identity used as a feature-map key.
///
/// UUIDs are rendered hyphenated and lower-case regardless of how they were
/// written; anything else is kept verbatim (and will fail to resolve).
pub fn normalize_user_key(raw: &str) -> String {
    let raw = raw.trim();
    match Uuid::parse_str(raw) {
        Ok(id) => id.hyphenated().to_string(),
        Err(_) => raw.to_string(),
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// A `null` entry in the group list becomes an empty group, which never matches.
fn groups_skip_null<'de, D>(deserializer: D) -> std::result::Result<Vec<ConditionGroup>, D::Error>
where
    D: Deserializer<'de>,
{
    let groups: Option<Vec<Option<ConditionGroup>>> = Option::deserialize(deserializer)?;
    Ok(groups
        .unwrap_or_default()
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect())
}
