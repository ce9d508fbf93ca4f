//! Static analysis of what a rule set needs extracted.
//!
//! [`Requirements`] is the one capability set handed to the feature
//! extractor: which expensive lookups to run and which extra users to
//! resolve. It is computed from the authored rule alone, without touching
//! any item.

use std::collections::BTreeSet;

use crate::field::Field;
use crate::model::RuleDefinition;

/// Capability set describing which features a rule set needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirements {
    pub audio_languages: bool,
    pub people: bool,
    pub collections: bool,
    pub next_unwatched: bool,
    /// Episodes inherit the parent series name
    pub series_name: bool,
    /// Tags include tags of the parent series
    pub parent_series_tags: bool,
    /// A `SimilarTo` condition is present
    pub similarity: bool,
    /// A `Collections` condition asks for series to be expanded into episodes
    pub expand_series: bool,
    /// Next-unwatched may pick episodes of series nobody has started
    pub include_unwatched_series: bool,
    /// Normalized identities referenced through `userId`, deduplicated
    pub extra_users: BTreeSet<String>,
}

impl Default for Requirements {
    fn default() -> Self {
        Self {
            audio_languages: false,
            people: false,
            collections: false,
            next_unwatched: false,
            series_name: false,
            parent_series_tags: false,
            similarity: false,
            expand_series: false,
            include_unwatched_series: true,
            extra_users: BTreeSet::new(),
        }
    }
}

impl Requirements {
    /// Walk every condition of `definition` and collect what it needs.
    ///
    /// Conditions with unknown field names contribute nothing; they will be
    /// dropped by the compiler anyway.
    pub fn analyze(definition: &RuleDefinition) -> Self {
        let mut req = Requirements::default();

        for condition in definition.conditions() {
            let Ok(field) = condition.field.parse::<Field>() else {
                continue;
            };

            match field {
                Field::AudioLanguages => req.audio_languages = true,
                Field::People | Field::Actors | Field::Directors | Field::Writers | Field::Producers => {
                    req.people = true
                }
                Field::Collections => {
                    req.collections = true;
                    if condition.include_episodes_within_series == Some(true) {
                        req.expand_series = true;
                    }
                }
                Field::NextUnwatched => {
                    req.next_unwatched = true;
                    if condition.include_unwatched_series == Some(false) {
                        req.include_unwatched_series = false;
                    }
                }
                Field::SeriesName => req.series_name = true,
                Field::Tags if condition.include_parent_series_tags == Some(true) => {
                    req.parent_series_tags = true
                }
                Field::SimilarTo => req.similarity = true,
                _ => {}
            }

            if field.is_per_user() {
                if let Some(key) = condition.user_key() {
                    req.extra_users.insert(key);
                }
            }
        }

        req
    }

    /// Whether any expensive lookup is requested
    pub fn needs_expensive(&self) -> bool {
        self.audio_languages
            || self.people
            || self.collections
            || self.next_unwatched
            || self.series_name
            || self.parent_series_tags
    }

    /// Additionally request people (used when similarity compares cast/crew)
    pub fn with_people(mut self) -> Self {
        self.people = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Condition, ConditionGroup};

    fn rule(groups: Vec<Vec<Condition>>) -> RuleDefinition {
        RuleDefinition::new(
            "test",
            groups.into_iter().map(ConditionGroup::new).collect(),
        )
    }

    #[test]
    fn test_cheap_rule_needs_nothing_expensive() {
        let req = Requirements::analyze(&rule(vec![vec![
            Condition::new("Genres", "Contains", "Drama"),
            Condition::new("ProductionYear", "GreaterThan", "1990"),
        ]]));
        assert!(!req.needs_expensive());
        assert!(req.include_unwatched_series);
        assert!(req.extra_users.is_empty());
    }

    #[test]
    fn test_with_people_turns_on_expensive_work() {
        let req = Requirements::analyze(&rule(vec![vec![Condition::new("Genres", "Contains", "Drama")]]));
        assert!(!req.needs_expensive());
        let req = req.with_people();
        assert!(req.people);
        assert!(req.needs_expensive());
    }

    #[test]
    fn test_expensive_categories_detected() {
        let req = Requirements::analyze(&rule(vec![
            vec![
                Condition::new("Actors", "Contains", "Weaver"),
                Condition::new("AudioLanguages", "Contains", "jpn"),
            ],
            vec![
                Condition::new("Collections", "Contains", "Marvel").with_episodes_within_series(true),
                Condition::new("Tags", "Contains", "4K").with_parent_series_tags(true),
                Condition::new("SeriesName", "Equal", "Lost"),
            ],
        ]));
        assert!(req.people);
        assert!(req.audio_languages);
        assert!(req.collections);
        assert!(req.expand_series);
        assert!(req.parent_series_tags);
        assert!(req.series_name);
        assert!(!req.next_unwatched);
    }

    #[test]
    fn test_unwatched_series_policy_only_disabled_explicitly() {
        let permissive = Requirements::analyze(&rule(vec![vec![Condition::new(
            "NextUnwatched",
            "Equal",
            "true",
        )]]));
        assert!(permissive.next_unwatched);
        assert!(permissive.include_unwatched_series);

        let strict = Requirements::analyze(&rule(vec![
            vec![Condition::new("NextUnwatched", "Equal", "true").with_unwatched_series(true)],
            vec![Condition::new("NextUnwatched", "Equal", "true").with_unwatched_series(false)],
        ]));
        assert!(!strict.include_unwatched_series);
    }

    #[test]
    fn test_extra_users_deduplicated_and_normalized() {
        let id = "8F2D7C1E-0000-4000-8000-000000000002";
        let req = Requirements::analyze(&rule(vec![
            vec![Condition::new("IsPlayed", "Equal", "false").with_user(id)],
            vec![Condition::new("PlayCount", "Equal", "0").with_user(id.to_lowercase())],
            // Not a per-user field, so its userId is ignored
            vec![Condition::new("Genres", "Contains", "Drama").with_user("someone-else")],
        ]));
        assert_eq!(req.extra_users.len(), 1);
        assert!(req.extra_users.contains("8f2d7c1e-0000-4000-8000-000000000002"));
    }

    #[test]
    fn test_unknown_fields_and_empty_groups_contribute_nothing() {
        let req = Requirements::analyze(&rule(vec![
            vec![],
            vec![Condition::new("Bogus", "Equal", "x").with_user("ghost")],
        ]));
        assert_eq!(req, Requirements::default());
    }
}
