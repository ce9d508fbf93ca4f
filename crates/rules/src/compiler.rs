//! Compiles authored conditions into executable predicates.
//!
//! ## Failure policy
//! A condition that cannot be compiled (unknown field, operator that does
//! not fit the field, unparsable literal) is logged and dropped; the rest of
//! the rule set still compiles. A group that loses every one of its
//! conditions this way never matches, so a broken rule narrows rather than
//! widens the result.
//!
//! `SimilarTo` conditions are not turned into predicates. They are collected
//! as [`SimilarityTarget`]s and applied by the pipeline as an extra AND
//! over the score computed against the reference items.
//!
//! ## Similarity scope
//! Targets are pooled across groups. A `SimilarTo` authored in one group
//! gates items matched through any group, and the references of all
//! targets form one reference vector.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use tracing::{debug, warn};

use crate::error::{Result, RuleError};
use crate::field::{Field, FieldCost, ValueKind, condition_cost};
use crate::hash::RuleSetHash;
use crate::model::{Condition, RuleDefinition};
use crate::operator::Operator;
use crate::record::FeatureRecord;
use crate::regex_cache::RegexCache;
use crate::requirements::Requirements;

/// Executable test over one feature record
pub type Predicate = Arc<dyn Fn(&FeatureRecord) -> bool + Send + Sync>;

const SECONDS_PER_DAY: i64 = 86_400;
const NUMERIC_EPSILON: f64 = 1e-9;

// =============================================================================
// Compiled shapes
// =============================================================================

#[derive(Clone)]
pub struct CompiledCondition {
    pub field: Field,
    pub operator: Operator,
    pub cost: FieldCost,
    /// Collections condition that expands matching series into episodes
    pub expands_series: bool,
    /// Human-readable form for logs and error reports
    pub label: String,
    predicate: Predicate,
}

impl CompiledCondition {
    pub fn evaluate(&self, record: &FeatureRecord) -> bool {
        (self.predicate)(record)
    }

    pub fn is_cheap(&self) -> bool {
        self.cost == FieldCost::Cheap
    }
}

impl fmt::Debug for CompiledCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledCondition")
            .field("label", &self.label)
            .field("cost", &self.cost)
            .field("expands_series", &self.expands_series)
            .finish()
    }
}

/// AND over compiled conditions
#[derive(Debug, Clone)]
pub struct CompiledGroup {
    pub conditions: Vec<CompiledCondition>,
    /// False for empty groups and groups whose conditions were all dropped
    pub viable: bool,
}

impl CompiledGroup {
    fn matches_with(&self, record: &FeatureRecord, satisfied: &dyn Fn(&CompiledCondition) -> bool) -> bool {
        self.viable
            && self
                .conditions
                .iter()
                .all(|c| satisfied(c) || c.evaluate(record))
    }

    pub fn has_expensive(&self) -> bool {
        self.conditions.iter().any(|c| !c.is_cheap())
    }

    /// Holds a Collections condition that expands series into episodes
    pub fn expands_series(&self) -> bool {
        self.conditions.iter().any(|c| c.expands_series)
    }
}

/// Which catalog items act as "similar to" references
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityTarget {
    pub operator: Operator,
    pub value: String,
}

impl SimilarityTarget {
    /// Whether an item named `name` is one of the references
    pub fn matches_name(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        match self.operator {
            Operator::Contains => name.contains(&self.value.to_lowercase()),
            Operator::IsIn => split_list(&self.value).iter().any(|v| name == *v),
            _ => name == self.value.to_lowercase(),
        }
    }
}

/// A condition removed at compile time, with its position and reason
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedCondition {
    pub group: usize,
    pub index: usize,
    pub error: RuleError,
}

/// Outcome of the cheap-only pass for one item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheapVerdict {
    /// Every group has a failing cheap condition
    Reject,
    /// Some group is entirely cheap and fully satisfied
    Accept,
    /// Only groups with expensive conditions can still match
    NeedsFull,
}

/// Executable form of a [`RuleDefinition`]
#[derive(Debug)]
pub struct CompiledRuleSet {
    pub hash: RuleSetHash,
    pub rule_id: String,
    pub owner_key: String,
    groups: Vec<CompiledGroup>,
    similar_to: Vec<SimilarityTarget>,
    requirements: Requirements,
    dropped: Vec<DroppedCondition>,
    pass_through: bool,
}

impl CompiledRuleSet {
    pub fn groups(&self) -> &[CompiledGroup] {
        &self.groups
    }

    pub fn similar_to(&self) -> &[SimilarityTarget] {
        &self.similar_to
    }

    pub fn requirements(&self) -> &Requirements {
        &self.requirements
    }

    pub fn dropped(&self) -> &[DroppedCondition] {
        &self.dropped
    }

    /// Zero groups or zero authored conditions: every item matches
    pub fn is_pass_through(&self) -> bool {
        self.pass_through
    }

    pub fn has_cheap_conditions(&self) -> bool {
        self.groups
            .iter()
            .flat_map(|g| g.conditions.iter())
            .any(CompiledCondition::is_cheap)
    }

    /// A compiled Collections condition asks for series expansion
    pub fn expands_series(&self) -> bool {
        self.groups
            .iter()
            .flat_map(|g| g.conditions.iter())
            .any(|c| c.expands_series)
    }

    /// Full evaluation: OR over groups, AND within a group
    pub fn matches(&self, record: &FeatureRecord) -> bool {
        self.matches_with(record, &|_| false)
    }

    /// Indices of the expanding groups a series record satisfies.
    ///
    /// Empty when the series only matched through groups without an
    /// expanding Collections condition; such a series is not expanded.
    pub fn expansion_groups(&self, series: &FeatureRecord) -> Vec<usize> {
        self.groups
            .iter()
            .enumerate()
            .filter(|(_, g)| g.expands_series() && g.matches_with(series, &|_| false))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Evaluation for an expanded episode.
    ///
    /// In the groups listed in `inherited` (from [`Self::expansion_groups`]
    /// of the parent series) Collections conditions count as met, since the
    /// series satisfied them. Every other group is evaluated as usual.
    pub fn matches_inheriting_collections(&self, record: &FeatureRecord, inherited: &[usize]) -> bool {
        if self.pass_through {
            return true;
        }
        self.groups.iter().enumerate().any(|(idx, group)| {
            if inherited.contains(&idx) {
                group.matches_with(record, &|c| c.field == Field::Collections)
            } else {
                group.matches_with(record, &|_| false)
            }
        })
    }

    fn matches_with(&self, record: &FeatureRecord, satisfied: &dyn Fn(&CompiledCondition) -> bool) -> bool {
        if self.pass_through {
            return true;
        }
        self.groups.iter().any(|g| g.matches_with(record, satisfied))
    }

    /// Evaluate only the cheap conditions of each group
    pub fn cheap_verdict(&self, record: &FeatureRecord) -> CheapVerdict {
        if self.pass_through {
            return CheapVerdict::Accept;
        }

        let mut possible = false;
        for group in self.groups.iter().filter(|g| g.viable) {
            let cheap_ok = group
                .conditions
                .iter()
                .filter(|c| c.is_cheap())
                .all(|c| c.evaluate(record));
            if !cheap_ok {
                continue;
            }
            if !group.has_expensive() {
                return CheapVerdict::Accept;
            }
            possible = true;
        }

        if possible {
            CheapVerdict::NeedsFull
        } else {
            CheapVerdict::Reject
        }
    }
}

// =============================================================================
// Compiler
// =============================================================================

/// Turns rule definitions into [`CompiledRuleSet`]s
#[derive(Debug, Default)]
pub struct RuleCompiler {
    regexes: RegexCache,
}

impl RuleCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn regex_cache(&self) -> &RegexCache {
        &self.regexes
    }

    /// Compile a whole rule set for `owner_key`
    pub fn compile(&self, definition: &RuleDefinition, owner_key: &str) -> CompiledRuleSet {
        let hash = RuleSetHash::compute(definition, owner_key);
        self.compile_with_hash(definition, owner_key, hash)
    }

    pub(crate) fn compile_with_hash(
        &self,
        definition: &RuleDefinition,
        owner_key: &str,
        hash: RuleSetHash,
    ) -> CompiledRuleSet {
        let mut groups = Vec::with_capacity(definition.groups.len());
        let mut similar_to = Vec::new();
        let mut dropped = Vec::new();

        for (group_idx, group) in definition.groups.iter().enumerate() {
            let mut conditions = Vec::with_capacity(group.conditions.len());
            let mut predicate_conditions = 0usize;
            let mut group_dropped = 0usize;

            for (cond_idx, condition) in group.conditions.iter().enumerate() {
                let is_similarity = matches!(condition.field.parse::<Field>(), Ok(Field::SimilarTo));
                if !is_similarity {
                    predicate_conditions += 1;
                }

                let compiled = if is_similarity {
                    self.compile_similarity(condition).map(|t| similar_to.push(t))
                } else {
                    self.compile_condition(condition).map(|c| conditions.push(c))
                };

                if let Err(error) = compiled {
                    warn!(
                        rule = %definition.id,
                        group = group_idx,
                        condition = cond_idx,
                        "Dropping condition: {}",
                        error
                    );
                    group_dropped += 1;
                    dropped.push(DroppedCondition {
                        group: group_idx,
                        index: cond_idx,
                        error,
                    });
                }
            }

            let viable = !group.conditions.is_empty()
                && group_dropped < group.conditions.len()
                && (predicate_conditions == 0 || !conditions.is_empty());
            groups.push(CompiledGroup { conditions, viable });
        }

        debug!(
            rule = %definition.id,
            hash = %hash,
            groups = groups.len(),
            dropped = dropped.len(),
            "Compiled rule set"
        );

        CompiledRuleSet {
            hash,
            rule_id: definition.id.clone(),
            owner_key: owner_key.to_string(),
            groups,
            similar_to,
            requirements: Requirements::analyze(definition),
            dropped,
            pass_through: definition.is_pass_through(),
        }
    }

    /// Compile one condition into a predicate
    pub fn compile_condition(&self, condition: &Condition) -> Result<CompiledCondition> {
        let field: Field = condition.field.parse()?;
        let operator: Operator = condition
            .operator
            .parse()
            .map_err(|_| RuleError::UnknownOperator {
                field: condition.field.clone(),
                operator: condition.operator.clone(),
            })?;

        let kind = field.value_kind();
        if field == Field::SimilarTo || !operator.applies_to(kind) {
            return Err(RuleError::UnsupportedOperator {
                field: field.to_string(),
                operator: operator.to_string(),
            });
        }

        let user_key = if field.is_per_user() {
            condition.user_key()
        } else {
            None
        };
        let value = condition.value.as_str();

        let predicate: Predicate = match kind {
            ValueKind::Text => {
                let test = self.string_test(field, operator, value)?;
                Arc::new(move |r: &FeatureRecord| test.eval_one(r.text(field).unwrap_or("")))
            }
            ValueKind::TextList => {
                let test = self.string_test(field, operator, value)?;
                Arc::new(move |r: &FeatureRecord| test.eval_any(&r.list(field)))
            }
            ValueKind::Number => number_predicate(field, operator, value, user_key.clone())?,
            ValueKind::Date => date_predicate(field, operator, value, user_key.clone())?,
            ValueKind::Boolean => bool_predicate(field, operator, value, user_key.clone())?,
        };

        let mut label = format!("{} {} '{}'", field, operator, value);
        if let Some(user) = &user_key {
            label.push_str(&format!(" (user {})", user));
        }

        Ok(CompiledCondition {
            field,
            operator,
            cost: condition_cost(field, condition),
            expands_series: field == Field::Collections
                && condition.include_episodes_within_series == Some(true),
            label,
            predicate,
        })
    }

    fn compile_similarity(&self, condition: &Condition) -> Result<SimilarityTarget> {
        let operator: Operator = condition
            .operator
            .parse()
            .map_err(|_| RuleError::UnknownOperator {
                field: condition.field.clone(),
                operator: condition.operator.clone(),
            })?;
        if !matches!(operator, Operator::Equal | Operator::Contains | Operator::IsIn) {
            return Err(RuleError::UnsupportedOperator {
                field: Field::SimilarTo.to_string(),
                operator: operator.to_string(),
            });
        }
        if condition.value.trim().is_empty() {
            return Err(RuleError::EmptyValueList {
                field: Field::SimilarTo.to_string(),
            });
        }
        Ok(SimilarityTarget {
            operator,
            value: condition.value.trim().to_string(),
        })
    }

    fn string_test(&self, field: Field, operator: Operator, value: &str) -> Result<StringTest> {
        let case_sensitive = field.is_case_sensitive();
        let (positive, negate) = match operator.negated_form_of() {
            Some(positive) => (positive, true),
            None => (operator, false),
        };
        let fold = |s: &str| {
            if case_sensitive {
                s.to_string()
            } else {
                s.to_lowercase()
            }
        };

        let matcher = match positive {
            Operator::Equal => Matcher::Equal(fold(value)),
            Operator::Contains => Matcher::Contains(fold(value)),
            Operator::IsIn => {
                let entries: Vec<String> = value
                    .split(';')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(fold)
                    .collect();
                if entries.is_empty() {
                    return Err(RuleError::EmptyValueList {
                        field: field.to_string(),
                    });
                }
                Matcher::IsIn(entries)
            }
            Operator::MatchRegex => Matcher::Regex(self.regexes.get(value)),
            _ => {
                return Err(RuleError::UnsupportedOperator {
                    field: field.to_string(),
                    operator: operator.to_string(),
                });
            }
        };

        Ok(StringTest {
            matcher,
            case_sensitive,
            negate,
        })
    }
}

// =============================================================================
// Predicate builders
// =============================================================================

enum Matcher {
    Equal(String),
    Contains(String),
    IsIn(Vec<String>),
    /// `None` for a pattern that failed to compile
    Regex(Option<Arc<Regex>>),
}

struct StringTest {
    matcher: Matcher,
    case_sensitive: bool,
    negate: bool,
}

impl StringTest {
    fn matches(&self, value: &str) -> bool {
        let value: Cow<'_, str> = if self.case_sensitive || matches!(self.matcher, Matcher::Regex(_)) {
            Cow::Borrowed(value)
        } else {
            Cow::Owned(value.to_lowercase())
        };
        match &self.matcher {
            Matcher::Equal(needle) => *value == **needle,
            Matcher::Contains(needle) => value.contains(needle.as_str()),
            Matcher::IsIn(entries) => entries.iter().any(|e| value.contains(e.as_str())),
            Matcher::Regex(regex) => regex.as_ref().is_some_and(|r| r.is_match(&value)),
        }
    }

    fn broken(&self) -> bool {
        matches!(self.matcher, Matcher::Regex(None))
    }

    fn eval_one(&self, value: &str) -> bool {
        !self.broken() && self.matches(value) != self.negate
    }

    fn eval_any(&self, values: &[&str]) -> bool {
        !self.broken() && values.iter().any(|v| self.matches(v)) != self.negate
    }
}

fn number_predicate(field: Field, operator: Operator, value: &str, user_key: Option<String>) -> Result<Predicate> {
    let target: f64 = value
        .trim()
        .parse()
        .ok()
        .filter(|v: &f64| v.is_finite())
        .ok_or_else(|| RuleError::InvalidNumber {
            field: field.to_string(),
            value: value.to_string(),
        })?;

    Ok(Arc::new(move |r: &FeatureRecord| {
        match r.number(field, user_key.as_deref()) {
            Some(actual) => compare_numbers(operator, actual, target),
            None => operator == Operator::NotEqual,
        }
    }))
}

fn compare_numbers(operator: Operator, actual: f64, target: f64) -> bool {
    let equal = (actual - target).abs() < NUMERIC_EPSILON;
    match operator {
        Operator::Equal => equal,
        Operator::NotEqual => !equal,
        Operator::GreaterThan => actual > target && !equal,
        Operator::LessThan => actual < target && !equal,
        Operator::GreaterThanOrEqual => actual > target || equal,
        Operator::LessThanOrEqual => actual < target || equal,
        _ => false,
    }
}

fn date_predicate(field: Field, operator: Operator, value: &str, user_key: Option<String>) -> Result<Predicate> {
    let invalid = || RuleError::InvalidDate {
        field: field.to_string(),
        value: value.to_string(),
    };

    // Zero means "no date": no date operator matches it
    let predicate: Predicate = match operator {
        Operator::Equal => {
            let day = parse_absolute_date(value).ok_or_else(invalid)?.div_euclid(SECONDS_PER_DAY);
            Arc::new(move |r: &FeatureRecord| {
                let d = r.date(field, user_key.as_deref());
                d != 0 && d.div_euclid(SECONDS_PER_DAY) == day
            })
        }
        Operator::After => {
            let at = parse_absolute_date(value).ok_or_else(invalid)?;
            Arc::new(move |r: &FeatureRecord| {
                let d = r.date(field, user_key.as_deref());
                d != 0 && d > at
            })
        }
        Operator::Before => {
            let at = parse_absolute_date(value).ok_or_else(invalid)?;
            Arc::new(move |r: &FeatureRecord| {
                let d = r.date(field, user_key.as_deref());
                d != 0 && d < at
            })
        }
        Operator::NewerThan | Operator::OlderThan => {
            let age = parse_relative_age(value).ok_or_else(|| RuleError::InvalidRelativeDate {
                field: field.to_string(),
                value: value.to_string(),
            })?;
            let newer = operator == Operator::NewerThan;
            Arc::new(move |r: &FeatureRecord| {
                let d = r.date(field, user_key.as_deref());
                let cutoff = r.reference_time - age;
                d != 0 && if newer { d >= cutoff } else { d < cutoff }
            })
        }
        _ => {
            return Err(RuleError::UnsupportedOperator {
                field: field.to_string(),
                operator: operator.to_string(),
            });
        }
    };
    Ok(predicate)
}

fn bool_predicate(field: Field, operator: Operator, value: &str, user_key: Option<String>) -> Result<Predicate> {
    let target = match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => true,
        "false" | "no" | "0" => false,
        _ => {
            return Err(RuleError::InvalidBoolean {
                field: field.to_string(),
                value: value.to_string(),
            });
        }
    };
    let expect = if operator == Operator::NotEqual { !target } else { target };
    Ok(Arc::new(move |r: &FeatureRecord| {
        r.boolean(field, user_key.as_deref()) == expect
    }))
}

/// `YYYY-MM-DD` (midnight UTC) or RFC 3339, as Unix seconds
fn parse_absolute_date(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.timestamp());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}

/// `N:unit` or `N unit` (unit defaults to days), as seconds
fn parse_relative_age(value: &str) -> Option<i64> {
    let value = value.trim();
    let (amount, unit) = match value.split_once([':', ' ']) {
        Some((amount, unit)) => (amount.trim(), unit.trim()),
        None => (value, "days"),
    };
    let amount: f64 = amount.parse().ok().filter(|a: &f64| a.is_finite() && *a >= 0.0)?;
    let unit_seconds = match unit.to_ascii_lowercase().trim_end_matches('s') {
        "hour" => 3_600,
        "day" => SECONDS_PER_DAY,
        "week" => 7 * SECONDS_PER_DAY,
        "month" => 30 * SECONDS_PER_DAY,
        "year" => 365 * SECONDS_PER_DAY,
        _ => return None,
    };
    Some((amount * unit_seconds as f64) as i64)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ConditionGroup;
    use crate::record::UserPlayState;
    use library::{ItemKind, Person, PersonRole};
    use uuid::Uuid;

    const NOW: i64 = 1_700_000_000;

    fn record() -> FeatureRecord {
        let mut r = FeatureRecord::new(Uuid::new_v4(), ItemKind::Movie, "owner", NOW);
        r.name = "Alien".to_string();
        r.genres = vec!["Horror".to_string(), "Science Fiction".to_string()];
        r.production_year = Some(1979.0);
        r.community_rating = Some(8.5);
        r.folder_path = "/media/Movies/Alien".to_string();
        r.date_created = NOW - 10 * SECONDS_PER_DAY;
        r.people = vec![Person::new("Sigourney Weaver", PersonRole::Actor)];
        r
    }

    fn compile(field: &str, op: &str, value: &str) -> CompiledCondition {
        RuleCompiler::new()
            .compile_condition(&Condition::new(field, op, value))
            .unwrap()
    }

    fn check(field: &str, op: &str, value: &str) -> bool {
        compile(field, op, value).evaluate(&record())
    }

    #[test]
    fn test_text_operators() {
        assert!(check("Name", "Equal", "alien"));
        assert!(!check("Name", "NotEqual", "ALIEN"));
        assert!(check("Name", "Contains", "lie"));
        assert!(check("Name", "NotContains", "Predator"));
        assert!(check("Name", "IsIn", "Predator; Alien"));
        assert!(check("Name", "IsNotIn", "Predator;Terminator"));
        assert!(check("ItemType", "Equal", "movie"));
    }

    #[test]
    fn test_paths_compare_ordinally() {
        assert!(check("FolderPath", "Contains", "/Movies/"));
        assert!(!check("FolderPath", "Contains", "/movies/"));
    }

    #[test]
    fn test_list_operators() {
        assert!(check("Genres", "Contains", "science"));
        assert!(check("Genres", "Equal", "horror"));
        assert!(!check("Genres", "Equal", "hor"));
        assert!(check("Genres", "NotContains", "Comedy"));
        assert!(!check("Genres", "NotContains", "Horror"));
        assert!(check("Genres", "IsIn", "Comedy;Horror"));
        assert!(check("Actors", "Contains", "weaver"));
        assert!(!check("Directors", "Contains", "weaver"));
    }

    #[test]
    fn test_regex_and_invalid_regex() {
        assert!(check("Name", "MatchRegex", "^Ali"));
        assert!(!check("Name", "MatchRegex", "^ali"));
        assert!(check("Name", "MatchRegex", "(?i)^ali"));
        // Broken patterns never match, in either polarity
        assert!(!check("Name", "MatchRegex", "(unclosed"));
        assert!(!check("Name", "NotMatchRegex", "(unclosed"));
    }

    #[test]
    fn test_numeric_operators() {
        assert!(check("ProductionYear", "Equal", "1979"));
        assert!(check("ProductionYear", "LessThan", "1980"));
        assert!(check("CommunityRating", "GreaterThanOrEqual", "8.5"));
        assert!(!check("CommunityRating", "GreaterThan", "8.5"));
        // Missing values only satisfy NotEqual
        assert!(!check("CriticRating", "LessThan", "100"));
        assert!(check("CriticRating", "NotEqual", "50"));
    }

    #[test]
    fn test_non_numeric_literal_fails_compile() {
        let err = RuleCompiler::new()
            .compile_condition(&Condition::new("ProductionYear", "GreaterThan", "nineteen"))
            .unwrap_err();
        assert!(matches!(err, RuleError::InvalidNumber { .. }));
    }

    #[test]
    fn test_operator_must_fit_field() {
        let compiler = RuleCompiler::new();
        let err = compiler
            .compile_condition(&Condition::new("ProductionYear", "Contains", "19"))
            .unwrap_err();
        assert!(matches!(err, RuleError::UnsupportedOperator { .. }));
        let err = compiler
            .compile_condition(&Condition::new("Name", "Resembles", "x"))
            .unwrap_err();
        assert!(matches!(err, RuleError::UnknownOperator { .. }));
    }

    #[test]
    fn test_date_operators() {
        assert!(check("DateCreated", "NewerThan", "30:days"));
        assert!(!check("DateCreated", "NewerThan", "1:weeks"));
        assert!(check("DateCreated", "OlderThan", "1 week"));
        assert!(check("DateCreated", "After", "2020-01-01"));
        assert!(check("DateCreated", "Before", "2030-01-01T00:00:00Z"));
        // No release date on the record: nothing matches
        assert!(!check("ReleaseDate", "Before", "2030-01-01"));
        assert!(!check("ReleaseDate", "OlderThan", "1:days"));
    }

    #[test]
    fn test_date_equal_is_same_day() {
        let mut r = record();
        r.release_date = NaiveDate::from_ymd_opt(1979, 5, 25)
            .unwrap()
            .and_hms_opt(20, 30, 0)
            .unwrap()
            .and_utc()
            .timestamp();
        assert!(compile("ReleaseDate", "Equal", "1979-05-25").evaluate(&r));
        assert!(!compile("ReleaseDate", "Equal", "1979-05-26").evaluate(&r));
    }

    #[test]
    fn test_relative_age_parsing() {
        assert_eq!(parse_relative_age("2:weeks"), Some(14 * SECONDS_PER_DAY));
        assert_eq!(parse_relative_age("3"), Some(3 * SECONDS_PER_DAY));
        assert_eq!(parse_relative_age("1 year"), Some(365 * SECONDS_PER_DAY));
        assert_eq!(parse_relative_age("5:fortnights"), None);
        assert_eq!(parse_relative_age("-1:days"), None);
    }

    #[test]
    fn test_per_user_fields_use_condition_user() {
        let mut r = record();
        r.user_data.insert(
            "owner".to_string(),
            UserPlayState {
                played: true,
                play_count: 2,
                ..UserPlayState::default()
            },
        );
        let other = "8f2d7c1e-0000-4000-8000-000000000009";
        let compiler = RuleCompiler::new();

        let owner_played = compiler
            .compile_condition(&Condition::new("IsPlayed", "Equal", "true"))
            .unwrap();
        let other_played = compiler
            .compile_condition(&Condition::new("IsPlayed", "Equal", "true").with_user(other))
            .unwrap();
        assert!(owner_played.evaluate(&r));
        assert!(!other_played.evaluate(&r));
        assert!(other_played.label.contains(other));

        let count = compiler
            .compile_condition(&Condition::new("PlayCount", "GreaterThan", "1"))
            .unwrap();
        assert!(count.evaluate(&r));
    }

    #[test]
    fn test_boolean_parsing() {
        assert!(check("IsFavorite", "Equal", "false"));
        assert!(check("IsFavorite", "NotEqual", "True"));
        let err = RuleCompiler::new()
            .compile_condition(&Condition::new("IsFavorite", "Equal", "maybe"))
            .unwrap_err();
        assert!(matches!(err, RuleError::InvalidBoolean { .. }));
    }

    #[test]
    fn test_bad_condition_dropped_rest_survives() {
        let rule = RuleDefinition::new(
            "r",
            vec![ConditionGroup::new(vec![
                Condition::new("Genres", "Contains", "Horror"),
                Condition::new("ProductionYear", "GreaterThan", "soon"),
            ])],
        );
        let compiled = RuleCompiler::new().compile(&rule, "owner");
        assert_eq!(compiled.dropped().len(), 1);
        assert_eq!(compiled.dropped()[0].index, 1);
        assert!(compiled.matches(&record()));
    }

    #[test]
    fn test_group_with_only_broken_conditions_never_matches() {
        let rule = RuleDefinition::new(
            "r",
            vec![ConditionGroup::new(vec![Condition::new("Bogus", "Equal", "x")])],
        );
        let compiled = RuleCompiler::new().compile(&rule, "owner");
        assert!(!compiled.is_pass_through());
        assert!(!compiled.matches(&record()));
    }

    #[test]
    fn test_and_within_group_or_across_groups() {
        let both = RuleDefinition::new(
            "r",
            vec![ConditionGroup::new(vec![
                Condition::new("Genres", "Contains", "Horror"),
                Condition::new("ProductionYear", "GreaterThan", "2000"),
            ])],
        );
        let compiler = RuleCompiler::new();
        assert!(!compiler.compile(&both, "owner").matches(&record()));

        let mut with_fallback = both.clone();
        with_fallback.groups.push(ConditionGroup::new(vec![Condition::new(
            "Name",
            "NotEqual",
            "zzz",
        )]));
        assert!(compiler.compile(&with_fallback, "owner").matches(&record()));
    }

    #[test]
    fn test_empty_groups_never_match_but_all_empty_passes_through() {
        let compiler = RuleCompiler::new();
        let mixed = RuleDefinition::new(
            "r",
            vec![
                ConditionGroup::default(),
                ConditionGroup::new(vec![Condition::new("Name", "Equal", "Predator")]),
            ],
        );
        assert!(!compiler.compile(&mixed, "owner").matches(&record()));

        let empty = RuleDefinition::new("r", vec![ConditionGroup::default()]);
        let compiled = compiler.compile(&empty, "owner");
        assert!(compiled.is_pass_through());
        assert!(compiled.matches(&record()));
    }

    #[test]
    fn test_cheap_verdicts() {
        let compiler = RuleCompiler::new();
        let rule = RuleDefinition::new(
            "r",
            vec![
                ConditionGroup::new(vec![
                    Condition::new("Genres", "Contains", "Horror"),
                    Condition::new("Actors", "Contains", "Weaver"),
                ]),
                ConditionGroup::new(vec![Condition::new("Name", "Equal", "Predator")]),
            ],
        );
        let compiled = compiler.compile(&rule, "owner");
        assert!(compiled.has_cheap_conditions());
        assert_eq!(compiled.cheap_verdict(&record()), CheapVerdict::NeedsFull);

        let mut comedy = record();
        comedy.genres = vec!["Comedy".to_string()];
        assert_eq!(compiled.cheap_verdict(&comedy), CheapVerdict::Reject);

        let mut predator = comedy.clone();
        predator.name = "Predator".to_string();
        assert_eq!(compiled.cheap_verdict(&predator), CheapVerdict::Accept);
    }

    #[test]
    fn test_similarity_conditions_held_aside() {
        let rule = RuleDefinition::new(
            "r",
            vec![ConditionGroup::new(vec![Condition::new("SimilarTo", "Equal", "Alien")])],
        );
        let compiled = RuleCompiler::new().compile(&rule, "owner");
        assert_eq!(compiled.similar_to().len(), 1);
        assert!(compiled.groups()[0].conditions.is_empty());
        assert!(compiled.groups()[0].viable);
        assert!(compiled.matches(&record()));
        assert!(compiled.similar_to()[0].matches_name("ALIEN"));
        assert!(!compiled.similar_to()[0].matches_name("Aliens"));
    }

    #[test]
    fn test_collections_expansion_flag() {
        let rule = RuleDefinition::new(
            "r",
            vec![ConditionGroup::new(vec![
                Condition::new("Collections", "Contains", "Marvel").with_episodes_within_series(true),
                Condition::new("ProductionYear", "GreaterThan", "2000"),
            ])],
        );
        let compiled = RuleCompiler::new().compile(&rule, "owner");
        assert!(compiled.expands_series());

        let mut series = record();
        series.collections = vec!["Marvel Cinematic Universe".to_string()];
        series.production_year = Some(2015.0);
        assert_eq!(compiled.expansion_groups(&series), vec![0]);

        let mut episode = record();
        episode.production_year = Some(2015.0);
        assert!(!compiled.matches(&episode));
        assert!(compiled.matches_inheriting_collections(&episode, &[0]));
        assert!(!compiled.matches_inheriting_collections(&episode, &[]));
    }

    #[test]
    fn test_expansion_only_through_expanding_group() {
        let rule = RuleDefinition::new(
            "r",
            vec![
                ConditionGroup::new(vec![
                    Condition::new("Collections", "Contains", "marvel").with_episodes_within_series(true),
                    Condition::new("ProductionYear", "GreaterThanOrEqual", "2015"),
                ]),
                ConditionGroup::new(vec![Condition::new("Name", "Equal", "Lost")]),
            ],
        );
        let compiled = RuleCompiler::new().compile(&rule, "owner");

        // Series in no collection matches only the second group
        let mut series = record();
        series.name = "Lost".to_string();
        series.production_year = Some(2004.0);
        assert!(compiled.matches(&series));
        assert!(compiled.expansion_groups(&series).is_empty());

        // Its episode must not inherit a membership the series never had
        let mut episode = record();
        episode.name = "Pilot".to_string();
        episode.production_year = Some(2016.0);
        let inherited = compiled.expansion_groups(&series);
        assert!(!compiled.matches_inheriting_collections(&episode, &inherited));
    }

    #[test]
    fn test_similarity_targets_pooled_across_groups() {
        let rule = RuleDefinition::new(
            "r",
            vec![
                ConditionGroup::new(vec![Condition::new("Genres", "Contains", "Horror")]),
                ConditionGroup::new(vec![
                    Condition::new("Name", "Contains", "a"),
                    Condition::new("SimilarTo", "Equal", "Alien"),
                ]),
            ],
        );
        let compiled = RuleCompiler::new().compile(&rule, "owner");
        assert_eq!(compiled.similar_to().len(), 1);
        assert!(compiled.groups()[0].conditions.iter().all(|c| c.field != Field::SimilarTo));
        assert!(compiled.requirements().similarity);
    }
}
