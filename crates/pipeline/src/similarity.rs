//! Content similarity against reference items.
//!
//! The reference vector is the union of the term sets of every reference
//! item, per comparison field. A candidate's score is the mean Jaccard
//! overlap over the fields where either side has terms, so it always lies
//! in `[0, 1]` and an exact copy of a lone reference scores `1.0`.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use library::{ItemId, PersonRole};
use rules::FeatureRecord;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Feature compared when scoring similarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimilarityField {
    Genre,
    Tags,
    Studios,
    Actors,
    Directors,
    OfficialRating,
    Year,
}

impl SimilarityField {
    pub const DEFAULT: [SimilarityField; 2] = [SimilarityField::Genre, SimilarityField::Tags];

    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityField::Genre => "Genre",
            SimilarityField::Tags => "Tags",
            SimilarityField::Studios => "Studios",
            SimilarityField::Actors => "Actors",
            SimilarityField::Directors => "Directors",
            SimilarityField::OfficialRating => "OfficialRating",
            SimilarityField::Year => "Year",
        }
    }

    /// Scoring this field needs cast and crew extracted
    pub fn needs_people(&self) -> bool {
        matches!(self, SimilarityField::Actors | SimilarityField::Directors)
    }

    fn terms(&self, record: &FeatureRecord) -> HashSet<String> {
        let lower = |values: &[String]| -> HashSet<String> {
            values.iter().map(|v| v.to_lowercase()).collect()
        };
        let people = |roles: &[PersonRole]| -> HashSet<String> {
            record
                .people
                .iter()
                .filter(|p| roles.contains(&p.role))
                .map(|p| p.name.to_lowercase())
                .collect()
        };
        match self {
            SimilarityField::Genre => lower(&record.genres),
            SimilarityField::Tags => lower(&record.tags),
            SimilarityField::Studios => lower(&record.studios),
            SimilarityField::Actors => people(&[PersonRole::Actor, PersonRole::GuestStar]),
            SimilarityField::Directors => people(&[PersonRole::Director]),
            SimilarityField::OfficialRating => {
                let mut set = HashSet::new();
                if !record.official_rating.is_empty() {
                    set.insert(record.official_rating.to_lowercase());
                }
                set
            }
            SimilarityField::Year => record
                .production_year
                .map(|y| (y as i64).to_string())
                .into_iter()
                .collect(),
        }
    }
}

impl fmt::Display for SimilarityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimilarityField {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let wanted = match lower.as_str() {
            "genres" => "genre",
            "tag" => "tags",
            "studio" => "studios",
            "productionyear" => "year",
            other => other,
        };
        [
            SimilarityField::Genre,
            SimilarityField::Tags,
            SimilarityField::Studios,
            SimilarityField::Actors,
            SimilarityField::Directors,
            SimilarityField::OfficialRating,
            SimilarityField::Year,
        ]
        .into_iter()
        .find(|f| f.as_str().eq_ignore_ascii_case(wanted))
        .ok_or_else(|| PipelineError::InvalidSimilarityField(s.to_string()))
    }
}

/// Scores candidates against a fixed set of reference items
#[derive(Debug, Clone)]
pub struct SimilarityScorer {
    fields: Vec<SimilarityField>,
    reference: HashMap<SimilarityField, HashSet<String>>,
    reference_ids: HashSet<ItemId>,
}

impl SimilarityScorer {
    /// Build the reference vector once for a pass
    pub fn from_references(fields: &[SimilarityField], references: &[FeatureRecord]) -> Self {
        let fields: Vec<SimilarityField> = if fields.is_empty() {
            SimilarityField::DEFAULT.to_vec()
        } else {
            fields.to_vec()
        };

        let mut reference: HashMap<SimilarityField, HashSet<String>> = HashMap::new();
        for record in references {
            for field in &fields {
                reference.entry(*field).or_default().extend(field.terms(record));
            }
        }

        Self {
            fields,
            reference,
            reference_ids: references.iter().map(|r| r.item_id).collect(),
        }
    }

    pub fn has_references(&self) -> bool {
        !self.reference_ids.is_empty()
    }

    pub fn is_reference(&self, id: ItemId) -> bool {
        self.reference_ids.contains(&id)
    }

    /// Mean per-field Jaccard overlap with the reference vector
    pub fn score(&self, record: &FeatureRecord) -> f64 {
        let empty = HashSet::new();
        let mut total = 0.0;
        let mut counted = 0usize;

        for field in &self.fields {
            let candidate = field.terms(record);
            let reference = self.reference.get(field).unwrap_or(&empty);
            let union = candidate.union(reference).count();
            if union == 0 {
                continue;
            }
            let shared = candidate.intersection(reference).count();
            total += shared as f64 / union as f64;
            counted += 1;
        }

        if counted == 0 { 0.0 } else { total / counted as f64 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use library::{ItemKind, Person};
    use uuid::Uuid;

    fn record(genres: &[&str], tags: &[&str]) -> FeatureRecord {
        let mut r = FeatureRecord::new(Uuid::new_v4(), ItemKind::Movie, "owner", 0);
        r.genres = genres.iter().map(|s| s.to_string()).collect();
        r.tags = tags.iter().map(|s| s.to_string()).collect();
        r
    }

    #[test]
    fn test_identical_item_scores_one() {
        let reference = record(&["Horror", "Sci-Fi"], &["space"]);
        let scorer = SimilarityScorer::from_references(&[], &[reference.clone()]);
        let mut copy = reference.clone();
        copy.item_id = Uuid::new_v4();
        assert_eq!(scorer.score(&copy), 1.0);
        assert!(scorer.is_reference(reference.item_id));
        assert!(!scorer.is_reference(copy.item_id));
    }

    #[test]
    fn test_partial_overlap() {
        let scorer = SimilarityScorer::from_references(&[], &[record(&["Horror", "Sci-Fi"], &["space"])]);
        // Genre: 1/3, Tags: 0/2
        let score = scorer.score(&record(&["horror", "Comedy"], &["heist"]));
        assert!((score - (1.0 / 3.0) / 2.0).abs() < 1e-9);
        assert_eq!(scorer.score(&record(&["Romance"], &[])), 0.0);
    }

    #[test]
    fn test_fields_with_no_terms_are_ignored() {
        let scorer = SimilarityScorer::from_references(&[], &[record(&["Drama"], &[])]);
        assert_eq!(scorer.score(&record(&["Drama"], &[])), 1.0);
    }

    #[test]
    fn test_people_and_year_fields() {
        let mut reference = record(&[], &[]);
        reference.people = vec![Person::new("Ridley Scott", PersonRole::Director)];
        reference.production_year = Some(1979.0);
        let fields = [SimilarityField::Directors, SimilarityField::Year];
        let scorer = SimilarityScorer::from_references(&fields, &[reference]);

        let mut candidate = record(&[], &[]);
        candidate.people = vec![Person::new("ridley scott", PersonRole::Director)];
        candidate.production_year = Some(1982.0);
        assert_eq!(scorer.score(&candidate), 0.5);
        assert!(fields.iter().any(SimilarityField::needs_people));
    }

    #[test]
    fn test_parse_field_names() {
        assert_eq!("genres".parse::<SimilarityField>().unwrap(), SimilarityField::Genre);
        assert_eq!("Year".parse::<SimilarityField>().unwrap(), SimilarityField::Year);
        assert!("Mood".parse::<SimilarityField>().is_err());
    }
}
