//! Recommendation engine. Filters and ranks the candidate table.
//!
//! Filters are independent AND-conditions applied in order:
//! 1. gender (unless "any" or unanswered)
//! 2. age brackets, OR across the selected ones
//! 3. therapy methods, OR across the selected ones
//! 4. symptoms, through the symptom → specialization lookup
//!
//! When nothing survives, the filters are dropped and the top-rated
//! candidates are returned with `is_fallback` set.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::catalog::Catalog;
use super::model::{Candidate, Criteria, GenderPreference, RankedCandidate, Recommendation};
use crate::error::ConfigError;

/// Read-only access to the candidate table.
pub trait CandidateSource: Send + Sync {
    fn candidates(&self) -> &[Candidate];
}

impl CandidateSource for Vec<Candidate> {
    fn candidates(&self) -> &[Candidate] {
        self
    }
}

/// A candidate table loaded once, typically from a JSON file.
#[derive(Debug, Clone, Default)]
pub struct StaticCandidates {
    candidates: Vec<Candidate>,
}

impl StaticCandidates {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    /// Parse a JSON array of candidate records.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(Self::from_json_str(&raw)?)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl CandidateSource for StaticCandidates {
    fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }
}

/// Result-list sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationLimits {
    /// Cap on a genuine match list.
    pub max_results: usize,
    /// Size of the top-rated fallback list.
    pub fallback_results: usize,
}

impl Default for RecommendationLimits {
    fn default() -> Self {
        Self {
            max_results: 5,
            fallback_results: 3,
        }
    }
}

/// Case-insensitive either-contains-other match between a profile method
/// and a (possibly abbreviated) canonical method name. Blank names never match.
pub fn method_matches(candidate_method: &str, wanted: &str) -> bool {
    let a = candidate_method.trim().to_lowercase();
    let b = wanted.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}

/// Run the filter pipeline over `candidates` and rank the survivors.
pub fn recommend(
    criteria: &Criteria,
    candidates: &[Candidate],
    catalog: &Catalog,
    limits: RecommendationLimits,
) -> Recommendation {
    let search_tags = catalog.search_tags(&criteria.symptoms);

    let mut filtered: Vec<&Candidate> = candidates.iter().collect();

    if let Some(pref) = criteria.gender.filter(|g| *g != GenderPreference::Any) {
        filtered.retain(|c| pref.accepts(c.gender));
    }

    if !criteria.age_ranges.is_empty() {
        filtered.retain(|c| criteria.age_ranges.iter().any(|r| r.contains(c.age)));
    }

    if !criteria.methods.is_empty() {
        filtered.retain(|c| {
            c.methods
                .iter()
                .any(|m| criteria.methods.iter().any(|wanted| method_matches(m, wanted)))
        });
    }

    if !search_tags.is_empty() {
        filtered.retain(|c| !c.specializations.is_disjoint(&search_tags));
    }

    debug!(
        total = candidates.len(),
        remaining = filtered.len(),
        unconstrained = criteria.is_unconstrained(),
        tags = ?search_tags,
        "Applied recommendation filters"
    );

    let (mut ranked, is_fallback, cap) = if filtered.is_empty() {
        (candidates.iter().collect::<Vec<_>>(), true, limits.fallback_results)
    } else {
        (filtered, false, limits.max_results)
    };

    // Stable sort: equal ratings keep table order.
    ranked.sort_by(|a, b| b.rating.total_cmp(&a.rating));
    ranked.truncate(cap);

    let results: Vec<RankedCandidate> = ranked
        .into_iter()
        .map(|c| RankedCandidate {
            matched_symptoms: matched_symptoms(&criteria.symptoms, c, catalog),
            candidate: c.clone(),
        })
        .collect();

    let matched_symptoms = results
        .iter()
        .flat_map(|r| r.matched_symptoms.iter().cloned())
        .collect();

    info!(
        results = results.len(),
        is_fallback,
        "Recommendation ready"
    );

    Recommendation {
        results,
        is_fallback,
        matched_symptoms,
    }
}

/// Requested symptoms whose specialization tags this candidate covers.
fn matched_symptoms(
    symptoms: &BTreeSet<String>,
    candidate: &Candidate,
    catalog: &Catalog,
) -> BTreeSet<String> {
    symptoms
        .iter()
        .filter(|s| {
            catalog
                .tags_for(s)
                .iter()
                .any(|tag| candidate.specializations.contains(tag))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::model::{AgeRange, Gender};

    fn candidate(id: &str, gender: Gender, age: u32, tags: &[&str], methods: &[&str], rating: f64) -> Candidate {
        Candidate {
            id: id.to_string(),
            name: format!("Психолог {id}"),
            gender,
            age,
            specializations: tags.iter().map(|t| t.to_string()).collect(),
            methods: methods.iter().map(|m| m.to_string()).collect(),
            rating,
            experience_years: None,
            about: None,
        }
    }

    fn table() -> Vec<Candidate> {
        vec![
            candidate("a", Gender::Female, 29, &["panic", "sleep"], &["Когнитивно-поведенческая терапия (КПТ)"], 4.9),
            candidate("b", Gender::Male, 35, &["couples", "family"], &["Системная семейная терапия"], 4.7),
            candidate("c", Gender::Female, 38, &["depression", "burnout"], &["Гештальт-терапия"], 4.5),
            candidate("d", Gender::Male, 47, &["anxiety", "trauma"], &["EMDR", "КПТ"], 4.8),
            candidate("e", Gender::Female, 33, &["self_esteem"], &["Психоанализ"], 4.2),
            candidate("f", Gender::Male, 52, &["grief", "existential"], &["Экзистенциальная терапия"], 4.6),
            candidate("g", Gender::Female, 44, &["couples"], &["Гештальт"], 4.4),
        ]
    }

    fn symptoms(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn run(criteria: &Criteria) -> Recommendation {
        recommend(criteria, &table(), &Catalog::standard(), RecommendationLimits::default())
    }

    #[test]
    fn panic_attacks_match_exactly_tagged_candidates() {
        let criteria = Criteria {
            symptoms: symptoms(&["Панические атаки"]),
            gender: Some(GenderPreference::Any),
            ..Default::default()
        };
        let rec = run(&criteria);
        assert!(!rec.is_fallback);
        // "Панические атаки" maps to panic + anxiety: a and d.
        assert_eq!(rec.candidate_ids(), vec!["a", "d"]);
        assert!(rec.results.iter().all(|r| r.matched_symptoms.contains("Панические атаки")));
    }

    #[test]
    fn no_match_falls_back_to_top_three() {
        let criteria = Criteria {
            gender: Some(GenderPreference::Female),
            age_ranges: BTreeSet::from([AgeRange::From45]),
            ..Default::default()
        };
        let rec = run(&criteria);
        assert!(rec.is_fallback);
        assert_eq!(rec.candidate_ids(), vec!["a", "d", "b"]);
    }

    #[test]
    fn empty_criteria_returns_top_five_by_rating() {
        let rec = run(&Criteria::default());
        assert!(!rec.is_fallback);
        assert_eq!(rec.candidate_ids(), vec!["a", "d", "b", "f", "c"]);
        assert!(rec.matched_symptoms.is_empty());
    }

    #[test]
    fn results_are_capped_and_sorted() {
        let criteria = Criteria {
            gender: Some(GenderPreference::Any),
            ..Default::default()
        };
        let rec = run(&criteria);
        assert!(rec.results.len() <= 5);
        let ratings: Vec<f64> = rec.results.iter().map(|r| r.candidate.rating).collect();
        assert!(ratings.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn age_boundary_matches_both_adjacent_ranges() {
        for range in [AgeRange::From25To35, AgeRange::From35To45] {
            let criteria = Criteria {
                gender: Some(GenderPreference::Male),
                age_ranges: BTreeSet::from([range]),
                ..Default::default()
            };
            let rec = run(&criteria);
            assert!(!rec.is_fallback);
            assert_eq!(rec.candidate_ids(), vec!["b"], "range {range}");
        }
    }

    #[test]
    fn age_ranges_are_ored() {
        let criteria = Criteria {
            age_ranges: BTreeSet::from([AgeRange::From25To35, AgeRange::From45]),
            ..Default::default()
        };
        let rec = run(&criteria);
        assert_eq!(rec.candidate_ids(), vec!["a", "d", "b", "f", "e"]);
    }

    #[test]
    fn method_match_is_either_contains_other() {
        assert!(method_matches("Когнитивно-поведенческая терапия (КПТ)", "кпт"));
        assert!(method_matches("Гештальт", "Гештальт-терапия"));
        assert!(method_matches("EMDR", "emdr"));
        assert!(!method_matches("Психоанализ", "КПТ"));

        let criteria = Criteria {
            methods: BTreeSet::from(["Гештальт".to_string()]),
            ..Default::default()
        };
        assert_eq!(run(&criteria).candidate_ids(), vec!["c", "g"]);
    }

    #[test]
    fn blank_profile_methods_match_nothing() {
        assert!(!method_matches("", "КПТ"));
        assert!(!method_matches("   ", "EMDR"));
        assert!(!method_matches("КПТ", " "));

        let mut candidates = table();
        candidates.push(candidate("blank", Gender::Male, 30, &[], &["", "  "], 5.0));
        let criteria = Criteria {
            methods: BTreeSet::from(["Психоанализ".to_string()]),
            ..Default::default()
        };
        let rec = recommend(&criteria, &candidates, &Catalog::standard(), RecommendationLimits::default());
        assert!(!rec.is_fallback);
        assert_eq!(rec.candidate_ids(), vec!["e"]);
    }

    #[test]
    fn matched_symptoms_annotate_each_candidate() {
        let criteria = Criteria {
            symptoms: symptoms(&["Проблемы со сном", "Травматический опыт"]),
            ..Default::default()
        };
        let rec = run(&criteria);
        assert!(!rec.is_fallback);
        assert_eq!(rec.candidate_ids(), vec!["a", "d"]);
        assert_eq!(rec.results[0].matched_symptoms, symptoms(&["Проблемы со сном"]));
        assert_eq!(rec.results[1].matched_symptoms, symptoms(&["Травматический опыт"]));
        assert_eq!(rec.matched_symptoms, criteria.symptoms);
    }

    #[test]
    fn unmapped_symptoms_do_not_filter() {
        let criteria = Criteria {
            symptoms: symptoms(&["Несуществующий симптом"]),
            ..Default::default()
        };
        let rec = run(&criteria);
        assert!(!rec.is_fallback);
        assert_eq!(rec.results.len(), 5);
    }

    #[test]
    fn adding_constraints_never_grows_results() {
        let steps = [
            Criteria::default(),
            Criteria {
                gender: Some(GenderPreference::Female),
                ..Default::default()
            },
            Criteria {
                gender: Some(GenderPreference::Female),
                age_ranges: BTreeSet::from([AgeRange::From35To45]),
                ..Default::default()
            },
            Criteria {
                gender: Some(GenderPreference::Female),
                age_ranges: BTreeSet::from([AgeRange::From35To45]),
                symptoms: symptoms(&["Конфликты с партнёром"]),
                ..Default::default()
            },
        ];
        let mut previous = usize::MAX;
        for criteria in &steps {
            let rec = run(criteria);
            if rec.is_fallback {
                break;
            }
            assert!(rec.results.len() <= previous);
            previous = rec.results.len();
        }
        assert_eq!(previous, 1);
    }

    #[test]
    fn ties_keep_table_order() {
        let candidates = vec![
            candidate("x", Gender::Male, 30, &[], &[], 4.5),
            candidate("y", Gender::Male, 30, &[], &[], 4.5),
            candidate("z", Gender::Male, 30, &[], &[], 4.9),
        ];
        let rec = recommend(
            &Criteria::default(),
            &candidates,
            &Catalog::standard(),
            RecommendationLimits::default(),
        );
        assert_eq!(rec.candidate_ids(), vec!["z", "x", "y"]);
    }

    #[test]
    fn fallback_on_empty_table_is_empty() {
        let rec = recommend(
            &Criteria::default(),
            &[],
            &Catalog::standard(),
            RecommendationLimits::default(),
        );
        assert!(rec.is_fallback);
        assert!(rec.results.is_empty());
    }

    #[test]
    fn static_candidates_from_json() {
        let source = StaticCandidates::from_json_str(
            r#"[{"id": "p1", "gender": "male", "age": 40, "rating": 4.0}]"#,
        )
        .unwrap();
        assert_eq!(source.len(), 1);
        assert_eq!(source.candidates()[0].id, "p1");
        assert!(StaticCandidates::from_json_str("{").is_err());
    }

    #[test]
    fn static_candidates_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"id": "p1", "gender": "female", "age": 30, "rating": 4.5}}]"#).unwrap();
        let source = StaticCandidates::from_file(file.path()).unwrap();
        assert_eq!(source.candidates()[0].gender, Gender::Female);

        let dir = tempfile::tempdir().unwrap();
        let err = StaticCandidates::from_file(dir.path().join("none.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
