//! Keyword classifier for free-text problem descriptions.
//!
//! Maps text to symptoms by plain substring containment of lowercase keyword
//! stems. No word boundaries, no scoring: a symptom is either hit or not.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::catalog::Catalog;

/// Outcome of a classification with the evidence behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Derived symptoms. Never empty.
    pub symptoms: BTreeSet<String>,
    /// Symptom → keywords that were found in the text.
    pub hits: BTreeMap<String, Vec<String>>,
    /// True when nothing matched and the default symptom was returned.
    pub used_fallback: bool,
}

/// Substring keyword matcher built from a catalog.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    groups: Vec<(String, Vec<String>)>,
    default_symptom: String,
}

impl KeywordClassifier {
    pub fn new(catalog: &Catalog) -> Self {
        let groups = catalog
            .keywords
            .iter()
            .map(|(symptom, keywords)| {
                let keywords = keywords.iter().map(|k| k.to_lowercase()).collect();
                (symptom.clone(), keywords)
            })
            .collect();
        Self {
            groups,
            default_symptom: catalog.default_symptom.clone(),
        }
    }

    /// Symptoms whose keyword group has at least one hit in `text`, or the
    /// default symptom when none do.
    pub fn classify(&self, text: &str) -> BTreeSet<String> {
        self.classify_detailed(text).symptoms
    }

    pub fn classify_detailed(&self, text: &str) -> Classification {
        let normalized = text.to_lowercase();

        let mut hits = BTreeMap::new();
        for (symptom, keywords) in &self.groups {
            let found: Vec<String> = keywords
                .iter()
                .filter(|k| normalized.contains(k.as_str()))
                .cloned()
                .collect();
            if !found.is_empty() {
                hits.insert(symptom.clone(), found);
            }
        }

        if hits.is_empty() {
            debug!(
                default = %self.default_symptom,
                "No keyword hits, falling back to default symptom"
            );
            return Classification {
                symptoms: BTreeSet::from([self.default_symptom.clone()]),
                hits,
                used_fallback: true,
            };
        }

        debug!(symptoms = ?hits.keys().collect::<Vec<_>>(), "Classified free text");
        Classification {
            symptoms: hits.keys().cloned().collect(),
            hits,
            used_fallback: false,
        }
    }
}
