//! Per-category symptom selections made through the category sheets.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::catalog::Catalog;
use crate::error::IntakeError;

/// Category id → selected symptoms.
///
/// Every stored symptom belongs to the category it is keyed under; the
/// catalog is checked on each toggle. Empty sets are dropped so the map only
/// holds categories with a live selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    selected: BTreeMap<String, BTreeSet<String>>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip `symptom` in `category_id`. Returns whether it is selected afterwards.
    pub fn toggle_symptom(
        &mut self,
        catalog: &Catalog,
        category_id: &str,
        symptom: &str,
    ) -> Result<bool, IntakeError> {
        if catalog.category(category_id).is_none() {
            return Err(IntakeError::UnknownCategory(category_id.to_string()));
        }
        if !catalog.contains_symptom(category_id, symptom) {
            return Err(IntakeError::UnknownSymptom {
                category: category_id.to_string(),
                symptom: symptom.to_string(),
            });
        }

        let set = self.selected.entry(category_id.to_string()).or_default();
        let now_selected = if set.remove(symptom) {
            false
        } else {
            set.insert(symptom.to_string());
            true
        };
        if set.is_empty() {
            self.selected.remove(category_id);
        }
        Ok(now_selected)
    }

    /// Number of symptoms currently selected in a category (badge counter).
    pub fn selected_count(&self, category_id: &str) -> usize {
        self.selected.get(category_id).map_or(0, BTreeSet::len)
    }

    pub fn is_selected(&self, category_id: &str, symptom: &str) -> bool {
        self.selected
            .get(category_id)
            .is_some_and(|set| set.contains(symptom))
    }

    /// All selected symptoms, flattened across categories.
    pub fn all_selected(&self) -> BTreeSet<String> {
        self.selected.values().flatten().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Serialized selections for the user's summary message, e.g.
    /// `"Тревога и стресс: Тревожность, Стресс; Отношения: Одиночество"`.
    ///
    /// Categories and symptoms follow catalog display order.
    pub fn summary(&self, catalog: &Catalog) -> String {
        catalog
            .categories
            .iter()
            .filter_map(|category| {
                let set = self.selected.get(&category.id)?;
                let symptoms: Vec<&str> = category
                    .symptoms
                    .iter()
                    .filter(|s| set.contains(*s))
                    .map(String::as_str)
                    .collect();
                Some(format!("{}: {}", category.title, symptoms.join(", ")))
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}
