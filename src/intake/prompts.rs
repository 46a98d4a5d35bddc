//! Bot copy for each step and the chips attached to each question.

use serde::{Deserialize, Serialize};

use super::catalog::Catalog;
use super::messages::{Chip, ChipOption};
use super::model::{AgeRange, GenderPreference, Recommendation};
use super::state::ConversationStep;

/// User-facing texts. Every field can be overridden from the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepPrompts {
    pub greeting: String,
    pub category: String,
    pub free_text_invite: String,
    pub free_text_chip: String,
    pub gender: String,
    pub gender_male: String,
    pub gender_female: String,
    pub gender_any: String,
    pub age: String,
    pub method: String,
    pub skip_method: String,
    pub no_method_answer: String,
    pub results: String,
    pub fallback_results: String,
    pub content_recommendation: String,
}

impl Default for StepPrompts {
    fn default() -> Self {
        Self {
            greeting: "Здравствуйте! Я помогу подобрать психолога. Это займёт пару минут.".into(),
            category: "Что вас беспокоит? Выберите темы или опишите своими словами.".into(),
            free_text_invite: "Расскажите, что происходит. Можно в свободной форме.".into(),
            free_text_chip: "Описать своими словами".into(),
            gender: "С психологом какого пола вам будет комфортнее?".into(),
            gender_male: "Мужчина".into(),
            gender_female: "Женщина".into(),
            gender_any: "Не важно".into(),
            age: "Какой возраст специалиста вам ближе? Можно выбрать несколько.".into(),
            method: "Есть ли предпочтения по методу терапии? Этот шаг можно пропустить.".into(),
            skip_method: "Пропустить".into(),
            no_method_answer: "Без предпочтений по методу".into(),
            results: "Вот специалисты, которые подходят под ваш запрос.".into(),
            fallback_results: "Точных совпадений нет, но эти специалисты с самым высоким рейтингом могут помочь.".into(),
            content_recommendation: "Пока вы на бесплатном тарифе, вот материалы по вашим темам.".into(),
        }
    }
}

impl StepPrompts {
    /// Question text for a question step.
    pub fn question_text(&self, step: ConversationStep) -> &str {
        match step {
            ConversationStep::Category => &self.category,
            ConversationStep::Gender => &self.gender,
            ConversationStep::Age => &self.age,
            ConversationStep::Method => &self.method,
            ConversationStep::Loading | ConversationStep::Results => &self.results,
            ConversationStep::ContentRecommendation => &self.content_recommendation,
        }
    }

    /// Chips attached to the question for `step`.
    pub fn chips(&self, step: ConversationStep, catalog: &Catalog) -> Vec<ChipOption> {
        let chips: Vec<Chip> = match step {
            ConversationStep::Category => catalog
                .categories
                .iter()
                .map(|c| Chip::Category(c.id.clone()))
                .chain(std::iter::once(Chip::FreeText))
                .collect(),
            ConversationStep::Gender => GenderPreference::all().into_iter().map(Chip::Gender).collect(),
            ConversationStep::Age => AgeRange::all().into_iter().map(Chip::Age).collect(),
            ConversationStep::Method => catalog
                .methods
                .iter()
                .cloned()
                .map(Chip::Method)
                .chain(std::iter::once(Chip::SkipMethod))
                .collect(),
            _ => Vec::new(),
        };

        chips
            .into_iter()
            .map(|chip| ChipOption {
                label: self.chip_label(&chip, catalog),
                chip,
            })
            .collect()
    }

    pub fn chip_label(&self, chip: &Chip, catalog: &Catalog) -> String {
        match chip {
            Chip::Category(id) => catalog
                .category(id)
                .map(|c| c.title.clone())
                .unwrap_or_else(|| id.clone()),
            Chip::FreeText => self.free_text_chip.clone(),
            Chip::Gender(g) => self.gender_label(*g).to_string(),
            Chip::Age(range) => range.label().to_string(),
            Chip::Method(m) => m.clone(),
            Chip::SkipMethod => self.skip_method.clone(),
        }
    }

    pub fn gender_label(&self, gender: GenderPreference) -> &str {
        match gender {
            GenderPreference::Male => &self.gender_male,
            GenderPreference::Female => &self.gender_female,
            GenderPreference::Any => &self.gender_any,
        }
    }

    pub fn results_text(&self, recommendation: &Recommendation) -> &str {
        if recommendation.is_fallback {
            &self.fallback_results
        } else {
            &self.results
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_chips_end_with_free_text() {
        let prompts = StepPrompts::default();
        let catalog = Catalog::standard();
        let chips = prompts.chips(ConversationStep::Category, &catalog);
        assert_eq!(chips.len(), 7);
        assert_eq!(chips[0].label, "Тревога и стресс");
        assert_eq!(chips.last().unwrap().chip, Chip::FreeText);
        assert_eq!(chips.last().unwrap().label, "Описать своими словами");
    }

    #[test]
    fn method_chips_end_with_skip() {
        let prompts = StepPrompts::default();
        let catalog = Catalog::standard();
        let chips = prompts.chips(ConversationStep::Method, &catalog);
        assert_eq!(chips.len(), catalog.methods.len() + 1);
        assert_eq!(chips.last().unwrap().chip, Chip::SkipMethod);
    }

    #[test]
    fn gender_and_age_chips() {
        let prompts = StepPrompts::default();
        let catalog = Catalog::standard();
        let gender: Vec<String> = prompts
            .chips(ConversationStep::Gender, &catalog)
            .into_iter()
            .map(|c| c.label)
            .collect();
        assert_eq!(gender, vec!["Мужчина", "Женщина", "Не важно"]);

        let age = prompts.chips(ConversationStep::Age, &catalog);
        assert_eq!(age.len(), 3);
        assert_eq!(age[2].label, "45+");
        assert!(prompts.chips(ConversationStep::Results, &catalog).is_empty());
    }

    #[test]
    fn partial_override_keeps_defaults() {
        let prompts: StepPrompts = serde_json::from_str(r#"{"greeting": "Привет!"}"#).unwrap();
        assert_eq!(prompts.greeting, "Привет!");
        assert_eq!(prompts.gender_any, "Не важно");
    }

    #[test]
    fn results_text_depends_on_fallback() {
        let prompts = StepPrompts::default();
        let mut rec = Recommendation::default();
        assert_eq!(prompts.results_text(&rec), prompts.results);
        rec.is_fallback = true;
        assert_eq!(prompts.results_text(&rec), prompts.fallback_results);
    }
}
