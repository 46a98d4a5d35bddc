//! Category, symptom, keyword, and specialization tables.
//!
//! The catalog is the closed vocabulary of a conversation. Two layouts ship
//! with the crate: the standard six-category layout and a compact
//! four-category one. Both share the same keyword and specialization
//! tables, restricted to the symptoms they expose.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Symptom returned by the classifier when free text hits no keyword.
pub const DEFAULT_SYMPTOM: &str = "Поиск себя";

/// A top-level group of symptoms shown as a chip on the first question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Stable identifier used in events, e.g. "anxiety".
    pub id: String,
    /// User-facing title.
    pub title: String,
    /// Symptoms in display order.
    pub symptoms: Vec<String>,
    /// Self-help reading offered on the content-recommendation branch.
    #[serde(default)]
    pub reading: Vec<String>,
}

/// The vocabulary of one conversation layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub categories: Vec<Category>,
    /// Symptom → keyword stems matched as plain substrings.
    pub keywords: BTreeMap<String, Vec<String>>,
    /// Symptom → candidate specialization tags (many-to-many).
    pub specializations: BTreeMap<String, Vec<String>>,
    /// Canonical, possibly abbreviated, therapy method names.
    pub methods: Vec<String>,
    /// Classifier fallback; must be one of the catalog's symptoms.
    pub default_symptom: String,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl Catalog {
    /// Six categories.
    pub fn standard() -> Self {
        let categories = vec![
            category(
                "anxiety",
                "Тревога и стресс",
                &[
                    "Тревожность",
                    "Панические атаки",
                    "Стресс",
                    "Навязчивые мысли",
                    "Проблемы со сном",
                ],
                &["Как справиться с тревогой: техники заземления", "Дыхание 4-7-8 при панике"],
            ),
            category(
                "mood",
                "Настроение и энергия",
                &[
                    "Апатия",
                    "Депрессивное состояние",
                    "Эмоциональное выгорание",
                    "Перепады настроения",
                ],
                &["Выгорание: признаки и первые шаги", "Дневник настроения"],
            ),
            category(
                "relationships",
                "Отношения",
                &[
                    "Конфликты с партнёром",
                    "Расставание и развод",
                    "Одиночество",
                    "Созависимость",
                ],
                &["Как говорить о потребностях в паре", "Жизнь после расставания"],
            ),
            category(
                "family",
                "Семья и дети",
                &[
                    "Отношения с родителями",
                    "Детско-родительские отношения",
                    "Семейные конфликты",
                ],
                &["Границы со взрослыми родителями", "Кризисы возраста у детей"],
            ),
            category(
                "self",
                "Самооценка и самоопределение",
                &[
                    "Низкая самооценка",
                    "Поиск себя",
                    "Неуверенность в себе",
                    "Прокрастинация",
                ],
                &["Внутренний критик и как с ним договориться", "Ценности и смысл"],
            ),
            category(
                "crisis",
                "Кризисы и утраты",
                &[
                    "Переживание утраты",
                    "Травматический опыт",
                    "Кризис",
                    "Зависимости",
                ],
                &["Стадии горя", "Куда обратиться в остром кризисе"],
            ),
        ];
        Self::from_categories(categories)
    }

    /// Four categories, as in the shorter intake layout.
    pub fn compact() -> Self {
        let categories = vec![
            category(
                "anxiety",
                "Тревога",
                &["Тревожность", "Панические атаки", "Проблемы со сном"],
                &["Как справиться с тревогой: техники заземления"],
            ),
            category(
                "mood",
                "Настроение",
                &["Апатия", "Депрессивное состояние", "Эмоциональное выгорание"],
                &["Выгорание: признаки и первые шаги"],
            ),
            category(
                "relationships",
                "Отношения",
                &["Конфликты с партнёром", "Одиночество", "Отношения с родителями"],
                &["Как говорить о потребностях в паре"],
            ),
            category(
                "self",
                "Я и моя жизнь",
                &["Низкая самооценка", "Поиск себя", "Переживание утраты"],
                &["Ценности и смысл"],
            ),
        ];
        Self::from_categories(categories)
    }

    /// Build a catalog over `categories`, taking keyword and specialization
    /// entries from the bundled tables for the symptoms they contain.
    pub fn from_categories(categories: Vec<Category>) -> Self {
        let symptoms: BTreeSet<&str> = categories
            .iter()
            .flat_map(|c| c.symptoms.iter().map(String::as_str))
            .collect();

        let keywords = KEYWORDS
            .iter()
            .filter(|(s, _)| symptoms.contains(s))
            .map(|(s, kws)| (s.to_string(), kws.iter().map(|k| k.to_string()).collect()))
            .collect();

        let specializations = SPECIALIZATIONS
            .iter()
            .filter(|(s, _)| symptoms.contains(s))
            .map(|(s, tags)| (s.to_string(), tags.iter().map(|t| t.to_string()).collect()))
            .collect();

        Self {
            categories,
            keywords,
            specializations,
            methods: METHODS.iter().map(|m| m.to_string()).collect(),
            default_symptom: DEFAULT_SYMPTOM.to_string(),
        }
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// The category a symptom belongs to.
    pub fn category_of(&self, symptom: &str) -> Option<&Category> {
        self.categories
            .iter()
            .find(|c| c.symptoms.iter().any(|s| s == symptom))
    }

    pub fn contains_symptom(&self, category_id: &str, symptom: &str) -> bool {
        self.category(category_id)
            .is_some_and(|c| c.symptoms.iter().any(|s| s == symptom))
    }

    /// Match a user-supplied method against the canonical list, case-insensitively.
    pub fn canonical_method(&self, method: &str) -> Option<&str> {
        let needle = method.to_lowercase();
        self.methods
            .iter()
            .find(|m| m.to_lowercase() == needle)
            .map(String::as_str)
    }

    /// Specialization tags for one symptom; empty when unmapped.
    pub fn tags_for(&self, symptom: &str) -> &[String] {
        self.specializations
            .get(symptom)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Union of the tags mapped from every symptom in `symptoms`.
    pub fn search_tags<'a>(&self, symptoms: impl IntoIterator<Item = &'a String>) -> BTreeSet<String> {
        symptoms
            .into_iter()
            .flat_map(|s| self.tags_for(s).iter().cloned())
            .collect()
    }

    /// Reading list for the categories the given symptoms belong to, in
    /// catalog order without duplicates.
    pub fn reading_for(&self, symptoms: &BTreeSet<String>) -> Vec<String> {
        let touched: BTreeSet<&str> = symptoms
            .iter()
            .filter_map(|s| self.category_of(s))
            .map(|c| c.id.as_str())
            .collect();

        let mut out: Vec<String> = Vec::new();
        for category in self.categories.iter().filter(|c| touched.contains(c.id.as_str())) {
            for title in &category.reading {
                if !out.contains(title) {
                    out.push(title.clone());
                }
            }
        }
        out
    }

    /// Check the catalog's internal invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.categories.is_empty() {
            return Err(invalid("categories", "at least one category is required"));
        }

        let mut ids = BTreeSet::new();
        let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
        for category in &self.categories {
            if !ids.insert(category.id.as_str()) {
                return Err(invalid(
                    "categories",
                    &format!("duplicate category id '{}'", category.id),
                ));
            }
            if category.symptoms.is_empty() {
                return Err(invalid(
                    "categories",
                    &format!("category '{}' has no symptoms", category.id),
                ));
            }
            for symptom in &category.symptoms {
                if let Some(other) = seen.insert(symptom.as_str(), category.id.as_str()) {
                    return Err(invalid(
                        "categories",
                        &format!(
                            "symptom '{}' appears in both '{}' and '{}'",
                            symptom, other, category.id
                        ),
                    ));
                }
            }
        }

        if !seen.contains_key(self.default_symptom.as_str()) {
            return Err(invalid(
                "default_symptom",
                &format!("'{}' is not a catalog symptom", self.default_symptom),
            ));
        }

        for (table, map) in [("keywords", &self.keywords), ("specializations", &self.specializations)] {
            if let Some(unknown) = map.keys().find(|s| !seen.contains_key(s.as_str())) {
                return Err(invalid(
                    table,
                    &format!("'{}' is not a catalog symptom", unknown),
                ));
            }
        }

        for (symptom, keywords) in &self.keywords {
            if keywords.iter().any(|k| k.trim().is_empty()) {
                return Err(invalid(
                    "keywords",
                    &format!("empty keyword for '{}'", symptom),
                ));
            }
        }

        Ok(())
    }
}

fn category(id: &str, title: &str, symptoms: &[&str], reading: &[&str]) -> Category {
    Category {
        id: id.to_string(),
        title: title.to_string(),
        symptoms: symptoms.iter().map(|s| s.to_string()).collect(),
        reading: reading.iter().map(|s| s.to_string()).collect(),
    }
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

/// Keyword stems, matched as substrings. Short stems hit longer word
/// forms: "сон" matches inside "бессонница" and "сонливость".
const KEYWORDS: &[(&str, &[&str])] = &[
    ("Тревожность", &["тревог", "тревож", "беспоко", "волну", "страх"]),
    ("Панические атаки", &["паник", "паническ", "задыха", "сердцебиен"]),
    ("Стресс", &["стресс", "напряж", "нервн"]),
    ("Навязчивые мысли", &["навязчив", "зацикл", "не могу перестать думать"]),
    ("Проблемы со сном", &["сон", "бессонниц", "уснуть", "засып", "кошмар"]),
    ("Апатия", &["апати", "ничего не хочу", "нет сил", "безразлич"]),
    ("Депрессивное состояние", &["депресс", "грусть", "тоск", "плохое настроение"]),
    ("Эмоциональное выгорание", &["выгор", "устал", "переработ"]),
    ("Перепады настроения", &["перепад", "раздраж", "злость", "гнев"]),
    ("Конфликты с партнёром", &["партнер", "партнёр", "муж", "жена", "ссор"]),
    ("Расставание и развод", &["расстав", "развод", "бросил"]),
    ("Одиночество", &["одино", "нет друзей"]),
    ("Созависимость", &["созависим", "не могу без него", "не могу без нее"]),
    ("Отношения с родителями", &["родител", "мама", "мать", "отец", "папа"]),
    ("Детско-родительские отношения", &["ребен", "ребён", "дети", "детьми", "подрост"]),
    ("Семейные конфликты", &["семь", "семей"]),
    ("Низкая самооценка", &["самооцен", "стыд", "недостаточно хорош"]),
    ("Поиск себя", &["смысл", "кто я", "поиск себя", "предназначен"]),
    ("Неуверенность в себе", &["неуверен", "уверенност"]),
    ("Прокрастинация", &["прокраст", "откладыва", "лень"]),
    ("Переживание утраты", &["утрат", "умер", "смерт", "потер", "горе"]),
    ("Травматический опыт", &["травм", "насили", "птср"]),
    ("Кризис", &["кризис", "тупик"]),
    ("Зависимости", &["алкогол", "наркот", "зависимост"]),
];

const SPECIALIZATIONS: &[(&str, &[&str])] = &[
    ("Тревожность", &["anxiety"]),
    ("Панические атаки", &["panic", "anxiety"]),
    ("Стресс", &["stress", "anxiety"]),
    ("Навязчивые мысли", &["ocd", "anxiety"]),
    ("Проблемы со сном", &["sleep", "stress"]),
    ("Апатия", &["depression"]),
    ("Депрессивное состояние", &["depression"]),
    ("Эмоциональное выгорание", &["burnout", "stress"]),
    ("Перепады настроения", &["mood", "depression"]),
    ("Конфликты с партнёром", &["couples"]),
    ("Расставание и развод", &["divorce", "couples"]),
    ("Одиночество", &["loneliness", "self_esteem"]),
    ("Созависимость", &["codependency", "couples"]),
    ("Отношения с родителями", &["family"]),
    ("Детско-родительские отношения", &["parenting", "family"]),
    ("Семейные конфликты", &["family", "couples"]),
    ("Низкая самооценка", &["self_esteem"]),
    ("Поиск себя", &["self_discovery", "existential"]),
    ("Неуверенность в себе", &["self_esteem"]),
    ("Прокрастинация", &["procrastination"]),
    ("Переживание утраты", &["grief"]),
    ("Травматический опыт", &["trauma"]),
    ("Кризис", &["crisis", "existential"]),
    ("Зависимости", &["addiction"]),
];

const METHODS: &[&str] = &[
    "КПТ",
    "Гештальт",
    "Психоанализ",
    "Схема-терапия",
    "EMDR",
    "ACT",
    "Системная семейная терапия",
    "Экзистенциальная терапия",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_catalogs_validate() {
        Catalog::standard().validate().unwrap();
        Catalog::compact().validate().unwrap();
        assert_eq!(Catalog::standard().categories.len(), 6);
        assert_eq!(Catalog::compact().categories.len(), 4);
    }

    #[test]
    fn every_standard_symptom_has_keywords_and_tags() {
        let catalog = Catalog::standard();
        for category in &catalog.categories {
            for symptom in &category.symptoms {
                assert!(catalog.keywords.contains_key(symptom), "no keywords for {symptom}");
                assert!(!catalog.tags_for(symptom).is_empty(), "no tags for {symptom}");
            }
        }
    }

    #[test]
    fn compact_tables_are_restricted_to_its_symptoms() {
        let catalog = Catalog::compact();
        assert!(!catalog.keywords.contains_key("Зависимости"));
        assert!(!catalog.specializations.contains_key("Кризис"));
        assert!(catalog.keywords.contains_key("Панические атаки"));
    }

    #[test]
    fn search_tags_is_a_union() {
        let catalog = Catalog::standard();
        let symptoms: BTreeSet<String> = ["Панические атаки", "Стресс"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let tags = catalog.search_tags(&symptoms);
        let expected: BTreeSet<String> = ["panic", "anxiety", "stress"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(tags, expected);
    }

    #[test]
    fn lookups() {
        let catalog = Catalog::standard();
        assert_eq!(catalog.category_of("Кризис").unwrap().id, "crisis");
        assert!(catalog.contains_symptom("anxiety", "Стресс"));
        assert!(!catalog.contains_symptom("mood", "Стресс"));
        assert!(!catalog.contains_symptom("nope", "Стресс"));
        assert_eq!(catalog.canonical_method("кпт"), Some("КПТ"));
        assert_eq!(catalog.canonical_method("emdr"), Some("EMDR"));
        assert!(catalog.canonical_method("гипноз").is_none());
        assert!(catalog.tags_for("Неизвестно").is_empty());
    }

    #[test]
    fn reading_follows_selected_categories() {
        let catalog = Catalog::standard();
        let symptoms: BTreeSet<String> = ["Стресс", "Тревожность", "Кризис"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let reading = catalog.reading_for(&symptoms);
        assert_eq!(reading.len(), 4);
        assert_eq!(reading[0], "Как справиться с тревогой: техники заземления");
        assert_eq!(reading[3], "Куда обратиться в остром кризисе");
    }

    #[test]
    fn duplicate_symptom_is_rejected() {
        let mut catalog = Catalog::standard();
        catalog.categories[1].symptoms.push("Стресс".to_string());
        let err = catalog.validate().unwrap_err();
        assert!(err.to_string().contains("Стресс"));
    }

    #[test]
    fn unknown_default_symptom_is_rejected() {
        let mut catalog = Catalog::standard();
        catalog.default_symptom = "Что-то другое".to_string();
        assert!(matches!(
            catalog.validate(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "default_symptom"
        ));
    }

    #[test]
    fn keyword_for_unknown_symptom_is_rejected() {
        let mut catalog = Catalog::compact();
        catalog
            .keywords
            .insert("Зависимости".to_string(), vec!["алкогол".to_string()]);
        assert!(catalog.validate().is_err());
    }
}
