//! Configuration types.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::intake::catalog::Catalog;
use crate::intake::prompts::StepPrompts;
use crate::intake::recommend::RecommendationLimits;
use crate::intake::state::ConversationStep;

/// Everything that differs between intake layouts: the vocabulary, which
/// questions are asked and in what order, the copy, and result sizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    pub catalog: Catalog,
    /// Question steps in order. Category must come first.
    pub steps: Vec<ConversationStep>,
    pub prompts: StepPrompts,
    pub limits: RecommendationLimits,
    /// Divert free-tier sessions to the content-recommendation step.
    pub content_branch: bool,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl IntakeConfig {
    /// Six categories, all four questions, content branch on.
    pub fn standard() -> Self {
        Self {
            catalog: Catalog::standard(),
            steps: vec![
                ConversationStep::Category,
                ConversationStep::Gender,
                ConversationStep::Age,
                ConversationStep::Method,
            ],
            prompts: StepPrompts::default(),
            limits: RecommendationLimits::default(),
            content_branch: true,
        }
    }

    /// Four categories, no method question, no content branch.
    pub fn compact() -> Self {
        Self {
            catalog: Catalog::compact(),
            steps: vec![
                ConversationStep::Category,
                ConversationStep::Gender,
                ConversationStep::Age,
            ],
            content_branch: false,
            ..Self::standard()
        }
    }

    /// Parse and validate a JSON config. Missing fields take the standard values.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.steps.first() {
            Some(ConversationStep::Category) => {}
            _ => {
                return Err(ConfigError::InvalidValue {
                    key: "steps".to_string(),
                    message: "the first step must be 'category'".to_string(),
                });
            }
        }

        for (i, step) in self.steps.iter().enumerate() {
            if !step.is_question() {
                return Err(ConfigError::InvalidValue {
                    key: "steps".to_string(),
                    message: format!("'{}' is not a question step", step),
                });
            }
            if self.steps[..i].contains(step) {
                return Err(ConfigError::InvalidValue {
                    key: "steps".to_string(),
                    message: format!("'{}' is listed twice", step),
                });
            }
        }

        if self.limits.max_results == 0 || self.limits.fallback_results == 0 {
            return Err(ConfigError::InvalidValue {
                key: "limits".to_string(),
                message: "result limits must be positive".to_string(),
            });
        }

        self.catalog.validate()
    }

    /// Whether the conversation asks `step`.
    pub fn asks(&self, step: ConversationStep) -> bool {
        self.steps.contains(&step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn bundled_configs_validate() {
        IntakeConfig::standard().validate().unwrap();
        IntakeConfig::compact().validate().unwrap();
        assert!(!IntakeConfig::compact().asks(ConversationStep::Method));
        assert!(IntakeConfig::standard().asks(ConversationStep::Method));
    }

    #[test]
    fn empty_json_is_standard() {
        let config = IntakeConfig::from_json_str("{}").unwrap();
        assert_eq!(config, IntakeConfig::standard());
    }

    #[test]
    fn json_roundtrip() {
        let config = IntakeConfig::compact();
        let json = serde_json::to_string(&config).unwrap();
        let parsed = IntakeConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn steps_must_start_with_category() {
        let err = IntakeConfig::from_json_str(r#"{"steps": ["gender", "category"]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "steps"));
    }

    #[test]
    fn non_question_and_duplicate_steps_are_rejected() {
        assert!(IntakeConfig::from_json_str(r#"{"steps": ["category", "results"]}"#).is_err());
        assert!(IntakeConfig::from_json_str(r#"{"steps": ["category", "age", "age"]}"#).is_err());
    }

    #[test]
    fn zero_limits_are_rejected() {
        let err = IntakeConfig::from_json_str(
            r#"{"limits": {"max_results": 0, "fallback_results": 3}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("limits"));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = IntakeConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"steps": ["category", "gender"], "content_branch": false, "prompts": {{"greeting": "Добрый день"}}}}"#
        )
        .unwrap();

        let config = IntakeConfig::from_file(file.path()).unwrap();
        assert_eq!(
            config.steps,
            vec![ConversationStep::Category, ConversationStep::Gender]
        );
        assert!(!config.content_branch);
        assert_eq!(config.prompts.greeting, "Добрый день");
        assert_eq!(config.catalog.categories.len(), 6);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = IntakeConfig::from_file(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
