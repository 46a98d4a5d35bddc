//! Conversation steps, i.e. which question the user is answering.

use serde::{Deserialize, Serialize};

/// The steps of an intake conversation.
///
/// The usual path is Category → Gender → Age → Method → Loading → Results.
/// Free-tier sessions leave after Category for ContentRecommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStep {
    Category,
    Gender,
    Age,
    Method,
    Loading,
    Results,
    ContentRecommendation,
}

impl ConversationStep {
    /// Steps that ask the user something and can be configured in the step order.
    pub fn is_question(&self) -> bool {
        matches!(self, Self::Category | Self::Gender | Self::Age | Self::Method)
    }

    /// Whether the conversation is over at this step.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Results | Self::ContentRecommendation)
    }

    /// Whether the user may move on without answering.
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::Method)
    }

    /// Check whether moving from `self` to `target` is allowed, given the
    /// question steps that are configured for this conversation.
    ///
    /// Forward moves go to the next configured question, or to Loading from
    /// the last one. Category may also branch to ContentRecommendation.
    pub fn can_transition_to(&self, target: ConversationStep, order: &[ConversationStep]) -> bool {
        use ConversationStep::*;
        match (self, target) {
            (Category, ContentRecommendation) => true,
            (Loading, Results) => true,
            (from, to) if from.is_question() => next_in(order, *from) == Some(to),
            _ => false,
        }
    }
}

/// The step that follows `step` in a configured question order; the last
/// question leads to Loading.
pub fn next_in(order: &[ConversationStep], step: ConversationStep) -> Option<ConversationStep> {
    let pos = order.iter().position(|s| *s == step)?;
    Some(order.get(pos + 1).copied().unwrap_or(ConversationStep::Loading))
}

impl Default for ConversationStep {
    fn default() -> Self {
        Self::Category
    }
}

impl std::fmt::Display for ConversationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Category => "category",
            Self::Gender => "gender",
            Self::Age => "age",
            Self::Method => "method",
            Self::Loading => "loading",
            Self::Results => "results",
            Self::ContentRecommendation => "content_recommendation",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConversationStep::*;

    const FULL: [ConversationStep; 4] = [Category, Gender, Age, Method];

    #[test]
    fn valid_transitions_in_full_order() {
        let transitions = [
            (Category, Gender),
            (Gender, Age),
            (Age, Method),
            (Method, Loading),
            (Loading, Results),
            (Category, ContentRecommendation),
        ];
        for (from, to) in transitions {
            assert!(from.can_transition_to(to, &FULL), "{from} should transition to {to}");
        }
    }

    #[test]
    fn invalid_transitions() {
        assert!(!Category.can_transition_to(Age, &FULL));
        assert!(!Age.can_transition_to(Gender, &FULL));
        assert!(!Gender.can_transition_to(Gender, &FULL));
        assert!(!Results.can_transition_to(Category, &FULL));
        assert!(!Gender.can_transition_to(ContentRecommendation, &FULL));
        assert!(!Loading.can_transition_to(Category, &FULL));
    }

    #[test]
    fn shorter_order_skips_missing_steps() {
        let order = [Category, Gender, Age];
        assert_eq!(next_in(&order, Age), Some(Loading));
        assert!(Age.can_transition_to(Loading, &order));
        assert!(!Age.can_transition_to(Method, &order));
        assert_eq!(next_in(&order, Method), None);
    }

    #[test]
    fn terminal_and_question_flags() {
        assert!(Results.is_terminal());
        assert!(ContentRecommendation.is_terminal());
        assert!(!Loading.is_terminal());
        assert!(Method.is_skippable());
        assert!(!Age.is_skippable());
        assert!(Category.is_question());
        assert!(!Loading.is_question());
    }

    #[test]
    fn display_matches_serde() {
        for step in [Category, Gender, Age, Method, Loading, Results, ContentRecommendation] {
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(format!("\"{step}\""), json, "Display and serde should match for {step:?}");
        }
    }
}
