//! Conversation log: the messages the presentation layer renders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::{AgeRange, GenderPreference, Recommendation};
use super::state::ConversationStep;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Bot,
    User,
}

/// A quick-reply chip attached to a bot question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Chip {
    /// Opens the symptom sheet for a category id.
    Category(String),
    /// "Describe it in my own words".
    FreeText,
    Gender(GenderPreference),
    Age(AgeRange),
    Method(String),
    SkipMethod,
}

impl Chip {
    /// The step whose question carries this chip.
    pub fn step(&self) -> ConversationStep {
        match self {
            Self::Category(_) | Self::FreeText => ConversationStep::Category,
            Self::Gender(_) => ConversationStep::Gender,
            Self::Age(_) => ConversationStep::Age,
            Self::Method(_) | Self::SkipMethod => ConversationStep::Method,
        }
    }
}

/// A chip with its display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipOption {
    pub chip: Chip,
    pub label: String,
}

/// Message body: plain text or one of the structured payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text {
        text: String,
    },
    Question {
        step: ConversationStep,
        text: String,
        chips: Vec<ChipOption>,
    },
    Results {
        text: String,
        recommendation: Recommendation,
    },
    ContentRecommendation {
        text: String,
        topics: Vec<String>,
        reading: Vec<String>,
    },
}

impl MessageContent {
    pub fn text(&self) -> &str {
        match self {
            Self::Text { text }
            | Self::Question { text, .. }
            | Self::Results { text, .. }
            | Self::ContentRecommendation { text, .. } => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: MessageContent,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: MessageContent) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content,
            timestamp: Utc::now(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(Role::Bot, MessageContent::Text { text: text.into() })
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, MessageContent::Text { text: text.into() })
    }

    pub fn question(step: ConversationStep, text: impl Into<String>, chips: Vec<ChipOption>) -> Self {
        Self::new(
            Role::Bot,
            MessageContent::Question {
                step,
                text: text.into(),
                chips,
            },
        )
    }

    /// The step this message asks about, if it is a question.
    pub fn question_step(&self) -> Option<ConversationStep> {
        match &self.content {
            MessageContent::Question { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// Whether this is a question that carries `chip`.
    pub fn offers(&self, chip: &Chip) -> bool {
        match &self.content {
            MessageContent::Question { chips, .. } => chips.iter().any(|o| &o.chip == chip),
            _ => false,
        }
    }

    pub fn text(&self) -> &str {
        self.content.text()
    }
}

/// Append-only list of messages, with truncation as the single exception.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageLog {
    messages: Vec<Message>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return its id.
    pub fn push(&mut self, message: Message) -> Uuid {
        let id = message.id;
        self.messages.push(message);
        id
    }

    pub fn find(&self, id: Uuid) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    fn position(&self, id: Uuid) -> Option<usize> {
        self.messages.iter().position(|m| m.id == id)
    }

    /// Drop every message after `id`, keeping `id` itself.
    ///
    /// Returns the number of removed messages, or `None` if `id` is not in
    /// the log (the log is left as is).
    pub fn truncate_after(&mut self, id: Uuid) -> Option<usize> {
        let pos = self.position(id)?;
        let removed = self.messages.len() - (pos + 1);
        self.messages.truncate(pos + 1);
        Some(removed)
    }

    /// The most recent question asked for `step`.
    pub fn last_question(&self, step: ConversationStep) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.question_step() == Some(step))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Plain-text transcript, one message per line.
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .map(|m| {
                let who = match m.role {
                    Role::Bot => "Bot",
                    Role::User => "User",
                };
                format!("{}: {}", who, m.text())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
