//! Error types for the intake engine.

/// Errors loading configuration or the candidate table.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::ParseError(e.to_string())
    }
}

/// Errors raised by the conversation layer when the presentation layer
/// hands it input that does not fit the catalog or the current step.
///
/// The session never propagates these to the user: handlers log them and
/// leave state untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeError {
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Symptom {symptom} does not belong to category {category}")]
    UnknownSymptom { category: String, symptom: String },

    #[error("Unknown therapy method: {0}")]
    UnknownMethod(String),

    #[error("Message {0} not found in conversation log")]
    MessageNotFound(uuid::Uuid),

    #[error("Cannot transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}
