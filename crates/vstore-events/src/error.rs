/// Errors from event publication.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The broker did not accept the event.
    #[error("delivery to topic {topic} failed: {reason}")]
    Delivery { topic: String, reason: String },

    #[error("publisher state poisoned")]
    Poisoned,
}

impl From<serde_json::Error> for EventError {
    fn from(err: serde_json::Error) -> Self {
        EventError::Serialization(err.to_string())
    }
}

/// Result alias for event operations.
pub type EventResult<T> = Result<T, EventError>;
