//! Error types for the alexa-stream crate.

use crate::events::PushEventKind;

/// Errors raised while interpreting push notifications.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// The notification carried none of the known event shapes
    #[error("Notification carries no known event shape")]
    UnknownShape,

    /// The notification matched a shape but lacked the device serial
    #[error("Malformed {kind:?} event: missing device serial")]
    MissingSerial {
        /// Shape that was recognised
        kind: PushEventKind,
    },

    /// The notification body was not valid JSON for any shape
    #[error("Failed to parse notification: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for EventError {
    fn from(error: serde_json::Error) -> Self {
        EventError::Parse(error.to_string())
    }
}

/// Convenience type alias for Results using EventError.
pub type Result<T> = std::result::Result<T, EventError>;
