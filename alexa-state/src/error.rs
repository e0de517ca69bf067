//! Error types for the alexa-state crate

use alexa_api::ApiError;

/// Errors raised by refreshes, commands and account management
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// A remote call failed with a transient error; the next refresh retries it
    #[error("Remote session error: {0}")]
    Api(ApiError),

    /// The session is not authenticated and re-login did not recover it
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl StateError {
    pub fn is_auth(&self) -> bool {
        matches!(self, StateError::Authentication(_))
    }
}

impl From<ApiError> for StateError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Authentication(message) => StateError::Authentication(message),
            other => StateError::Api(other),
        }
    }
}

/// Result type for state operations
pub type Result<T> = std::result::Result<T, StateError>;
