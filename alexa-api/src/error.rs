use thiserror::Error;

/// Errors surfaced by a [`RemoteSession`](crate::RemoteSession)
///
/// The state core only distinguishes two families: authentication failures,
/// which trigger the shared re-login flow, and everything else, which is
/// treated as transient and retried naturally by the next refresh.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Session expired or credentials rejected
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Network communication error (timeouts, 5xx, connection resets)
    #[error("Network error: {0}")]
    Network(String),

    /// The remote service answered with a body that could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid parameter value
    ///
    /// Volume outside [0, 1], empty routine names, unknown bluetooth address.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl ApiError {
    /// Whether this error should be routed to the re-login flow
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Authentication(_))
    }
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        ApiError::Parse(error.to_string())
    }
}
