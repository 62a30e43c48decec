use thiserror::Error;

/// Errors surfaced by router and rule operations.
///
/// Every variant carries a message meant to be shown to the user as-is.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DashError {
    /// Bad credentials or no token returned by the router
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The router accepted the call but the remote operation failed
    #[error("Server error: {0}")]
    Server(String),

    /// Transport or decoding failure
    #[error("Network error: {0}")]
    Network(String),

    /// Input rejected before any request was made
    #[error("Invalid input: {0}")]
    Validation(String),
}

impl DashError {
    pub fn validation(message: impl Into<String>) -> Self {
        DashError::Validation(message.into())
    }
}

impl From<reqwest::Error> for DashError {
    fn from(err: reqwest::Error) -> Self {
        DashError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for DashError {
    fn from(err: serde_json::Error) -> Self {
        DashError::Network(format!("Failed to decode router response: {}", err))
    }
}

impl From<url::ParseError> for DashError {
    fn from(err: url::ParseError) -> Self {
        DashError::Validation(format!("Invalid server address: {}", err))
    }
}

pub type DashResult<T> = std::result::Result<T, DashError>;
