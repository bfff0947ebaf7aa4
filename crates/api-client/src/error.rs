use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RequestError {
    /// No response was received (connection refused, DNS failure, broken body stream).
    #[error("Failed to reach the API: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("The API request returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Failed to deserialize the API response: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error("Failed to encode query parameters: {0}")]
    Query(#[from] serde_qs::Error),

    #[error("Invalid request URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid API configuration: {0}")]
    Config(#[from] configuration::error::ConfigError),
}

impl RequestError {
    /// The HTTP status, when the server responded at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RequestError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}
