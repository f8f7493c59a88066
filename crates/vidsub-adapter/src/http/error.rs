/*
[INPUT]:  Error sources (HTTP transport, envelope codes, serialization, URLs, IO)
[OUTPUT]: Structured error types with transport/application classification
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or improving error messages
*/

use thiserror::Error;

/// Main error type for the task service adapter
#[derive(Error, Debug)]
pub enum AdapterError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Service returned an envelope with a non-zero code
    #[error("API error (code {code}): {message}")]
    Api { code: i32, message: String },

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Reading a local upload failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid response from server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request exceeded the client timeout
    #[error("Request timeout after {duration}s")]
    Timeout { duration: u64 },
}

impl AdapterError {
    /// Failure below the envelope layer: the request never produced an answer.
    pub fn is_transport(&self) -> bool {
        match self {
            AdapterError::Http(err) => !err.is_decode() && !err.is_builder(),
            AdapterError::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        self.is_transport() || matches!(self, AdapterError::InvalidResponse(_))
    }

    /// Message reported by the service, if the failure came from an envelope.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            AdapterError::Api { message, .. } if !message.is_empty() => Some(message),
            _ => None,
        }
    }

    /// Envelope code, for application-level failures.
    pub fn api_code(&self) -> Option<i32> {
        match self {
            AdapterError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Result type alias for task service operations
pub type Result<T> = std::result::Result<T, AdapterError>;
