//! Error types for the console API client.
//!
//! # Design
//! Only `Http { status: 401, .. }` is ever recovered from inside the client
//! (by retrying with a fresh token). Every other variant is terminal and
//! reaches the caller unchanged. `Http` and `Transport` both mean "the call
//! failed"; callers that only need to show a message can treat them alike.

use thiserror::Error;

/// Errors returned by `ApiClient` calls.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The client could not be constructed (empty base URL, transport setup).
    #[error("invalid client configuration: {0}")]
    Configuration(String),

    /// The server answered outside 2xx and no retry applied.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request could not be assembled (invalid header name or value,
    /// malformed URL). Nothing was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No response was obtained (DNS, connect, timeout, broken stream).
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// A 2xx response body did not match the expected shape.
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),
}

impl ApiError {
    /// HTTP status carried by the error, if the server responded at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            return ApiError::InvalidRequest(err.to_string());
        }
        ApiError::Transport(Box::new(err))
    }
}
