//! Node and exchange transport errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    /// The node or exchange answered with an error. The message is kept
    /// verbatim.
    #[error("Exchange error: {message}")]
    Exchange { message: String },

    #[error("Request timed out: {0}")]
    RequestTimeout(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Missing field in response: {0}")]
    MissingField(String),
}

impl NodeError {
    pub fn exchange(message: impl Into<String>) -> Self {
        Self::Exchange {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for NodeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            let url = e.url().map(|u| u.to_string()).unwrap_or_default();
            Self::RequestTimeout(url)
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Http(e.to_string())
        }
    }
}

impl From<serde_json::Error> for NodeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

pub type NodeResult<T> = Result<T, NodeError>;
