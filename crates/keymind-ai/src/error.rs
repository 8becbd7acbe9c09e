//! AI service error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("API key required for {provider}")]
    MissingApiKey { provider: &'static str },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{provider} API error ({status}): {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl AiError {
    /// Whether the request gave up because the client timeout elapsed
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Network(e) if e.is_timeout())
    }
}
