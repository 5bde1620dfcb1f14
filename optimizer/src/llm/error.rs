use thiserror::Error;

/// Failures raised by the LLM layer.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Required credentials are absent; raised before any loop iteration.
    #[error("missing credentials for {provider}: {hint}")]
    MissingCredentials {
        provider: &'static str,
        hint: &'static str,
    },
    #[error("http client setup failed: {0}")]
    Client(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("rate limited by provider")]
    RateLimited,
    #[error("provider returned HTTP {status}: {message}")]
    Api { status: u16, message: String },
    #[error("failed to parse provider response: {0}")]
    Parse(String),
    #[error("provider returned no content")]
    EmptyResponse,
}

impl LlmError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::RateLimited => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
