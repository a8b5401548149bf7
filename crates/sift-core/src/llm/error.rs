use thiserror::Error;

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LLMError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("API returned error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// The model's reply could not be decoded into the requested record.
    #[error("Structured output decode failed: {message}")]
    StructuredDecode {
        message: String,
        /// The offending model output, kept for diagnosis.
        raw: String,
    },

    #[error("Rate limited. Try again later.")]
    RateLimited,

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl LLMError {
    /// Transient errors worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            LLMError::RateLimited | LLMError::Timeout(_) | LLMError::Network(_) => true,
            LLMError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for LLMError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LLMError::Timeout(err.to_string())
        } else {
            LLMError::Network(err.to_string())
        }
    }
}
