use thiserror::Error;

/// Failures of a completion call, as seen by callers of [`crate::client::LlmClient`]
#[derive(Error, Debug)]
pub enum LlmError {
    /// The API key was missing or refused
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// HTTP 429; `retry_after` carries the `Retry-After` seconds when sent
    #[error("Rate limited: {message}")]
    RateLimit {
        message: String,
        retry_after: Option<u64>,
    },

    /// The provider rejected the request body
    #[error("Rejected request: {message}")]
    InvalidRequest { message: String },

    #[error("Provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Could not reach provider: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    /// A 2xx reply that carried no usable completion
    #[error("Unusable completion: {message}")]
    InvalidResponse { message: String },
}

impl LlmError {
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    pub fn rate_limit(message: impl Into<String>, retry_after: Option<u64>) -> Self {
        Self::RateLimit {
            message: message.into(),
            retry_after,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}
