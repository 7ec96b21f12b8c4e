//! Error types for sage-ai

use thiserror::Error;

/// Result type alias using sage-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the model service clients
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error response
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Rate limit exceeded
    #[error("Rate limited: retry after {retry_after:?} seconds")]
    RateLimited { retry_after: Option<u64> },

    /// Missing API key
    #[error("Invalid or missing API key")]
    InvalidApiKey,

    /// Server-sent events error
    #[error("SSE error: {0}")]
    Sse(String),

    /// Speech-to-text failed
    #[error("Transcription failed: {0}")]
    Transcription(String),

    /// Embedding request failed or returned malformed vectors
    #[error("Embedding failed: {0}")]
    Embedding(String),
}

impl Error {
    /// Build an error from a non-success HTTP status and its body.
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Self::RateLimited { retry_after: None };
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Self::InvalidApiKey;
        }
        Self::Api {
            status: status.as_u16(),
            message: body,
        }
    }

    /// Check if this error is worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Error::RateLimited { .. } | Error::Sse(_) => true,
            Error::Api { status, message } => {
                let msg = message.to_lowercase();
                *status >= 500 || msg.contains("overloaded") || msg.contains("rate limit")
            }
            Error::Json(_) | Error::InvalidApiKey | Error::Transcription(_) | Error::Embedding(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_typed_variants() {
        assert!(Error::RateLimited { retry_after: Some(5) }.is_retryable());
        assert!(Error::Sse("connection reset".into()).is_retryable());
    }

    #[test]
    fn test_retryable_server_errors() {
        let e = Error::Api {
            status: 503,
            message: "Service Unavailable".into(),
        };
        assert!(e.is_retryable());
    }

    #[test]
    fn test_retryable_overloaded_message() {
        let e = Error::Api {
            status: 400,
            message: "Model is overloaded right now".into(),
        };
        assert!(e.is_retryable());
    }

    #[test]
    fn test_not_retryable_client_errors() {
        let e = Error::Api {
            status: 400,
            message: "tool_use_failed".into(),
        };
        assert!(!e.is_retryable());
        assert!(!Error::InvalidApiKey.is_retryable());
        assert!(!Error::Transcription("empty".into()).is_retryable());
        assert!(!Error::Embedding("width mismatch".into()).is_retryable());
    }

    #[test]
    fn test_from_status_maps_rate_limit_and_auth() {
        assert!(matches!(
            Error::from_status(reqwest::StatusCode::TOO_MANY_REQUESTS, String::new()),
            Error::RateLimited { .. }
        ));
        assert!(matches!(
            Error::from_status(reqwest::StatusCode::UNAUTHORIZED, String::new()),
            Error::InvalidApiKey
        ));
        match Error::from_status(reqwest::StatusCode::BAD_GATEWAY, "upstream".into()) {
            Error::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }
}
