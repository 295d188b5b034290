//! Error types for upstream API access.

use thiserror::Error;

/// Errors from the upstream HTTP clients and webhook verification.
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// The provider rate limited the request (HTTP 429 or quota exhaustion).
    #[error("Rate limited: {provider}")]
    RateLimited { provider: String },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout { provider: String },

    /// Authentication was rejected (HTTP 401/403).
    #[error("Unauthorized: {provider}")]
    Unauthorized { provider: String },

    /// Transport-level failure before a response was received.
    #[error("Transport error: {provider} - {message}")]
    Transport { provider: String, message: String },

    /// The provider failed server-side (HTTP 5xx); usually recoverable.
    #[error("Server error: {provider} - HTTP {status}")]
    ServerError { provider: String, status: u16 },

    /// The provider rejected the request (non-5xx, non-success response).
    #[error("API error: {provider} - {message}")]
    Api { provider: String, message: String },

    /// The response body could not be decoded.
    #[error("Malformed response: {provider} - {message}")]
    Malformed { provider: String, message: String },

    /// The webhook signature did not match the payload.
    #[error("Webhook signature verification failed")]
    InvalidSignature,

    /// The webhook payload could not be parsed.
    #[error("Malformed webhook payload: {0}")]
    MalformedWebhook(String),
}

impl UpstreamError {
    /// True for failures that a short, bounded retry can reasonably
    /// resolve. Authentication, client-side rejections and decoding
    /// failures are terminal.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::Timeout { .. }
                | Self::Transport { .. }
                | Self::ServerError { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, UpstreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_errors_are_transient() {
        let err = UpstreamError::ServerError {
            provider: "bank".to_string(),
            status: 500,
        };
        assert!(err.is_transient());
    }

    #[test]
    fn test_client_rejections_are_terminal() {
        let api = UpstreamError::Api {
            provider: "bank".to_string(),
            message: "HTTP 404".to_string(),
        };
        let auth = UpstreamError::Unauthorized {
            provider: "bank".to_string(),
        };
        assert!(!api.is_transient());
        assert!(!auth.is_transient());
    }
}
