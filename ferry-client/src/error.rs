//! Error types for the Ferry node client

use ferry_core::domain::node::AddressError;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to a node
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Node returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the node
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Node address cannot be turned into an endpoint
    #[error("Invalid node address: {0}")]
    InvalidAddress(#[from] AddressError),

    /// Node is temporarily unable to serve the request
    #[error("Node unavailable: {0}")]
    Unavailable(String),
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ApiError { status: 404, .. })
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 400 && *status < 500)
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 500)
    }

    /// Check if repeating the request may succeed
    ///
    /// Transport failures and server errors are transient; rejected requests
    /// and malformed responses are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::Unavailable(_) => true,
            Self::ApiError { .. } => self.is_server_error(),
            Self::ParseError(_) | Self::InvalidAddress(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let not_found = ClientError::api_error(404, "no such service");
        assert!(not_found.is_not_found());
        assert!(not_found.is_client_error());
        assert!(!not_found.is_retryable());

        let overloaded = ClientError::api_error(503, "busy");
        assert!(overloaded.is_server_error());
        assert!(overloaded.is_retryable());
    }

    #[test]
    fn test_unavailable_is_retryable() {
        assert!(ClientError::Unavailable("connection reset".into()).is_retryable());
        assert!(!ClientError::ParseError("bad json".into()).is_retryable());
    }
}
