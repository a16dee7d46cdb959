//! Error types for the lemlist API client.
//!
//! # Design
//! Every non-success status from the remote service lands in `HttpError`
//! with the raw status code and body, unchanged. A 404 is not split into its
//! own variant because the client never interprets it; callers that care use
//! `ApiError::is_not_found`. Precondition failures (`InvalidArgument`) are
//! raised before any request is built, so they never reach the network.

use thiserror::Error;

/// Errors returned by the gateway and the campaign operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The caller supplied insufficient or contradictory parameters.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// A success response whose body does not have the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The transport could not complete the round-trip.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// Status code of an `HttpError`, `None` for every other variant.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_display_includes_status_and_body() {
        let err = ApiError::HttpError {
            status: 400,
            body: "body is mandatory".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 400: body is mandatory");
        assert_eq!(err.status(), Some(400));
        assert!(!err.is_not_found());
    }

    #[test]
    fn not_found_is_reported_from_status() {
        let err = ApiError::HttpError {
            status: 404,
            body: String::new(),
        };
        assert!(err.is_not_found());
        assert!(!ApiError::InvalidArgument("x".into()).is_not_found());
        assert_eq!(ApiError::MalformedResponse("x".into()).status(), None);
    }
}
