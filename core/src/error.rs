//! Error types for the API client.
//!
//! # Design
//! Each variant of `ApiError` names the stage of `ApiClient::request` that
//! failed, so callers can branch on cause. Every variant except `HttpStatus`
//! keeps the underlying error as its `source()`. Status failures carry only
//! the numeric code; the response body is discarded unread.

use std::io;

use thiserror::Error;

use crate::context::ContextError;

/// Errors returned by `ApiClient::request`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The method or URL could not be turned into a request. No network
    /// call was attempted.
    #[error("failed to build request: {0}")]
    RequestBuild(#[from] RequestBuildError),

    /// The transport failed to produce a response.
    #[error("failed to get API response: {0}")]
    Transport(#[from] TransportError),

    /// The server answered with a status code of 400 or above.
    #[error("response code is {status}")]
    HttpStatus { status: u16 },

    /// The response body is not valid JSON for the requested target.
    #[error("failed to decode JSON response: {0}")]
    Decode(#[source] serde_json::Error),
}

impl ApiError {
    /// The HTTP status for `HttpStatus` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::HttpStatus { status } => Some(*status),
            _ => None,
        }
    }

    /// True when the transport gave up because the context was cancelled
    /// or its deadline passed.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            ApiError::Transport(TransportError::Cancelled | TransportError::DeadlineExceeded)
        )
    }
}

/// Why a request could not be built.
#[derive(Debug, Error)]
pub enum RequestBuildError {
    #[error("parse {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid HTTP method {0:?}")]
    InvalidMethod(String),
}

/// Failures reported by a `Transport`.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("context canceled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    /// Wrap an arbitrary transport failure.
    pub fn other<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        TransportError::Other(err.into())
    }
}

impl From<ContextError> for TransportError {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::Cancelled => TransportError::Cancelled,
            ContextError::DeadlineExceeded => TransportError::DeadlineExceeded,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn messages_name_the_failing_stage() {
        let err = ApiError::from(TransportError::other("failed to do request"));
        assert_eq!(err.to_string(), "failed to get API response: failed to do request");

        let err = ApiError::HttpStatus { status: 400 };
        assert_eq!(err.to_string(), "response code is 400");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn invalid_url_message_quotes_the_input() {
        let source = url::Url::parse(":foo").unwrap_err();
        let err = ApiError::from(RequestBuildError::InvalidUrl {
            url: ":foo".to_string(),
            source,
        });
        assert_eq!(
            err.to_string(),
            format!("failed to build request: parse \":foo\": {source}")
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn context_errors_map_to_cancellation() {
        let err = ApiError::from(TransportError::from(ContextError::DeadlineExceeded));
        assert!(err.is_cancelled());
        assert_eq!(err.to_string(), "failed to get API response: context deadline exceeded");
        assert!(!ApiError::HttpStatus { status: 500 }.is_cancelled());
    }
}
