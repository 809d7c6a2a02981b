//! Defines the error type returned by every remote operation
use reqwest::{Method, StatusCode};

use crate::config::GITHUB_ACCESS_TOKEN_ENV;

/// Error type of the binary, where any error ends the run
pub type BoxedError = Box<dyn core::error::Error + Send + Sync>;

/// The three classes of failure a caller has to tell apart
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or rejected credential
    Authentication,
    /// The organization, project, column or issue does not exist
    NotFound,
    /// Any other failed or malformed response
    RemoteService,
}

/// Custom error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No token was given and the environment doesn't define one
    #[error("no GitHub access token: pass one explicitly or set {GITHUB_ACCESS_TOKEN_ENV}")]
    MissingCredential,
    /// GitHub answered 401 or 403
    #[error("{method} {url} was rejected ({status}): {message}")]
    Authentication {
        /// HTTP method of the failing call
        method: Method,
        /// URL of the failing call
        url: String,
        /// Status returned by GitHub
        status: StatusCode,
        /// Response body
        message: String,
    },
    /// GitHub answered 404
    #[error("{method} {url} was not found: {message}")]
    NotFound {
        /// HTTP method of the failing call
        method: Method,
        /// URL of the failing call
        url: String,
        /// Response body
        message: String,
    },
    /// Any other non-2xx answer
    #[error("{method} {url} failed ({status}): {message}")]
    RemoteService {
        /// HTTP method of the failing call
        method: Method,
        /// URL of the failing call
        url: String,
        /// Status returned by GitHub
        status: StatusCode,
        /// Response body
        message: String,
    },
    /// The response body is not the JSON we expect
    #[error("{method} {url} returned an unexpected payload: {source}")]
    Decode {
        /// HTTP method of the failing call
        method: Method,
        /// URL of the failing call
        url: String,
        /// Underlying decoding error
        source: serde_json::Error,
    },
    /// The request could not be sent, or its body could not be read
    #[error("{method} {url} could not be completed: {source}")]
    Transport {
        /// HTTP method of the failing call
        method: Method,
        /// URL of the failing call
        url: String,
        /// Underlying [`reqwest`] error
        source: reqwest::Error,
    },
    /// The [`reqwest`] client could not be built
    #[error("unable to build the HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    /// The token can't be used as a header value
    #[error("the access token contains invalid characters")]
    InvalidToken(#[from] reqwest::header::InvalidHeaderValue),
    /// A URL returned by GitHub can't be parsed
    #[error("{url} is not a valid URL: {source}")]
    InvalidUrl {
        /// Offending URL
        url: String,
        /// Underlying parsing error
        source: url::ParseError,
    },
    /// A URL returned by GitHub can't take extra path segments
    #[error("{url} cannot be used as a base URL")]
    UrlCannotBeBase {
        /// Offending URL
        url: String,
    },
    /// Invalid environment configuration or argument
    #[error("{0}")]
    Config(String),
}

impl Error {
    /// Builds the error matching a non-2xx `status`
    pub fn from_status(method: Method, url: String, status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Authentication {
                method,
                url,
                status,
                message,
            },
            StatusCode::NOT_FOUND => Self::NotFound {
                method,
                url,
                message,
            },
            _ => Self::RemoteService {
                method,
                url,
                status,
                message,
            },
        }
    }

    /// Folds this error into one of the three [`ErrorKind`]
    pub const fn kind(&self) -> ErrorKind {
        match *self {
            Self::MissingCredential | Self::InvalidToken(_) | Self::Authentication { .. } => {
                ErrorKind::Authentication
            }
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::RemoteService { .. }
            | Self::Decode { .. }
            | Self::Transport { .. }
            | Self::Client(_)
            | Self::InvalidUrl { .. }
            | Self::UrlCannotBeBase { .. }
            | Self::Config(_) => ErrorKind::RemoteService,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(status: StatusCode) -> Error {
        Error::from_status(
            Method::GET,
            "https://api.github.com/orgs/acme/projects".to_owned(),
            status,
            "{}".to_owned(),
        )
    }

    #[test]
    fn status_codes_map_to_kinds() {
        assert_eq!(
            status_error(StatusCode::UNAUTHORIZED).kind(),
            ErrorKind::Authentication
        );
        assert_eq!(
            status_error(StatusCode::FORBIDDEN).kind(),
            ErrorKind::Authentication
        );
        assert_eq!(status_error(StatusCode::NOT_FOUND).kind(), ErrorKind::NotFound);
        assert_eq!(
            status_error(StatusCode::BAD_GATEWAY).kind(),
            ErrorKind::RemoteService
        );
        assert_eq!(Error::MissingCredential.kind(), ErrorKind::Authentication);
    }

    #[test]
    fn message_names_the_failing_call() {
        let msg = status_error(StatusCode::NOT_FOUND).to_string();
        assert!(msg.contains("GET https://api.github.com/orgs/acme/projects"));
    }
}
