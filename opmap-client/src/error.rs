//! Error types.
//!
//! The dispatch core never produces errors of its own: encoding is
//! best-effort and an unmatched status is not a failure. Errors come from
//! three places only, each with its own enum.

use std::time::Duration;
use thiserror::Error;

/// Result type for [`HttpTransport`](crate::HttpTransport) operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors raised while building an [`OperationRegistry`](crate::OperationRegistry).
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A descriptor declared `statusCodes` but left the list empty.
    #[error("operation `{key}` declares an empty statusCodes list")]
    EmptyStatusCodes {
        /// Operation key.
        key: String,
    },

    /// `"default"` appears more than once in a status list.
    #[error("operation `{key}` declares \"default\" more than once")]
    DuplicateDefault {
        /// Operation key.
        key: String,
    },

    /// The descriptor method is not one of GET/PUT/POST/PATCH/DELETE/HEAD.
    #[error("operation `{key}` uses unsupported method `{method}`")]
    UnsupportedMethod {
        /// Operation key.
        key: String,
        /// Method as declared.
        method: String,
    },

    /// The key is empty or has an empty segment (`"Api..get"`).
    #[error("invalid operation key `{0}`")]
    InvalidKey(String),

    /// The registry document is not valid JSON or has the wrong shape.
    #[error("failed to parse operation registry: {0}")]
    Parse(#[from] serde_json::Error),

    /// The registry file could not be read.
    #[error("failed to read operation registry: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by [`HttpTransport`](crate::HttpTransport).
#[derive(Debug, Error)]
pub enum ClientError {
    /// Request failed after all retries were used.
    #[error("Request failed after {attempts} attempts: {message}")]
    RetryExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Last error message.
        message: String,
    },

    /// Request timed out.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The request URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The request could not be assembled (bad method, header name or value).
    #[error("Failed to build request: {0}")]
    RequestBuild(String),

    /// Non-2xx response while `throw_http_errors` is enabled.
    #[error("Response error: {status} - {message}")]
    Response {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        message: String,
    },

    /// Response body is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Underlying HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl ClientError {
    /// Check if this error is worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Response { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_)) || matches!(self, Self::Http(e) if e.is_timeout())
    }

    /// Get the HTTP status code if this is a response error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Response { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Errors raised while loading a [`ClientConfig`](crate::ClientConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file extension is missing or not one of `json`/`toml`.
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// The file contents could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// An environment variable holds a value of the wrong type.
    #[error("Invalid value for {name}: {value}")]
    InvalidEnv {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
