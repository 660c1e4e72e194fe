//! The transport seam.
//!
//! A [`Transport`] performs the actual HTTP exchange. The dispatcher hands
//! it a base-URL-relative path and a [`TransportRequest`]; any HTTP library
//! can sit behind it. [`HttpTransport`](crate::HttpTransport) is the
//! reqwest-backed default.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::codec::{EncodedBody, HeaderPairs, QueryPairs};
use crate::retry::RetryConfig;

/// Per-call overrides handed to the transport.
///
/// `search_params` replaces the query built from the call parameters and
/// `headers` is merged over the parameter headers. Everything else is
/// passed through to the transport untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportOptions {
    /// Query pairs replacing the parameter query entirely.
    pub search_params: Option<QueryPairs>,
    /// Headers that win over parameter headers.
    pub headers: Option<HeaderPairs>,
    /// Request timeout.
    pub timeout: Option<Duration>,
    /// Retry policy.
    pub retry: Option<RetryConfig>,
    /// Turn non-2xx responses into errors.
    pub throw_http_errors: Option<bool>,
}

impl TransportOptions {
    /// No overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the query string.
    pub fn search_params<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.search_params = Some(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Add an override header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        let headers = self.headers.get_or_insert_with(Vec::new);
        match headers.iter().position(|(n, _)| *n == name) {
            Some(index) => headers[index].1 = value,
            None => headers.push((name, value)),
        }
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the retry policy.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Turn non-2xx responses into errors, or not.
    pub fn throw_http_errors(mut self, enable: bool) -> Self {
        self.throw_http_errors = Some(enable);
        self
    }
}

/// A fully encoded request, ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    /// Lowercase HTTP method.
    pub method: String,
    /// Headers, if any.
    pub headers: Option<HeaderPairs>,
    /// Query pairs, if any.
    pub search_params: Option<QueryPairs>,
    /// Body, if any.
    pub body: Option<EncodedBody>,
    /// Remaining pass-through options (timeout, retry, ...).
    pub options: PassThrough,
}

impl TransportRequest {
    /// A bare request with only a method.
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            headers: None,
            search_params: None,
            body: None,
            options: PassThrough::default(),
        }
    }

    /// Look up a header, ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .as_ref()?
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Override fields the dispatcher does not interpret.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassThrough {
    /// Request timeout.
    pub timeout: Option<Duration>,
    /// Retry policy.
    pub retry: Option<RetryConfig>,
    /// Turn non-2xx responses into errors.
    pub throw_http_errors: Option<bool>,
}

/// Something that can perform an HTTP exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Response handle returned to the caller as the envelope's `raw`.
    type Response: TransportResponse<Error = Self::Error>;
    /// Transport failure, surfaced to callers unchanged.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Perform one request against a base-URL-relative `url`.
    async fn call(
        &self,
        url: String,
        request: TransportRequest,
    ) -> Result<Self::Response, Self::Error>;
}

/// The parts of a response the dispatcher reads.
#[async_trait]
pub trait TransportResponse: Send + Sync {
    /// Error produced while reading the body.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Numeric HTTP status.
    fn status(&self) -> u16;

    /// Header value by case-insensitive name.
    fn header(&self, name: &str) -> Option<&str>;

    /// Parse the body as JSON.
    async fn json(&self) -> Result<Value, Self::Error>;
}
