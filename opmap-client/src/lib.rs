//! # opmap client
//!
//! A runtime HTTP client driven by an operation map: a flat registry of
//! dotted operation keys (`"Api.Pets.getPet"`) describing method, path
//! template, declared status codes and request content type. The registry
//! is turned into a nested client whose leaves perform the call.
//!
//! ## Features
//!
//! - **Operation registry**: Built in code or loaded from JSON, key order preserved
//! - **Parameter encoding**: Path templates, repeated query keys, header merging,
//!   JSON / form / text / multipart bodies
//! - **Status resolution**: Exact code, then `NXX` class or `"default"` in declared order
//! - **Pluggable transport**: The [`Transport`] trait; [`HttpTransport`] is the reqwest default
//! - **Retry with Backoff**: Per-call or per-transport retry policy
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use opmap_client::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = OperationRegistry::from_json_str(r#"{
//!         "Api.Pets.getPet": {
//!             "operationId": "getPet",
//!             "method": "GET",
//!             "path": "/pets/{petId}",
//!             "statusCodes": [200, "4XX"]
//!         }
//!     }"#)?;
//!
//!     let config = ClientConfig::builder()
//!         .base_url("https://pets.example.com")
//!         .build();
//!     let client = ClientBuilder::new(HttpTransport::new(config)?).build(&registry);
//!
//!     let envelope = client
//!         .operation("Api.Pets.getPet")
//!         .ok_or("missing operation")?
//!         .call(RequestParams::new().path("petId", 123))
//!         .await?;
//!
//!     println!("Status: {}", envelope.status_code());
//!     Ok(())
//! }
//! ```

mod client;
mod codec;
mod config;
mod content;
mod dispatch;
mod error;
mod http_transport;
mod params;
mod registry;
mod retry;
mod status;
mod transport;

#[cfg(test)]
mod mock;

pub use client::{Client, ClientBuilder, ClientNode, Namespace, Operation};
pub use codec::{
    EncodedBody, HeaderPairs, QueryPairs, build_body, build_headers, build_query, build_url,
    merge_headers, query_string, stringify,
};
pub use config::{
    ClientConfig, ClientConfigBuilder, ENV_BASE_URL, ENV_THROW_HTTP_ERRORS, ENV_TIMEOUT_MS,
    ENV_USER_AGENT,
};
pub use content::{ContentKind, DEFAULT_CONTENT_TYPE};
pub use dispatch::{RequestDispatcher, ResolvedResponse, ResponseEnvelope, prepare_request};
pub use error::{ClientError, ConfigError, RegistryError, Result};
pub use http_transport::{HttpResponse, HttpTransport};
pub use params::{MultipartForm, Part, RequestBody, RequestParams};
pub use registry::{OperationDescriptor, OperationRegistry, SUPPORTED_METHODS};
pub use retry::{BackoffStrategy, RetryConfig};
pub use status::{ParseStatusError, StatusDescriptor, resolve_status};
pub use transport::{PassThrough, Transport, TransportOptions, TransportRequest, TransportResponse};

// Re-export common types
pub use http::{HeaderMap, HeaderValue, Method, StatusCode, header};
pub use bytes::Bytes;
pub use url::Url;

/// Prelude for common imports.
///
/// ```
/// use opmap_client::prelude::*;
/// ```
pub mod prelude {
    pub use crate::client::{Client, ClientBuilder, ClientNode, Namespace, Operation};
    pub use crate::config::{ClientConfig, ClientConfigBuilder};
    pub use crate::dispatch::{RequestDispatcher, ResolvedResponse, ResponseEnvelope};
    pub use crate::error::{ClientError, ConfigError, RegistryError};
    pub use crate::http_transport::{HttpResponse, HttpTransport};
    pub use crate::params::{MultipartForm, Part, RequestBody, RequestParams};
    pub use crate::registry::{OperationDescriptor, OperationRegistry};
    pub use crate::retry::{BackoffStrategy, RetryConfig};
    pub use crate::status::StatusDescriptor;
    pub use crate::transport::{Transport, TransportOptions, TransportRequest, TransportResponse};
}
