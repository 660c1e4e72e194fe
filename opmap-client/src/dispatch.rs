//! Request dispatch.
//!
//! One call runs strictly in sequence: build URL, build the transport
//! request, call the transport, parse the body, resolve the status.
//! Nothing is caught along the way.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::codec::{build_body, build_headers, build_query, build_url, merge_headers};
use crate::params::RequestParams;
use crate::registry::OperationDescriptor;
use crate::status::{StatusDescriptor, resolve_status};
use crate::transport::{PassThrough, Transport, TransportOptions, TransportRequest, TransportResponse};

/// The resolved part of a response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedResponse {
    /// Matching declared status, or the raw status if none matched.
    pub status_code: StatusDescriptor,
    /// `content-type` response header, verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Parsed JSON body.
    pub content: Value,
}

/// Result of one operation call.
#[derive(Debug)]
pub struct ResponseEnvelope<R> {
    /// Resolved status, content type and body.
    pub response: ResolvedResponse,
    /// The transport's own response.
    pub raw: R,
}

impl<R> ResponseEnvelope<R> {
    /// Resolved status descriptor.
    pub fn status_code(&self) -> StatusDescriptor {
        self.response.status_code
    }

    /// Parsed body.
    pub fn content(&self) -> &Value {
        &self.response.content
    }
}

/// Build the relative URL and transport request for one call.
///
/// Pure; this is everything the dispatcher does before touching I/O.
pub fn prepare_request(
    descriptor: &OperationDescriptor,
    params: &RequestParams,
    overrides: TransportOptions,
) -> (String, TransportRequest) {
    let url = build_url(&descriptor.path, params.path.as_ref());

    let TransportOptions {
        search_params,
        headers,
        timeout,
        retry,
        throw_http_errors,
    } = overrides;

    let search_params = match search_params {
        Some(replacement) => Some(replacement),
        None => build_query(params.query.as_ref()),
    };

    let request = TransportRequest {
        method: descriptor.transport_method(),
        headers: merge_headers(build_headers(params.header.as_ref()), headers.as_ref()),
        search_params,
        body: build_body(params.body.as_ref(), descriptor.content_type.as_deref()),
        options: PassThrough {
            timeout,
            retry,
            throw_http_errors,
        },
    };

    (url, request)
}

/// Executes operations against a shared transport.
#[derive(Debug)]
pub struct RequestDispatcher<T> {
    transport: T,
}

impl<T: Transport> RequestDispatcher<T> {
    /// Create a dispatcher over `transport`.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Perform one operation call.
    ///
    /// Transport and body parse errors are returned as produced.
    pub async fn invoke(
        &self,
        descriptor: &OperationDescriptor,
        params: RequestParams,
        overrides: TransportOptions,
    ) -> Result<ResponseEnvelope<T::Response>, T::Error> {
        let (url, request) = prepare_request(descriptor, &params, overrides);

        debug!(
            operation = %descriptor.operation_id,
            method = %request.method,
            url = %url,
            "Dispatching operation"
        );

        let raw = self.transport.call(url, request).await?;
        let content = raw.json().await?;

        let status = raw.status();
        let status_code = resolve_status(descriptor.status_codes.as_deref(), status);
        trace!(status, resolved = %status_code, "Resolved response status");

        let content_type = raw.header("content-type").map(str::to_string);

        Ok(ResponseEnvelope {
            response: ResolvedResponse {
                status_code,
                content_type,
                content,
            },
            raw,
        })
    }
}
