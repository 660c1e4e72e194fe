//! reqwest-backed transport.

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use http::{Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;
use url::Url;

use crate::codec::EncodedBody;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::params::MultipartForm;
use crate::retry::RetryConfig;
use crate::transport::{Transport, TransportRequest, TransportResponse};

/// Default [`Transport`] over a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    inner: reqwest::Client,
    config: Arc<ClientConfig>,
}

impl HttpTransport {
    /// Create a transport with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let redirect = if config.follow_redirects {
            reqwest::redirect::Policy::limited(config.max_redirects)
        } else {
            reqwest::redirect::Policy::none()
        };

        let inner = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .gzip(config.gzip)
            .brotli(config.brotli)
            .redirect(redirect)
            .build()?;

        Ok(Self {
            inner,
            config: Arc::new(config),
        })
    }

    /// The underlying reqwest client.
    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }

    /// The transport configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Append a relative operation URL to the base URL path and append the
    /// query pairs.
    ///
    /// The operation URL is always a path below the base. Text that would
    /// parse as a URL of its own (`https:other.host`, `ops:cancel`) stays a
    /// path segment.
    pub fn resolve_url(&self, path: &str, query: Option<&[(String, String)]>) -> Result<Url> {
        let mut url = match &self.config.base_url {
            Some(base) => {
                let mut url = Url::parse(base)?;
                let joined = format!("{}/{path}", url.path().trim_end_matches('/'));
                url.set_path(&joined);
                url
            }
            None => Url::parse(path)
                .map_err(|e| ClientError::InvalidUrl(format!("{path}: {e} (no base URL set)")))?,
        };

        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.query_pairs_mut().extend_pairs(query);
        }

        Ok(url)
    }

    fn build_request(&self, url: Url, request: &TransportRequest) -> Result<reqwest::Request> {
        let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| ClientError::RequestBuild(format!("invalid method `{}`", request.method)))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &self.config.default_headers {
            headers.insert(header_name(name)?, header_value(value)?);
        }

        // request headers arrive override-first; the first spelling of a name wins
        let mut explicit = HeaderMap::new();
        for (name, value) in request.headers.iter().flatten() {
            let name = header_name(name)?;
            if !explicit.contains_key(&name) {
                explicit.insert(name, header_value(value)?);
            }
        }
        headers.extend(explicit);

        let mut builder = self.inner.request(method, url);

        if let Some(body) = &request.body {
            if let Some(content_type) = body.default_content_type()
                && !headers.contains_key(CONTENT_TYPE)
            {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
            }
            builder = match body {
                EncodedBody::Json(text) | EncodedBody::UrlEncoded(text) | EncodedBody::Text(text) => {
                    builder.body(text.clone())
                }
                EncodedBody::Raw(bytes) => builder.body(bytes.clone()),
                EncodedBody::Multipart(form) => builder.multipart(multipart(form)?),
            };
        }

        builder = builder.headers(headers);

        if let Some(timeout) = request.options.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(builder.build()?)
    }

    async fn execute_once(
        &self,
        url: &Url,
        request: &TransportRequest,
        throw_http_errors: bool,
    ) -> Result<HttpResponse> {
        let built = self.build_request(url.clone(), request)?;
        let timeout = request.options.timeout.unwrap_or(self.config.timeout);
        let response = self.inner.execute(built).await.map_err(|e| {
            if e.is_timeout() {
                ClientError::Timeout(timeout)
            } else {
                ClientError::Http(e)
            }
        })?;
        let response = HttpResponse::from_reqwest(response).await?;

        if throw_http_errors && !response.is_success() {
            return Err(ClientError::Response {
                status: response.status().as_u16(),
                message: response.text().unwrap_or_default(),
            });
        }

        Ok(response)
    }

    async fn execute_with_retry(
        &self,
        url: &Url,
        request: &TransportRequest,
        throw_http_errors: bool,
        retry: &RetryConfig,
    ) -> Result<HttpResponse> {
        let start = Instant::now();
        let mut attempt = 1;

        loop {
            let outcome = self.execute_once(url, request, throw_http_errors).await;

            let reason = match &outcome {
                Ok(response) if retry.should_retry_status(response.status().as_u16()) => {
                    Some(response.status().to_string())
                }
                Err(e) if retry.should_retry_error(e) => Some(e.to_string()),
                _ => None,
            };
            let Some(reason) = reason else {
                return outcome;
            };

            let out_of_time = retry
                .max_retry_time
                .is_some_and(|max| start.elapsed() >= max);
            if !retry.has_attempts_left(attempt) || out_of_time {
                return match outcome {
                    Err(_) if attempt > 1 => Err(ClientError::RetryExhausted {
                        attempts: attempt,
                        message: reason,
                    }),
                    other => other,
                };
            }

            debug!(attempt, reason = %reason, url = %url, "Retrying request");
            tokio::time::sleep(retry.delay_for_attempt(attempt)).await;
            attempt += 1;
        }
    }
}

fn header_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| ClientError::RequestBuild(format!("invalid header name `{name}`: {e}")))
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| ClientError::RequestBuild(format!("invalid header value `{value}`: {e}")))
}

fn multipart(form: &MultipartForm) -> Result<reqwest::multipart::Form> {
    let mut out = reqwest::multipart::Form::new();
    for part in form.parts() {
        let mut field = reqwest::multipart::Part::bytes(part.data.to_vec());
        if let Some(file_name) = &part.file_name {
            field = field.file_name(file_name.clone());
        }
        if let Some(mime) = &part.mime {
            field = field.mime_str(mime)?;
        }
        out = out.part(part.name.clone(), field);
    }
    Ok(out)
}

#[async_trait]
impl Transport for HttpTransport {
    type Response = HttpResponse;
    type Error = ClientError;

    async fn call(&self, url: String, request: TransportRequest) -> Result<HttpResponse> {
        let url = self.resolve_url(&url, request.search_params.as_deref())?;
        let throw_http_errors = request
            .options
            .throw_http_errors
            .unwrap_or(self.config.throw_http_errors);

        match request.options.retry.as_ref().or(self.config.retry.as_ref()) {
            Some(retry) => {
                self.execute_with_retry(&url, &request, throw_http_errors, retry)
                    .await
            }
            None => self.execute_once(&url, &request, throw_http_errors).await,
        }
    }
}

/// Buffered HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    url: Url,
}

impl HttpResponse {
    async fn from_reqwest(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let body = response.bytes().await?;

        Ok(Self {
            status,
            headers,
            body,
            url,
        })
    }

    /// Status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Final URL after redirects.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Body bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Body as UTF-8 text.
    pub fn text(&self) -> Option<String> {
        String::from_utf8(self.body.to_vec()).ok()
    }
}

#[async_trait]
impl TransportResponse for HttpResponse {
    type Error = ClientError;

    fn status(&self) -> u16 {
        self.status.as_u16()
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    // empty bodies (204, HEAD) parse to null
    async fn json(&self) -> Result<Value> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }
}
