//! Parameter encoding.
//!
//! Pure functions turning [`RequestParams`](crate::RequestParams) sections
//! into transport-ready pieces. Nothing here fails: values that are not
//! strings are coerced with [`stringify`].

use bytes::Bytes;
use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::content::ContentKind;
use crate::params::{MultipartForm, RequestBody};

/// Ordered query pairs; repeated keys are allowed.
pub type QueryPairs = Vec<(String, String)>;

/// Ordered header pairs; keys are unique.
pub type HeaderPairs = Vec<(String, String)>;

/// A request body in wire form.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodedBody {
    /// JSON text.
    Json(String),
    /// `application/x-www-form-urlencoded` text.
    UrlEncoded(String),
    /// Plain text.
    Text(String),
    /// Multipart form, encoded by the transport.
    Multipart(MultipartForm),
    /// Bytes sent as-is.
    Raw(Bytes),
}

impl EncodedBody {
    /// Media type a transport should send when the caller set none.
    pub fn default_content_type(&self) -> Option<&'static str> {
        match self {
            Self::Json(_) => Some("application/json"),
            Self::UrlEncoded(_) => Some("application/x-www-form-urlencoded"),
            Self::Text(_) => Some("text/plain; charset=utf-8"),
            Self::Multipart(_) | Self::Raw(_) => None,
        }
    }
}

/// Render a value the way it appears in a URL, header or text body.
///
/// Strings are used verbatim, integral floats lose their fraction, arrays
/// are joined with `,` and objects are written as JSON.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.is_finite() && f.fract() == 0.0 && f.abs() < 1e21 => {
                format!("{f:.0}")
            }
            _ => n.to_string(),
        },
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => stringify(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// Substitute `{name}` placeholders and drop one leading `/`.
///
/// The template is scanned once, left to right, so substituted values are
/// never scanned again. Placeholders without a matching key stay in the
/// result untouched.
pub fn build_url(template: &str, path: Option<&Map<String, Value>>) -> String {
    let mut url = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        url.push_str(&rest[..open]);
        let token = &rest[open..];
        let value = token
            .find('}')
            .map(|close| (close, &token[1..close]))
            .filter(|(_, name)| !name.contains('{'))
            .and_then(|(close, name)| Some((close, path?.get(name)?)));

        match value {
            Some((close, value)) => {
                url.push_str(&stringify(value));
                rest = &token[close + 1..];
            }
            None => {
                url.push('{');
                rest = &token[1..];
            }
        }
    }
    url.push_str(rest);

    if url.starts_with('/') {
        url.remove(0);
    }
    url
}

/// Build repeated-key query pairs.
///
/// Returns `None` for an absent or empty map. Arrays emit one pair per
/// element; `null` values and elements are skipped.
pub fn build_query(query: Option<&Map<String, Value>>) -> Option<QueryPairs> {
    let query = query.filter(|q| !q.is_empty())?;

    let mut pairs = QueryPairs::new();
    for (key, value) in query {
        match value {
            Value::Null => {}
            Value::Array(items) => pairs.extend(
                items
                    .iter()
                    .filter(|item| !item.is_null())
                    .map(|item| (key.clone(), stringify(item))),
            ),
            scalar => pairs.push((key.clone(), stringify(scalar))),
        }
    }

    Some(pairs)
}

/// Serialize query pairs as `application/x-www-form-urlencoded` text.
pub fn query_string(pairs: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

/// Stringify header values, dropping `null`.
///
/// Returns `None` when nothing is left.
pub fn build_headers(header: Option<&Map<String, Value>>) -> Option<HeaderPairs> {
    let headers: HeaderPairs = header?
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(name, value)| (name.clone(), stringify(value)))
        .collect();

    (!headers.is_empty()).then_some(headers)
}

/// Merge parameter headers with per-call override headers.
///
/// Override values win key by key, with names compared ignoring ASCII
/// case. Override keys come first, followed by the remaining parameter keys
/// in their own order.
pub fn merge_headers(
    params: Option<HeaderPairs>,
    overrides: Option<&HeaderPairs>,
) -> Option<HeaderPairs> {
    match (params, overrides) {
        (None, None) => None,
        (Some(params), None) => Some(params),
        (None, Some(overrides)) => Some(overrides.clone()),
        (Some(params), Some(overrides)) => {
            let mut merged = overrides.clone();
            for (name, value) in params {
                if !merged
                    .iter()
                    .any(|(existing, _)| existing.eq_ignore_ascii_case(&name))
                {
                    merged.push((name, value));
                }
            }
            Some(merged)
        }
    }
}

/// Encode a body for the declared content type.
///
/// Pre-encoded bodies pass through whatever the content type. Structured
/// values are dispatched on [`ContentKind`]: JSON text, form text, the
/// string form for `text/plain`, and as-is for everything else.
pub fn build_body(body: Option<&RequestBody>, content_type: Option<&str>) -> Option<EncodedBody> {
    let value = match body? {
        RequestBody::UrlEncoded(text) => return Some(EncodedBody::UrlEncoded(text.clone())),
        RequestBody::Multipart(form) => return Some(EncodedBody::Multipart(form.clone())),
        RequestBody::Bytes(bytes) => return Some(EncodedBody::Raw(bytes.clone())),
        RequestBody::Value(value) => value,
    };

    let encoded = match ContentKind::of(content_type) {
        ContentKind::Json => EncodedBody::Json(value.to_string()),
        ContentKind::FormUrlEncoded => EncodedBody::UrlEncoded(form_encode(value)),
        ContentKind::Text => EncodedBody::Text(stringify(value)),
        ContentKind::Multipart | ContentKind::Other => EncodedBody::Raw(passthrough(value)),
    };

    Some(encoded)
}

fn form_encode(value: &Value) -> String {
    match value {
        Value::Object(fields) => {
            let mut serializer = form_urlencoded::Serializer::new(String::new());
            for (key, field) in fields {
                serializer.append_pair(key, &stringify(field));
            }
            serializer.finish()
        }
        // already-encoded text
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => stringify(other),
    }
}

fn passthrough(value: &Value) -> Bytes {
    match value {
        Value::String(text) => Bytes::from(text.clone()),
        other => Bytes::from(other.to_string()),
    }
}
