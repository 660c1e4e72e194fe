//! Call-time request parameters.

use bytes::Bytes;
use serde_json::{Map, Value};

/// Parameters supplied by the caller for one operation call.
///
/// Maps keep insertion order, which is the order query pairs and headers
/// are emitted in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestParams {
    /// Values substituted into `{name}` placeholders of the path template.
    pub path: Option<Map<String, Value>>,
    /// Query values; arrays repeat the key once per element.
    pub query: Option<Map<String, Value>>,
    /// Header values; `null` entries are dropped.
    pub header: Option<Map<String, Value>>,
    /// Request body; `None` sends no body.
    pub body: Option<RequestBody>,
}

impl RequestParams {
    /// Create an empty parameter bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a path parameter.
    pub fn path(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.path
            .get_or_insert_with(Map::new)
            .insert(name.into(), value.into());
        self
    }

    /// Set a query parameter. Pass a JSON array for repeated keys.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query
            .get_or_insert_with(Map::new)
            .insert(name.into(), value.into());
        self
    }

    /// Set a header parameter.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.header
            .get_or_insert_with(Map::new)
            .insert(name.into(), value.into());
        self
    }

    /// Set the body.
    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// A request body as handed to the codec.
///
/// [`RequestBody::Value`] is encoded according to the operation's declared
/// content type. The other variants are already in wire form and are sent
/// untouched whatever the content type says.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// A structured value.
    Value(Value),
    /// Pre-encoded `application/x-www-form-urlencoded` text.
    UrlEncoded(String),
    /// A multipart form.
    Multipart(MultipartForm),
    /// Raw bytes.
    Bytes(Bytes),
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<MultipartForm> for RequestBody {
    fn from(form: MultipartForm) -> Self {
        Self::Multipart(form)
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

/// An in-memory `multipart/form-data` body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    parts: Vec<Part>,
}

impl MultipartForm {
    /// Create an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text field.
    pub fn text(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let value: String = value.into();
        self.part(Part::new(name, value.into_bytes()))
    }

    /// Append a part.
    pub fn part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Parts in insertion order.
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }
}

/// One field of a [`MultipartForm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Field name.
    pub name: String,
    /// Field contents.
    pub data: Bytes,
    /// File name, for file fields.
    pub file_name: Option<String>,
    /// Media type of the part.
    pub mime: Option<String>,
}

impl Part {
    /// Create a part from raw contents.
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            file_name: None,
            mime: None,
        }
    }

    /// Set the file name.
    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Set the media type.
    pub fn mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}
