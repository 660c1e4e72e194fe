//! Operation registry.
//!
//! The registry is the flat `key -> descriptor` table a code generator
//! emits for one API. Keys are dot-delimited (`Api.Pets.getPet`) and give
//! the position of the operation in the built client tree.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

use crate::error::RegistryError;
use crate::status::StatusDescriptor;

/// Methods a descriptor may declare.
pub const SUPPORTED_METHODS: &[&str] = &["GET", "PUT", "POST", "PATCH", "DELETE", "HEAD"];

/// Static metadata for one API operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDescriptor {
    /// Human-readable identifier, informational only.
    #[serde(default)]
    pub operation_id: String,
    /// HTTP method, any case.
    pub method: String,
    /// Path template with `{name}` placeholders.
    pub path: String,
    /// Declared response statuses in precedence order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_codes: Option<Vec<StatusDescriptor>>,
    /// Request body media type; JSON when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl OperationDescriptor {
    /// Create a descriptor without declared statuses or content type.
    pub fn new(
        operation_id: impl Into<String>,
        method: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            operation_id: operation_id.into(),
            method: method.into(),
            path: path.into(),
            status_codes: None,
            content_type: None,
        }
    }

    /// Declare the response statuses.
    pub fn status_codes<I>(mut self, codes: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<StatusDescriptor>,
    {
        self.status_codes = Some(codes.into_iter().map(Into::into).collect());
        self
    }

    /// Declare the request content type.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Method normalized for the transport call.
    pub fn transport_method(&self) -> String {
        self.method.to_ascii_lowercase()
    }

    /// Check the descriptor invariants.
    pub fn validate(&self, key: &str) -> Result<(), RegistryError> {
        if !SUPPORTED_METHODS
            .iter()
            .any(|m| m.eq_ignore_ascii_case(&self.method))
        {
            return Err(RegistryError::UnsupportedMethod {
                key: key.to_string(),
                method: self.method.clone(),
            });
        }

        if let Some(codes) = &self.status_codes {
            if codes.is_empty() {
                return Err(RegistryError::EmptyStatusCodes {
                    key: key.to_string(),
                });
            }
            let defaults = codes
                .iter()
                .filter(|c| **c == StatusDescriptor::Default)
                .count();
            if defaults > 1 {
                return Err(RegistryError::DuplicateDefault {
                    key: key.to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Split an operation key into its segments.
pub fn key_segments(key: &str) -> Result<Vec<&str>, RegistryError> {
    let segments: Vec<&str> = key.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(RegistryError::InvalidKey(key.to_string()));
    }
    Ok(segments)
}

/// Ordered `key -> descriptor` table.
///
/// An entry may be present without a descriptor (a `null` in the generated
/// document); such entries are skipped when a client is built.
#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    entries: Vec<(String, Option<Arc<OperationDescriptor>>)>,
}

impl OperationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operation and return the registry, for chained construction.
    pub fn with(
        mut self,
        key: impl Into<String>,
        descriptor: OperationDescriptor,
    ) -> Result<Self, RegistryError> {
        self.insert(key, descriptor)?;
        Ok(self)
    }

    /// Add or replace an operation.
    ///
    /// Replacing keeps the key's original position.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        descriptor: OperationDescriptor,
    ) -> Result<(), RegistryError> {
        let key = key.into();
        key_segments(&key)?;
        descriptor.validate(&key)?;
        self.put(key, Some(Arc::new(descriptor)));
        Ok(())
    }

    /// Register a key with no descriptor.
    pub fn insert_absent(&mut self, key: impl Into<String>) {
        self.put(key.into(), None);
    }

    fn put(&mut self, key: String, descriptor: Option<Arc<OperationDescriptor>>) {
        match self.entries.iter().position(|(k, _)| *k == key) {
            Some(index) => self.entries[index].1 = descriptor,
            None => self.entries.push((key, descriptor)),
        }
    }

    /// Look up a descriptor.
    pub fn get(&self, key: &str) -> Option<&OperationDescriptor> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, d)| d.as_deref())
    }

    /// Number of entries, absent ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in registry order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, Option<&Arc<OperationDescriptor>>)> {
        self.entries.iter().map(|(k, d)| (k.as_str(), d.as_ref()))
    }

    /// Keys with a descriptor, in registry order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, d)| d.is_some())
            .map(|(k, _)| k.as_str())
    }

    /// Build a registry from a generated JSON document.
    ///
    /// Falsy entries (`null`, `false`, `0`, `""`) are kept as absent.
    pub fn from_value(value: Value) -> Result<Self, RegistryError> {
        let object = match value {
            Value::Object(object) => object,
            other => {
                return Err(RegistryError::Parse(serde::de::Error::custom(format!(
                    "expected an object of operations, found {other}"
                ))));
            }
        };

        let mut registry = Self::new();
        for (key, entry) in object {
            match entry {
                entry if is_falsy(&entry) => registry.insert_absent(key),
                entry => {
                    let descriptor: OperationDescriptor = serde_json::from_value(entry)?;
                    registry.insert(key, descriptor)?;
                }
            }
        }

        tracing::debug!(operations = registry.len(), "Loaded operation registry");
        Ok(registry)
    }

    /// Parse a registry from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, RegistryError> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Read a registry from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
