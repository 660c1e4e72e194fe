//! In-memory transport for unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use thiserror::Error;

use crate::transport::{Transport, TransportRequest, TransportResponse};

#[derive(Debug, Error)]
pub enum MockError {
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl MockResponse {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

#[async_trait]
impl TransportResponse for MockResponse {
    type Error = MockError;

    fn status(&self) -> u16 {
        self.status
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    async fn json(&self) -> Result<Value, MockError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

enum Scripted {
    Respond(MockResponse),
    Fail(String),
}

/// Replays scripted responses in order and records every call.
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<(String, TransportRequest)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, response: MockResponse) {
        self.script.lock().push_back(Scripted::Respond(response));
    }

    pub fn fail(&self, message: &str) {
        self.script
            .lock()
            .push_back(Scripted::Fail(message.to_string()));
    }

    pub fn calls(&self) -> Vec<(String, TransportRequest)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Response = MockResponse;
    type Error = MockError;

    async fn call(&self, url: String, request: TransportRequest) -> Result<MockResponse, MockError> {
        self.calls.lock().push((url, request));
        // unscripted calls answer 200 with an empty object
        match self.script.lock().pop_front() {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Fail(message)) => Err(MockError::Network(message)),
            None => Ok(MockResponse::json(200, Value::Object(Default::default()))),
        }
    }
}
