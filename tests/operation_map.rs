//! End-to-end tests for the operation-map client over an in-memory transport.
//!
//! These tests drive the public API only: registry, nested client, codec
//! and envelope shaping.

use async_trait::async_trait;
use opmap::prelude::*;
use opmap::{build_body, build_headers, build_query, build_url, query_string, EncodedBody};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::VecDeque;

// =============================================================================
// Recording Transport
// =============================================================================

#[derive(Debug)]
struct Unreachable(String);

impl std::fmt::Display for Unreachable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unreachable: {}", self.0)
    }
}

impl std::error::Error for Unreachable {}

#[derive(Debug, Clone)]
struct Canned {
    status: u16,
    content_type: Option<&'static str>,
    body: Value,
}

#[async_trait]
impl TransportResponse for Canned {
    type Error = Unreachable;

    fn status(&self) -> u16 {
        self.status
    }

    fn header(&self, name: &str) -> Option<&str> {
        name.eq_ignore_ascii_case("content-type")
            .then_some(self.content_type)
            .flatten()
    }

    async fn json(&self) -> Result<Value, Unreachable> {
        Ok(self.body.clone())
    }
}

#[derive(Default)]
struct Recorder {
    replies: Mutex<VecDeque<Result<Canned, String>>>,
    calls: Mutex<Vec<(String, TransportRequest)>>,
}

impl Recorder {
    fn reply(self, status: u16, body: Value) -> Self {
        self.replies.lock().push_back(Ok(Canned {
            status,
            content_type: Some("application/json"),
            body,
        }));
        self
    }

    fn refuse(self, message: &str) -> Self {
        self.replies.lock().push_back(Err(message.to_string()));
        self
    }

    fn calls(&self) -> Vec<(String, TransportRequest)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Transport for Recorder {
    type Response = Canned;
    type Error = Unreachable;

    async fn call(&self, url: String, request: TransportRequest) -> Result<Canned, Unreachable> {
        self.calls.lock().push((url, request));
        match self.replies.lock().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(Unreachable(message)),
            None => Ok(Canned {
                status: 200,
                content_type: None,
                body: Value::Null,
            }),
        }
    }
}

fn pets_registry() -> OperationRegistry {
    OperationRegistry::from_value(json!({
        "Api.Pets.getPet": {
            "operationId": "getPet",
            "method": "GET",
            "path": "/pets/{petId}",
            "statusCodes": [200]
        },
        "Api.Pets.listPets": {
            "operationId": "listPets",
            "method": "GET",
            "path": "/pets",
            "statusCodes": [200, "default"]
        },
        "Api.Pets.createPet": {
            "operationId": "createPet",
            "method": "POST",
            "path": "/pets",
            "statusCodes": [201, "4XX"]
        },
        "Api.Pets.findPet": {
            "operationId": "findPet",
            "method": "GET",
            "path": "/pets/find",
            "statusCodes": ["4XX"]
        },
        "ping": {
            "operationId": "ping",
            "method": "HEAD",
            "path": "/ping"
        },
        "Api.Legacy.removed": null
    }))
    .unwrap()
}

// =============================================================================
// Client Construction
// =============================================================================

#[test]
fn test_registry_keeps_document_order() {
    let registry = pets_registry();
    let keys: Vec<&str> = registry.keys().collect();
    assert_eq!(
        keys,
        [
            "Api.Pets.getPet",
            "Api.Pets.listPets",
            "Api.Pets.createPet",
            "Api.Pets.findPet",
            "ping"
        ]
    );
    assert_eq!(registry.len(), 6);
    assert!(registry.get("Api.Legacy.removed").is_none());
}

#[test]
fn test_client_tree_mirrors_dotted_keys() {
    let client = ClientBuilder::new(Recorder::default()).build(&pets_registry());

    let pets = client.node("Api.Pets").unwrap().as_namespace().unwrap();
    let ops: Vec<&str> = pets.keys().collect();
    assert_eq!(ops, ["getPet", "listPets", "createPet", "findPet"]);

    assert!(client.get("ping").unwrap().as_operation().is_some());
    assert!(client.node("Api.Legacy").is_none());
}

#[test]
fn test_building_twice_yields_same_shape() {
    let registry = pets_registry();
    let first = ClientBuilder::new(Recorder::default()).build(&registry);
    let second = ClientBuilder::new(Recorder::default()).build(&registry);

    assert_eq!(first.operation_paths(), second.operation_paths());
}

// =============================================================================
// Dispatch Scenarios
// =============================================================================

#[tokio::test]
async fn test_get_pet_scenario() {
    let transport = Recorder::default().reply(200, json!({"id": 123}));
    let client = ClientBuilder::new(transport).build(&pets_registry());

    let envelope = tokio_test::assert_ok!(
        client
            .operation("Api.Pets.getPet")
            .unwrap()
            .call(RequestParams::new().path("petId", 123))
            .await
    );

    assert_eq!(envelope.status_code(), 200);
    assert_eq!(envelope.content()["id"], 123);
    assert_eq!(
        client.dispatcher().transport().calls(),
        vec![("pets/123".to_string(), TransportRequest::new("get"))]
    );
}

#[tokio::test]
async fn test_not_found_resolves_to_class() {
    let transport = Recorder::default().reply(404, json!({"message": "no such pet"}));
    let client = ClientBuilder::new(transport).build(&pets_registry());

    let envelope = client
        .operation("Api.Pets.findPet")
        .unwrap()
        .call(RequestParams::new())
        .await
        .unwrap();

    assert_eq!(envelope.status_code(), "4XX");
    assert_eq!(
        serde_json::to_value(&envelope.response).unwrap(),
        json!({
            "statusCode": "4XX",
            "contentType": "application/json",
            "content": {"message": "no such pet"}
        })
    );
}

#[tokio::test]
async fn test_unmatched_status_is_returned_raw() {
    let transport = Recorder::default().reply(500, Value::Null);
    let client = ClientBuilder::new(transport).build(&pets_registry());

    let envelope = client
        .operation("Api.Pets.createPet")
        .unwrap()
        .call(RequestParams::new())
        .await
        .unwrap();

    assert_eq!(envelope.status_code(), 500);
}

#[tokio::test]
async fn test_undeclared_statuses_pass_through() {
    let transport = Recorder::default().reply(204, Value::Null);
    let client = ClientBuilder::new(transport).build(&pets_registry());

    let envelope = client
        .operation("ping")
        .unwrap()
        .call(RequestParams::new())
        .await
        .unwrap();

    assert_eq!(envelope.status_code(), 204);
    assert_eq!(client.dispatcher().transport().calls()[0].1.method, "head");
}

#[tokio::test]
async fn test_search_params_override_replaces_query() {
    let client = ClientBuilder::new(Recorder::default()).build(&pets_registry());

    client
        .operation("Api.Pets.listPets")
        .unwrap()
        .call_with(
            RequestParams::new().query("tags", json!(["red", "blue"])),
            TransportOptions::new().search_params([("page", "3")]),
        )
        .await
        .unwrap();

    let (_, request) = &client.dispatcher().transport().calls()[0];
    assert_eq!(
        request.search_params,
        Some(vec![("page".to_string(), "3".to_string())])
    );
}

#[tokio::test]
async fn test_create_pet_sends_json_body_and_merged_headers() {
    let transport = Recorder::default().reply(201, json!({"id": 9}));
    let client = ClientBuilder::new(transport).build(&pets_registry());

    let envelope = client
        .operation("Api.Pets.createPet")
        .unwrap()
        .call_with(
            RequestParams::new()
                .header("x-request-id", "abc")
                .header("x-tenant", "params")
                .body(json!({"name": "Buddy"})),
            TransportOptions::new().header("x-tenant", "override"),
        )
        .await
        .unwrap();

    assert_eq!(envelope.status_code(), 201);

    let (url, request) = &client.dispatcher().transport().calls()[0];
    assert_eq!(url, "pets");
    assert_eq!(request.method, "post");
    assert_eq!(request.header("X-Tenant"), Some("override"));
    assert_eq!(
        request.headers.as_ref().unwrap()[0],
        ("x-tenant".to_string(), "override".to_string())
    );
    assert_eq!(
        request.body,
        Some(EncodedBody::Json(r#"{"name":"Buddy"}"#.to_string()))
    );
}

#[tokio::test]
async fn test_transport_failure_propagates() {
    let transport = Recorder::default().refuse("connection reset");
    let client = ClientBuilder::new(transport).build(&pets_registry());

    let err = client
        .operation("Api.Pets.getPet")
        .unwrap()
        .call(RequestParams::new().path("petId", 1))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "unreachable: connection reset");
}

// =============================================================================
// Status Resolution
// =============================================================================

#[test]
fn test_exact_code_beats_class() {
    let declared: Vec<StatusDescriptor> =
        serde_json::from_value(json!([200, "2XX"])).unwrap();
    assert_eq!(opmap::resolve_status(Some(declared.as_slice()), 200), 200);
}

#[test]
fn test_declared_order_decides_between_default_and_class() {
    let declared: Vec<StatusDescriptor> =
        serde_json::from_value(json!(["default", "2XX"])).unwrap();
    assert_eq!(
        opmap::resolve_status(Some(declared.as_slice()), 200),
        StatusDescriptor::Default
    );
}

// =============================================================================
// Parameter Encoding
// =============================================================================

#[test]
fn test_query_arrays_repeat_the_key() {
    let query = json!({"tags": ["red", "blue"]});
    let pairs = build_query(query.as_object()).unwrap();
    assert_eq!(query_string(&pairs), "tags=red&tags=blue");
}

#[test]
fn test_query_nulls_are_dropped() {
    let query = json!({"a": "x", "b": null});
    let pairs = build_query(query.as_object()).unwrap();
    assert_eq!(query_string(&pairs), "a=x");
}

#[test]
fn test_unresolved_path_token_survives() {
    assert_eq!(build_url("/pets/{petId}", None), "pets/{petId}");
}

#[test]
fn test_body_encoding_by_content_type() {
    let pet = RequestBody::Value(json!({"name": "Buddy"}));
    assert_eq!(
        build_body(Some(&pet), None),
        Some(EncodedBody::Json(r#"{"name":"Buddy"}"#.to_string()))
    );

    let plain = RequestBody::Value(json!("plain"));
    assert_eq!(
        build_body(Some(&plain), Some("text/plain")),
        Some(EncodedBody::Text("plain".to_string()))
    );

    let form = RequestBody::Value(json!({"name": "Buddy Boy", "age": 3}));
    assert_eq!(
        build_body(Some(&form), Some("application/x-www-form-urlencoded")),
        Some(EncodedBody::UrlEncoded("name=Buddy+Boy&age=3".to_string()))
    );
}

#[test]
fn test_null_headers_are_dropped() {
    let header = json!({"Authorization": "Bearer t", "X-Null": null});
    assert_eq!(
        build_headers(header.as_object()),
        Some(vec![("Authorization".to_string(), "Bearer t".to_string())])
    );
}
