//! Nested client construction.
//!
//! [`ClientBuilder`] walks an [`OperationRegistry`] once and turns its flat
//! dotted keys into a tree: every segment but the last is a
//! [`Namespace`], the last is a bound [`Operation`].
//!
//! ```rust,no_run
//! use opmap_client::{ClientBuilder, HttpTransport, ClientConfig, OperationRegistry,
//!     OperationDescriptor, RequestParams};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = OperationRegistry::new().with(
//!     "Api.Pets.getPet",
//!     OperationDescriptor::new("getPet", "GET", "/pets/{petId}").status_codes([200u16]),
//! )?;
//!
//! let transport = HttpTransport::new(ClientConfig::builder().base_url("https://pets.example.com").build())?;
//! let client = ClientBuilder::new(transport).build(&registry);
//!
//! let get_pet = client.operation("Api.Pets.getPet").ok_or("missing operation")?;
//! let envelope = get_pet.call(RequestParams::new().path("petId", 123)).await?;
//! println!("{} {}", envelope.status_code(), envelope.content());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::dispatch::{RequestDispatcher, ResponseEnvelope};
use crate::params::RequestParams;
use crate::registry::{OperationDescriptor, OperationRegistry};
use crate::transport::{Transport, TransportOptions};

/// A leaf of the client tree: one operation bound to the shared dispatcher.
pub struct Operation<T> {
    key: String,
    descriptor: Arc<OperationDescriptor>,
    dispatcher: Arc<RequestDispatcher<T>>,
}

impl<T> Operation<T> {
    /// Full dotted key this operation was registered under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The bound descriptor.
    pub fn descriptor(&self) -> &OperationDescriptor {
        &self.descriptor
    }
}

impl<T: Transport> Operation<T> {
    /// Call the operation with no transport overrides.
    pub async fn call(
        &self,
        params: RequestParams,
    ) -> Result<ResponseEnvelope<T::Response>, T::Error> {
        self.call_with(params, TransportOptions::default()).await
    }

    /// Call the operation with per-call transport overrides.
    pub async fn call_with(
        &self,
        params: RequestParams,
        overrides: TransportOptions,
    ) -> Result<ResponseEnvelope<T::Response>, T::Error> {
        self.dispatcher
            .invoke(&self.descriptor, params, overrides)
            .await
    }
}

impl<T> Clone for Operation<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            descriptor: Arc::clone(&self.descriptor),
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }
}

impl<T> fmt::Debug for Operation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("key", &self.key)
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// A node of the client tree.
///
/// An operation may share its path with a deeper level: registering both
/// `Api.pets` and `Api.pets.get` keeps both callable, the second as a child
/// of the first.
pub enum ClientNode<T> {
    /// Intermediate level keyed by segment.
    Namespace(Namespace<T>),
    /// Callable operation, with any deeper operations below it.
    Operation {
        /// The bound operation.
        operation: Operation<T>,
        /// Nodes registered under the operation's path.
        children: Namespace<T>,
    },
}

impl<T> ClientNode<T> {
    fn leaf(operation: Operation<T>) -> Self {
        Self::Operation {
            operation,
            children: Namespace::default(),
        }
    }

    /// Child node by segment.
    pub fn get(&self, segment: &str) -> Option<&ClientNode<T>> {
        self.children().get(segment)
    }

    /// This node's child level, if it has one.
    ///
    /// Operations only have a child level when deeper keys were registered
    /// under them.
    pub fn as_namespace(&self) -> Option<&Namespace<T>> {
        match self {
            Self::Namespace(ns) => Some(ns),
            Self::Operation { children, .. } => (!children.is_empty()).then_some(children),
        }
    }

    /// This node as an operation.
    pub fn as_operation(&self) -> Option<&Operation<T>> {
        match self {
            Self::Operation { operation, .. } => Some(operation),
            Self::Namespace(_) => None,
        }
    }

    fn children(&self) -> &Namespace<T> {
        match self {
            Self::Namespace(ns) => ns,
            Self::Operation { children, .. } => children,
        }
    }

    fn children_mut(&mut self) -> &mut Namespace<T> {
        match self {
            Self::Namespace(ns) => ns,
            Self::Operation { children, .. } => children,
        }
    }
}

impl<T> fmt::Debug for ClientNode<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Namespace(ns) => ns.fmt(f),
            Self::Operation { operation, children } if children.is_empty() => operation.fmt(f),
            Self::Operation { operation, children } => f
                .debug_struct("Operation")
                .field("operation", operation)
                .field("children", children)
                .finish(),
        }
    }
}

/// Intermediate level of the client tree.
///
/// Children keep the order in which they were first created.
pub struct Namespace<T> {
    children: Vec<(String, ClientNode<T>)>,
}

impl<T> Default for Namespace<T> {
    fn default() -> Self {
        Self {
            children: Vec::new(),
        }
    }
}

impl<T> Namespace<T> {
    /// Child by segment name.
    pub fn get(&self, segment: &str) -> Option<&ClientNode<T>> {
        self.children
            .iter()
            .find(|(name, _)| name == segment)
            .map(|(_, node)| node)
    }

    /// Child segment names in creation order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(|(name, _)| name.as_str())
    }

    /// Children in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ClientNode<T>)> {
        self.children.iter().map(|(name, node)| (name.as_str(), node))
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether there are no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    fn insert(&mut self, segments: &[&str], operation: Operation<T>) {
        match segments {
            [] => {}
            [leaf] => self.set_operation(leaf, operation),
            [head, rest @ ..] => {
                let index = self.child_index(head);
                self.children[index].1.children_mut().insert(rest, operation);
            }
        }
    }

    /// Index of the child `segment`, created as a namespace on first visit.
    fn child_index(&mut self, segment: &str) -> usize {
        match self.children.iter().position(|(name, _)| name == segment) {
            Some(index) => index,
            None => {
                self.children.push((
                    segment.to_string(),
                    ClientNode::Namespace(Namespace::default()),
                ));
                self.children.len() - 1
            }
        }
    }

    fn set_operation(&mut self, segment: &str, operation: Operation<T>) {
        match self.children.iter().position(|(name, _)| name == segment) {
            Some(index) => {
                let node = &mut self.children[index].1;
                if let ClientNode::Operation { operation: existing, .. } = &*node {
                    warn!(
                        replaced = existing.key(),
                        by = operation.key(),
                        "Overwriting existing operation"
                    );
                }
                let children = std::mem::take(node.children_mut());
                *node = ClientNode::Operation {
                    operation,
                    children,
                };
            }
            None => self
                .children
                .push((segment.to_string(), ClientNode::leaf(operation))),
        }
    }

    fn collect_paths(&self, prefix: &str, out: &mut Vec<String>) {
        for (name, node) in &self.children {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}.{name}")
            };
            if let ClientNode::Operation { .. } = node {
                out.push(path.clone());
            }
            node.children().collect_paths(&path, out);
        }
    }
}

impl<T> fmt::Debug for Namespace<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// A built client: the root namespace plus the shared dispatcher.
pub struct Client<T> {
    root: Namespace<T>,
    dispatcher: Arc<RequestDispatcher<T>>,
}

impl<T> Client<T> {
    /// Root namespace.
    pub fn root(&self) -> &Namespace<T> {
        &self.root
    }

    /// Top-level node by segment.
    pub fn get(&self, segment: &str) -> Option<&ClientNode<T>> {
        self.root.get(segment)
    }

    /// Node at a dotted path.
    pub fn node(&self, path: &str) -> Option<&ClientNode<T>> {
        let mut segments = path.split('.');
        let mut node = self.root.get(segments.next()?)?;
        for segment in segments {
            node = node.get(segment)?;
        }
        Some(node)
    }

    /// Operation at a dotted path.
    pub fn operation(&self, path: &str) -> Option<&Operation<T>> {
        self.node(path)?.as_operation()
    }

    /// Dotted paths of all operations, depth first in creation order.
    pub fn operation_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        self.root.collect_paths("", &mut paths);
        paths
    }

    /// The shared dispatcher.
    pub fn dispatcher(&self) -> &RequestDispatcher<T> {
        &self.dispatcher
    }
}

impl<T> fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client").field("root", &self.root).finish()
    }
}

/// Builds [`Client`] trees over one shared dispatcher.
pub struct ClientBuilder<T> {
    dispatcher: Arc<RequestDispatcher<T>>,
}

impl<T: Transport> ClientBuilder<T> {
    /// Builder over a new dispatcher for `transport`.
    pub fn new(transport: T) -> Self {
        Self {
            dispatcher: Arc::new(RequestDispatcher::new(transport)),
        }
    }
}

impl<T> ClientBuilder<T> {
    /// Builder over an existing dispatcher.
    pub fn with_dispatcher(dispatcher: Arc<RequestDispatcher<T>>) -> Self {
        Self { dispatcher }
    }

    /// Build the client tree for a registry.
    pub fn build(&self, registry: &OperationRegistry) -> Client<T> {
        self.build_entries(registry.entries())
    }

    /// Build from raw `(key, descriptor)` entries in iteration order.
    ///
    /// Entries without a descriptor are skipped. A later entry with the same
    /// full path replaces the earlier operation.
    pub fn build_entries<'a, I>(&self, entries: I) -> Client<T>
    where
        I: IntoIterator<Item = (&'a str, Option<&'a Arc<OperationDescriptor>>)>,
    {
        let mut root = Namespace::default();
        let mut bound = 0usize;

        for (key, descriptor) in entries {
            let Some(descriptor) = descriptor else {
                continue;
            };
            let segments: Vec<&str> = key.split('.').collect();
            let operation = Operation {
                key: key.to_string(),
                descriptor: Arc::clone(descriptor),
                dispatcher: Arc::clone(&self.dispatcher),
            };
            root.insert(&segments, operation);
            bound += 1;
        }

        debug!(operations = bound, "Built client tree");

        Client {
            root,
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockResponse, MockTransport};
    use crate::status::StatusDescriptor;
    use serde_json::json;

    fn descriptor(id: &str, path: &str) -> OperationDescriptor {
        OperationDescriptor::new(id, "GET", path)
    }

    fn pets_registry() -> OperationRegistry {
        OperationRegistry::new()
            .with("Api.Pets.getPet", descriptor("getPet", "/pets/{petId}"))
            .and_then(|r| r.with("Api.Pets.listPets", descriptor("listPets", "/pets")))
            .and_then(|r| r.with("Api.Store.Orders.get", descriptor("getOrder", "/orders/{id}")))
            .and_then(|r| r.with("health", descriptor("health", "/health")))
            .unwrap()
    }

    #[test]
    fn test_builds_nested_tree() {
        let client = ClientBuilder::new(MockTransport::new()).build(&pets_registry());

        assert!(client.operation("Api.Pets.getPet").is_some());
        assert!(client.operation("Api.Store.Orders.get").is_some());
        assert!(client.node("Api.Pets").unwrap().as_namespace().is_some());
        assert!(client.operation("Api.Pets").is_none());
        assert!(client.node("Api.Nope").is_none());

        let api = client.get("Api").unwrap().as_namespace().unwrap();
        let keys: Vec<&str> = api.keys().collect();
        assert_eq!(keys, ["Pets", "Store"]);
    }

    #[test]
    fn test_single_segment_key_is_top_level() {
        let client = ClientBuilder::new(MockTransport::new()).build(&pets_registry());

        let health = client.get("health").unwrap().as_operation().unwrap();
        assert_eq!(health.key(), "health");
        assert_eq!(health.descriptor().path, "/health");
    }

    #[test]
    fn test_absent_entries_are_skipped() {
        let mut registry = pets_registry();
        registry.insert_absent("Api.Pets.deletePet");

        let client = ClientBuilder::new(MockTransport::new()).build(&registry);
        assert!(client.node("Api.Pets.deletePet").is_none());
    }

    #[test]
    fn test_later_duplicate_key_overwrites_leaf() {
        let first = Arc::new(descriptor("first", "/first"));
        let second = Arc::new(descriptor("second", "/second"));
        let entries = [("Api.op", Some(&first)), ("Api.op", Some(&second))];

        let client = ClientBuilder::new(MockTransport::new()).build_entries(entries);

        let op = client.operation("Api.op").unwrap();
        assert_eq!(op.descriptor().operation_id, "second");
        assert_eq!(client.operation_paths(), ["Api.op"]);
    }

    #[test]
    fn test_operation_and_deeper_key_coexist() {
        let outer = Arc::new(descriptor("listPets", "/pets"));
        let inner = Arc::new(descriptor("getPet", "/pets/{petId}"));

        let orders = [
            [("Api.pets", Some(&outer)), ("Api.pets.get", Some(&inner))],
            [("Api.pets.get", Some(&inner)), ("Api.pets", Some(&outer))],
        ];
        for entries in orders {
            let client = ClientBuilder::new(MockTransport::new()).build_entries(entries);

            let pets = client.operation("Api.pets").unwrap();
            assert_eq!(pets.descriptor().operation_id, "listPets");
            let get = client.operation("Api.pets.get").unwrap();
            assert_eq!(get.descriptor().operation_id, "getPet");

            let node = client.node("Api.pets").unwrap();
            let below: Vec<&str> = node.as_namespace().unwrap().keys().collect();
            assert_eq!(below, ["get"]);
            assert_eq!(client.operation_paths(), ["Api.pets", "Api.pets.get"]);
        }
    }

    #[tokio::test]
    async fn test_operation_with_children_stays_callable() {
        let registry = OperationRegistry::new()
            .with("Api.pets", descriptor("listPets", "/pets"))
            .and_then(|r| r.with("Api.pets.get", descriptor("getPet", "/pets/{petId}")))
            .unwrap();
        let client = ClientBuilder::new(MockTransport::new()).build(&registry);

        client
            .operation("Api.pets")
            .unwrap()
            .call(RequestParams::new())
            .await
            .unwrap();
        client
            .operation("Api.pets.get")
            .unwrap()
            .call(RequestParams::new().path("petId", 1))
            .await
            .unwrap();

        let urls: Vec<String> = client
            .dispatcher()
            .transport()
            .calls()
            .into_iter()
            .map(|(url, _)| url)
            .collect();
        assert_eq!(urls, ["pets", "pets/1"]);
    }

    #[test]
    fn test_building_twice_is_structurally_equal() {
        let registry = pets_registry();
        let builder = ClientBuilder::new(MockTransport::new());

        let a = builder.build(&registry);
        let b = builder.build(&registry);

        assert_eq!(a.operation_paths(), b.operation_paths());
        assert_eq!(
            a.operation_paths(),
            [
                "Api.Pets.getPet",
                "Api.Pets.listPets",
                "Api.Store.Orders.get",
                "health"
            ]
        );
    }

    #[tokio::test]
    async fn test_leaf_calls_dispatch_through_shared_transport() {
        let registry = OperationRegistry::new()
            .with(
                "Api.Pets.getPet",
                OperationDescriptor::new("getPet", "GET", "/pets/{petId}")
                    .status_codes(["4XX".parse::<StatusDescriptor>().unwrap()]),
            )
            .unwrap();

        let transport = MockTransport::new();
        transport.respond(MockResponse::json(404, json!({"message": "not found"})));
        let client = ClientBuilder::new(transport).build(&registry);

        let envelope = client
            .operation("Api.Pets.getPet")
            .unwrap()
            .call(RequestParams::new().path("petId", 7))
            .await
            .unwrap();

        assert_eq!(envelope.status_code(), "4XX");
        assert_eq!(client.dispatcher().transport().calls()[0].0, "pets/7");
    }

    #[tokio::test]
    async fn test_concurrent_calls_share_one_transport() {
        let client = ClientBuilder::new(MockTransport::new()).build(&pets_registry());
        let get_pet = client.operation("Api.Pets.getPet").unwrap();

        let calls = (0..4).map(|id| get_pet.call(RequestParams::new().path("petId", id)));
        let results = futures::future::join_all(calls).await;

        assert!(results.iter().all(|r| r.is_ok()));
        let mut urls: Vec<String> = client
            .dispatcher()
            .transport()
            .calls()
            .into_iter()
            .map(|(url, _)| url)
            .collect();
        urls.sort();
        assert_eq!(urls, ["pets/0", "pets/1", "pets/2", "pets/3"]);
    }
}
