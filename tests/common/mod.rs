//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use exproute::routing::{Location, RouteRequest, Router, SharedLocation};
use exproute::{parse_expression, Node};

/// A location that only carries a name.
#[derive(Debug)]
pub struct Named(pub String);

impl Location for Named {
    fn id(&self) -> &str {
        &self.0
    }
}

pub fn named(id: &str) -> SharedLocation {
    Arc::new(Named(id.to_string()))
}

/// Compile `expr` bound to a location called `id`.
pub fn compile(expr: &str, id: &str) -> Node {
    parse_expression(expr, named(id)).unwrap()
}

/// A `TrieRoute` for `path`, bound to a location named after the path.
pub fn trie_route(path: &str) -> Node {
    compile(&format!("TrieRoute({:?})", path), path)
}

pub fn request(method: &str, url: &str) -> RouteRequest {
    RouteRequest::parse(method, url).unwrap()
}

pub fn lookup(node: &Node, method: &str, url: &str) -> Option<String> {
    node.lookup(&request(method, url))
        .map(|l| l.id().to_string())
}

pub fn route(router: &Router, method: &str, url: &str) -> Option<String> {
    router
        .route(&request(method, url))
        .map(|l| l.id().to_string())
}
