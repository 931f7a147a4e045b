//! Request predicates that guard a child node.
//!
//! # Responsibilities
//! - Match the HTTP method (case-insensitive, any of a fixed set)
//! - Match the full request URL against a regular expression
//! - Short-circuit to "no match" without evaluating the child
//!
//! # Design Decisions
//! - Predicates never merge structurally; they are combined through a
//!   switcher or placed at a trie terminus
//! - The `regex` engine runs in linear time, so every match is bounded

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::routing::error::{RouteError, RouteResult};
use crate::routing::location::SharedLocation;
use crate::routing::node::Node;
use crate::routing::request::HttpRequest;

type TestFn = dyn Fn(&dyn HttpRequest) -> bool + Send + Sync;

/// A boolean test over the request wrapping a child node.
#[derive(Clone)]
pub struct Predicate {
    label: String,
    test: Arc<TestFn>,
    child: Arc<Node>,
}

impl Predicate {
    /// A predicate with an arbitrary test. `label` is used for display.
    pub fn new<F>(label: impl Into<String>, test: F, child: Node) -> Self
    where
        F: Fn(&dyn HttpRequest) -> bool + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            test: Arc::new(test),
            child: Arc::new(child),
        }
    }

    /// Matches when the request method is any of `methods`.
    pub fn methods<I, S>(methods: I, child: Node) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let methods: Vec<String> = methods
            .into_iter()
            .map(|m| m.as_ref().to_ascii_uppercase())
            .collect();
        let label = format!("method in [{}]", methods.join(", "));
        Self::new(
            label,
            move |req| {
                methods
                    .iter()
                    .any(|m| m.eq_ignore_ascii_case(req.method()))
            },
            child,
        )
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn child(&self) -> &Node {
        &self.child
    }

    pub fn lookup(&self, req: &dyn HttpRequest) -> Option<SharedLocation> {
        if (self.test)(req) {
            self.child.lookup(req)
        } else {
            None
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("label", &self.label)
            .field("child", &self.child)
            .finish()
    }
}

/// Matches the full request URL against a regular expression.
#[derive(Debug, Clone)]
pub struct RegexpFilter {
    expr: Regex,
    child: Arc<Node>,
}

impl RegexpFilter {
    pub fn new(expr: &str, child: Node) -> RouteResult<Self> {
        let expr = Regex::new(expr).map_err(|e| RouteError::BadRegexp {
            function: "RegexpFilter",
            pattern: expr.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            expr,
            child: Arc::new(child),
        })
    }

    pub fn as_str(&self) -> &str {
        self.expr.as_str()
    }

    pub fn child(&self) -> &Node {
        &self.child
    }

    pub fn lookup(&self, req: &dyn HttpRequest) -> Option<SharedLocation> {
        if self.expr.is_match(&req.url()) {
            self.child.lookup(req)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::testing::{leaf, location_id, request};
    use axum::body::Body;
    use axum::http::Request;

    #[test]
    fn test_method_predicate() {
        let p = Predicate::methods(["get", "Post"], leaf("loc"));
        assert_eq!(p.label(), "method in [GET, POST]");

        assert!(p.lookup(&request("GET", "/")).is_some());
        assert!(p.lookup(&request("post", "/")).is_some());
        assert!(p.lookup(&request("DELETE", "/")).is_none());
    }

    #[test]
    fn test_custom_predicate() {
        let p = Predicate::new(
            "has query",
            |req: &dyn HttpRequest| req.url().contains('?'),
            leaf("loc"),
        );
        assert!(p.lookup(&request("GET", "/a?b=1")).is_some());
        assert!(p.lookup(&request("GET", "/a")).is_none());
    }

    #[test]
    fn test_regexp_filter_full_url() {
        let f = RegexpFilter::new("^http://example.com/api/", leaf("api")).unwrap();

        let req1 = Request::builder()
            .uri("http://example.com/api/v1")
            .body(Body::default())
            .unwrap();
        assert_eq!(f.lookup(&req1).map(|l| location_id(&l)).as_deref(), Some("api"));

        let req2 = Request::builder()
            .uri("http://example.com/images")
            .body(Body::default())
            .unwrap();
        assert!(f.lookup(&req2).is_none());
    }

    #[test]
    fn test_bad_regexp() {
        let err = RegexpFilter::new("(unclosed", leaf("x")).unwrap_err();
        assert!(matches!(err, RouteError::BadRegexp { .. }));
    }
}
