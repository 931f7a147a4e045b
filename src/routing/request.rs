//! Request capability consumed by the route tree.
//!
//! The router only needs three things from a request: its method, the full
//! URL (for regular expression routes) and the path (for trie routes).

use std::borrow::Cow;

use axum::http::uri::{InvalidUri, Uri};

/// What the router reads from an inbound request.
pub trait HttpRequest {
    /// HTTP method as sent by the client.
    fn method(&self) -> &str;

    /// Full request URL as a string.
    fn url(&self) -> Cow<'_, str>;

    /// Request path without query or fragment.
    fn path(&self) -> &str;
}

impl<B> HttpRequest for axum::http::Request<B> {
    fn method(&self) -> &str {
        self.method().as_str()
    }

    fn url(&self) -> Cow<'_, str> {
        Cow::Owned(self.uri().to_string())
    }

    fn path(&self) -> &str {
        self.uri().path()
    }
}

/// A detached request description, used by tools and tests.
#[derive(Debug, Clone)]
pub struct RouteRequest {
    method: String,
    uri: Uri,
}

impl RouteRequest {
    pub fn new(method: impl Into<String>, uri: Uri) -> Self {
        Self {
            method: method.into(),
            uri,
        }
    }

    /// Parse `url` as either an absolute URL or an origin-form path.
    pub fn parse(method: impl Into<String>, url: &str) -> Result<Self, InvalidUri> {
        Ok(Self::new(method, url.parse::<Uri>()?))
    }
}

impl HttpRequest for RouteRequest {
    fn method(&self) -> &str {
        &self.method
    }

    fn url(&self) -> Cow<'_, str> {
        Cow::Owned(self.uri.to_string())
    }

    fn path(&self) -> &str {
        self.uri.path()
    }
}
