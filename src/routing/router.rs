//! Route lookup and incremental route mutation.
//!
//! # Responsibilities
//! - Hold the live route tree
//! - Look up the location for a request
//! - Merge new fragments in and remove fragments without a rebuild
//!
//! # Design Decisions
//! - Lookups load the root through `ArcSwapOption`: lock-free, and a reader
//!   sees either the whole old tree or the whole new one
//! - Mutations are serialized by one mutex held for a single
//!   read-and-replace of the root
//! - A failed mutation leaves the live root untouched
//! - "No route" is `None`, never an error

use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwapOption;

use crate::observability::metrics;
use crate::routing::error::{RouteError, RouteResult};
use crate::routing::location::SharedLocation;
use crate::routing::node::{Node, Switcher};
use crate::routing::request::HttpRequest;

#[derive(Debug, Default)]
pub struct Router {
    root: ArcSwapOption<Node>,
    mutation: Mutex<()>,
}

impl Router {
    /// An empty router; every lookup yields no location.
    pub fn new() -> Self {
        Self::default()
    }

    /// A router holding all `fragments` merged in order.
    pub fn with_routes<I>(fragments: I) -> RouteResult<Self>
    where
        I: IntoIterator<Item = Node>,
    {
        let mut root = None;
        for fragment in fragments {
            root = Some(merge_into(root.as_ref(), fragment)?);
        }
        Ok(Self {
            root: ArcSwapOption::new(root.map(Arc::new)),
            mutation: Mutex::new(()),
        })
    }

    pub fn route(&self, req: &dyn HttpRequest) -> Option<SharedLocation> {
        let root = self.root.load();
        let location = root.as_deref().and_then(|node| node.lookup(req));
        metrics::record_lookup(location.is_some());
        location
    }

    /// Merge a compiled fragment into the live tree.
    pub fn merge(&self, fragment: Node) -> RouteResult<()> {
        let result = self.update(|root| merge_into(root, fragment).map(Some));
        metrics::record_mutation("merge", result.is_ok());
        result
    }

    /// Remove a trie fragment previously merged into the live tree.
    pub fn remove(&self, fragment: &Node) -> RouteResult<()> {
        let result = self.update(|root| remove_from(root, fragment));
        metrics::record_mutation("remove", result.is_ok());
        result
    }

    /// Replace the root with the value computed from the current one.
    ///
    /// `f` runs under the mutation lock; the new root is installed only if
    /// it returns `Ok`.
    pub fn update<F>(&self, f: F) -> RouteResult<()>
    where
        F: FnOnce(Option<&Node>) -> RouteResult<Option<Node>>,
    {
        let _guard = self
            .mutation
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let current = self.root.load_full();
        let next = f(current.as_deref())?;
        metrics::set_route_count(next.as_ref().map_or(0, Node::route_count));
        self.root.store(next.map(Arc::new));
        Ok(())
    }

    /// The current root, for inspection or printing.
    pub fn snapshot(&self) -> Option<Arc<Node>> {
        self.root.load_full()
    }

    pub fn is_empty(&self) -> bool {
        self.root.load().is_none()
    }
}

/// Combine `fragment` with the tree rooted at `root`.
///
/// Tries merge structurally; a switcher root folds the fragment into its
/// last case when it can merge; anything else becomes an ordered switcher.
pub fn merge_into(root: Option<&Node>, fragment: Node) -> RouteResult<Node> {
    match (root, fragment) {
        (None, fragment) => Ok(fragment),
        (Some(Node::Switcher(s)), Node::Switcher(other)) => Ok(Node::Switcher(s.merge(&other))),
        (Some(Node::Switcher(s)), fragment) => s.with_case(fragment).map(Node::Switcher),
        (Some(root), fragment) if root.can_merge(&fragment) => root.merge(&fragment),
        (Some(root), Node::Switcher(other)) => {
            Ok(Node::Switcher(Switcher::new(vec![root.clone()]).merge(&other)))
        }
        (Some(root), fragment) => Ok(Node::Switcher(Switcher::new(vec![root.clone(), fragment]))),
    }
}

/// Remove a trie `fragment` from the tree rooted at `root`. Returns `None`
/// when no routes are left.
pub fn remove_from(root: Option<&Node>, fragment: &Node) -> RouteResult<Option<Node>> {
    let Node::Trie(fragment) = fragment else {
        return Err(RouteError::NotRemovable(fragment.kind().to_string()));
    };
    match root {
        Some(Node::Trie(t)) => Ok(t.remove(fragment)?.map(Node::Trie)),
        Some(Node::Switcher(s)) => {
            let rest = s.without(fragment)?;
            Ok((!rest.is_empty()).then_some(Node::Switcher(rest)))
        }
        _ => Err(RouteError::PathNotFound(fragment.template())),
    }
}
