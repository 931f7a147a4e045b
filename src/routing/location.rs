//! Routing destinations.

use std::fmt;
use std::sync::Arc;

use crate::instructions::{ProxyInstructions, Upstream};

/// A destination a matched route resolves to.
///
/// Locations are owned by whoever registers the route; the tree only holds
/// shared references.
pub trait Location: Send + Sync + fmt::Debug {
    /// Stable identifier used in logs and for unregistering.
    fn id(&self) -> &str;

    /// Forwarding instructions, for locations that carry them.
    fn instructions(&self) -> Option<&ProxyInstructions> {
        None
    }
}

/// Shared handle stored in leaves.
pub type SharedLocation = Arc<dyn Location>;

/// A location backed by a proxy instruction bundle.
///
/// The router reads only the identity; the instructions flow unchanged to
/// the dispatch layer that consumes the match.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamLocation {
    id: String,
    instructions: ProxyInstructions,
}

impl UpstreamLocation {
    pub fn new(id: impl Into<String>, instructions: ProxyInstructions) -> Self {
        Self {
            id: id.into(),
            instructions,
        }
    }

    pub fn upstreams(&self) -> &[Upstream] {
        &self.instructions.upstreams
    }
}

impl Location for UpstreamLocation {
    fn id(&self) -> &str {
        &self.id
    }

    fn instructions(&self) -> Option<&ProxyInstructions> {
        Some(&self.instructions)
    }
}
