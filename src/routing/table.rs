//! Location registry on top of the router.
//!
//! # Responsibilities
//! - Compile each location's expression into a fragment bound to it
//! - Register and unregister locations by id
//! - Apply a new configuration by merging and removing only what changed
//!
//! # Design Decisions
//! - Entries keep insertion order; a full rebuild reproduces the same
//!   first-match order as the incremental path
//! - Fragments that cannot be removed structurally (regexp routes) fall
//!   back to rebuilding the root from the remaining entries
//! - `apply` swaps the root once; a failing location leaves the old table
//!   in place

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::schema::{LocationConfig, RouterConfig};
use crate::instructions::ProxyInstructions;
use crate::observability::metrics;
use crate::routing::error::{RouteError, RouteResult};
use crate::routing::expr::Compiler;
use crate::routing::location::{Location, SharedLocation, UpstreamLocation};
use crate::routing::node::Node;
use crate::routing::request::HttpRequest;
use crate::routing::router::{merge_into, remove_from, Router};

#[derive(Debug, Clone)]
struct RouteEntry {
    expression: String,
    location: Arc<UpstreamLocation>,
    fragment: Node,
}

impl RouteEntry {
    fn id(&self) -> &str {
        self.location.id()
    }

    fn matches(&self, config: &LocationConfig) -> bool {
        let location = UpstreamLocation::new(&config.id, config.instructions.clone());
        self.expression == config.route && *self.location == location
    }
}

/// What an `apply` changed, by location id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadSummary {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
    pub unchanged: usize,
    /// The root was rebuilt instead of patched.
    pub rebuilt: bool,
}

impl ReloadSummary {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Routes keyed by location id.
#[derive(Debug, Default)]
pub struct RouteTable {
    router: Router,
    compiler: Compiler,
    entries: Mutex<Vec<RouteEntry>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty table compiling with a custom matcher registry.
    pub fn with_compiler(compiler: Compiler) -> Self {
        Self {
            compiler,
            ..Self::default()
        }
    }

    pub fn from_config(config: &RouterConfig) -> RouteResult<Self> {
        let table = Self::new();
        table.apply(config)?;
        Ok(table)
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Location matching the request, with its instructions.
    pub fn route(&self, req: &dyn HttpRequest) -> Option<SharedLocation> {
        self.router.route(req)
    }

    /// Instructions of a registered location.
    pub fn instructions(&self, id: &str) -> Option<ProxyInstructions> {
        self.lock()
            .iter()
            .find(|e| e.id() == id)
            .and_then(|e| e.location.instructions().cloned())
    }

    /// Registered ids in match priority order.
    pub fn ids(&self) -> Vec<String> {
        self.lock().iter().map(|e| e.id().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Compile `expression` for a new location and merge it into the tree.
    pub fn register(
        &self,
        id: &str,
        expression: &str,
        instructions: ProxyInstructions,
    ) -> RouteResult<()> {
        let mut entries = self.lock();
        if entries.iter().any(|e| e.id() == id) {
            return Err(RouteError::DuplicateLocation(id.to_string()));
        }
        let entry = self.compile(id, expression, instructions)?;
        self.router
            .merge(entry.fragment.clone())
            .map_err(|e| e.for_location(id))?;
        entries.push(entry);
        tracing::info!(location = %id, route = %expression, "Route registered");
        Ok(())
    }

    /// Remove the route of location `id` from the tree.
    pub fn unregister(&self, id: &str) -> RouteResult<()> {
        let mut entries = self.lock();
        let index = entries
            .iter()
            .position(|e| e.id() == id)
            .ok_or_else(|| RouteError::UnknownLocation(id.to_string()))?;

        let entry = &entries[index];
        match self.router.remove(&entry.fragment) {
            Ok(()) => {}
            Err(RouteError::NotRemovable(_)) => {
                tracing::debug!(location = %id, "Route not removable in place, rebuilding");
                let rest = entries
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != index)
                    .map(|(_, e)| e);
                let root = build_root(rest)?;
                self.router.update(|_| Ok(root))?;
            }
            Err(e) => return Err(e.for_location(id)),
        }
        entries.remove(index);
        tracing::info!(location = %id, "Route unregistered");
        Ok(())
    }

    /// Bring the table in line with `config`.
    ///
    /// Locations whose route and instructions are unchanged keep their
    /// place; changed ones move to the end of the priority order.
    pub fn apply(&self, config: &RouterConfig) -> RouteResult<ReloadSummary> {
        let mut seen = HashSet::new();
        if let Some(dup) = config.locations.iter().find(|l| !seen.insert(l.id.as_str())) {
            return Err(RouteError::DuplicateLocation(dup.id.clone()));
        }

        let mut entries = self.lock();
        let mut summary = ReloadSummary::default();

        let mut kept = Vec::new();
        let mut dropped = Vec::new();
        for entry in entries.iter() {
            match config.locations.iter().find(|l| l.id == entry.id()) {
                Some(l) if entry.matches(l) => kept.push(entry.clone()),
                Some(_) => {
                    summary.updated.push(entry.id().to_string());
                    dropped.push(entry);
                }
                None => {
                    summary.removed.push(entry.id().to_string());
                    dropped.push(entry);
                }
            }
        }
        summary.unchanged = kept.len();

        let mut added = Vec::new();
        for l in &config.locations {
            if kept.iter().any(|e| e.id() == l.id) {
                continue;
            }
            if !summary.updated.contains(&l.id) {
                summary.added.push(l.id.clone());
            }
            added.push(self.compile(&l.id, &l.route, l.instructions.clone())?);
        }

        if summary.is_noop() {
            return Ok(summary);
        }

        let next: Vec<RouteEntry> = kept.into_iter().chain(added.iter().cloned()).collect();
        let result = self.router.update(|root| {
            let mut root = root.cloned();
            for entry in &dropped {
                match remove_from(root.as_ref(), &entry.fragment) {
                    Ok(rest) => root = rest,
                    Err(RouteError::NotRemovable(_)) => {
                        summary.rebuilt = true;
                        return build_root(&next);
                    }
                    Err(e) => return Err(e.for_location(entry.id())),
                }
            }
            for entry in &added {
                root = Some(
                    merge_into(root.as_ref(), entry.fragment.clone())
                        .map_err(|e| e.for_location(entry.id()))?,
                );
            }
            Ok(root)
        });
        metrics::record_mutation("apply", result.is_ok());
        result?;

        *entries = next;
        tracing::info!(
            added = summary.added.len(),
            updated = summary.updated.len(),
            removed = summary.removed.len(),
            unchanged = summary.unchanged,
            rebuilt = summary.rebuilt,
            "Route table applied"
        );
        Ok(summary)
    }

    fn compile(
        &self,
        id: &str,
        expression: &str,
        instructions: ProxyInstructions,
    ) -> RouteResult<RouteEntry> {
        let location = Arc::new(UpstreamLocation::new(id, instructions));
        let shared: SharedLocation = location.clone();
        let fragment = self
            .compiler
            .compile(expression, shared)
            .map_err(|e| e.for_location(id))?;
        Ok(RouteEntry {
            expression: expression.to_string(),
            location,
            fragment,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RouteEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn build_root<'a, I>(entries: I) -> RouteResult<Option<Node>>
where
    I: IntoIterator<Item = &'a RouteEntry>,
{
    let mut root = None;
    for entry in entries {
        root = Some(
            merge_into(root.as_ref(), entry.fragment.clone())
                .map_err(|e| e.for_location(entry.id()))?,
        );
    }
    Ok(root)
}
