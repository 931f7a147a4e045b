//! Instruction sources.
//!
//! A source turns a request into the instruction bundle the forwarding
//! layer acts on. Dynamic sources read from a discovery service through the
//! narrow `Discovery::resolve` capability; nothing is scripted.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use crate::instructions::{InstructionError, ProxyInstructions, Upstream};
use crate::routing::request::HttpRequest;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("discovery failed for {key}: {message}")]
    Discovery { key: String, message: String },

    #[error("no value registered for {0}")]
    NotFound(String),

    #[error(transparent)]
    Instructions(#[from] InstructionError),
}

/// Produces the instructions for a request.
pub trait InstructionSource: Send + Sync {
    fn instructions(&self, req: &dyn HttpRequest) -> Result<ProxyInstructions, ControlError>;
}

/// Name lookup in a service registry.
pub trait Discovery: Send + Sync {
    fn resolve(&self, key: &str) -> Result<String, ControlError>;
}

/// Always returns the same bundle.
#[derive(Debug, Clone)]
pub struct StaticSource {
    instructions: ProxyInstructions,
}

impl StaticSource {
    pub fn new(instructions: ProxyInstructions) -> Self {
        Self { instructions }
    }
}

impl InstructionSource for StaticSource {
    fn instructions(&self, _req: &dyn HttpRequest) -> Result<ProxyInstructions, ControlError> {
        Ok(self.instructions.clone())
    }
}

/// Resolves `key` on every request and forwards to the returned URL.
pub struct DiscoverySource {
    discovery: Arc<dyn Discovery>,
    key: String,
}

impl DiscoverySource {
    pub fn new(discovery: Arc<dyn Discovery>, key: impl Into<String>) -> Self {
        Self {
            discovery,
            key: key.into(),
        }
    }
}

impl InstructionSource for DiscoverySource {
    fn instructions(&self, req: &dyn HttpRequest) -> Result<ProxyInstructions, ControlError> {
        let url = self.discovery.resolve(&self.key).map_err(|e| {
            tracing::error!(key = %self.key, path = %req.path(), error = %e, "Discovery failed");
            e
        })?;
        tracing::debug!(key = %self.key, upstream = %url, "Resolved upstream");
        let upstream = Upstream::parse(&url)?;
        Ok(ProxyInstructions::new(vec![upstream])?)
    }
}

/// In-memory discovery, for static deployments and tests.
#[derive(Debug, Default)]
pub struct StaticDiscovery {
    values: RwLock<HashMap<String, String>>,
}

impl StaticDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.into(), value.into());
    }
}

impl Discovery for StaticDiscovery {
    fn resolve(&self, key: &str) -> Result<String, ControlError> {
        self.values
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
            .ok_or_else(|| ControlError::NotFound(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::request::RouteRequest;

    fn req() -> RouteRequest {
        RouteRequest::parse("GET", "/users/1").unwrap()
    }

    #[test]
    fn test_static_source() {
        let bundle = ProxyInstructions::new(vec![Upstream::parse("http://a:1").unwrap()]).unwrap();
        let source = StaticSource::new(bundle.clone());
        assert_eq!(source.instructions(&req()).unwrap(), bundle);
    }

    #[test]
    fn test_discovery_source() {
        let discovery = Arc::new(StaticDiscovery::new());
        let source = DiscoverySource::new(discovery.clone(), "upstream");

        assert!(matches!(
            source.instructions(&req()),
            Err(ControlError::NotFound(k)) if k == "upstream"
        ));

        discovery.set("upstream", "http://10.0.0.7:8080");
        let i = source.instructions(&req()).unwrap();
        assert_eq!(i.upstreams[0].url.as_str(), "http://10.0.0.7:8080/");

        discovery.set("upstream", "not a url");
        assert!(matches!(
            source.instructions(&req()),
            Err(ControlError::Instructions(_))
        ));
    }
}
