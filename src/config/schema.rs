//! Configuration schema definitions.
//!
//! This module defines the route file structure. All types derive Serde
//! traits for deserialization from TOML.

use serde::{Deserialize, Serialize};

use crate::instructions::ProxyInstructions;

/// Root configuration: the route table plus ambient settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct RouterConfig {
    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Locations in match priority order.
    pub locations: Vec<LocationConfig>,
}

/// One routable destination.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LocationConfig {
    /// Unique identifier, used in logs and to unregister the route.
    pub id: String,

    /// Route expression, e.g. `TrieRoute("GET", "/users/<id>")`.
    pub route: String,

    /// Upstreams, tokens, headers and failover for matched requests.
    #[serde(flatten)]
    pub instructions: ProxyInstructions,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
