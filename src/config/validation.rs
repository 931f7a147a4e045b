//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check location ids are present and unique
//! - Compile every route expression and detect conflicting routes
//! - Validate instruction bundles and observability settings
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;

use crate::config::schema::RouterConfig;
use crate::routing::expr::parse_expression;
use crate::routing::location::UpstreamLocation;
use crate::routing::node::Node;
use crate::routing::router::merge_into;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("location #{0}: id must not be empty")]
    EmptyId(usize),

    #[error("duplicate location id {0}")]
    DuplicateId(String),

    #[error("location {id}: {message}")]
    Route { id: String, message: String },

    #[error("location {id}: {message}")]
    Instructions { id: String, message: String },

    #[error("invalid log level {0:?}")]
    LogLevel(String),

    #[error("invalid metrics address {0:?}")]
    MetricsAddress(String),
}

pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let obs = &config.observability;
    if !LOG_LEVELS.contains(&obs.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::LogLevel(obs.log_level.clone()));
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::MetricsAddress(obs.metrics_address.clone()));
    }

    let mut seen = HashSet::new();
    let mut root: Option<Node> = None;
    for (index, loc) in config.locations.iter().enumerate() {
        if loc.id.is_empty() {
            errors.push(ValidationError::EmptyId(index));
        } else if !seen.insert(loc.id.as_str()) {
            errors.push(ValidationError::DuplicateId(loc.id.clone()));
        }

        if let Err(e) = loc.instructions.validate() {
            errors.push(ValidationError::Instructions {
                id: loc.id.clone(),
                message: e.to_string(),
            });
        }

        let location = Arc::new(UpstreamLocation::new(&loc.id, loc.instructions.clone()));
        let merged =
            parse_expression(&loc.route, location).and_then(|f| merge_into(root.as_ref(), f));
        match merged {
            Ok(node) => root = Some(node),
            Err(e) => errors.push(ValidationError::Route {
                id: loc.id.clone(),
                message: e.to_string(),
            }),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
