//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! routing, config and backend produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (lookup and mutation counters, route gauge)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
