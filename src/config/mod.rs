//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! route file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, route compilation)
//!     → RouterConfig (validated, immutable)
//!     → RouteTable::apply builds or patches the live tree
//!
//! On file change:
//!     watcher.rs detects change in the file's directory
//!     → unchanged or empty content is skipped
//!     → loader.rs parses, validation.rs validates
//!     → Result<RouterConfig, ConfigError> sent over an mpsc channel
//!     → RouteTable::apply merges / removes the differences,
//!       rejected files are logged and the table is kept
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes arrive as a whole new file
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{LocationConfig, ObservabilityConfig, RouterConfig};
pub use validation::{validate_config, ValidationError};
pub use watcher::{ConfigWatcher, RouteFileUpdate};
