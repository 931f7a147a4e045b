//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route compilation (per location, at load or on register):
//!     expression `TrieRoute("GET", "/users/<id>")`
//!     → expr.rs (syn::Expr, lower FuncCall)
//!     → pattern.rs (build typed segment matchers)
//!     → trie.rs / matcher.rs (fragment bound to a leaf)
//!     → router.rs (merge into the live tree)
//!
//! Incoming request (method, URL, path)
//!     → router.rs (lock-free load of the root)
//!     → node.rs (walk Switcher / Trie / Predicate / Regexp)
//!     → Return: matched Location or None
//! ```
//!
//! # Design Decisions
//! - Each expression compiles independently; combining is done by merging
//!   fragments, not by recompiling the whole table
//! - The tree is persistent: merge and remove never mutate a live node
//! - First match wins, in insertion order

pub mod error;
pub mod expr;
pub mod location;
pub mod matcher;
pub mod node;
pub mod pattern;
pub mod request;
pub mod router;
pub mod table;
pub mod trie;

pub use error::{RouteError, RouteResult};
pub use expr::{parse_expression, Compiler};
pub use location::{Location, SharedLocation, UpstreamLocation};
pub use node::Node;
pub use request::{HttpRequest, RouteRequest};
pub use router::Router;
pub use table::RouteTable;
pub use trie::Trie;
