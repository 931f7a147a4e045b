//! Expression router for a reverse-proxy gateway.
//!
//! Routes are written as small function calls, `TrieRoute("GET",
//! "/users/<id>")` or `RegexpRoute(r"^https://api\.")`, each compiled into a
//! tree fragment and merged into a live router without recompiling the
//! rest of the table.

pub mod backend;
pub mod config;
pub mod control;
pub mod instructions;
pub mod observability;
pub mod routing;

pub use config::schema::RouterConfig;
pub use instructions::ProxyInstructions;
pub use routing::{parse_expression, Location, Node, RouteError, RouteTable, Router};
