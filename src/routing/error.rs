//! Routing error definitions.

use thiserror::Error;

/// Errors raised while compiling, merging or removing routes.
///
/// Lookups never produce these: "no matching route" is a normal outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The expression text could not be tokenized or parsed.
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    /// The expression is well formed but is not a single function call.
    #[error("expected a single route function call, got {0}")]
    NotACall(String),

    /// The called function is not part of the route vocabulary.
    #[error("unsupported function: {0}")]
    UnknownFunction(String),

    /// A route function was called without its mandatory argument.
    #[error("{function} needs at least one argument - {expected}")]
    MissingArgument {
        function: &'static str,
        expected: &'static str,
    },

    /// A route function argument is not a string literal.
    #[error("{function}: argument {position} must be a string literal, got {found}")]
    ArgumentType {
        function: String,
        position: usize,
        found: String,
    },

    /// A path template was empty.
    #[error("empty path pattern")]
    EmptyPattern,

    /// The matcher kind named in a path parameter is not registered.
    #[error("unsupported matcher: {0}")]
    UnknownMatcher(String),

    /// A matcher factory rejected its arguments.
    #[error("matcher {kind}: {message}")]
    MatcherArgs { kind: String, message: String },

    /// A path template could not be compiled.
    #[error("{function}: failed to parse path expression {pattern:?}: {source}")]
    BadPath {
        function: &'static str,
        pattern: String,
        #[source]
        source: Box<RouteError>,
    },

    /// A regular expression failed to compile.
    #[error("{function}: bad regular expression {pattern:?}: {message}")]
    BadRegexp {
        function: &'static str,
        pattern: String,
        message: String,
    },

    /// Two routes terminate at the same trie slot.
    #[error("conflicting paths: {0} is already bound")]
    Conflict(String),

    /// The two nodes have no structural merge.
    #[error("can't merge {left} with {right}")]
    NotMergeable {
        left: &'static str,
        right: &'static str,
    },

    /// A removal target is not present in the tree.
    #[error("failed to find path {0}")]
    PathNotFound(String),

    /// A removal target is not a single-route fragment.
    #[error("can't remove {0}: not a single route fragment")]
    NotRemovable(String),

    /// A configured location failed to compile or merge.
    #[error("location {id}: {source}")]
    Location {
        id: String,
        #[source]
        source: Box<RouteError>,
    },

    #[error("location {0} is already registered")]
    DuplicateLocation(String),

    #[error("location {0} is not registered")]
    UnknownLocation(String),
}

impl RouteError {
    /// Attach the id of the location whose route caused this error.
    pub fn for_location(self, id: impl Into<String>) -> RouteError {
        RouteError::Location {
            id: id.into(),
            source: Box::new(self),
        }
    }
}

/// Result type for routing operations.
pub type RouteResult<T> = Result<T, RouteError>;
