//! Typed path parameter matchers.
//!
//! A path template such as `/users/<string:id>` compiles into trie nodes;
//! every `<kind:args>` marker becomes a node holding a [`PatternMatcher`]
//! built by the factory registered under `kind`.
//!
//! # Design Decisions
//! - Matchers are compared structurally (kind + variable name) so two
//!   independently compiled templates share the same trie slot
//! - New kinds are added to a [`MatcherRegistry`]; the trie never inspects
//!   concrete matcher types

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::routing::error::{RouteError, RouteResult};

/// Kind name of the built-in segment matcher.
pub const STRING_MATCHER: &str = "string";

/// A named capture over one part of the request path.
pub trait PatternMatcher: Send + Sync + fmt::Debug + fmt::Display {
    /// Registry kind this matcher was built from.
    fn kind(&self) -> &str;

    /// Variable name captured by this matcher.
    fn name(&self) -> &str;

    /// Consume from `offset`, returning the captured value and the offset
    /// right after it, or `None` if nothing can be captured there.
    fn match_segment<'p>(&self, path: &'p str, offset: usize) -> Option<(&'p str, usize)>;

    /// Two matchers occupy the same trie slot iff they are equal.
    fn equals(&self, other: &dyn PatternMatcher) -> bool {
        self.kind() == other.kind() && self.name() == other.name()
    }
}

/// Builds a matcher from the arguments of a `<kind:arg...>` marker.
pub type MatcherFactory = fn(&[&str]) -> RouteResult<Arc<dyn PatternMatcher>>;

/// Matchers available to the path template parser, keyed by kind.
#[derive(Clone)]
pub struct MatcherRegistry {
    factories: HashMap<String, MatcherFactory>,
}

impl MatcherRegistry {
    /// A registry without any matcher kinds.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register (or replace) the factory for `kind`.
    pub fn register(&mut self, kind: impl Into<String>, factory: MatcherFactory) -> &mut Self {
        self.factories.insert(kind.into(), factory);
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Build a matcher of `kind` from `args`.
    pub fn make(&self, kind: &str, args: &[&str]) -> RouteResult<Arc<dyn PatternMatcher>> {
        match self.factories.get(kind) {
            Some(factory) => factory(args),
            None => Err(RouteError::UnknownMatcher(kind.to_string())),
        }
    }
}

impl Default for MatcherRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(STRING_MATCHER, StringMatcher::from_args);
        registry
    }
}

impl fmt::Debug for MatcherRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.factories.keys().collect();
        kinds.sort();
        f.debug_struct("MatcherRegistry").field("kinds", &kinds).finish()
    }
}

/// The process-wide registry holding the built-in kinds.
pub fn default_registry() -> &'static MatcherRegistry {
    static REGISTRY: OnceLock<MatcherRegistry> = OnceLock::new();
    REGISTRY.get_or_init(MatcherRegistry::default)
}

/// Build a matcher from the built-in kinds.
pub fn make_path_matcher(kind: &str, args: &[&str]) -> RouteResult<Arc<dyn PatternMatcher>> {
    default_registry().make(kind, args)
}

/// Captures a path segment, up to the next `/` or end of path. The segment
/// may be empty (`/m//x`), but there must be path left to capture from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringMatcher {
    name: String,
}

impl StringMatcher {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn from_args(args: &[&str]) -> RouteResult<Arc<dyn PatternMatcher>> {
        match args {
            [name] => Ok(Arc::new(Self::new(*name))),
            _ => Err(RouteError::MatcherArgs {
                kind: STRING_MATCHER.to_string(),
                message: format!(
                    "expected only one parameter - variable name, got {:?}",
                    args
                ),
            }),
        }
    }
}

impl fmt::Display for StringMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}:{}>", STRING_MATCHER, self.name)
    }
}

impl PatternMatcher for StringMatcher {
    fn kind(&self) -> &str {
        STRING_MATCHER
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn match_segment<'p>(&self, path: &'p str, offset: usize) -> Option<(&'p str, usize)> {
        if offset >= path.len() {
            return None;
        }
        let end = path.as_bytes()[offset..]
            .iter()
            .position(|&b| b == b'/')
            .map_or(path.len(), |i| offset + i);
        path.get(offset..end).map(|value| (value, end))
    }
}
