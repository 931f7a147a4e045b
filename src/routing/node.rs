//! The route tree's node type.
//!
//! Every element placed in the tree is one of a closed set of variants,
//! all sharing the same contract: `can_merge`, `merge` and `lookup`.
//!
//! | Variant     | Matches when                          | Merges with   |
//! |-------------|---------------------------------------|---------------|
//! | `Leaf`      | always                                | nothing       |
//! | `Trie`      | the path reaches a bound terminus     | another trie  |
//! | `Switcher`  | any case matches (first one wins)     | a switcher    |
//! | `Predicate` | its test passes and the child matches | nothing       |
//! | `Regexp`    | the URL matches and the child matches | nothing       |

use std::fmt;

use crate::routing::error::{RouteError, RouteResult};
use crate::routing::location::SharedLocation;
use crate::routing::matcher::{Predicate, RegexpFilter};
use crate::routing::request::HttpRequest;
use crate::routing::trie::Trie;

#[derive(Debug, Clone)]
pub enum Node {
    Leaf(Leaf),
    Trie(Trie),
    Switcher(Switcher),
    Predicate(Predicate),
    Regexp(RegexpFilter),
}

impl Node {
    pub fn leaf(location: SharedLocation) -> Node {
        Node::Leaf(Leaf::new(location))
    }

    /// Short variant name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Leaf(_) => "leaf",
            Node::Trie(_) => "trie",
            Node::Switcher(_) => "switcher",
            Node::Predicate(_) => "predicate",
            Node::Regexp(_) => "regexp",
        }
    }

    pub fn can_merge(&self, other: &Node) -> bool {
        matches!(
            (self, other),
            (Node::Trie(_), Node::Trie(_)) | (Node::Switcher(_), Node::Switcher(_))
        )
    }

    /// Structural union of two nodes. Neither operand is modified.
    pub fn merge(&self, other: &Node) -> RouteResult<Node> {
        match (self, other) {
            (Node::Trie(a), Node::Trie(b)) => a.merge(b).map(Node::Trie),
            (Node::Switcher(a), Node::Switcher(b)) => Ok(Node::Switcher(a.merge(b))),
            _ => Err(RouteError::NotMergeable {
                left: self.kind(),
                right: other.kind(),
            }),
        }
    }

    pub fn lookup(&self, req: &dyn HttpRequest) -> Option<SharedLocation> {
        match self {
            Node::Leaf(l) => Some(l.location()),
            Node::Trie(t) => t.lookup(req),
            Node::Switcher(s) => s.lookup(req),
            Node::Predicate(p) => p.lookup(req),
            Node::Regexp(r) => r.lookup(req),
        }
    }

    /// Number of routes reachable in this node.
    pub fn route_count(&self) -> usize {
        match self {
            Node::Trie(t) => t.len(),
            Node::Switcher(s) => s.cases.iter().map(Node::route_count).sum(),
            _ => 1,
        }
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let pad = " ".repeat(depth);
        match self {
            Node::Leaf(l) => writeln!(f, "{}leaf -> {}", pad, l.location.id()),
            Node::Trie(t) => t.fmt_indented(f, depth),
            Node::Switcher(s) => {
                writeln!(f, "{}switcher", pad)?;
                for case in &s.cases {
                    case.fmt_tree(f, depth + 1)?;
                }
                Ok(())
            }
            Node::Predicate(p) => {
                writeln!(f, "{}predicate({})", pad, p.label())?;
                p.child().fmt_tree(f, depth + 1)
            }
            Node::Regexp(r) => {
                writeln!(f, "{}regexp({})", pad, r.as_str())?;
                r.child().fmt_tree(f, depth + 1)
            }
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, 0)
    }
}

impl From<Trie> for Node {
    fn from(t: Trie) -> Self {
        Node::Trie(t)
    }
}

/// Terminal node bound to a location.
#[derive(Debug, Clone)]
pub struct Leaf {
    location: SharedLocation,
}

impl Leaf {
    pub fn new(location: SharedLocation) -> Self {
        Self { location }
    }

    pub fn location(&self) -> SharedLocation {
        SharedLocation::clone(&self.location)
    }
}

/// Ordered alternatives; the first case that matches wins.
#[derive(Debug, Clone, Default)]
pub struct Switcher {
    cases: Vec<Node>,
}

impl Switcher {
    pub fn new(cases: Vec<Node>) -> Self {
        Self { cases }
    }

    pub fn cases(&self) -> &[Node] {
        &self.cases
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Left cases first, then right cases.
    pub fn merge(&self, other: &Switcher) -> Switcher {
        let mut cases = Vec::with_capacity(self.cases.len() + other.cases.len());
        cases.extend(self.cases.iter().cloned());
        cases.extend(other.cases.iter().cloned());
        Switcher { cases }
    }

    /// Fold `node` into the last case when it can merge structurally,
    /// otherwise append it as a new case. Earlier cases are only checked
    /// for conflicts, so a later route never gains priority over a case
    /// registered before it.
    pub fn with_case(&self, node: Node) -> RouteResult<Switcher> {
        let mut cases = self.cases.clone();
        let last = cases.len().checked_sub(1);
        let earlier = &cases[..last.unwrap_or(0)];
        for case in earlier.iter().filter(|c| c.can_merge(&node)) {
            if let Err(e @ RouteError::Conflict(_)) = case.merge(&node) {
                return Err(e);
            }
        }
        match last {
            Some(i) if cases[i].can_merge(&node) => cases[i] = cases[i].merge(&node)?,
            _ => cases.push(node),
        }
        Ok(Switcher { cases })
    }

    /// Remove a trie route from the first case containing it. Cases left
    /// without routes are dropped.
    pub fn without(&self, fragment: &Trie) -> RouteResult<Switcher> {
        for (i, case) in self.cases.iter().enumerate() {
            let Node::Trie(trie) = case else {
                continue;
            };
            match trie.remove(fragment) {
                Ok(rest) => {
                    let mut cases = self.cases.clone();
                    match rest {
                        Some(t) => cases[i] = Node::Trie(t),
                        None => {
                            cases.remove(i);
                        }
                    }
                    return Ok(Switcher { cases });
                }
                Err(RouteError::PathNotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(RouteError::PathNotFound(fragment.template()))
    }

    pub fn lookup(&self, req: &dyn HttpRequest) -> Option<SharedLocation> {
        self.cases.iter().find_map(|c| c.lookup(req))
    }
}
