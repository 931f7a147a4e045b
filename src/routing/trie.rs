//! Path trie with structural merge and removal.
//!
//! # Data Flow
//! ```text
//! path template "/users/<id>"
//!     → parse: one chain root → '/' → 'u' ... → '/' → <string:id> (terminus)
//!     → merge into the live trie (same-slot nodes fuse, others branch)
//!
//! request path "/users/42"
//!     → walk bytes / segments depth first, children in insertion order
//!     → terminus reached exactly at end of path → bound node decides
//! ```
//!
//! # Design Decisions
//! - Nodes are immutable and shared through `Arc`; merge and remove build
//!   new spines and reuse every untouched subtree
//! - A node may be both a terminus and an inner node (`/a` and `/aa`)
//! - Sibling order is insertion order and decides ties

use std::fmt;
use std::sync::Arc;

use crate::routing::error::{RouteError, RouteResult};
use crate::routing::location::SharedLocation;
use crate::routing::node::Node;
use crate::routing::pattern::{default_registry, MatcherRegistry, PatternMatcher, STRING_MATCHER};
use crate::routing::request::HttpRequest;

/// The matching unit of a trie node.
#[derive(Debug, Clone)]
pub enum Key {
    Root,
    Byte(u8),
    Pattern(Arc<dyn PatternMatcher>),
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Key::Root, Key::Root) => true,
            (Key::Byte(a), Key::Byte(b)) => a == b,
            (Key::Pattern(a), Key::Pattern(b)) => a.equals(b.as_ref()),
            _ => false,
        }
    }
}

impl Key {
    /// Appends the template text of this key. Byte keys of a multi-byte
    /// character only form valid UTF-8 together.
    fn append_to(&self, out: &mut Vec<u8>) {
        match self {
            Key::Root => {}
            Key::Byte(b) => out.push(*b),
            Key::Pattern(m) => out.extend_from_slice(m.to_string().as_bytes()),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Root => Ok(()),
            Key::Byte(b) if b.is_ascii() => write!(f, "{}", *b as char),
            Key::Byte(b) => write!(f, "\\x{:02x}", b),
            Key::Pattern(m) => write!(f, "{}", m),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrieNode {
    key: Key,
    children: Vec<Arc<TrieNode>>,
    /// Present when a route terminates at this node.
    result: Option<Arc<Node>>,
}

impl TrieNode {
    fn root(children: Vec<Arc<TrieNode>>) -> Self {
        Self {
            key: Key::Root,
            children,
            result: None,
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn children(&self) -> &[Arc<TrieNode>] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.result.is_some()
    }

    pub fn is_root(&self) -> bool {
        matches!(self.key, Key::Root)
    }

    fn lookup(&self, offset: usize, path: &str, req: &dyn HttpRequest) -> Option<SharedLocation> {
        let next = match &self.key {
            Key::Root => offset,
            Key::Byte(b) => {
                if path.as_bytes().get(offset) != Some(b) {
                    return None;
                }
                offset + 1
            }
            Key::Pattern(m) => m.match_segment(path, offset)?.1,
        };

        if next == path.len() {
            if let Some(result) = &self.result {
                return result.lookup(req);
            }
        }

        self.children
            .iter()
            .find_map(|child| child.lookup(next, path, req))
    }

    fn merge(&self, other: &TrieNode, path: &mut Vec<u8>) -> RouteResult<TrieNode> {
        let mark = path.len();
        self.key.append_to(path);

        let result = match (&self.result, &other.result) {
            (Some(_), Some(_)) => {
                return Err(RouteError::Conflict(
                    String::from_utf8_lossy(path).into_owned(),
                ))
            }
            (Some(r), None) | (None, Some(r)) => Some(Arc::clone(r)),
            (None, None) => None,
        };

        let mut merged = vec![false; other.children.len()];
        let mut children = Vec::with_capacity(self.children.len() + other.children.len());
        for child in &self.children {
            match other.children.iter().position(|o| o.key == child.key) {
                Some(i) => {
                    merged[i] = true;
                    children.push(Arc::new(child.merge(&other.children[i], path)?));
                }
                None => children.push(Arc::clone(child)),
            }
        }
        children.extend(
            other
                .children
                .iter()
                .zip(merged)
                .filter(|(_, done)| !done)
                .map(|(child, _)| Arc::clone(child)),
        );

        path.truncate(mark);
        Ok(TrieNode {
            key: self.key.clone(),
            children,
            result,
        })
    }

    /// Returns `None` when this node has nothing left after removal.
    fn remove(&self, other: &TrieNode, template: &str) -> RouteResult<Option<TrieNode>> {
        if other.is_leaf() {
            if !other.children.is_empty() {
                return Err(RouteError::NotRemovable(template.to_string()));
            }
            if !self.is_leaf() {
                return Err(RouteError::PathNotFound(template.to_string()));
            }
            if self.children.is_empty() {
                return Ok(None);
            }
            return Ok(Some(TrieNode {
                key: self.key.clone(),
                children: self.children.clone(),
                result: None,
            }));
        }

        let [next] = other.children.as_slice() else {
            return Err(RouteError::NotRemovable(template.to_string()));
        };
        let index = self
            .children
            .iter()
            .position(|c| c.key == next.key)
            .ok_or_else(|| RouteError::PathNotFound(template.to_string()))?;

        let mut children = self.children.clone();
        match self.children[index].remove(next, template)? {
            Some(child) => children[index] = Arc::new(child),
            None => {
                children.remove(index);
            }
        }

        if children.is_empty() && !self.is_leaf() && !self.is_root() {
            return Ok(None);
        }
        Ok(Some(TrieNode {
            key: self.key.clone(),
            children,
            result: self.result.clone(),
        }))
    }

    fn count_leaves(&self) -> usize {
        usize::from(self.is_leaf())
            + self
                .children
                .iter()
                .map(|c| c.count_leaves())
                .sum::<usize>()
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let pad = " ".repeat(depth);
        if self.is_root() {
            writeln!(f, "{}root", pad)?;
        } else if self.is_leaf() {
            writeln!(f, "{}leaf({})", pad, self.key)?;
        } else {
            writeln!(f, "{}node({})", pad, self.key)?;
        }
        for child in &self.children {
            child.fmt_tree(f, depth + 1)?;
        }
        Ok(())
    }
}

/// A path trie. Cloning is cheap: the node graph is shared.
#[derive(Debug, Clone)]
pub struct Trie {
    root: Arc<TrieNode>,
}

impl Trie {
    /// Compile `pattern` into a single-route trie whose terminus is bound
    /// to `result`, using the built-in matcher kinds.
    pub fn parse(pattern: &str, result: Node) -> RouteResult<Trie> {
        Self::parse_with(pattern, result, default_registry())
    }

    /// Like [`Trie::parse`] with a caller supplied matcher registry.
    pub fn parse_with(
        pattern: &str,
        result: Node,
        registry: &MatcherRegistry,
    ) -> RouteResult<Trie> {
        if pattern.is_empty() {
            return Err(RouteError::EmptyPattern);
        }

        let mut keys = Vec::new();
        let mut offset = 0;
        while offset < pattern.len() {
            match parse_parameter(pattern, offset, registry)? {
                Some((matcher, next)) => {
                    keys.push(Key::Pattern(matcher));
                    offset = next;
                }
                None => {
                    keys.push(Key::Byte(pattern.as_bytes()[offset]));
                    offset += 1;
                }
            }
        }

        // Build the chain bottom-up so every node is created exactly once.
        let mut tail: Option<TrieNode> = None;
        for key in keys.into_iter().rev() {
            let node = match tail.take() {
                None => TrieNode {
                    key,
                    children: Vec::new(),
                    result: Some(Arc::new(result.clone())),
                },
                Some(child) => TrieNode {
                    key,
                    children: vec![Arc::new(child)],
                    result: None,
                },
            };
            tail = Some(node);
        }

        let children = tail.map(Arc::new).into_iter().collect();
        Ok(Trie {
            root: Arc::new(TrieNode::root(children)),
        })
    }

    pub fn root(&self) -> &TrieNode {
        &self.root
    }

    /// Find the location bound to the request path.
    pub fn lookup(&self, req: &dyn HttpRequest) -> Option<SharedLocation> {
        let path = match req.path() {
            "" => "/",
            path => path,
        };
        self.root.lookup(0, path, req)
    }

    /// Union of both tries. Fails if both bind a route at the same slot;
    /// neither operand is modified.
    pub fn merge(&self, other: &Trie) -> RouteResult<Trie> {
        let root = self.root.merge(&other.root, &mut Vec::new())?;
        Ok(Trie {
            root: Arc::new(root),
        })
    }

    /// Remove the single route described by `other`. Returns `None` when
    /// the trie holds no routes afterwards.
    pub fn remove(&self, other: &Trie) -> RouteResult<Option<Trie>> {
        let template = other.template();
        match self.root.remove(&other.root, &template)? {
            Some(root) if !root.children.is_empty() => Ok(Some(Trie {
                root: Arc::new(root),
            })),
            _ => Ok(None),
        }
    }

    /// Number of route termini.
    pub fn len(&self) -> usize {
        self.root.count_leaves()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        self.root.fmt_tree(f, depth)
    }

    /// The template spelled by the first branch, e.g. `/users/<string:id>`.
    pub fn template(&self) -> String {
        let mut out = Vec::new();
        let mut node = self.root.as_ref();
        while let Some(child) = node.children.first() {
            child.key.append_to(&mut out);
            node = child;
        }
        String::from_utf8_lossy(&out).into_owned()
    }
}

impl fmt::Display for Trie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.fmt_tree(f, 0)
    }
}

/// Try to read a `<kind:arg...>` marker at `offset`.
///
/// A `<` that is not closed by `>` before the next `/` is a literal byte.
fn parse_parameter(
    pattern: &str,
    offset: usize,
    registry: &MatcherRegistry,
) -> RouteResult<Option<(Arc<dyn PatternMatcher>, usize)>> {
    let bytes = pattern.as_bytes();
    if bytes[offset] != b'<' {
        return Ok(None);
    }
    let Some(len) = bytes[offset + 1..]
        .iter()
        .position(|&b| b == b'>' || b == b'/')
        .filter(|&i| i > 0 && bytes[offset + 1 + i] == b'>')
    else {
        return Ok(None);
    };

    let marker = &pattern[offset + 1..offset + 1 + len];
    let values: Vec<&str> = marker.split(':').collect();
    if values.iter().any(|v| v.is_empty()) {
        return Err(RouteError::MatcherArgs {
            kind: values[0].to_string(),
            message: format!("malformed parameter <{}>", marker),
        });
    }

    // <name> is shorthand for <string:name>
    let (kind, args) = match values.as_slice() {
        [name] => (STRING_MATCHER, std::slice::from_ref(name)),
        [kind, args @ ..] => (*kind, args),
        [] => return Ok(None),
    };
    let matcher = registry.make(kind, args)?;
    Ok(Some((matcher, offset + len + 2)))
}
