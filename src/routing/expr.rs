//! Route expression compiler.
//!
//! # Data Flow
//! ```text
//! TrieRoute("GET", "/users/<id>")
//!     → syn::Expr (Rust expression syntax, string literals and all)
//!     → FuncCall { name, args } (single call, literal args only)
//!     → Node (trie / regexp filter with a leaf bound to the location)
//! ```
//!
//! The grammar deliberately accepts exactly one function call. Combining
//! rules happens at the tree level by merging separately compiled
//! expressions, so boolean operators are parsed only to be rejected with a
//! precise error. Arguments are Rust string literals: `"..."` with the usual
//! escapes, or raw `r"..."` for regular expressions.

use syn::{BinOp, Expr, ExprCall, ExprLit, Lit, UnOp};

use crate::routing::error::{RouteError, RouteResult};
use crate::routing::location::SharedLocation;
use crate::routing::matcher::{Predicate, RegexpFilter};
use crate::routing::node::Node;
use crate::routing::pattern::{default_registry, MatcherRegistry};
use crate::routing::trie::Trie;

pub const TRIE_ROUTE_FN: &str = "TrieRoute";
pub const REGEXP_ROUTE_FN: &str = "RegexpRoute";

/// Compile `source` with the built-in matcher kinds.
pub fn parse_expression(source: &str, location: SharedLocation) -> RouteResult<Node> {
    Compiler::new(default_registry().clone()).compile(source, location)
}

/// Compiles route expressions into nodes.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    registry: MatcherRegistry,
}

impl Compiler {
    pub fn new(registry: MatcherRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &MatcherRegistry {
        &self.registry
    }

    pub fn compile(&self, source: &str, location: SharedLocation) -> RouteResult<Node> {
        let call = FuncCall::parse(source)?;
        let leaf = Node::leaf(location);
        match call.name.as_str() {
            TRIE_ROUTE_FN => self.trie_route(&call.args, leaf),
            REGEXP_ROUTE_FN => regexp_route(&call.args, leaf),
            _ => Err(RouteError::UnknownFunction(call.name)),
        }
    }

    fn trie_route(&self, args: &[String], leaf: Node) -> RouteResult<Node> {
        let (methods, path) = split_arguments(TRIE_ROUTE_FN, args, "path to match")?;
        let result = with_methods(methods, leaf);
        Trie::parse_with(path, result, &self.registry)
            .map(Node::Trie)
            .map_err(|e| RouteError::BadPath {
                function: TRIE_ROUTE_FN,
                pattern: path.to_string(),
                source: Box::new(e),
            })
    }
}

fn regexp_route(args: &[String], leaf: Node) -> RouteResult<Node> {
    let (methods, expr) = split_arguments(REGEXP_ROUTE_FN, args, "regular expression to match")?;
    let result = with_methods(methods, leaf);
    RegexpFilter::new(expr, result)
        .map(Node::Regexp)
        .map_err(|e| match e {
            RouteError::BadRegexp {
                pattern, message, ..
            } => RouteError::BadRegexp {
                function: REGEXP_ROUTE_FN,
                pattern,
                message,
            },
            other => other,
        })
}

/// The first n-1 arguments are request methods, the last one is the
/// path or pattern to match.
fn split_arguments<'a>(
    function: &'static str,
    args: &'a [String],
    expected: &'static str,
) -> RouteResult<(&'a [String], &'a str)> {
    match args.split_last() {
        Some((last, methods)) => Ok((methods, last.as_str())),
        None => Err(RouteError::MissingArgument { function, expected }),
    }
}

fn with_methods(methods: &[String], leaf: Node) -> Node {
    if methods.is_empty() {
        leaf
    } else {
        Node::Predicate(Predicate::methods(methods, leaf))
    }
}

/// A parsed route function invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncCall {
    pub name: String,
    pub args: Vec<String>,
}

impl FuncCall {
    /// Parse `source` into a single call with string literal arguments.
    pub fn parse(source: &str) -> RouteResult<FuncCall> {
        let parsed = syn::parse_str::<Expr>(source);
        let call = match parsed {
            Ok(Expr::Call(call)) => FuncCall::from_call(&call),
            Ok(other) => Err(RouteError::NotACall(describe(&other))),
            Err(e) => Err(RouteError::Syntax {
                offset: e.span().byte_range().start,
                message: e.to_string(),
            }),
        };
        // Only owned strings leave this function, so the spans recorded for
        // `source` can be released.
        proc_macro2::extra::invalidate_current_thread_spans();
        call
    }

    fn from_call(call: &ExprCall) -> RouteResult<FuncCall> {
        let name = match call.func.as_ref() {
            Expr::Path(p) if p.qself.is_none() => p.path.get_ident().map(ToString::to_string),
            _ => None,
        };
        let Some(name) = name else {
            return Err(RouteError::NotACall(format!(
                "call through {}",
                describe(&call.func)
            )));
        };

        let args = call
            .args
            .iter()
            .enumerate()
            .map(|(i, arg)| match arg {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(s), ..
                }) if s.suffix().is_empty() => Ok(s.value()),
                other => Err(RouteError::ArgumentType {
                    function: name.clone(),
                    position: i + 1,
                    found: describe(other),
                }),
            })
            .collect::<RouteResult<Vec<_>>>()?;
        Ok(FuncCall { name, args })
    }
}

fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Call(call) => match call.func.as_ref() {
            Expr::Path(p) => format!("call to {}", path_name(&p.path)),
            _ => "call expression".to_string(),
        },
        Expr::MethodCall(m) => format!("method call .{}()", m.method),
        Expr::Path(p) => format!("identifier {}", path_name(&p.path)),
        Expr::Lit(l) => match &l.lit {
            Lit::Str(s) => format!("string literal {:?}", s.value()),
            Lit::Int(n) => format!("number {}", n.base10_digits()),
            Lit::Float(n) => format!("number {}", n.base10_digits()),
            Lit::Bool(b) => format!("boolean {}", b.value),
            _ => "literal".to_string(),
        },
        Expr::Paren(_) => "parenthesized expression".to_string(),
        Expr::Unary(u) => format!("unary expression `{}`", unary_op(&u.op)),
        Expr::Binary(b) => format!("binary expression `{}`", binary_op(&b.op)),
        _ => "unsupported expression".to_string(),
    }
}

fn path_name(path: &syn::Path) -> String {
    path.segments
        .iter()
        .map(|s| s.ident.to_string())
        .collect::<Vec<_>>()
        .join("::")
}

fn unary_op(op: &UnOp) -> &'static str {
    match op {
        UnOp::Not(_) => "!",
        UnOp::Neg(_) => "-",
        UnOp::Deref(_) => "*",
        _ => "?",
    }
}

fn binary_op(op: &BinOp) -> &'static str {
    match op {
        BinOp::And(_) => "&&",
        BinOp::Or(_) => "||",
        BinOp::Eq(_) => "==",
        BinOp::Ne(_) => "!=",
        BinOp::Lt(_) => "<",
        BinOp::Le(_) => "<=",
        BinOp::Gt(_) => ">",
        BinOp::Ge(_) => ">=",
        BinOp::Add(_) => "+",
        BinOp::Sub(_) => "-",
        BinOp::Mul(_) => "*",
        BinOp::Div(_) => "/",
        BinOp::Rem(_) => "%",
        BinOp::BitAnd(_) => "&",
        BinOp::BitOr(_) => "|",
        BinOp::BitXor(_) => "^",
        BinOp::Shl(_) => "<<",
        BinOp::Shr(_) => ">>",
        _ => "assignment",
    }
}
