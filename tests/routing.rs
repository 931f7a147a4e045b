//! End-to-end routing behavior through the public API.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use common::{compile, lookup, route, trie_route};
use exproute::routing::{RouteError, Router};

#[test]
fn test_methods_restrict_match() {
    let cases: &[(&str, &[&str], &[&str])] = &[
        (r#"TrieRoute("/hello")"#, &["GET", "POST", "PATCH"], &[]),
        (r#"TrieRoute("GET", "/hello")"#, &["GET", "get"], &["POST"]),
        (r#"TrieRoute("GET", "POST", "/hello")"#, &["GET", "POST"], &["PUT"]),
        (r#"RegexpRoute("/hello$")"#, &["GET", "DELETE"], &[]),
        (r#"RegexpRoute("PUT", "/hello$")"#, &["PUT"], &["GET"]),
    ];
    for (expr, allowed, denied) in cases {
        let node = compile(expr, "loc");
        for m in *allowed {
            assert_eq!(
                lookup(&node, m, "http://example.com/hello").as_deref(),
                Some("loc"),
                "{} {}",
                expr,
                m
            );
        }
        for m in *denied {
            assert_eq!(lookup(&node, m, "http://example.com/hello"), None, "{} {}", expr, m);
        }
    }
}

#[test]
fn test_merged_routes() {
    let router = Router::with_routes([trie_route("/a"), trie_route("/b")]).unwrap();
    assert_eq!(route(&router, "GET", "/a").as_deref(), Some("/a"));
    assert_eq!(route(&router, "GET", "/b").as_deref(), Some("/b"));
    assert_eq!(route(&router, "GET", "/c"), None);

    let router = Router::with_routes([trie_route("/aa"), trie_route("/a")]).unwrap();
    assert_eq!(route(&router, "GET", "/aa").as_deref(), Some("/aa"));
    assert_eq!(route(&router, "GET", "/a").as_deref(), Some("/a"));
}

#[test]
fn test_identical_templates_conflict() {
    let router = Router::new();
    router.merge(compile(r#"TrieRoute("/x/<id>")"#, "first")).unwrap();
    let err = router
        .merge(compile(r#"TrieRoute("/x/<string:id>")"#, "second"))
        .unwrap_err();
    assert!(matches!(err, RouteError::Conflict(_)));
    assert_eq!(route(&router, "GET", "/x/1").as_deref(), Some("first"));
}

#[test]
fn test_parameter_segments() {
    let node = trie_route("/m/<string:p1>/<string:p2>");
    assert!(lookup(&node, "GET", "/m/x/y").is_some());
    assert!(lookup(&node, "GET", "/m/x").is_none());
    assert!(lookup(&node, "GET", "/m/x/y/z").is_none());

    // empty segments are captured as empty values
    let node = trie_route("/m/<a>/<b>");
    assert_eq!(lookup(&node, "GET", "/m//y").as_deref(), Some("/m/<a>/<b>"));
    assert_eq!(lookup(&node, "GET", "/m///"), None);
}

#[test]
fn test_print_tree() {
    let node = trie_route("/m/<string:param1>");
    assert_eq!(
        node.to_string(),
        "root\n node(/)\n  node(m)\n   node(/)\n    leaf(<string:param1>)\n"
    );
}

#[test]
fn test_mixed_route_table() {
    let router = Router::new();
    router.merge(compile(r#"TrieRoute("GET", "/api/users")"#, "users")).unwrap();
    router.merge(compile(r#"RegexpRoute(r"^http://static\.")"#, "static")).unwrap();
    router.merge(compile(r#"TrieRoute("/api/<name>")"#, "api")).unwrap();

    assert_eq!(route(&router, "GET", "http://h/api/users").as_deref(), Some("users"));
    assert_eq!(route(&router, "GET", "http://h/api/orders").as_deref(), Some("api"));
    // static was registered before api, so it wins where both match
    assert_eq!(
        route(&router, "GET", "http://static.h/api/x").as_deref(),
        Some("static")
    );
    assert_eq!(route(&router, "GET", "http://static.h/img.png").as_deref(), Some("static"));
    assert_eq!(route(&router, "GET", "http://h/img.png"), None);
}

#[test]
fn test_concurrent_lookups_see_whole_trees() {
    // Two routes are added and removed together; a reader must never see
    // exactly one of them.
    let router = Arc::new(Router::with_routes([trie_route("/base")]).unwrap());
    let stop = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let router = Arc::clone(&router);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut checks = 0u64;
                while !stop.load(Ordering::Relaxed) {
                    let root = router.snapshot().unwrap();
                    let x = lookup(&root, "GET", "/x").is_some();
                    let y = lookup(&root, "GET", "/y").is_some();
                    assert_eq!(x, y, "torn update observed");
                    assert!(lookup(&root, "GET", "/base").is_some());
                    checks += 1;
                }
                checks
            })
        })
        .collect();

    let pair = || trie_route("/x").merge(&trie_route("/y")).unwrap();
    for _ in 0..500 {
        router.merge(pair()).unwrap();
        router
            .update(|root| {
                let root = exproute::routing::router::remove_from(root, &trie_route("/x"))?;
                exproute::routing::router::remove_from(root.as_ref(), &trie_route("/y"))
            })
            .unwrap();
    }
    stop.store(true, Ordering::Relaxed);

    for r in readers {
        assert!(r.join().unwrap() > 0);
    }
    assert_eq!(route(&router, "GET", "/x"), None);
}

#[test]
fn test_concurrent_mutations_are_serialized() {
    let router = Arc::new(Router::new());
    let writers: Vec<_> = (0..8)
        .map(|i| {
            let router = Arc::clone(&router);
            thread::spawn(move || {
                for j in 0..25 {
                    router.merge(trie_route(&format!("/w{}/{}", i, j))).unwrap();
                }
            })
        })
        .collect();
    for w in writers {
        w.join().unwrap();
    }
    assert_eq!(router.snapshot().unwrap().route_count(), 200);
    assert_eq!(route(&router, "GET", "/w7/24").as_deref(), Some("/w7/24"));
}
