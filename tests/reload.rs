//! Route file loading and table reloads.

mod common;

use std::io::Write;

use common::request;
use exproute::config::{load_config, parse_config, ConfigError};
use exproute::routing::{Location, RouteTable};

const ROUTES_V1: &str = r#"
[observability]
log_level = "debug"

[[locations]]
id = "users"
route = 'TrieRoute("GET", "/users/<id>")'

[[locations.upstreams]]
url = "http://10.0.0.1:5000"
rates = [{ value = 100, period = "minute" }]

[[locations]]
id = "assets"
route = 'RegexpRoute(r"\.(css|js)$")'
upstreams = [{ url = "http://10.0.0.2:80" }]
"#;

const ROUTES_V2: &str = r#"
[[locations]]
id = "users"
route = 'TrieRoute("GET", "POST", "/users/<id>")'
upstreams = [{ url = "http://10.0.0.1:5000" }]

[[locations]]
id = "orders"
route = 'TrieRoute("/orders")'
upstreams = [{ url = "http://10.0.0.3:80" }]
failover = { active = true, codes = [502, 503] }
"#;

fn routed(table: &RouteTable, method: &str, url: &str) -> Option<String> {
    table.route(&request(method, url)).map(|l| l.id().to_string())
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(ROUTES_V1.as_bytes()).unwrap();

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.observability.log_level, "debug");
    assert_eq!(config.locations.len(), 2);

    let table = RouteTable::from_config(&config).unwrap();
    assert_eq!(routed(&table, "GET", "/users/42").as_deref(), Some("users"));
    assert_eq!(routed(&table, "GET", "http://cdn/app.js").as_deref(), Some("assets"));
    assert_eq!(routed(&table, "DELETE", "/users/42"), None);

    let users = table.instructions("users").unwrap();
    assert_eq!(users.upstreams[0].rates[0].value, 100);
}

#[test]
fn test_reload_applies_differences() {
    let table = RouteTable::from_config(&parse_config(ROUTES_V1).unwrap()).unwrap();
    let summary = table.apply(&parse_config(ROUTES_V2).unwrap()).unwrap();

    assert_eq!(summary.added, ["orders"]);
    assert_eq!(summary.updated, ["users"]);
    assert_eq!(summary.removed, ["assets"]);
    assert!(summary.rebuilt, "regexp routes are removed by rebuilding");

    assert_eq!(routed(&table, "POST", "/users/1").as_deref(), Some("users"));
    assert_eq!(routed(&table, "GET", "/orders").as_deref(), Some("orders"));
    assert_eq!(routed(&table, "GET", "/app.js"), None);

    let orders = table.route(&request("GET", "/orders")).unwrap();
    let failover = orders.instructions().unwrap().failover.clone().unwrap();
    assert!(failover.should_failover(502));
}

#[test]
fn test_invalid_file_is_rejected() {
    let conflicting = format!(
        "{}\n[[locations]]\nid = \"dup\"\nroute = 'TrieRoute(\"/orders\")'\nupstreams = [{{ url = \"http://x:1\" }}]\n",
        ROUTES_V2
    );
    match parse_config(&conflicting) {
        Err(ConfigError::Validation(errors)) => {
            assert_eq!(errors.len(), 1);
            assert!(errors[0].to_string().starts_with("location dup:"));
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}
