//! Proxy instruction bundles.
//!
//! # Data Flow
//! ```text
//! JSON document or [[locations]] table entry
//!     → serde decode (shapes, periods, header values)
//!     → validate (upstream present, URLs, positive rates)
//!     → ProxyInstructions carried by an UpstreamLocation
//! ```
//!
//! The router never reads the bundle; it is returned to whatever layer
//! performs the forwarding.

pub mod headers;
pub mod rate;
pub mod upstream;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use headers::Headers;
pub use rate::{Period, Rate};
pub use upstream::{Failover, Token, Upstream};

/// Errors raised while decoding or validating instructions.
#[derive(Debug, Error)]
pub enum InstructionError {
    #[error("invalid instructions: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected at least one upstream")]
    NoUpstreams,

    #[error("bad upstream url {url}: {message}")]
    BadUrl { url: String, message: String },

    #[error("unsupported period: {0}")]
    UnknownPeriod(String),

    #[error("bad rate: {0}")]
    BadRate(String),

    #[error("token id must not be empty")]
    EmptyTokenId,

    #[error("bad header {name}: {message}")]
    BadHeader { name: String, message: String },

    #[error("invalid failover status code {0}")]
    BadStatusCode(u16),
}

/// Everything the forwarding layer needs once a route matched.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProxyInstructions {
    pub upstreams: Vec<Upstream>,

    #[serde(default)]
    pub tokens: Vec<Token>,

    #[serde(default, skip_serializing_if = "Headers::is_empty")]
    pub headers: Headers,

    #[serde(default)]
    pub failover: Option<Failover>,
}

impl ProxyInstructions {
    /// A bundle forwarding to `upstreams` with no limits or extras.
    pub fn new(upstreams: Vec<Upstream>) -> Result<Self, InstructionError> {
        let instructions = Self {
            upstreams,
            tokens: Vec::new(),
            headers: Headers::default(),
            failover: None,
        };
        instructions.validate()?;
        Ok(instructions)
    }

    /// Decode and validate a JSON encoded bundle.
    pub fn from_json(bytes: &[u8]) -> Result<Self, InstructionError> {
        let instructions: ProxyInstructions = serde_json::from_slice(bytes)?;
        instructions.validate()?;
        Ok(instructions)
    }

    pub fn validate(&self) -> Result<(), InstructionError> {
        if self.upstreams.is_empty() {
            return Err(InstructionError::NoUpstreams);
        }
        self.upstreams.iter().try_for_each(Upstream::validate)?;
        self.tokens.iter().try_for_each(Token::validate)?;
        self.headers.validate()?;
        self.failover.as_ref().map_or(Ok(()), Failover::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_full() {
        let json = br#"{
            "upstreams": [
                {"url": "http://localhost:5000", "rates": [{"value": 10, "period": "Second"}]},
                {"url": "https://backup.internal", "headers": {"X-Backup": "1"}}
            ],
            "tokens": [{"id": "account-1", "rates": [{"increment": 2, "value": 100, "period": "minute"}]}],
            "headers": {"X-Forwarded-By": ["exproute", "edge"]},
            "failover": {"active": true, "codes": [502]}
        }"#;
        let i = ProxyInstructions::from_json(json).unwrap();
        assert_eq!(i.upstreams.len(), 2);
        assert_eq!(i.upstreams[0].rates[0].period, Period::Second);
        assert_eq!(i.tokens[0].rates[0].increment, 2);
        assert_eq!(i.headers.get("x-forwarded-by").map(<[String]>::len), Some(2));
        assert!(i.failover.unwrap().should_failover(502));
    }

    #[test]
    fn test_from_json_minimal() {
        let i = ProxyInstructions::from_json(br#"{"upstreams": [{"url": "http://a:1"}]}"#).unwrap();
        assert!(i.tokens.is_empty());
        assert!(i.failover.is_none());
    }

    #[test]
    fn test_from_json_errors() {
        let cases: &[&[u8]] = &[
            b"[]",
            b"{}",
            br#"{"upstreams": []}"#,
            br#"{"upstreams": "http://a"}"#,
            br#"{"upstreams": [{"url": "::"}]}"#,
            br#"{"upstreams": [{"url": "http://a", "rates": [{"value": 1, "period": "day"}]}]}"#,
            br#"{"upstreams": [{"url": "http://a", "rates": [{"value": 0, "period": "hour"}]}]}"#,
            br#"{"upstreams": [{"url": "http://a"}], "tokens": [{"id": ""}]}"#,
            br#"{"upstreams": [{"url": "http://a"}], "headers": {"X": 1}}"#,
        ];
        for json in cases {
            assert!(
                ProxyInstructions::from_json(json).is_err(),
                "{} should fail",
                String::from_utf8_lossy(json)
            );
        }
        assert!(matches!(
            ProxyInstructions::from_json(br#"{"upstreams": []}"#),
            Err(InstructionError::NoUpstreams)
        ));
    }

    #[test]
    fn test_json_round_trip_shape() {
        let i = ProxyInstructions::new(vec![Upstream::parse("http://a:1").unwrap()]).unwrap();
        let value = serde_json::to_value(&i).unwrap();
        assert_eq!(value["upstreams"][0]["url"], "http://a:1/");
        assert!(value.get("headers").is_none());
    }
}
