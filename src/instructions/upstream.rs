//! Upstreams, rate limiting tokens and failover policy.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::instructions::headers::Headers;
use crate::instructions::rate::Rate;
use crate::instructions::InstructionError;

/// A backend a matched request may be forwarded to.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Upstream {
    pub url: Url,

    #[serde(default)]
    pub rates: Vec<Rate>,

    #[serde(default, skip_serializing_if = "Headers::is_empty")]
    pub headers: Headers,
}

impl Upstream {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            rates: Vec::new(),
            headers: Headers::default(),
        }
    }

    pub fn parse(url: &str) -> Result<Self, InstructionError> {
        let parsed = Url::parse(url).map_err(|e| InstructionError::BadUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        let upstream = Self::new(parsed);
        upstream.validate()?;
        Ok(upstream)
    }

    pub fn validate(&self) -> Result<(), InstructionError> {
        if !matches!(self.url.scheme(), "http" | "https") || self.url.host().is_none() {
            return Err(InstructionError::BadUrl {
                url: self.url.to_string(),
                message: "expected an http or https URL with a host".to_string(),
            });
        }
        self.rates.iter().try_for_each(Rate::validate)?;
        self.headers.validate()
    }
}

/// A rate limiting key shared by requests, e.g. an account id.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Token {
    pub id: String,

    #[serde(default)]
    pub rates: Vec<Rate>,
}

impl Token {
    pub fn validate(&self) -> Result<(), InstructionError> {
        if self.id.is_empty() {
            return Err(InstructionError::EmptyTokenId);
        }
        self.rates.iter().try_for_each(Rate::validate)
    }
}

/// Retry the next upstream when one answers with any of `codes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Failover {
    pub active: bool,
    pub codes: Vec<u16>,
}

impl Failover {
    pub fn validate(&self) -> Result<(), InstructionError> {
        match self.codes.iter().find(|c| !(100..=599).contains(*c)) {
            Some(code) => Err(InstructionError::BadStatusCode(*code)),
            None => Ok(()),
        }
    }

    /// Whether a response with `status` should be retried elsewhere.
    pub fn should_failover(&self, status: u16) -> bool {
        self.active && self.codes.contains(&status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_parse() {
        let u = Upstream::parse("http://10.0.0.1:5000").unwrap();
        assert_eq!(u.url.port(), Some(5000));
        assert!(Upstream::parse("not a url").is_err());
        assert!(Upstream::parse("ftp://host/file").is_err());
    }

    #[test]
    fn test_failover() {
        let f = Failover {
            active: true,
            codes: vec![502, 503],
        };
        assert!(f.should_failover(503));
        assert!(!f.should_failover(500));
        assert!(!Failover::default().should_failover(503));

        let bad = Failover {
            active: true,
            codes: vec![700],
        };
        assert!(matches!(bad.validate(), Err(InstructionError::BadStatusCode(700))));
    }
}
