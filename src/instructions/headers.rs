//! Extra request headers forwarded with an upstream request.

use std::collections::BTreeMap;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::instructions::InstructionError;

/// Header name to values. Names keep the spelling used in the source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "BTreeMap<String, OneOrMany>")]
pub struct Headers(BTreeMap<String, Vec<String>>);

/// A header accepts `"v"` or `["v1", "v2"]`.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<BTreeMap<String, OneOrMany>> for Headers {
    fn from(map: BTreeMap<String, OneOrMany>) -> Self {
        let map = map
            .into_iter()
            .map(|(name, values)| {
                let values = match values {
                    OneOrMany::One(v) => vec![v],
                    OneOrMany::Many(vs) => vs,
                };
                (name, values)
            })
            .collect();
        Headers(map)
    }
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.entry(name.into()).or_default().push(value.into());
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Check every name and value is legal on the wire.
    pub fn validate(&self) -> Result<(), InstructionError> {
        self.to_header_map().map(|_| ())
    }

    pub fn to_header_map(&self) -> Result<HeaderMap, InstructionError> {
        let mut map = HeaderMap::new();
        for (name, values) in &self.0 {
            let header = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                InstructionError::BadHeader {
                    name: name.clone(),
                    message: e.to_string(),
                }
            })?;
            for value in values {
                let value = HeaderValue::from_str(value).map_err(|e| InstructionError::BadHeader {
                    name: name.clone(),
                    message: e.to_string(),
                })?;
                map.append(header.clone(), value);
            }
        }
        Ok(map)
    }
}
