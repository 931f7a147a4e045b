//! Rate definitions attached to upstreams and tokens.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::instructions::InstructionError;

/// Length of a counting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum Period {
    Second,
    Minute,
    Hour,
}

impl Period {
    pub fn duration(self) -> Duration {
        match self {
            Period::Second => Duration::from_secs(1),
            Period::Minute => Duration::from_secs(60),
            Period::Hour => Duration::from_secs(3600),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Period::Second => "second",
            Period::Minute => "minute",
            Period::Hour => "hour",
        }
    }
}

impl FromStr for Period {
    type Err = InstructionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "second" => Ok(Period::Second),
            "minute" => Ok(Period::Minute),
            "hour" => Ok(Period::Hour),
            _ => Err(InstructionError::UnknownPeriod(s.to_string())),
        }
    }
}

impl TryFrom<String> for Period {
    type Error = InstructionError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Period> for String {
    fn from(p: Period) -> Self {
        p.as_str().to_string()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Allow `value` hits per `period`, each request counting `increment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Rate {
    #[serde(default = "default_increment")]
    pub increment: u64,
    pub value: u64,
    pub period: Period,
}

fn default_increment() -> u64 {
    1
}

impl Rate {
    pub fn new(increment: u64, value: u64, period: Period) -> Result<Self, InstructionError> {
        let rate = Self {
            increment,
            value,
            period,
        };
        rate.validate()?;
        Ok(rate)
    }

    pub fn validate(&self) -> Result<(), InstructionError> {
        if self.increment == 0 || self.value == 0 {
            return Err(InstructionError::BadRate(format!(
                "increment and value must be positive, got {}/{}",
                self.increment, self.value
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} per {} (+{})", self.value, self.period, self.increment)
    }
}
