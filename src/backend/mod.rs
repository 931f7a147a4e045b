//! Rate counter storage.
//!
//! # Responsibilities
//! - Count hits per key inside fixed time windows
//! - Expire windows that can no longer be read
//! - Decide whether a request still fits its rates
//!
//! # Design Decisions
//! - Windows are aligned to the epoch: a key's window for a one minute
//!   period starts at a whole minute
//! - Time is read through `TimeProvider` so expiry is testable
//! - Counters are approximate across windows; a burst at a window edge can
//!   see up to twice the configured value

pub mod memory;

use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::instructions::Rate;

pub use memory::MemoryBackend;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("counting period must be at least one second")]
    ZeroPeriod,

    #[error("clock is before the unix epoch")]
    ClockBeforeEpoch,
}

/// Source of the current time.
pub trait TimeProvider: Send + Sync {
    fn utc_now(&self) -> SystemTime;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeProvider for SystemClock {
    fn utc_now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<SystemTime>,
}

impl ManualClock {
    pub fn new(now: SystemTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// A clock frozen `secs` seconds after the epoch.
    pub fn at_unix(secs: u64) -> Self {
        Self::new(UNIX_EPOCH + Duration::from_secs(secs))
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn set(&self, to: SystemTime) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl TimeProvider for ManualClock {
    fn utc_now(&self) -> SystemTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Hit counter storage.
pub trait Backend: Send + Sync {
    /// Hits recorded for `key` in the current window of `period`.
    fn get_count(&self, key: &str, period: Duration) -> Result<u64, BackendError>;

    /// Add `increment` hits for `key` in the current window of `period`.
    fn update_count(&self, key: &str, period: Duration, increment: u64)
        -> Result<(), BackendError>;

    fn utc_now(&self) -> SystemTime;
}

/// Storage key of the window containing `now`: `{key}_{period}_{start}`,
/// all in whole seconds.
pub fn window_key(now: SystemTime, key: &str, period: Duration) -> Result<String, BackendError> {
    let secs = unix_secs(now)?;
    let period = period.as_secs();
    if period == 0 {
        return Err(BackendError::ZeroPeriod);
    }
    Ok(format!("{}_{}_{}", key, period, secs - secs % period))
}

pub(crate) fn unix_secs(t: SystemTime) -> Result<u64, BackendError> {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| BackendError::ClockBeforeEpoch)
}

/// Count a request against every rate of `key`.
///
/// Returns `false` without recording anything if any rate is already
/// exhausted; otherwise records the hit for all rates.
pub fn consume(backend: &dyn Backend, key: &str, rates: &[Rate]) -> Result<bool, BackendError> {
    for rate in rates {
        let count = backend.get_count(key, rate.period.duration())?;
        // a sum past u64::MAX is over any limit
        if count.checked_add(rate.increment).map_or(true, |n| n > rate.value) {
            tracing::warn!(key = %key, rate = %rate, count, "Rate limit exceeded");
            return Ok(false);
        }
    }
    for rate in rates {
        backend.update_count(key, rate.period.duration(), rate.increment)?;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instructions::Period;
    use std::sync::Arc;

    #[test]
    fn test_window_key() {
        let now = UNIX_EPOCH + Duration::from_secs(125);
        assert_eq!(window_key(now, "k", Duration::from_secs(60)).unwrap(), "k_60_120");
        assert_eq!(window_key(now, "k", Duration::from_secs(1)).unwrap(), "k_1_125");
        assert_eq!(
            window_key(now, "k", Duration::from_millis(500)),
            Err(BackendError::ZeroPeriod)
        );
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::at_unix(10);
        clock.advance(Duration::from_secs(5));
        assert_eq!(unix_secs(clock.utc_now()).unwrap(), 15);
    }

    #[test]
    fn test_consume() {
        let clock = Arc::new(ManualClock::at_unix(1_000));
        let backend = MemoryBackend::new(clock.clone());
        let rates = [Rate::new(1, 2, Period::Second).unwrap()];

        assert!(consume(&backend, "acct", &rates).unwrap());
        assert!(consume(&backend, "acct", &rates).unwrap());
        assert!(!consume(&backend, "acct", &rates).unwrap());
        assert_eq!(backend.get_count("acct", Duration::from_secs(1)).unwrap(), 2);

        clock.advance(Duration::from_secs(1));
        assert!(consume(&backend, "acct", &rates).unwrap());
    }

    #[test]
    fn test_consume_checks_all_rates_first() {
        let backend = MemoryBackend::new(Arc::new(ManualClock::at_unix(60)));
        let rates = [
            Rate::new(1, 10, Period::Second).unwrap(),
            Rate::new(1, 1, Period::Minute).unwrap(),
        ];
        assert!(consume(&backend, "k", &rates).unwrap());
        assert!(!consume(&backend, "k", &rates).unwrap());
        // the per-second window was not charged by the rejected request
        assert_eq!(backend.get_count("k", Duration::from_secs(1)).unwrap(), 1);
    }

    #[test]
    fn test_consume_with_extreme_increment() {
        let backend = MemoryBackend::new(Arc::new(ManualClock::at_unix(60)));
        let rates = [Rate::new(u64::MAX, u64::MAX, Period::Minute).unwrap()];
        assert!(consume(&backend, "k", &rates).unwrap());
        assert!(!consume(&backend, "k", &rates).unwrap());
        assert_eq!(
            backend.get_count("k", Duration::from_secs(60)).unwrap(),
            u64::MAX
        );
    }
}
