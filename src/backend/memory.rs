//! In-process rate counters.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use crate::backend::{unix_secs, window_key, Backend, BackendError, TimeProvider};

/// Upper bound on expired windows dropped per update.
pub const MAX_EXPIRED_PER_UPDATE: usize = 100;

#[derive(Default)]
struct Counters {
    hits: HashMap<String, u64>,
    /// (expires at, window key), earliest first.
    expiry: BinaryHeap<Reverse<(u64, String)>>,
}

/// Counters kept in a hash map; windows are dropped lazily on update.
pub struct MemoryBackend {
    counters: Mutex<Counters>,
    clock: Arc<dyn TimeProvider>,
}

impl MemoryBackend {
    pub fn new(clock: Arc<dyn TimeProvider>) -> Self {
        Self {
            counters: Mutex::new(Counters::default()),
            clock,
        }
    }

    /// Number of live windows.
    pub fn len(&self) -> usize {
        self.lock().hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Counters {
    fn delete_expired(&mut self, now: u64) {
        for _ in 0..MAX_EXPIRED_PER_UPDATE {
            match self.expiry.peek() {
                Some(Reverse((at, _))) if *at <= now => {}
                _ => break,
            }
            if let Some(Reverse((at, key))) = self.expiry.pop() {
                tracing::debug!(key = %key, expired_at = at, now, "Rate window expired");
                self.hits.remove(&key);
            }
        }
    }
}

impl Backend for MemoryBackend {
    fn get_count(&self, key: &str, period: Duration) -> Result<u64, BackendError> {
        let window = window_key(self.utc_now(), key, period)?;
        Ok(self.lock().hits.get(&window).copied().unwrap_or(0))
    }

    fn update_count(
        &self,
        key: &str,
        period: Duration,
        increment: u64,
    ) -> Result<(), BackendError> {
        let now = self.utc_now();
        let window = window_key(now, key, period)?;
        let now = unix_secs(now)?;

        let mut counters = self.lock();
        counters.delete_expired(now);
        counters
            .expiry
            .push(Reverse((now.saturating_add(period.as_secs()), window.clone())));
        let hits = counters.hits.entry(window).or_insert(0);
        *hits = hits.saturating_add(increment);
        Ok(())
    }

    fn utc_now(&self) -> SystemTime {
        self.clock.utc_now()
    }
}

impl fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("windows", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ManualClock;

    fn setup(start: u64) -> (Arc<ManualClock>, MemoryBackend) {
        let clock = Arc::new(ManualClock::at_unix(start));
        let backend = MemoryBackend::new(clock.clone());
        (clock, backend)
    }

    #[test]
    fn test_get_set() {
        let (_, b) = setup(1_000);
        let minute = Duration::from_secs(60);
        assert_eq!(b.get_count("key", minute).unwrap(), 0);
        b.update_count("key", minute, 2).unwrap();
        b.update_count("key", minute, 3).unwrap();
        assert_eq!(b.get_count("key", minute).unwrap(), 5);
        assert_eq!(b.get_count("other", minute).unwrap(), 0);
    }

    #[test]
    fn test_counts_saturate() {
        let (_, b) = setup(1_000);
        let minute = Duration::from_secs(60);
        b.update_count("key", minute, u64::MAX).unwrap();
        b.update_count("key", minute, 1).unwrap();
        assert_eq!(b.get_count("key", minute).unwrap(), u64::MAX);
    }

    #[test]
    fn test_windows_are_separate() {
        let (clock, b) = setup(1_020);
        let minute = Duration::from_secs(60);
        b.update_count("key", minute, 1).unwrap();
        clock.advance(Duration::from_secs(60));
        assert_eq!(b.get_count("key", minute).unwrap(), 0);
    }

    #[test]
    fn test_expired_windows_are_dropped() {
        let (clock, b) = setup(1_000);
        let second = Duration::from_secs(1);
        b.update_count("a", second, 1).unwrap();
        b.update_count("b", second, 1).unwrap();
        assert_eq!(b.len(), 2);

        clock.advance(Duration::from_secs(5));
        b.update_count("c", second, 1).unwrap();
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_expiry_is_bounded_per_update() {
        let (clock, b) = setup(1_000);
        let second = Duration::from_secs(1);
        for i in 0..(MAX_EXPIRED_PER_UPDATE + 20) {
            b.update_count(&format!("k{}", i), second, 1).unwrap();
        }
        clock.advance(Duration::from_secs(10));
        b.update_count("fresh", second, 1).unwrap();
        assert_eq!(b.len(), 20 + 1);
        b.update_count("fresh", second, 1).unwrap();
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_zero_period() {
        let (_, b) = setup(1_000);
        assert_eq!(
            b.update_count("k", Duration::ZERO, 1),
            Err(BackendError::ZeroPeriod)
        );
    }
}
