//! Per-key in-progress tokens.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// Set of keys with an operation in progress.
///
/// Checking and claiming a key is one atomic step. The key is released when
/// the returned guard drops, whichever way the operation ends.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`, or `None` if it is already claimed.
    pub fn try_acquire(&self, key: &str) -> Option<InFlightGuard> {
        if !lock(&self.keys).insert(key.to_string()) {
            return None;
        }
        Some(InFlightGuard {
            keys: Arc::clone(&self.keys),
            key: key.to_string(),
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        lock(&self.keys).contains(key)
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.keys).is_empty()
    }
}

/// Releases its key on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    keys: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.keys).remove(&self.key);
    }
}

fn lock(keys: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    keys.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_rejected() {
        let inflight = InFlight::new();
        let guard = inflight.try_acquire("+15551230000");
        assert!(guard.is_some());
        assert!(inflight.try_acquire("+15551230000").is_none());
        assert!(inflight.try_acquire("+15551230001").is_some());
    }

    #[test]
    fn test_released_on_drop() {
        let inflight = InFlight::new();
        {
            let _guard = inflight.try_acquire("s1");
            assert!(inflight.contains("s1"));
        }
        assert!(!inflight.contains("s1"));
        assert!(inflight.is_empty());
    }

    #[test]
    fn test_clones_share_keys() {
        let inflight = InFlight::new();
        let other = inflight.clone();
        let _guard = inflight.try_acquire("t1");
        assert!(other.contains("t1"));
    }
}
