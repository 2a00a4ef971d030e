//! Resource open/close accounting.
//!
//! Provides cheap, thread-safe counters used for leak detection and
//! sampled diagnostic logging. Purely observational: nothing blocks and
//! nothing fails.

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-lifetime open/close counters for one resource kind.
///
/// All counters are atomic and can be read while operations are in
/// progress; mutation is lock-free because trackers are touched from
/// arbitrary caller threads without coordination. Counters are never
/// reset: `opened - closed` after shutdown is the leak count.
#[derive(Debug)]
pub struct ResourceTracker {
    kind: &'static str,
    opened: AtomicU64,
    closed: AtomicU64,
}

impl ResourceTracker {
    /// Creates a tracker for the given resource kind.
    #[must_use]
    pub const fn new(kind: &'static str) -> Self {
        Self {
            kind,
            opened: AtomicU64::new(0),
            closed: AtomicU64::new(0),
        }
    }

    /// Returns the tracked resource kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Records an open event. Returns the new opened count.
    pub fn on_open(&self) -> u64 {
        self.opened.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Records a close event. Returns the new closed count, which callers
    /// use for sampling decisions ("log every Nth close").
    pub fn on_close(&self) -> u64 {
        self.closed.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Returns the total number of open events.
    #[must_use]
    pub fn opened(&self) -> u64 {
        self.opened.load(Ordering::Relaxed)
    }

    /// Returns the total number of close events.
    #[must_use]
    pub fn closed(&self) -> u64 {
        self.closed.load(Ordering::Relaxed)
    }

    /// Returns the number of resources opened but not yet closed.
    #[must_use]
    pub fn leaked(&self) -> u64 {
        self.opened().saturating_sub(self.closed())
    }

    /// Returns a snapshot of the counters.
    #[must_use]
    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            kind: self.kind,
            opened: self.opened(),
            closed: self.closed(),
        }
    }
}

/// A point-in-time snapshot of one tracker's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerSnapshot {
    /// Tracked resource kind.
    pub kind: &'static str,
    /// Total open events.
    pub opened: u64,
    /// Total close events.
    pub closed: u64,
}

impl TrackerSnapshot {
    /// Returns the number of resources opened but not yet closed.
    #[must_use]
    pub fn leaked(&self) -> u64 {
        self.opened.saturating_sub(self.closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tracker_is_zero() {
        let tracker = ResourceTracker::new("session");
        assert_eq!(tracker.opened(), 0);
        assert_eq!(tracker.closed(), 0);
        assert_eq!(tracker.leaked(), 0);
    }

    #[test]
    fn open_close_accounting() {
        let tracker = ResourceTracker::new("session");
        assert_eq!(tracker.on_open(), 1);
        assert_eq!(tracker.on_open(), 2);
        assert_eq!(tracker.leaked(), 2);

        assert_eq!(tracker.on_close(), 1);
        assert_eq!(tracker.leaked(), 1);

        let snap = tracker.snapshot();
        assert_eq!(snap.opened, 2);
        assert_eq!(snap.closed, 1);
        assert_eq!(snap.leaked(), 1);
    }

    #[test]
    fn concurrent_updates() {
        use std::sync::Arc;
        use std::thread;

        let tracker = Arc::new(ResourceTracker::new("result-set"));
        let mut handles = vec![];

        for _ in 0..8 {
            let t = Arc::clone(&tracker);
            handles.push(thread::spawn(move || {
                for _ in 0..500 {
                    t.on_open();
                    t.on_close();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(tracker.opened(), 4000);
        assert_eq!(tracker.closed(), 4000);
        assert_eq!(tracker.leaked(), 0);
    }
}
