//! Keyed debounce timers driven by an injected clock.
//!
//! Nothing here sleeps or spawns: the owner passes `now` on every call and
//! asks which keys have gone quiet via [`Debouncer::due`]. That keeps commit
//! timing deterministic under test and lets a host drive the timers from
//! whatever event loop it already has.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Identifies one scheduled timer. A handle goes stale as soon as its key is
/// rescheduled, cancelled or fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone)]
struct Timer {
    handle: TimerHandle,
    deadline: Instant,
}

#[derive(Debug, Clone)]
pub struct Debouncer<K: Ord + Clone> {
    window: Duration,
    timers: BTreeMap<K, Timer>,
    next_handle: u64,
}

impl<K: Ord + Clone> Debouncer<K> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            timers: BTreeMap::new(),
            next_handle: 0,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Start (or restart) the quiet window for `key`. Any earlier timer for
    /// the same key is cancelled.
    pub fn schedule(&mut self, key: K, now: Instant) -> TimerHandle {
        self.next_handle += 1;
        let handle = TimerHandle(self.next_handle);
        self.timers.insert(
            key,
            Timer {
                handle,
                deadline: now + self.window,
            },
        );
        handle
    }

    pub fn cancel(&mut self, key: &K) -> Option<TimerHandle> {
        self.timers.remove(key).map(|t| t.handle)
    }

    /// Cancel by handle. Returns false if the handle is stale.
    pub fn cancel_handle(&mut self, handle: TimerHandle) -> bool {
        let key = self
            .timers
            .iter()
            .find(|(_, t)| t.handle == handle)
            .map(|(k, _)| k.clone());
        match key {
            Some(k) => self.timers.remove(&k).is_some(),
            None => false,
        }
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.timers.contains_key(key)
    }

    pub fn deadline(&self, key: &K) -> Option<Instant> {
        self.timers.get(key).map(|t| t.deadline)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().map(|t| t.deadline).min()
    }

    /// Remove and return every key whose deadline is at or before `now`,
    /// earliest deadline first.
    pub fn due(&mut self, now: Instant) -> Vec<(K, Instant)> {
        let mut fired: Vec<(K, Instant)> = self
            .timers
            .iter()
            .filter(|(_, t)| t.deadline <= now)
            .map(|(k, t)| (k.clone(), t.deadline))
            .collect();
        for (k, _) in &fired {
            self.timers.remove(k);
        }
        fired.sort_by_key(|(_, deadline)| *deadline);
        fired
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.timers.keys()
    }

    /// Drop every outstanding timer.
    pub fn clear(&mut self) {
        self.timers.clear();
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}
