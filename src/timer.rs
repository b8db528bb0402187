//! Cancellable timers driven by an explicit clock.
//!
//! The session never spawns background tasks for its timeouts; everything
//! that would be a `setTimeout` in a browser player is a deadline on this
//! wheel, fired by the owner calling [`TimerWheel::due`] with the current
//! time. Cancellation is a handle, not a flag buried in a closure.

/// Handle for one scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

struct Entry<K> {
    id: TimerId,
    deadline_ms: u64,
    kind: K,
}

/// Deadline queue keyed by a caller-defined timer kind.
pub struct TimerWheel<K> {
    entries: Vec<Entry<K>>,
    next_id: u64,
}

impl<K> Default for TimerWheel<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> TimerWheel<K> {
    pub fn new() -> Self {
        TimerWheel {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    pub fn schedule(&mut self, now_ms: u64, delay_ms: u64, kind: K) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            deadline_ms: now_ms.saturating_add(delay_ms),
            kind,
        });
        id
    }

    /// Removes the timer if it is still pending. Cancelling an already-fired
    /// or unknown id is a no-op.
    pub fn cancel(&mut self, id: TimerId) {
        self.entries.retain(|e| e.id != id);
    }

    /// Drains and returns every timer whose deadline has passed, in deadline
    /// order (ties in scheduling order).
    pub fn due(&mut self, now_ms: u64) -> Vec<K> {
        let mut fired: Vec<(u64, u64, K)> = Vec::new();
        let mut remaining = Vec::new();
        for e in self.entries.drain(..) {
            if e.deadline_ms <= now_ms {
                fired.push((e.deadline_ms, e.id.0, e.kind));
            } else {
                remaining.push(e);
            }
        }
        self.entries = remaining;
        fired.sort_by_key(|(deadline, id, _)| (*deadline, *id));
        fired.into_iter().map(|(_, _, k)| k).collect()
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
