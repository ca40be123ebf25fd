#![forbid(unsafe_code)]

//! One-shot deferred callbacks for hold detection.
//!
//! [`TimerQueue`] is host-agnostic: it never sleeps or spawns. The host
//! feeds it the current time and receives the payloads of timers whose
//! deadline has passed, in deadline order (ties fire in arm order). The
//! payload is the "callback": the recognizer stores which surface and which
//! gesture generation armed the timer, and decides what firing means.
//!
//! # Invariants
//!
//! 1. A token fires at most once.
//! 2. `cancel` is idempotent; cancelling a fired or unknown token is a no-op.
//! 3. A cancelled token never fires.

use std::collections::BTreeMap;

use ahash::AHashMap;
use web_time::{Duration, Instant};

/// Handle to an armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(u64);

/// Deadline-ordered queue of one-shot timers carrying a payload of type `T`.
#[derive(Debug, Clone)]
pub struct TimerQueue<T> {
    by_deadline: BTreeMap<(Instant, u64), T>,
    deadlines: AHashMap<u64, Instant>,
    next_seq: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_deadline: BTreeMap::new(),
            deadlines: AHashMap::new(),
            next_seq: 0,
        }
    }

    /// Schedule `payload` to fire `delay` after `now`.
    ///
    /// Returns `None` without queueing anything when the deadline is beyond
    /// what `Instant` can represent; such a timer could never fire.
    pub fn arm(&mut self, now: Instant, delay: Duration, payload: T) -> Option<TimerToken> {
        let deadline = now.checked_add(delay)?;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.by_deadline.insert((deadline, seq), payload);
        self.deadlines.insert(seq, deadline);
        Some(TimerToken(seq))
    }

    /// Cancel a pending timer, returning its payload if it had not fired yet.
    pub fn cancel(&mut self, token: TimerToken) -> Option<T> {
        let deadline = self.deadlines.remove(&token.0)?;
        self.by_deadline.remove(&(deadline, token.0))
    }

    /// Earliest pending deadline, if any. Hosts schedule their wakeup here.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.by_deadline.keys().next().map(|&(deadline, _)| deadline)
    }

    /// Remove and return every timer with `deadline <= now`.
    pub fn expire(&mut self, now: Instant) -> Vec<(TimerToken, T)> {
        let mut fired = Vec::new();
        while let Some(entry) = self.by_deadline.first_entry() {
            if entry.key().0 > now {
                break;
            }
            let ((_, seq), payload) = entry.remove_entry();
            self.deadlines.remove(&seq);
            fired.push((TimerToken(seq), payload));
        }
        fired
    }

    /// Number of pending timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MS_100: Duration = Duration::from_millis(100);
    const MS_250: Duration = Duration::from_millis(250);

    #[test]
    fn fires_only_after_deadline() {
        let mut q = TimerQueue::new();
        let t = Instant::now();
        let token = q.arm(t, MS_250, "hold").unwrap();

        assert!(q.expire(t + MS_100).is_empty());
        assert_eq!(q.len(), 1);

        let fired = q.expire(t + MS_250);
        assert_eq!(fired, vec![(token, "hold")]);
        assert!(q.is_empty());
    }

    #[test]
    fn fires_in_deadline_then_arm_order() {
        let mut q = TimerQueue::new();
        let t = Instant::now();
        let late = q.arm(t, MS_250, 'c').unwrap();
        let early = q.arm(t, MS_100, 'a').unwrap();
        let tie = q.arm(t, MS_100, 'b').unwrap();

        let fired: Vec<_> = q.expire(t + MS_250).into_iter().collect();
        assert_eq!(fired, vec![(early, 'a'), (tie, 'b'), (late, 'c')]);
    }

    #[test]
    fn cancel_is_idempotent_and_prevents_firing() {
        let mut q = TimerQueue::new();
        let t = Instant::now();
        let token = q.arm(t, MS_100, 1u32).unwrap();

        assert_eq!(q.cancel(token), Some(1));
        assert_eq!(q.cancel(token), None);
        assert!(q.expire(t + MS_250).is_empty());
    }

    #[test]
    fn cancel_after_fire_is_noop() {
        let mut q = TimerQueue::new();
        let t = Instant::now();
        let token = q.arm(t, MS_100, ()).unwrap();
        assert_eq!(q.expire(t + MS_100).len(), 1);
        assert_eq!(q.cancel(token), None);
    }

    #[test]
    fn next_deadline_tracks_earliest_pending() {
        let mut q = TimerQueue::new();
        let t = Instant::now();
        assert_eq!(q.next_deadline(), None);

        let first = q.arm(t, MS_100, ()).unwrap();
        q.arm(t, MS_250, ());
        assert_eq!(q.next_deadline(), Some(t + MS_100));

        q.cancel(first);
        assert_eq!(q.next_deadline(), Some(t + MS_250));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn unrepresentable_deadline_is_never_queued() {
        let mut q = TimerQueue::new();
        let t = Instant::now();

        assert_eq!(q.arm(t, Duration::MAX, ()), None);
        assert!(q.is_empty());
        assert_eq!(q.next_deadline(), None);

        // The queue stays usable afterwards.
        let token = q.arm(t, MS_100, ()).unwrap();
        assert_eq!(q.expire(t + MS_100), vec![(token, ())]);
    }
}
