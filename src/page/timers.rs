//! Epoch-tokened timer scheduling.
//!
//! Every timer tied to a page lifetime carries the epoch current when it was
//! scheduled. Teardown bumps the epoch; a timer from an older epoch is
//! discarded instead of fired.

use std::collections::BTreeMap;

use tokio::time::Instant;

use crate::dom::NodeId;

/// What a timer does when it fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerKind {
    /// Poll for content markers while scanning.
    ScanPoll { attempt: u32 },
    /// Re-run resolution for a container that missed.
    Retry { container: NodeId, remaining: u32 },
    /// Trailing edge of the coalesced re-injection window.
    Reinject,
    /// Re-enter scanning after a route change.
    RouteReenter,
    /// Compare the current location with the last seen one.
    LocationPoll,
}

/// A scheduled timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timer {
    pub kind: TimerKind,
    /// `None` for timers that outlive teardown (location polling).
    pub epoch: Option<u64>,
}

/// Ordered set of pending timers keyed by deadline.
#[derive(Debug, Default)]
pub struct Scheduler {
    timers: BTreeMap<(Instant, u64), Timer>,
    seq: u64,
    epoch: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Invalidate every epoch-bound timer and drop them from the queue.
    pub fn bump_epoch(&mut self) -> u64 {
        self.epoch += 1;
        let current = self.epoch;
        self.timers
            .retain(|_, t| t.epoch.map(|e| e == current).unwrap_or(true));
        current
    }

    /// Schedule a timer bound to the current epoch.
    pub fn schedule(&mut self, at: Instant, kind: TimerKind) {
        let epoch = Some(self.epoch);
        self.insert(at, Timer { kind, epoch });
    }

    /// Schedule a timer that survives teardown.
    pub fn schedule_unbound(&mut self, at: Instant, kind: TimerKind) {
        self.insert(at, Timer { kind, epoch: None });
    }

    /// Schedule a timer, replacing any pending timer of the same kind.
    pub fn reschedule(&mut self, at: Instant, kind: TimerKind) {
        self.timers.retain(|_, t| t.kind != kind);
        self.schedule(at, kind);
    }

    pub fn is_pending(&self, kind: &TimerKind) -> bool {
        self.timers.values().any(|t| &t.kind == kind)
    }

    pub fn any_pending(&self, pred: impl Fn(&TimerKind) -> bool) -> bool {
        self.timers.values().any(|t| pred(&t.kind))
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.keys().next().map(|(at, _)| *at)
    }

    /// Remove and return the earliest timer due at `now` that is still current,
    /// with its deadline.
    ///
    /// Timers from an older epoch are dropped silently.
    pub fn pop_due(&mut self, now: Instant) -> Option<(Instant, TimerKind)> {
        loop {
            let key = *self.timers.keys().next()?;
            if key.0 > now {
                return None;
            }
            let timer = self.timers.remove(&key)?;
            match timer.epoch {
                Some(epoch) if epoch != self.epoch => {
                    tracing::debug!("Dropping stale timer {:?} from epoch {}", timer.kind, epoch);
                }
                _ => return Some((key.0, timer.kind)),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    fn insert(&mut self, at: Instant, timer: Timer) {
        self.seq += 1;
        self.timers.insert((at, self.seq), timer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_pop_due_in_deadline_order() {
        let now = Instant::now();
        let mut s = Scheduler::new();
        s.schedule(now + Duration::from_secs(2), TimerKind::Reinject);
        s.schedule(now + Duration::from_secs(1), TimerKind::RouteReenter);

        assert_eq!(s.pop_due(now), None);
        assert_eq!(s.next_deadline(), Some(now + Duration::from_secs(1)));
        assert_eq!(
            s.pop_due(now + Duration::from_secs(5)),
            Some((now + Duration::from_secs(1), TimerKind::RouteReenter))
        );
        assert_eq!(
            s.pop_due(now + Duration::from_secs(5)),
            Some((now + Duration::from_secs(2), TimerKind::Reinject))
        );
        assert!(s.is_empty());
    }

    #[test]
    fn test_bump_epoch_drops_bound_timers_only() {
        let now = Instant::now();
        let mut s = Scheduler::new();
        s.schedule(now, TimerKind::Reinject);
        s.schedule_unbound(now, TimerKind::LocationPoll);

        s.bump_epoch();
        assert_eq!(s.len(), 1);
        assert_eq!(s.pop_due(now), Some((now, TimerKind::LocationPoll)));
    }

    #[test]
    fn test_reschedule_replaces_same_kind() {
        let now = Instant::now();
        let mut s = Scheduler::new();
        s.reschedule(now + Duration::from_millis(500), TimerKind::Reinject);
        s.reschedule(now + Duration::from_millis(800), TimerKind::Reinject);

        assert_eq!(s.len(), 1);
        assert_eq!(s.pop_due(now + Duration::from_millis(600)), None);
        assert_eq!(
            s.pop_due(now + Duration::from_millis(800)).map(|(_, k)| k),
            Some(TimerKind::Reinject)
        );
    }
}
