//! Timer registry: deferred actions keyed by session.
//!
//! Holds at most one pending timer per session. Timers never run by
//! themselves; the host calls `take_due` and dispatches what it gets back.
//! A cancelled timer is removed from the registry, so it can never be
//! returned by a later `take_due`, even if its deadline has already passed.

use super::clock::add_std;
use crate::domain::{SessionId, TimerHandle};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// A scheduled deferred action.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledTimer<A> {
    pub handle: TimerHandle,
    pub session: SessionId,
    pub due_at: DateTime<Utc>,
    pub action: A,
}

#[derive(Debug)]
pub struct TimerRegistry<A> {
    pending: HashMap<SessionId, ScheduledTimer<A>>,
    next_handle: u64,
}

impl<A> Default for TimerRegistry<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> TimerRegistry<A> {
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
            next_handle: 1,
        }
    }

    /// Schedule `action` for `session`, due `delay` after `now`.
    ///
    /// A timer already pending for the session is cancelled and replaced.
    pub fn schedule(
        &mut self,
        session: SessionId,
        now: DateTime<Utc>,
        delay: Duration,
        action: A,
    ) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;

        let timer = ScheduledTimer {
            handle,
            session,
            due_at: add_std(now, delay),
            action,
        };
        if let Some(replaced) = self.pending.insert(session, timer) {
            warn!(
                session = %session,
                replaced = %replaced.handle,
                handle = %handle,
                "replaced pending timer"
            );
        }
        debug!(session = %session, handle = %handle, delay_ms = delay.as_millis() as u64, "timer scheduled");
        handle
    }

    /// Cancel every timer recorded for `session`. Idempotent.
    ///
    /// Returns how many timers were cancelled.
    pub fn cancel_all(&mut self, session: SessionId) -> usize {
        match self.pending.remove(&session) {
            Some(timer) => {
                debug!(session = %session, handle = %timer.handle, "timer cancelled");
                1
            }
            None => 0,
        }
    }

    /// Cancel one timer by handle. Returns false if it was not pending.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let session = self
            .pending
            .iter()
            .find(|(_, t)| t.handle == handle)
            .map(|(s, _)| *s);
        match session {
            Some(session) => self.cancel_all(session) == 1,
            None => false,
        }
    }

    /// Remove and return every timer due at or before `now`, earliest first.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Vec<ScheduledTimer<A>> {
        let due_sessions: Vec<SessionId> = self
            .pending
            .iter()
            .filter(|(_, t)| t.due_at <= now)
            .map(|(s, _)| *s)
            .collect();

        let mut due: Vec<ScheduledTimer<A>> = due_sessions
            .into_iter()
            .filter_map(|s| self.pending.remove(&s))
            .collect();
        due.sort_by(|a, b| a.due_at.cmp(&b.due_at).then(a.handle.cmp(&b.handle)));
        due
    }

    /// Earliest pending deadline, if any.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.pending.values().map(|t| t.due_at).min()
    }

    pub fn pending_for(&self, session: SessionId) -> Option<&ScheduledTimer<A>> {
        self.pending.get(&session)
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.values().any(|t| t.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
