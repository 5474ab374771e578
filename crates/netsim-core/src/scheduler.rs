//! Virtual-time deferred execution.
//!
//! Timers are keyed by their virtual due instant, never by a real-world
//! deadline. A speed change therefore cannot move a timer's firing instant:
//! [`Scheduler::reschedule_for_speed`] only recomputes how much real time is
//! left before each timer fires. The real-time driver asks
//! [`Scheduler::next_real_delay`] how long it may sleep.
//!
//! Timers due at the same virtual instant fire in registration order.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Cancellation handle returned by [`Scheduler::schedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Registration sequence number.
    pub const fn sequence(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// A timer removed from the scheduler because it came due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredTimer<T> {
    /// Handle it was scheduled under.
    pub handle: TimerHandle,
    /// Virtual instant it was due.
    pub due_at: DateTime<Utc>,
    /// Caller payload.
    pub payload: T,
}

/// Queue of virtual-time timers carrying payloads of type `T`.
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    /// Pending timers ordered by `(due_at, sequence)`.
    timers: BTreeMap<(DateTime<Utc>, u64), T>,
    /// Due instant of every pending handle.
    due_by_handle: BTreeMap<TimerHandle, DateTime<Utc>>,
    /// Next registration sequence number.
    next_seq: u64,
    /// Speed multiplier used for real-time delay estimates.
    speed: u32,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new(1)
    }
}

impl<T> Scheduler<T> {
    /// Create an empty scheduler running at `speed`.
    pub const fn new(speed: u32) -> Self {
        Self {
            timers: BTreeMap::new(),
            due_by_handle: BTreeMap::new(),
            next_seq: 0,
            speed,
        }
    }

    /// Schedule `payload` to fire once `delay` of virtual time has passed
    /// since `now`. A negative delay fires at `now`.
    pub fn schedule(
        &mut self,
        payload: T,
        delay: TimeDelta,
        now: DateTime<Utc>,
        speed: u32,
    ) -> TimerHandle {
        let delay = delay.max(TimeDelta::zero());
        let due_at = now.checked_add_signed(delay).unwrap_or(now);
        self.speed = speed;
        self.schedule_at(payload, due_at)
    }

    /// Schedule `payload` at an absolute virtual instant.
    pub fn schedule_at(&mut self, payload: T, due_at: DateTime<Utc>) -> TimerHandle {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.saturating_add(1);
        let handle = TimerHandle(seq);
        self.timers.insert((due_at, seq), payload);
        self.due_by_handle.insert(handle, due_at);
        debug!(%handle, %due_at, "timer scheduled");
        handle
    }

    /// Cancel a pending timer without firing it. Returns `false` if the
    /// handle already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let Some(due_at) = self.due_by_handle.remove(&handle) else {
            return false;
        };
        let removed = self.timers.remove(&(due_at, handle.0)).is_some();
        if removed {
            debug!(%handle, %due_at, "timer cancelled");
        }
        removed
    }

    /// Move a pending timer to a new virtual instant. The timer keeps its
    /// registration sequence, so ties at the new instant still resolve in
    /// the original registration order. Returns `false` if the handle is no
    /// longer pending.
    pub fn reschedule(&mut self, handle: TimerHandle, due_at: DateTime<Utc>) -> bool {
        let Some(previous) = self.due_by_handle.get_mut(&handle) else {
            return false;
        };
        let Some(payload) = self.timers.remove(&(*previous, handle.0)) else {
            return false;
        };
        *previous = due_at;
        self.timers.insert((due_at, handle.0), payload);
        debug!(%handle, %due_at, "timer moved");
        true
    }

    /// Remove and return the earliest timer due at or before `until`.
    pub fn pop_due(&mut self, until: DateTime<Utc>) -> Option<FiredTimer<T>> {
        let (&(due_at, seq), _) = self.timers.first_key_value()?;
        if due_at > until {
            return None;
        }
        let payload = self.timers.remove(&(due_at, seq))?;
        let handle = TimerHandle(seq);
        self.due_by_handle.remove(&handle);
        debug!(%handle, %due_at, "timer fired");
        Some(FiredTimer {
            handle,
            due_at,
            payload,
        })
    }

    /// Recompute every pending timer's real-world delay for a new speed.
    ///
    /// Virtual due instants are preserved. Returns each handle with the
    /// real time now left before it fires, in firing order.
    pub fn reschedule_for_speed(
        &mut self,
        now: DateTime<Utc>,
        speed: u32,
    ) -> Vec<(TimerHandle, Duration)> {
        self.speed = speed;
        let delays: Vec<(TimerHandle, Duration)> = self
            .timers
            .keys()
            .map(|&(due_at, seq)| (TimerHandle(seq), real_delay(due_at, now, speed)))
            .collect();
        debug!(speed, timers = delays.len(), "timers rescheduled for speed change");
        delays
    }

    /// Real time until the earliest timer fires at the current speed.
    pub fn next_real_delay(&self, now: DateTime<Utc>) -> Option<Duration> {
        let (&(due_at, _), _) = self.timers.first_key_value()?;
        Some(real_delay(due_at, now, self.speed))
    }

    /// Virtual due instant of the earliest pending timer.
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.timers.first_key_value().map(|(&(due_at, _), _)| due_at)
    }

    /// Virtual time left before `handle` fires.
    pub fn remaining(&self, handle: TimerHandle, now: DateTime<Utc>) -> Option<TimeDelta> {
        self.due_by_handle
            .get(&handle)
            .map(|due_at| due_at.signed_duration_since(now).max(TimeDelta::zero()))
    }

    /// Virtual due instant of `handle`.
    pub fn due_at(&self, handle: TimerHandle) -> Option<DateTime<Utc>> {
        self.due_by_handle.get(&handle).copied()
    }

    /// Payload of a pending timer.
    pub fn payload(&self, handle: TimerHandle) -> Option<&T> {
        let due_at = self.due_by_handle.get(&handle)?;
        self.timers.get(&(*due_at, handle.0))
    }

    /// Speed multiplier used for real-time estimates.
    pub const fn speed(&self) -> u32 {
        self.speed
    }

    /// Number of pending timers.
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Whether no timer is pending.
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Drop every pending timer.
    pub fn clear(&mut self) {
        self.timers.clear();
        self.due_by_handle.clear();
    }
}

/// Real time before `due_at` is reached from `now` at `speed`.
fn real_delay(due_at: DateTime<Utc>, now: DateTime<Utc>, speed: u32) -> Duration {
    let virtual_ms = due_at.signed_duration_since(now).num_milliseconds().max(0);
    let virtual_ms = u64::try_from(virtual_ms).unwrap_or(0);
    let real_ms = virtual_ms.div_ceil(u64::from(speed.max(1)));
    Duration::from_millis(real_ms)
}
