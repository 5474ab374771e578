//! Virtual clock for the Netsim kernel.
//!
//! The clock is the single source of truth for simulated time. Real elapsed
//! time is converted into virtual time by multiplying it with the current
//! speed multiplier; while paused, no virtual time passes at all.
//!
//! # Design Principles
//!
//! - Virtual time only moves forward. [`VirtualClock::advance_to`] ignores
//!   instants in the past.
//! - Speed multipliers come from a configured allow-list so the UI cannot
//!   request arbitrary rates.
//! - All conversions use checked arithmetic and saturate instead of
//!   overflowing.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::info;

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// The requested speed multiplier is not in the allow-list.
    #[error("unsupported speed multiplier {speed}x (allowed: {allowed:?})")]
    UnsupportedSpeed {
        /// The rejected multiplier.
        speed: u32,
        /// The configured multipliers.
        allowed: Vec<u32>,
    },
}

/// Simulated time, advanced at a multiple of real time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualClock {
    /// Current virtual instant.
    now: DateTime<Utc>,

    /// Current speed multiplier.
    speed: u32,

    /// Whether advancement is frozen.
    paused: bool,

    /// Multipliers accepted by [`VirtualClock::set_speed`].
    allowed_speeds: Vec<u32>,
}

impl VirtualClock {
    /// Create a running clock at `start`.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::UnsupportedSpeed`] if `speed` is not in
    /// `allowed_speeds`.
    pub fn new(
        start: DateTime<Utc>,
        speed: u32,
        allowed_speeds: Vec<u32>,
    ) -> Result<Self, ClockError> {
        if speed == 0 || !allowed_speeds.contains(&speed) {
            return Err(ClockError::UnsupportedSpeed {
                speed,
                allowed: allowed_speeds,
            });
        }
        Ok(Self {
            now: start,
            speed,
            paused: false,
            allowed_speeds,
        })
    }

    /// Current virtual instant.
    pub const fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Current speed multiplier.
    pub const fn speed(&self) -> u32 {
        self.speed
    }

    /// Whether the clock is paused.
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Multipliers the clock accepts.
    pub fn allowed_speeds(&self) -> &[u32] {
        &self.allowed_speeds
    }

    /// Virtual time corresponding to `real` elapsed time at the current
    /// speed. Zero while paused.
    pub fn virtual_delta(&self, real: Duration) -> TimeDelta {
        if self.paused {
            return TimeDelta::zero();
        }
        let millis = real.as_millis().saturating_mul(u128::from(self.speed));
        let millis = i64::try_from(millis).unwrap_or(i64::MAX);
        TimeDelta::try_milliseconds(millis).unwrap_or_else(TimeDelta::zero)
    }

    /// Advance by `real` elapsed time and return the virtual time added.
    pub fn advance_real(&mut self, real: Duration) -> TimeDelta {
        let delta = self.virtual_delta(real);
        let target = self.now.checked_add_signed(delta).unwrap_or(self.now);
        self.advance_to(target)
    }

    /// Move the clock forward to `instant`. Returns the virtual time added,
    /// which is zero when `instant` is not in the future.
    pub fn advance_to(&mut self, instant: DateTime<Utc>) -> TimeDelta {
        if instant <= self.now {
            return TimeDelta::zero();
        }
        let added = instant.signed_duration_since(self.now);
        self.now = instant;
        added
    }

    /// Change the speed multiplier. Returns the previous multiplier.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::UnsupportedSpeed`] if `speed` is not allowed.
    pub fn set_speed(&mut self, speed: u32) -> Result<u32, ClockError> {
        if !self.allowed_speeds.contains(&speed) {
            return Err(ClockError::UnsupportedSpeed {
                speed,
                allowed: self.allowed_speeds.clone(),
            });
        }
        let previous = self.speed;
        self.speed = speed;
        if previous != speed {
            info!(from = previous, to = speed, now = %self.now, "clock speed changed");
        }
        Ok(previous)
    }

    /// Freeze virtual time. Returns `false` if already paused.
    pub fn pause(&mut self) -> bool {
        if self.paused {
            return false;
        }
        self.paused = true;
        info!(now = %self.now, "clock paused");
        true
    }

    /// Unfreeze virtual time. Returns `false` if already running.
    pub fn resume(&mut self) -> bool {
        if !self.paused {
            return false;
        }
        self.paused = false;
        info!(now = %self.now, "clock resumed");
        true
    }
}
