//! The 11-tier reputation scale and the termination countdown.
//!
//! Tier 1 is the floor: reaching it starts a termination countdown that
//! ends the game on expiry unless the player climbs back above tier 1 first.
//! Dropping from 3 to 2 puts the player on a performance plan; dropping from
//! 2 to 1 is the final warning.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use netsim_types::Countdown;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::countdown::{CountdownMachine, CountdownTransition, TERMINATION_COUNTDOWN_MINUTES};

/// Display names, lowest tier first.
const TIER_NAMES: [&str; 11] = [
    "Should-be-fired",
    "On probation",
    "Under review",
    "Unreliable",
    "Adequate",
    "Dependable",
    "Solid",
    "Respected",
    "Trusted",
    "Highly valued",
    "Legendary",
];

// ---------------------------------------------------------------------------
// ReputationTier
// ---------------------------------------------------------------------------

/// A reputation level in `1..=11`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ReputationTier(u8);

impl ReputationTier {
    /// Lowest tier; triggers the termination countdown.
    pub const MIN: Self = Self(1);
    /// Highest tier.
    pub const MAX: Self = Self(11);
    /// Tier a new hire starts at.
    pub const START: Self = Self(9);

    /// Build a tier, returning `None` outside `1..=11`.
    pub const fn new(value: u8) -> Option<Self> {
        if value >= Self::MIN.0 && value <= Self::MAX.0 {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Numeric value.
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        TIER_NAMES
            .get(usize::from(self.0.saturating_sub(1)))
            .copied()
            .unwrap_or("Unknown")
    }

    /// Apply a signed delta, saturating at both ends of the scale.
    #[must_use]
    pub fn apply(self, delta: i8) -> Self {
        let raw = i16::from(self.0).saturating_add(i16::from(delta));
        let clamped = raw.clamp(i16::from(Self::MIN.0), i16::from(Self::MAX.0));
        Self(u8::try_from(clamped).unwrap_or(Self::MIN.0))
    }

    /// Whether the player is at the termination floor.
    pub const fn at_floor(self) -> bool {
        self.0 <= Self::MIN.0
    }
}

impl Default for ReputationTier {
    fn default() -> Self {
        Self::START
    }
}

impl fmt::Display for ReputationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0, self.name())
    }
}

impl TryFrom<u8> for ReputationTier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("reputation tier {value} outside 1..=11"))
    }
}

impl From<ReputationTier> for u8 {
    fn from(tier: ReputationTier) -> Self {
        tier.0
    }
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Warning issued when the tier drops into the danger zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReputationWarning {
    /// Dropped from tier 3 to tier 2.
    PerformancePlan,
    /// Dropped from tier 2 to tier 1.
    FinalTermination,
}

impl ReputationWarning {
    /// Stable identifier.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PerformancePlan => "performance-plan",
            Self::FinalTermination => "final-termination",
        }
    }
}

/// The warning for a tier transition, if it warrants one.
pub const fn reputation_warning(from: u8, to: u8) -> Option<ReputationWarning> {
    match (from, to) {
        (3, 2) => Some(ReputationWarning::PerformancePlan),
        (2, 1) => Some(ReputationWarning::FinalTermination),
        _ => None,
    }
}

/// Outcome of a reputation adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReputationChange {
    /// Tier before.
    pub from: ReputationTier,
    /// Tier after.
    pub to: ReputationTier,
    /// Warning for this transition, if any.
    pub warning: Option<ReputationWarning>,
}

// ---------------------------------------------------------------------------
// ReputationMonitor
// ---------------------------------------------------------------------------

/// Current tier plus the termination countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReputationMonitor {
    /// Current tier.
    tier: ReputationTier,
    /// Termination countdown.
    machine: CountdownMachine,
}

impl Default for ReputationMonitor {
    fn default() -> Self {
        Self::new(
            ReputationTier::START,
            TimeDelta::minutes(TERMINATION_COUNTDOWN_MINUTES),
        )
    }
}

impl ReputationMonitor {
    /// Create a monitor at `tier` with a termination countdown of `duration`.
    pub const fn new(tier: ReputationTier, duration: TimeDelta) -> Self {
        Self {
            tier,
            machine: CountdownMachine::new(duration),
        }
    }

    /// Restore a persisted termination countdown.
    #[must_use]
    pub const fn with_countdown(mut self, countdown: Option<Countdown>) -> Self {
        self.machine = CountdownMachine::restore(self.machine.duration(), countdown);
        self
    }

    /// Current tier.
    pub const fn tier(&self) -> ReputationTier {
        self.tier
    }

    /// The running termination countdown, if any.
    pub const fn countdown(&self) -> Option<&Countdown> {
        self.machine.active()
    }

    /// Move the tier by `delta` and report any warning.
    pub fn adjust(&mut self, delta: i8) -> ReputationChange {
        let from = self.tier;
        let to = from.apply(delta);
        self.tier = to;
        let warning = reputation_warning(from.value(), to.value());
        if from != to {
            info!(from = from.value(), to = to.value(), "reputation changed");
        }
        if let Some(warning) = warning {
            warn!(warning = warning.as_str(), "reputation warning");
        }
        ReputationChange { from, to, warning }
    }

    /// Tick the termination countdown.
    pub fn update(&mut self, now: DateTime<Utc>) -> CountdownTransition {
        let transition = self.machine.update(self.tier.at_floor(), now);
        match transition {
            CountdownTransition::Started(countdown) => {
                warn!(
                    remaining_secs = countdown.remaining_secs,
                    "termination countdown started"
                );
            }
            CountdownTransition::Cancelled => {
                info!(tier = self.tier.value(), "termination countdown cancelled");
            }
            CountdownTransition::Expired => warn!("termination countdown expired"),
            CountdownTransition::Ticking(_) | CountdownTransition::Idle => {}
        }
        transition
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 3, 25, 9, 0, 0).single().unwrap()
    }

    #[test]
    fn warnings_fire_on_the_two_danger_transitions() {
        assert_eq!(
            reputation_warning(3, 2).map(ReputationWarning::as_str),
            Some("performance-plan")
        );
        assert_eq!(
            reputation_warning(2, 1).map(ReputationWarning::as_str),
            Some("final-termination")
        );
        assert_eq!(reputation_warning(4, 3), None);
        assert_eq!(reputation_warning(1, 2), None);
    }

    #[test]
    fn tier_saturates_at_both_ends() {
        assert_eq!(ReputationTier::MIN.apply(-3), ReputationTier::MIN);
        assert_eq!(ReputationTier::MAX.apply(5), ReputationTier::MAX);
        assert_eq!(ReputationTier::START.apply(-1).value(), 8);
        assert!(ReputationTier::new(0).is_none());
        assert!(ReputationTier::new(12).is_none());
    }

    #[test]
    fn tier_serializes_as_number() {
        let json = serde_json::to_string(&ReputationTier::START).unwrap();
        assert_eq!(json, "9");
        let bad: Result<ReputationTier, _> = serde_json::from_str("0");
        assert!(bad.is_err());
    }

    #[test]
    fn floor_starts_and_recovery_cancels_termination() {
        let mut monitor =
            ReputationMonitor::new(ReputationTier::new(2).unwrap(), TimeDelta::minutes(10));
        assert_eq!(monitor.update(now()), CountdownTransition::Idle);

        let change = monitor.adjust(-1);
        assert_eq!(change.warning, Some(ReputationWarning::FinalTermination));
        assert!(matches!(monitor.update(now()), CountdownTransition::Started(_)));

        monitor.adjust(1);
        assert_eq!(
            monitor.update(now() + TimeDelta::minutes(3)),
            CountdownTransition::Cancelled
        );
    }

    #[test]
    fn termination_expires_at_the_floor() {
        let mut monitor = ReputationMonitor::new(ReputationTier::MIN, TimeDelta::minutes(10));
        monitor.update(now());
        assert_eq!(
            monitor.update(now() + TimeDelta::minutes(10)),
            CountdownTransition::Expired
        );
    }
}
