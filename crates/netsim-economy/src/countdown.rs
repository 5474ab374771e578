//! Game-ending countdown state machines.
//!
//! Both the bankruptcy and the termination (reputation) countdown share one
//! mechanism, [`CountdownMachine`]: while the triggering condition holds a
//! countdown exists and is ticked against virtual time; it is destroyed when
//! the condition clears (cancelled) or when it runs out (expired). Expiry is
//! the game-over signal.
//!
//! ```text
//!           condition holds            remaining > 0
//!   Idle ------------------> Running --------------+
//!     ^                       |   |  <-------------+
//!     |   condition clears    |   |  remaining == 0
//!     +-----------------------+   +----------------> Expired
//! ```

use chrono::{DateTime, TimeDelta, Utc};
use netsim_types::Countdown;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Balance strictly below which the bankruptcy countdown starts.
pub const BANKRUPTCY_THRESHOLD: Decimal = Decimal::from_parts(10_000, 0, 0, true, 0);

/// Overdraft interest per interval: 1%.
pub const INTEREST_RATE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Virtual minutes the bankruptcy countdown runs.
pub const BANKRUPTCY_COUNTDOWN_MINUTES: i64 = 5;

/// Virtual minutes the termination countdown runs.
pub const TERMINATION_COUNTDOWN_MINUTES: i64 = 10;

// ---------------------------------------------------------------------------
// Pure rules
// ---------------------------------------------------------------------------

/// Whether `balance` is deep enough in debt to start the bankruptcy
/// countdown at the default threshold.
pub fn should_trigger_bankruptcy(balance: Decimal) -> bool {
    below_threshold(balance, BANKRUPTCY_THRESHOLD)
}

/// Strict comparison used by every bankruptcy check.
pub fn below_threshold(balance: Decimal, threshold: Decimal) -> bool {
    balance < threshold
}

/// Interest owed on `balance` at the default 1% rate.
pub fn calculate_interest(balance: Decimal) -> Decimal {
    calculate_interest_at(balance, INTEREST_RATE)
}

/// Interest owed on a negative `balance` at `rate`, rounded to whole
/// credits away from zero on a tie. Non-negative balances owe nothing.
pub fn calculate_interest_at(balance: Decimal, rate: Decimal) -> Decimal {
    if balance >= Decimal::ZERO {
        return Decimal::ZERO;
    }
    balance.checked_mul(rate).map_or(Decimal::ZERO, |raw| {
        raw.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
    })
}

// ---------------------------------------------------------------------------
// CountdownMachine
// ---------------------------------------------------------------------------

/// What a single [`CountdownMachine::update`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownTransition {
    /// No countdown, and the condition does not hold.
    Idle,
    /// The condition began to hold; a countdown was created.
    Started(Countdown),
    /// A countdown is running with this many whole seconds left.
    Ticking(u64),
    /// The condition cleared before expiry; the countdown was destroyed.
    Cancelled,
    /// The countdown ran out while the condition held.
    Expired,
}

impl CountdownTransition {
    /// Whether this transition ends the game.
    pub const fn is_expired(self) -> bool {
        matches!(self, Self::Expired)
    }
}

/// A countdown that exists only while its condition holds.
///
/// Only the running [`Countdown`] is persisted; the length comes from
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownMachine {
    /// How long a countdown runs.
    duration: TimeDelta,
    /// The running countdown, if any.
    active: Option<Countdown>,
}

impl CountdownMachine {
    /// Create an idle machine whose countdowns last `duration`.
    pub const fn new(duration: TimeDelta) -> Self {
        Self {
            duration,
            active: None,
        }
    }

    /// Rebuild a machine around a persisted countdown.
    pub const fn restore(duration: TimeDelta, active: Option<Countdown>) -> Self {
        Self { duration, active }
    }

    /// The running countdown, if any.
    pub const fn active(&self) -> Option<&Countdown> {
        self.active.as_ref()
    }

    /// Countdown length.
    pub const fn duration(&self) -> TimeDelta {
        self.duration
    }

    /// Advance the machine given whether its condition holds at `now`.
    pub fn update(&mut self, holds: bool, now: DateTime<Utc>) -> CountdownTransition {
        if !holds {
            return if self.active.take().is_some() {
                CountdownTransition::Cancelled
            } else {
                CountdownTransition::Idle
            };
        }
        if let Some(countdown) = self.active.as_mut() {
            let remaining = countdown.tick(now);
            if remaining > 0 {
                return CountdownTransition::Ticking(remaining);
            }
            self.active = None;
            return CountdownTransition::Expired;
        }
        let countdown = Countdown::new(now, self.duration);
        self.active = Some(countdown);
        CountdownTransition::Started(countdown)
    }
}

// ---------------------------------------------------------------------------
// BankruptcyMonitor
// ---------------------------------------------------------------------------

/// Watches the total balance and drives the bankruptcy countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankruptcyMonitor {
    /// Balance strictly below which the countdown runs.
    threshold: Decimal,
    /// The countdown.
    machine: CountdownMachine,
}

impl Default for BankruptcyMonitor {
    fn default() -> Self {
        Self::new(
            BANKRUPTCY_THRESHOLD,
            TimeDelta::minutes(BANKRUPTCY_COUNTDOWN_MINUTES),
        )
    }
}

impl BankruptcyMonitor {
    /// Create a monitor with a custom threshold and countdown length.
    pub const fn new(threshold: Decimal, duration: TimeDelta) -> Self {
        Self {
            threshold,
            machine: CountdownMachine::new(duration),
        }
    }

    /// Restore a persisted countdown.
    #[must_use]
    pub const fn with_countdown(mut self, countdown: Option<Countdown>) -> Self {
        self.machine = CountdownMachine::restore(self.machine.duration(), countdown);
        self
    }

    /// The running countdown, if any.
    pub const fn countdown(&self) -> Option<&Countdown> {
        self.machine.active()
    }

    /// The configured threshold.
    pub const fn threshold(&self) -> Decimal {
        self.threshold
    }

    /// Tick against the current total balance.
    pub fn update(&mut self, balance: Decimal, now: DateTime<Utc>) -> CountdownTransition {
        let transition = self
            .machine
            .update(below_threshold(balance, self.threshold), now);
        match transition {
            CountdownTransition::Started(countdown) => {
                warn!(
                    balance = %balance,
                    remaining_secs = countdown.remaining_secs,
                    "bankruptcy countdown started"
                );
            }
            CountdownTransition::Cancelled => {
                info!(balance = %balance, "bankruptcy countdown cancelled");
            }
            CountdownTransition::Expired => {
                warn!(balance = %balance, "bankruptcy countdown expired");
            }
            CountdownTransition::Ticking(remaining_secs) => {
                debug!(remaining_secs, "bankruptcy countdown ticking");
            }
            CountdownTransition::Idle => {}
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
    fn bankruptcy_threshold_is_strict() {
        assert!(should_trigger_bankruptcy(Decimal::from(-10_001)));
        assert!(!should_trigger_bankruptcy(Decimal::from(-10_000)));
        assert!(!should_trigger_bankruptcy(Decimal::from(500)));
    }

    #[test]
    fn interest_is_one_percent_of_debt() {
        assert_eq!(calculate_interest(Decimal::from(-9000)), Decimal::from(-90));
        assert_eq!(calculate_interest(Decimal::from(-150)), Decimal::from(-2));
        assert_eq!(calculate_interest(Decimal::from(-149)), Decimal::from(-1));
        assert_eq!(calculate_interest(Decimal::from(1000)), Decimal::ZERO);
    }

    #[test]
    fn machine_runs_full_lifecycle() {
        let mut machine = CountdownMachine::new(TimeDelta::minutes(5));
        assert_eq!(machine.update(false, now()), CountdownTransition::Idle);

        let started = machine.update(true, now());
        assert!(matches!(started, CountdownTransition::Started(c) if c.remaining_secs == 300));

        let later = now() + TimeDelta::milliseconds(1500);
        assert_eq!(machine.update(true, later), CountdownTransition::Ticking(299));

        let end = now() + TimeDelta::minutes(5);
        assert!(machine.update(true, end).is_expired());
        assert!(machine.active().is_none());
    }

    #[test]
    fn clearing_the_condition_cancels() {
        let mut machine = CountdownMachine::new(TimeDelta::minutes(5));
        machine.update(true, now());
        assert_eq!(
            machine.update(false, now() + TimeDelta::minutes(1)),
            CountdownTransition::Cancelled
        );
        assert!(machine.active().is_none());
        // A later excursion starts a fresh countdown.
        let again = machine.update(true, now() + TimeDelta::minutes(2));
        assert!(matches!(again, CountdownTransition::Started(_)));
    }

    #[test]
    fn monitor_cancels_when_balance_recovers_to_threshold() {
        let mut monitor = BankruptcyMonitor::default();
        assert!(matches!(
            monitor.update(Decimal::from(-10_500), now()),
            CountdownTransition::Started(_)
        ));
        assert_eq!(
            monitor.update(Decimal::from(-10_000), now() + TimeDelta::minutes(1)),
            CountdownTransition::Cancelled
        );
    }

    #[test]
    fn monitor_expires_while_still_in_debt() {
        let mut monitor = BankruptcyMonitor::default();
        monitor.update(Decimal::from(-20_000), now());
        let transition = monitor.update(Decimal::from(-20_000), now() + TimeDelta::minutes(5));
        assert_eq!(transition, CountdownTransition::Expired);
    }
}
