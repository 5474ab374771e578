//! The economic state machine as a whole.
//!
//! [`Economy`] bundles the bank, both countdowns and the notice latch, and
//! advances them together in [`Economy::tick`]:
//!
//! 1. Overdraft interest is applied (which may deepen the debt).
//! 2. Balance notices are evaluated.
//! 3. The bankruptcy countdown is ticked against the new balance.
//! 4. Reputation notices and the termination countdown are evaluated.
//!
//! The first expired countdown decides the game-over reason.

use chrono::{DateTime, TimeDelta, Utc};
use netsim_types::{Countdown, GameOverReason};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::bank::Bank;
use crate::countdown::{
    BANKRUPTCY_COUNTDOWN_MINUTES, BANKRUPTCY_THRESHOLD, BankruptcyMonitor, CountdownTransition,
    INTEREST_RATE, TERMINATION_COUNTDOWN_MINUTES,
};
use crate::error::EconomyError;
use crate::notices::{Notice, NoticeLatch};
use crate::reputation::{ReputationChange, ReputationMonitor, ReputationTier};

/// Tunable economic constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EconomyPolicy {
    /// Balance strictly below which the bankruptcy countdown runs.
    pub bankruptcy_threshold: Decimal,
    /// Balance strictly below which the approaching-bankruptcy notice fires.
    pub approaching_threshold: Decimal,
    /// Bankruptcy countdown length.
    pub bankruptcy_countdown: TimeDelta,
    /// Termination countdown length.
    pub termination_countdown: TimeDelta,
    /// Interest rate per interval.
    pub interest_rate: Decimal,
    /// Interest interval.
    pub interest_interval: TimeDelta,
}

impl Default for EconomyPolicy {
    fn default() -> Self {
        Self {
            bankruptcy_threshold: BANKRUPTCY_THRESHOLD,
            approaching_threshold: Decimal::from(-8000),
            bankruptcy_countdown: TimeDelta::minutes(BANKRUPTCY_COUNTDOWN_MINUTES),
            termination_countdown: TimeDelta::minutes(TERMINATION_COUNTDOWN_MINUTES),
            interest_rate: INTEREST_RATE,
            interest_interval: TimeDelta::minutes(1),
        }
    }
}

/// Persisted economic state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomySnapshot {
    /// Accounts and history.
    pub bank: Bank,
    /// Current reputation tier.
    pub reputation: ReputationTier,
    /// Running bankruptcy countdown.
    pub bankruptcy_countdown: Option<Countdown>,
    /// Running termination countdown.
    pub termination_countdown: Option<Countdown>,
    /// Threshold notices already sent this excursion.
    pub notices: NoticeLatch,
}

/// What one [`Economy::tick`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EconomyTick {
    /// Interest posted this tick (zero or negative).
    pub interest: Decimal,
    /// Bankruptcy countdown transition.
    pub bankruptcy: CountdownTransition,
    /// Termination countdown transition.
    pub termination: CountdownTransition,
    /// Notices that fired, in evaluation order.
    pub notices: Vec<Notice>,
    /// Set when a countdown expired.
    pub game_over: Option<GameOverReason>,
}

/// Bank, countdowns and notice latch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Economy {
    /// Tunables.
    policy: EconomyPolicy,
    /// Accounts and history.
    bank: Bank,
    /// Bankruptcy countdown.
    bankruptcy: BankruptcyMonitor,
    /// Tier and termination countdown.
    reputation: ReputationMonitor,
    /// Once-per-excursion flags.
    latch: NoticeLatch,
}

impl Economy {
    /// Create an economy around an already-funded bank.
    pub const fn new(policy: EconomyPolicy, bank: Bank, tier: ReputationTier) -> Self {
        Self {
            bankruptcy: BankruptcyMonitor::new(
                policy.bankruptcy_threshold,
                policy.bankruptcy_countdown,
            ),
            reputation: ReputationMonitor::new(tier, policy.termination_countdown),
            policy,
            bank,
            latch: NoticeLatch::new(),
        }
    }

    /// Rebuild an economy from a snapshot.
    pub fn restore(policy: EconomyPolicy, snapshot: EconomySnapshot) -> Self {
        Self {
            bankruptcy: BankruptcyMonitor::new(
                policy.bankruptcy_threshold,
                policy.bankruptcy_countdown,
            )
            .with_countdown(snapshot.bankruptcy_countdown),
            reputation: ReputationMonitor::new(snapshot.reputation, policy.termination_countdown)
                .with_countdown(snapshot.termination_countdown),
            policy,
            bank: snapshot.bank,
            latch: snapshot.notices,
        }
    }

    /// Capture the persisted state.
    pub fn snapshot(&self) -> EconomySnapshot {
        EconomySnapshot {
            bank: self.bank.clone(),
            reputation: self.reputation.tier(),
            bankruptcy_countdown: self.bankruptcy.countdown().copied(),
            termination_countdown: self.reputation.countdown().copied(),
            notices: self.latch.clone(),
        }
    }

    /// The bank.
    pub const fn bank(&self) -> &Bank {
        &self.bank
    }

    /// Mutable access for deposits and payouts.
    pub const fn bank_mut(&mut self) -> &mut Bank {
        &mut self.bank
    }

    /// Current tier.
    pub const fn reputation(&self) -> ReputationTier {
        self.reputation.tier()
    }

    /// Running bankruptcy countdown.
    pub const fn bankruptcy_countdown(&self) -> Option<&Countdown> {
        self.bankruptcy.countdown()
    }

    /// Running termination countdown.
    pub const fn termination_countdown(&self) -> Option<&Countdown> {
        self.reputation.countdown()
    }

    /// The tunables in force.
    pub const fn policy(&self) -> &EconomyPolicy {
        &self.policy
    }

    /// Move the reputation tier by `delta`.
    pub fn adjust_reputation(&mut self, delta: i8) -> ReputationChange {
        self.reputation.adjust(delta)
    }

    /// Earliest instant after `now` at which [`Economy::tick`] would change
    /// state on its own: the next interest boundary or a countdown deadline.
    ///
    /// Time-stepping callers must tick at every checkpoint so interest
    /// compounds and countdowns expire on the instant they are due.
    pub fn next_checkpoint(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let interest = self
            .bank
            .interest_anchor()
            .filter(|_| self.bank.total_balance() < Decimal::ZERO)
            .and_then(|anchor| anchor.checked_add_signed(self.policy.interest_interval));
        [
            interest,
            self.bankruptcy.countdown().map(|countdown| countdown.end),
            self.reputation.countdown().map(|countdown| countdown.end),
        ]
        .into_iter()
        .flatten()
        .filter(|at| *at > now)
        .min()
    }

    /// Advance interest, notices and both countdowns to `now`.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError`] if posting interest fails.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<EconomyTick, EconomyError> {
        let interest =
            self.bank
                .apply_interest(now, self.policy.interest_rate, self.policy.interest_interval)?;
        let balance = self.bank.total_balance();
        let mut notices = Vec::new();

        self.latch_notice(&mut notices, Notice::FirstOverdraft, balance < Decimal::ZERO);
        self.latch_notice(
            &mut notices,
            Notice::ApproachingBankruptcy,
            balance < self.policy.approaching_threshold,
        );

        let bankruptcy = self.bankruptcy.update(balance, now);
        match bankruptcy {
            CountdownTransition::Started(_) => {
                self.latch
                    .update(Notice::BankruptcyCountdownCancelled, false);
                self.latch_notice(&mut notices, Notice::BankruptcyCountdownStarted, true);
            }
            CountdownTransition::Cancelled => {
                self.latch.update(Notice::BankruptcyCountdownStarted, false);
                self.latch_notice(&mut notices, Notice::BankruptcyCountdownCancelled, true);
            }
            _ => {}
        }

        let tier = self.reputation.tier().value();
        self.latch_notice(&mut notices, Notice::PerformancePlan, tier <= 2);
        self.latch_notice(&mut notices, Notice::FinalTermination, tier <= 1);

        let termination = self.reputation.update(now);
        match termination {
            CountdownTransition::Started(_) => {
                self.latch.update(Notice::ReputationRecovered, false);
            }
            CountdownTransition::Cancelled => {
                self.latch_notice(&mut notices, Notice::ReputationRecovered, true);
            }
            _ => {}
        }

        let game_over = if bankruptcy.is_expired() {
            Some(GameOverReason::Bankruptcy)
        } else if termination.is_expired() {
            Some(GameOverReason::Termination)
        } else {
            None
        };
        if let Some(reason) = game_over {
            warn!(?reason, balance = %balance, tier, "game over");
        }

        Ok(EconomyTick {
            interest,
            bankruptcy,
            termination,
            notices,
            game_over,
        })
    }

    /// Update the latch for `notice` and record it if it fires.
    fn latch_notice(&mut self, fired: &mut Vec<Notice>, notice: Notice, holds: bool) {
        if self.latch.update(notice, holds) {
            fired.push(notice);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use netsim_types::AccountId;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 3, 25, 9, 0, 0).single().unwrap()
    }

    fn economy(balance: i64, tier: u8) -> Economy {
        let mut bank = Bank::new();
        bank.open_account(AccountId::new("acct"), "First Bank", Decimal::from(balance));
        Economy::new(
            EconomyPolicy::default(),
            bank,
            ReputationTier::new(tier).unwrap(),
        )
    }

    #[test]
    fn overdraft_notice_fires_once_per_excursion() {
        let mut eco = economy(-10, 9);
        let first = eco.tick(now()).unwrap();
        assert_eq!(first.notices, vec![Notice::FirstOverdraft]);
        let second = eco.tick(now() + TimeDelta::seconds(1)).unwrap();
        assert!(second.notices.is_empty());

        eco.bank_mut()
            .deposit(&AccountId::new("acct"), Decimal::from(100), "payout", now())
            .unwrap();
        eco.tick(now() + TimeDelta::seconds(2)).unwrap();
        eco.bank_mut()
            .withdraw(&AccountId::new("acct"), Decimal::from(200), "rent", now())
            .unwrap();
        let again = eco.tick(now() + TimeDelta::seconds(3)).unwrap();
        assert_eq!(again.notices, vec![Notice::FirstOverdraft]);
    }

    #[test]
    fn deep_debt_starts_countdown_with_all_notices() {
        let mut eco = economy(-10_500, 9);
        let tick = eco.tick(now()).unwrap();
        assert_eq!(
            tick.notices,
            vec![
                Notice::FirstOverdraft,
                Notice::ApproachingBankruptcy,
                Notice::BankruptcyCountdownStarted
            ]
        );
        assert!(eco.bankruptcy_countdown().is_some());
    }

    #[test]
    fn interest_can_push_into_bankruptcy() {
        let mut eco = economy(-9950, 9);
        eco.tick(now()).unwrap();
        assert!(eco.bankruptcy_countdown().is_none());
        // -9950 * 1% = -99.5 -> -100
        let tick = eco.tick(now() + TimeDelta::minutes(1)).unwrap();
        assert_eq!(tick.interest, Decimal::from(-100));
        assert!(matches!(tick.bankruptcy, CountdownTransition::Started(_)));
    }

    #[test]
    fn deposit_cancels_bankruptcy() {
        let mut eco = economy(-12_000, 9);
        eco.tick(now()).unwrap();
        eco.bank_mut()
            .deposit(&AccountId::new("acct"), Decimal::from(5000), "loan", now())
            .unwrap();
        let tick = eco.tick(now() + TimeDelta::seconds(30)).unwrap();
        assert_eq!(tick.bankruptcy, CountdownTransition::Cancelled);
        assert!(tick.notices.contains(&Notice::BankruptcyCountdownCancelled));
        assert!(tick.game_over.is_none());
    }

    #[test]
    fn bankruptcy_expiry_ends_the_game() {
        let mut eco = economy(-50_000, 9);
        eco.tick(now()).unwrap();
        let tick = eco.tick(now() + TimeDelta::minutes(5)).unwrap();
        assert_eq!(tick.game_over, Some(GameOverReason::Bankruptcy));
    }

    #[test]
    fn reputation_floor_leads_to_termination() {
        let mut eco = economy(1000, 2);
        let change = eco.adjust_reputation(-1);
        assert_eq!(change.to, ReputationTier::MIN);
        let tick = eco.tick(now()).unwrap();
        assert!(tick.notices.contains(&Notice::PerformancePlan));
        assert!(tick.notices.contains(&Notice::FinalTermination));
        assert!(eco.termination_countdown().is_some());

        let end = eco.tick(now() + TimeDelta::minutes(10)).unwrap();
        assert_eq!(end.game_over, Some(GameOverReason::Termination));
    }

    #[test]
    fn checkpoint_is_next_interest_boundary_or_deadline() {
        let mut eco = economy(1000, 9);
        eco.tick(now()).unwrap();
        assert_eq!(eco.next_checkpoint(now()), None);

        let mut eco = economy(-500, 9);
        eco.tick(now()).unwrap();
        assert_eq!(
            eco.next_checkpoint(now()),
            Some(now() + TimeDelta::minutes(1))
        );

        let mut eco = economy(1000, 1);
        eco.tick(now()).unwrap();
        assert_eq!(
            eco.next_checkpoint(now() + TimeDelta::minutes(3)),
            Some(now() + TimeDelta::minutes(10))
        );
        assert_eq!(eco.next_checkpoint(now() + TimeDelta::minutes(10)), None);
    }

    #[test]
    fn snapshot_restores_running_countdowns() {
        let mut eco = economy(-20_000, 1);
        eco.tick(now()).unwrap();
        let snapshot = eco.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let restored = Economy::restore(
            EconomyPolicy::default(),
            serde_json::from_str(&json).unwrap(),
        );
        assert_eq!(restored, eco);
    }
}
