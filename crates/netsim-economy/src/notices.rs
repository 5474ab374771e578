//! Threshold notices with once-per-excursion delivery.
//!
//! Each [`Notice`] corresponds to a threshold crossing. The [`NoticeLatch`]
//! keeps a per-notice "sent" flag: the flag is set when the notice fires and
//! cleared only once its condition stops holding. A sustained breach
//! therefore produces one message, while a later, distinct excursion can
//! fire again.

use std::collections::BTreeSet;

use netsim_types::Message;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Sender used for every financial notice.
const BANK_SENDER: &str = "First Bank of Cyberspace";

/// Sender used for every reputation notice.
const MANAGER_SENDER: &str = "Operations Manager";

/// A threshold crossing that may notify the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Notice {
    /// Total balance went below zero.
    FirstOverdraft,
    /// Total balance went below the approaching-bankruptcy line.
    ApproachingBankruptcy,
    /// The bankruptcy countdown started.
    BankruptcyCountdownStarted,
    /// The bankruptcy countdown was cancelled by a recovery.
    BankruptcyCountdownCancelled,
    /// Reputation dropped to tier 2.
    PerformancePlan,
    /// Reputation dropped to tier 1.
    FinalTermination,
    /// Reputation recovered from tier 1.
    ReputationRecovered,
}

impl Notice {
    /// Every notice.
    pub const ALL: [Self; 7] = [
        Self::FirstOverdraft,
        Self::ApproachingBankruptcy,
        Self::BankruptcyCountdownStarted,
        Self::BankruptcyCountdownCancelled,
        Self::PerformancePlan,
        Self::FinalTermination,
        Self::ReputationRecovered,
    ];

    /// Render the notice as an inbox message (undelivered).
    pub fn message(self) -> Message {
        let (from, subject, body) = match self {
            Self::FirstOverdraft => (
                BANK_SENDER,
                "Account overdrawn",
                "Your account balance is below zero. Overdraft interest of 1% \
                 is charged every minute until the balance is restored.",
            ),
            Self::ApproachingBankruptcy => (
                BANK_SENDER,
                "Approaching bankruptcy",
                "Your debt is approaching the bankruptcy limit. Falling below \
                 -10,000 credits will start bankruptcy proceedings.",
            ),
            Self::BankruptcyCountdownStarted => (
                BANK_SENDER,
                "Bankruptcy proceedings started",
                "Your debt exceeds the bankruptcy limit. Bring your balance \
                 back above the limit before the deadline or your business \
                 will be closed.",
            ),
            Self::BankruptcyCountdownCancelled => (
                BANK_SENDER,
                "Bankruptcy proceedings cancelled",
                "Your balance is back above the bankruptcy limit. The \
                 proceedings have been cancelled.",
            ),
            Self::PerformancePlan => (
                MANAGER_SENDER,
                "Performance improvement plan",
                "Your recent results have been poor. You are now on a \
                 performance improvement plan.",
            ),
            Self::FinalTermination => (
                MANAGER_SENDER,
                "Final warning",
                "Your reputation has hit rock bottom. Improve it before the \
                 deadline or your contract will be terminated.",
            ),
            Self::ReputationRecovered => (
                MANAGER_SENDER,
                "Termination averted",
                "Your performance has improved. The termination process has \
                 been stopped.",
            ),
        };
        Message::new(from, subject, body)
    }
}

/// Per-notice "sent" flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoticeLatch {
    /// Notices fired during their current excursion.
    sent: BTreeSet<Notice>,
}

impl NoticeLatch {
    /// Create a latch with no notices sent.
    pub const fn new() -> Self {
        Self {
            sent: BTreeSet::new(),
        }
    }

    /// Report whether `notice`'s condition holds; returns `true` exactly
    /// when the notice should fire now.
    pub fn update(&mut self, notice: Notice, holds: bool) -> bool {
        if !holds {
            if self.sent.remove(&notice) {
                debug!(?notice, "notice latch cleared");
            }
            return false;
        }
        let fire = self.sent.insert(notice);
        if fire {
            debug!(?notice, "notice latch set");
        }
        fire
    }

    /// Whether `notice` has fired during its current excursion.
    pub fn is_sent(&self, notice: Notice) -> bool {
        self.sent.contains(&notice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sustained_breach_fires_once() {
        let mut latch = NoticeLatch::new();
        assert!(latch.update(Notice::FirstOverdraft, true));
        assert!(!latch.update(Notice::FirstOverdraft, true));
        assert!(!latch.update(Notice::FirstOverdraft, true));
    }

    #[test]
    fn distinct_excursion_fires_again() {
        let mut latch = NoticeLatch::new();
        assert!(latch.update(Notice::PerformancePlan, true));
        assert!(!latch.update(Notice::PerformancePlan, false));
        assert!(!latch.is_sent(Notice::PerformancePlan));
        assert!(latch.update(Notice::PerformancePlan, true));
    }

    #[test]
    fn notices_are_independent() {
        let mut latch = NoticeLatch::new();
        assert!(latch.update(Notice::FirstOverdraft, true));
        assert!(latch.update(Notice::ApproachingBankruptcy, true));
        latch.update(Notice::ApproachingBankruptcy, false);
        assert!(latch.is_sent(Notice::FirstOverdraft));
    }

    #[test]
    fn every_notice_renders_a_message() {
        for notice in Notice::ALL {
            let message = notice.message();
            assert!(!message.subject.is_empty());
            assert!(message.received_at.is_none());
        }
    }
}
