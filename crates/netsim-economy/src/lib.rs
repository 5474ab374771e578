//! Economic state machines for the Netsim kernel.
//!
//! Credits live in a [`Bank`] of accounts with an append-only transaction
//! history. Two countdowns can end the game: bankruptcy (deep debt held for
//! five virtual minutes) and termination (reputation held at tier 1 for ten
//! virtual minutes). Threshold crossings notify the player once per
//! excursion through a serially delivered message queue.
//!
//! # Modules
//!
//! - [`bank`] -- Accounts, deposits, withdrawals, payouts and compounding
//!   overdraft interest.
//! - [`countdown`] -- The shared countdown state machine, the bankruptcy
//!   monitor and the pure bankruptcy/interest rules.
//! - [`reputation`] -- The 11-tier scale, warnings and the termination
//!   countdown.
//! - [`notices`] -- Threshold notices and their once-per-excursion latch.
//! - [`messaging`] -- Serial message delivery with a fixed gap.
//! - [`economy`] -- [`Economy`], which advances all of the above per tick.
//! - [`error`] -- Error types for bank operations.

pub mod bank;
pub mod countdown;
pub mod economy;
pub mod error;
pub mod messaging;
pub mod notices;
pub mod reputation;

pub use bank::Bank;
pub use countdown::{
    BankruptcyMonitor, CountdownMachine, CountdownTransition, calculate_interest,
    calculate_interest_at, should_trigger_bankruptcy,
};
pub use economy::{Economy, EconomyPolicy, EconomySnapshot, EconomyTick};
pub use error::EconomyError;
pub use messaging::{MessageQueue, QueuedMessage};
pub use notices::{Notice, NoticeLatch};
pub use reputation::{
    ReputationChange, ReputationMonitor, ReputationTier, ReputationWarning, reputation_warning,
};
