//! Error types for the `netsim-economy` crate.

use netsim_types::AccountId;
use rust_decimal::Decimal;

/// Errors that can occur during bank operations.
#[derive(Debug, thiserror::Error)]
pub enum EconomyError {
    /// No account with the given id exists.
    #[error("unknown bank account: {0}")]
    UnknownAccount(AccountId),

    /// The bank holds no accounts, so there is no primary account.
    #[error("no bank accounts are open")]
    NoAccounts,

    /// Deposits and withdrawals take a strictly positive amount.
    #[error("amount must be positive, got {amount}")]
    NonPositiveAmount {
        /// The rejected amount.
        amount: Decimal,
    },

    /// Checked decimal arithmetic overflowed.
    #[error("arithmetic overflow: {context}")]
    ArithmeticOverflow {
        /// Where the overflow occurred.
        context: String,
    },
}
