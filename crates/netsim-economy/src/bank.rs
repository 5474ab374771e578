//! Bank accounts and the append-only transaction history.
//!
//! The first account opened is the primary account: mission payouts,
//! penalties and interest are posted to it. Balances may go negative
//! (overdraft); the bankruptcy machinery in [`crate::countdown`] watches the
//! total.
//!
//! # Invariants
//!
//! - Every balance change appends exactly one [`Transaction`] whose
//!   `balance_after` equals the account's new balance.
//! - Transactions are never modified or removed.
//! - All amounts are [`Decimal`]; arithmetic is checked.

use chrono::{DateTime, TimeDelta, Utc};
use netsim_types::{AccountId, BankAccount, Transaction, TransactionId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::countdown::calculate_interest_at;
use crate::error::EconomyError;

/// Accounts, transaction history and the interest anchor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bank {
    /// Open accounts; index 0 is primary.
    accounts: Vec<BankAccount>,
    /// Every posted transaction, oldest first.
    transactions: Vec<Transaction>,
    /// Virtual instant interest was last applied (or the overdraft began).
    interest_anchor: Option<DateTime<Utc>>,
}

impl Bank {
    /// Create a bank with no accounts.
    pub const fn new() -> Self {
        Self {
            accounts: Vec::new(),
            transactions: Vec::new(),
            interest_anchor: None,
        }
    }

    /// Open an account with an opening balance. The first account opened
    /// becomes primary. Re-opening an existing id is a no-op and returns
    /// `false`.
    pub fn open_account(
        &mut self,
        id: AccountId,
        bank_name: impl Into<String>,
        opening_balance: Decimal,
    ) -> bool {
        if self.accounts.iter().any(|a| a.id == id) {
            return false;
        }
        info!(account = %id, balance = %opening_balance, "bank account opened");
        self.accounts.push(BankAccount {
            id,
            bank_name: bank_name.into(),
            balance: opening_balance,
        });
        true
    }

    /// The primary account, if any account is open.
    pub fn primary(&self) -> Option<&BankAccount> {
        self.accounts.first()
    }

    /// Look up an account by id.
    pub fn account(&self, id: &AccountId) -> Option<&BankAccount> {
        self.accounts.iter().find(|a| &a.id == id)
    }

    /// All accounts, primary first.
    pub fn accounts(&self) -> &[BankAccount] {
        &self.accounts
    }

    /// Full transaction history, oldest first.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Sum of every account balance.
    pub fn total_balance(&self) -> Decimal {
        self.accounts
            .iter()
            .fold(Decimal::ZERO, |sum, a| sum.saturating_add(a.balance))
    }

    /// Virtual instant interest was last applied.
    pub const fn interest_anchor(&self) -> Option<DateTime<Utc>> {
        self.interest_anchor
    }

    /// Credit `amount` to an account.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::NonPositiveAmount`] unless `amount > 0`,
    /// [`EconomyError::UnknownAccount`] for an unknown id, and
    /// [`EconomyError::ArithmeticOverflow`] if the balance overflows.
    pub fn deposit(
        &mut self,
        account_id: &AccountId,
        amount: Decimal,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<&Transaction, EconomyError> {
        if amount <= Decimal::ZERO {
            return Err(EconomyError::NonPositiveAmount { amount });
        }
        self.post(account_id, amount, description.into(), now)
    }

    /// Debit `amount` from an account. Overdrafts are allowed.
    ///
    /// # Errors
    ///
    /// Same as [`Bank::deposit`].
    pub fn withdraw(
        &mut self,
        account_id: &AccountId,
        amount: Decimal,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<&Transaction, EconomyError> {
        if amount <= Decimal::ZERO {
            return Err(EconomyError::NonPositiveAmount { amount });
        }
        let debit = Decimal::ZERO
            .checked_sub(amount)
            .ok_or_else(|| EconomyError::ArithmeticOverflow {
                context: format!("negating {amount}"),
            })?;
        self.post(account_id, debit, description.into(), now)
    }

    /// Post a signed amount to the primary account (payouts, penalties).
    ///
    /// A zero amount posts nothing and returns `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::NoAccounts`] if no account is open and
    /// [`EconomyError::ArithmeticOverflow`] if the balance overflows.
    pub fn adjust_primary(
        &mut self,
        amount: Decimal,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Option<&Transaction>, EconomyError> {
        if amount.is_zero() {
            return Ok(None);
        }
        let id = self
            .primary()
            .map(|a| a.id.clone())
            .ok_or(EconomyError::NoAccounts)?;
        self.post(&id, amount, description.into(), now).map(Some)
    }

    /// Apply overdraft interest for every full `interval` elapsed since the
    /// anchor, compounding one interval at a time.
    ///
    /// A non-negative total clears the anchor. The first negative
    /// observation sets the anchor without charging. Returns the total
    /// interest posted (zero or negative).
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError`] if posting to the primary account fails.
    pub fn apply_interest(
        &mut self,
        now: DateTime<Utc>,
        rate: Decimal,
        interval: TimeDelta,
    ) -> Result<Decimal, EconomyError> {
        if self.total_balance() >= Decimal::ZERO {
            self.interest_anchor = None;
            return Ok(Decimal::ZERO);
        }
        let Some(mut anchor) = self.interest_anchor else {
            self.interest_anchor = Some(now);
            return Ok(Decimal::ZERO);
        };
        if interval <= TimeDelta::zero() {
            return Ok(Decimal::ZERO);
        }

        let mut charged = Decimal::ZERO;
        while let Some(next) = anchor.checked_add_signed(interval) {
            if next > now {
                break;
            }
            anchor = next;
            let interest = calculate_interest_at(self.total_balance(), rate);
            if interest.is_zero() {
                continue;
            }
            self.adjust_primary(interest, "Overdraft interest", next)?;
            charged = charged.saturating_add(interest);
        }
        self.interest_anchor = Some(anchor);

        if !charged.is_zero() {
            info!(
                interest = %charged,
                balance = %self.total_balance(),
                "overdraft interest applied"
            );
        }
        Ok(charged)
    }

    /// Apply a signed amount and record the transaction.
    fn post(
        &mut self,
        account_id: &AccountId,
        amount: Decimal,
        description: String,
        now: DateTime<Utc>,
    ) -> Result<&Transaction, EconomyError> {
        let account = self
            .accounts
            .iter_mut()
            .find(|a| &a.id == account_id)
            .ok_or_else(|| EconomyError::UnknownAccount(account_id.clone()))?;
        account.balance =
            account
                .balance
                .checked_add(amount)
                .ok_or_else(|| EconomyError::ArithmeticOverflow {
                    context: format!("posting {amount} to {account_id}"),
                })?;

        debug!(
            account = %account_id,
            amount = %amount,
            balance = %account.balance,
            description = %description,
            "transaction posted"
        );

        let transaction = Transaction {
            id: TransactionId::new(),
            account_id: account_id.clone(),
            amount,
            description,
            timestamp: now,
            balance_after: account.balance,
        };
        self.transactions.push(transaction);
        self.transactions
            .last()
            .ok_or_else(|| EconomyError::ArithmeticOverflow {
                context: "transaction history".to_owned(),
            })
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

    fn bank_with(balance: i64) -> Bank {
        let mut bank = Bank::new();
        bank.open_account(AccountId::new("acct-1"), "First Bank", Decimal::from(balance));
        bank
    }

    #[test]
    fn deposit_and_withdraw_record_transactions() {
        let mut bank = bank_with(1000);
        let id = AccountId::new("acct-1");
        bank.deposit(&id, Decimal::from(500), "payout", now()).unwrap();
        let tx = bank.withdraw(&id, Decimal::from(2000), "rent", now()).unwrap();
        assert_eq!(tx.balance_after, Decimal::from(-500));
        assert_eq!(bank.transactions().len(), 2);
        assert_eq!(bank.total_balance(), Decimal::from(-500));
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        let mut bank = bank_with(0);
        let id = AccountId::new("acct-1");
        assert!(matches!(
            bank.deposit(&id, Decimal::ZERO, "nothing", now()),
            Err(EconomyError::NonPositiveAmount { .. })
        ));
        assert!(matches!(
            bank.withdraw(&id, Decimal::from(-5), "negative", now()),
            Err(EconomyError::NonPositiveAmount { .. })
        ));
    }

    #[test]
    fn unknown_account_is_an_error() {
        let mut bank = bank_with(0);
        let result = bank.deposit(&AccountId::new("nope"), Decimal::ONE, "x", now());
        assert!(matches!(result, Err(EconomyError::UnknownAccount(_))));
    }

    #[test]
    fn first_account_is_primary_and_reopen_is_noop() {
        let mut bank = bank_with(10);
        bank.open_account(AccountId::new("acct-2"), "Second Bank", Decimal::from(5));
        bank.open_account(AccountId::new("acct-1"), "Ignored", Decimal::from(999));
        assert_eq!(bank.primary().unwrap().id, AccountId::new("acct-1"));
        assert_eq!(bank.accounts().len(), 2);
        assert_eq!(bank.total_balance(), Decimal::from(15));
    }

    #[test]
    fn interest_waits_one_full_interval() {
        let mut bank = bank_with(-9000);
        let minute = TimeDelta::minutes(1);
        let rate = Decimal::new(1, 2);

        assert_eq!(bank.apply_interest(now(), rate, minute).unwrap(), Decimal::ZERO);
        let almost = now() + TimeDelta::seconds(59);
        assert_eq!(bank.apply_interest(almost, rate, minute).unwrap(), Decimal::ZERO);
        let full = now() + TimeDelta::seconds(60);
        assert_eq!(
            bank.apply_interest(full, rate, minute).unwrap(),
            Decimal::from(-90)
        );
        assert_eq!(bank.total_balance(), Decimal::from(-9090));
    }

    #[test]
    fn interest_compounds_per_elapsed_interval() {
        let mut bank = bank_with(-10_000);
        let minute = TimeDelta::minutes(1);
        let rate = Decimal::new(1, 2);
        bank.apply_interest(now(), rate, minute).unwrap();

        // -10000 -> -10100 -> -10201
        let charged = bank
            .apply_interest(now() + TimeDelta::minutes(2), rate, minute)
            .unwrap();
        assert_eq!(charged, Decimal::from(-201));
        assert_eq!(bank.transactions().len(), 2);
    }

    #[test]
    fn recovery_resets_the_anchor() {
        let mut bank = bank_with(-100);
        let minute = TimeDelta::minutes(1);
        let rate = Decimal::new(1, 2);
        bank.apply_interest(now(), rate, minute).unwrap();
        assert!(bank.interest_anchor().is_some());

        bank.deposit(&AccountId::new("acct-1"), Decimal::from(200), "payout", now())
            .unwrap();
        bank.apply_interest(now() + minute, rate, minute).unwrap();
        assert!(bank.interest_anchor().is_none());
    }
}
