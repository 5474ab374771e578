//! Integration tests: a player's finances sliding into bankruptcy and back,
//! with notices delivered through the message queue.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use netsim_economy::{
    Bank, CountdownTransition, Economy, EconomyPolicy, MessageQueue, Notice, ReputationTier,
    calculate_interest, should_trigger_bankruptcy,
};
use netsim_types::{AccountId, GameOverReason};
use rust_decimal::Decimal;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 3, 25, 9, 0, 0).single().unwrap()
}

fn economy(balance: i64) -> Economy {
    let mut bank = Bank::new();
    bank.open_account(AccountId::new("primary"), "First Bank", Decimal::from(balance));
    Economy::new(EconomyPolicy::default(), bank, ReputationTier::START)
}

#[test]
fn documented_rule_values() {
    assert!(should_trigger_bankruptcy(Decimal::from(-10_001)));
    assert!(!should_trigger_bankruptcy(Decimal::from(-10_000)));
    assert_eq!(calculate_interest(Decimal::from(-9000)), Decimal::from(-90));
}

#[test]
fn notices_are_delivered_serially() {
    let mut eco = economy(-15_000);
    let mut queue = MessageQueue::default();

    let tick = eco.tick(start()).unwrap();
    let slots: Vec<_> = tick
        .notices
        .iter()
        .map(|notice| queue.enqueue(notice.message(), start()))
        .collect();

    assert_eq!(slots.len(), 3);
    assert_eq!(slots[0], start() + TimeDelta::seconds(5));
    assert_eq!(slots[1], start() + TimeDelta::seconds(10));
    assert_eq!(slots[2], start() + TimeDelta::seconds(15));
}

#[test]
fn recovered_player_can_go_bankrupt_again_later() {
    let mut eco = economy(-11_000);
    let account = AccountId::new("primary");

    assert!(matches!(
        eco.tick(start()).unwrap().bankruptcy,
        CountdownTransition::Started(_)
    ));

    eco.bank_mut()
        .deposit(&account, Decimal::from(20_000), "big payout", start())
        .unwrap();
    let recovered = eco.tick(start() + TimeDelta::minutes(2)).unwrap();
    assert_eq!(recovered.bankruptcy, CountdownTransition::Cancelled);
    assert!(recovered.notices.contains(&Notice::BankruptcyCountdownCancelled));

    eco.bank_mut()
        .withdraw(&account, Decimal::from(30_000), "equipment", start())
        .unwrap();
    let relapse = eco.tick(start() + TimeDelta::minutes(3)).unwrap();
    assert!(relapse.notices.contains(&Notice::BankruptcyCountdownStarted));

    // Still deep in debt five minutes later.
    let mut last = relapse;
    for minute in 4..=8 {
        last = eco.tick(start() + TimeDelta::minutes(minute)).unwrap();
        if last.game_over.is_some() {
            break;
        }
    }
    assert_eq!(last.game_over, Some(GameOverReason::Bankruptcy));
}
