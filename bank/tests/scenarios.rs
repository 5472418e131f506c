//! End-to-end scenarios against a fresh `InMemoryStore`-backed engine.

use bank::amount::{AccountNumber, Money, OperationKey};
use bank::engine::BankingEngine;
use bank::model::{Account, AccountStatus, AccountType};
use bank::reconciler::Reconciler;
use bank::store::memory::InMemoryStore;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn seeded_account(store: &InMemoryStore, owner: Uuid, balance: &str) -> Account {
    let account = Account {
        id: Uuid::new_v4(),
        account_number: AccountNumber::generate(AccountType::Checking, chrono::Utc::now().date_naive()),
        owner_user_id: owner,
        account_type: AccountType::Checking,
        status: AccountStatus::Active,
        cached_balance: Money::from_decimal(dec(balance)),
        currency: "USD".to_string(),
        version: 0,
    };
    store.seed_account(account.clone());
    account
}

#[tokio::test]
async fn scenario_simple_deposit() {
    let store = InMemoryStore::new();
    let owner = Uuid::new_v4();
    let account = seeded_account(&store, owner, "0.00");
    let engine = BankingEngine::new(store);

    let result = engine
        .deposit(owner, account.id, dec("250.00"), None, None)
        .await
        .unwrap();

    assert_eq!(result.balance.to_string(), "250.00");
}

#[tokio::test]
async fn scenario_withdraw_then_reconcile() {
    let store = InMemoryStore::new();
    let owner = Uuid::new_v4();
    let account = seeded_account(&store, owner, "500.00");
    let engine = BankingEngine::new(store);

    let result = engine
        .withdraw(owner, account.id, dec("120.00"), None, None)
        .await
        .unwrap();
    assert_eq!(result.balance.to_string(), "380.00");

    let report = Reconciler::reconcile(engine.store(), account.id).await.unwrap();
    assert!(report.reconciled);
    assert_eq!(report.entry_count, 1);
}

#[tokio::test]
async fn scenario_transfer_moves_funds_between_accounts() {
    let store = InMemoryStore::new();
    let owner = Uuid::new_v4();
    let source = seeded_account(&store, owner, "1000.00");
    let destination = seeded_account(&store, Uuid::new_v4(), "0.00");

    let engine = BankingEngine::new(store);
    let key = OperationKey::parse("txfer-1").unwrap();

    let result = engine
        .transfer(
            owner,
            &source.account_number,
            &destination.account_number,
            dec("300.00"),
            None,
            key,
        )
        .await
        .unwrap();

    assert_eq!(result.source_balance.to_string(), "700.00");
    assert_eq!(result.destination_balance.to_string(), "300.00");

    let source_report = Reconciler::reconcile(engine.store(), source.id).await.unwrap();
    let destination_report = Reconciler::reconcile(engine.store(), destination.id).await.unwrap();
    assert!(source_report.reconciled);
    assert!(destination_report.reconciled);
}

#[tokio::test]
async fn scenario_duplicate_operation_key_replays_result() {
    let store = InMemoryStore::new();
    let owner = Uuid::new_v4();
    let account = seeded_account(&store, owner, "0.00");
    let engine = BankingEngine::new(store);
    let key = OperationKey::parse("dep-1").unwrap();

    let first = engine
        .deposit(owner, account.id, dec("50.00"), None, Some(key.clone()))
        .await
        .unwrap();
    let second = engine
        .deposit(owner, account.id, dec("50.00"), None, Some(key))
        .await
        .unwrap();

    assert_eq!(first.journal_entry_id, second.journal_entry_id);
    assert_eq!(second.balance.to_string(), "50.00");
}

#[tokio::test]
async fn scenario_withdraw_beyond_balance_is_rejected() {
    let store = InMemoryStore::new();
    let owner = Uuid::new_v4();
    let account = seeded_account(&store, owner, "10.00");
    let engine = BankingEngine::new(store);

    let err = engine
        .withdraw(owner, account.id, dec("10.01"), None, None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INSUFFICIENT_FUNDS");
}

#[tokio::test]
async fn scenario_transfer_to_frozen_destination_is_rejected() {
    let store = InMemoryStore::new();
    let owner = Uuid::new_v4();
    let source = seeded_account(&store, owner, "200.00");
    let frozen = Account {
        id: Uuid::new_v4(),
        account_number: AccountNumber::generate(AccountType::Savings, chrono::Utc::now().date_naive()),
        owner_user_id: Uuid::new_v4(),
        account_type: AccountType::Savings,
        status: AccountStatus::Frozen,
        cached_balance: Money::zero(),
        currency: "USD".to_string(),
        version: 0,
    };
    let destination_number = frozen.account_number.clone();
    store.seed_account(frozen);

    let engine = BankingEngine::new(store);
    let key = OperationKey::parse("txfer-frozen").unwrap();

    let err = engine
        .transfer(owner, &source.account_number, &destination_number, dec("10.00"), None, key)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ACCOUNT_FROZEN");
}
