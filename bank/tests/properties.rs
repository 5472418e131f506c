//! Invariant properties the engine must hold under concurrent and repeated
//! use: balances track the ledger, transfers conserve value, balances never
//! go negative, replays are stable, versions only increase, the journal is
//! append-only, and concurrent writers never lose an update.

use bank::amount::{AccountNumber, Money, OperationKey};
use bank::engine::BankingEngine;
use bank::model::{Account, AccountStatus, AccountType};
use bank::reconciler::Reconciler;
use bank::store::memory::InMemoryStore;
use bank::store::Store;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
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

/// P1: a successful deposit/withdraw always leaves the cached balance equal
/// to the ledger-derived sum.
#[tokio::test]
async fn p1_balance_matches_ledger_after_each_operation() {
    let store = InMemoryStore::new();
    let owner = Uuid::new_v4();
    let account = seeded_account(&store, owner, "100.00");
    let engine = BankingEngine::new(store);

    engine.deposit(owner, account.id, dec("50.00"), None, None).await.unwrap();
    engine.withdraw(owner, account.id, dec("30.00"), None, None).await.unwrap();

    let report = Reconciler::reconcile(engine.store(), account.id).await.unwrap();
    assert!(report.reconciled);
    assert_eq!(report.ledger_balance.to_string(), "120.00");
}

/// P2: a transfer's debit and credit legs always sum to zero.
#[tokio::test]
async fn p2_transfer_legs_conserve_total_value() {
    let store = InMemoryStore::new();
    let owner = Uuid::new_v4();
    let source = seeded_account(&store, owner, "500.00");
    let destination = seeded_account(&store, Uuid::new_v4(), "500.00");
    let engine = BankingEngine::new(store);
    let key = OperationKey::parse("p2").unwrap();

    engine
        .transfer(owner, &source.account_number, &destination.account_number, dec("200.00"), None, key)
        .await
        .unwrap();

    let source_report = Reconciler::reconcile(engine.store(), source.id).await.unwrap();
    let destination_report = Reconciler::reconcile(engine.store(), destination.id).await.unwrap();
    let total = source_report.ledger_balance.as_decimal() + destination_report.ledger_balance.as_decimal();
    assert_eq!(total, dec("1000.00"));
}

/// P3: balances never go negative.
#[tokio::test]
async fn p3_balance_never_negative() {
    let store = InMemoryStore::new();
    let owner = Uuid::new_v4();
    let account = seeded_account(&store, owner, "5.00");
    let engine = BankingEngine::new(store);

    let err = engine
        .withdraw(owner, account.id, dec("5.01"), None, None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INSUFFICIENT_FUNDS");

    let report = Reconciler::reconcile(engine.store(), account.id).await.unwrap();
    assert!(!report.ledger_balance.is_negative());
}

/// P4: a repeated operation key always yields the same result, never a
/// second application.
#[tokio::test]
async fn p4_idempotent_replay_is_stable() {
    let store = InMemoryStore::new();
    let owner = Uuid::new_v4();
    let account = seeded_account(&store, owner, "0.00");
    let engine = BankingEngine::new(store);
    let key = OperationKey::parse("p4").unwrap();

    for _ in 0..5 {
        let result = engine
            .deposit(owner, account.id, dec("10.00"), None, Some(key.clone()))
            .await
            .unwrap();
        assert_eq!(result.balance.to_string(), "10.00");
    }
}

/// P5: an account's version strictly increases by one per committed write.
#[tokio::test]
async fn p5_version_increments_monotonically() {
    let store = InMemoryStore::new();
    let owner = Uuid::new_v4();
    let account = seeded_account(&store, owner, "0.00");
    let engine = BankingEngine::new(store);

    for _ in 0..3 {
        engine.deposit(owner, account.id, dec("1.00"), None, None).await.unwrap();
    }

    let reloaded = engine.store().find_account(account.id).await.unwrap().unwrap();
    assert_eq!(reloaded.version, 3);
}

/// P6: journal entries are append-only — the count only grows.
#[tokio::test]
async fn p6_journal_is_append_only() {
    let store = InMemoryStore::new();
    let owner = Uuid::new_v4();
    let account = seeded_account(&store, owner, "0.00");
    let engine = BankingEngine::new(store);

    engine.deposit(owner, account.id, dec("1.00"), None, None).await.unwrap();
    let after_one = Reconciler::reconcile(engine.store(), account.id).await.unwrap().entry_count;
    engine.deposit(owner, account.id, dec("1.00"), None, None).await.unwrap();
    let after_two = Reconciler::reconcile(engine.store(), account.id).await.unwrap().entry_count;

    assert_eq!(after_one, 1);
    assert_eq!(after_two, 2);
}

/// P7: concurrent writers to the same account never lose an update — OCC
/// retries absorb every conflict so the final balance reflects every
/// successful attempt.
#[tokio::test]
async fn p7_concurrent_deposits_are_not_lost() {
    let store = InMemoryStore::new();
    let owner = Uuid::new_v4();
    let account = seeded_account(&store, owner, "0.00");
    let engine = Arc::new(BankingEngine::new(store));

    let mut handles = Vec::new();
    for _ in 0..10 {
        let engine = engine.clone();
        let account_id = account.id;
        handles.push(tokio::spawn(async move {
            engine.deposit(owner, account_id, dec("1.00"), None, None).await.unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let reloaded = engine.store().find_account(account.id).await.unwrap().unwrap();
    assert_eq!(reloaded.cached_balance.to_string(), "10.00");
    assert_eq!(reloaded.version, 10);
}
