use bank::amount::{AccountNumber, Money, OperationKey};
use bank::engine::BankingEngine;
use bank::model::{Account, AccountStatus, AccountType};
use bank::reconciler::Reconciler;
use bank::store::memory::InMemoryStore;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("Hello, bank!");
    run().await?;
    println!("Bye~");
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let store = InMemoryStore::new();
    let owner = Uuid::new_v4();
    let today = chrono::Utc::now().date_naive();

    let checking = Account {
        id: Uuid::new_v4(),
        account_number: AccountNumber::generate(AccountType::Checking, today),
        owner_user_id: owner,
        account_type: AccountType::Checking,
        status: AccountStatus::Active,
        cached_balance: Money::zero(),
        currency: "USD".to_string(),
        version: 0,
    };
    let savings = Account {
        id: Uuid::new_v4(),
        account_number: AccountNumber::generate(AccountType::Savings, today),
        owner_user_id: owner,
        account_type: AccountType::Savings,
        status: AccountStatus::Active,
        cached_balance: Money::zero(),
        currency: "USD".to_string(),
        version: 0,
    };
    let (checking_id, savings_id) = (checking.id, savings.id);
    let (checking_number, savings_number) = (checking.account_number.clone(), savings.account_number.clone());
    store.seed_account(checking);
    store.seed_account(savings);

    let engine = BankingEngine::new(store);

    let deposit = engine
        .deposit(owner, checking_id, Decimal::from_str("1000.00")?, Some("Paycheck".into()), None)
        .await?;
    println!("deposit -> balance={}", deposit.balance);

    let withdraw = engine
        .withdraw(owner, checking_id, Decimal::from_str("40.00")?, Some("Groceries".into()), None)
        .await?;
    println!("withdraw -> balance={}", withdraw.balance);

    let transfer = engine
        .transfer(
            owner,
            &checking_number,
            &savings_number,
            Decimal::from_str("200.00")?,
            Some("Move to savings".into()),
            OperationKey::parse("demo-transfer-1")?,
        )
        .await?;
    println!(
        "transfer -> source_balance={} destination_balance={}",
        transfer.source_balance, transfer.destination_balance
    );

    let checking_report = Reconciler::reconcile(engine.store(), checking_id).await?;
    let savings_report = Reconciler::reconcile(engine.store(), savings_id).await?;
    println!(
        "reconcile checking -> reconciled={} ledger={}",
        checking_report.reconciled, checking_report.ledger_balance
    );
    println!(
        "reconcile savings -> reconciled={} ledger={}",
        savings_report.reconciled, savings_report.ledger_balance
    );

    Ok(())
}
