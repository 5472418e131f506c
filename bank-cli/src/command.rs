//! One-shot subcommands for local, single-process operation. Each variant
//! forwards straight to the library after taking a `--user-id` the same way
//! an authenticated transport would inject one after its own auth/role
//! checks.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use bank::amount::{AccountNumber, OperationKey};
use bank::bulk::BulkProcessor;
use bank::engine::BankingEngine;
use bank::model::{Account, AccountStatus, AccountType};
use bank::reconciler::Reconciler;
use bank::store::memory::InMemoryStore;
use clap::Subcommand;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::directory::InMemoryDirectory;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Opens a fresh Active account, owned by `--user-id`, with a zero
    /// balance. Bootstrap-only: account creation proper belongs to the
    /// out-of-scope registration/KYC subsystem.
    BootstrapAccount {
        #[clap(long)]
        user_id: Uuid,
        #[clap(long, value_enum)]
        account_type: CliAccountType,
        /// National ID to register in the bulk-processor directory, if any.
        #[clap(long)]
        national_id: Option<String>,
    },

    Deposit {
        #[clap(long)]
        user_id: Uuid,
        #[clap(long)]
        account_id: Uuid,
        #[clap(long)]
        amount: Decimal,
        #[clap(long)]
        description: Option<String>,
        #[clap(long)]
        operation_key: Option<String>,
    },

    Withdraw {
        #[clap(long)]
        user_id: Uuid,
        #[clap(long)]
        account_id: Uuid,
        #[clap(long)]
        amount: Decimal,
        #[clap(long)]
        description: Option<String>,
        #[clap(long)]
        operation_key: Option<String>,
    },

    Transfer {
        #[clap(long)]
        user_id: Uuid,
        #[clap(long)]
        source: String,
        #[clap(long)]
        destination: String,
        #[clap(long)]
        amount: Decimal,
        #[clap(long)]
        description: Option<String>,
        #[clap(long)]
        operation_key: String,
    },

    Reconcile {
        #[clap(long)]
        account_id: Uuid,
    },

    ProcessBulk {
        #[clap(long)]
        file: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliAccountType {
    Checking,
    Savings,
    Business,
}

impl From<CliAccountType> for AccountType {
    fn from(value: CliAccountType) -> Self {
        match value {
            CliAccountType::Checking => AccountType::Checking,
            CliAccountType::Savings => AccountType::Savings,
            CliAccountType::Business => AccountType::Business,
        }
    }
}

/// Executes one subcommand against a freshly-built in-memory engine.
/// Since the store is in-memory and per-process, every non-REPL invocation
/// starts from an empty ledger — this mirrors a demo/dev deployment, not a
/// production one backed by a durable `Store`.
pub async fn run(command: Command, store: InMemoryStore, directory: &InMemoryDirectory) -> Result<()> {
    let engine = BankingEngine::new(store);

    match command {
        Command::BootstrapAccount {
            user_id,
            account_type,
            national_id,
        } => {
            let account_type = account_type.into();
            let account = Account {
                id: Uuid::new_v4(),
                account_number: AccountNumber::generate(account_type, chrono::Utc::now().date_naive()),
                owner_user_id: user_id,
                account_type,
                status: AccountStatus::Active,
                cached_balance: bank::amount::Money::zero(),
                currency: "USD".to_string(),
                version: 0,
            };
            let account_id = account.id;
            engine.store().seed_account(account.clone());
            if let Some(national_id) = national_id {
                directory.register(national_id, user_id, account_id);
            }
            println!("account_id={account_id} account_number={}", account.account_number);
        }

        Command::Deposit {
            user_id,
            account_id,
            amount,
            description,
            operation_key,
        } => {
            let key = operation_key.map(OperationKey::parse).transpose()?;
            let result = engine.deposit(user_id, account_id, amount, description, key).await?;
            println!("balance={}", result.balance);
        }

        Command::Withdraw {
            user_id,
            account_id,
            amount,
            description,
            operation_key,
        } => {
            let key = operation_key.map(OperationKey::parse).transpose()?;
            let result = engine.withdraw(user_id, account_id, amount, description, key).await?;
            println!("balance={}", result.balance);
        }

        Command::Transfer {
            user_id,
            source,
            destination,
            amount,
            description,
            operation_key,
        } => {
            let source: AccountNumber = source.parse()?;
            let destination: AccountNumber = destination.parse()?;
            let key = OperationKey::parse(operation_key)?;
            let result = engine
                .transfer(user_id, &source, &destination, amount, description, key)
                .await?;
            println!(
                "transfer_id={} source_balance={} destination_balance={}",
                result.transfer_id, result.source_balance, result.destination_balance
            );
        }

        Command::Reconcile { account_id } => {
            let report = Reconciler::reconcile(engine.store(), account_id).await?;
            println!(
                "reconciled={} cached={} ledger={} entries={}",
                report.reconciled, report.cached_balance, report.ledger_balance, report.entry_count
            );
        }

        Command::ProcessBulk { file } => {
            let metadata = std::fs::metadata(&file)?;
            let reader = File::open(&file)?;
            let file_name = file
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| anyhow!("bulk file path has no file name"))?;
            let report = BulkProcessor::process(
                &engine,
                directory,
                reader,
                file_name,
                chrono::Utc::now().timestamp(),
                metadata.len(),
            )
            .await?;
            println!(
                "processed={} applied={} rejected={}",
                report.rows_processed, report.rows_applied, report.rows_rejected
            );
            for row in &report.rows {
                println!("  row {}: {:?}", row.row_number, row.outcome);
            }
        }
    }

    Ok(())
}
