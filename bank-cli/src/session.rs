//! The interactive REPL: a thin line-oriented front end over the same
//! engine the one-shot subcommands use, so balances persist across commands
//! within a session.

use std::str::FromStr;

use anyhow::{anyhow, Result};
use bank::amount::{AccountNumber, Money, OperationKey};
use bank::engine::BankingEngine;
use bank::model::{Account, AccountStatus, AccountType};
use bank::reconciler::Reconciler;
use bank::store::memory::InMemoryStore;
use rust_decimal::Decimal;
use rustyline::config::Builder;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Editor};
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::ConfigLoad;
use crate::directory::InMemoryDirectory;
use crate::rusty::CliHelper;

pub struct Session {
    settings: ConfigLoad,
    engine: BankingEngine<InMemoryStore>,
    directory: InMemoryDirectory,
}

impl Session {
    pub fn new(settings: ConfigLoad, store: InMemoryStore, directory: InMemoryDirectory) -> Self {
        println!("Welcome to bank-cli.");
        println!("Type `help` for the list of commands, `exit` to quit.\n");
        Session {
            settings,
            engine: BankingEngine::new(store),
            directory,
        }
    }

    fn prompt(&self) -> String {
        let prompt = self.settings.prompt.as_deref().unwrap_or(crate::config::DEFAULT_PROMPT);
        format!("{} > ", prompt.trim_end())
    }

    pub async fn handle_repl(&mut self) {
        let config = Builder::new()
            .completion_prompt_limit(5)
            .completion_type(CompletionType::Circular)
            .build();
        let mut rl = Editor::<CliHelper, DefaultHistory>::with_config(config).unwrap();
        rl.set_helper(Some(CliHelper::new()));
        rl.load_history(&history_path()).ok();

        loop {
            match rl.readline(&self.prompt()) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(line);
                    if line == "exit" || line == "quit" {
                        break;
                    }
                    match self.dispatch(line).await {
                        Ok(output) => println!("{output}"),
                        Err(e) => eprintln!("error: {e}"),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                }
                Err(ReadlineError::Eof) => break,
                Err(e) => {
                    eprintln!("readline error: {e}");
                    break;
                }
            }
        }

        println!("Bye~");
        let _ = rl.save_history(&history_path());
    }

    /// Runs a single line read from a non-interactive input stream (piped
    /// stdin or `--query`).
    pub async fn handle_line(&mut self, line: &str) -> Result<()> {
        let start = Instant::now();
        let output = self.dispatch(line.trim()).await?;
        println!("{output}");
        if self.settings.show_stats.unwrap_or(false) {
            println!("{:.3}", start.elapsed().as_secs_f64());
        }
        Ok(())
    }

    async fn dispatch(&mut self, line: &str) -> Result<String> {
        let mut parts = line.split_whitespace();
        let command = parts.next().ok_or_else(|| anyhow!("empty command"))?;
        let args: Vec<&str> = parts.collect();

        match command {
            "help" => Ok(help_text()),
            "bootstrap" => self.cmd_bootstrap(&args),
            "deposit" => self.cmd_deposit(&args).await,
            "withdraw" => self.cmd_withdraw(&args).await,
            "transfer" => self.cmd_transfer(&args).await,
            "reconcile" => self.cmd_reconcile(&args).await,
            other => Err(anyhow!("unknown command '{other}', try `help`")),
        }
    }

    /// Seeds a fresh Active account with a zero balance. Bootstrap-only:
    /// account creation proper belongs to the out-of-scope registration/KYC
    /// subsystem, so the REPL needs its own way in for interactive testing.
    fn cmd_bootstrap(&self, args: &[&str]) -> Result<String> {
        let [user_id, account_type] = args_array2(args, "bootstrap <user_id> <checking|savings|business>")?;
        let account_type = match account_type {
            "checking" => AccountType::Checking,
            "savings" => AccountType::Savings,
            "business" => AccountType::Business,
            other => return Err(anyhow!("unknown account type '{other}'")),
        };
        let account = Account {
            id: Uuid::new_v4(),
            account_number: AccountNumber::generate(account_type, chrono::Utc::now().date_naive()),
            owner_user_id: Uuid::parse_str(user_id)?,
            account_type,
            status: AccountStatus::Active,
            cached_balance: Money::zero(),
            currency: "USD".to_string(),
            version: 0,
        };
        let (account_id, account_number) = (account.id, account.account_number.clone());
        self.engine.store().seed_account(account);
        Ok(format!("account_id={account_id} account_number={account_number}"))
    }

    async fn cmd_deposit(&self, args: &[&str]) -> Result<String> {
        let [user_id, account_id, amount] = args_array(args, "deposit <user_id> <account_id> <amount>")?;
        let result = self
            .engine
            .deposit(
                Uuid::parse_str(user_id)?,
                Uuid::parse_str(account_id)?,
                Decimal::from_str(amount)?,
                None,
                None,
            )
            .await?;
        Ok(format!("balance={}", result.balance))
    }

    async fn cmd_withdraw(&self, args: &[&str]) -> Result<String> {
        let [user_id, account_id, amount] = args_array(args, "withdraw <user_id> <account_id> <amount>")?;
        let result = self
            .engine
            .withdraw(
                Uuid::parse_str(user_id)?,
                Uuid::parse_str(account_id)?,
                Decimal::from_str(amount)?,
                None,
                None,
            )
            .await?;
        Ok(format!("balance={}", result.balance))
    }

    async fn cmd_transfer(&self, args: &[&str]) -> Result<String> {
        let [user_id, source, destination, amount, key] = args_array5(
            args,
            "transfer <user_id> <source_number> <destination_number> <amount> <operation_key>",
        )?;
        let result = self
            .engine
            .transfer(
                Uuid::parse_str(user_id)?,
                &AccountNumber::from_str(source)?,
                &AccountNumber::from_str(destination)?,
                Decimal::from_str(amount)?,
                None,
                OperationKey::parse(key)?,
            )
            .await?;
        Ok(format!(
            "transfer_id={} source_balance={} destination_balance={}",
            result.transfer_id, result.source_balance, result.destination_balance
        ))
    }

    async fn cmd_reconcile(&self, args: &[&str]) -> Result<String> {
        let [account_id] = args_array1(args, "reconcile <account_id>")?;
        let report = Reconciler::reconcile(self.engine.store(), Uuid::parse_str(account_id)?).await?;
        Ok(format!(
            "reconciled={} cached={} ledger={} entries={}",
            report.reconciled, report.cached_balance, report.ledger_balance, report.entry_count
        ))
    }

    /// Exposes the directory so `bulk` processing can be wired in from
    /// `main` without the session owning file I/O itself.
    pub fn directory(&self) -> &InMemoryDirectory {
        &self.directory
    }

    pub fn engine(&self) -> &BankingEngine<InMemoryStore> {
        &self.engine
    }
}

fn args_array1<'a>(args: &[&'a str], usage: &str) -> Result<[&'a str; 1]> {
    args.try_into().map_err(|_| anyhow!("usage: {usage}"))
}

fn args_array2<'a>(args: &[&'a str], usage: &str) -> Result<[&'a str; 2]> {
    args.try_into().map_err(|_| anyhow!("usage: {usage}"))
}

fn args_array<'a>(args: &[&'a str], usage: &str) -> Result<[&'a str; 3]> {
    args.try_into().map_err(|_| anyhow!("usage: {usage}"))
}

fn args_array5<'a>(args: &[&'a str], usage: &str) -> Result<[&'a str; 5]> {
    args.try_into().map_err(|_| anyhow!("usage: {usage}"))
}

fn help_text() -> String {
    [
        "commands:",
        "  bootstrap <user_id> <checking|savings|business>",
        "  deposit <user_id> <account_id> <amount>",
        "  withdraw <user_id> <account_id> <amount>",
        "  transfer <user_id> <source_number> <destination_number> <amount> <operation_key>",
        "  reconcile <account_id>",
        "  exit | quit",
    ]
    .join("\n")
}

fn history_path() -> String {
    format!(
        "{}/.bank_cli_history",
        std::env::var("HOME").unwrap_or_else(|_| ".".to_string())
    )
}
