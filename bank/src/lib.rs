//! `bank` is the core ledger engine of a small digital bank: an append-only
//! double-entry journal, derived account balances, and a single controlled
//! code path for deposit, withdrawal, and transfer that is atomic,
//! idempotent, and safe under concurrent access.
//!
//! ## Getting started
//!
//! ```rust
//! use bank::amount::{AccountNumber, Money};
//! use bank::engine::BankingEngine;
//! use bank::model::{Account, AccountStatus, AccountType};
//! use bank::store::memory::InMemoryStore;
//! use rust_decimal::Decimal;
//! use std::str::FromStr;
//! use uuid::Uuid;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryStore::new();
//! let owner = Uuid::new_v4();
//! let account = Account {
//!     id: Uuid::new_v4(),
//!     account_number: AccountNumber::generate(AccountType::Checking, chrono::Utc::now().date_naive()),
//!     owner_user_id: owner,
//!     account_type: AccountType::Checking,
//!     status: AccountStatus::Active,
//!     cached_balance: Money::zero(),
//!     currency: "USD".to_string(),
//!     version: 0,
//! };
//! let account_id = account.id;
//! store.seed_account(account);
//!
//! let engine = BankingEngine::new(store);
//! let result = engine
//!     .deposit(owner, account_id, Decimal::from_str("100.00")?, None, None)
//!     .await?;
//! assert_eq!(result.balance.to_string(), "100.00");
//! # Ok(())
//! # }
//! ```

pub mod amount;
pub mod bulk;
pub mod engine;
pub mod error;
pub mod idempotency;
pub mod model;
pub mod reconciler;
pub mod store;
pub mod validator;
