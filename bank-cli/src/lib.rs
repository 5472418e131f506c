//! `bank-cli`: subcommands and a REPL over the core banking engine.
//!
//! ## Getting started
//!
//! ```doc
//! ❯ bank-cli
//! Welcome to bank-cli.
//! bank > help
//! commands:
//!   deposit <user_id> <account_id> <amount>
//!   withdraw <user_id> <account_id> <amount>
//!   transfer <user_id> <source_number> <destination_number> <amount> <operation_key>
//!   reconcile <account_id>
//!   exit | quit
//! ```

pub mod command;
pub mod config;
pub mod directory;
pub mod logging;
pub mod rusty;
pub mod session;
