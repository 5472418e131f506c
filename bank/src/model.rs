//! The ledger data model: accounts, journal entries, transfer
//! records, and idempotency records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::amount::{AccountNumber, Money, OperationKey};

pub type AccountId = Uuid;
pub type JournalEntryId = Uuid;
pub type TransferId = Uuid;
pub type UserId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
    Checking,
    Savings,
    Business,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    Active,
    Frozen,
    Closed,
}

/// An account. Status transitions are driven by an external collaborator;
/// the engine never changes `status`, only `cached_balance` and `version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub account_number: AccountNumber,
    pub owner_user_id: UserId,
    pub account_type: AccountType,
    pub status: AccountStatus,
    pub cached_balance: Money,
    pub currency: String,
    /// Monotonic optimistic-concurrency version. Advanced only by the
    /// engine's update-with-version-check.
    pub version: u64,
}

impl Account {
    pub fn is_active(&self) -> bool {
        matches!(self.status, AccountStatus::Active)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    Deposit,
    Withdrawal,
    TransferDebit,
    TransferCredit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    Completed,
    Failed,
    Reversed,
}

/// An append-only journal entry. Once written with status `Completed` it is
/// never updated or deleted; reversals are expressed as a fresh compensating
/// entry, never an edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: JournalEntryId,
    pub account_id: AccountId,
    /// Positive = credit, negative = debit.
    pub amount: Money,
    pub kind: EntryKind,
    pub status: EntryStatus,
    pub balance_after: Money,
    pub transfer_id: Option<TransferId>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStatus {
    /// Ephemeral: no committed row in the current code paths ever bears this
    /// status — kept as a modeled state for a future two-phase flow.
    Pending,
    Completed,
    Failed,
}

/// Identifies the two legs of a transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub id: TransferId,
    pub source_account_id: AccountId,
    pub destination_account_id: AccountId,
    pub amount: Money,
    pub currency: String,
    pub status: TransferStatus,
    pub description: String,
    pub operation_key: OperationKey,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Deduplicates a retried operation, keyed uniquely by
/// `(operation_key, user_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub operation_key: OperationKey,
    pub user_id: UserId,
    pub operation_path: String,
    pub completed: bool,
    pub response_body: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
