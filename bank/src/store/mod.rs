//! The store abstraction: a narrow transactional interface the engine
//! requires. The only implementation shipped here is
//! [`memory::InMemoryStore`], an in-memory transactional engine that keeps
//! the core testable without a real relational database; a durable
//! implementation can be added later behind the same trait.

pub mod memory;

use async_trait::async_trait;

use crate::amount::{AccountNumber, Money, OperationKey};
use crate::error::BankResult;
use crate::model::{Account, AccountId, IdempotencyRecord, JournalEntry, TransferRecord, UserId};

/// The outcome of attempting to commit a transaction's buffered writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// At least one touched account's version no longer matched the value
    /// read at the start of the attempt.
    VersionConflict,
    /// A transfer with this operation key already exists — the unique
    /// constraint on transfer operation keys caught a race the idempotency
    /// layer's own check missed.
    DuplicateTransferKey,
}

/// A pending account mutation staged inside a transaction: the new state to
/// write, and the version the row must currently hold for the write to
/// succeed.
#[derive(Debug, Clone)]
pub struct VersionedAccountUpdate {
    pub account_id: AccountId,
    pub new_balance: Money,
    pub expected_version: u64,
}

/// The ledger-derived view of an account: the sum of its Completed journal
/// entries and how many there are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSummary {
    pub balance: Money,
    pub entry_count: u64,
}

/// A store-backed transaction. All reads observe the committed state of the
/// store at call time; all writes are staged and applied atomically — or not
/// at all — by [`commit`](StoreTransaction::commit).
#[async_trait]
pub trait StoreTransaction: Send {
    async fn find_account(&mut self, id: AccountId) -> BankResult<Option<Account>>;

    async fn find_account_by_number(
        &mut self,
        number: &AccountNumber,
    ) -> BankResult<Option<Account>>;

    async fn find_transfer_by_operation_key(
        &mut self,
        key: &OperationKey,
    ) -> BankResult<Option<TransferRecord>>;

    async fn find_idempotency_record(
        &mut self,
        key: &OperationKey,
        user_id: UserId,
    ) -> BankResult<Option<IdempotencyRecord>>;

    /// Ledger-derived balance and entry count for `account_id` (used by the
    /// reconciler).
    async fn ledger_summary(&mut self, account_id: AccountId) -> BankResult<LedgerSummary>;

    /// Stages a journal entry for this transaction's commit.
    fn stage_journal_entry(&mut self, entry: JournalEntry);

    /// Stages a transfer record for this transaction's commit.
    fn stage_transfer(&mut self, transfer: TransferRecord);

    /// Stages an account balance update, conditional on `expected_version`
    /// still matching at commit time.
    fn stage_account_update(&mut self, update: VersionedAccountUpdate);

    /// Stages an idempotency record upsert.
    fn stage_idempotency_record(&mut self, record: IdempotencyRecord);

    /// Applies every staged write atomically, re-validating account versions
    /// and the transfer operation-key uniqueness constraint at this point —
    /// a true compare-and-swap, not a read-then-write.
    async fn commit(self: Box<Self>) -> BankResult<CommitOutcome>;

    /// Discards every staged write. A no-op for the in-memory store, since
    /// staged writes never touch shared state before `commit`.
    async fn rollback(self: Box<Self>) -> BankResult<()>;
}

/// The store itself: something that can hand out transactions.
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> BankResult<Box<dyn StoreTransaction + '_>>;

    /// Convenience read-only accessor used by the reconciler, which queries
    /// the account directly without going through the engine's
    /// transaction/retry machinery.
    async fn find_account(&self, id: AccountId) -> BankResult<Option<Account>>;

    async fn ledger_summary(&self, account_id: AccountId) -> BankResult<LedgerSummary>;
}
