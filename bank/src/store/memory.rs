//! An in-process, in-memory implementation of [`Store`]: plain maps guarded
//! by a mutex, with compare-and-swap commit semantics on top so concurrent
//! callers never silently clobber each other's writes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::amount::{AccountNumber, Money, OperationKey};
use crate::error::{BankError, BankResult};
use crate::model::{
    Account, AccountId, IdempotencyRecord, JournalEntry, TransferId, TransferRecord, UserId,
};
use crate::store::{CommitOutcome, LedgerSummary, Store, StoreTransaction, VersionedAccountUpdate};

#[derive(Default)]
struct StoreData {
    accounts: HashMap<AccountId, Account>,
    account_numbers: HashMap<AccountNumber, AccountId>,
    journal: Vec<JournalEntry>,
    transfers: HashMap<TransferId, TransferRecord>,
    transfer_keys: HashMap<OperationKey, TransferId>,
    idempotency: HashMap<(OperationKey, UserId), IdempotencyRecord>,
}

impl StoreData {
    fn ledger_summary(&self, account_id: AccountId) -> LedgerSummary {
        let matching = self.journal.iter().filter(|e| {
            e.account_id == account_id && matches!(e.status, crate::model::EntryStatus::Completed)
        });
        let mut balance = Money::zero();
        let mut entry_count = 0u64;
        for entry in matching {
            balance = balance.checked_add(entry.amount).expect("ledger sum overflow");
            entry_count += 1;
        }
        LedgerSummary { balance, entry_count }
    }
}

/// The in-memory transactional store. Cheap to clone: all state lives behind
/// an `Arc<Mutex<..>>`, so cloning just shares the same ledger.
#[derive(Clone)]
pub struct InMemoryStore {
    data: Arc<Mutex<StoreData>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore {
            data: Arc::new(Mutex::new(StoreData::default())),
        }
    }

    /// Seeds an account directly, bypassing the engine. Used by tests and
    /// the CLI/demo bootstrap — account creation itself is an external
    /// collaborator relative to the core.
    pub fn seed_account(&self, account: Account) {
        let mut data = self.data.lock().expect("store mutex poisoned");
        data.account_numbers
            .insert(account.account_number.clone(), account.id);
        data.accounts.insert(account.id, account);
    }

    pub fn account_by_number(&self, number: &AccountNumber) -> Option<Account> {
        let data = self.data.lock().expect("store mutex poisoned");
        data.account_numbers
            .get(number)
            .and_then(|id| data.accounts.get(id))
            .cloned()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> BankResult<Box<dyn StoreTransaction + '_>> {
        Ok(Box::new(InMemoryTransaction {
            data: self.data.clone(),
            staged_entries: Vec::new(),
            staged_transfer: None,
            staged_updates: Vec::new(),
            staged_idempotency: Vec::new(),
        }))
    }

    async fn find_account(&self, id: AccountId) -> BankResult<Option<Account>> {
        let data = self.data.lock().expect("store mutex poisoned");
        Ok(data.accounts.get(&id).cloned())
    }

    async fn ledger_summary(&self, account_id: AccountId) -> BankResult<LedgerSummary> {
        let data = self.data.lock().expect("store mutex poisoned");
        Ok(data.ledger_summary(account_id))
    }
}

struct InMemoryTransaction {
    data: Arc<Mutex<StoreData>>,
    staged_entries: Vec<JournalEntry>,
    staged_transfer: Option<TransferRecord>,
    staged_updates: Vec<VersionedAccountUpdate>,
    staged_idempotency: Vec<IdempotencyRecord>,
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn find_account(&mut self, id: AccountId) -> BankResult<Option<Account>> {
        let data = self.data.lock().expect("store mutex poisoned");
        Ok(data.accounts.get(&id).cloned())
    }

    async fn find_account_by_number(
        &mut self,
        number: &AccountNumber,
    ) -> BankResult<Option<Account>> {
        let data = self.data.lock().expect("store mutex poisoned");
        Ok(data
            .account_numbers
            .get(number)
            .and_then(|id| data.accounts.get(id))
            .cloned())
    }

    async fn find_transfer_by_operation_key(
        &mut self,
        key: &OperationKey,
    ) -> BankResult<Option<TransferRecord>> {
        let data = self.data.lock().expect("store mutex poisoned");
        Ok(data
            .transfer_keys
            .get(key)
            .and_then(|id| data.transfers.get(id))
            .cloned())
    }

    async fn find_idempotency_record(
        &mut self,
        key: &OperationKey,
        user_id: UserId,
    ) -> BankResult<Option<IdempotencyRecord>> {
        let data = self.data.lock().expect("store mutex poisoned");
        Ok(data.idempotency.get(&(key.clone(), user_id)).cloned())
    }

    async fn ledger_summary(&mut self, account_id: AccountId) -> BankResult<LedgerSummary> {
        let data = self.data.lock().expect("store mutex poisoned");
        Ok(data.ledger_summary(account_id))
    }

    fn stage_journal_entry(&mut self, entry: JournalEntry) {
        self.staged_entries.push(entry);
    }

    fn stage_transfer(&mut self, transfer: TransferRecord) {
        self.staged_transfer = Some(transfer);
    }

    fn stage_account_update(&mut self, update: VersionedAccountUpdate) {
        self.staged_updates.push(update);
    }

    fn stage_idempotency_record(&mut self, record: IdempotencyRecord) {
        self.staged_idempotency.push(record);
    }

    async fn commit(self: Box<Self>) -> BankResult<CommitOutcome> {
        let mut data = self.data.lock().expect("store mutex poisoned");

        if let Some(transfer) = &self.staged_transfer {
            if data.transfer_keys.contains_key(&transfer.operation_key) {
                return Ok(CommitOutcome::DuplicateTransferKey);
            }
        }

        for update in &self.staged_updates {
            let current = data
                .accounts
                .get(&update.account_id)
                .ok_or_else(|| BankError::StorageError("account vanished mid-transaction".into()))?;
            if current.version != update.expected_version {
                return Ok(CommitOutcome::VersionConflict);
            }
        }

        // All checks passed: apply every staged write atomically.
        for entry in self.staged_entries {
            data.journal.push(entry);
        }
        if let Some(transfer) = self.staged_transfer {
            data.transfer_keys.insert(transfer.operation_key.clone(), transfer.id);
            data.transfers.insert(transfer.id, transfer);
        }
        for update in self.staged_updates {
            if let Some(account) = data.accounts.get_mut(&update.account_id) {
                account.cached_balance = update.new_balance;
                account.version += 1;
            }
        }
        for record in self.staged_idempotency {
            data.idempotency
                .insert((record.operation_key.clone(), record.user_id), record);
        }

        Ok(CommitOutcome::Committed)
    }

    async fn rollback(self: Box<Self>) -> BankResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AccountStatus, AccountType};
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use uuid::Uuid;

    fn fresh_account(balance: &str) -> Account {
        Account {
            id: Uuid::new_v4(),
            account_number: AccountNumber::generate(AccountType::Checking, chrono::Utc::now().date_naive()),
            owner_user_id: Uuid::new_v4(),
            account_type: AccountType::Checking,
            status: AccountStatus::Active,
            cached_balance: Money::from_decimal(Decimal::from_str(balance).unwrap()),
            currency: "USD".into(),
            version: 0,
        }
    }

    #[tokio::test]
    async fn version_conflict_blocks_stale_commit() {
        let store = InMemoryStore::new();
        let account = fresh_account("100.00");
        let id = account.id;
        store.seed_account(account);

        let mut txn = store.begin().await.unwrap();
        txn.stage_account_update(VersionedAccountUpdate {
            account_id: id,
            new_balance: Money::from_decimal(Decimal::from_str("150.00").unwrap()),
            expected_version: 0,
        });
        assert_eq!(txn.commit().await.unwrap(), CommitOutcome::Committed);

        // A second transaction reading the stale version 0 must conflict.
        let mut stale_txn = store.begin().await.unwrap();
        stale_txn.stage_account_update(VersionedAccountUpdate {
            account_id: id,
            new_balance: Money::from_decimal(Decimal::from_str("999.00").unwrap()),
            expected_version: 0,
        });
        assert_eq!(
            stale_txn.commit().await.unwrap(),
            CommitOutcome::VersionConflict
        );

        let reloaded = store.find_account(id).await.unwrap().unwrap();
        assert_eq!(reloaded.version, 1);
        assert_eq!(reloaded.cached_balance.to_string(), "150.00");
    }

    #[tokio::test]
    async fn duplicate_transfer_key_rejected_atomically() {
        let store = InMemoryStore::new();
        let key = OperationKey::parse("dup-key").unwrap();
        let transfer = TransferRecord {
            id: Uuid::new_v4(),
            source_account_id: Uuid::new_v4(),
            destination_account_id: Uuid::new_v4(),
            amount: Money::zero(),
            currency: "USD".into(),
            status: crate::model::TransferStatus::Completed,
            description: "t".into(),
            operation_key: key.clone(),
            failure_reason: None,
            created_at: chrono::Utc::now(),
            completed_at: Some(chrono::Utc::now()),
        };

        let mut txn = store.begin().await.unwrap();
        txn.stage_transfer(transfer.clone());
        assert_eq!(txn.commit().await.unwrap(), CommitOutcome::Committed);

        let mut dup_txn = store.begin().await.unwrap();
        let mut second = transfer;
        second.id = Uuid::new_v4();
        dup_txn.stage_transfer(second);
        assert_eq!(
            dup_txn.commit().await.unwrap(),
            CommitOutcome::DuplicateTransferKey
        );
    }
}
