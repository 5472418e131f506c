//! The banking engine: the only component that writes journal entries or
//! mutates account rows. Wraps each operation in a store transaction,
//! validates, writes, commits, and retries on OCC conflict.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::amount::{AccountNumber, Money, OperationKey};
use crate::error::{BankError, BankResult};
use crate::idempotency::{self, IdempotencyDecision};
use crate::model::{
    AccountId, EntryKind, EntryStatus, JournalEntry, TransferRecord, TransferStatus, UserId,
};
use crate::store::{CommitOutcome, Store, StoreTransaction, VersionedAccountUpdate};
use crate::validator::Validator;

/// Up to 3 total attempts per operation.
const MAX_ATTEMPTS: u32 = 3;
/// `50 x 2^(attempt-1)` ms: 50, 100, 200.
const BASE_BACKOFF_MS: u64 = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositResult {
    pub account_id: AccountId,
    pub journal_entry_id: Uuid,
    pub balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawResult {
    pub account_id: AccountId,
    pub journal_entry_id: Uuid,
    pub balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResult {
    pub transfer_id: Uuid,
    pub source_balance: Money,
    pub destination_balance: Money,
    pub created_at: chrono::DateTime<Utc>,
    pub completed_at: chrono::DateTime<Utc>,
}

/// The stateless orchestrator over a [`Store`]. All mutable state lives in
/// the store; the engine itself holds nothing but a handle to it.
pub struct BankingEngine<S: Store> {
    store: S,
}

impl<S: Store> BankingEngine<S> {
    pub fn new(store: S) -> Self {
        BankingEngine { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Deposit. `description` defaults to "Cash deposit" when empty.
    pub async fn deposit(
        &self,
        user_id: UserId,
        account_id: AccountId,
        amount: Decimal,
        description: Option<String>,
        operation_key: Option<OperationKey>,
    ) -> BankResult<DepositResult> {
        let amount = Validator::validate_amount(amount)?;
        let description = non_empty_or(description, "Cash deposit");

        if let Some(key) = &operation_key {
            match self.consult_idempotency(user_id, key).await? {
                Some(IdempotencyDecision::Replay(body)) => {
                    return Ok(serde_json::from_value(body)
                        .map_err(|e| BankError::StorageError(e.to_string()))?);
                }
                Some(IdempotencyDecision::InFlight) => {
                    return Err(BankError::DuplicateOperation(key.to_string()));
                }
                Some(IdempotencyDecision::Proceed) | None => {}
            }
        }

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.try_deposit(user_id, account_id, amount, &description).await? {
                Ok(result) => {
                    self.record_if_keyed(
                        user_id,
                        operation_key.as_ref(),
                        "deposit",
                        &result,
                    )
                    .await;
                    log::info!(
                        "deposit completed: account={account_id} amount={amount} balance={}",
                        result.balance
                    );
                    return Ok(result);
                }
                Err(CommitOutcome::VersionConflict) => {
                    if attempt >= MAX_ATTEMPTS {
                        return Err(BankError::ConcurrencyConflict { attempts: attempt });
                    }
                    backoff(attempt).await;
                }
                Err(CommitOutcome::DuplicateTransferKey) => unreachable!("deposits don't touch transfers"),
                Err(CommitOutcome::Committed) => unreachable!(),
            }
        }
    }

    async fn try_deposit(
        &self,
        user_id: UserId,
        account_id: AccountId,
        amount: Money,
        description: &str,
    ) -> BankResult<Result<DepositResult, CommitOutcome>> {
        let mut txn = self.store.begin().await?;
        let (entry_id, new_balance) =
            match Self::prepare_deposit(txn.as_mut(), user_id, account_id, amount, description).await {
                Ok(staged) => staged,
                Err(e) => {
                    txn.rollback().await?;
                    return Err(e);
                }
            };

        match txn.commit().await? {
            CommitOutcome::Committed => Ok(Ok(DepositResult {
                account_id,
                journal_entry_id: entry_id,
                balance: new_balance,
            })),
            other => Ok(Err(other)),
        }
    }

    /// Reads the account and stages a deposit's writes without committing.
    /// Isolated so `try_deposit` can roll the transaction back on any error
    /// raised here instead of just dropping it.
    async fn prepare_deposit(
        txn: &mut (dyn StoreTransaction + '_),
        user_id: UserId,
        account_id: AccountId,
        amount: Money,
        description: &str,
    ) -> BankResult<(Uuid, Money)> {
        let account = txn
            .find_account(account_id)
            .await?
            .ok_or_else(|| BankError::AccountNotFound(account_id.to_string()))?;
        Validator::validate_owned_active_account(&account, user_id)?;

        let new_balance = account
            .cached_balance
            .checked_add(amount)
            .ok_or_else(|| BankError::StorageError("balance overflow".into()))?;

        let entry_id = Uuid::new_v4();
        txn.stage_journal_entry(JournalEntry {
            id: entry_id,
            account_id,
            amount,
            kind: EntryKind::Deposit,
            status: EntryStatus::Completed,
            balance_after: new_balance,
            transfer_id: None,
            description: description.to_string(),
            created_at: Utc::now(),
        });
        txn.stage_account_update(VersionedAccountUpdate {
            account_id,
            new_balance,
            expected_version: account.version,
        });

        Ok((entry_id, new_balance))
    }

    /// Withdraw.
    pub async fn withdraw(
        &self,
        user_id: UserId,
        account_id: AccountId,
        amount: Decimal,
        description: Option<String>,
        operation_key: Option<OperationKey>,
    ) -> BankResult<WithdrawResult> {
        let amount = Validator::validate_amount(amount)?;
        let description = non_empty_or(description, "Cash withdrawal");

        if let Some(key) = &operation_key {
            match self.consult_idempotency(user_id, key).await? {
                Some(IdempotencyDecision::Replay(body)) => {
                    return Ok(serde_json::from_value(body)
                        .map_err(|e| BankError::StorageError(e.to_string()))?);
                }
                Some(IdempotencyDecision::InFlight) => {
                    return Err(BankError::DuplicateOperation(key.to_string()));
                }
                Some(IdempotencyDecision::Proceed) | None => {}
            }
        }

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.try_withdraw(user_id, account_id, amount, &description).await? {
                Ok(result) => {
                    self.record_if_keyed(user_id, operation_key.as_ref(), "withdraw", &result)
                        .await;
                    log::info!(
                        "withdraw completed: account={account_id} amount={amount} balance={}",
                        result.balance
                    );
                    return Ok(result);
                }
                Err(CommitOutcome::VersionConflict) => {
                    if attempt >= MAX_ATTEMPTS {
                        return Err(BankError::ConcurrencyConflict { attempts: attempt });
                    }
                    backoff(attempt).await;
                }
                Err(other) => unreachable!("withdraws don't touch transfers: {other:?}"),
            }
        }
    }

    async fn try_withdraw(
        &self,
        user_id: UserId,
        account_id: AccountId,
        amount: Money,
        description: &str,
    ) -> BankResult<Result<WithdrawResult, CommitOutcome>> {
        let mut txn = self.store.begin().await?;
        let (entry_id, new_balance) =
            match Self::prepare_withdraw(txn.as_mut(), user_id, account_id, amount, description).await {
                Ok(staged) => staged,
                Err(e) => {
                    txn.rollback().await?;
                    return Err(e);
                }
            };

        match txn.commit().await? {
            CommitOutcome::Committed => Ok(Ok(WithdrawResult {
                account_id,
                journal_entry_id: entry_id,
                balance: new_balance,
            })),
            other => Ok(Err(other)),
        }
    }

    /// Reads the account and stages a withdrawal's writes without
    /// committing. Isolated so `try_withdraw` can roll the transaction back
    /// on any error raised here instead of just dropping it.
    async fn prepare_withdraw(
        txn: &mut (dyn StoreTransaction + '_),
        user_id: UserId,
        account_id: AccountId,
        amount: Money,
        description: &str,
    ) -> BankResult<(Uuid, Money)> {
        let account = txn
            .find_account(account_id)
            .await?
            .ok_or_else(|| BankError::AccountNotFound(account_id.to_string()))?;
        Validator::validate_owned_active_account(&account, user_id)?;
        Validator::validate_sufficient_funds(&account, amount)?;

        let new_balance = account
            .cached_balance
            .checked_sub(amount)
            .ok_or_else(|| BankError::StorageError("balance underflow".into()))?;

        let entry_id = Uuid::new_v4();
        txn.stage_journal_entry(JournalEntry {
            id: entry_id,
            account_id,
            amount: amount.negate(),
            kind: EntryKind::Withdrawal,
            status: EntryStatus::Completed,
            balance_after: new_balance,
            transfer_id: None,
            description: description.to_string(),
            created_at: Utc::now(),
        });
        txn.stage_account_update(VersionedAccountUpdate {
            account_id,
            new_balance,
            expected_version: account.version,
        });

        Ok((entry_id, new_balance))
    }

    /// Transfer. The operation key is required.
    #[allow(clippy::too_many_arguments)]
    pub async fn transfer(
        &self,
        user_id: UserId,
        source_number: &AccountNumber,
        destination_number: &AccountNumber,
        amount: Decimal,
        description: Option<String>,
        operation_key: OperationKey,
    ) -> BankResult<TransferResult> {
        let amount = Validator::validate_amount(amount)?;
        let description = non_empty_or(description, "Transfer");

        match self
            .consult_idempotency(user_id, &operation_key)
            .await?
        {
            Some(IdempotencyDecision::Replay(body)) => {
                return Ok(serde_json::from_value(body)
                    .map_err(|e| BankError::StorageError(e.to_string()))?);
            }
            Some(IdempotencyDecision::InFlight) => {
                return Err(BankError::DuplicateOperation(operation_key.to_string()));
            }
            Some(IdempotencyDecision::Proceed) | None => {}
        }

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self
                .try_transfer(
                    user_id,
                    source_number,
                    destination_number,
                    amount,
                    &description,
                    &operation_key,
                )
                .await?
            {
                Ok(result) => {
                    self.record_if_keyed(
                        user_id,
                        Some(&operation_key),
                        "transfer",
                        &result,
                    )
                    .await;
                    log::info!(
                        "transfer completed: id={} amount={amount} source_balance={} dest_balance={}",
                        result.transfer_id,
                        result.source_balance,
                        result.destination_balance
                    );
                    return Ok(result);
                }
                Err(CommitOutcome::VersionConflict) => {
                    if attempt >= MAX_ATTEMPTS {
                        return Err(BankError::ConcurrencyConflict { attempts: attempt });
                    }
                    backoff(attempt).await;
                }
                Err(CommitOutcome::DuplicateTransferKey) => {
                    return Err(BankError::DuplicateOperation(operation_key.to_string()));
                }
                Err(CommitOutcome::Committed) => unreachable!(),
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn try_transfer(
        &self,
        user_id: UserId,
        source_number: &AccountNumber,
        destination_number: &AccountNumber,
        amount: Money,
        description: &str,
        operation_key: &OperationKey,
    ) -> BankResult<Result<TransferResult, CommitOutcome>> {
        let mut txn = self.store.begin().await?;
        let staged = Self::prepare_transfer(
            txn.as_mut(),
            user_id,
            source_number,
            destination_number,
            amount,
            description,
            operation_key,
        )
        .await;
        let (transfer_id, source_new_balance, destination_new_balance, now) = match staged {
            Ok(staged) => staged,
            Err(e) => {
                txn.rollback().await?;
                return Err(e);
            }
        };

        match txn.commit().await? {
            CommitOutcome::Committed => Ok(Ok(TransferResult {
                transfer_id,
                source_balance: source_new_balance,
                destination_balance: destination_new_balance,
                created_at: now,
                completed_at: now,
            })),
            other => Ok(Err(other)),
        }
    }

    /// Reads both accounts and stages a transfer's writes without
    /// committing. Isolated so `try_transfer` can roll the transaction back
    /// on any error raised here instead of just dropping it.
    #[allow(clippy::too_many_arguments)]
    async fn prepare_transfer(
        txn: &mut (dyn StoreTransaction + '_),
        user_id: UserId,
        source_number: &AccountNumber,
        destination_number: &AccountNumber,
        amount: Money,
        description: &str,
        operation_key: &OperationKey,
    ) -> BankResult<(Uuid, Money, Money, chrono::DateTime<Utc>)> {
        // Redundant defense against the idempotency layer's own race window:
        // two concurrent duplicates can both observe Proceed.
        if txn
            .find_transfer_by_operation_key(operation_key)
            .await?
            .is_some()
        {
            return Err(BankError::DuplicateOperation(operation_key.to_string()));
        }

        let source = txn
            .find_account_by_number(source_number)
            .await?
            .ok_or_else(|| BankError::AccountNotFound(source_number.to_string()))?;
        let destination = txn
            .find_account_by_number(destination_number)
            .await?
            .ok_or_else(|| BankError::AccountNotFound(destination_number.to_string()))?;

        Validator::validate_transfer(&source, &destination, user_id, amount)?;

        let source_new_balance = source
            .cached_balance
            .checked_sub(amount)
            .ok_or_else(|| BankError::StorageError("balance underflow".into()))?;
        let destination_new_balance = destination
            .cached_balance
            .checked_add(amount)
            .ok_or_else(|| BankError::StorageError("balance overflow".into()))?;

        let transfer_id = Uuid::new_v4();
        let now = Utc::now();

        txn.stage_transfer(TransferRecord {
            id: transfer_id,
            source_account_id: source.id,
            destination_account_id: destination.id,
            amount,
            currency: source.currency.clone(),
            status: TransferStatus::Completed,
            description: description.to_string(),
            operation_key: operation_key.clone(),
            failure_reason: None,
            created_at: now,
            completed_at: Some(now),
        });

        txn.stage_journal_entry(JournalEntry {
            id: Uuid::new_v4(),
            account_id: source.id,
            amount: amount.negate(),
            kind: EntryKind::TransferDebit,
            status: EntryStatus::Completed,
            balance_after: source_new_balance,
            transfer_id: Some(transfer_id),
            description: format!("Transfer to {destination_number}"),
            created_at: now,
        });
        txn.stage_journal_entry(JournalEntry {
            id: Uuid::new_v4(),
            account_id: destination.id,
            amount,
            kind: EntryKind::TransferCredit,
            status: EntryStatus::Completed,
            balance_after: destination_new_balance,
            transfer_id: Some(transfer_id),
            description: format!("Transfer from {source_number}"),
            created_at: now,
        });

        txn.stage_account_update(VersionedAccountUpdate {
            account_id: source.id,
            new_balance: source_new_balance,
            expected_version: source.version,
        });
        txn.stage_account_update(VersionedAccountUpdate {
            account_id: destination.id,
            new_balance: destination_new_balance,
            expected_version: destination.version,
        });

        Ok((transfer_id, source_new_balance, destination_new_balance, now))
    }

    async fn consult_idempotency(
        &self,
        user_id: UserId,
        key: &OperationKey,
    ) -> BankResult<Option<IdempotencyDecision>> {
        let mut txn = self.store.begin().await?;
        let existing = txn.find_idempotency_record(key, user_id).await?;
        Ok(Some(idempotency::decide(existing.as_ref())))
    }

    async fn record_if_keyed<T: Serialize>(
        &self,
        user_id: UserId,
        key: Option<&OperationKey>,
        path: &str,
        result: &T,
    ) {
        let Some(key) = key else { return };
        let body = match serde_json::to_value(result) {
            Ok(v) => v,
            Err(_) => return,
        };
        let record = idempotency::completed_record(user_id, path, key.clone(), body, Utc::now());
        // Best-effort: a failure to record only weakens replay semantics
        // for this key, it never fails the operation.
        if let Ok(mut txn) = self.store.begin().await {
            txn.stage_idempotency_record(record);
            let _ = txn.commit().await;
        }
    }
}

fn non_empty_or(description: Option<String>, default: &str) -> String {
    match description {
        Some(d) if !d.trim().is_empty() => d,
        _ => default.to_string(),
    }
}

async fn backoff(attempt: u32) {
    let millis = BASE_BACKOFF_MS * 2u64.pow(attempt - 1);
    tokio::time::sleep(std::time::Duration::from_millis(millis)).await;
}
