//! The reconciler: verifies that the cached per-account balance equals the
//! ledger sum. Read-only — it never mutates the store.

use serde::{Deserialize, Serialize};

use crate::amount::Money;
use crate::error::{BankError, BankResult};
use crate::model::AccountId;
use crate::store::Store;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub account_id: AccountId,
    pub cached_balance: Money,
    pub ledger_balance: Money,
    pub entry_count: u64,
    pub reconciled: bool,
}

pub struct Reconciler;

impl Reconciler {
    /// Computes the ledger-derived balance for `account_id` and compares it
    /// against the cached balance. Any discrepancy is logged as a critical
    /// event — the observability collaborator's sink is external, the
    /// engine/reconciler only emits the signal.
    pub async fn reconcile<S: Store>(store: &S, account_id: AccountId) -> BankResult<ReconciliationReport> {
        let account = store
            .find_account(account_id)
            .await?
            .ok_or_else(|| BankError::AccountNotFound(account_id.to_string()))?;
        let summary = store.ledger_summary(account_id).await?;
        let reconciled = summary.balance == account.cached_balance;

        if !reconciled {
            log::error!(
                "CRITICAL reconciliation mismatch: account={account_id} cached={} ledger={}",
                account.cached_balance,
                summary.balance
            );
        }

        Ok(ReconciliationReport {
            account_id,
            cached_balance: account.cached_balance,
            ledger_balance: summary.balance,
            entry_count: summary.entry_count,
            reconciled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Account, AccountStatus, AccountType};
    use crate::store::memory::InMemoryStore;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use uuid::Uuid;

    #[tokio::test]
    async fn reconciled_when_balances_match() {
        let store = InMemoryStore::new();
        let account = Account {
            id: Uuid::new_v4(),
            account_number: crate::amount::AccountNumber::generate(
                AccountType::Checking,
                chrono::Utc::now().date_naive(),
            ),
            owner_user_id: Uuid::new_v4(),
            account_type: AccountType::Checking,
            status: AccountStatus::Active,
            cached_balance: Money::from_decimal(Decimal::from_str("0.00").unwrap()),
            currency: "USD".into(),
            version: 0,
        };
        let id = account.id;
        store.seed_account(account);

        let report = Reconciler::reconcile(&store, id).await.unwrap();
        assert!(report.reconciled);
        assert_eq!(report.cached_balance, report.ledger_balance);
    }

    #[tokio::test]
    async fn missing_account_errors() {
        let store = InMemoryStore::new();
        let err = Reconciler::reconcile(&store, Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.code(), "ACCOUNT_NOT_FOUND");
    }
}
