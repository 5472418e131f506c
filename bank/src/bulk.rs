//! CSV bulk processor: reads a `NationalId,Amount,Operation` file and
//! replays each row through the engine as an independent deposit or
//! withdrawal, isolating per-row failures.

use std::io::Read;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::amount::OperationKey;
use crate::engine::BankingEngine;
use crate::error::{BankError, BankResult};
use crate::model::{AccountId, UserId};
use crate::store::Store;

/// Bytes beyond this are rejected before parsing begins.
pub const MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOperation {
    Deposit,
    Withdrawal,
}

impl std::fmt::Display for BulkOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let token = match self {
            BulkOperation::Deposit => "DEPOSIT",
            BulkOperation::Withdrawal => "WITHDRAW",
        };
        f.write_str(token)
    }
}

impl Serialize for BulkOperation {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl FromStr for BulkOperation {
    type Err = BankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DEPOSIT" => Ok(BulkOperation::Deposit),
            "WITHDRAW" => Ok(BulkOperation::Withdrawal),
            other => Err(BankError::InvalidAmount(format!(
                "unknown bulk operation '{other}'"
            ))),
        }
    }
}

/// A row read off the wire, already mapped from normalized header names to
/// fields regardless of the source file's header casing or spacing.
#[derive(Debug, Clone)]
struct RawRow {
    national_id: String,
    amount: String,
    operation: String,
}

/// Maps the normalized (trimmed, lowercased) required header names to their
/// column index, so row parsing tolerates `NationalId`, `nationalid`,
/// `  NationalId  `, etc. all resolving to the same column.
struct HeaderMap {
    national_id: usize,
    amount: usize,
    operation: usize,
}

impl HeaderMap {
    fn from_headers(headers: &csv::StringRecord) -> BankResult<Self> {
        let mut index = std::collections::HashMap::new();
        for (i, name) in headers.iter().enumerate() {
            index.insert(name.trim().to_lowercase(), i);
        }
        let find = |key: &str| {
            index.get(key).copied().ok_or_else(|| {
                BankError::InvalidAmount(format!("bulk file is missing a '{key}' column"))
            })
        };
        Ok(HeaderMap {
            national_id: find("nationalid")?,
            amount: find("amount")?,
            operation: find("operation")?,
        })
    }

    fn row(&self, record: &csv::StringRecord) -> BankResult<RawRow> {
        let get = |i: usize| {
            record
                .get(i)
                .map(str::to_string)
                .ok_or_else(|| BankError::InvalidAmount("row is missing a required column".into()))
        };
        Ok(RawRow {
            national_id: get(self.national_id)?,
            amount: get(self.amount)?,
            operation: get(self.operation)?,
        })
    }
}

/// Resolves a national ID to the Active Checking account that should receive
/// the row, without the core depending on the registration/KYC subsystem.
pub trait UserDirectory: Send + Sync {
    fn resolve_checking_account(&self, national_id: &str) -> BankResult<(UserId, AccountId)>;
}

#[derive(Debug, Clone, Serialize)]
pub struct RowOutcome {
    pub row_number: u64,
    pub national_id: String,
    pub operation: BulkOperation,
    pub amount: String,
    /// The account the row resolved to, if resolution happened before the
    /// row was rejected.
    pub account_number: Option<String>,
    pub outcome: RowResult,
}

#[derive(Debug, Clone, Serialize)]
pub enum RowResult {
    Applied { balance: String },
    Rejected { code: String, message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkReport {
    pub file_name: String,
    pub rows_processed: u64,
    pub rows_applied: u64,
    pub rows_rejected: u64,
    pub rows: Vec<RowOutcome>,
}

pub struct BulkProcessor;

impl BulkProcessor {
    /// Processes `reader` as a `NationalId,Amount,Operation` CSV file,
    /// calling `engine` once per row through `directory`. A row's own
    /// failure never aborts the rest of the file.
    ///
    /// `file_name` and `timestamp` feed the deterministic operation key
    /// `CSV-{file_name}-{row}-{timestamp}`; replaying the same file with a
    /// new timestamp re-executes every row rather than deduplicating against
    /// a prior run.
    pub async fn process<S: Store, R: Read, D: UserDirectory>(
        engine: &BankingEngine<S>,
        directory: &D,
        reader: R,
        file_name: &str,
        timestamp: i64,
        byte_len: u64,
    ) -> BankResult<BulkReport> {
        if byte_len > MAX_FILE_BYTES {
            return Err(BankError::InvalidAmount(format!(
                "bulk file {file_name} is {byte_len} bytes, exceeds {MAX_FILE_BYTES}"
            )));
        }

        let mut csv_reader = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        let headers = csv_reader
            .headers()
            .map_err(|e| BankError::InvalidAmount(format!("malformed header row: {e}")))?;
        let header_map = HeaderMap::from_headers(headers)?;
        let mut rows = Vec::new();
        let mut row_number: u64 = 0;
        let mut applied: u64 = 0;
        let mut rejected: u64 = 0;

        for record in csv_reader.records() {
            row_number += 1;
            let record = record
                .map_err(|e| BankError::InvalidAmount(format!("malformed row: {e}")))
                .and_then(|r| header_map.row(&r));
            let outcome = Self::process_row(engine, directory, record, file_name, row_number, timestamp).await;
            match &outcome.outcome {
                RowResult::Applied { .. } => applied += 1,
                RowResult::Rejected { .. } => rejected += 1,
            }
            rows.push(outcome);
        }

        if row_number == 0 {
            return Err(BankError::InvalidAmount(format!(
                "bulk file {file_name} has no data rows"
            )));
        }

        Ok(BulkReport {
            file_name: file_name.to_string(),
            rows_processed: row_number,
            rows_applied: applied,
            rows_rejected: rejected,
            rows,
        })
    }

    async fn process_row<S: Store, D: UserDirectory>(
        engine: &BankingEngine<S>,
        directory: &D,
        record: BankResult<RawRow>,
        file_name: &str,
        row_number: u64,
        timestamp: i64,
    ) -> RowOutcome {
        let raw = match record {
            Ok(raw) => raw,
            Err(e) => {
                return RowOutcome {
                    row_number,
                    national_id: String::new(),
                    operation: BulkOperation::Deposit,
                    amount: String::new(),
                    account_number: None,
                    outcome: RowResult::Rejected {
                        code: e.code().to_string(),
                        message: e.to_string(),
                    },
                }
            }
        };

        let national_id = raw.national_id.clone();
        let operation = BulkOperation::from_str(&raw.operation).unwrap_or(BulkOperation::Deposit);
        let applied = Self::apply_row(engine, directory, &raw, file_name, row_number, timestamp).await;

        match applied {
            Ok(applied) => RowOutcome {
                row_number,
                national_id,
                operation,
                amount: applied.amount,
                account_number: Some(applied.account_number),
                outcome: RowResult::Applied { balance: applied.balance },
            },
            Err(e) => RowOutcome {
                row_number,
                national_id,
                operation,
                amount: e.amount.unwrap_or_default(),
                account_number: e.account_number,
                outcome: RowResult::Rejected {
                    code: e.error.code().to_string(),
                    message: e.error.to_string(),
                },
            },
        }
    }

    async fn apply_row<S: Store, D: UserDirectory>(
        engine: &BankingEngine<S>,
        directory: &D,
        raw: &RawRow,
        file_name: &str,
        row_number: u64,
        timestamp: i64,
    ) -> Result<AppliedRow, RejectedRow> {
        let amount = Decimal::from_str(raw.amount.trim())
            .map_err(|_| RejectedRow {
                amount: None,
                account_number: None,
                error: BankError::InvalidAmount(format!("unparseable amount '{}'", raw.amount)),
            })?;
        let amount_str = amount.to_string();

        let operation = BulkOperation::from_str(&raw.operation).map_err(|e| RejectedRow {
            amount: Some(amount_str.clone()),
            account_number: None,
            error: e,
        })?;

        let (user_id, account_id) = directory.resolve_checking_account(&raw.national_id).map_err(|e| RejectedRow {
            amount: Some(amount_str.clone()),
            account_number: None,
            error: e,
        })?;

        let account_number = engine
            .store()
            .find_account(account_id)
            .await
            .ok()
            .flatten()
            .map(|a| a.account_number.to_string());

        let with_account = |e: BankError| RejectedRow {
            amount: Some(amount_str.clone()),
            account_number: account_number.clone(),
            error: e,
        };

        let key = OperationKey::parse(format!("CSV-{file_name}-{row_number}-{timestamp}")).map_err(with_account)?;

        let balance = match operation {
            BulkOperation::Deposit => {
                engine
                    .deposit(user_id, account_id, amount, None, Some(key))
                    .await
                    .map_err(with_account)?
                    .balance
            }
            BulkOperation::Withdrawal => {
                engine
                    .withdraw(user_id, account_id, amount, None, Some(key))
                    .await
                    .map_err(with_account)?
                    .balance
            }
        };

        Ok(AppliedRow {
            amount: amount_str,
            account_number: account_number.unwrap_or_default(),
            balance: balance.to_string(),
        })
    }
}

struct AppliedRow {
    amount: String,
    account_number: String,
    balance: String,
}

/// Carries forward whatever was resolved before the row failed, so a
/// rejected row still reports the parsed amount and resolved account when
/// those steps succeeded.
struct RejectedRow {
    amount: Option<String>,
    account_number: Option<String>,
    error: BankError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Account, AccountStatus, AccountType};
    use crate::store::memory::InMemoryStore;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use uuid::Uuid;

    struct FakeDirectory {
        accounts: Mutex<HashMap<String, (UserId, AccountId)>>,
    }

    impl UserDirectory for FakeDirectory {
        fn resolve_checking_account(&self, national_id: &str) -> BankResult<(UserId, AccountId)> {
            self.accounts
                .lock()
                .unwrap()
                .get(national_id)
                .copied()
                .ok_or_else(|| BankError::AccountNotFound(national_id.to_string()))
        }
    }

    #[tokio::test]
    async fn processes_valid_rows_and_isolates_failures() {
        let store = InMemoryStore::new();
        let user_id = Uuid::new_v4();
        let account = Account {
            id: Uuid::new_v4(),
            account_number: crate::amount::AccountNumber::generate(
                AccountType::Checking,
                chrono::Utc::now().date_naive(),
            ),
            owner_user_id: user_id,
            account_type: AccountType::Checking,
            status: AccountStatus::Active,
            cached_balance: crate::amount::Money::zero(),
            currency: "USD".into(),
            version: 0,
        };
        let account_id = account.id;
        store.seed_account(account);

        let mut accounts = HashMap::new();
        accounts.insert("NID-1".to_string(), (user_id, account_id));
        let directory = FakeDirectory {
            accounts: Mutex::new(accounts),
        };

        let engine = BankingEngine::new(store);
        let csv_data = "  nationalid , Amount ,OPERATION\nNID-1,100.00,DEPOSIT\nNID-unknown,10.00,DEPOSIT\n";

        let report = BulkProcessor::process(
            &engine,
            &directory,
            csv_data.as_bytes(),
            "batch.csv",
            1_700_000_000,
            csv_data.len() as u64,
        )
        .await
        .unwrap();

        assert_eq!(report.rows_processed, 2);
        assert_eq!(report.rows_applied, 1);
        assert_eq!(report.rows_rejected, 1);
    }

    #[tokio::test]
    async fn rejects_empty_file() {
        let store = InMemoryStore::new();
        let directory = FakeDirectory {
            accounts: Mutex::new(HashMap::new()),
        };
        let engine = BankingEngine::new(store);
        let csv_data = "NationalId,Amount,Operation\n";

        let err = BulkProcessor::process(
            &engine,
            &directory,
            csv_data.as_bytes(),
            "empty.csv",
            1_700_000_000,
            csv_data.len() as u64,
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), "INVALID_AMOUNT");
    }

    #[tokio::test]
    async fn rejects_oversized_file() {
        let store = InMemoryStore::new();
        let directory = FakeDirectory {
            accounts: Mutex::new(HashMap::new()),
        };
        let engine = BankingEngine::new(store);
        let csv_data = "NationalId,Amount,Operation\nNID-1,1.00,DEPOSIT\n";

        let err = BulkProcessor::process(
            &engine,
            &directory,
            csv_data.as_bytes(),
            "huge.csv",
            1_700_000_000,
            MAX_FILE_BYTES + 1,
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), "INVALID_AMOUNT");
    }
}
