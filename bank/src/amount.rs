//! Fixed-scale monetary value and the two identifier types that accompany it:
//! account numbers and caller-supplied idempotency keys.

use std::fmt;
use std::str::FromStr;

use rand::rngs::OsRng;
use rand::RngCore;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{BankError, BankResult};
use crate::model::AccountType;

const MAX_AMOUNT: &str = "1000000000";

/// A signed, scale-2 monetary value. Arithmetic is exact decimal arithmetic;
/// no floating point ever enters a monetary calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn from_decimal(value: Decimal) -> Self {
        Money(value.round_dp(2))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn negate(&self) -> Self {
        Money(-self.0)
    }

    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn checked_sub(&self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// Validates a caller-supplied amount before it ever reaches the engine:
    /// positive, bounded, and exactly representable at scale 2.
    pub fn validate_positive_input(raw: Decimal) -> BankResult<Money> {
        if raw <= Decimal::ZERO {
            return Err(BankError::InvalidAmount(format!(
                "amount must be > 0, got {raw}"
            )));
        }
        let max = Decimal::from_str(MAX_AMOUNT).expect("static max amount parses");
        if raw > max {
            return Err(BankError::InvalidAmount(format!(
                "amount {raw} exceeds maximum {max}"
            )));
        }
        if raw.round_dp(2) != raw {
            return Err(BankError::InvalidAmount(format!(
                "amount {raw} has sub-cent precision"
            )));
        }
        Ok(Money(raw))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// A caller-supplied opaque deduplication token, length 1..100.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationKey(String);

impl OperationKey {
    pub fn parse(raw: impl Into<String>) -> BankResult<Self> {
        let raw = raw.into();
        if raw.is_empty() || raw.len() > 100 {
            return Err(BankError::InvalidAmount(format!(
                "operation key length must be 1..100, got {}",
                raw.len()
            )));
        }
        Ok(OperationKey(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A unique, human-readable account number:
/// `{CHK|SAV|BUS}-YYYYMMDD-{6 hex uppercase}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountNumber(String);

impl AccountNumber {
    /// Generates a new account number for `account_type`, stamped with
    /// `today` and a cryptographically random 6-hex-digit suffix.
    /// Uniqueness is enforced by the store, not by this generator.
    pub fn generate(account_type: AccountType, today: chrono::NaiveDate) -> Self {
        let prefix = match account_type {
            AccountType::Checking => "CHK",
            AccountType::Savings => "SAV",
            AccountType::Business => "BUS",
        };
        let mut suffix_bytes = [0u8; 3];
        OsRng.fill_bytes(&mut suffix_bytes);
        let suffix = hex::encode_upper(suffix_bytes);
        AccountNumber(format!("{prefix}-{}-{suffix}", today.format("%Y%m%d")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AccountNumber {
    type Err = BankError;

    /// Accepts a caller-supplied account number verbatim; the store rejects
    /// numbers it has never seen via `find_account_by_number`, so no format
    /// validation happens here beyond non-emptiness.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(BankError::InvalidAmount("account number must not be empty".into()));
        }
        Ok(AccountNumber(s.to_string()))
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
