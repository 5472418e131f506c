//! Pure synchronous checks. Cheap pre-transaction amount checks live on
//! `Money::validate_positive_input`; everything that depends on database
//! state lives here and is re-run inside the store transaction after the
//! engine has read fresh rows.

use rust_decimal::Decimal;

use crate::amount::Money;
use crate::error::{BankError, BankResult};
use crate::model::{Account, UserId};

pub struct Validator;

impl Validator {
    /// Pre-transaction check: cheap rejection before a store transaction is
    /// ever opened.
    pub fn validate_amount(raw: Decimal) -> BankResult<Money> {
        Money::validate_positive_input(raw)
    }

    /// Post-read checks shared by deposit and withdraw: the account exists
    /// (caller already has it, so this only asserts ownership/status),
    /// caller owns it, and it is Active.
    pub fn validate_owned_active_account(account: &Account, user_id: UserId) -> BankResult<()> {
        if account.owner_user_id != user_id {
            return Err(BankError::UnauthorizedAccess(
                account.account_number.to_string(),
            ));
        }
        Self::validate_active(account)
    }

    pub fn validate_active(account: &Account) -> BankResult<()> {
        use crate::model::AccountStatus::*;
        match account.status {
            Active => Ok(()),
            Frozen => Err(BankError::AccountFrozen(account.account_number.to_string())),
            Closed => Err(BankError::AccountClosed(account.account_number.to_string())),
        }
    }

    pub fn validate_sufficient_funds(account: &Account, amount: Money) -> BankResult<()> {
        if account.cached_balance < amount {
            return Err(BankError::InsufficientFunds {
                balance: account.cached_balance.to_string(),
                requested: amount.to_string(),
            });
        }
        Ok(())
    }

    /// Post-read validation for a transfer, applied in a fixed precedence
    /// order: existence (caller's responsibility before calling this, since
    /// both accounts must already be loaded), identity, ownership, status,
    /// then funds.
    pub fn validate_transfer(
        source: &Account,
        destination: &Account,
        user_id: UserId,
        amount: Money,
    ) -> BankResult<()> {
        if source.id == destination.id {
            return Err(BankError::SelfTransfer);
        }
        if source.owner_user_id != user_id {
            return Err(BankError::UnauthorizedAccess(
                source.account_number.to_string(),
            ));
        }
        Self::validate_active(source)?;
        Self::validate_active(destination)?;
        Self::validate_sufficient_funds(source, amount)
    }
}
