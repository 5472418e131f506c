//! An in-process `UserDirectory` for the CLI and demo binary: resolves a
//! national ID to the `(user, account)` pair the bulk processor needs,
//! without depending on the out-of-scope registration/KYC subsystem.

use std::collections::HashMap;
use std::sync::Mutex;

use bank::bulk::UserDirectory;
use bank::error::{BankError, BankResult};
use bank::model::{AccountId, UserId};

#[derive(Default)]
pub struct InMemoryDirectory {
    entries: Mutex<HashMap<String, (UserId, AccountId)>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, national_id: impl Into<String>, user_id: UserId, account_id: AccountId) {
        self.entries
            .lock()
            .expect("directory mutex poisoned")
            .insert(national_id.into(), (user_id, account_id));
    }
}

impl UserDirectory for InMemoryDirectory {
    fn resolve_checking_account(&self, national_id: &str) -> BankResult<(UserId, AccountId)> {
        self.entries
            .lock()
            .expect("directory mutex poisoned")
            .get(national_id)
            .copied()
            .ok_or_else(|| BankError::AccountNotFound(national_id.to_string()))
    }
}
