use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::LedgerError;
use crate::ledger::{Account, Amount, Ledger, LedgerSnapshot, Operation, Receipt};

/// Thread-safe handle to one ledger.
///
/// Each call holds the lock for its whole duration, so other threads see
/// either none or all of its effects. Clones share the same ledger.
#[derive(Clone, Debug)]
pub struct SharedLedger {
    inner: Arc<Mutex<Ledger>>,
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    // A panic never leaves a half-applied call behind (commit cannot fail),
    // so a poisoned lock still guards a consistent ledger.
    fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn transfer(
        &self,
        sender: Account,
        recipient: Account,
        amount: Amount,
    ) -> Result<Receipt, LedgerError> {
        self.lock().transfer(sender, recipient, amount)
    }

    pub fn approve(&self, owner: Account, spender: Account, amount: Amount) -> Receipt {
        self.lock().approve(owner, spender, amount)
    }

    pub fn transfer_from(
        &self,
        spender: Account,
        owner: Account,
        recipient: Account,
        amount: Amount,
    ) -> Result<Receipt, LedgerError> {
        self.lock().transfer_from(spender, owner, recipient, amount)
    }

    pub fn mint(&self, caller: Account, to: Account, amount: Amount) -> Result<Receipt, LedgerError> {
        self.lock().mint(caller, to, amount)
    }

    pub fn batch_transfer(
        &self,
        sender: Account,
        recipients: &[Account],
        amounts: &[Amount],
    ) -> Result<Receipt, LedgerError> {
        self.lock().batch_transfer(sender, recipients, amounts)
    }

    pub fn execute(&self, op: &Operation) -> Result<Receipt, LedgerError> {
        self.lock().execute(op)
    }

    pub fn balance_of(&self, account: &Account) -> Amount {
        self.lock().balance_of(account)
    }

    pub fn allowance(&self, owner: &Account, spender: &Account) -> Amount {
        self.lock().allowance(owner, spender)
    }

    pub fn total_supply(&self) -> Amount {
        self.lock().total_supply()
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.lock().snapshot()
    }

    /// Runs `f` against the ledger under the lock.
    pub fn with<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        let guard = self.lock();
        f(&guard)
    }
}
