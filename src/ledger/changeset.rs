use std::collections::BTreeMap;

use crate::error::LedgerError;

use super::{Account, Amount, Ledger, LedgerEvent};

/// Pending effects of a single call, staged over a read-only ledger.
///
/// Reads see staged values first. Nothing reaches the ledger until the
/// finished [`StateDelta`] is committed, so an early `?` return discards
/// every staged write.
pub(crate) struct Changeset<'a> {
    base: &'a Ledger,
    delta: StateDelta,
}

#[derive(Debug, Default)]
pub(crate) struct StateDelta {
    pub balances: BTreeMap<Account, Amount>,
    pub allowances: BTreeMap<(Account, Account), Amount>,
    pub total_supply: Option<Amount>,
    pub events: Vec<LedgerEvent>,
}

impl<'a> Changeset<'a> {
    pub fn new(base: &'a Ledger) -> Self {
        Self {
            base,
            delta: StateDelta::default(),
        }
    }

    pub fn balance(&self, account: &Account) -> Amount {
        match self.delta.balances.get(account) {
            Some(staged) => staged.clone(),
            None => self.base.balance_of(account),
        }
    }

    pub fn allowance(&self, owner: &Account, spender: &Account) -> Amount {
        match self.delta.allowances.get(&(*owner, *spender)) {
            Some(staged) => staged.clone(),
            None => self.base.allowance(owner, spender),
        }
    }

    pub fn total_supply(&self) -> Amount {
        match &self.delta.total_supply {
            Some(staged) => staged.clone(),
            None => self.base.total_supply(),
        }
    }

    pub fn debit(&mut self, account: &Account, amount: &Amount) -> Result<(), LedgerError> {
        let remaining = self
            .balance(account)
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance)?;
        self.delta.balances.insert(*account, remaining);
        Ok(())
    }

    pub fn credit(&mut self, account: &Account, amount: &Amount) -> Result<(), LedgerError> {
        let updated = self
            .balance(account)
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        self.delta.balances.insert(*account, updated);
        Ok(())
    }

    pub fn set_allowance(&mut self, owner: &Account, spender: &Account, amount: Amount) {
        self.delta.allowances.insert((*owner, *spender), amount);
    }

    pub fn grow_supply(&mut self, amount: &Amount) -> Result<(), LedgerError> {
        let updated = self
            .total_supply()
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        self.delta.total_supply = Some(updated);
        Ok(())
    }

    pub fn emit(&mut self, event: LedgerEvent) {
        self.delta.events.push(event);
    }

    pub fn finish(self) -> StateDelta {
        self.delta
    }
}
