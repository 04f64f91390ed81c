use std::collections::BTreeMap;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::LedgerError;

mod account;
mod amount;
mod changeset;
mod operation;

pub use account::{Account, ACCOUNT_LEN, NULL_ACCOUNT};
pub use amount::{Amount, AMOUNT_BITS};
pub use operation::{Operation, Receipt};

use changeset::{Changeset, StateDelta};

pub const DEFAULT_NAME: &str = "MyToken";
pub const DEFAULT_SYMBOL: &str = "MTK";
pub const DEFAULT_DECIMALS: u8 = 18;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl Default for TokenMetadata {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            symbol: DEFAULT_SYMBOL.to_string(),
            decimals: DEFAULT_DECIMALS,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    Transfer {
        from: Account,
        to: Account,
        amount: Amount,
    },
    Approval {
        owner: Account,
        spender: Account,
        amount: Amount,
    },
}

/// An event together with the call that produced it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventRecord {
    pub height: u64,
    pub index: usize,
    pub event: LedgerEvent,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AllowanceEntry {
    pub owner: Account,
    pub spender: Account,
    pub amount: Amount,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub meta: TokenMetadata,
    pub issuer: Account,
    pub height: u64,
    pub total_supply: Amount,
    pub balances: BTreeMap<Account, Amount>,
    pub allowances: Vec<AllowanceEntry>,
    #[serde(with = "serde_root")]
    pub state_root: [u8; 32],
}

/// Fungible-asset ledger.
///
/// Every mutating call either commits all of its effects and returns a
/// [`Receipt`], or returns a [`LedgerError`] and leaves the ledger exactly as
/// it was. Zero balances and allowances are pruned, so an absent entry reads
/// as zero.
#[derive(Clone, Debug)]
pub struct Ledger {
    meta: TokenMetadata,
    issuer: Account,
    total_supply: Amount,
    balances: BTreeMap<Account, Amount>,
    allowances: BTreeMap<(Account, Account), Amount>,
    height: u64,
    events: Vec<EventRecord>,
    // call_starts[h] is the position in `events` of the first event at height h
    call_starts: Vec<usize>,
}

impl Ledger {
    /// Credits `initial_supply` to `holder`, who also becomes the issuer.
    ///
    /// The issuance is recorded as a `Transfer` from [`NULL_ACCOUNT`] at
    /// height 0.
    pub fn new(meta: TokenMetadata, initial_supply: Amount, holder: Account) -> Self {
        let mut balances = BTreeMap::new();
        if !initial_supply.is_zero() {
            balances.insert(holder, initial_supply.clone());
        }
        let genesis = EventRecord {
            height: 0,
            index: 0,
            event: LedgerEvent::Transfer {
                from: NULL_ACCOUNT,
                to: holder,
                amount: initial_supply.clone(),
            },
        };
        tracing::debug!(issuer = %holder, supply = %initial_supply, "ledger created");
        Self {
            meta,
            issuer: holder,
            total_supply: initial_supply,
            balances,
            allowances: BTreeMap::new(),
            height: 0,
            events: vec![genesis],
            call_starts: vec![0],
        }
    }

    pub fn deploy(initial_supply: Amount, holder: Account) -> Self {
        Self::new(TokenMetadata::default(), initial_supply, holder)
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn symbol(&self) -> &str {
        &self.meta.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.meta.decimals
    }

    pub fn metadata(&self) -> &TokenMetadata {
        &self.meta
    }

    pub fn issuer(&self) -> Account {
        self.issuer
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply.clone()
    }

    pub fn balance_of(&self, account: &Account) -> Amount {
        self.balances.get(account).cloned().unwrap_or_default()
    }

    pub fn allowance(&self, owner: &Account, spender: &Account) -> Amount {
        self.allowances
            .get(&(*owner, *spender))
            .cloned()
            .unwrap_or_default()
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    /// Events emitted by the call committed at `height`.
    pub fn events_at(&self, height: u64) -> impl Iterator<Item = &LedgerEvent> + '_ {
        let slot = usize::try_from(height).ok();
        let start = slot.and_then(|h| self.call_starts.get(h).copied());
        let records: &[EventRecord] = match start {
            Some(start) => {
                let end = slot
                    .and_then(|h| self.call_starts.get(h + 1).copied())
                    .unwrap_or(self.events.len());
                &self.events[start..end]
            }
            None => &[],
        };
        records.iter().map(|record| &record.event)
    }

    pub fn transfer(
        &mut self,
        sender: Account,
        recipient: Account,
        amount: Amount,
    ) -> Result<Receipt, LedgerError> {
        let mut cs = Changeset::new(self);
        cs.debit(&sender, &amount)?;
        if recipient.is_null() {
            return Err(LedgerError::InvalidRecipient);
        }
        cs.credit(&recipient, &amount)?;
        cs.emit(LedgerEvent::Transfer {
            from: sender,
            to: recipient,
            amount,
        });
        let delta = cs.finish();
        Ok(self.commit(delta))
    }

    /// Overwrites the allowance; never fails.
    pub fn approve(&mut self, owner: Account, spender: Account, amount: Amount) -> Receipt {
        let mut cs = Changeset::new(self);
        cs.set_allowance(&owner, &spender, amount.clone());
        cs.emit(LedgerEvent::Approval {
            owner,
            spender,
            amount,
        });
        let delta = cs.finish();
        self.commit(delta)
    }

    pub fn transfer_from(
        &mut self,
        spender: Account,
        owner: Account,
        recipient: Account,
        amount: Amount,
    ) -> Result<Receipt, LedgerError> {
        let mut cs = Changeset::new(self);
        let remaining = cs
            .allowance(&owner, &spender)
            .checked_sub(&amount)
            .ok_or(LedgerError::InsufficientAllowance)?;
        if cs.balance(&owner) < amount {
            return Err(LedgerError::InsufficientBalance);
        }
        if recipient.is_null() {
            return Err(LedgerError::InvalidRecipient);
        }
        if owner.is_null() {
            return Err(LedgerError::InvalidSender);
        }
        cs.set_allowance(&owner, &spender, remaining);
        cs.debit(&owner, &amount)?;
        cs.credit(&recipient, &amount)?;
        cs.emit(LedgerEvent::Transfer {
            from: owner,
            to: recipient,
            amount,
        });
        let delta = cs.finish();
        Ok(self.commit(delta))
    }

    pub fn mint(
        &mut self,
        caller: Account,
        to: Account,
        amount: Amount,
    ) -> Result<Receipt, LedgerError> {
        if caller != self.issuer {
            return Err(LedgerError::Unauthorized);
        }
        let mut cs = Changeset::new(self);
        cs.grow_supply(&amount)?;
        cs.credit(&to, &amount)?;
        cs.emit(LedgerEvent::Transfer {
            from: NULL_ACCOUNT,
            to,
            amount,
        });
        let delta = cs.finish();
        Ok(self.commit(delta))
    }

    /// Sends `amounts[i]` to `recipients[i]` for every `i`, or nothing at all.
    pub fn batch_transfer(
        &mut self,
        sender: Account,
        recipients: &[Account],
        amounts: &[Amount],
    ) -> Result<Receipt, LedgerError> {
        if recipients.len() != amounts.len() {
            return Err(LedgerError::LengthMismatch);
        }
        if recipients.is_empty() {
            return Err(LedgerError::EmptyBatch);
        }
        if recipients.iter().any(Account::is_null) {
            return Err(LedgerError::InvalidRecipient);
        }
        // a sum past 256 bits exceeds any balance
        let total = amounts
            .iter()
            .try_fold(Amount::zero(), |acc, amount| acc.checked_add(amount))
            .ok_or(LedgerError::InsufficientBalance)?;

        let mut cs = Changeset::new(self);
        cs.debit(&sender, &total)?;
        for (recipient, amount) in recipients.iter().zip(amounts) {
            cs.credit(recipient, amount)?;
            cs.emit(LedgerEvent::Transfer {
                from: sender,
                to: *recipient,
                amount: amount.clone(),
            });
        }
        let delta = cs.finish();
        Ok(self.commit(delta))
    }

    /// Sum of all balances equals total supply.
    pub fn supply_is_conserved(&self) -> bool {
        let sum: BigUint = self.balances.values().map(Amount::as_biguint).sum();
        &sum == self.total_supply.as_biguint()
    }

    pub fn state_root(&self) -> [u8; 32] {
        compute_state_root(&self.total_supply, &self.balances, &self.allowances)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            meta: self.meta.clone(),
            issuer: self.issuer,
            height: self.height,
            total_supply: self.total_supply.clone(),
            balances: self.balances.clone(),
            allowances: self
                .allowances
                .iter()
                .map(|((owner, spender), amount)| AllowanceEntry {
                    owner: *owner,
                    spender: *spender,
                    amount: amount.clone(),
                })
                .collect(),
            state_root: self.state_root(),
        }
    }

    fn commit(&mut self, delta: StateDelta) -> Receipt {
        self.height += 1;
        let height = self.height;

        for (account, balance) in delta.balances {
            if balance.is_zero() {
                self.balances.remove(&account);
            } else {
                self.balances.insert(account, balance);
            }
        }
        for (key, amount) in delta.allowances {
            if amount.is_zero() {
                self.allowances.remove(&key);
            } else {
                self.allowances.insert(key, amount);
            }
        }
        if let Some(supply) = delta.total_supply {
            self.total_supply = supply;
        }
        self.call_starts.push(self.events.len());
        for (index, event) in delta.events.iter().enumerate() {
            tracing::trace!(height, index, ?event, "event");
            self.events.push(EventRecord {
                height,
                index,
                event: event.clone(),
            });
        }
        debug_assert!(self.supply_is_conserved(), "supply drifted at height {height}");
        tracing::debug!(height, events = delta.events.len(), "call committed");

        Receipt {
            height,
            events: delta.events,
        }
    }
}

fn compute_state_root(
    total_supply: &Amount,
    balances: &BTreeMap<Account, Amount>,
    allowances: &BTreeMap<(Account, Account), Amount>,
) -> [u8; 32] {
    let mut leaves: Vec<[u8; 32]> = Vec::with_capacity(1 + balances.len() + allowances.len());

    let mut hasher = Sha256::new();
    hasher.update(b"supply");
    hasher.update(total_supply.to_be_bytes());
    leaves.push(hasher.finalize().into());

    for (account, balance) in balances {
        let mut hasher = Sha256::new();
        hasher.update(b"balance");
        hasher.update(account.as_bytes());
        hasher.update(balance.to_be_bytes());
        leaves.push(hasher.finalize().into());
    }
    for ((owner, spender), amount) in allowances {
        let mut hasher = Sha256::new();
        hasher.update(b"allowance");
        hasher.update(owner.as_bytes());
        hasher.update(spender.as_bytes());
        hasher.update(amount.to_be_bytes());
        leaves.push(hasher.finalize().into());
    }
    build_merkle(leaves)
}

fn build_merkle(mut leaves: Vec<[u8; 32]>) -> [u8; 32] {
    if leaves.is_empty() {
        return Sha256::digest(b"mtk-ledger-empty").into();
    }
    while leaves.len() > 1 {
        let mut next = Vec::with_capacity(leaves.len().div_ceil(2));
        for chunk in leaves.chunks(2) {
            let mut hasher = Sha256::new();
            hasher.update(b"node");
            hasher.update(chunk[0]);
            // odd node pairs with itself
            hasher.update(chunk.get(1).unwrap_or(&chunk[0]));
            next.push(hasher.finalize().into());
        }
        leaves = next;
    }
    leaves[0]
}

mod serde_root {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let mut root = [0u8; 32];
        hex::decode_to_slice(&encoded, &mut root).map_err(D::Error::custom)?;
        Ok(root)
    }
}
