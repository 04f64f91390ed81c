//! MyToken fungible-asset ledger.
//!
//! The crate is built around one deterministic state machine:
//!
//! * [`ledger`]: balances, allowances, total supply and the issuer, mutated
//!   only by `transfer`, `approve`, `transfer_from`, `mint` and
//!   `batch_transfer`. Every call is all-or-nothing and reports its events in a
//!   [`Receipt`](ledger::Receipt).
//! * [`shared`]: a mutex-guarded handle for callers on several threads.
//! * [`config`]: JSON genesis/metadata configuration.
//!
//! Callers pass their identity explicitly on every mutating call.

pub mod config;
pub mod ledger;
pub mod shared;

mod error;

pub use config::LedgerConfig;
pub use error::{ConfigError, LedgerError, ParseError};
pub use ledger::{
    Account, Amount, EventRecord, Ledger, LedgerEvent, LedgerSnapshot, Operation, Receipt,
    TokenMetadata, NULL_ACCOUNT,
};
pub use shared::SharedLedger;
