use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

use super::{Account, Amount, Ledger, LedgerEvent};

/// A mutating call with its caller made explicit.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Transfer {
        caller: Account,
        to: Account,
        amount: Amount,
    },
    Approve {
        caller: Account,
        spender: Account,
        amount: Amount,
    },
    TransferFrom {
        caller: Account,
        from: Account,
        to: Account,
        amount: Amount,
    },
    Mint {
        caller: Account,
        to: Account,
        amount: Amount,
    },
    BatchTransfer {
        caller: Account,
        recipients: Vec<Account>,
        amounts: Vec<Amount>,
    },
}

impl Operation {
    pub fn caller(&self) -> Account {
        match self {
            Operation::Transfer { caller, .. }
            | Operation::Approve { caller, .. }
            | Operation::TransferFrom { caller, .. }
            | Operation::Mint { caller, .. }
            | Operation::BatchTransfer { caller, .. } => *caller,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Transfer { .. } => "transfer",
            Operation::Approve { .. } => "approve",
            Operation::TransferFrom { .. } => "transfer_from",
            Operation::Mint { .. } => "mint",
            Operation::BatchTransfer { .. } => "batch_transfer",
        }
    }
}

/// Outcome of a committed call: its height and the events it emitted, in order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Receipt {
    pub height: u64,
    pub events: Vec<LedgerEvent>,
}

impl Ledger {
    pub fn execute(&mut self, op: &Operation) -> Result<Receipt, LedgerError> {
        let result = match op {
            Operation::Transfer { caller, to, amount } => {
                self.transfer(*caller, *to, amount.clone())
            }
            Operation::Approve {
                caller,
                spender,
                amount,
            } => Ok(self.approve(*caller, *spender, amount.clone())),
            Operation::TransferFrom {
                caller,
                from,
                to,
                amount,
            } => self.transfer_from(*caller, *from, *to, amount.clone()),
            Operation::Mint { caller, to, amount } => self.mint(*caller, *to, amount.clone()),
            Operation::BatchTransfer {
                caller,
                recipients,
                amounts,
            } => self.batch_transfer(*caller, recipients, amounts),
        };
        if let Err(err) = &result {
            tracing::debug!(caller = %op.caller(), op = op.name(), %err, "call rejected");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"[
        {"op": "transfer", "caller": "0xd0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0",
         "to": "0xa1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1", "amount": "100"},
        {"op": "approve", "caller": "0xd0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0",
         "spender": "0xa1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1", "amount": 50},
        {"op": "transfer_from", "caller": "0xa1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1",
         "from": "0xd0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0",
         "to": "0xb2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2", "amount": "20"},
        {"op": "batch_transfer", "caller": "0xd0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0",
         "recipients": [], "amounts": []}
    ]"#;

    fn acct(b: u8) -> Account {
        Account::new([b; 20])
    }

    #[test]
    fn script_parses_and_executes() {
        let ops: Vec<Operation> = serde_json::from_str(SCRIPT).unwrap();
        assert_eq!(ops.len(), 4);
        assert_eq!(ops[2].caller(), acct(0xa1));
        assert_eq!(ops[2].name(), "transfer_from");

        let mut ledger = Ledger::deploy(Amount::from(1_000u64), acct(0xd0));
        let results: Vec<_> = ops.iter().map(|op| ledger.execute(op)).collect();
        assert_eq!(results[0].as_ref().unwrap().height, 1);
        assert_eq!(results[1].as_ref().unwrap().height, 2);
        assert_eq!(results[2].as_ref().unwrap().height, 3);
        assert_eq!(results[3], Err(LedgerError::EmptyBatch));

        assert_eq!(ledger.balance_of(&acct(0xd0)), Amount::from(880u64));
        assert_eq!(ledger.balance_of(&acct(0xb2)), Amount::from(20u64));
        assert_eq!(ledger.allowance(&acct(0xd0), &acct(0xa1)), Amount::from(30u64));
    }

    #[test]
    fn operations_round_trip_through_json() {
        let op = Operation::Mint {
            caller: acct(1),
            to: acct(2),
            amount: Amount::max_value(),
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["op"], "mint");
        let back: Operation = serde_json::from_value(json).unwrap();
        assert_eq!(back, op);
    }

    #[test]
    fn receipt_lists_events_in_call_order() {
        let mut ledger = Ledger::deploy(Amount::from(300u64), acct(0xd0));
        let receipt = ledger
            .execute(&Operation::BatchTransfer {
                caller: acct(0xd0),
                recipients: vec![acct(0xa1), acct(0xb2)],
                amounts: vec![Amount::from(100u64), Amount::from(200u64)],
            })
            .unwrap();
        let recipients: Vec<Account> = receipt
            .events
            .iter()
            .map(|event| match event {
                LedgerEvent::Transfer { to, .. } => *to,
                LedgerEvent::Approval { .. } => panic!("unexpected approval"),
            })
            .collect();
        assert_eq!(recipients, vec![acct(0xa1), acct(0xb2)]);
    }
}
