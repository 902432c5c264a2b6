//! Property tests over random operation sequences.
//!
//! A small pool of accounts (including the null account) keeps collisions
//! frequent, so self-transfers, exhausted allowances and null-account
//! rejections all show up in most generated runs.

use cash_ledger::{Address, Amount, Ledger, LedgerError};
use proptest::prelude::*;

const POOL: usize = 5;

fn account(i: usize) -> Address {
    // Index 0 is the null account.
    if i == 0 {
        Address::NULL
    } else {
        Address::repeat_byte(i as u8)
    }
}

#[derive(Debug, Clone)]
enum Op {
    Transfer { caller: usize, to: usize, amount: u64 },
    Approve { caller: usize, spender: usize, amount: u64 },
    TransferFrom { caller: usize, from: usize, to: usize, amount: u64 },
}

/// Mostly small amounts, with enough large ones to drain balances.
fn arb_amount() -> impl Strategy<Value = u64> {
    prop_oneof![0u64..=50, 0u64..=2_000]
}

fn arb_op() -> impl Strategy<Value = Op> {
    let idx = 0..POOL;
    prop_oneof![
        (idx.clone(), idx.clone(), arb_amount())
            .prop_map(|(caller, to, amount)| Op::Transfer { caller, to, amount }),
        (idx.clone(), idx.clone(), arb_amount())
            .prop_map(|(caller, spender, amount)| Op::Approve { caller, spender, amount }),
        (idx.clone(), idx.clone(), idx, arb_amount()).prop_map(|(caller, from, to, amount)| {
            Op::TransferFrom {
                caller,
                from,
                to,
                amount,
            }
        }),
    ]
}

fn apply(ledger: &mut Ledger, op: &Op) -> Result<(), LedgerError> {
    match *op {
        Op::Transfer { caller, to, amount } => {
            ledger.transfer(account(caller), account(to), Amount::from(amount))
        }
        Op::Approve {
            caller,
            spender,
            amount,
        } => ledger.approve(account(caller), account(spender), Amount::from(amount)),
        Op::TransferFrom {
            caller,
            from,
            to,
            amount,
        } => ledger.transfer_from(
            account(caller),
            account(from),
            account(to),
            Amount::from(amount),
        ),
    }
}

fn fresh() -> Ledger {
    let mut ledger = Ledger::new("Community Cash", "RENT", 0, Amount::from(1_000u64), account(1))
        .unwrap();
    ledger.drain_events();
    ledger
}

proptest! {
    /// Supply is conserved after every step, whether the step succeeded or not.
    #[test]
    fn conservation_holds(ops in prop::collection::vec(arb_op(), 1..64)) {
        let mut ledger = fresh();
        for op in &ops {
            let _ = apply(&mut ledger, op);
            prop_assert!(ledger.check_conservation().is_ok());
            prop_assert_eq!(ledger.total_supply(), Amount::from(1_000u64));
        }
    }

    /// A rejected operation leaves balances, allowances and the event queue
    /// exactly as they were; an accepted one queues exactly one event.
    #[test]
    fn rejection_is_atomic(ops in prop::collection::vec(arb_op(), 1..64)) {
        let mut ledger = fresh();
        for op in &ops {
            let before = ledger.snapshot();
            let queued = ledger.pending_events().len();
            match apply(&mut ledger, op) {
                Ok(()) => {
                    prop_assert_eq!(ledger.pending_events().len(), queued + 1);
                }
                Err(_) => {
                    prop_assert_eq!(ledger.snapshot(), before);
                    prop_assert_eq!(ledger.pending_events().len(), queued);
                }
            }
        }
    }

    /// `approve` sets the allowance to exactly the requested value.
    #[test]
    fn approve_sets_exact_value(first in any::<u64>(), second in any::<u64>()) {
        let mut ledger = fresh();
        let (owner, spender) = (account(2), account(3));
        ledger.approve(owner, spender, Amount::from(first)).unwrap();
        ledger.approve(owner, spender, Amount::from(second)).unwrap();
        prop_assert_eq!(ledger.allowance(&owner, &spender), Amount::from(second));
    }

    /// A successful delegated transfer reduces the allowance by exactly the
    /// amount moved.
    #[test]
    fn spend_down_is_exact(approved in 0u64..=1_000, spent in 0u64..=1_000) {
        let mut ledger = fresh();
        let (owner, spender, to) = (account(1), account(2), account(3));
        ledger.approve(owner, spender, Amount::from(approved)).unwrap();
        let result = ledger.transfer_from(spender, owner, to, Amount::from(spent));
        if spent <= approved {
            prop_assert!(result.is_ok());
            prop_assert_eq!(
                ledger.allowance(&owner, &spender),
                Amount::from(approved - spent)
            );
        } else {
            let is_insufficient_allowance =
                matches!(result, Err(LedgerError::InsufficientAllowance { .. }));
            prop_assert!(is_insufficient_allowance);
            prop_assert_eq!(ledger.allowance(&owner, &spender), Amount::from(approved));
        }
    }

    /// Null-account rejections do not depend on the caller's balance.
    #[test]
    fn null_account_always_rejected(caller in 0..POOL, amount in 0u64..=2_000) {
        let mut ledger = fresh();
        prop_assert_eq!(
            ledger.transfer(account(caller), Address::NULL, Amount::from(amount)),
            Err(LedgerError::InvalidRecipient)
        );
        prop_assert_eq!(
            ledger.approve(account(caller), Address::NULL, Amount::from(amount)),
            Err(LedgerError::InvalidSpender)
        );
    }
}
