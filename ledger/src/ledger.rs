//! # Ledger Core
//!
//! Owns every balance and allowance of a single fixed-supply token and the
//! three operations allowed to change them: [`transfer`](Ledger::transfer),
//! [`approve`](Ledger::approve) and [`transfer_from`](Ledger::transfer_from).
//!
//! ## Invariants
//!
//! - **Conservation**: the sum of all balances equals `total_supply`. Supply
//!   is fixed at construction; no operation mints or burns.
//! - **Atomicity**: an operation either commits every write and queues its
//!   event, or returns an error having written nothing. All fallible
//!   arithmetic runs before the first write.
//! - **Zero default**: an address or pair never written reads as zero.
//!
//! ## Allowance overwrite
//!
//! `approve` sets, it does not add. An owner lowering a spender's allowance
//! from N to M can be front-run: the spender spends N first, then M more.
//! That is the established contract for this kind of ledger and is kept
//! as-is; owners who care should approve 0 and check before approving M.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::event::{EventRecord, LedgerEvent};
use crate::types::{Address, Amount};

/// Display metadata fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// The token ledger.
///
/// Mutations take `&mut self`, so a bare `Ledger` is serialized by the borrow
/// checker. Wrap it in [`SharedLedger`](crate::SharedLedger) to share it
/// across threads.
///
/// Every committed operation queues an [`EventRecord`] that stays in memory
/// until [`drain_events`](Ledger::drain_events) takes it. A host holding a
/// bare `Ledger` must drain after each mutation; `SharedLedger` does this
/// itself and hands the records to its sinks.
#[derive(Debug, Clone)]
pub struct Ledger {
    pub(crate) metadata: TokenMetadata,
    pub(crate) total_supply: Amount,
    pub(crate) balances: HashMap<Address, Amount>,
    pub(crate) allowances: HashMap<(Address, Address), Amount>,
    pub(crate) pending: Vec<EventRecord>,
    pub(crate) next_seq: u64,
}

impl Ledger {
    /// Deploys a new token.
    ///
    /// `initial_supply` is in whole tokens and is scaled by `10^decimals`;
    /// the entire scaled supply is credited to `deployer`, recorded as a
    /// `Transfer` from the null account.
    ///
    /// # Errors
    ///
    /// [`LedgerError::ArithmeticOverflow`] if the scaled supply does not fit
    /// in 256 bits.
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        decimals: u8,
        initial_supply: Amount,
        deployer: Address,
    ) -> LedgerResult<Self> {
        let total_supply = initial_supply
            .scaled(decimals)
            .ok_or(LedgerError::ArithmeticOverflow)?;

        let mut ledger = Self {
            metadata: TokenMetadata {
                name: name.into(),
                symbol: symbol.into(),
                decimals,
            },
            total_supply,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            pending: Vec::new(),
            next_seq: 0,
        };
        ledger.balances.insert(deployer, total_supply);
        ledger.emit(LedgerEvent::Transfer {
            from: Address::NULL,
            to: deployer,
            value: total_supply,
        });

        tracing::info!(
            name = %ledger.metadata.name,
            symbol = %ledger.metadata.symbol,
            decimals,
            total_supply = %total_supply,
            deployer = %deployer,
            "token deployed"
        );
        Ok(ledger)
    }

    // -------- queries --------

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn symbol(&self) -> &str {
        &self.metadata.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.metadata.decimals
    }

    pub fn metadata(&self) -> &TokenMetadata {
        &self.metadata
    }

    /// Total supply in smallest units.
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Balance of `account`, zero if never written.
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or_default()
    }

    /// How much `spender` may still move out of `owner`'s balance.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or_default()
    }

    /// Number of accounts currently holding a non-zero balance.
    pub fn holder_count(&self) -> usize {
        self.balances.values().filter(|b| !b.is_zero()).count()
    }

    /// Sums every balance and compares it with the total supply.
    pub fn check_conservation(&self) -> LedgerResult<()> {
        let sum = self
            .balances
            .values()
            .try_fold(Amount::ZERO, |acc, b| acc.checked_add(*b))
            .ok_or(LedgerError::ArithmeticOverflow)?;
        if sum != self.total_supply {
            return Err(LedgerError::ConservationViolated(format!(
                "balances sum to {}, total supply is {}",
                sum, self.total_supply
            )));
        }
        Ok(())
    }

    // -------- mutations --------

    /// Moves `amount` from `caller` to `to`.
    ///
    /// # Errors
    ///
    /// Checked in this order:
    /// 1. [`LedgerError::InvalidRecipient`] if `to` is the null account.
    /// 2. [`LedgerError::InsufficientBalance`] if `caller` holds less than `amount`.
    pub fn transfer(&mut self, caller: Address, to: Address, amount: Amount) -> LedgerResult<()> {
        if to.is_null() {
            return Err(rejected("transfer", LedgerError::InvalidRecipient));
        }
        self.move_balance(caller, to, amount)
            .map_err(|e| rejected("transfer", e))?;

        self.emit(LedgerEvent::Transfer {
            from: caller,
            to,
            value: amount,
        });
        tracing::debug!(from = %caller, to = %to, amount = %amount, "transfer committed");
        Ok(())
    }

    /// Sets the allowance of `spender` over `caller`'s tokens to exactly
    /// `amount`, replacing whatever was there. No balance check.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidSpender`] if `spender` is the null account.
    pub fn approve(&mut self, caller: Address, spender: Address, amount: Amount) -> LedgerResult<()> {
        if spender.is_null() {
            return Err(rejected("approve", LedgerError::InvalidSpender));
        }
        self.allowances.insert((caller, spender), amount);

        self.emit(LedgerEvent::Approval {
            owner: caller,
            spender,
            value: amount,
        });
        tracing::debug!(owner = %caller, spender = %spender, amount = %amount, "approval committed");
        Ok(())
    }

    /// Moves `amount` from `from` to `to` on behalf of `caller`, spending down
    /// the allowance `from` granted `caller`.
    ///
    /// Emits only a `Transfer`; the allowance decrement is not reported as an
    /// `Approval`.
    ///
    /// # Errors
    ///
    /// Checked in this order:
    /// 1. [`LedgerError::InvalidRecipient`] if `to` is the null account.
    /// 2. [`LedgerError::InvalidSender`] if `from` is the null account.
    /// 3. [`LedgerError::InsufficientAllowance`] if the allowance is below `amount`.
    /// 4. [`LedgerError::InsufficientBalance`] if `from` holds less than `amount`.
    pub fn transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> LedgerResult<()> {
        if to.is_null() {
            return Err(rejected("transfer_from", LedgerError::InvalidRecipient));
        }
        if from.is_null() {
            return Err(rejected("transfer_from", LedgerError::InvalidSender));
        }

        let allowed = self.allowance(&from, &caller);
        let remaining = allowed.checked_sub(amount).ok_or_else(|| {
            rejected(
                "transfer_from",
                LedgerError::InsufficientAllowance {
                    have: allowed,
                    need: amount,
                },
            )
        })?;

        // The allowance is only written once the balances have moved.
        self.move_balance(from, to, amount)
            .map_err(|e| rejected("transfer_from", e))?;
        self.allowances.insert((from, caller), remaining);

        self.emit(LedgerEvent::Transfer {
            from,
            to,
            value: amount,
        });
        tracing::debug!(
            spender = %caller,
            from = %from,
            to = %to,
            amount = %amount,
            remaining_allowance = %remaining,
            "delegated transfer committed"
        );
        Ok(())
    }

    // -------- events --------

    /// Events committed since the last drain, oldest first.
    pub fn pending_events(&self) -> &[EventRecord] {
        &self.pending
    }

    /// Takes the pending events, leaving the queue empty.
    pub fn drain_events(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.pending)
    }

    /// Sequence number the next event will carry.
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    // -------- internals --------

    fn emit(&mut self, event: LedgerEvent) {
        self.pending.push(EventRecord {
            seq: self.next_seq,
            event,
        });
        self.next_seq += 1;
    }

    /// Debits `from` and credits `to`. Both new balances are computed before
    /// either is written.
    fn move_balance(&mut self, from: Address, to: Address, amount: Amount) -> LedgerResult<()> {
        let from_bal = self.balance_of(&from);
        let new_from = from_bal
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                have: from_bal,
                need: amount,
            })?;

        if from == to {
            return Ok(());
        }

        let new_to = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;

        self.balances.insert(from, new_from);
        self.balances.insert(to, new_to);
        Ok(())
    }
}

fn rejected(op: &'static str, err: LedgerError) -> LedgerError {
    tracing::debug!(op, reason = %err, "operation rejected");
    err
}
