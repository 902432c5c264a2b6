//! # Shared Ledger Handle
//!
//! [`SharedLedger`] is the thread-safe front door to a [`Ledger`]. It is a
//! single-writer design: every mutation holds the write lock from the first
//! check to the last event dispatch, and queries hold the read lock. Readers
//! can never observe a half-applied operation.
//!
//! After each successful mutation the ledger's pending events are drained
//! and handed to every subscribed [`EventSink`], still under the write lock,
//! so sinks receive events in exactly the order they were committed.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::LedgerResult;
use crate::event::{EventRecord, EventSink};
use crate::ledger::{Ledger, TokenMetadata};
use crate::snapshot::LedgerSnapshot;
use crate::types::{Address, Amount};

/// Cheap to clone; all clones refer to the same ledger.
#[derive(Clone)]
pub struct SharedLedger {
    inner: Arc<RwLock<Ledger>>,
    sinks: Arc<RwLock<Vec<Arc<dyn EventSink>>>>,
}

impl SharedLedger {
    /// Takes ownership of `ledger`. Events already pending in it (the
    /// deployment transfer, typically) are kept until the first
    /// [`flush_events`](Self::flush_events) or mutation, so sinks subscribed
    /// in between still receive them.
    pub fn new(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ledger)),
            sinks: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn subscribe(&self, sink: Arc<dyn EventSink>) {
        self.sinks.write().push(sink);
    }

    /// Dispatches any pending events without mutating anything.
    pub fn flush_events(&self) -> Vec<EventRecord> {
        let mut ledger = self.inner.write();
        self.dispatch(&mut ledger)
    }

    // -------- mutations --------
    //
    // Each returns the events it dispatched: normally the single event the
    // operation committed, preceded by anything still pending from before.

    pub fn transfer(
        &self,
        caller: Address,
        to: Address,
        amount: Amount,
    ) -> LedgerResult<Vec<EventRecord>> {
        self.mutate(|ledger| ledger.transfer(caller, to, amount))
    }

    pub fn approve(
        &self,
        caller: Address,
        spender: Address,
        amount: Amount,
    ) -> LedgerResult<Vec<EventRecord>> {
        self.mutate(|ledger| ledger.approve(caller, spender, amount))
    }

    pub fn transfer_from(
        &self,
        caller: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> LedgerResult<Vec<EventRecord>> {
        self.mutate(|ledger| ledger.transfer_from(caller, from, to, amount))
    }

    // -------- queries --------

    /// Runs `f` against a consistent view of the ledger.
    pub fn read<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        f(&*self.inner.read())
    }

    pub fn metadata(&self) -> TokenMetadata {
        self.read(|ledger| ledger.metadata().clone())
    }

    pub fn total_supply(&self) -> Amount {
        self.read(Ledger::total_supply)
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.read(|ledger| ledger.balance_of(account))
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.read(|ledger| ledger.allowance(owner, spender))
    }

    pub fn holder_count(&self) -> usize {
        self.read(Ledger::holder_count)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.read(Ledger::snapshot)
    }

    // -------- internals --------

    fn mutate(
        &self,
        op: impl FnOnce(&mut Ledger) -> LedgerResult<()>,
    ) -> LedgerResult<Vec<EventRecord>> {
        let mut ledger = self.inner.write();
        op(&mut ledger)?;
        Ok(self.dispatch(&mut ledger))
    }

    fn dispatch(&self, ledger: &mut Ledger) -> Vec<EventRecord> {
        let events = ledger.drain_events();
        if !events.is_empty() {
            let sinks = self.sinks.read();
            for record in &events {
                for sink in sinks.iter() {
                    sink.on_event(record);
                }
            }
        }
        events
    }
}
