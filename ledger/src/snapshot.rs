//! # Ledger Snapshots
//!
//! A [`LedgerSnapshot`] is the complete persistent state of a ledger:
//! metadata, supply, every non-zero balance and allowance, and the next event
//! sequence number. Entries are sorted, so the same state always serializes
//! to the same bytes.
//!
//! Restoring re-checks conservation; a snapshot whose balances do not sum to
//! its supply is refused rather than loaded.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{Ledger, TokenMetadata};
use crate::types::{Address, Amount};

/// Failure to read or write a snapshot file.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub account: Address,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowanceEntry {
    pub owner: Address,
    pub spender: Address,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub metadata: TokenMetadata,
    pub total_supply: Amount,
    pub balances: Vec<BalanceEntry>,
    pub allowances: Vec<AllowanceEntry>,
    pub next_seq: u64,
}

impl LedgerSnapshot {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Writes the snapshot to `path`, going through a sibling temp file so a
    /// crash mid-write never leaves a truncated snapshot behind.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        let path = path.as_ref();
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, self.to_json()?)?;
        std::fs::rename(&tmp, path)?;
        tracing::info!(path = %path.display(), next_seq = self.next_seq, "ledger snapshot saved");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }
}

impl Ledger {
    /// Captures the current state. Pending (undrained) events are not part of
    /// the snapshot.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let mut balances: Vec<BalanceEntry> = self
            .balances
            .iter()
            .filter(|(_, amount)| !amount.is_zero())
            .map(|(account, amount)| BalanceEntry {
                account: *account,
                amount: *amount,
            })
            .collect();
        balances.sort_by(|a, b| a.account.cmp(&b.account));

        let mut allowances: Vec<AllowanceEntry> = self
            .allowances
            .iter()
            .filter(|(_, amount)| !amount.is_zero())
            .map(|((owner, spender), amount)| AllowanceEntry {
                owner: *owner,
                spender: *spender,
                amount: *amount,
            })
            .collect();
        allowances.sort_by(|a, b| (a.owner, a.spender).cmp(&(b.owner, b.spender)));

        LedgerSnapshot {
            metadata: self.metadata.clone(),
            total_supply: self.total_supply,
            balances,
            allowances,
            next_seq: self.next_seq,
        }
    }

    /// Rebuilds a ledger from a snapshot.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidSnapshot`] for duplicate entries or an
    ///   allowance granted to the null account. A null-account balance is
    ///   accepted: construction may credit the null deployer.
    /// - [`LedgerError::ArithmeticOverflow`] if the balances overflow when summed.
    /// - [`LedgerError::ConservationViolated`] if they do not sum to the supply.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> LedgerResult<Self> {
        let mut balances = HashMap::with_capacity(snapshot.balances.len());
        for entry in snapshot.balances {
            if balances.insert(entry.account, entry.amount).is_some() {
                return Err(LedgerError::InvalidSnapshot(format!(
                    "duplicate balance entry for {}",
                    entry.account
                )));
            }
        }

        let mut seen = HashSet::with_capacity(snapshot.allowances.len());
        let mut allowances = HashMap::with_capacity(snapshot.allowances.len());
        for entry in snapshot.allowances {
            if entry.spender.is_null() {
                return Err(LedgerError::InvalidSnapshot(
                    "the null account cannot hold an allowance".into(),
                ));
            }
            let key = (entry.owner, entry.spender);
            if !seen.insert(key) {
                return Err(LedgerError::InvalidSnapshot(format!(
                    "duplicate allowance entry for {} -> {}",
                    entry.owner, entry.spender
                )));
            }
            allowances.insert(key, entry.amount);
        }

        let ledger = Ledger {
            metadata: snapshot.metadata,
            total_supply: snapshot.total_supply,
            balances,
            allowances,
            pending: Vec::new(),
            next_seq: snapshot.next_seq,
        };
        ledger.check_conservation()?;

        tracing::info!(
            symbol = %ledger.metadata.symbol,
            holders = ledger.holder_count(),
            next_seq = ledger.next_seq,
            "ledger restored from snapshot"
        );
        Ok(ledger)
    }
}
