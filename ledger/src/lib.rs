// Copyright (c) 2026 Community Cash Contributors. MIT License.
// See LICENSE for details.

//! # Community Cash: Token Ledger
//!
//! A fixed-supply, divisible, single-asset token ledger. Owners move their
//! balance directly, or grant a spender a capped allowance and let the spender
//! move it for them. That is the whole state machine; everything in this
//! crate exists to make it exact:
//!
//! - **types**: 20-byte [`Address`] and 256-bit [`Amount`] with checked math.
//! - **ledger**: the [`Ledger`] itself: construct, query, `transfer`,
//!   `approve`, `transfer_from`.
//! - **event**: `Transfer` / `Approval` records and the [`EventSink`] seam.
//! - **shared**: [`SharedLedger`], the single-writer handle for
//!   multi-threaded hosts.
//! - **snapshot**: deterministic, conservation-checked persistence.
//! - **config**: deployment parameters and defaults.
//!
//! ## Ground Rules
//!
//! 1. Total supply is set once. Nothing mints, nothing burns.
//! 2. Every failed operation leaves every balance, allowance and event queue
//!    exactly as it found them.
//! 3. Arithmetic is checked. Money does not wrap.
//!
//! ```
//! use cash_ledger::{Address, Amount, Ledger};
//!
//! let owner = Address::repeat_byte(0xa1);
//! let friend = Address::repeat_byte(0xb2);
//! let mut ledger = Ledger::new("Community Cash", "RENT", 18, Amount::from(1_000_000u64), owner)?;
//!
//! let one = Amount::from(1u64).scaled(18).unwrap();
//! ledger.transfer(owner, friend, one)?;
//! assert_eq!(ledger.balance_of(&friend), one);
//! # Ok::<(), cash_ledger::LedgerError>(())
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod ledger;
pub mod shared;
pub mod snapshot;
pub mod types;

pub use config::{ConfigError, TokenConfig};
pub use error::{LedgerError, LedgerResult};
pub use event::{EventLog, EventRecord, EventSink, LedgerEvent};
pub use ledger::{Ledger, TokenMetadata};
pub use shared::SharedLedger;
pub use snapshot::{LedgerSnapshot, SnapshotError};
pub use types::{Address, Amount};
