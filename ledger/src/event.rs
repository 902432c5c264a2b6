//! # Ledger Events
//!
//! The ledger reports every successful mutation as a [`LedgerEvent`]. Events
//! are queued inside the [`Ledger`](crate::Ledger) in commit order, each
//! stamped with a sequence number, and handed to [`EventSink`]s by
//! [`SharedLedger`](crate::SharedLedger) right after the mutation commits.
//!
//! | Event      | Emitted by                                  |
//! |------------|---------------------------------------------|
//! | `Transfer` | construction (from null), `transfer`, `transfer_from` |
//! | `Approval` | `approve`                                   |

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::types::{Address, Amount};

/// A domain event describing one committed state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LedgerEvent {
    /// `value` moved from `from` to `to`. Zero-value and self-transfers are
    /// reported too.
    #[serde(rename = "transfer")]
    Transfer {
        from: Address,
        to: Address,
        value: Amount,
    },
    /// `owner` set the allowance of `spender` to exactly `value`.
    #[serde(rename = "approval")]
    Approval {
        owner: Address,
        spender: Address,
        value: Amount,
    },
}

/// A [`LedgerEvent`] together with its position in the ledger's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Zero-based, gap-free, strictly increasing.
    pub seq: u64,
    #[serde(flatten)]
    pub event: LedgerEvent,
}

/// Receives committed events.
///
/// Called synchronously while the ledger's write lock is held, so sinks see
/// events in commit order. A sink must not call back into the ledger.
pub trait EventSink: Send + Sync {
    fn on_event(&self, record: &EventRecord);
}

/// An in-memory sink that keeps every record it is given.
#[derive(Debug, Default)]
pub struct EventLog {
    records: Mutex<Vec<EventRecord>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies out everything recorded so far.
    pub fn records(&self) -> Vec<EventRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl EventSink for EventLog {
    fn on_event(&self, record: &EventRecord) {
        self.records.lock().push(record.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_flat_with_type_tag() {
        let record = EventRecord {
            seq: 3,
            event: LedgerEvent::Transfer {
                from: Address::repeat_byte(1),
                to: Address::repeat_byte(2),
                value: Amount::from(5u64),
            },
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["seq"], 3);
        assert_eq!(json["type"], "transfer");
        assert_eq!(json["value"], "5");
        assert_eq!(json["to"], Address::repeat_byte(2).to_hex());

        let back: EventRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn event_log_collects_in_order() {
        let log = EventLog::new();
        assert!(log.is_empty());
        for seq in 0..3 {
            log.on_event(&EventRecord {
                seq,
                event: LedgerEvent::Approval {
                    owner: Address::repeat_byte(1),
                    spender: Address::repeat_byte(2),
                    value: Amount::from(seq),
                },
            });
        }
        let seqs: Vec<u64> = log.records().iter().map(|r| r.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
        assert_eq!(log.len(), 3);
    }
}
