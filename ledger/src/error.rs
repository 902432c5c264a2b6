//! Ledger errors.
//!
//! Every variant is a deterministic precondition failure. None is transient,
//! so none is worth retrying with the same inputs.

use thiserror::Error;

use crate::types::Amount;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("invalid recipient: tokens cannot be sent to the null account")]
    InvalidRecipient,

    #[error("invalid spender: the null account cannot hold an allowance")]
    InvalidSpender,

    #[error("invalid sender: nothing can be spent from the null account")]
    InvalidSender,

    #[error("insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: Amount, need: Amount },

    #[error("insufficient allowance: have {have}, need {need}")]
    InsufficientAllowance { have: Amount, need: Amount },

    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    #[error("conservation invariant violated: {0}")]
    ConservationViolated(String),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

impl LedgerError {
    /// Stable machine-readable name of the variant, used by API layers.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::InvalidRecipient => "InvalidRecipient",
            LedgerError::InvalidSpender => "InvalidSpender",
            LedgerError::InvalidSender => "InvalidSender",
            LedgerError::InsufficientBalance { .. } => "InsufficientBalance",
            LedgerError::InsufficientAllowance { .. } => "InsufficientAllowance",
            LedgerError::ArithmeticOverflow => "ArithmeticOverflow",
            LedgerError::ConservationViolated(_) => "ConservationViolated",
            LedgerError::InvalidSnapshot(_) => "InvalidSnapshot",
        }
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
