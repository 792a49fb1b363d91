//! Error types for the ledger crate

use thiserror::Error;

/// Bookkeeping rule violations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    /// Only one position may be open at a time
    #[error("a position is already open")]
    PositionAlreadyOpen,

    /// Settlement and close accounting need an open position
    #[error("no open position")]
    NoOpenPosition,

    /// Close fills must carry a nonzero total quantity
    #[error("empty close fill set")]
    EmptyCloseFills,
}
