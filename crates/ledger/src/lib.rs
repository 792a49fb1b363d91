//! Arbiter Position & P&L Ledger
//!
//! The accounting side of the engine:
//!
//! - Single open position with weighted-average pricing
//! - Realized P&L on settlement, credited to a strictly additive
//!   cumulative total
//! - Ordered session log, max drawdown and win-rate statistics

pub mod error;
pub mod ledger;

pub use error::LedgerError;
pub use ledger::{Ledger, LedgerStats, OpenPosition, weighted_average};
