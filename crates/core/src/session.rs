//! Closed-cycle trade records
//!
//! One `TradingSession` is created per fully closed cycle and appended to an
//! ordered log. Records are immutable once emitted; `cumulative_profit` is
//! the ledger's running total *after* this session settled.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Immutable record of one completed open->close trading cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingSession {
    /// Strategy that drove the cycle
    pub strategy: String,
    /// When the opening fill was confirmed
    pub open_time: DateTime<Utc>,
    /// Opening fill price
    pub open_price: Decimal,
    /// Weighted average close price over all closing fills
    pub avg_close_price: Decimal,
    /// Contracts traded in the cycle
    pub total_qty: u32,
    /// Realized profit of this session
    pub profit: Decimal,
    /// Ledger cumulative profit after this session
    pub cumulative_profit: Decimal,
    /// Wall-clock seconds from signal acceptance to settlement
    pub actual_wait_secs: Decimal,
}
