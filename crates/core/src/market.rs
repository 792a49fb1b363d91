//! Market snapshot consumed by signal generators
//!
//! One snapshot per poll tick, produced by the external quote-acquisition
//! collaborator. Option-analytics fields are optional: only the volatility
//! strategy requires them, and a feed that cannot supply them simply leaves
//! them unset.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Direction of the underlying's recent move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

/// Point-in-time view of the quoted market
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Best bid
    pub bid: Decimal,
    /// Best ask
    pub ask: Decimal,
    /// Mid price ((bid + ask) / 2 unless the feed supplies its own)
    pub mid_price: Decimal,
    /// When the quote was observed
    pub timestamp: DateTime<Utc>,
    /// Whether the feed's rolling price history is warmed up
    pub history_ready: bool,
    /// Fractional bid change over the feed's history window
    pub bid_change_pct: Decimal,
    /// Fractional ask change over the feed's history window
    pub ask_change_pct: Decimal,
    /// Implied volatility
    pub iv: Option<Decimal>,
    /// Fractional change in implied volatility
    pub iv_change_pct: Option<Decimal>,
    /// Option time value
    pub time_value: Option<Decimal>,
    /// Calendar days until expiry
    pub days_to_expiry: Option<u32>,
    /// Recent direction of the underlying
    pub underlying_trend: Option<Trend>,
}

impl MarketSnapshot {
    /// Create a snapshot from a bid/ask pair; mid is derived
    pub fn new(bid: Decimal, ask: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self {
            bid,
            ask,
            mid_price: (bid + ask) / dec!(2),
            timestamp,
            history_ready: true,
            bid_change_pct: Decimal::ZERO,
            ask_change_pct: Decimal::ZERO,
            iv: None,
            iv_change_pct: None,
            time_value: None,
            days_to_expiry: None,
            underlying_trend: None,
        }
    }

    pub fn with_changes(mut self, bid_change: Decimal, ask_change: Decimal) -> Self {
        self.bid_change_pct = bid_change;
        self.ask_change_pct = ask_change;
        self
    }

    pub fn with_history_ready(mut self, ready: bool) -> Self {
        self.history_ready = ready;
        self
    }

    /// Attach option analytics (volatility strategy inputs)
    pub fn with_option_analytics(
        mut self,
        iv: Decimal,
        iv_change: Decimal,
        time_value: Decimal,
        days_to_expiry: u32,
        trend: Trend,
    ) -> Self {
        self.iv = Some(iv);
        self.iv_change_pct = Some(iv_change);
        self.time_value = Some(time_value);
        self.days_to_expiry = Some(days_to_expiry);
        self.underlying_trend = Some(trend);
        self
    }

    /// Quoted premium (mid of bid/ask)
    pub fn premium(&self) -> Decimal {
        (self.bid + self.ask) / dec!(2)
    }

    /// Absolute quoted spread
    pub fn spread(&self) -> Decimal {
        self.ask - self.bid
    }

    /// Spread relative to mid, zero when the mid is degenerate
    pub fn relative_spread(&self) -> Decimal {
        if self.mid_price.is_zero() {
            Decimal::ZERO
        } else {
            self.spread() / self.mid_price
        }
    }
}
