//! Trading signals and position direction
//!
//! A signal is an immutable instruction produced by a strategy: open a
//! position in one direction, or close the one it already holds. Price zero
//! means "use market price" at the gateway.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of an open position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// The signal kind that closes a position on this side
    pub fn closing_kind(self) -> SignalKind {
        match self {
            Direction::Long => SignalKind::SellClose,
            Direction::Short => SignalKind::BuyClose,
        }
    }
}

/// What a signal instructs the executor to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalKind {
    BuyOpen,
    SellOpen,
    BuyClose,
    SellClose,
}

impl SignalKind {
    pub fn is_open(self) -> bool {
        matches!(self, SignalKind::BuyOpen | SignalKind::SellOpen)
    }

    pub fn is_close(self) -> bool {
        !self.is_open()
    }

    /// Position direction an opening signal establishes
    pub fn direction(self) -> Direction {
        match self {
            SignalKind::BuyOpen | SignalKind::BuyClose => Direction::Long,
            SignalKind::SellOpen | SignalKind::SellClose => Direction::Short,
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalKind::BuyOpen => "buy-open",
            SignalKind::SellOpen => "sell-open",
            SignalKind::BuyClose => "buy-close",
            SignalKind::SellClose => "sell-close",
        };
        f.write_str(s)
    }
}

/// An instruction to open or close a position, produced by a strategy.
/// Immutable once produced; consumed exactly once by the cycle executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingSignal {
    pub kind: SignalKind,
    /// Contracts to trade; always > 0
    pub quantity: u32,
    /// Limit price; `Decimal::ZERO` means "use market price"
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
    /// Strategy confidence, >= 0 (1 = nominal)
    pub confidence: Decimal,
    /// Human-readable trigger description
    pub reason: String,
    /// Deviation from reference at trigger time (mean-reversion style
    /// strategies); zero when not applicable
    pub deviation: Decimal,
}

impl TradingSignal {
    /// Opening signal at a quoted price
    pub fn open(kind: SignalKind, quantity: u32, price: Decimal, reason: impl Into<String>) -> Self {
        debug_assert!(kind.is_open());
        Self {
            kind,
            quantity,
            price,
            timestamp: Utc::now(),
            confidence: Decimal::ONE,
            reason: reason.into(),
            deviation: Decimal::ZERO,
        }
    }

    /// Closing signal at market price
    pub fn close(kind: SignalKind, quantity: u32, reason: impl Into<String>) -> Self {
        debug_assert!(kind.is_close());
        Self {
            kind,
            quantity,
            price: Decimal::ZERO,
            timestamp: Utc::now(),
            confidence: Decimal::ONE,
            reason: reason.into(),
            deviation: Decimal::ZERO,
        }
    }

    pub fn with_confidence(mut self, confidence: Decimal) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_deviation(mut self, deviation: Decimal) -> Self {
        self.deviation = deviation;
        self
    }

    /// Whether the gateway should treat this as a market order
    pub fn is_market(&self) -> bool {
        self.price.is_zero()
    }
}

impl fmt::Display for TradingSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.deviation.is_zero() {
            write!(
                f,
                "{} {} @ {} (confidence {})",
                self.kind, self.quantity, self.price, self.confidence
            )
        } else {
            write!(
                f,
                "{} {} @ {} (deviation {})",
                self.kind, self.quantity, self.price, self.deviation
            )
        }
    }
}
