//! Execution reports and their deduplicating signatures
//!
//! The gateway reports only the *latest* fill it can see; two consecutive
//! polls can therefore return the same execution. The signature is a
//! deterministic encoding of (timestamp, price, quantity) and is the sole
//! identity used for dedup: a poll whose signature equals the last known one
//! carries no new information.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Deterministic identity of a fill, derived from its observable fields
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FillSignature(String);

impl FillSignature {
    pub fn of(timestamp: DateTime<Utc>, price: Decimal, quantity: u32) -> Self {
        Self(format!(
            "{}_{}_{}",
            timestamp.timestamp_millis(),
            price,
            quantity
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FillSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A confirmed execution report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub price: Decimal,
    /// Contracts filled; always > 0
    pub quantity: u32,
    pub timestamp: DateTime<Utc>,
    pub signature: FillSignature,
}

impl Fill {
    pub fn new(price: Decimal, quantity: u32, timestamp: DateTime<Utc>) -> Self {
        Self {
            price,
            quantity,
            timestamp,
            signature: FillSignature::of(timestamp, price, quantity),
        }
    }

    /// Notional value of this fill (price * quantity)
    pub fn notional(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

impl fmt::Display for Fill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {} [{}]", self.quantity, self.price, self.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_signature_deterministic() {
        let ts = Utc::now();
        let a = Fill::new(dec!(1.2345), 4, ts);
        let b = Fill::new(dec!(1.2345), 4, ts);
        assert_eq!(a.signature, b.signature);
    }

    #[test]
    fn test_signature_distinguishes_fields() {
        let ts = Utc::now();
        let base = Fill::new(dec!(1.2345), 4, ts);
        assert_ne!(base.signature, Fill::new(dec!(1.2346), 4, ts).signature);
        assert_ne!(base.signature, Fill::new(dec!(1.2345), 5, ts).signature);
        assert_ne!(
            base.signature,
            Fill::new(dec!(1.2345), 4, ts + chrono::Duration::milliseconds(1)).signature
        );
    }

    #[test]
    fn test_notional() {
        let fill = Fill::new(dec!(1.5), 4, Utc::now());
        assert_eq!(fill.notional(), dec!(6.0));
    }
}
