//! Signal generator contract and shared per-strategy state
//!
//! A generator is a pure function of market snapshots plus its own internal
//! state. Two rules hold for every variant and live in [`GeneratorCore`]:
//! a generator holding a nonzero position emits no opening signal (one open
//! cycle per strategy), and repeat signals inside the cooldown window are
//! suppressed, measured from the generator's own last signal time.

use crate::error::StrategyError;
use arbiter_core::{
    Direction, MarketSnapshot, ParamError, ParamSchema, ParamSpec, ParamValue, TradingSignal,
};
use rust_decimal::prelude::ToPrimitive;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Capability interface implemented by every strategy variant
pub trait SignalGenerator: Send {
    /// Variant name for logging
    fn name(&self) -> &str;

    /// Analyze a snapshot and possibly emit an opening signal
    fn analyze(
        &mut self,
        snapshot: &MarketSnapshot,
    ) -> Result<Option<TradingSignal>, StrategyError>;

    /// Decide whether the open position should be closed. `held` is
    /// measured from the acceptance of the driving signal, not from the
    /// opening fill. Variants use indicators cached during `analyze`.
    fn check_close(&mut self, held: Duration) -> Result<Option<TradingSignal>, StrategyError>;

    /// Fold a confirmed fill quantity into the generator's position view
    fn update_position(&mut self, quantity: u32, opening: bool);

    /// Currently held quantity
    fn position(&self) -> u32;

    /// Clear position, signal history and cached indicators
    fn reset(&mut self);

    /// Apply a validated parameter update; prior values are retained when
    /// validation fails
    fn apply_params(&mut self, updates: &BTreeMap<String, ParamValue>) -> Result<(), ParamError>;

    /// Schema of tunable parameters for the configuration surface
    fn param_schema(&self) -> ParamSchema;
}

/// State and behavior common to all variants
#[derive(Debug, Clone)]
pub struct GeneratorCore {
    /// Held quantity (contracts)
    pub position: u32,
    /// Direction of the held position, None when flat
    pub direction: Option<Direction>,
    /// Last signal emitted (open or close)
    pub last_signal: Option<TradingSignal>,
    /// When the last signal was emitted
    pub last_signal_at: Option<Instant>,
    /// Contracts per opening signal
    pub trade_qty: u32,
    /// Minimum gap between two signals from this generator
    pub cooldown: Duration,
}

impl Default for GeneratorCore {
    fn default() -> Self {
        Self {
            position: 0,
            direction: None,
            last_signal: None,
            last_signal_at: None,
            trade_qty: 10,
            cooldown: Duration::from_secs(1),
        }
    }
}

impl GeneratorCore {
    /// Whether the generator currently holds a position
    pub fn holding(&self) -> bool {
        self.position > 0
    }

    /// Whether a new signal would fall inside the cooldown window
    pub fn in_cooldown(&self) -> bool {
        match self.last_signal_at {
            Some(at) => at.elapsed() < self.cooldown,
            None => false,
        }
    }

    /// Record an emitted signal for cooldown tracking
    pub fn mark(&mut self, signal: &TradingSignal) {
        self.last_signal = Some(signal.clone());
        self.last_signal_at = Some(Instant::now());
    }

    pub fn update_position(&mut self, quantity: u32, opening: bool) {
        if opening {
            self.position += quantity;
            if self.direction.is_none()
                && let Some(signal) = &self.last_signal
                && signal.kind.is_open()
            {
                self.direction = Some(signal.kind.direction());
            }
        } else {
            self.position = self.position.saturating_sub(quantity);
            if self.position == 0 {
                self.direction = None;
            }
        }
    }

    pub fn reset(&mut self) {
        self.position = 0;
        self.direction = None;
        self.last_signal = None;
        self.last_signal_at = None;
    }

    /// Direction-matched market close for the full held quantity
    pub fn close_signal(&self, reason: impl Into<String>) -> Option<TradingSignal> {
        let direction = self.direction?;
        if self.position == 0 {
            return None;
        }
        Some(TradingSignal::close(
            direction.closing_kind(),
            self.position,
            reason,
        ))
    }

    /// Schema entries shared by every variant
    pub fn base_schema(&self) -> ParamSchema {
        let mut schema = ParamSchema::new();
        schema.insert(
            "trade_qty".to_string(),
            ParamSpec::int("Trade quantity", 10, 1, 100, 1, "Contracts per opening signal"),
        );
        schema.insert(
            "signal_cooldown".to_string(),
            ParamSpec::float(
                "Signal cooldown",
                rust_decimal_macros::dec!(1.0),
                rust_decimal_macros::dec!(0.1),
                rust_decimal_macros::dec!(60.0),
                rust_decimal_macros::dec!(0.1),
                "Minimum seconds between two signals",
            ),
        );
        schema
    }

    /// Apply the shared schema entries from a validated update map
    pub fn apply_base_params(&mut self, updates: &BTreeMap<String, ParamValue>) {
        if let Some(qty) = updates.get("trade_qty").and_then(ParamValue::as_int) {
            self.trade_qty = qty as u32;
        }
        if let Some(secs) = updates.get("signal_cooldown").and_then(ParamValue::as_float) {
            // schema bounds keep this positive and small
            if let Some(ms) = (secs * rust_decimal_macros::dec!(1000)).trunc().to_u64() {
                self.cooldown = Duration::from_millis(ms);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_core::SignalKind;
    use rust_decimal_macros::dec;

    #[test]
    fn test_core_defaults() {
        let core = GeneratorCore::default();
        assert_eq!(core.trade_qty, 10);
        assert_eq!(core.cooldown, Duration::from_secs(1));
        assert!(!core.holding());
        assert!(!core.in_cooldown());
    }

    #[test]
    fn test_position_tracking_and_direction() {
        let mut core = GeneratorCore::default();
        let open = TradingSignal::open(SignalKind::BuyOpen, 10, dec!(1.0), "test");
        core.mark(&open);
        core.update_position(10, true);

        assert!(core.holding());
        assert_eq!(core.direction, Some(Direction::Long));

        core.update_position(4, false);
        assert_eq!(core.position, 6);
        assert_eq!(core.direction, Some(Direction::Long));

        core.update_position(6, false);
        assert!(!core.holding());
        assert!(core.direction.is_none());
    }

    #[test]
    fn test_close_never_underflows() {
        let mut core = GeneratorCore::default();
        core.update_position(3, true);
        core.update_position(5, false);
        assert_eq!(core.position, 0);
    }

    #[test]
    fn test_cooldown_after_mark() {
        let mut core = GeneratorCore::default();
        let signal = TradingSignal::open(SignalKind::SellOpen, 1, dec!(2.0), "test");
        core.mark(&signal);
        assert!(core.in_cooldown());
    }

    #[test]
    fn test_close_signal_matches_direction() {
        let mut core = GeneratorCore::default();
        let open = TradingSignal::open(SignalKind::SellOpen, 10, dec!(1.0), "test");
        core.mark(&open);
        core.update_position(10, true);

        let close = core.close_signal("forced").unwrap();
        assert_eq!(close.kind, SignalKind::BuyClose);
        assert_eq!(close.quantity, 10);
        assert!(close.is_market());
    }

    #[test]
    fn test_apply_base_params() {
        let mut core = GeneratorCore::default();
        let mut updates = BTreeMap::new();
        updates.insert("trade_qty".to_string(), ParamValue::Int(25));
        updates.insert("signal_cooldown".to_string(), ParamValue::Float(dec!(2.5)));
        core.apply_base_params(&updates);
        assert_eq!(core.trade_qty, 25);
        assert_eq!(core.cooldown, Duration::from_millis(2500));
    }
}
