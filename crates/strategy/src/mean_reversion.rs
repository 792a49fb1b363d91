//! Mean Reversion Strategy
//!
//! Tracks the deviation of the mid price from its moving average:
//! - Mid far below the average -> buy open, expecting a pull back up
//! - Mid far above the average -> sell open
//! - Closes on reversion toward the average, or on a stop loss measured
//!   against the entry price from the last observed mid

use crate::error::StrategyError;
use crate::generator::{GeneratorCore, SignalGenerator};
use arbiter_core::{
    Direction, MarketSnapshot, ParamError, ParamSchema, ParamSpec, ParamValue, SignalKind,
    TradingSignal, validate_params,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

/// Configuration for mean reversion
#[derive(Debug, Clone)]
pub struct MeanReversionConfig {
    /// Moving-average window (samples)
    pub window_len: usize,
    /// Deviation from the average that triggers an open
    pub open_threshold: Decimal,
    /// Deviation under which the position is considered reverted
    pub reversion_target: Decimal,
    /// Adverse move fraction that triggers the stop loss
    pub stop_loss_pct: Decimal,
}

impl Default for MeanReversionConfig {
    fn default() -> Self {
        Self {
            window_len: 20,
            open_threshold: dec!(0.003),   // 0.3%
            reversion_target: dec!(0.0005), // 0.05%
            stop_loss_pct: dec!(0.01),     // 1%
        }
    }
}

/// Moving-average reversion strategy over mid prices
pub struct MeanReversion {
    core: GeneratorCore,
    config: MeanReversionConfig,
    /// Rolling mid prices, oldest at the front
    mids: VecDeque<Decimal>,
    /// Latest deviation from the moving average
    current_deviation: Decimal,
    /// Latest mid seen by `analyze`, the mark for stop-loss checks
    last_mid: Decimal,
    /// Open price of the held position
    entry_price: Option<Decimal>,
}

impl MeanReversion {
    pub fn new(config: MeanReversionConfig) -> Self {
        let mids = VecDeque::with_capacity(config.window_len);
        Self {
            core: GeneratorCore::default(),
            config,
            mids,
            current_deviation: Decimal::ZERO,
            last_mid: Decimal::ZERO,
            entry_price: None,
        }
    }

    fn push_mid(&mut self, mid: Decimal) {
        self.mids.push_back(mid);
        while self.mids.len() > self.config.window_len {
            self.mids.pop_front();
        }
    }

    fn moving_average(&self) -> Option<Decimal> {
        if self.mids.len() < self.config.window_len {
            return None;
        }
        let sum: Decimal = self.mids.iter().copied().sum();
        Some(sum / Decimal::from(self.mids.len()))
    }

    /// Signed return of the held position at the last observed mid
    fn pnl_ratio(&self) -> Option<Decimal> {
        let entry = self.entry_price?;
        let direction = self.core.direction?;
        if entry.is_zero() || self.last_mid.is_zero() {
            return None;
        }
        let ratio = match direction {
            Direction::Long => (self.last_mid - entry) / entry,
            Direction::Short => (entry - self.last_mid) / entry,
        };
        Some(ratio)
    }
}

impl SignalGenerator for MeanReversion {
    fn name(&self) -> &str {
        "mean-reversion"
    }

    fn analyze(
        &mut self,
        snapshot: &MarketSnapshot,
    ) -> Result<Option<TradingSignal>, StrategyError> {
        if snapshot.bid.is_zero() || snapshot.ask.is_zero() {
            return Err(StrategyError::DataUnavailable("bid/ask"));
        }
        if !snapshot.history_ready {
            return Ok(None);
        }

        self.last_mid = snapshot.mid_price;
        self.push_mid(snapshot.mid_price);

        let Some(ma) = self.moving_average() else {
            // window still warming up
            return Ok(None);
        };
        if ma.is_zero() {
            return Err(StrategyError::DataUnavailable("moving average"));
        }
        self.current_deviation = (snapshot.mid_price - ma) / ma;

        if self.core.holding() || self.core.in_cooldown() {
            return Ok(None);
        }

        let deviation = self.current_deviation;
        let signal = if deviation < -self.config.open_threshold {
            Some(TradingSignal::open(
                SignalKind::BuyOpen,
                self.core.trade_qty,
                snapshot.ask,
                format!("mid {deviation} below average, expecting reversion up"),
            ))
        } else if deviation > self.config.open_threshold {
            Some(TradingSignal::open(
                SignalKind::SellOpen,
                self.core.trade_qty,
                snapshot.bid,
                format!("mid {deviation} above average, expecting reversion down"),
            ))
        } else {
            None
        };

        let signal = signal.map(|s| {
            let confidence = (deviation.abs() / self.config.open_threshold).min(dec!(2));
            s.with_confidence(confidence).with_deviation(deviation)
        });

        if let Some(signal) = &signal {
            log::info!("[{}] open signal: {}", self.name(), signal);
            self.core.mark(signal);
        }

        Ok(signal)
    }

    fn check_close(&mut self, _held: Duration) -> Result<Option<TradingSignal>, StrategyError> {
        if !self.core.holding() {
            return Ok(None);
        }

        if self.current_deviation.abs() < self.config.reversion_target {
            return Ok(self.core.close_signal(format!(
                "deviation reverted ({})",
                self.current_deviation
            )));
        }
        if let Some(ratio) = self.pnl_ratio()
            && ratio < -self.config.stop_loss_pct
        {
            return Ok(self
                .core
                .close_signal(format!("stop loss hit (pnl ratio {ratio})")));
        }
        Ok(None)
    }

    fn update_position(&mut self, quantity: u32, opening: bool) {
        if opening
            && self.entry_price.is_none()
            && let Some(signal) = &self.core.last_signal
            && signal.kind.is_open()
        {
            self.entry_price = Some(signal.price);
        }
        self.core.update_position(quantity, opening);
        if !self.core.holding() {
            self.entry_price = None;
        }
    }

    fn position(&self) -> u32 {
        self.core.position
    }

    fn reset(&mut self) {
        self.core.reset();
        self.mids.clear();
        self.current_deviation = Decimal::ZERO;
        self.last_mid = Decimal::ZERO;
        self.entry_price = None;
    }

    fn apply_params(&mut self, updates: &BTreeMap<String, ParamValue>) -> Result<(), ParamError> {
        validate_params(&self.param_schema(), updates)?;
        self.core.apply_base_params(updates);
        if let Some(v) = updates.get("open_threshold").and_then(ParamValue::as_float) {
            self.config.open_threshold = v;
        }
        if let Some(v) = updates
            .get("reversion_target")
            .and_then(ParamValue::as_float)
        {
            self.config.reversion_target = v;
        }
        if let Some(v) = updates.get("stop_loss_pct").and_then(ParamValue::as_float) {
            self.config.stop_loss_pct = v;
        }
        Ok(())
    }

    fn param_schema(&self) -> ParamSchema {
        let mut schema = self.core.base_schema();
        schema.insert(
            "open_threshold".to_string(),
            ParamSpec::float(
                "Deviation threshold",
                dec!(0.003),
                dec!(0.0005),
                dec!(0.05),
                dec!(0.0005),
                "Deviation from the moving average that triggers an open",
            ),
        );
        schema.insert(
            "reversion_target".to_string(),
            ParamSpec::float(
                "Reversion target",
                dec!(0.0005),
                dec!(0.0),
                dec!(0.01),
                dec!(0.0001),
                "Deviation under which the position closes",
            ),
        );
        schema.insert(
            "stop_loss_pct".to_string(),
            ParamSpec::float(
                "Stop loss",
                dec!(0.01),
                dec!(0.001),
                dec!(0.2),
                dec!(0.001),
                "Adverse move fraction that forces a close",
            ),
        );
        schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snap(mid: Decimal) -> MarketSnapshot {
        // symmetric one-tick spread around the mid
        MarketSnapshot::new(mid - dec!(0.0005), mid + dec!(0.0005), Utc::now())
    }

    fn warm_up(strategy: &mut MeanReversion, mid: Decimal, ticks: usize) {
        for _ in 0..ticks {
            assert!(strategy.analyze(&snap(mid)).unwrap().is_none());
        }
    }

    #[test]
    fn test_no_signal_during_warm_up() {
        let mut strategy = MeanReversion::new(MeanReversionConfig::default());
        // 19 samples: window of 20 is not yet full even with a large move
        for _ in 0..18 {
            assert!(strategy.analyze(&snap(dec!(1.000))).unwrap().is_none());
        }
        assert!(strategy.analyze(&snap(dec!(1.100))).unwrap().is_none());
    }

    #[test]
    fn test_dip_emits_buy_with_confidence_and_deviation() {
        let mut strategy = MeanReversion::new(MeanReversionConfig::default());
        warm_up(&mut strategy, dec!(1.000), 19);

        // 20th sample at 0.990: ma = (19 + 0.99)/20 = 0.9995,
        // deviation = (0.990 - 0.9995)/0.9995 ~ -0.95%, well past 0.3%
        let signal = strategy
            .analyze(&snap(dec!(0.990)))
            .unwrap()
            .expect("dip should trigger");
        assert_eq!(signal.kind, SignalKind::BuyOpen);
        assert!(signal.deviation < -dec!(0.003));
        // |deviation|/threshold > 2, so confidence is clamped
        assert_eq!(signal.confidence, dec!(2));
    }

    #[test]
    fn test_rally_emits_sell() {
        let mut strategy = MeanReversion::new(MeanReversionConfig::default());
        warm_up(&mut strategy, dec!(1.000), 19);
        let signal = strategy
            .analyze(&snap(dec!(1.010)))
            .unwrap()
            .expect("rally should trigger");
        assert_eq!(signal.kind, SignalKind::SellOpen);
        assert!(signal.deviation > dec!(0.003));
    }

    #[test]
    fn test_reversion_closes_position() {
        let mut strategy = MeanReversion::new(MeanReversionConfig::default());
        warm_up(&mut strategy, dec!(1.000), 19);
        let open = strategy.analyze(&snap(dec!(0.990))).unwrap().unwrap();
        strategy.update_position(open.quantity, true);

        // deviation still large: no close
        assert!(strategy.check_close(Duration::from_secs(1)).unwrap().is_none());

        // mid drifts back to the average; repeated samples drag the ma along
        // until the deviation collapses under the reversion target
        let mut closed = None;
        for _ in 0..40 {
            strategy.analyze(&snap(dec!(1.000))).unwrap();
            if let Some(signal) = strategy.check_close(Duration::from_secs(1)).unwrap() {
                closed = Some(signal);
                break;
            }
        }
        let close = closed.expect("reversion close");
        assert_eq!(close.kind, SignalKind::SellClose);
        assert_eq!(close.quantity, 10);
    }

    #[test]
    fn test_stop_loss_closes_long() {
        let mut strategy = MeanReversion::new(MeanReversionConfig::default());
        warm_up(&mut strategy, dec!(1.000), 19);
        let open = strategy.analyze(&snap(dec!(0.990))).unwrap().unwrap();
        assert_eq!(open.kind, SignalKind::BuyOpen);
        strategy.update_position(open.quantity, true);

        // mid keeps falling: entry was the ask (~0.9905), a mid of 0.975
        // is well past the 1% stop while the deviation stays wide
        strategy.analyze(&snap(dec!(0.975))).unwrap();
        let close = strategy
            .check_close(Duration::from_secs(1))
            .unwrap()
            .expect("stop loss close");
        assert_eq!(close.kind, SignalKind::SellClose);
        assert!(close.reason.contains("stop loss"));
    }

    #[test]
    fn test_entry_price_cleared_after_full_close() {
        let mut strategy = MeanReversion::new(MeanReversionConfig::default());
        warm_up(&mut strategy, dec!(1.000), 19);
        let open = strategy.analyze(&snap(dec!(0.990))).unwrap().unwrap();
        strategy.update_position(open.quantity, true);
        assert!(strategy.entry_price.is_some());

        strategy.update_position(open.quantity, false);
        assert!(strategy.entry_price.is_none());
        assert_eq!(strategy.position(), 0);
    }
}
