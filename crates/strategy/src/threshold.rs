//! Threshold Arbitrage Strategy
//!
//! Watches for abrupt quote moves over a short rolling window:
//! - Ask jumping more than the threshold -> buy open (ride the spike)
//! - Bid dropping more than the threshold -> sell open
//! - Position is force-closed once the target close interval elapses,
//!   direction-matched (long -> sell close, short -> buy close)

use crate::error::StrategyError;
use crate::generator::{GeneratorCore, SignalGenerator};
use arbiter_core::{
    MarketSnapshot, ParamError, ParamSchema, ParamSpec, ParamValue, SignalKind, TradingSignal,
    validate_params,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

/// Configuration for threshold arbitrage
#[derive(Debug, Clone)]
pub struct ThresholdArbitrageConfig {
    /// Fractional price change that triggers a signal
    pub threshold: Decimal,
    /// Rolling window length (samples)
    pub window_len: usize,
    /// Forced close after this long in position
    pub target_close_interval: Duration,
}

impl Default for ThresholdArbitrageConfig {
    fn default() -> Self {
        Self {
            threshold: dec!(0.005), // 0.5% move
            window_len: 3,
            target_close_interval: Duration::from_secs(5),
        }
    }
}

/// Two-sided threshold arbitrage over a short (bid, ask) window
pub struct ThresholdArbitrage {
    core: GeneratorCore,
    config: ThresholdArbitrageConfig,
    /// Rolling (bid, ask) samples, oldest at the front
    window: VecDeque<(Decimal, Decimal)>,
}

impl ThresholdArbitrage {
    pub fn new(config: ThresholdArbitrageConfig) -> Self {
        let window = VecDeque::with_capacity(config.window_len);
        Self {
            core: GeneratorCore::default(),
            config,
            window,
        }
    }

    fn push_sample(&mut self, bid: Decimal, ask: Decimal) {
        self.window.push_back((bid, ask));
        while self.window.len() > self.config.window_len {
            self.window.pop_front();
        }
    }

    /// Fractional changes of (bid, ask) versus the oldest window sample
    fn window_changes(&self) -> Option<(Decimal, Decimal)> {
        if self.window.len() < self.config.window_len {
            return None;
        }
        let (old_bid, old_ask) = *self.window.front()?;
        let (bid, ask) = *self.window.back()?;
        if old_bid.is_zero() || old_ask.is_zero() {
            return None;
        }
        Some(((bid - old_bid) / old_bid, (ask - old_ask) / old_ask))
    }
}

impl SignalGenerator for ThresholdArbitrage {
    fn name(&self) -> &str {
        "threshold-arbitrage"
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

        self.push_sample(snapshot.bid, snapshot.ask);

        if self.core.holding() || self.core.in_cooldown() {
            return Ok(None);
        }

        let Some((bid_change, ask_change)) = self.window_changes() else {
            // window still warming up
            return Ok(None);
        };

        let signal = if ask_change > self.config.threshold {
            Some(TradingSignal::open(
                SignalKind::BuyOpen,
                self.core.trade_qty,
                snapshot.ask,
                format!(
                    "ask moved {ask_change} over window, above threshold {}",
                    self.config.threshold
                ),
            ))
        } else if bid_change < -self.config.threshold {
            Some(TradingSignal::open(
                SignalKind::SellOpen,
                self.core.trade_qty,
                snapshot.bid,
                format!(
                    "bid moved {bid_change} over window, below threshold -{}",
                    self.config.threshold
                ),
            ))
        } else {
            None
        };

        if let Some(signal) = &signal {
            log::info!("[{}] open signal: {}", self.name(), signal);
            self.core.mark(signal);
        }

        Ok(signal)
    }

    fn check_close(&mut self, held: Duration) -> Result<Option<TradingSignal>, StrategyError> {
        if !self.core.holding() {
            return Ok(None);
        }
        if held >= self.config.target_close_interval {
            let reason = format!(
                "target close interval {:?} reached",
                self.config.target_close_interval
            );
            return Ok(self.core.close_signal(reason));
        }
        Ok(None)
    }

    fn update_position(&mut self, quantity: u32, opening: bool) {
        self.core.update_position(quantity, opening);
    }

    fn position(&self) -> u32 {
        self.core.position
    }

    fn reset(&mut self) {
        self.core.reset();
        self.window.clear();
    }

    fn apply_params(&mut self, updates: &BTreeMap<String, ParamValue>) -> Result<(), ParamError> {
        validate_params(&self.param_schema(), updates)?;
        self.core.apply_base_params(updates);
        if let Some(threshold) = updates.get("threshold").and_then(ParamValue::as_float) {
            self.config.threshold = threshold;
        }
        if let Some(secs) = updates
            .get("target_close_interval")
            .and_then(ParamValue::as_int)
        {
            self.config.target_close_interval = Duration::from_secs(secs as u64);
        }
        Ok(())
    }

    fn param_schema(&self) -> ParamSchema {
        let mut schema = self.core.base_schema();
        schema.insert(
            "threshold".to_string(),
            ParamSpec::float(
                "Price change threshold",
                dec!(0.005),
                dec!(0.001),
                dec!(0.1),
                dec!(0.001),
                "Fractional quote move that triggers a signal",
            ),
        );
        schema.insert(
            "target_close_interval".to_string(),
            ParamSpec::int(
                "Target close interval",
                5,
                1,
                600,
                1,
                "Seconds from open to forced close",
            ),
        );
        schema
    }
}
