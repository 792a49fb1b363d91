//! Volatility Strategy
//!
//! Option strategy driven by implied volatility and time value:
//! - Buys premium when IV is cheap, time value is a small share of the
//!   premium and expiry is far enough away
//! - Sells premium when IV is rich and expiry is not imminent
//! - Closes on IV reverting toward the opposite band, on time-value decay
//!   from entry, or on a holding-time cap

use crate::error::StrategyError;
use crate::generator::{GeneratorCore, SignalGenerator};
use arbiter_core::{
    Direction, MarketSnapshot, ParamError, ParamSchema, ParamSpec, ParamValue, SignalKind,
    TradingSignal, Trend, validate_params,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use std::time::Duration;

/// Configuration for the volatility strategy
#[derive(Debug, Clone)]
pub struct VolatilityConfig {
    /// IV level below which premium is considered cheap
    pub iv_lower: Decimal,
    /// IV level above which premium is considered rich
    pub iv_upper: Decimal,
    /// IV-change band around zero required at entry
    pub iv_change_threshold: Decimal,
    /// Maximum time-value share of premium accepted when buying
    pub time_value_ratio: Decimal,
    /// Holding-time cap
    pub max_holding_time: Duration,
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self {
            iv_lower: dec!(0.2),
            iv_upper: dec!(0.4),
            iv_change_threshold: dec!(0.005),
            time_value_ratio: dec!(0.8),
            max_holding_time: Duration::from_secs(600),
        }
    }
}

/// IV / time-value driven option strategy
pub struct VolatilityStrategy {
    core: GeneratorCore,
    config: VolatilityConfig,
    /// Latest IV seen by `analyze`
    current_iv: Decimal,
    /// Latest time value seen by `analyze`
    current_time_value: Decimal,
    /// Time value at entry, baseline for the decay close
    entry_time_value: Decimal,
}

impl VolatilityStrategy {
    pub fn new(config: VolatilityConfig) -> Self {
        Self {
            core: GeneratorCore::default(),
            config,
            current_iv: Decimal::ZERO,
            current_time_value: Decimal::ZERO,
            entry_time_value: Decimal::ZERO,
        }
    }

    fn band_width(&self) -> Decimal {
        self.config.iv_upper - self.config.iv_lower
    }
}

impl SignalGenerator for VolatilityStrategy {
    fn name(&self) -> &str {
        "volatility"
    }

    fn analyze(
        &mut self,
        snapshot: &MarketSnapshot,
    ) -> Result<Option<TradingSignal>, StrategyError> {
        let iv = snapshot.iv.ok_or(StrategyError::DataUnavailable("iv"))?;
        let iv_change = snapshot
            .iv_change_pct
            .ok_or(StrategyError::DataUnavailable("iv_change_pct"))?;
        let time_value = snapshot
            .time_value
            .ok_or(StrategyError::DataUnavailable("time_value"))?;
        let days_to_expiry = snapshot
            .days_to_expiry
            .ok_or(StrategyError::DataUnavailable("days_to_expiry"))?;
        let trend = snapshot
            .underlying_trend
            .ok_or(StrategyError::DataUnavailable("underlying_trend"))?;

        if !snapshot.history_ready {
            return Ok(None);
        }

        self.current_iv = iv;
        self.current_time_value = time_value;

        if self.core.holding() || self.core.in_cooldown() {
            return Ok(None);
        }

        let premium = snapshot.premium();
        let tv_ratio = if premium.is_zero() {
            Decimal::ZERO
        } else {
            time_value / premium
        };

        // only a directional underlying qualifies for entry
        let directional = matches!(trend, Trend::Up | Trend::Down);

        let signal = if iv < self.config.iv_lower
            && iv_change > -self.config.iv_change_threshold
            && tv_ratio < self.config.time_value_ratio
            && days_to_expiry > 10
            && directional
        {
            Some(TradingSignal::open(
                SignalKind::BuyOpen,
                self.core.trade_qty,
                snapshot.ask,
                format!("cheap volatility entry (iv {iv}, time-value share {tv_ratio})"),
            ))
        } else if iv > self.config.iv_upper
            && iv_change < self.config.iv_change_threshold
            && days_to_expiry > 5
            && directional
        {
            Some(TradingSignal::open(
                SignalKind::SellOpen,
                self.core.trade_qty,
                snapshot.bid,
                format!("rich volatility entry (iv {iv}, time-value share {tv_ratio})"),
            ))
        } else {
            None
        };

        if let Some(signal) = &signal {
            log::info!("[{}] open signal: {}", self.name(), signal);
            self.core.mark(signal);
            self.entry_time_value = self.current_time_value;
        }

        Ok(signal)
    }

    fn check_close(&mut self, held: Duration) -> Result<Option<TradingSignal>, StrategyError> {
        if !self.core.holding() {
            return Ok(None);
        }

        let band = self.band_width();
        match self.core.direction {
            Some(Direction::Long) => {
                // IV reverting upward through the middle of the band
                if self.current_iv >= self.config.iv_lower + band * dec!(0.5) {
                    return Ok(self
                        .core
                        .close_signal(format!("volatility reverted (iv {})", self.current_iv)));
                }
                // time value decayed past half its entry level
                if self.entry_time_value > Decimal::ZERO {
                    let decay = (self.entry_time_value - self.current_time_value)
                        / self.entry_time_value;
                    if decay > dec!(0.5) {
                        return Ok(self
                            .core
                            .close_signal("time value decayed beyond 50% of entry"));
                    }
                }
            }
            Some(Direction::Short) => {
                // IV falling back from the rich band
                if self.current_iv <= self.config.iv_upper - band * dec!(0.3) {
                    return Ok(self
                        .core
                        .close_signal(format!("volatility fell back (iv {})", self.current_iv)));
                }
            }
            None => return Ok(None),
        }

        if held >= self.config.max_holding_time {
            return Ok(self.core.close_signal(format!(
                "holding-time cap {:?} reached",
                self.config.max_holding_time
            )));
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
        self.current_iv = Decimal::ZERO;
        self.current_time_value = Decimal::ZERO;
        self.entry_time_value = Decimal::ZERO;
    }

    fn apply_params(&mut self, updates: &BTreeMap<String, ParamValue>) -> Result<(), ParamError> {
        validate_params(&self.param_schema(), updates)?;
        self.core.apply_base_params(updates);
        if let Some(v) = updates.get("iv_lower").and_then(ParamValue::as_float) {
            self.config.iv_lower = v;
        }
        if let Some(v) = updates.get("iv_upper").and_then(ParamValue::as_float) {
            self.config.iv_upper = v;
        }
        if let Some(v) = updates.get("time_value_ratio").and_then(ParamValue::as_float) {
            self.config.time_value_ratio = v;
        }
        if let Some(secs) = updates.get("max_holding_time").and_then(ParamValue::as_int) {
            self.config.max_holding_time = Duration::from_secs(secs as u64);
        }
        Ok(())
    }

    fn param_schema(&self) -> ParamSchema {
        let mut schema = self.core.base_schema();
        schema.insert(
            "iv_lower".to_string(),
            ParamSpec::float(
                "IV lower bound",
                dec!(0.2),
                dec!(0.05),
                dec!(0.5),
                dec!(0.01),
                "IV below this level triggers buy entries",
            ),
        );
        schema.insert(
            "iv_upper".to_string(),
            ParamSpec::float(
                "IV upper bound",
                dec!(0.4),
                dec!(0.1),
                dec!(1.0),
                dec!(0.01),
                "IV above this level triggers sell entries",
            ),
        );
        schema.insert(
            "time_value_ratio".to_string(),
            ParamSpec::float(
                "Time value share",
                dec!(0.8),
                dec!(0.1),
                dec!(1.0),
                dec!(0.05),
                "Maximum time-value share of premium accepted when buying",
            ),
        );
        schema.insert(
            "max_holding_time".to_string(),
            ParamSpec::int(
                "Max holding time",
                600,
                30,
                3600,
                30,
                "Seconds in position before the forced close",
            ),
        );
        schema
    }
}
