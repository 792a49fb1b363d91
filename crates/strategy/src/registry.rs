//! Strategy registry
//!
//! Owns every named strategy runtime: enablement, ascending-priority
//! ordering of the enabled list, the single active selection, per-strategy
//! counters and fault isolation. One mutex serializes all operations; the
//! poll loop, the cycle task and any configuration surface go through it.

use crate::error::StrategyError;
use crate::generator::SignalGenerator;
use crate::mean_reversion::{MeanReversion, MeanReversionConfig};
use crate::spread::{SpreadArbitrage, SpreadArbitrageConfig};
use crate::threshold::{ThresholdArbitrage, ThresholdArbitrageConfig};
use crate::volatility::{VolatilityConfig, VolatilityStrategy};
use arbiter_core::{MarketSnapshot, ParamError, ParamSchema, ParamValue, TradingSignal};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

/// Built-in strategy variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyVariant {
    ThresholdArbitrage,
    Volatility,
    SpreadArbitrage,
    MeanReversion,
}

impl StrategyVariant {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ThresholdArbitrage => "threshold-arbitrage",
            Self::Volatility => "volatility",
            Self::SpreadArbitrage => "spread-arbitrage",
            Self::MeanReversion => "mean-reversion",
        }
    }

    pub fn build(&self) -> Box<dyn SignalGenerator> {
        match self {
            Self::ThresholdArbitrage => {
                Box::new(ThresholdArbitrage::new(ThresholdArbitrageConfig::default()))
            }
            Self::Volatility => Box::new(VolatilityStrategy::new(VolatilityConfig::default())),
            Self::SpreadArbitrage => {
                Box::new(SpreadArbitrage::new(SpreadArbitrageConfig::default()))
            }
            Self::MeanReversion => Box::new(MeanReversion::new(MeanReversionConfig::default())),
        }
    }
}

/// Lifecycle state of a registered strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StrategyState {
    Idle,
    Running,
    Paused,
    Error,
}

/// Registry operation failures
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error(transparent)]
    Param(#[from] ParamError),
}

/// Point-in-time view of a strategy runtime for external surfaces
#[derive(Debug, Clone, Serialize)]
pub struct StrategyInfo {
    pub name: String,
    pub state: StrategyState,
    pub enabled: bool,
    pub priority: u32,
    pub position: u32,
    pub signal_count: u64,
    pub trade_count: u64,
    pub last_signal_at: Option<DateTime<Utc>>,
    pub total_pnl: Decimal,
    pub error_message: Option<String>,
}

struct StrategyRuntime {
    generator: Box<dyn SignalGenerator>,
    enabled: bool,
    state: StrategyState,
    priority: u32,
    signal_count: u64,
    trade_count: u64,
    last_signal_at: Option<DateTime<Utc>>,
    total_pnl: Decimal,
    error_message: Option<String>,
}

impl StrategyRuntime {
    fn new(generator: Box<dyn SignalGenerator>, priority: u32) -> Self {
        Self {
            generator,
            enabled: false,
            state: StrategyState::Idle,
            priority,
            signal_count: 0,
            trade_count: 0,
            last_signal_at: None,
            total_pnl: Decimal::ZERO,
            error_message: None,
        }
    }

    fn info(&self, name: &str) -> StrategyInfo {
        StrategyInfo {
            name: name.to_string(),
            state: self.state,
            enabled: self.enabled,
            priority: self.priority,
            position: self.generator.position(),
            signal_count: self.signal_count,
            trade_count: self.trade_count,
            last_signal_at: self.last_signal_at,
            total_pnl: self.total_pnl,
            error_message: self.error_message.clone(),
        }
    }

    fn fault(&mut self, message: String) {
        log::error!("[registry] strategy fault: {message}");
        self.state = StrategyState::Error;
        self.error_message = Some(message);
    }

    /// Paused and faulted strategies produce no signals
    fn can_emit(&self) -> bool {
        matches!(self.state, StrategyState::Idle | StrategyState::Running)
    }
}

#[derive(Default)]
struct Inner {
    strategies: HashMap<String, StrategyRuntime>,
    /// Enabled strategy names, ascending priority
    enabled: Vec<String>,
    active: Option<String>,
}

impl Inner {
    fn resort_enabled(&mut self) {
        let strategies = &self.strategies;
        self.enabled
            .sort_by_key(|name| strategies.get(name).map(|r| r.priority).unwrap_or(u32::MAX));
    }
}

/// Thread-safe registry of strategy runtimes with a single active selection
#[derive(Default)]
pub struct StrategyRegistry {
    inner: Mutex<Inner>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // a poisoned lock still holds consistent bookkeeping
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a built-in variant under its canonical name
    pub fn register(&self, variant: StrategyVariant, priority: u32) {
        self.register_generator(variant.name(), variant.build(), priority);
    }

    /// Register a generator under an explicit name. Idempotent: re-registering
    /// an existing name only updates its priority.
    pub fn register_generator(
        &self,
        name: &str,
        generator: Box<dyn SignalGenerator>,
        priority: u32,
    ) {
        let mut inner = self.lock();
        if let Some(runtime) = inner.strategies.get_mut(name) {
            runtime.priority = priority;
        } else {
            inner
                .strategies
                .insert(name.to_string(), StrategyRuntime::new(generator, priority));
            log::info!("[registry] registered strategy {name} (priority {priority})");
        }
        inner.resort_enabled();
    }

    /// Enable a strategy: fresh state, Idle, appended to the enabled list.
    /// The first enabled strategy becomes active.
    pub fn enable(&self, name: &str) -> bool {
        let mut inner = self.lock();
        let Some(runtime) = inner.strategies.get_mut(name) else {
            return false;
        };
        if !runtime.enabled {
            runtime.enabled = true;
            runtime.state = StrategyState::Idle;
            runtime.error_message = None;
            runtime.generator.reset();
            inner.enabled.push(name.to_string());
            inner.resort_enabled();
        }
        if inner.active.is_none() {
            Self::promote(&mut inner, name);
        }
        true
    }

    /// Disable a strategy. Disabling the active one reassigns active to the
    /// lowest-priority enabled strategy, or none.
    pub fn disable(&self, name: &str) -> bool {
        let mut inner = self.lock();
        let Some(runtime) = inner.strategies.get_mut(name) else {
            return false;
        };
        if !runtime.enabled {
            return true;
        }
        runtime.enabled = false;
        runtime.state = StrategyState::Idle;
        inner.enabled.retain(|n| n != name);

        if inner.active.as_deref() == Some(name) {
            inner.active = None;
            inner.resort_enabled();
            if let Some(next) = inner.enabled.first().cloned() {
                Self::promote(&mut inner, &next);
            }
        }
        true
    }

    /// Enable everything in ascending priority order, so the lowest
    /// priority strategy ends up active
    pub fn enable_all(&self) {
        let mut names: Vec<(u32, String)> = {
            let inner = self.lock();
            inner
                .strategies
                .iter()
                .map(|(name, runtime)| (runtime.priority, name.clone()))
                .collect()
        };
        names.sort();
        for (_, name) in names {
            self.enable(&name);
        }
    }

    pub fn disable_all(&self) {
        let mut inner = self.lock();
        for runtime in inner.strategies.values_mut() {
            runtime.enabled = false;
            runtime.state = StrategyState::Idle;
        }
        inner.enabled.clear();
        inner.active = None;
    }

    fn promote(inner: &mut Inner, name: &str) {
        if let Some(old) = inner.active.take()
            && let Some(runtime) = inner.strategies.get_mut(&old)
        {
            runtime.state = StrategyState::Idle;
        }
        if let Some(runtime) = inner.strategies.get_mut(name) {
            runtime.state = StrategyState::Running;
        }
        inner.active = Some(name.to_string());
        log::info!("[registry] active strategy -> {name}");
    }

    /// Make an enabled strategy the active one. Returns false when the
    /// strategy is unknown or not enabled.
    pub fn set_active(&self, name: &str) -> bool {
        let mut inner = self.lock();
        if !inner.strategies.get(name).is_some_and(|r| r.enabled) {
            return false;
        }
        Self::promote(&mut inner, name);
        true
    }

    pub fn active(&self) -> Option<String> {
        self.lock().active.clone()
    }

    /// Run the active strategy's analysis over a snapshot. Faults are
    /// isolated to the owning strategy; data gaps skip the tick silently.
    pub fn analyze(&self, snapshot: &MarketSnapshot) -> Option<TradingSignal> {
        let mut inner = self.lock();
        let name = inner.active.clone()?;
        let runtime = inner.strategies.get_mut(&name)?;
        if !runtime.can_emit() {
            return None;
        }
        match runtime.generator.analyze(snapshot) {
            Ok(Some(signal)) => {
                runtime.signal_count += 1;
                runtime.last_signal_at = Some(Utc::now());
                Some(signal)
            }
            Ok(None) => None,
            Err(StrategyError::DataUnavailable(field)) => {
                log::debug!("[registry] {name}: skipping tick, {field} unavailable");
                None
            }
            Err(StrategyError::Fault(message)) => {
                runtime.fault(message);
                None
            }
        }
    }

    /// Ask the active strategy whether its position should close; `held`
    /// counts from signal acceptance
    pub fn check_close(&self, held: Duration) -> Option<TradingSignal> {
        let mut inner = self.lock();
        let name = inner.active.clone()?;
        let runtime = inner.strategies.get_mut(&name)?;
        if !runtime.can_emit() {
            return None;
        }
        match runtime.generator.check_close(held) {
            Ok(signal) => signal,
            Err(StrategyError::DataUnavailable(field)) => {
                log::debug!("[registry] {name}: close check skipped, {field} unavailable");
                None
            }
            Err(StrategyError::Fault(message)) => {
                runtime.fault(message);
                None
            }
        }
    }

    /// Fold a confirmed fill into a strategy's position view. Opening fills
    /// count as trades.
    pub fn update_position(&self, name: &str, quantity: u32, opening: bool) {
        let mut inner = self.lock();
        if let Some(runtime) = inner.strategies.get_mut(name) {
            runtime.generator.update_position(quantity, opening);
            if opening {
                runtime.trade_count += 1;
            }
        }
    }

    pub fn position(&self, name: &str) -> u32 {
        let inner = self.lock();
        inner
            .strategies
            .get(name)
            .map(|r| r.generator.position())
            .unwrap_or(0)
    }

    pub fn record_pnl(&self, name: &str, pnl: Decimal) {
        let mut inner = self.lock();
        if let Some(runtime) = inner.strategies.get_mut(name) {
            runtime.total_pnl += pnl;
        }
    }

    /// Externally observed failure of a strategy's trade cycle
    pub fn mark_error(&self, name: &str, message: impl Into<String>) {
        let mut inner = self.lock();
        if let Some(runtime) = inner.strategies.get_mut(name) {
            runtime.fault(message.into());
        }
    }

    /// Validated parameter update. Prior parameters are retained when
    /// validation fails.
    pub fn update_params(
        &self,
        name: &str,
        updates: &BTreeMap<String, ParamValue>,
    ) -> Result<(), RegistryError> {
        let mut inner = self.lock();
        let runtime = inner
            .strategies
            .get_mut(name)
            .ok_or_else(|| RegistryError::UnknownStrategy(name.to_string()))?;
        runtime.generator.apply_params(updates)?;
        log::info!("[registry] {name}: parameters updated ({} keys)", updates.len());
        Ok(())
    }

    pub fn param_schema(&self, name: &str) -> Option<ParamSchema> {
        let inner = self.lock();
        inner.strategies.get(name).map(|r| r.generator.param_schema())
    }

    pub fn pause(&self, name: &str) -> bool {
        let mut inner = self.lock();
        let Some(runtime) = inner.strategies.get_mut(name) else {
            return false;
        };
        if matches!(runtime.state, StrategyState::Idle | StrategyState::Running) {
            runtime.state = StrategyState::Paused;
        }
        true
    }

    pub fn resume(&self, name: &str) -> bool {
        let mut inner = self.lock();
        let active = inner.active.clone();
        let Some(runtime) = inner.strategies.get_mut(name) else {
            return false;
        };
        if runtime.state == StrategyState::Paused {
            runtime.state = if active.as_deref() == Some(name) {
                StrategyState::Running
            } else {
                StrategyState::Idle
            };
        }
        true
    }

    /// Clear a strategy's position, counters stay. Also recovers from Error.
    pub fn reset(&self, name: &str) -> bool {
        let mut inner = self.lock();
        let active = inner.active.clone();
        let Some(runtime) = inner.strategies.get_mut(name) else {
            return false;
        };
        runtime.generator.reset();
        runtime.error_message = None;
        runtime.state = if active.as_deref() == Some(name) {
            StrategyState::Running
        } else {
            StrategyState::Idle
        };
        true
    }

    pub fn reset_all(&self) {
        let names: Vec<String> = {
            let inner = self.lock();
            inner.strategies.keys().cloned().collect()
        };
        for name in names {
            self.reset(&name);
        }
    }

    /// Info snapshots of every registered strategy, ascending priority
    pub fn strategies(&self) -> Vec<StrategyInfo> {
        let inner = self.lock();
        let mut infos: Vec<StrategyInfo> = inner
            .strategies
            .iter()
            .map(|(name, runtime)| runtime.info(name))
            .collect();
        infos.sort_by_key(|info| info.priority);
        infos
    }
}
