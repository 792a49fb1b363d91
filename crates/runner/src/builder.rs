//! Engine wiring
//!
//! Explicit construction of the whole engine: the registry with the four
//! built-in variants at priorities 1-4, the ledger, the cycle executor and
//! the scheduler. Collaborators (gateway, market data) are injected; there
//! are no globals.

use crate::scheduler::Scheduler;
use crate::source::MarketDataSource;
use arbiter_execution::{CycleConfig, CycleExecutor, EngineEvent, OrderGateway};
use arbiter_ledger::Ledger;
use arbiter_strategy::{StrategyRegistry, StrategyVariant};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("no order gateway configured")]
    MissingGateway,

    #[error("no market data source configured")]
    MissingSource,
}

/// Flips the shutdown flag watched by the scheduler and every cycle sleep
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        // receivers may already be gone on double shutdown
        let _ = self.tx.send(true);
    }
}

/// A fully wired engine, ready to run
pub struct Engine {
    registry: Arc<StrategyRegistry>,
    ledger: Arc<Ledger>,
    scheduler: Scheduler,
    events: Option<mpsc::UnboundedReceiver<EngineEvent>>,
}

impl Engine {
    pub fn registry(&self) -> Arc<StrategyRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn ledger(&self) -> Arc<Ledger> {
        Arc::clone(&self.ledger)
    }

    /// The engine event stream. Yields once; the caller owns the receiver.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<EngineEvent>> {
        self.events.take()
    }

    /// Run the poll loop until shutdown
    pub async fn run(self) {
        self.scheduler.run().await;
    }
}

/// Builder for [`Engine`]
pub struct EngineBuilder {
    gateway: Option<Arc<dyn OrderGateway>>,
    source: Option<Arc<dyn MarketDataSource>>,
    cycle_config: CycleConfig,
    poll_interval: Duration,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            gateway: None,
            source: None,
            cycle_config: CycleConfig::default(),
            poll_interval: Duration::from_millis(500),
        }
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn OrderGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn with_source(mut self, source: Arc<dyn MarketDataSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_cycle_config(mut self, config: CycleConfig) -> Self {
        self.cycle_config = config;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Wire everything up. The four built-in variants are registered at
    /// priorities 1-4 and enabled; the lowest priority starts active.
    pub fn build(self) -> Result<(Engine, ShutdownHandle), BuildError> {
        let gateway = self.gateway.ok_or(BuildError::MissingGateway)?;
        let source = self.source.ok_or(BuildError::MissingSource)?;

        let registry = Arc::new(StrategyRegistry::new());
        registry.register(StrategyVariant::ThresholdArbitrage, 1);
        registry.register(StrategyVariant::Volatility, 2);
        registry.register(StrategyVariant::SpreadArbitrage, 3);
        registry.register(StrategyVariant::MeanReversion, 4);
        registry.enable_all();

        let ledger = Arc::new(Ledger::new(self.cycle_config.contract_multiplier));
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let executor = Arc::new(CycleExecutor::new(
            Arc::clone(&registry),
            Arc::clone(&ledger),
            gateway,
            events_tx,
            self.cycle_config,
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let scheduler = Scheduler::new(
            Arc::clone(&registry),
            executor,
            source,
            shutdown_rx,
            self.poll_interval,
        );

        Ok((
            Engine {
                registry,
                ledger,
                scheduler,
                events: Some(events_rx),
            },
            ShutdownHandle { tx: shutdown_tx },
        ))
    }
}
