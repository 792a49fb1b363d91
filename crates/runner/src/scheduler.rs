//! Poll scheduler
//!
//! Single-threaded cooperative loop: fetch a snapshot, run the active
//! strategy's analysis, and hand an accepted opening signal to a spawned
//! trade cycle. At most one cycle is ever in flight; the gate is claimed
//! before the task exists, so two ticks can never spawn overlapping
//! cycles. Shutdown cancels the in-flight cycle and joins it.

use crate::source::MarketDataSource;
use arbiter_execution::{CycleExecutor, CycleOutcome};
use arbiter_strategy::StrategyRegistry;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Exclusive claim on the single cycle slot, released on drop
struct CycleGate(Arc<AtomicBool>);

impl CycleGate {
    fn try_acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
            .then(|| Self(Arc::clone(flag)))
    }
}

impl Drop for CycleGate {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The engine's poll loop
pub struct Scheduler {
    registry: Arc<StrategyRegistry>,
    executor: Arc<CycleExecutor>,
    source: Arc<dyn MarketDataSource>,
    shutdown: watch::Receiver<bool>,
    cycle_gate: Arc<AtomicBool>,
    poll_interval: Duration,
}

impl Scheduler {
    pub fn new(
        registry: Arc<StrategyRegistry>,
        executor: Arc<CycleExecutor>,
        source: Arc<dyn MarketDataSource>,
        shutdown: watch::Receiver<bool>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            registry,
            executor,
            source,
            shutdown,
            cycle_gate: Arc::new(AtomicBool::new(false)),
            poll_interval,
        }
    }

    /// Run until shutdown is signalled, then cancel and join any cycle
    /// still in flight
    pub async fn run(mut self) {
        log::info!("[scheduler] started ({:?} poll interval)", self.poll_interval);
        let mut shutdown = self.shutdown.clone();
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut in_flight: Option<JoinHandle<CycleOutcome>> = None;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick(&mut in_flight).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        log::info!("[scheduler] shutting down");
        if let Some(handle) = in_flight.take() {
            if !handle.is_finished() {
                log::info!("[scheduler] waiting for the in-flight cycle");
            }
            if let Err(e) = handle.await {
                log::error!("[scheduler] cycle task panicked: {e}");
            }
        }
        log::info!("[scheduler] stopped");
    }

    async fn tick(&mut self, in_flight: &mut Option<JoinHandle<CycleOutcome>>) {
        let snapshot = match self.source.snapshot().await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return,
            Err(e) => {
                log::warn!("[scheduler] feed error, skipping tick: {e}");
                return;
            }
        };
        if !snapshot.history_ready {
            return;
        }

        let Some(signal) = self.registry.analyze(&snapshot) else {
            return;
        };
        if !signal.kind.is_open() {
            log::debug!("[scheduler] dropping non-opening signal {signal}");
            return;
        }
        let Some(strategy) = self.registry.active() else {
            return;
        };

        let Some(guard) = CycleGate::try_acquire(&self.cycle_gate) else {
            log::debug!("[scheduler] cycle in flight, dropping {signal}");
            return;
        };
        let executor = Arc::clone(&self.executor);
        let cancel = self.shutdown.clone();
        *in_flight = Some(tokio::spawn(async move {
            let _guard = guard;
            executor.run(signal, &strategy, cancel).await
        }));
    }
}
