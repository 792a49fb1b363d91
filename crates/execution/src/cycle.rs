//! Trade cycle state machine
//!
//! One executor run drives a single accepted signal through
//! FixedDelay -> Opening -> ConfirmingOpenFill -> DynamicWait -> Closing ->
//! Settled. The open leg either fills within the confirmation window or the
//! cycle aborts with no position mutation. The close loop resubmits the
//! remaining quantity, folds partial fills by signature, and is bounded by
//! both an attempt ceiling and a wall-clock timeout. Every sleep is
//! cancellable through a watch channel.

use crate::events::EngineEvent;
use crate::gateway::{GatewayError, OrderGateway};
use arbiter_core::{Fill, FillSignature, TradingSession, TradingSignal};
use arbiter_ledger::Ledger;
use arbiter_strategy::StrategyRegistry;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use uuid::Uuid;

/// Timing and sizing of a trade cycle
#[derive(Debug, Clone)]
pub struct CycleConfig {
    /// Pause between signal acceptance and order entry
    pub fixed_delay: Duration,
    /// Intended time from acceptance to the first close attempt
    pub target_close_interval: Duration,
    /// Fill polling cadence
    pub confirm_poll_interval: Duration,
    /// How long one submitted order may stay unfilled
    pub confirm_timeout: Duration,
    /// Backoff after an unfilled close attempt
    pub close_retry_backoff: Duration,
    /// Cadence of asking the strategy for a close signal
    pub close_check_interval: Duration,
    /// Attempt ceiling for the close loop
    pub max_close_attempts: u32,
    /// Wall-clock ceiling for the close loop
    pub close_timeout: Duration,
    /// Currency value of one point of price movement per contract
    pub contract_multiplier: Decimal,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            fixed_delay: Duration::from_secs(2),
            target_close_interval: Duration::from_secs(5),
            confirm_poll_interval: Duration::from_millis(500),
            confirm_timeout: Duration::from_secs(10),
            close_retry_backoff: Duration::from_secs(1),
            close_check_interval: Duration::from_millis(500),
            max_close_attempts: 30,
            close_timeout: Duration::from_secs(60),
            contract_multiplier: dec!(10000),
        }
    }
}

/// Why a cycle ended without settling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// The opening order never filled inside the confirmation window
    OpenUnfilled,
    /// The gateway failed while the cycle was in flight
    Gateway,
    /// The close loop exhausted its attempt or time budget
    FillTimeout { filled_qty: u32, remaining_qty: u32 },
    /// Shutdown was requested while the cycle was in flight
    Cancelled,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenUnfilled => write!(f, "opening order unfilled"),
            Self::Gateway => write!(f, "gateway failure"),
            Self::FillTimeout {
                filled_qty,
                remaining_qty,
            } => write!(
                f,
                "close fill timeout ({filled_qty} closed, {remaining_qty} remaining)"
            ),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Terminal state of one executor run
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    Settled(TradingSession),
    Aborted(AbortReason),
}

enum PollResult {
    Fill(Fill),
    TimedOut,
    Cancelled,
}

/// Runs trade cycles against the shared registry, ledger and gateway
pub struct CycleExecutor {
    registry: Arc<StrategyRegistry>,
    ledger: Arc<Ledger>,
    gateway: Arc<dyn OrderGateway>,
    events: mpsc::UnboundedSender<EngineEvent>,
    config: CycleConfig,
}

impl CycleExecutor {
    pub fn new(
        registry: Arc<StrategyRegistry>,
        ledger: Arc<Ledger>,
        gateway: Arc<dyn OrderGateway>,
        events: mpsc::UnboundedSender<EngineEvent>,
        config: CycleConfig,
    ) -> Self {
        Self {
            registry,
            ledger,
            gateway,
            events,
            config,
        }
    }

    pub fn config(&self) -> &CycleConfig {
        &self.config
    }

    /// Drive one accepted opening signal to settlement or abort
    pub async fn run(
        &self,
        signal: TradingSignal,
        strategy: &str,
        mut cancel: watch::Receiver<bool>,
    ) -> CycleOutcome {
        let cycle_id = Uuid::new_v4();
        let accepted_at = Instant::now();
        log::info!("[cycle {cycle_id}] accepted {signal} from {strategy}");
        self.emit(EngineEvent::SignalAccepted {
            cycle_id,
            strategy: strategy.to_string(),
            signal: signal.clone(),
        });

        // FixedDelay
        if self.pause(self.config.fixed_delay, &mut cancel).await {
            return self.abort(cycle_id, strategy, AbortReason::Cancelled);
        }

        // Opening: remember the venue's current last fill so a stale one
        // is never mistaken for ours
        let mut last_signature: Option<FillSignature> = match self.gateway.poll_fill().await {
            Ok(fill) => fill.map(|f| f.signature),
            Err(e) => {
                log::error!("[cycle {cycle_id}] gateway failure before open: {e}");
                self.registry.mark_error(strategy, e.to_string());
                return self.abort(cycle_id, strategy, AbortReason::Gateway);
            }
        };
        if let Err(e) = self.gateway.submit(&signal).await {
            log::error!("[cycle {cycle_id}] open submit failed: {e}");
            self.registry.mark_error(strategy, e.to_string());
            return self.abort(cycle_id, strategy, AbortReason::Gateway);
        }

        // ConfirmingOpenFill
        let open_fill = match self
            .poll_new_fill(last_signature.as_ref(), self.config.confirm_timeout, &mut cancel)
            .await
        {
            Ok(PollResult::Fill(fill)) => fill,
            Ok(PollResult::TimedOut) => {
                log::warn!("[cycle {cycle_id}] opening order unfilled, aborting");
                return self.abort(cycle_id, strategy, AbortReason::OpenUnfilled);
            }
            Ok(PollResult::Cancelled) => {
                return self.abort(cycle_id, strategy, AbortReason::Cancelled);
            }
            Err(e) => {
                log::error!("[cycle {cycle_id}] gateway failure confirming open: {e}");
                self.registry.mark_error(strategy, e.to_string());
                return self.abort(cycle_id, strategy, AbortReason::Gateway);
            }
        };
        last_signature = Some(open_fill.signature.clone());

        let direction = signal.kind.direction();
        if let Err(e) = self.ledger.open_position(strategy, direction, &open_fill) {
            log::error!("[cycle {cycle_id}] position rejected: {e}");
            self.registry.mark_error(strategy, e.to_string());
            return self.abort(cycle_id, strategy, AbortReason::Gateway);
        }
        self.registry
            .update_position(strategy, open_fill.quantity, true);
        log::info!(
            "[cycle {cycle_id}] open filled: {} @ {}",
            open_fill.quantity,
            open_fill.price
        );
        self.emit(EngineEvent::OpenFilled {
            cycle_id,
            strategy: strategy.to_string(),
            fill: open_fill.clone(),
        });

        // DynamicWait: aim the first close attempt at the target interval
        // measured from acceptance
        let remaining_wait = self
            .config
            .target_close_interval
            .saturating_sub(accepted_at.elapsed());
        if self.pause(remaining_wait, &mut cancel).await {
            log::warn!("[cycle {cycle_id}] cancelled with an open position");
            return self.abort(cycle_id, strategy, AbortReason::Cancelled);
        }

        // Closing
        let mut close_fills: Vec<(Decimal, u32)> = Vec::new();
        let mut remaining = open_fill.quantity;
        let mut attempts: u32 = 0;
        let close_deadline = Instant::now() + self.config.close_timeout;

        while remaining > 0 {
            if attempts >= self.config.max_close_attempts || Instant::now() >= close_deadline {
                let filled_qty = open_fill.quantity - remaining;
                log::error!(
                    "[cycle {cycle_id}] close budget exhausted after {attempts} attempts, \
                     {filled_qty} closed of {}",
                    open_fill.quantity
                );
                self.registry.mark_error(
                    strategy,
                    format!("close fill timeout with {remaining} contracts remaining"),
                );
                return self.abort(
                    cycle_id,
                    strategy,
                    AbortReason::FillTimeout {
                        filled_qty,
                        remaining_qty: remaining,
                    },
                );
            }

            // close timing is anchored at acceptance, not at the open fill
            let Some(close_signal) = self.registry.check_close(accepted_at.elapsed()) else {
                if self.pause(self.config.close_check_interval, &mut cancel).await {
                    log::warn!("[cycle {cycle_id}] cancelled with an open position");
                    return self.abort(cycle_id, strategy, AbortReason::Cancelled);
                }
                continue;
            };
            // always resubmit exactly what is still open
            let order = TradingSignal::close(close_signal.kind, remaining, close_signal.reason);
            attempts += 1;

            if let Err(e) = self.gateway.submit(&order).await {
                log::error!("[cycle {cycle_id}] close submit failed: {e}");
                self.registry.mark_error(strategy, e.to_string());
                return self.abort(cycle_id, strategy, AbortReason::Gateway);
            }

            match self
                .poll_new_fill(last_signature.as_ref(), self.config.confirm_timeout, &mut cancel)
                .await
            {
                Ok(PollResult::Fill(fill)) => {
                    let closed = fill.quantity.min(remaining);
                    close_fills.push((fill.price, closed));
                    remaining -= closed;
                    last_signature = Some(fill.signature.clone());
                    self.registry.update_position(strategy, closed, false);
                    log::info!(
                        "[cycle {cycle_id}] close filled: {closed} @ {} ({remaining} remaining)",
                        fill.price
                    );
                    self.emit(EngineEvent::CloseFilled {
                        cycle_id,
                        strategy: strategy.to_string(),
                        fill,
                        remaining,
                    });
                }
                Ok(PollResult::TimedOut) => {
                    log::warn!(
                        "[cycle {cycle_id}] close attempt {attempts} unfilled, backing off"
                    );
                    if self.pause(self.config.close_retry_backoff, &mut cancel).await {
                        log::warn!("[cycle {cycle_id}] cancelled with an open position");
                        return self.abort(cycle_id, strategy, AbortReason::Cancelled);
                    }
                }
                Ok(PollResult::Cancelled) => {
                    log::warn!("[cycle {cycle_id}] cancelled with an open position");
                    return self.abort(cycle_id, strategy, AbortReason::Cancelled);
                }
                Err(e) => {
                    log::error!("[cycle {cycle_id}] gateway failure confirming close: {e}");
                    self.registry.mark_error(strategy, e.to_string());
                    return self.abort(cycle_id, strategy, AbortReason::Gateway);
                }
            }
        }

        // Settled
        let session = match self.ledger.settle(&close_fills, accepted_at.elapsed()) {
            Ok(session) => session,
            Err(e) => {
                log::error!("[cycle {cycle_id}] settlement failed: {e}");
                self.registry.mark_error(strategy, e.to_string());
                return self.abort(cycle_id, strategy, AbortReason::Gateway);
            }
        };
        self.registry.record_pnl(strategy, session.profit);
        log::info!(
            "[cycle {cycle_id}] settled: profit {} (cumulative {})",
            session.profit,
            session.cumulative_profit
        );
        self.emit(EngineEvent::SessionSettled {
            cycle_id,
            session: session.clone(),
        });
        CycleOutcome::Settled(session)
    }

    /// Poll until a fill with a fresh signature shows up, the timeout
    /// elapses, or shutdown is requested
    async fn poll_new_fill(
        &self,
        last: Option<&FillSignature>,
        timeout: Duration,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<PollResult, GatewayError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(fill) = self.gateway.poll_fill().await?
                && last != Some(&fill.signature)
            {
                return Ok(PollResult::Fill(fill));
            }
            if Instant::now() >= deadline {
                return Ok(PollResult::TimedOut);
            }
            if self.pause(self.config.confirm_poll_interval, cancel).await {
                return Ok(PollResult::Cancelled);
            }
        }
    }

    /// Cancellable sleep; true means shutdown was requested
    async fn pause(&self, delay: Duration, cancel: &mut watch::Receiver<bool>) -> bool {
        if *cancel.borrow() {
            return true;
        }
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return false,
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        return true;
                    }
                }
            }
        }
    }

    fn emit(&self, event: EngineEvent) {
        // a closed event channel only loses observability
        let _ = self.events.send(event);
    }

    fn abort(&self, cycle_id: Uuid, strategy: &str, reason: AbortReason) -> CycleOutcome {
        log::warn!("[cycle {cycle_id}] aborted: {reason}");
        self.emit(EngineEvent::CycleAborted {
            cycle_id,
            strategy: strategy.to_string(),
            reason: reason.clone(),
        });
        CycleOutcome::Aborted(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_core::{
        MarketSnapshot, ParamError, ParamSchema, ParamValue, SignalKind,
    };
    use arbiter_strategy::{SignalGenerator, StrategyError};
    use chrono::Utc;
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::Mutex;

    /// Close-only generator: closes its full position once held long enough
    struct CloseAfter {
        position: u32,
        after: Duration,
        kind: SignalKind,
    }

    impl SignalGenerator for CloseAfter {
        fn name(&self) -> &str {
            "close-after"
        }

        fn analyze(
            &mut self,
            _snapshot: &MarketSnapshot,
        ) -> Result<Option<TradingSignal>, StrategyError> {
            Ok(None)
        }

        fn check_close(&mut self, held: Duration) -> Result<Option<TradingSignal>, StrategyError> {
            if self.position > 0 && held >= self.after {
                return Ok(Some(TradingSignal::close(
                    self.kind,
                    self.position,
                    "held long enough",
                )));
            }
            Ok(None)
        }

        fn update_position(&mut self, quantity: u32, opening: bool) {
            if opening {
                self.position += quantity;
            } else {
                self.position = self.position.saturating_sub(quantity);
            }
        }

        fn position(&self) -> u32 {
            self.position
        }

        fn reset(&mut self) {
            self.position = 0;
        }

        fn apply_params(
            &mut self,
            _updates: &BTreeMap<String, ParamValue>,
        ) -> Result<(), ParamError> {
            Ok(())
        }

        fn param_schema(&self) -> ParamSchema {
            ParamSchema::new()
        }
    }

    /// Gateway whose "last trade" is scripted per submitted order. A `None`
    /// entry leaves the previous fill in place, so polls keep returning a
    /// stale signature.
    struct ScriptedGateway {
        responses: Mutex<VecDeque<Option<Fill>>>,
        last_fill: Mutex<Option<Fill>>,
        submissions: Mutex<Vec<TradingSignal>>,
    }

    impl ScriptedGateway {
        fn new(responses: Vec<Option<Fill>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                last_fill: Mutex::new(None),
                submissions: Mutex::new(Vec::new()),
            }
        }

        fn submissions(&self) -> Vec<TradingSignal> {
            self.submissions.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl OrderGateway for ScriptedGateway {
        async fn submit(&self, signal: &TradingSignal) -> Result<(), GatewayError> {
            self.submissions.lock().unwrap().push(signal.clone());
            let next = self.responses.lock().unwrap().pop_front().flatten();
            if let Some(fill) = next {
                *self.last_fill.lock().unwrap() = Some(fill);
            }
            Ok(())
        }

        async fn poll_fill(&self) -> Result<Option<Fill>, GatewayError> {
            Ok(self.last_fill.lock().unwrap().clone())
        }
    }

    struct Harness {
        registry: Arc<StrategyRegistry>,
        ledger: Arc<Ledger>,
        gateway: Arc<ScriptedGateway>,
        executor: CycleExecutor,
        events: mpsc::UnboundedReceiver<EngineEvent>,
        _cancel_tx: watch::Sender<bool>,
        cancel: watch::Receiver<bool>,
    }

    fn harness(responses: Vec<Option<Fill>>, close_kind: SignalKind) -> Harness {
        harness_with_close_after(responses, close_kind, Duration::from_secs(3))
    }

    fn harness_with_close_after(
        responses: Vec<Option<Fill>>,
        close_kind: SignalKind,
        after: Duration,
    ) -> Harness {
        let _ = env_logger::try_init();
        let registry = Arc::new(StrategyRegistry::new());
        registry.register_generator(
            "close-after",
            Box::new(CloseAfter {
                position: 0,
                after,
                kind: close_kind,
            }),
            1,
        );
        registry.enable("close-after");

        let ledger = Arc::new(Ledger::default());
        let gateway = Arc::new(ScriptedGateway::new(responses));
        let (events_tx, events) = mpsc::unbounded_channel();
        let (_cancel_tx, cancel) = watch::channel(false);
        let executor = CycleExecutor::new(
            Arc::clone(&registry),
            Arc::clone(&ledger),
            Arc::clone(&gateway) as Arc<dyn OrderGateway>,
            events_tx,
            CycleConfig::default(),
        );
        Harness {
            registry,
            ledger,
            gateway,
            executor,
            events,
            _cancel_tx,
            cancel,
        }
    }

    fn fill(price: Decimal, quantity: u32, offset_ms: i64) -> Fill {
        Fill::new(
            price,
            quantity,
            Utc::now() + chrono::Duration::milliseconds(offset_ms),
        )
    }

    fn open_signal(quantity: u32) -> TradingSignal {
        TradingSignal::open(SignalKind::BuyOpen, quantity, dec!(1.00), "test open")
    }

    fn drain(events: &mut mpsc::UnboundedReceiver<EngineEvent>) -> Vec<EngineEvent> {
        let mut out = Vec::new();
        while let Ok(event) = events.try_recv() {
            out.push(event);
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_cycle_with_partial_close_fills() {
        let mut h = harness(
            vec![
                Some(fill(dec!(1.00), 10, 0)), // open
                Some(fill(dec!(1.10), 4, 1)),  // first close, partial
                Some(fill(dec!(1.20), 6, 2)),  // second close
            ],
            SignalKind::SellClose,
        );

        let outcome = h
            .executor
            .run(open_signal(10), "close-after", h.cancel.clone())
            .await;

        let CycleOutcome::Settled(session) = outcome else {
            panic!("expected settlement");
        };
        assert_eq!(session.total_qty, 10);
        assert_eq!(session.avg_close_price, dec!(1.16));
        // (1.16 - 1.00) * 10 * 10000
        assert_eq!(session.profit, dec!(16000.0));

        // position fully unwound everywhere
        assert!(!h.ledger.has_open_position());
        assert_eq!(h.registry.position("close-after"), 0);

        // second close resubmitted only the remaining 6
        let submissions = h.gateway.submissions();
        assert_eq!(submissions.len(), 3);
        assert_eq!(submissions[1].quantity, 10);
        assert_eq!(submissions[2].quantity, 6);

        let events = drain(&mut h.events);
        assert!(matches!(events[0], EngineEvent::SignalAccepted { .. }));
        assert!(matches!(events[1], EngineEvent::OpenFilled { .. }));
        assert!(matches!(
            events[2],
            EngineEvent::CloseFilled { remaining: 6, .. }
        ));
        assert!(matches!(
            events[3],
            EngineEvent::CloseFilled { remaining: 0, .. }
        ));
        assert!(matches!(events[4], EngineEvent::SessionSettled { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_timing_counts_from_acceptance() {
        // a close condition at exactly the target interval must fire as soon
        // as the dynamic wait ends; the fixed delay is part of the wait, not
        // added on top of it
        let mut h = harness_with_close_after(
            vec![
                Some(fill(dec!(1.00), 10, 0)),
                Some(fill(dec!(1.05), 10, 1)),
            ],
            SignalKind::SellClose,
            CycleConfig::default().target_close_interval,
        );

        let started = Instant::now();
        let outcome = h
            .executor
            .run(open_signal(10), "close-after", h.cancel.clone())
            .await;

        let CycleOutcome::Settled(session) = outcome else {
            panic!("expected settlement");
        };
        assert!(
            started.elapsed() < Duration::from_secs(6),
            "settled {:?} after acceptance, target is 5s",
            started.elapsed()
        );
        assert_eq!(session.actual_wait_secs, dec!(5));
        drain(&mut h.events);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_fill_is_not_counted_twice() {
        // the close order leaves no new fill, so polls keep returning the
        // open fill's signature; the executor must back off and retry
        let mut h = harness(
            vec![
                Some(fill(dec!(1.00), 10, 0)), // open
                None,                          // close attempt 1: stale
                Some(fill(dec!(1.05), 10, 1)), // close attempt 2
            ],
            SignalKind::SellClose,
        );

        let outcome = h
            .executor
            .run(open_signal(10), "close-after", h.cancel.clone())
            .await;

        let CycleOutcome::Settled(session) = outcome else {
            panic!("expected settlement");
        };
        // the stale open fill never entered the close set
        assert_eq!(session.total_qty, 10);
        assert_eq!(session.avg_close_price, dec!(1.05));

        let close_fills: usize = drain(&mut h.events)
            .iter()
            .filter(|e| matches!(e, EngineEvent::CloseFilled { .. }))
            .count();
        assert_eq!(close_fills, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_unfilled_aborts_without_position() {
        let mut h = harness(vec![None], SignalKind::SellClose);

        let outcome = h
            .executor
            .run(open_signal(10), "close-after", h.cancel.clone())
            .await;

        assert!(matches!(
            outcome,
            CycleOutcome::Aborted(AbortReason::OpenUnfilled)
        ));
        assert!(!h.ledger.has_open_position());
        assert_eq!(h.registry.position("close-after"), 0);
        let events = drain(&mut h.events);
        assert!(matches!(
            events.last(),
            Some(EngineEvent::CycleAborted {
                reason: AbortReason::OpenUnfilled,
                ..
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_budget_exhaustion_aborts_with_fill_timeout() {
        // open fills, every close attempt stays unfilled
        let mut responses = vec![Some(fill(dec!(1.00), 10, 0))];
        responses.extend(std::iter::repeat_with(|| None).take(64));
        let mut h = harness(responses, SignalKind::SellClose);

        let outcome = h
            .executor
            .run(open_signal(10), "close-after", h.cancel.clone())
            .await;

        assert!(matches!(
            outcome,
            CycleOutcome::Aborted(AbortReason::FillTimeout {
                filled_qty: 0,
                remaining_qty: 10,
            })
        ));
        // the strategy is parked in Error with the partial state recorded
        let info = &h.registry.strategies()[0];
        assert_eq!(
            info.state,
            arbiter_strategy::StrategyState::Error
        );
        assert!(info.error_message.as_deref().is_some_and(|m| m.contains("10")));
        // the ledger still shows the open position for manual handling
        assert!(h.ledger.has_open_position());
        drain(&mut h.events);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_during_fixed_delay() {
        let h = harness(vec![Some(fill(dec!(1.00), 10, 0))], SignalKind::SellClose);
        let (cancel_tx, cancel) = watch::channel(false);

        let executor = h.executor;
        let run = tokio::spawn(async move {
            executor
                .run(open_signal(10), "close-after", cancel)
                .await
        });
        // let the cycle enter its fixed delay, then shut down
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel_tx.send(true).ok();

        let outcome = run.await.unwrap();
        assert!(matches!(
            outcome,
            CycleOutcome::Aborted(AbortReason::Cancelled)
        ));
        assert!(!h.ledger.has_open_position());
        assert!(h.gateway.submissions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_gateway_error_aborts_and_marks_strategy() {
        struct FailingGateway;

        #[async_trait::async_trait]
        impl OrderGateway for FailingGateway {
            async fn submit(&self, _signal: &TradingSignal) -> Result<(), GatewayError> {
                Err(GatewayError::Connection("venue unreachable".into()))
            }

            async fn poll_fill(&self) -> Result<Option<Fill>, GatewayError> {
                Ok(None)
            }
        }

        let _ = env_logger::try_init();
        let registry = Arc::new(StrategyRegistry::new());
        registry.register_generator(
            "close-after",
            Box::new(CloseAfter {
                position: 0,
                after: Duration::from_secs(3),
                kind: SignalKind::SellClose,
            }),
            1,
        );
        registry.enable("close-after");
        let ledger = Arc::new(Ledger::default());
        let (events_tx, _events) = mpsc::unbounded_channel();
        let (_cancel_tx, cancel) = watch::channel(false);
        let executor = CycleExecutor::new(
            Arc::clone(&registry),
            Arc::clone(&ledger),
            Arc::new(FailingGateway),
            events_tx,
            CycleConfig::default(),
        );

        let outcome = executor.run(open_signal(10), "close-after", cancel).await;
        assert!(matches!(
            outcome,
            CycleOutcome::Aborted(AbortReason::Gateway)
        ));
        let info = &registry.strategies()[0];
        assert_eq!(info.state, arbiter_strategy::StrategyState::Error);
        assert!(!ledger.has_open_position());
    }
}
