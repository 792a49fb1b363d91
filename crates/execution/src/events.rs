//! Engine events
//!
//! Every externally interesting moment of a trade cycle is published on an
//! unbounded channel; sinks (logger, persistence, UI) consume without
//! back-pressuring the engine.

use crate::cycle::AbortReason;
use arbiter_core::{Fill, TradingSession, TradingSignal};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// An opening signal was accepted and a cycle started
    SignalAccepted {
        cycle_id: Uuid,
        strategy: String,
        signal: TradingSignal,
    },
    /// The opening order filled
    OpenFilled {
        cycle_id: Uuid,
        strategy: String,
        fill: Fill,
    },
    /// A closing order filled, possibly partially
    CloseFilled {
        cycle_id: Uuid,
        strategy: String,
        fill: Fill,
        /// Contracts still unclosed after this fill
        remaining: u32,
    },
    /// The cycle closed out fully and the session was booked
    SessionSettled {
        cycle_id: Uuid,
        session: TradingSession,
    },
    /// The cycle ended without settling
    CycleAborted {
        cycle_id: Uuid,
        strategy: String,
        reason: AbortReason,
    },
}
