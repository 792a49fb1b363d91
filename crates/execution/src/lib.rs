//! Arbiter Trade Cycle Execution
//!
//! Drives an accepted opening signal through its full life:
//! fixed delay, order entry, fill confirmation, the dynamic holding wait,
//! the bounded close loop and settlement. Order entry itself sits behind
//! the [`OrderGateway`] port; fills are deduplicated by signature.

pub mod cycle;
pub mod events;
pub mod gateway;

pub use cycle::{AbortReason, CycleConfig, CycleExecutor, CycleOutcome};
pub use events::EngineEvent;
pub use gateway::{GatewayError, OrderGateway};
