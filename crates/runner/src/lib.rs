//! Arbiter Runner - Engine Orchestration
//!
//! Ties the engine together and keeps it running:
//!
//! - **Source**: the market data port the poll loop reads from
//! - **Scheduler**: single-threaded poll loop, signal routing and the
//!   one-cycle-in-flight gate
//! - **Builder**: explicit wiring of registry, ledger, gateway and events
//! - **Sink**: event logging task, settled sessions as JSON lines
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────┐      ┌───────────────────┐
//!   │ MarketDataSource │─────▶│     Scheduler     │
//!   └──────────────────┘ poll │ (0.5 s tick loop) │
//!                             └─────────┬─────────┘
//!                        opening signal │ cycle gate
//!                                       ▼
//!   ┌──────────────────┐      ┌───────────────────┐
//!   │ StrategyRegistry │◀────▶│   CycleExecutor   │──▶ EngineEvent sink
//!   └──────────────────┘      └─────────┬─────────┘
//!                                       │ orders
//!                                       ▼
//!                             ┌───────────────────┐
//!                             │   OrderGateway    │
//!                             └───────────────────┘
//! ```

pub mod builder;
pub mod scheduler;
pub mod sink;
pub mod source;

// Re-export main types
pub use builder::{BuildError, Engine, EngineBuilder, ShutdownHandle};
pub use scheduler::Scheduler;
pub use sink::spawn_event_logger;
pub use source::{FeedError, MarketDataSource};
