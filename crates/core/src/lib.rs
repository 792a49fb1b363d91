//! Arbiter Core Domain
//!
//! Pure domain types for the arbiter strategy execution engine.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod fill;
pub mod market;
pub mod params;
pub mod session;
pub mod signal;

// Re-export commonly used types at crate root
pub use fill::{Fill, FillSignature};
pub use market::{MarketSnapshot, Trend};
pub use params::{ParamError, ParamKind, ParamSchema, ParamSpec, ParamValue, validate_params};
pub use session::TradingSession;
pub use signal::{Direction, SignalKind, TradingSignal};
