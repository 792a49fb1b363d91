//! Error types for the strategy crate

use thiserror::Error;

/// Failures raised inside a signal generator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrategyError {
    /// A snapshot field the variant requires was missing or degenerate.
    /// The caller skips the tick; no strategy state changes.
    #[error("required market data unavailable: {0}")]
    DataUnavailable(&'static str),

    /// Internal failure of the generator. The registry isolates it to the
    /// owning strategy (state -> Error) and keeps serving the others.
    #[error("strategy fault: {0}")]
    Fault(String),
}
