//! Order entry port
//!
//! The engine never talks to a broker API directly; it submits signals and
//! polls for the most recent fill through this trait. The live adapter and
//! the test mocks both implement it.

use arbiter_core::{Fill, TradingSignal};
use async_trait::async_trait;
use thiserror::Error;

/// Order entry failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// The venue refused the order
    #[error("order rejected: {0}")]
    Rejected(String),

    /// Transport failure talking to the venue
    #[error("gateway connection failure: {0}")]
    Connection(String),
}

/// Asynchronous order entry and fill observation
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Submit an order for the given signal
    async fn submit(&self, signal: &TradingSignal) -> Result<(), GatewayError>;

    /// Most recent fill observed at the venue, if any. Callers deduplicate
    /// by [`arbiter_core::FillSignature`]; the same fill may be returned on
    /// consecutive polls.
    async fn poll_fill(&self) -> Result<Option<Fill>, GatewayError>;
}
