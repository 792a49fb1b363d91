//! Market data port
//!
//! The scheduler never touches a quote feed directly; it polls snapshots
//! through this trait. The live adapter and the test feeds implement it.

use arbiter_core::MarketSnapshot;
use async_trait::async_trait;
use thiserror::Error;

/// Quote feed failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedError {
    /// Transport failure talking to the feed
    #[error("market data feed failure: {0}")]
    Connection(String),
}

/// Asynchronous snapshot source. `Ok(None)` means no fresh quote this
/// tick; the scheduler simply skips it.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn snapshot(&self) -> Result<Option<MarketSnapshot>, FeedError>;
}
