//! Arbiter Strategy Framework
//!
//! Signal generation for the trading engine:
//!
//! - **Generator trait**: the capability contract every strategy variant
//!   implements (analyze a snapshot, decide on closes, expose parameters)
//! - **Variants**: threshold arbitrage, volatility, spread arbitrage,
//!   mean reversion
//! - **Registry**: owns named strategy runtimes, enablement, priority
//!   ordering and the single active selection, serialized by one mutex

pub mod error;
pub mod generator;
pub mod mean_reversion;
pub mod registry;
pub mod spread;
pub mod threshold;
pub mod volatility;

// Re-export main types
pub use error::StrategyError;
pub use generator::{GeneratorCore, SignalGenerator};
pub use mean_reversion::{MeanReversion, MeanReversionConfig};
pub use registry::{
    RegistryError, StrategyInfo, StrategyRegistry, StrategyState, StrategyVariant,
};
pub use spread::{SpreadArbitrage, SpreadArbitrageConfig};
pub use threshold::{ThresholdArbitrage, ThresholdArbitrageConfig};
pub use volatility::{VolatilityConfig, VolatilityStrategy};
