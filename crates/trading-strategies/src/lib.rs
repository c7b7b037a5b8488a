//! Trading strategy implementations.
//!
//! Strategies are stateless rule sets evaluated per tick index against
//! precomputed indicators:
//! - Price / EMA crossover (the default)
//! - MACD / signal crossover
//! - RSI mean reversion

mod ema_crossover;
mod macd_crossover;
mod registry;
mod rsi_reversion;

pub use ema_crossover::{EmaCrossoverConfig, EmaCrossoverStrategy};
pub use macd_crossover::{MacdCrossoverConfig, MacdCrossoverStrategy};
pub use registry::{StrategyInfo, StrategyRegistry, DEFAULT_STRATEGY};
pub use rsi_reversion::{RsiReversionConfig, RsiReversionStrategy};
