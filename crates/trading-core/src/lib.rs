//! Core types and traits for the backtesting engine.
//!
//! This crate provides the foundational building blocks including:
//! - Market data and result types (Tick, Trade, IndicatorSeries, BacktestMetrics)
//! - Cache-line aligned storage primitives
//! - Vectorized batch arithmetic with a scalar fallback
//! - The strategy trait evaluated by the backtest workers

pub mod aligned;
pub mod error;
pub mod simd;
pub mod traits;
pub mod types;

pub use aligned::{AlignedBuffer, CacheAligned, CachePadded, CACHE_LINE_SIZE};
pub use error::{
    BacktestError, DataError, IndicatorError, StrategyError, TradingError, TradingResult,
};
pub use traits::*;
pub use types::*;
