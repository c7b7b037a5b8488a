//! Technical indicators over tick stores.
//!
//! This crate provides:
//! - Sequential EMA, RSI (Wilder) and MACD kernels over contiguous prices
//! - A fixed-size worker pool for chunk-parallel preparation on large inputs
//! - [`IndicatorEngine`], which owns the computed [`IndicatorSeries`]
//!
//! Element-wise work (price changes, MACD differences) goes through the
//! vectorized batch operations in `trading_core::simd`; recurrences stay
//! sequential per output index.
//!
//! [`IndicatorSeries`]: trading_core::IndicatorSeries

mod engine;
pub mod momentum;
pub mod moving_average;
mod pool;

pub use engine::{IndicatorConfig, IndicatorEngine};
pub use momentum::{Macd, Rsi};
pub use moving_average::{ema_into, Ema};
pub use pool::{TaskHandle, WorkerPool};
