//! Parallel backtesting over precomputed indicators.
//!
//! - [`ParallelBacktestEngine`] partitions the tick range across worker
//!   threads and stitches their trades into one sequential result
//! - [`ring_buffer`] is the bounded SPSC channel used by the queue trade sink
//! - [`ThreadLocalAccumulator`] and [`GlobalMetrics`] hold per-worker and
//!   shared lock-free totals
//! - [`statistics`] derives return, drawdown and Sharpe figures

mod accumulator;
mod engine;
mod report;
pub mod ring_buffer;
pub mod statistics;

pub use accumulator::{GlobalMetrics, GlobalSnapshot, ThreadLocalAccumulator};
pub use engine::{BacktestConfig, ParallelBacktestEngine, StopHandle, TradeSink};
pub use report::BacktestReport;
pub use statistics::{compute_metrics, MetricsConfig};
