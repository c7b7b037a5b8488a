//! Core data types.

mod indicator_series;
mod metrics;
mod tick;
mod trade;

pub use indicator_series::{IndicatorKind, IndicatorSeries, MacdParams};
pub use metrics::BacktestMetrics;
pub use tick::{Tick, TICK_RECORD_SIZE};
pub use trade::Trade;
