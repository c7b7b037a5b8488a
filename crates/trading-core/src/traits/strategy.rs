//! Strategy trait definitions.

use crate::types::{IndicatorKind, IndicatorSeries, Tick};

/// Read-only view of the ticks and their precomputed indicators.
///
/// Strategies see the whole series, but the backtest only asks them about
/// indices past the warm-up window.
#[derive(Debug, Clone, Copy)]
pub struct MarketView<'a> {
    ticks: &'a [Tick],
    indicators: &'a IndicatorSeries,
}

impl<'a> MarketView<'a> {
    pub fn new(ticks: &'a [Tick], indicators: &'a IndicatorSeries) -> Self {
        Self { ticks, indicators }
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn ticks(&self) -> &'a [Tick] {
        self.ticks
    }

    pub fn indicators(&self) -> &'a IndicatorSeries {
        self.indicators
    }

    /// Tick at `idx`. Panics when out of range, like slice indexing.
    #[inline]
    pub fn tick(&self, idx: usize) -> &'a Tick {
        &self.ticks[idx]
    }

    #[inline]
    pub fn price(&self, idx: usize) -> f64 {
        self.ticks[idx].price
    }

    #[inline]
    pub fn ema(&self, idx: usize) -> Option<f64> {
        self.indicators.ema().get(idx).copied()
    }

    /// RSI at `idx`; `None` inside the warm-up window.
    #[inline]
    pub fn rsi(&self, idx: usize) -> Option<f64> {
        self.indicators
            .rsi()
            .get(idx)
            .copied()
            .filter(|v| !v.is_nan())
    }

    #[inline]
    pub fn macd(&self, idx: usize) -> Option<f64> {
        self.indicators.macd_line().get(idx).copied()
    }

    #[inline]
    pub fn signal(&self, idx: usize) -> Option<f64> {
        self.indicators.signal_line().get(idx).copied()
    }
}

/// Long-only entry/exit rules evaluated per tick index.
///
/// Rules are pure functions of the view and the index. Backtest workers share
/// one strategy instance and may evaluate any index in any order, so
/// implementations must not keep per-call state.
pub trait Strategy: Send + Sync {
    /// Get the unique name of this strategy.
    fn name(&self) -> &str;

    /// Get a description of the strategy.
    fn description(&self) -> &str {
        ""
    }

    /// How many ticks before `idx` the rules read.
    ///
    /// Evaluation starts this many ticks after the indicator warm-up, so a
    /// rule looking back from the first evaluated index still lands on a
    /// computed value.
    fn warmup_period(&self) -> usize;

    /// Indicator series the rules read.
    fn required_indicators(&self) -> &[IndicatorKind] {
        &[]
    }

    /// Open a long position at `idx`?
    fn should_enter_long(&self, idx: usize, view: &MarketView<'_>) -> bool;

    /// Close the open long position at `idx`?
    fn should_exit_long(&self, idx: usize, view: &MarketView<'_>) -> bool;
}
