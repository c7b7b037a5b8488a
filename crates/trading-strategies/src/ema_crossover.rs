//! Price / EMA Crossover Strategy.
//!
//! Enters long when the price crosses above its EMA and exits when it crosses
//! back below. Signals are edge-triggered: they fire on the tick where the
//! crossing happens, not on every tick spent above or below the average.

use serde::{Deserialize, Serialize};
use trading_core::{
    error::StrategyError,
    traits::{MarketView, Strategy},
    types::IndicatorKind,
};

/// Configuration for the EMA crossover strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmaCrossoverConfig {
    /// Minimum distance from the EMA, as a fraction of it, for a crossing to
    /// count
    pub signal_threshold: f64,
}

impl Default for EmaCrossoverConfig {
    fn default() -> Self {
        Self {
            signal_threshold: 0.0,
        }
    }
}

impl EmaCrossoverConfig {
    pub fn validate(&self) -> Result<(), StrategyError> {
        if !(0.0..1.0).contains(&self.signal_threshold) {
            return Err(StrategyError::InvalidConfig(
                "Signal threshold must be in [0, 1)".into(),
            ));
        }
        Ok(())
    }
}

/// EMA crossover strategy.
#[derive(Debug, Clone)]
pub struct EmaCrossoverStrategy {
    config: EmaCrossoverConfig,
}

impl EmaCrossoverStrategy {
    /// Create a new EMA crossover strategy.
    pub fn new(config: EmaCrossoverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EmaCrossoverConfig {
        &self.config
    }

    /// Price minus the threshold-adjusted EMA at `idx`.
    #[inline]
    fn spread(&self, idx: usize, view: &MarketView<'_>, direction: f64) -> Option<f64> {
        let ema = view.ema(idx)?;
        Some(view.price(idx) - ema * (1.0 + direction * self.config.signal_threshold))
    }
}

impl Default for EmaCrossoverStrategy {
    fn default() -> Self {
        Self::new(EmaCrossoverConfig::default())
    }
}

impl Strategy for EmaCrossoverStrategy {
    fn name(&self) -> &str {
        "EMA Crossover"
    }

    fn description(&self) -> &str {
        "Goes long when the price crosses above its EMA, exits on the cross back below"
    }

    fn warmup_period(&self) -> usize {
        1
    }

    fn required_indicators(&self) -> &[IndicatorKind] {
        &[IndicatorKind::Ema]
    }

    fn should_enter_long(&self, idx: usize, view: &MarketView<'_>) -> bool {
        if idx == 0 {
            return false;
        }
        match (self.spread(idx - 1, view, 1.0), self.spread(idx, view, 1.0)) {
            (Some(prev), Some(curr)) => prev <= 0.0 && curr > 0.0,
            _ => false,
        }
    }

    fn should_exit_long(&self, idx: usize, view: &MarketView<'_>) -> bool {
        if idx == 0 {
            return false;
        }
        match (self.spread(idx - 1, view, -1.0), self.spread(idx, view, -1.0)) {
            (Some(prev), Some(curr)) => prev >= 0.0 && curr < 0.0,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trading_core::{IndicatorSeries, Tick};

    fn fixture(prices: &[f64], ema: &[f64]) -> (Vec<Tick>, IndicatorSeries) {
        let ticks = prices
            .iter()
            .enumerate()
            .map(|(i, &p)| Tick::new(i as i64, p, 1.0))
            .collect();
        let mut series = IndicatorSeries::new();
        series.set_ema(ema.to_vec(), 3);
        (ticks, series)
    }

    #[test]
    fn test_config_validation() {
        let mut config = EmaCrossoverConfig::default();
        assert!(config.validate().is_ok());

        config.signal_threshold = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bullish_crossover() {
        let (ticks, series) = fixture(&[99.0, 101.0, 102.0], &[100.0, 100.0, 100.0]);
        let view = MarketView::new(&ticks, &series);
        let strategy = EmaCrossoverStrategy::default();

        assert!(!strategy.should_enter_long(0, &view));
        assert!(strategy.should_enter_long(1, &view));
        // Already above: no new crossing
        assert!(!strategy.should_enter_long(2, &view));
    }

    #[test]
    fn test_bearish_crossover() {
        let (ticks, series) = fixture(&[101.0, 99.0, 98.0], &[100.0, 100.0, 100.0]);
        let view = MarketView::new(&ticks, &series);
        let strategy = EmaCrossoverStrategy::default();

        assert!(strategy.should_exit_long(1, &view));
        assert!(!strategy.should_exit_long(2, &view));
        assert!(!strategy.should_enter_long(1, &view));
    }

    #[test]
    fn test_threshold_filters_small_crossings() {
        let (ticks, series) = fixture(&[99.0, 100.5, 102.0], &[100.0, 100.0, 100.0]);
        let view = MarketView::new(&ticks, &series);
        let strategy = EmaCrossoverStrategy::new(EmaCrossoverConfig {
            signal_threshold: 0.01,
        });

        assert!(!strategy.should_enter_long(1, &view));
        assert!(strategy.should_enter_long(2, &view));
    }

    #[test]
    fn test_missing_ema_never_signals() {
        let ticks = vec![Tick::new(0, 99.0, 1.0), Tick::new(1, 101.0, 1.0)];
        let series = IndicatorSeries::new();
        let view = MarketView::new(&ticks, &series);
        let strategy = EmaCrossoverStrategy::default();

        assert!(!strategy.should_enter_long(1, &view));
        assert!(!strategy.should_exit_long(1, &view));
    }
}
