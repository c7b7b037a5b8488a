//! MACD / Signal Crossover Strategy.
//!
//! Goes long when the MACD line crosses above its signal line and exits when
//! it crosses back below.

use serde::{Deserialize, Serialize};
use trading_core::{
    error::StrategyError,
    traits::{MarketView, Strategy},
    types::IndicatorKind,
};

/// Configuration for the MACD crossover strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdCrossoverConfig {
    /// Histogram (MACD - signal) must exceed this to enter
    pub min_histogram: f64,
    /// Only enter while the MACD line is above zero
    pub require_positive_macd: bool,
}

impl Default for MacdCrossoverConfig {
    fn default() -> Self {
        Self {
            min_histogram: 0.0,
            require_positive_macd: false,
        }
    }
}

impl MacdCrossoverConfig {
    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.min_histogram < 0.0 || !self.min_histogram.is_finite() {
            return Err(StrategyError::InvalidConfig(
                "Minimum histogram must be a non-negative number".into(),
            ));
        }
        Ok(())
    }
}

/// MACD crossover strategy.
#[derive(Debug, Clone)]
pub struct MacdCrossoverStrategy {
    config: MacdCrossoverConfig,
}

impl MacdCrossoverStrategy {
    pub fn new(config: MacdCrossoverConfig) -> Self {
        Self { config }
    }

    #[inline]
    fn histogram(idx: usize, view: &MarketView<'_>) -> Option<f64> {
        Some(view.macd(idx)? - view.signal(idx)?)
    }
}

impl Default for MacdCrossoverStrategy {
    fn default() -> Self {
        Self::new(MacdCrossoverConfig::default())
    }
}

impl Strategy for MacdCrossoverStrategy {
    fn name(&self) -> &str {
        "MACD Crossover"
    }

    fn description(&self) -> &str {
        "Goes long when the MACD line crosses above its signal line"
    }

    fn warmup_period(&self) -> usize {
        1
    }

    fn required_indicators(&self) -> &[IndicatorKind] {
        &[IndicatorKind::Macd]
    }

    fn should_enter_long(&self, idx: usize, view: &MarketView<'_>) -> bool {
        if idx == 0 {
            return false;
        }
        let (Some(prev), Some(curr)) = (Self::histogram(idx - 1, view), Self::histogram(idx, view)) else {
            return false;
        };
        if self.config.require_positive_macd && view.macd(idx).map_or(true, |m| m <= 0.0) {
            return false;
        }
        prev <= self.config.min_histogram && curr > self.config.min_histogram
    }

    fn should_exit_long(&self, idx: usize, view: &MarketView<'_>) -> bool {
        if idx == 0 {
            return false;
        }
        match (Self::histogram(idx - 1, view), Self::histogram(idx, view)) {
            (Some(prev), Some(curr)) => prev >= 0.0 && curr < 0.0,
            _ => false,
        }
    }
}
