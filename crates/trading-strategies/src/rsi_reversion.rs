//! RSI Mean Reversion Strategy.
//!
//! Buys when RSI recovers from oversold territory (crosses up through the
//! oversold level) and sells once RSI reaches the overbought level.

use serde::{Deserialize, Serialize};
use trading_core::{
    error::StrategyError,
    traits::{MarketView, Strategy},
    types::IndicatorKind,
};

/// Configuration for the RSI reversion strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiReversionConfig {
    /// Oversold threshold (buy on the cross back above this)
    pub oversold: f64,
    /// Overbought threshold (sell at or above this)
    pub overbought: f64,
}

impl Default for RsiReversionConfig {
    fn default() -> Self {
        Self {
            oversold: 30.0,
            overbought: 70.0,
        }
    }
}

impl RsiReversionConfig {
    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.overbought <= self.oversold {
            return Err(StrategyError::InvalidConfig(
                "Overbought must be greater than oversold".into(),
            ));
        }
        if self.overbought > 100.0 || self.oversold < 0.0 {
            return Err(StrategyError::InvalidConfig(
                "RSI thresholds must be between 0 and 100".into(),
            ));
        }
        Ok(())
    }
}

/// RSI reversion strategy.
#[derive(Debug, Clone)]
pub struct RsiReversionStrategy {
    config: RsiReversionConfig,
}

impl RsiReversionStrategy {
    pub fn new(config: RsiReversionConfig) -> Self {
        Self { config }
    }
}

impl Default for RsiReversionStrategy {
    fn default() -> Self {
        Self::new(RsiReversionConfig::default())
    }
}

impl Strategy for RsiReversionStrategy {
    fn name(&self) -> &str {
        "RSI Reversion"
    }

    fn description(&self) -> &str {
        "Buys RSI recoveries from oversold, sells at overbought"
    }

    fn warmup_period(&self) -> usize {
        1
    }

    fn required_indicators(&self) -> &[IndicatorKind] {
        &[IndicatorKind::Rsi]
    }

    fn should_enter_long(&self, idx: usize, view: &MarketView<'_>) -> bool {
        if idx == 0 {
            return false;
        }
        match (view.rsi(idx - 1), view.rsi(idx)) {
            (Some(prev), Some(curr)) => prev <= self.config.oversold && curr > self.config.oversold,
            _ => false,
        }
    }

    fn should_exit_long(&self, idx: usize, view: &MarketView<'_>) -> bool {
        view.rsi(idx).is_some_and(|rsi| rsi >= self.config.overbought)
    }
}
