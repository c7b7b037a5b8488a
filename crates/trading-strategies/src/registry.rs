//! Strategy registry for dynamic strategy loading.

use crate::{
    EmaCrossoverConfig, EmaCrossoverStrategy, MacdCrossoverConfig, MacdCrossoverStrategy,
    RsiReversionConfig, RsiReversionStrategy,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use trading_core::{error::StrategyError, traits::Strategy, types::IndicatorKind};

/// Name of the strategy used when none is requested.
pub const DEFAULT_STRATEGY: &str = "ema_crossover";

/// Information about a registered strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyInfo {
    /// Registry key
    pub key: String,
    /// Strategy name
    pub name: String,
    /// Strategy description
    pub description: String,
    /// Indicator series the strategy reads
    pub indicators: Vec<IndicatorKind>,
    /// Default configuration as JSON
    pub default_config: Value,
}

impl StrategyInfo {
    fn of(key: &str, strategy: &dyn Strategy, default_config: Value) -> Self {
        Self {
            key: key.to_string(),
            name: strategy.name().to_string(),
            description: strategy.description().to_string(),
            indicators: strategy.required_indicators().to_vec(),
            default_config,
        }
    }
}

/// Registry for available trading strategies.
pub struct StrategyRegistry {
    strategies: HashMap<String, StrategyInfo>,
}

fn parse<T: serde::de::DeserializeOwned>(config: Value) -> Result<T, StrategyError> {
    let config = if config.is_null() {
        Value::Object(Default::default())
    } else {
        config
    };
    serde_json::from_value(config).map_err(|e| StrategyError::InvalidConfig(e.to_string()))
}

impl StrategyRegistry {
    /// Create a new strategy registry with all built-in strategies.
    pub fn new() -> Self {
        let entries = [
            StrategyInfo::of(
                "ema_crossover",
                &EmaCrossoverStrategy::default(),
                serde_json::to_value(EmaCrossoverConfig::default()).unwrap_or(Value::Null),
            ),
            StrategyInfo::of(
                "macd_crossover",
                &MacdCrossoverStrategy::default(),
                serde_json::to_value(MacdCrossoverConfig::default()).unwrap_or(Value::Null),
            ),
            StrategyInfo::of(
                "rsi_reversion",
                &RsiReversionStrategy::default(),
                serde_json::to_value(RsiReversionConfig::default()).unwrap_or(Value::Null),
            ),
        ];

        Self {
            strategies: entries
                .into_iter()
                .map(|info| (info.key.clone(), info))
                .collect(),
        }
    }

    /// List all available strategies, ordered by key.
    pub fn list(&self) -> Vec<&StrategyInfo> {
        let mut infos: Vec<_> = self.strategies.values().collect();
        infos.sort_by(|a, b| a.key.cmp(&b.key));
        infos
    }

    /// Get strategy info by name.
    pub fn get(&self, name: &str) -> Option<&StrategyInfo> {
        self.strategies.get(name)
    }

    /// Check if a strategy exists.
    pub fn exists(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }

    /// Create a strategy instance from configuration.
    ///
    /// Missing fields take their defaults; `null` means all defaults.
    pub fn create(&self, name: &str, config: Value) -> Result<Box<dyn Strategy>, StrategyError> {
        match name {
            "ema_crossover" => {
                let config: EmaCrossoverConfig = parse(config)?;
                config.validate()?;
                Ok(Box::new(EmaCrossoverStrategy::new(config)))
            }
            "macd_crossover" => {
                let config: MacdCrossoverConfig = parse(config)?;
                config.validate()?;
                Ok(Box::new(MacdCrossoverStrategy::new(config)))
            }
            "rsi_reversion" => {
                let config: RsiReversionConfig = parse(config)?;
                config.validate()?;
                Ok(Box::new(RsiReversionStrategy::new(config)))
            }
            _ => Err(StrategyError::NotFound(name.to_string())),
        }
    }

    /// Create a strategy with default configuration.
    pub fn create_default(&self, name: &str) -> Result<Box<dyn Strategy>, StrategyError> {
        let info = self
            .get(name)
            .ok_or_else(|| StrategyError::NotFound(name.to_string()))?;
        self.create(name, info.default_config.clone())
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}
