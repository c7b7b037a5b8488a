//! Configuration structures.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use trading_backtest::BacktestConfig;
use trading_core::{TradingError, TradingResult};
use trading_indicators::IndicatorConfig;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub data: DataSettings,
    #[serde(default)]
    pub indicators: IndicatorConfig,
    #[serde(default)]
    pub backtest: BacktestConfig,
}

impl AppConfig {
    /// Check every section, reporting the first problem found.
    pub fn validate(&self) -> TradingResult<()> {
        if self.data.symbol.trim().is_empty() {
            return Err(TradingError::Config("data.symbol must not be empty".to_string()));
        }
        self.indicators.validate()?;
        self.backtest.validate()?;
        Ok(())
    }
}

/// General app settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "hypertrade".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    /// Also write logs to this file
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

/// Tick data settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Symbol recorded on loaded stores
    pub symbol: String,
    /// Ticks reserved up front when a store is created
    pub reserve_ticks: usize,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            symbol: "AAPL".to_string(),
            reserve_ticks: 1_000_000,
        }
    }
}
