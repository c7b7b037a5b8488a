//! CLI command implementations.

pub mod backtest;
pub mod convert;
pub mod indicators;
pub mod strategies;
pub mod validate;

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;
use trading_config::AppConfig;
use trading_data::TickStore;
use trading_indicators::{IndicatorConfig, IndicatorEngine};
use trading_monitor::ScopedTimer;

/// Load a binary tick file, labelled with `symbol` or the configured one.
fn load_store(path: &Path, symbol: Option<&str>, config: &AppConfig) -> Result<TickStore> {
    if !path.exists() {
        anyhow::bail!(
            "Data file '{}' does not exist. Convert a JSON export first (e.g. hypertrade convert bars.json ticks.bin)",
            path.display()
        );
    }

    let symbol = symbol.unwrap_or(&config.data.symbol);
    let mut store = TickStore::with_capacity(symbol, config.data.reserve_ticks);

    let timer = ScopedTimer::new("load");
    let count = store
        .load(path)
        .with_context(|| format!("Failed to load tick data from {}", path.display()))?;
    timer.stop();

    if count == 0 {
        anyhow::bail!("No ticks in {}", path.display());
    }

    info!("Loaded {} ticks for {}", count, store.symbol());
    Ok(store)
}

/// Indicator engine for `config`, optionally overriding the pool size.
fn indicator_engine(config: &IndicatorConfig, threads: Option<usize>) -> Result<IndicatorEngine> {
    let mut config = config.clone();
    if let Some(threads) = threads {
        config.pool_threads = threads;
    }
    IndicatorEngine::new(&config).context("Failed to create indicator engine")
}
