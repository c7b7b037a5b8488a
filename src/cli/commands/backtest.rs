//! Backtest command implementation.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;
use trading_backtest::{BacktestReport, ParallelBacktestEngine};
use trading_config::AppConfig;
use trading_monitor::ScopedTimer;
use trading_strategies::StrategyRegistry;

use super::{indicator_engine, load_store};
use crate::cli::{BacktestArgs, OutputFormat};

pub fn run(args: BacktestArgs, config: &AppConfig) -> Result<()> {
    info!("Starting backtest for strategy: {}", args.strategy);

    // Create strategy
    let registry = StrategyRegistry::new();
    let strategy_config = match &args.strategy_config {
        Some(path) => read_strategy_config(path)?,
        None => serde_json::Value::Null,
    };
    let strategy = registry
        .create(&args.strategy, strategy_config)
        .context("Failed to create strategy")?;

    // Load data and compute indicators before the backtest starts
    let store = load_store(&args.data, args.symbol.as_deref(), config)?;
    let mut indicators = indicator_engine(&config.indicators, None)?;
    indicators
        .calculate_all(&store)
        .context("Indicator calculation failed")?;

    // Create backtest config
    let mut backtest_config = config.backtest.clone();
    if let Some(workers) = args.workers {
        backtest_config.workers = workers;
    }
    if let Some(sink) = args.sink {
        backtest_config.trade_sink = sink;
    }
    if let Some(capital) = args.capital {
        backtest_config.initial_capital = capital;
    }

    // Run backtest
    let mut engine =
        ParallelBacktestEngine::new(backtest_config).context("Invalid backtest configuration")?;
    let timer = ScopedTimer::new("backtest");
    engine
        .run_backtest(&store, indicators.series(), strategy.as_ref())
        .context("Backtest failed")?;
    timer.stop();

    let report = BacktestReport::from_engine(store.symbol(), strategy.name(), &engine)
        .context("Backtest produced no metrics")?;

    // Output results
    match args.output {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Text => println!("{}", report.summary()),
    }

    // Save if requested
    if let Some(save_path) = &args.save {
        let json = report.to_json()?;
        std::fs::write(save_path, json)
            .with_context(|| format!("Failed to write {}", save_path.display()))?;
        info!("Results saved to {:?}", save_path);
    }

    if let Some(csv_path) = &args.trades_csv {
        report
            .save_trades_csv(csv_path)
            .context("Failed to write trades CSV")?;
        info!("{} trades written to {:?}", report.trades.len(), csv_path);
    }

    Ok(())
}

fn read_strategy_config(path: &Path) -> Result<serde_json::Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read strategy config {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Strategy config {} is not valid JSON", path.display()))
}
