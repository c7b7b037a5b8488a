//! Indicators command implementation.

use anyhow::{Context, Result};
use trading_config::AppConfig;
use trading_monitor::ScopedTimer;

use super::{indicator_engine, load_store};
use crate::cli::IndicatorsArgs;

pub fn run(args: IndicatorsArgs, config: &AppConfig) -> Result<()> {
    let store = load_store(&args.data, args.symbol.as_deref(), config)?;
    let mut engine = indicator_engine(&config.indicators, args.threads)?;

    let timer = ScopedTimer::new("indicators");
    engine
        .calculate_all(&store)
        .context("Indicator calculation failed")?;
    let elapsed = timer.stop();
    let series = engine.series();

    let last = |values: &[f64]| values.last().copied().unwrap_or(f64::NAN);

    println!("Indicators for {} ({} ticks)", store.symbol(), store.len());
    println!("═══════════════════════════════════════════════════════════");
    println!("  Pool threads:        {}", engine.pool_size());
    println!("  Elapsed:             {:.3} ms", elapsed.as_secs_f64() * 1_000.0);
    println!("  Warm-up:             {} ticks", series.warmup());
    println!();
    println!("  EMA({}):             {:.4}", series.ema_period(), last(series.ema()));
    println!("  RSI({}):             {:.2}", series.rsi_period(), last(series.rsi()));
    println!("  MACD line:           {:.4}", last(series.macd_line()));
    println!("  MACD signal:         {:.4}", last(series.signal_line()));

    Ok(())
}
