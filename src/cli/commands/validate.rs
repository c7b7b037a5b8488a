//! Validate configuration command.

use anyhow::Result;
use std::path::Path;
use trading_config::load_config;

pub fn run(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {:?}", config_path);

    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("Configuration error: {}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = config.validate() {
        println!("Configuration error: {}", e);
        return Err(e.into());
    }

    println!("Configuration is valid!");
    println!();
    println!("App: {}", config.app.name);
    println!("Environment: {}", config.app.environment);
    println!("Log level: {}", config.logging.level);
    println!("Symbol: {}", config.data.symbol);
    println!(
        "Indicators: EMA {}, RSI {}, MACD {}/{}/{}",
        config.indicators.ema_period,
        config.indicators.rsi_period,
        config.indicators.macd_fast,
        config.indicators.macd_slow,
        config.indicators.macd_signal
    );
    println!(
        "Backtest: {} workers, {} sink, capital {:.2}",
        config.backtest.workers, config.backtest.trade_sink, config.backtest.initial_capital
    );

    Ok(())
}
