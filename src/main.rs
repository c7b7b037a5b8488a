//! Backtesting engine CLI application.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use trading_config::{load_config_or_default, LogFormat};
use trading_monitor::setup_logging;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config_or_default(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    // Setup logging; command-line flags win over the config file
    let log_level = cli
        .log_level
        .map(|level| level.as_str().to_string())
        .unwrap_or_else(|| config.logging.level.clone());
    let json = cli.json_logs || config.logging.format == LogFormat::Json;
    let _log_guard = setup_logging(&log_level, json, config.logging.file.as_deref())
        .context("Failed to initialize logging")?;

    // Execute command
    match cli.command {
        Commands::Convert(args) => cli::commands::convert::run(args),
        Commands::Indicators(args) => cli::commands::indicators::run(args, &config),
        Commands::Backtest(args) => cli::commands::backtest::run(args, &config),
        Commands::Strategies => cli::commands::strategies::run(),
        Commands::ValidateConfig => cli::commands::validate::run(&cli.config),
    }
}
