//! CLI definitions.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use trading_backtest::TradeSink;
use trading_strategies::DEFAULT_STRATEGY;

#[derive(Parser)]
#[command(name = "hypertrade")]
#[command(author, version, about = "Cache-aware parallel backtesting engine for tick data")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Log level (defaults to the configured level)
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a JSON bar export into a binary tick file
    Convert(ConvertArgs),
    /// Compute EMA, RSI and MACD over a tick file
    Indicators(IndicatorsArgs),
    /// Run a parallel backtest over a tick file
    Backtest(BacktestArgs),
    /// List available strategies
    Strategies,
    /// Validate configuration
    ValidateConfig,
}

#[derive(clap::Args)]
pub struct ConvertArgs {
    /// JSON input file
    pub input: PathBuf,

    /// Binary tick output file
    pub output: PathBuf,
}

#[derive(clap::Args)]
pub struct IndicatorsArgs {
    /// Binary tick file
    #[arg(short, long)]
    pub data: PathBuf,

    /// Symbol label (defaults to data.symbol)
    #[arg(long)]
    pub symbol: Option<String>,

    /// Indicator pool threads (0 = hardware parallelism)
    #[arg(short, long)]
    pub threads: Option<usize>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(clap::Args)]
pub struct BacktestArgs {
    /// Binary tick file
    #[arg(short, long)]
    pub data: PathBuf,

    /// Strategy to backtest
    #[arg(short, long, default_value = DEFAULT_STRATEGY)]
    pub strategy: String,

    /// Strategy configuration file (JSON)
    #[arg(long)]
    pub strategy_config: Option<PathBuf>,

    /// Symbol label (defaults to data.symbol)
    #[arg(long)]
    pub symbol: Option<String>,

    /// Backtest worker threads (0 = hardware parallelism)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Trade delivery: local or queue
    #[arg(long)]
    pub sink: Option<TradeSink>,

    /// Initial capital
    #[arg(long)]
    pub capital: Option<f64>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Save the JSON report to file
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Write the trade list as CSV
    #[arg(long)]
    pub trades_csv: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_backtest() {
        let cli = Cli::try_parse_from([
            "hypertrade",
            "--log-level",
            "debug",
            "backtest",
            "--data",
            "ticks.bin",
            "--workers",
            "4",
            "--sink",
            "queue",
            "--output",
            "json",
        ])
        .unwrap();

        assert!(matches!(cli.log_level, Some(LogLevel::Debug)));
        match cli.command {
            Commands::Backtest(args) => {
                assert_eq!(args.strategy, DEFAULT_STRATEGY);
                assert_eq!(args.workers, Some(4));
                assert_eq!(args.sink, Some(TradeSink::Queue));
                assert!(matches!(args.output, OutputFormat::Json));
            }
            _ => panic!("expected backtest command"),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_sink() {
        assert!(Cli::try_parse_from([
            "hypertrade",
            "backtest",
            "--data",
            "ticks.bin",
            "--sink",
            "channel",
        ])
        .is_err());
    }
}
