//! Error types for the backtesting engine.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error.
#[derive(Error, Debug)]
pub enum TradingError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Indicator error: {0}")]
    Indicator(#[from] IndicatorError),

    #[error("Backtest error: {0}")]
    Backtest(#[from] BacktestError),

    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Tick storage and ingestion errors.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("tick index {index} out of bounds for store of {len} ticks")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("output buffer holds {available} values, need {required}")]
    BufferTooSmall { required: usize, available: usize },

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Indicator calculation errors.
#[derive(Error, Debug)]
pub enum IndicatorError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

/// Backtest engine errors.
#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("backtest already ran; call reset() before running again")]
    AlreadyRun,

    #[error("indicator series covers {indicators} ticks but the store holds {ticks}")]
    LengthMismatch { ticks: usize, indicators: usize },

    #[error("strategy requires the {0} series, which has not been computed")]
    MissingIndicator(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("worker thread panicked: {0}")]
    WorkerPanicked(String),
}

/// Strategy errors.
#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Strategy not found: {0}")]
    NotFound(String),
}

/// Result type alias for engine operations.
pub type TradingResult<T> = Result<T, TradingError>;
