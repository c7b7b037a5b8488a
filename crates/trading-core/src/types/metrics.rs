//! Backtest result metrics.

use serde::{Deserialize, Serialize};

/// Performance summary of a completed backtest.
///
/// Ratios are fractions (`0.05` is 5%). Built once after every worker has
/// joined; a partially filled value is never exposed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BacktestMetrics {
    pub initial_capital: f64,
    pub final_equity: f64,
    /// Sum of net trade profits
    pub total_pnl: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    /// Largest peak-to-trough decline as a fraction of the peak
    pub max_drawdown: f64,
    /// Fraction of trades with positive pnl
    pub win_rate: f64,
    pub num_trades: usize,
    pub winning_trades: usize,
}

impl BacktestMetrics {
    pub fn losing_trades(&self) -> usize {
        self.num_trades - self.winning_trades
    }
}
