//! Backtest statistics.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use trading_core::{BacktestMetrics, Trade};

const NANOS_PER_DAY: f64 = 86_400.0 * 1e9;

/// Return and Sharpe ratio conventions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Annual risk-free rate subtracted from trade returns
    pub risk_free_rate: f64,
    /// Days per year used to convert timestamp spans (365.25 for
    /// calendar-time tick data)
    pub days_per_year: f64,
    /// Scale the per-trade Sharpe ratio by sqrt(trades per year)
    pub annualize_sharpe: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.0,
            days_per_year: 365.25,
            annualize_sharpe: false,
        }
    }
}

impl MetricsConfig {
    /// Length of `span_ns` nanoseconds in years.
    pub fn years(&self, span_ns: i64) -> f64 {
        if self.days_per_year <= 0.0 {
            return 0.0;
        }
        span_ns.max(0) as f64 / (self.days_per_year * NANOS_PER_DAY)
    }
}

/// Equity after each trade, starting with `initial_capital`.
///
/// `trades` must be ordered by exit.
pub fn equity_curve(trades: &[Trade], initial_capital: f64) -> Vec<f64> {
    let mut curve = Vec::with_capacity(trades.len() + 1);
    let mut equity = initial_capital;
    curve.push(equity);
    for trade in trades {
        equity += trade.pnl;
        curve.push(equity);
    }
    curve
}

/// Largest peak-to-trough decline as a fraction of the peak.
pub fn max_drawdown(curve: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut max_dd: f64 = 0.0;
    for &equity in curve {
        peak = peak.max(equity);
        if peak > 0.0 {
            max_dd = max_dd.max((peak - equity) / peak);
        }
    }
    max_dd
}

/// Sharpe ratio of per-trade returns.
///
/// Zero with fewer than two trades or no return variation.
pub fn sharpe_ratio(trades: &[Trade], span_ns: i64, config: &MetricsConfig) -> f64 {
    if trades.len() < 2 {
        return 0.0;
    }

    let returns: Vec<f64> = trades.iter().map(|t| t.pnl_pct).collect();
    let std_dev = returns.iter().std_dev();
    if !std_dev.is_finite() || std_dev == 0.0 {
        return 0.0;
    }

    let avg_holding_years =
        trades.iter().map(|t| config.years(t.holding_ns())).sum::<f64>() / trades.len() as f64;
    let excess = returns.iter().mean() - config.risk_free_rate * avg_holding_years;
    let sharpe = excess / std_dev;

    let years = config.years(span_ns);
    if config.annualize_sharpe && years > 0.0 {
        sharpe * (trades.len() as f64 / years).sqrt()
    } else {
        sharpe
    }
}

/// Derive the final metrics from the merged, exit-ordered trade list.
///
/// `span_ns` is the timestamp span of the whole tick series.
pub fn compute_metrics(
    trades: &[Trade],
    initial_capital: f64,
    span_ns: i64,
    config: &MetricsConfig,
) -> BacktestMetrics {
    let curve = equity_curve(trades, initial_capital);
    let final_equity = curve.last().copied().unwrap_or(initial_capital);
    let total_pnl = final_equity - initial_capital;

    let total_return = if initial_capital > 0.0 {
        final_equity / initial_capital - 1.0
    } else {
        0.0
    };

    let years = config.years(span_ns);
    let annualized_return = if years > 0.0 && 1.0 + total_return > 0.0 {
        (1.0 + total_return).powf(1.0 / years) - 1.0
    } else {
        0.0
    };

    let winning_trades = trades.iter().filter(|t| t.is_winner()).count();
    let win_rate = if trades.is_empty() {
        0.0
    } else {
        winning_trades as f64 / trades.len() as f64
    };

    BacktestMetrics {
        initial_capital,
        final_equity,
        total_pnl,
        total_return,
        annualized_return,
        sharpe_ratio: sharpe_ratio(trades, span_ns, config),
        max_drawdown: max_drawdown(&curve),
        win_rate,
        num_trades: trades.len(),
        winning_trades,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trading_core::Tick;

    const YEAR_NS: i64 = 31_557_600_000_000_000; // 365.25 days

    fn trade(entry_ts: i64, exit_ts: i64, entry: f64, exit: f64) -> Trade {
        Trade::close_long(
            0,
            &Tick::new(entry_ts, entry, 1.0),
            1,
            &Tick::new(exit_ts, exit, 1.0),
            10_000.0,
            0.0,
        )
    }

    #[test]
    fn test_years() {
        let config = MetricsConfig::default();
        assert!((config.years(YEAR_NS) - 1.0).abs() < 1e-12);
        assert_eq!(config.years(-5), 0.0);
    }

    #[test]
    fn test_empty_trades() {
        let metrics = compute_metrics(&[], 100_000.0, YEAR_NS, &MetricsConfig::default());

        assert_eq!(metrics.num_trades, 0);
        assert_eq!(metrics.final_equity, 100_000.0);
        assert_eq!(metrics.total_return, 0.0);
        assert_eq!(metrics.annualized_return, 0.0);
        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert_eq!(metrics.max_drawdown, 0.0);
        assert_eq!(metrics.win_rate, 0.0);
    }

    #[test]
    fn test_returns_and_win_rate() {
        // +1000, -500, +1500 on 10k notional
        let trades = vec![
            trade(0, 10, 100.0, 110.0),
            trade(20, 30, 100.0, 95.0),
            trade(40, 50, 100.0, 115.0),
        ];
        let metrics = compute_metrics(&trades, 100_000.0, 2 * YEAR_NS, &MetricsConfig::default());

        assert_eq!(metrics.num_trades, 3);
        assert_eq!(metrics.winning_trades, 2);
        assert_eq!(metrics.losing_trades(), 1);
        assert!((metrics.total_pnl - 2_000.0).abs() < 1e-6);
        assert!((metrics.total_return - 0.02).abs() < 1e-9);
        assert!((metrics.annualized_return - (1.02f64.sqrt() - 1.0)).abs() < 1e-9);
        assert!((metrics.win_rate - 2.0 / 3.0).abs() < 1e-12);
        // Peak 101_000, trough 100_500
        assert!((metrics.max_drawdown - 500.0 / 101_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_sharpe_ratio() {
        let trades = vec![
            trade(0, 1, 100.0, 110.0),
            trade(2, 3, 100.0, 95.0),
            trade(4, 5, 100.0, 115.0),
        ];
        // Returns 0.10, -0.05, 0.15: mean 0.0666.., sample std 0.104083..
        let mean = 0.2 / 3.0;
        let std = ((0.1f64 - mean).powi(2) + (-0.05 - mean).powi(2) + (0.15 - mean).powi(2)) / 2.0;
        let expected = mean / std.sqrt();

        let sharpe = sharpe_ratio(&trades, YEAR_NS, &MetricsConfig::default());
        assert!((sharpe - expected).abs() < 1e-9);

        let annualized = sharpe_ratio(
            &trades,
            YEAR_NS,
            &MetricsConfig {
                annualize_sharpe: true,
                ..MetricsConfig::default()
            },
        );
        assert!((annualized - expected * 3f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_sharpe_degenerate() {
        let config = MetricsConfig::default();
        assert_eq!(sharpe_ratio(&[trade(0, 1, 100.0, 110.0)], YEAR_NS, &config), 0.0);

        let flat = vec![trade(0, 1, 100.0, 110.0), trade(2, 3, 100.0, 110.0)];
        assert_eq!(sharpe_ratio(&flat, YEAR_NS, &config), 0.0);
    }

    #[test]
    fn test_risk_free_rate_lowers_sharpe() {
        let trades = vec![
            trade(0, YEAR_NS / 2, 100.0, 110.0),
            trade(YEAR_NS / 2, YEAR_NS, 100.0, 104.0),
        ];
        let base = sharpe_ratio(&trades, YEAR_NS, &MetricsConfig::default());
        let with_rf = sharpe_ratio(
            &trades,
            YEAR_NS,
            &MetricsConfig {
                risk_free_rate: 0.04,
                ..MetricsConfig::default()
            },
        );
        // Excess return per trade drops by 0.04 * 0.5 years
        let std = (0.06f64 * 0.06 / 2.0).sqrt();
        assert!((base - with_rf - 0.02 / std).abs() < 1e-9);
    }

    #[test]
    fn test_max_drawdown() {
        assert_eq!(max_drawdown(&[]), 0.0);
        assert_eq!(max_drawdown(&[100.0, 110.0, 120.0]), 0.0);
        assert!((max_drawdown(&[100.0, 120.0, 90.0, 130.0, 117.0]) - 0.25).abs() < 1e-12);
    }
}
