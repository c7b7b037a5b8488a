//! Backtest report generation.

use std::io;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use trading_core::{BacktestMetrics, DataError, Trade};

use crate::accumulator::GlobalSnapshot;
use crate::{BacktestConfig, ParallelBacktestEngine};

/// Complete backtest report.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    pub symbol: String,
    pub strategy: String,
    /// Configuration used
    pub config: BacktestConfig,
    /// Workers the engine was sized for
    pub workers: usize,
    pub metrics: BacktestMetrics,
    /// Totals folded from the per-worker accumulators
    pub global: GlobalSnapshot,
    /// All trades, ordered by entry
    pub trades: Vec<Trade>,
}

/// One CSV row per trade.
#[derive(Debug, Serialize)]
struct TradeRow {
    entry_index: usize,
    exit_index: usize,
    entry_time: String,
    exit_time: String,
    entry_price: f64,
    exit_price: f64,
    position_size: f64,
    pnl: f64,
    pnl_pct: f64,
    side: &'static str,
}

fn format_time(nanos: i64) -> String {
    DateTime::<Utc>::from_timestamp(nanos.div_euclid(1_000_000_000), nanos.rem_euclid(1_000_000_000) as u32)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Nanos, true))
        .unwrap_or_else(|| nanos.to_string())
}

impl From<&Trade> for TradeRow {
    fn from(trade: &Trade) -> Self {
        Self {
            entry_index: trade.entry_index,
            exit_index: trade.exit_index,
            entry_time: format_time(trade.entry_time),
            exit_time: format_time(trade.exit_time),
            entry_price: trade.entry_price,
            exit_price: trade.exit_price,
            position_size: trade.position_size,
            pnl: trade.pnl,
            pnl_pct: trade.pnl_pct,
            side: if trade.is_long { "long" } else { "short" },
        }
    }
}

impl BacktestReport {
    /// Report of the engine's last run; `None` if it has not run.
    pub fn from_engine(symbol: &str, strategy: &str, engine: &ParallelBacktestEngine) -> Option<Self> {
        Some(Self {
            symbol: symbol.to_string(),
            strategy: strategy.to_string(),
            config: engine.config().clone(),
            workers: engine.workers(),
            metrics: *engine.metrics()?,
            global: engine.global(),
            trades: engine.trades().to_vec(),
        })
    }

    /// Generate a text summary.
    pub fn summary(&self) -> String {
        let m = &self.metrics;
        let mut s = String::new();

        s.push_str("═══════════════════════════════════════════════════════════\n");
        s.push_str("                     BACKTEST REPORT                        \n");
        s.push_str("═══════════════════════════════════════════════════════════\n\n");

        s.push_str(&format!("  Symbol:              {}\n", self.symbol));
        s.push_str(&format!("  Strategy:            {}\n", self.strategy));
        s.push_str(&format!(
            "  Workers:             {} ({} sink)\n",
            self.workers, self.config.trade_sink
        ));
        s.push('\n');

        s.push_str("PERFORMANCE\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Initial Capital:     ${:.2}\n", m.initial_capital));
        s.push_str(&format!("  Final Equity:        ${:.2}\n", m.final_equity));
        s.push_str(&format!("  Total P&L:           ${:.2}\n", m.total_pnl));
        s.push_str(&format!("  Total Return:        {:.2}%\n", m.total_return * 100.0));
        s.push_str(&format!(
            "  Annualized Return:   {:.2}%\n",
            m.annualized_return * 100.0
        ));
        s.push_str(&format!("  Max Drawdown:        {:.2}%\n", m.max_drawdown * 100.0));
        s.push('\n');

        s.push_str("RISK METRICS\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Sharpe Ratio:        {:.2}\n", m.sharpe_ratio));
        s.push_str(&format!(
            "  Risk-free Rate:      {:.2}%\n",
            self.config.metrics.risk_free_rate * 100.0
        ));
        s.push('\n');

        s.push_str("TRADE STATISTICS\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Total Trades:        {}\n", m.num_trades));
        s.push_str(&format!("  Winning Trades:      {}\n", m.winning_trades));
        s.push_str(&format!("  Losing Trades:       {}\n", m.losing_trades()));
        s.push_str(&format!("  Win Rate:            {:.2}%\n", m.win_rate * 100.0));
        s.push('\n');

        s.push_str("═══════════════════════════════════════════════════════════\n");

        s
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the trades as CSV, one row per trade with a header.
    pub fn write_trades_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut csv = csv::Writer::from_writer(writer);
        for trade in &self.trades {
            csv.serialize(TradeRow::from(trade))?;
        }
        csv.flush()?;
        Ok(())
    }

    /// Write the trades as CSV to `path`, replacing any existing file.
    pub fn save_trades_csv(&self, path: impl AsRef<Path>) -> Result<(), DataError> {
        let path = path.as_ref();
        let write_error = |source: io::Error| DataError::Write {
            path: path.to_path_buf(),
            source,
        };

        let file = std::fs::File::create(path).map_err(write_error)?;
        self.write_trades_csv(io::BufWriter::new(file))
            .map_err(|e| write_error(io::Error::new(io::ErrorKind::Other, e)))
    }
}
