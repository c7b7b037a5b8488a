//! Per-worker trade accumulation and the shared atomic totals.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use trading_core::{CachePadded, Trade};

/// Trades and running equity of one worker.
///
/// Owned by a single thread while the backtest runs; merged into
/// [`GlobalMetrics`] after the join.
#[derive(Debug, Clone)]
pub struct ThreadLocalAccumulator {
    trades: Vec<Trade>,
    equity: f64,
    peak: f64,
    max_drawdown: f64,
}

impl ThreadLocalAccumulator {
    /// Empty accumulator whose equity curve starts at `initial_equity`.
    pub fn new(initial_equity: f64) -> Self {
        Self {
            trades: Vec::new(),
            equity: initial_equity,
            peak: initial_equity,
            max_drawdown: 0.0,
        }
    }

    /// Accumulator holding `trades` in order.
    pub fn from_trades(initial_equity: f64, trades: impl IntoIterator<Item = Trade>) -> Self {
        let mut acc = Self::new(initial_equity);
        for trade in trades {
            acc.record(trade);
        }
        acc
    }

    /// Append a closed trade and update equity and drawdown.
    #[inline]
    pub fn record(&mut self, trade: Trade) {
        self.equity += trade.pnl;
        if self.equity > self.peak {
            self.peak = self.equity;
        } else if self.peak > 0.0 {
            let drawdown = (self.peak - self.equity) / self.peak;
            if drawdown > self.max_drawdown {
                self.max_drawdown = drawdown;
            }
        }
        self.trades.push(trade);
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn into_trades(self) -> Vec<Trade> {
        self.trades
    }

    pub fn equity(&self) -> f64 {
        self.equity
    }

    /// Largest decline of this worker's equity curve as a fraction of its peak.
    pub fn max_drawdown(&self) -> f64 {
        self.max_drawdown
    }

    pub fn total_pnl(&self) -> f64 {
        self.trades.iter().map(|t| t.pnl).sum()
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }
}

/// Totals shared by all workers, updated without locks.
///
/// Each counter sits on its own cache line. Float totals are stored as bit
/// patterns and updated with compare-and-swap loops.
#[derive(Debug, Default)]
pub struct GlobalMetrics {
    total_trades: CachePadded<AtomicU64>,
    total_pnl: CachePadded<AtomicU64>,
    max_drawdown: CachePadded<AtomicU64>,
}

/// Point-in-time copy of [`GlobalMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct GlobalSnapshot {
    pub total_trades: u64,
    pub total_pnl: f64,
    /// Largest drawdown seen by any single worker
    pub max_drawdown: f64,
}

impl GlobalMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one worker's accumulator into the totals.
    pub fn merge(&self, acc: &ThreadLocalAccumulator) {
        self.total_trades
            .fetch_add(acc.len() as u64, Ordering::Relaxed);
        self.add_pnl(acc.total_pnl());
        self.observe_drawdown(acc.max_drawdown());
    }

    fn add_pnl(&self, pnl: f64) {
        let _ = self
            .total_pnl
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                Some((f64::from_bits(bits) + pnl).to_bits())
            });
    }

    fn observe_drawdown(&self, drawdown: f64) {
        let _ = self
            .max_drawdown
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                (drawdown > f64::from_bits(bits)).then_some(drawdown.to_bits())
            });
    }

    pub fn snapshot(&self) -> GlobalSnapshot {
        GlobalSnapshot {
            total_trades: self.total_trades.load(Ordering::Acquire),
            total_pnl: f64::from_bits(self.total_pnl.load(Ordering::Acquire)),
            max_drawdown: f64::from_bits(self.max_drawdown.load(Ordering::Acquire)),
        }
    }

    pub fn reset(&self) {
        self.total_trades.store(0, Ordering::Release);
        self.total_pnl.store(0.0f64.to_bits(), Ordering::Release);
        self.max_drawdown.store(0.0f64.to_bits(), Ordering::Release);
    }
}
