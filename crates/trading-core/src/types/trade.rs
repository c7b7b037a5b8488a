//! Closed trade records.

use serde::{Deserialize, Serialize};

use super::Tick;

/// A position that has been opened and closed.
///
/// Created once the exit rule fires; never modified afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Tick index of the entry
    pub entry_index: usize,
    /// Tick index of the exit
    pub exit_index: usize,
    /// Entry timestamp (ns)
    pub entry_time: i64,
    /// Exit timestamp (ns)
    pub exit_time: i64,
    pub entry_price: f64,
    pub exit_price: f64,
    /// Units held
    pub position_size: f64,
    /// Net profit after commission
    pub pnl: f64,
    /// Net profit relative to the committed notional
    pub pnl_pct: f64,
    pub is_long: bool,
}

impl Trade {
    /// Close a long position that committed `notional` at `entry`.
    ///
    /// `commission` is charged on both the entry and the exit.
    pub fn close_long(
        entry_index: usize,
        entry: &Tick,
        exit_index: usize,
        exit: &Tick,
        notional: f64,
        commission: f64,
    ) -> Self {
        let position_size = if entry.price > 0.0 {
            notional / entry.price
        } else {
            0.0
        };
        let pnl = (exit.price - entry.price) * position_size - 2.0 * commission;
        let pnl_pct = if notional > 0.0 { pnl / notional } else { 0.0 };

        Self {
            entry_index,
            exit_index,
            entry_time: entry.timestamp,
            exit_time: exit.timestamp,
            entry_price: entry.price,
            exit_price: exit.price,
            position_size,
            pnl,
            pnl_pct,
            is_long: true,
        }
    }

    #[inline]
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    /// Holding time in nanoseconds.
    pub fn holding_ns(&self) -> i64 {
        self.exit_time - self.entry_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_long_profit() {
        let entry = Tick::new(0, 100.0, 1.0);
        let exit = Tick::new(60, 110.0, 1.0);
        let trade = Trade::close_long(3, &entry, 7, &exit, 1_000.0, 0.0);

        assert!((trade.position_size - 10.0).abs() < 1e-12);
        assert!((trade.pnl - 100.0).abs() < 1e-9);
        assert!((trade.pnl_pct - 0.1).abs() < 1e-12);
        assert!(trade.is_winner());
        assert!(trade.is_long);
        assert_eq!(trade.holding_ns(), 60);
    }

    #[test]
    fn test_commission_can_turn_flat_trade_into_loss() {
        let tick = Tick::new(0, 50.0, 1.0);
        let trade = Trade::close_long(0, &tick, 1, &tick, 500.0, 1.5);

        assert!((trade.pnl + 3.0).abs() < 1e-12);
        assert!(!trade.is_winner());
    }
}
