//! Momentum indicators.

use trading_core::simd::{BatchOps, DefaultBatch};
use trading_core::traits::Indicator;
use trading_core::{IndicatorError, MacdParams};

use crate::moving_average::ema_into;

/// Relative Strength Index (RSI) with Wilder's smoothing.
///
/// `rsi[i]` describes the moves up to tick `i`; indices below the period are
/// `NaN`.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
}

impl Rsi {
    /// Create a new RSI indicator.
    ///
    /// Common periods are 14 (default) or 9.
    pub fn new(period: usize) -> Self {
        Self { period }
    }

    /// RSI for `len` ticks from their split price changes.
    ///
    /// `gains[j]` and `losses[j]` describe the move from tick `j` to `j + 1`.
    pub fn from_changes(&self, gains: &[f64], losses: &[f64], len: usize) -> Vec<f64> {
        let mut out = vec![f64::NAN; len];
        let period = self.period;
        let changes = gains.len().min(losses.len()).min(len.saturating_sub(1));
        if period == 0 || changes < period {
            return out;
        }

        let period_f64 = period as f64;
        let batch = DefaultBatch::default();
        let mut avg_gain = batch.sum(&gains[..period]) / period_f64;
        let mut avg_loss = batch.sum(&losses[..period]) / period_f64;
        out[period] = Self::index(avg_gain, avg_loss);

        // Wilder's smoothing: avg = (prev_avg * (period-1) + value) / period
        for j in period..changes {
            avg_gain = (avg_gain * (period_f64 - 1.0) + gains[j]) / period_f64;
            avg_loss = (avg_loss * (period_f64 - 1.0) + losses[j]) / period_f64;
            out[j + 1] = Self::index(avg_gain, avg_loss);
        }

        out
    }

    #[inline]
    fn index(avg_gain: f64, avg_loss: f64) -> f64 {
        if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
        }
    }
}

impl Default for Rsi {
    fn default() -> Self {
        Self::new(14)
    }
}

impl Indicator for Rsi {
    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        let changes = data.len().saturating_sub(1);
        let mut gains = vec![0.0; changes];
        let mut losses = vec![0.0; changes];
        DefaultBatch::default().split_changes(data, &mut gains, &mut losses);
        self.from_changes(&gains, &losses, data.len())
    }

    fn warmup(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "RSI"
    }
}

/// MACD (Moving Average Convergence Divergence).
///
/// MACD line = fast EMA - slow EMA; signal line = EMA of the MACD line.
/// Both are full length and seeded from the first value.
#[derive(Debug, Clone, Copy)]
pub struct Macd {
    params: MacdParams,
}

impl Macd {
    /// Create a MACD with custom periods.
    pub fn with_periods(fast: usize, slow: usize, signal: usize) -> Result<Self, IndicatorError> {
        if fast == 0 || slow == 0 || signal == 0 {
            return Err(IndicatorError::InvalidParameter(
                "MACD periods must be greater than 0".to_string(),
            ));
        }
        if fast >= slow {
            return Err(IndicatorError::InvalidParameter(format!(
                "MACD fast period ({fast}) must be less than slow period ({slow})"
            )));
        }
        Ok(Self {
            params: MacdParams { fast, slow, signal },
        })
    }

    pub fn params(&self) -> MacdParams {
        self.params
    }

    /// MACD line from precomputed fast and slow EMAs.
    pub fn line_from<B: BatchOps>(batch: &B, fast: &[f64], slow: &[f64]) -> Vec<f64> {
        let mut line = vec![0.0; fast.len().min(slow.len())];
        batch.sub_into(fast, slow, &mut line);
        line
    }

    /// Signal line over a MACD line.
    pub fn signal_from(&self, line: &[f64]) -> Vec<f64> {
        let mut signal = vec![0.0; line.len()];
        ema_into(line, &mut signal, self.params.signal);
        signal
    }

    /// MACD and signal lines for `data`.
    pub fn lines(&self, data: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let mut fast = vec![0.0; data.len()];
        let mut slow = vec![0.0; data.len()];
        ema_into(data, &mut fast, self.params.fast);
        ema_into(data, &mut slow, self.params.slow);

        let line = Self::line_from(&DefaultBatch::default(), &fast, &slow);
        let signal = self.signal_from(&line);
        (line, signal)
    }
}

impl Default for Macd {
    fn default() -> Self {
        Self {
            params: MacdParams::default(),
        }
    }
}

impl Indicator for Macd {
    /// MACD line only; use [`Macd::lines`] for the signal line as well.
    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        self.lines(data).0
    }

    fn warmup(&self) -> usize {
        self.params.slow + self.params.signal
    }

    fn name(&self) -> &str {
        "MACD"
    }
}
