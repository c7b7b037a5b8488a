//! Exponential moving average.

use trading_core::traits::Indicator;

/// Write the EMA of `data` into `out`, seeded with `data[0]`.
///
/// Writes `min(data.len(), out.len())` values; does nothing for a zero
/// period. Unrolled four ways, but every value still depends on the previous
/// one.
pub fn ema_into(data: &[f64], out: &mut [f64], period: usize) {
    let n = data.len().min(out.len());
    if n == 0 || period == 0 {
        return;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let keep = 1.0 - k;

    out[0] = data[0];
    let mut i = 1;
    while i + 3 < n {
        out[i] = data[i] * k + out[i - 1] * keep;
        out[i + 1] = data[i + 1] * k + out[i] * keep;
        out[i + 2] = data[i + 2] * k + out[i + 1] * keep;
        out[i + 3] = data[i + 3] * k + out[i + 2] * keep;
        i += 4;
    }
    while i < n {
        out[i] = data[i] * k + out[i - 1] * keep;
        i += 1;
    }
}

/// Exponential Moving Average (EMA).
///
/// Full-length output seeded with the first value; the first `period` values
/// are still dominated by the seed.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
}

impl Ema {
    /// Create a new EMA with the specified period.
    pub fn new(period: usize) -> Self {
        Self { period }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Smoothing factor `2 / (period + 1)`.
    pub fn multiplier(&self) -> f64 {
        2.0 / (self.period as f64 + 1.0)
    }
}

impl Indicator for Ema {
    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        if self.period == 0 {
            return vec![];
        }
        let mut out = vec![0.0; data.len()];
        ema_into(data, &mut out, self.period);
        out
    }

    fn warmup(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "EMA"
    }
}
