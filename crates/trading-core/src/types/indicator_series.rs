//! Precomputed indicator series aligned with a tick store.

use serde::{Deserialize, Serialize};

/// Indicators the engine can precompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndicatorKind {
    Ema,
    Rsi,
    Macd,
}

impl IndicatorKind {
    pub fn name(&self) -> &'static str {
        match self {
            IndicatorKind::Ema => "EMA",
            IndicatorKind::Rsi => "RSI",
            IndicatorKind::Macd => "MACD",
        }
    }
}

/// MACD periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }
}

/// Parallel indicator arrays; index `i` corresponds to tick `i`.
///
/// Values inside an indicator's warm-up window are not meaningful (RSI holds
/// `NaN` there). A series is empty until it has been computed. Writers replace
/// a series wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSeries {
    ema: Vec<f64>,
    ema_period: usize,
    rsi: Vec<f64>,
    rsi_period: usize,
    macd_line: Vec<f64>,
    signal_line: Vec<f64>,
    macd_params: Option<MacdParams>,
}

impl IndicatorSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ema(&mut self, values: Vec<f64>, period: usize) {
        self.ema = values;
        self.ema_period = period;
    }

    pub fn set_rsi(&mut self, values: Vec<f64>, period: usize) {
        self.rsi = values;
        self.rsi_period = period;
    }

    pub fn set_macd(&mut self, line: Vec<f64>, signal: Vec<f64>, params: MacdParams) {
        self.macd_line = line;
        self.signal_line = signal;
        self.macd_params = Some(params);
    }

    pub fn ema(&self) -> &[f64] {
        &self.ema
    }

    pub fn rsi(&self) -> &[f64] {
        &self.rsi
    }

    pub fn macd_line(&self) -> &[f64] {
        &self.macd_line
    }

    pub fn signal_line(&self) -> &[f64] {
        &self.signal_line
    }

    pub fn ema_period(&self) -> usize {
        self.ema_period
    }

    pub fn rsi_period(&self) -> usize {
        self.rsi_period
    }

    pub fn macd_params(&self) -> Option<MacdParams> {
        self.macd_params
    }

    /// Whether `kind` has been computed.
    pub fn has(&self, kind: IndicatorKind) -> bool {
        match kind {
            IndicatorKind::Ema => !self.ema.is_empty(),
            IndicatorKind::Rsi => !self.rsi.is_empty(),
            IndicatorKind::Macd => !self.macd_line.is_empty(),
        }
    }

    /// Length of the computed series, or 0 if nothing has been computed.
    pub fn len(&self) -> usize {
        self.ema
            .len()
            .max(self.rsi.len())
            .max(self.macd_line.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether every computed series covers exactly `len` ticks.
    pub fn covers(&self, len: usize) -> bool {
        [&self.ema, &self.rsi, &self.macd_line, &self.signal_line]
            .iter()
            .all(|series| series.is_empty() || series.len() == len)
    }

    /// Largest warm-up window among the computed indicators.
    pub fn warmup(&self) -> usize {
        let ema = if self.ema.is_empty() { 0 } else { self.ema_period };
        let rsi = if self.rsi.is_empty() { 0 } else { self.rsi_period };
        let macd = self.macd_params.map_or(0, |p| p.slow + p.signal);
        ema.max(rsi).max(macd)
    }
}
