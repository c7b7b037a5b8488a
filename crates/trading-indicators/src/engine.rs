//! Indicator engine: owns the worker pool and the computed series.

use std::ops::Range;
use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use trading_core::simd::{BatchOps, DefaultBatch};
use trading_core::{IndicatorError, IndicatorSeries};
use trading_data::TickStore;

use crate::momentum::{Macd, Rsi};
use crate::moving_average::ema_into;
use crate::pool::{chunk_ranges, WorkerPool};

/// Indicator engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    /// Worker threads; 0 uses the available hardware parallelism.
    pub pool_threads: usize,
    /// Inputs with at least this many ticks use the worker pool.
    pub parallel_threshold: usize,
    /// Elements per pool task.
    pub chunk_len: usize,
    pub ema_period: usize,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            pool_threads: 0,
            parallel_threshold: 65_536,
            chunk_len: 16_384,
            ema_period: 50,
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
        }
    }
}

impl IndicatorConfig {
    /// Validate the configured periods.
    pub fn validate(&self) -> Result<(), IndicatorError> {
        if self.ema_period == 0 {
            return Err(IndicatorError::InvalidParameter(
                "ema_period must be greater than 0".to_string(),
            ));
        }
        if self.rsi_period == 0 {
            return Err(IndicatorError::InvalidParameter(
                "rsi_period must be greater than 0".to_string(),
            ));
        }
        self.macd().map(|_| ())
    }

    /// MACD built from the configured periods.
    pub fn macd(&self) -> Result<Macd, IndicatorError> {
        Macd::with_periods(self.macd_fast, self.macd_slow, self.macd_signal)
    }

    fn resolved_threads(&self) -> usize {
        if self.pool_threads > 0 {
            self.pool_threads
        } else {
            thread::available_parallelism().map_or(1, |n| n.get())
        }
    }
}

/// Computes EMA, RSI and MACD over a tick store.
///
/// Results are kept in an [`IndicatorSeries`] that each call overwrites for
/// the indicator it computes. The series can only be borrowed once the
/// mutating call has returned, so readers always see a finished computation.
pub struct IndicatorEngine {
    config: IndicatorConfig,
    pool: WorkerPool,
    series: IndicatorSeries,
}

impl IndicatorEngine {
    pub fn new(config: &IndicatorConfig) -> Result<Self, IndicatorError> {
        config.validate()?;
        let pool = WorkerPool::new(config.resolved_threads())?;
        Ok(Self {
            config: config.clone(),
            pool,
            series: IndicatorSeries::new(),
        })
    }

    /// Engine with default periods and `threads` pool workers.
    pub fn with_threads(threads: usize) -> Result<Self, IndicatorError> {
        Self::new(&IndicatorConfig {
            pool_threads: threads.max(1),
            ..IndicatorConfig::default()
        })
    }

    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }

    pub fn pool_size(&self) -> usize {
        self.pool.size()
    }

    fn is_parallel(&self, len: usize) -> bool {
        self.pool.size() > 1 && len >= self.config.parallel_threshold
    }

    /// Compute the EMA series.
    ///
    /// The recurrence is inherently sequential, so this never uses the pool.
    pub fn calculate_ema(&mut self, store: &TickStore, period: usize) -> Result<&[f64], IndicatorError> {
        if period == 0 {
            return Err(IndicatorError::InvalidParameter(
                "EMA period must be greater than 0".to_string(),
            ));
        }

        let mut values = vec![0.0; store.len()];
        store
            .ema(&mut values, period)
            .map_err(|e| IndicatorError::InvalidParameter(e.to_string()))?;

        debug!(ticks = store.len(), period, "computed EMA");
        self.series.set_ema(values, period);
        Ok(self.series.ema())
    }

    /// Compute the RSI series with Wilder's smoothing.
    ///
    /// Large inputs split the price changes into chunks on the pool; the
    /// smoothing pass is sequential.
    pub fn calculate_rsi(&mut self, store: &TickStore, period: usize) -> Result<&[f64], IndicatorError> {
        if period == 0 {
            return Err(IndicatorError::InvalidParameter(
                "RSI period must be greater than 0".to_string(),
            ));
        }

        let n = store.len();
        let (gains, losses) = if self.is_parallel(n) {
            let prices: Arc<[f64]> = store.prices().into();
            let ranges = chunk_ranges(n.saturating_sub(1), self.config.chunk_len);
            let parts = self.pool.map_ranges(
                ranges,
                Arc::new(move |r: Range<usize>| {
                    let mut gains = vec![0.0; r.len()];
                    let mut losses = vec![0.0; r.len()];
                    DefaultBatch::default().split_changes(&prices[r.start..=r.end], &mut gains, &mut losses);
                    (gains, losses)
                }),
            )?;

            let mut gains = Vec::with_capacity(n.saturating_sub(1));
            let mut losses = Vec::with_capacity(n.saturating_sub(1));
            for (g, l) in parts {
                gains.extend_from_slice(&g);
                losses.extend_from_slice(&l);
            }
            (gains, losses)
        } else {
            let prices = store.prices();
            let mut gains = vec![0.0; n.saturating_sub(1)];
            let mut losses = vec![0.0; n.saturating_sub(1)];
            DefaultBatch::default().split_changes(&prices, &mut gains, &mut losses);
            (gains, losses)
        };

        let values = Rsi::new(period).from_changes(&gains, &losses, n);
        debug!(ticks = n, period, parallel = self.is_parallel(n), "computed RSI");
        self.series.set_rsi(values, period);
        Ok(self.series.rsi())
    }

    /// Compute the MACD line and its signal line.
    ///
    /// Large inputs run the fast and slow EMAs as two concurrent pool tasks
    /// and take their difference chunk by chunk.
    pub fn calculate_macd(
        &mut self,
        store: &TickStore,
        fast: usize,
        slow: usize,
        signal: usize,
    ) -> Result<(&[f64], &[f64]), IndicatorError> {
        let macd = Macd::with_periods(fast, slow, signal)?;
        let n = store.len();

        let (line, signal_line) = if self.is_parallel(n) {
            let prices: Arc<[f64]> = store.prices().into();
            let ema_task = |period: usize| {
                let prices = Arc::clone(&prices);
                self.pool.submit(move || {
                    let mut out = vec![0.0; prices.len()];
                    ema_into(&prices, &mut out, period);
                    Arc::<[f64]>::from(out)
                })
            };
            let fast_task = ema_task(fast);
            let slow_task = ema_task(slow);
            let fast_ema = fast_task.wait()?;
            let slow_ema = slow_task.wait()?;

            let parts = self.pool.map_ranges(
                chunk_ranges(n, self.config.chunk_len),
                Arc::new(move |r: Range<usize>| {
                    Macd::line_from(&DefaultBatch::default(), &fast_ema[r.clone()], &slow_ema[r])
                }),
            )?;
            let line: Vec<f64> = parts.concat();
            let signal_line = macd.signal_from(&line);
            (line, signal_line)
        } else {
            macd.lines(&store.prices())
        };

        debug!(ticks = n, fast, slow, signal, parallel = self.is_parallel(n), "computed MACD");
        self.series.set_macd(line, signal_line, macd.params());
        Ok((self.series.macd_line(), self.series.signal_line()))
    }

    /// Compute every indicator with the configured periods.
    pub fn calculate_all(&mut self, store: &TickStore) -> Result<&IndicatorSeries, IndicatorError> {
        let IndicatorConfig {
            ema_period,
            rsi_period,
            macd_fast,
            macd_slow,
            macd_signal,
            ..
        } = self.config;

        self.calculate_ema(store, ema_period)?;
        self.calculate_rsi(store, rsi_period)?;
        self.calculate_macd(store, macd_fast, macd_slow, macd_signal)?;

        info!(
            symbol = store.symbol(),
            ticks = store.len(),
            warmup = self.series.warmup(),
            "indicators ready"
        );
        Ok(&self.series)
    }

    /// Most recent EMA; empty before the first computation.
    pub fn ema(&self) -> &[f64] {
        self.series.ema()
    }

    /// Most recent RSI; empty before the first computation.
    pub fn rsi(&self) -> &[f64] {
        self.series.rsi()
    }

    pub fn macd_line(&self) -> &[f64] {
        self.series.macd_line()
    }

    pub fn signal_line(&self) -> &[f64] {
        self.series.signal_line()
    }

    pub fn series(&self) -> &IndicatorSeries {
        &self.series
    }

    /// Owned copy of the current series.
    pub fn snapshot(&self) -> IndicatorSeries {
        self.series.clone()
    }

    /// Consume the engine, joining the pool, and keep the series.
    pub fn into_series(self) -> IndicatorSeries {
        self.series
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trading_core::{IndicatorKind, Tick};

    fn store(len: usize) -> TickStore {
        let ticks: Vec<Tick> = (0..len)
            .map(|i| {
                let x = i as f64;
                Tick::new(i as i64 * 1_000, 100.0 + (x * 0.05).sin() * 4.0 + (x * 0.011).cos(), 10.0)
            })
            .collect();
        TickStore::from_ticks("TEST", &ticks)
    }

    fn parallel_engine() -> IndicatorEngine {
        IndicatorEngine::new(&IndicatorConfig {
            pool_threads: 4,
            parallel_threshold: 100,
            chunk_len: 37,
            ..IndicatorConfig::default()
        })
        .unwrap()
    }

    fn sequential_engine() -> IndicatorEngine {
        IndicatorEngine::new(&IndicatorConfig {
            pool_threads: 1,
            ..IndicatorConfig::default()
        })
        .unwrap()
    }

    fn assert_series_eq(a: &[f64], b: &[f64]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            if x.is_nan() {
                assert!(y.is_nan());
            } else {
                assert!((x - y).abs() < 1e-9, "{x} != {y}");
            }
        }
    }

    #[test]
    fn test_ema_matches_store_ema() {
        let store = store(500);
        let mut engine = sequential_engine();

        let mut expected = vec![0.0; store.len()];
        store.ema(&mut expected, 20).unwrap();

        assert_eq!(engine.calculate_ema(&store, 20).unwrap(), expected.as_slice());
        assert_eq!(engine.ema()[0], store.at(0).unwrap().price);
    }

    #[test]
    fn test_parallel_rsi_matches_sequential() {
        let store = store(1_000);
        let mut parallel = parallel_engine();
        let mut sequential = sequential_engine();

        let a = parallel.calculate_rsi(&store, 14).unwrap().to_vec();
        let b = sequential.calculate_rsi(&store, 14).unwrap().to_vec();

        assert_series_eq(&a, &b);
        assert!(a[..14].iter().all(|v| v.is_nan()));
        assert!(a[14..].iter().all(|v| (0.0..=100.0).contains(v)));
    }

    #[test]
    fn test_parallel_macd_matches_sequential() {
        let store = store(1_000);
        let mut parallel = parallel_engine();
        let mut sequential = sequential_engine();

        let (line_a, signal_a) = parallel.calculate_macd(&store, 12, 26, 9).unwrap();
        let (line_a, signal_a) = (line_a.to_vec(), signal_a.to_vec());
        let (line_b, signal_b) = sequential.calculate_macd(&store, 12, 26, 9).unwrap();

        assert_series_eq(&line_a, line_b);
        assert_series_eq(&signal_a, signal_b);
    }

    #[test]
    fn test_calculate_all_fills_series() {
        let store = store(300);
        let mut engine = parallel_engine();

        let series = engine.calculate_all(&store).unwrap();

        assert!(series.covers(300));
        assert!(series.has(IndicatorKind::Ema));
        assert!(series.has(IndicatorKind::Rsi));
        assert!(series.has(IndicatorKind::Macd));
        assert_eq!(series.warmup(), 50);

        let snapshot = engine.snapshot();
        let owned = engine.into_series();
        assert_eq!(snapshot.ema(), owned.ema());
        assert_eq!(snapshot.macd_line(), owned.macd_line());
        assert_eq!(snapshot.rsi().len(), owned.rsi().len());
    }

    #[test]
    fn test_recompute_overwrites() {
        let mut engine = sequential_engine();
        engine.calculate_ema(&store(100), 5).unwrap();
        engine.calculate_ema(&store(40), 5).unwrap();

        assert_eq!(engine.ema().len(), 40);
        assert_eq!(engine.series().ema_period(), 5);
    }

    #[test]
    fn test_accessors_empty_before_computation() {
        let engine = sequential_engine();
        assert!(engine.ema().is_empty());
        assert!(engine.rsi().is_empty());
        assert!(engine.macd_line().is_empty());
        assert!(engine.signal_line().is_empty());
    }

    #[test]
    fn test_invalid_parameters() {
        let store = store(50);
        let mut engine = sequential_engine();

        assert!(engine.calculate_ema(&store, 0).is_err());
        assert!(engine.calculate_rsi(&store, 0).is_err());
        assert!(engine.calculate_macd(&store, 26, 12, 9).is_err());
        assert!(IndicatorEngine::new(&IndicatorConfig {
            macd_fast: 30,
            ..IndicatorConfig::default()
        })
        .is_err());
    }

    #[test]
    fn test_empty_store() {
        let store = TickStore::with_capacity("EMPTY", 0);
        let mut engine = parallel_engine();

        let series = engine.calculate_all(&store).unwrap();
        assert!(series.is_empty());
    }
}
