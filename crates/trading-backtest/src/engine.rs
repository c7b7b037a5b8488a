//! Parallel backtesting engine.
//!
//! The evaluable index range `[warmup, len)` is split into one contiguous
//! chunk per worker. A worker owns every entry inside its chunk; a position it
//! opens may run past the chunk end, and the worker keeps going until that
//! position closes. Workers start flat, which is not always what a single
//! sequential pass would see at that index, so after the join the chunk
//! results are stitched in index order: wherever the sequential position
//! disagrees with a worker's, the ticks are replayed on the calling thread
//! until both are flat at the same index. The final trade list therefore does
//! not depend on the worker count.
//!
//! Worker-side accumulators only buffer trades. Once the trade list is final,
//! each worker's accumulator is rebuilt from the trades whose entry lies in
//! its chunk, and those are folded into [`GlobalMetrics`].

use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use trading_core::{
    BacktestError, BacktestMetrics, IndicatorSeries, MarketView, Strategy, Tick, Trade,
};
use trading_data::TickStore;

use crate::accumulator::{GlobalMetrics, GlobalSnapshot, ThreadLocalAccumulator};
use crate::ring_buffer::{self, Consumer, Producer};
use crate::statistics::{compute_metrics, MetricsConfig};

/// Where workers deliver closed trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSink {
    /// Append to the worker's own accumulator; merged after the join.
    #[default]
    Local,
    /// Publish through a per-worker SPSC ring drained by an aggregator thread.
    Queue,
}

impl fmt::Display for TradeSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSink::Local => write!(f, "local"),
            TradeSink::Queue => write!(f, "queue"),
        }
    }
}

impl FromStr for TradeSink {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(TradeSink::Local),
            "queue" => Ok(TradeSink::Queue),
            other => Err(BacktestError::InvalidConfig(format!(
                "unknown trade sink '{other}' (expected 'local' or 'queue')"
            ))),
        }
    }
}

/// Backtest configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Worker threads; 0 uses the available hardware parallelism
    pub workers: usize,
    /// Initial capital
    pub initial_capital: f64,
    /// Notional committed to each position
    pub trade_notional: f64,
    /// Commission per fill
    pub commission: f64,
    pub trade_sink: TradeSink,
    /// Ring slots per worker for the queue sink
    pub queue_capacity: usize,
    /// Close a position still open at the end of data at the last tick
    pub close_open_positions: bool,
    /// Ticks between checks of the stop flag
    pub stop_poll_interval: usize,
    pub metrics: MetricsConfig,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            initial_capital: 100_000.0,
            trade_notional: 10_000.0,
            commission: 0.0,
            trade_sink: TradeSink::Local,
            queue_capacity: 1024,
            close_open_positions: true,
            stop_poll_interval: 256,
            metrics: MetricsConfig::default(),
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), BacktestError> {
        if !(self.initial_capital > 0.0) {
            return Err(BacktestError::InvalidConfig(
                "initial_capital must be positive".to_string(),
            ));
        }
        if !(self.trade_notional > 0.0) {
            return Err(BacktestError::InvalidConfig(
                "trade_notional must be positive".to_string(),
            ));
        }
        if !(self.commission >= 0.0) {
            return Err(BacktestError::InvalidConfig(
                "commission must not be negative".to_string(),
            ));
        }
        if self.queue_capacity < 2 {
            return Err(BacktestError::InvalidConfig(
                "queue_capacity must be at least 2".to_string(),
            ));
        }
        if self.stop_poll_interval == 0 {
            return Err(BacktestError::InvalidConfig(
                "stop_poll_interval must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    fn resolved_workers(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            thread::available_parallelism().map_or(1, |n| n.get())
        }
    }
}

/// Cloneable handle that asks a running backtest to stop.
///
/// Workers poll the flag every `stop_poll_interval` ticks; cancellation is
/// cooperative.
#[derive(Debug, Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Single-position long simulator over one index walk.
struct Simulator<'a> {
    strategy: &'a dyn Strategy,
    view: MarketView<'a>,
    notional: f64,
    commission: f64,
    open: Option<usize>,
}

impl<'a> Simulator<'a> {
    fn new(strategy: &'a dyn Strategy, view: MarketView<'a>, config: &BacktestConfig) -> Self {
        Self {
            strategy,
            view,
            notional: config.trade_notional,
            commission: config.commission,
            open: None,
        }
    }

    #[inline]
    fn is_flat(&self) -> bool {
        self.open.is_none()
    }

    /// Evaluate tick `i`. Exits are checked from the tick after the entry, and
    /// a tick that closes a position never opens a new one.
    #[inline]
    fn step(&mut self, i: usize) -> Option<Trade> {
        match self.open {
            Some(entry) => {
                if self.strategy.should_exit_long(i, &self.view) {
                    self.open = None;
                    Some(self.close(entry, i))
                } else {
                    None
                }
            }
            None => {
                if self.strategy.should_enter_long(i, &self.view) {
                    self.open = Some(i);
                }
                None
            }
        }
    }

    fn close(&self, entry: usize, exit: usize) -> Trade {
        let ticks: &[Tick] = self.view.ticks();
        Trade::close_long(
            entry,
            &ticks[entry],
            exit,
            &ticks[exit],
            self.notional,
            self.commission,
        )
    }
}

/// Delivery path of one worker.
enum WorkerSink {
    Local,
    Queue {
        producer: Producer<Trade>,
        spilled: bool,
    },
}

impl WorkerSink {
    #[inline]
    fn publish(&mut self, worker: usize, trade: Trade, acc: &mut ThreadLocalAccumulator) {
        match self {
            WorkerSink::Local => acc.record(trade),
            WorkerSink::Queue { producer, spilled } => {
                // Once a trade has spilled, later ones follow it so the
                // worker's order survives the merge.
                if *spilled {
                    acc.record(trade);
                } else if let Err(trade) = producer.try_enqueue(trade) {
                    warn!(worker, "trade queue full, buffering remaining trades locally");
                    *spilled = true;
                    acc.record(trade);
                }
            }
        }
    }
}

/// Raw result of one worker.
#[derive(Debug)]
struct ChunkRun {
    range: Range<usize>,
    trades: Vec<Trade>,
    /// Entry of a position still open when the walk stopped
    open_entry: Option<usize>,
    /// First index the worker did not evaluate
    end_scan: usize,
}

impl ChunkRun {
    /// Whether the worker held a position when it reached index `q`.
    fn is_open_before(&self, q: usize) -> bool {
        if q < self.range.start || q >= self.end_scan {
            return false;
        }
        if self.open_entry.is_some_and(|entry| entry < q) {
            return true;
        }
        let after = self.trades.partition_point(|t| t.entry_index < q);
        after > 0 && self.trades[after - 1].exit_index >= q
    }

    /// Whether the worker's state at `q` is known to be flat.
    fn is_flat_at(&self, q: usize) -> bool {
        q >= self.range.start && q < self.end_scan && !self.is_open_before(q)
    }
}

/// Walk `range`, continuing past its end while a position is open.
fn run_chunk(
    worker: usize,
    range: Range<usize>,
    sim: &mut Simulator<'_>,
    sink: &mut WorkerSink,
    acc: &mut ThreadLocalAccumulator,
    stop: &AtomicBool,
    poll_interval: usize,
) -> (usize, Option<usize>) {
    let len = sim.view.len();
    let mut i = range.start;
    let mut until_poll = 0;

    while i < len {
        if i >= range.end && sim.is_flat() {
            break;
        }
        if until_poll == 0 {
            if stop.load(Ordering::Relaxed) {
                debug!(worker, index = i, "worker observed stop request");
                break;
            }
            until_poll = poll_interval;
        }
        until_poll -= 1;

        if let Some(trade) = sim.step(i) {
            sink.publish(worker, trade, acc);
        }
        i += 1;
    }

    (i, sim.open)
}

/// Split `range` into `parts` contiguous, nearly equal chunks.
fn partition(range: Range<usize>, parts: usize) -> Vec<Range<usize>> {
    let len = range.len();
    let parts = parts.clamp(1, len.max(1));
    let base = len / parts;
    let extra = len % parts;

    let mut start = range.start;
    (0..parts)
        .map(|p| {
            let size = base + usize::from(p < extra);
            let chunk = start..start + size;
            start += size;
            chunk
        })
        .collect()
}

/// Counts a worker as finished when it returns or unwinds.
struct FinishGuard<'a>(&'a AtomicUsize);

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::Release);
    }
}

/// Drain every ring round-robin until all workers have finished.
fn aggregate(
    mut consumers: Vec<Consumer<Trade>>,
    finished: &AtomicUsize,
    initial_equity: f64,
) -> Vec<ThreadLocalAccumulator> {
    let workers = consumers.len();
    let mut accs: Vec<ThreadLocalAccumulator> = (0..workers)
        .map(|_| ThreadLocalAccumulator::new(initial_equity))
        .collect();

    loop {
        let done = finished.load(Ordering::Acquire) == workers;
        let mut drained = 0;
        for (consumer, acc) in consumers.iter_mut().zip(accs.iter_mut()) {
            while let Some(trade) = consumer.try_dequeue() {
                acc.record(trade);
                drained += 1;
            }
        }
        if done {
            break;
        }
        if drained == 0 {
            thread::yield_now();
        }
    }

    accs
}

/// Parallel backtest engine.
///
/// Single-shot: a second [`run_backtest`](Self::run_backtest) fails with
/// [`BacktestError::AlreadyRun`] until [`reset`](Self::reset) is called.
pub struct ParallelBacktestEngine {
    config: BacktestConfig,
    workers: usize,
    accumulators: Vec<ThreadLocalAccumulator>,
    global: GlobalMetrics,
    stop: Arc<AtomicBool>,
    trades: Vec<Trade>,
    metrics: Option<BacktestMetrics>,
    has_run: bool,
}

impl ParallelBacktestEngine {
    /// Create an engine sized for `config.workers` workers.
    pub fn new(config: BacktestConfig) -> Result<Self, BacktestError> {
        config.validate()?;
        let workers = config.resolved_workers();
        let accumulators = (0..workers)
            .map(|_| ThreadLocalAccumulator::new(config.initial_capital))
            .collect();

        Ok(Self {
            config,
            workers,
            accumulators,
            global: GlobalMetrics::new(),
            stop: Arc::new(AtomicBool::new(false)),
            trades: Vec::new(),
            metrics: None,
            has_run: false,
        })
    }

    /// Engine with default settings and `workers` workers.
    pub fn with_workers(workers: usize) -> Result<Self, BacktestError> {
        Self::new(BacktestConfig {
            workers: workers.max(1),
            ..BacktestConfig::default()
        })
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flag: Arc::clone(&self.stop),
        }
    }

    /// Ask the workers of the current run to stop.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Clear all per-run state so the engine can run again.
    pub fn reset(&mut self) {
        for acc in &mut self.accumulators {
            *acc = ThreadLocalAccumulator::new(self.config.initial_capital);
        }
        self.global.reset();
        self.stop.store(false, Ordering::Release);
        self.trades.clear();
        self.metrics = None;
        self.has_run = false;
    }

    /// Replay `strategy` over `store` using the precomputed `indicators`.
    ///
    /// `indicators` must have been computed from this store. Evaluation starts
    /// at the series warm-up plus the strategy's look-back, so no rule ever
    /// reads a warm-up value.
    pub fn run_backtest(
        &mut self,
        store: &TickStore,
        indicators: &IndicatorSeries,
        strategy: &dyn Strategy,
    ) -> Result<&BacktestMetrics, BacktestError> {
        if self.has_run {
            return Err(BacktestError::AlreadyRun);
        }

        let ticks = store.ticks();
        let n = ticks.len();
        if !indicators.covers(n) {
            return Err(BacktestError::LengthMismatch {
                ticks: n,
                indicators: indicators.len(),
            });
        }
        if n > 0 {
            if let Some(kind) = strategy
                .required_indicators()
                .iter()
                .find(|kind| !indicators.has(**kind))
            {
                return Err(BacktestError::MissingIndicator(kind.name()));
            }
        }
        self.has_run = true;

        let warmup = indicators
            .warmup()
            .saturating_add(strategy.warmup_period())
            .min(n);
        let ranges = partition(warmup..n, self.workers.min(n - warmup));
        let view = MarketView::new(ticks, indicators);
        info!(
            symbol = store.symbol(),
            strategy = strategy.name(),
            ticks = n,
            warmup,
            workers = ranges.len(),
            sink = %self.config.trade_sink,
            "starting backtest"
        );

        let runs = self.run_workers(&ranges, view, strategy)?;
        let trades = self.stitch(runs, view, strategy, n);

        // Reconcile per-worker accumulators with the stitched trades: each
        // trade belongs to the worker whose chunk holds its entry.
        let mut per_worker: Vec<Vec<Trade>> = vec![Vec::new(); ranges.len()];
        for trade in &trades {
            let owner = ranges
                .partition_point(|r| r.end <= trade.entry_index)
                .min(ranges.len().saturating_sub(1));
            per_worker[owner].push(*trade);
        }
        for (acc, owned) in self.accumulators.iter_mut().zip(per_worker) {
            *acc = ThreadLocalAccumulator::from_trades(self.config.initial_capital, owned);
        }

        for acc in &self.accumulators {
            self.global.merge(acc);
        }

        let metrics = compute_metrics(
            &trades,
            self.config.initial_capital,
            store.time_span_ns(),
            &self.config.metrics,
        );
        if self.is_stopped() {
            warn!(trades = trades.len(), "backtest stopped early; metrics cover a partial run");
        }
        info!(
            trades = metrics.num_trades,
            total_pnl = metrics.total_pnl,
            total_return = metrics.total_return,
            "backtest finished"
        );

        self.trades = trades;
        Ok(&*self.metrics.insert(metrics))
    }

    fn run_workers(
        &self,
        ranges: &[Range<usize>],
        view: MarketView<'_>,
        strategy: &dyn Strategy,
    ) -> Result<Vec<ChunkRun>, BacktestError> {
        let config = &self.config;
        let stop = &*self.stop;
        let finished = AtomicUsize::new(0);

        let (producers, consumers): (Vec<_>, Vec<_>) = match config.trade_sink {
            TradeSink::Local => (Vec::new(), Vec::new()),
            TradeSink::Queue => (0..ranges.len())
                .map(|_| ring_buffer::channel::<Trade>(config.queue_capacity))
                .unzip(),
        };
        let mut producers = producers.into_iter();

        thread::scope(|s| {
            let handles: Vec<_> = ranges
                .iter()
                .enumerate()
                .map(|(worker, range)| {
                    let range = range.clone();
                    let mut sink = match producers.next() {
                        Some(producer) => WorkerSink::Queue {
                            producer,
                            spilled: false,
                        },
                        None => WorkerSink::Local,
                    };
                    let finished = &finished;
                    s.spawn(move || {
                        let _guard = FinishGuard(finished);
                        let mut acc = ThreadLocalAccumulator::new(config.initial_capital);
                        let mut sim = Simulator::new(strategy, view, config);
                        let (end_scan, open_entry) = run_chunk(
                            worker,
                            range.clone(),
                            &mut sim,
                            &mut sink,
                            &mut acc,
                            stop,
                            config.stop_poll_interval,
                        );
                        debug!(
                            worker,
                            start = range.start,
                            end = range.end,
                            end_scan,
                            local_trades = acc.len(),
                            "worker finished"
                        );
                        (range, acc, end_scan, open_entry)
                    })
                })
                .collect();

            let aggregator = (!consumers.is_empty()).then(|| {
                let finished = &finished;
                let consumers = consumers;
                s.spawn(move || aggregate(consumers, finished, config.initial_capital))
            });

            let mut results = Vec::with_capacity(handles.len());
            let mut panicked = None;
            for handle in handles {
                match handle.join() {
                    Ok(result) => results.push(result),
                    Err(payload) => panicked = Some(panic_message(payload.as_ref())),
                }
            }
            let drained = match aggregator.map(|h| h.join()) {
                Some(Ok(accs)) => Some(accs),
                Some(Err(payload)) => {
                    panicked = Some(panic_message(payload.as_ref()));
                    None
                }
                None => None,
            };
            if let Some(message) = panicked {
                return Err(BacktestError::WorkerPanicked(message));
            }

            let mut drained = drained.map(Vec::into_iter);
            Ok(results
                .into_iter()
                .map(|(range, overflow, end_scan, open_entry)| {
                    // Queued trades precede any that spilled locally.
                    let trades = match drained.as_mut().and_then(Iterator::next) {
                        Some(queued) => {
                            let mut trades = queued.into_trades();
                            trades.extend(overflow.into_trades());
                            trades
                        }
                        None => overflow.into_trades(),
                    };
                    ChunkRun {
                        range,
                        trades,
                        open_entry,
                        end_scan,
                    }
                })
                .collect())
        })
    }

    /// Merge chunk results into the trade list of one sequential pass.
    fn stitch(
        &self,
        runs: Vec<ChunkRun>,
        view: MarketView<'_>,
        strategy: &dyn Strategy,
        len: usize,
    ) -> Vec<Trade> {
        let mut trades = Vec::new();
        let Some(first) = runs.first() else {
            return trades;
        };

        // The sequential pass is flat before `cursor` and final up to it.
        let mut cursor = first.range.start;
        let mut final_open: Option<usize> = None;
        let mut replayed = 0usize;

        'workers: for run in &runs {
            if cursor >= run.range.end {
                continue;
            }

            let mut replay = Simulator::new(strategy, view, &self.config);
            let mut q = cursor;
            loop {
                if replay.is_flat() {
                    if q >= run.range.end {
                        cursor = q;
                        final_open = None;
                        continue 'workers;
                    }
                    if run.is_flat_at(q) {
                        trades.extend(run.trades.iter().filter(|t| t.entry_index >= q));
                        final_open = run.open_entry.filter(|&entry| entry >= q);
                        cursor = run.end_scan;
                        continue 'workers;
                    }
                }
                if q >= len || self.is_stopped() {
                    final_open = replay.open;
                    break 'workers;
                }
                if let Some(trade) = replay.step(q) {
                    trades.push(trade);
                }
                replayed += 1;
                q += 1;
            }
        }

        if replayed > 0 {
            debug!(replayed, "replayed ticks across chunk boundaries");
        }

        if let Some(entry) = final_open {
            if self.config.close_open_positions && len > 0 && !self.is_stopped() {
                let sim = Simulator::new(strategy, view, &self.config);
                trades.push(sim.close(entry, len - 1));
            }
        }

        trades
    }

    /// Metrics of the last run; `None` before a run has completed.
    pub fn metrics(&self) -> Option<&BacktestMetrics> {
        self.metrics.as_ref()
    }

    /// Merged trades of the last run, ordered by entry.
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Per-worker accumulators of the last run.
    pub fn accumulators(&self) -> &[ThreadLocalAccumulator] {
        &self.accumulators
    }

    /// Totals folded from the accumulators.
    pub fn global(&self) -> GlobalSnapshot {
        self.global.snapshot()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trading_core::IndicatorKind;
    use trading_indicators::{IndicatorConfig, IndicatorEngine};
    use std::time::{Duration, Instant};
    use trading_strategies::{EmaCrossoverStrategy, MacdCrossoverStrategy, RsiReversionStrategy};

    fn random_walk(len: usize) -> TickStore {
        let mut state: u64 = 0x2545_F491_4F6C_DD1D;
        let mut price = 100.0;
        let ticks: Vec<Tick> = (0..len)
            .map(|i| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                let step = (state % 2001) as f64 / 1000.0 - 1.0;
                price = (price + step * 0.5).max(1.0);
                Tick::new(i as i64 * 1_000_000_000, price, 1.0 + (state % 50) as f64)
            })
            .collect();
        TickStore::from_ticks("TEST", &ticks)
    }

    fn indicators(store: &TickStore) -> IndicatorSeries {
        let mut engine = IndicatorEngine::new(&IndicatorConfig {
            pool_threads: 2,
            ema_period: 20,
            ..IndicatorConfig::default()
        })
        .unwrap();
        engine.calculate_all(store).unwrap();
        engine.into_series()
    }

    fn engine(workers: usize, sink: TradeSink, queue_capacity: usize) -> ParallelBacktestEngine {
        ParallelBacktestEngine::new(BacktestConfig {
            workers,
            trade_sink: sink,
            queue_capacity,
            ..BacktestConfig::default()
        })
        .unwrap()
    }

    fn run(
        workers: usize,
        store: &TickStore,
        series: &IndicatorSeries,
        strategy: &dyn Strategy,
    ) -> (BacktestMetrics, Vec<Trade>) {
        let mut engine = engine(workers, TradeSink::Local, 1024);
        let metrics = *engine.run_backtest(store, series, strategy).unwrap();
        (metrics, engine.trades().to_vec())
    }

    /// Holds for a fixed number of ticks so positions straddle chunk edges.
    struct Periodic;

    impl Strategy for Periodic {
        fn name(&self) -> &str {
            "Periodic"
        }

        fn warmup_period(&self) -> usize {
            0
        }

        fn should_enter_long(&self, idx: usize, _view: &MarketView<'_>) -> bool {
            idx % 50 == 7
        }

        fn should_exit_long(&self, idx: usize, _view: &MarketView<'_>) -> bool {
            idx % 50 == 3
        }
    }

    /// Enters once and never exits.
    struct HoldForever;

    impl Strategy for HoldForever {
        fn name(&self) -> &str {
            "Hold"
        }

        fn warmup_period(&self) -> usize {
            0
        }

        fn should_enter_long(&self, idx: usize, _view: &MarketView<'_>) -> bool {
            idx == 2
        }

        fn should_exit_long(&self, _idx: usize, _view: &MarketView<'_>) -> bool {
            false
        }
    }

    /// Records the smallest index any rule was evaluated at.
    struct FirstIndex<S> {
        inner: S,
        first: AtomicUsize,
    }

    impl<S> FirstIndex<S> {
        fn new(inner: S) -> Self {
            Self {
                inner,
                first: AtomicUsize::new(usize::MAX),
            }
        }

        fn first(&self) -> usize {
            self.first.load(Ordering::Relaxed)
        }
    }

    impl<S: Strategy> Strategy for FirstIndex<S> {
        fn name(&self) -> &str {
            self.inner.name()
        }

        fn warmup_period(&self) -> usize {
            self.inner.warmup_period()
        }

        fn required_indicators(&self) -> &[IndicatorKind] {
            self.inner.required_indicators()
        }

        fn should_enter_long(&self, idx: usize, view: &MarketView<'_>) -> bool {
            self.first.fetch_min(idx, Ordering::Relaxed);
            self.inner.should_enter_long(idx, view)
        }

        fn should_exit_long(&self, idx: usize, view: &MarketView<'_>) -> bool {
            self.first.fetch_min(idx, Ordering::Relaxed);
            self.inner.should_exit_long(idx, view)
        }
    }

    /// `Periodic` with a pause on every evaluation.
    struct Slow;

    impl Strategy for Slow {
        fn name(&self) -> &str {
            "Slow"
        }

        fn warmup_period(&self) -> usize {
            0
        }

        fn should_enter_long(&self, idx: usize, view: &MarketView<'_>) -> bool {
            thread::sleep(Duration::from_micros(20));
            Periodic.should_enter_long(idx, view)
        }

        fn should_exit_long(&self, idx: usize, view: &MarketView<'_>) -> bool {
            thread::sleep(Duration::from_micros(20));
            Periodic.should_exit_long(idx, view)
        }
    }

    #[test]
    fn test_partition() {
        assert_eq!(partition(0..10, 3), vec![0..4, 4..7, 7..10]);
        assert_eq!(partition(5..7, 8), vec![5..6, 6..7]);
        assert_eq!(partition(4..4, 3), vec![4..4]);
    }

    #[test]
    fn test_worker_count_does_not_change_results() {
        let store = random_walk(6_000);
        let series = indicators(&store);
        let strategies: Vec<Box<dyn Strategy>> = vec![
            Box::new(EmaCrossoverStrategy::default()),
            Box::new(MacdCrossoverStrategy::default()),
            Box::new(RsiReversionStrategy::default()),
            Box::new(Periodic),
        ];

        for strategy in &strategies {
            let (baseline, baseline_trades) = run(1, &store, &series, strategy.as_ref());
            assert!(baseline.num_trades > 0, "{} produced no trades", strategy.name());

            for workers in [2, 3, 7, 16] {
                let (metrics, trades) = run(workers, &store, &series, strategy.as_ref());

                assert_eq!(metrics.num_trades, baseline.num_trades, "{} x{workers}", strategy.name());
                let tolerance = 1e-6 * baseline.total_pnl.abs().max(1.0);
                assert!((metrics.total_pnl - baseline.total_pnl).abs() <= tolerance);
                for (a, b) in trades.iter().zip(&baseline_trades) {
                    assert_eq!((a.entry_index, a.exit_index), (b.entry_index, b.exit_index));
                }
            }
        }
    }

    #[test]
    fn test_rules_never_read_warmup_values() {
        let store = random_walk(2_000);
        let series = indicators(&store);

        for workers in [1, 4] {
            let ema = FirstIndex::new(EmaCrossoverStrategy::default());
            let rsi = FirstIndex::new(RsiReversionStrategy::default());
            let strategies: [&dyn Strategy; 2] = [&ema, &rsi];
            for strategy in strategies {
                let mut engine = engine(workers, TradeSink::Local, 1024);
                engine.run_backtest(&store, &series, strategy).unwrap();
            }

            for (first, lookback) in [
                (ema.first(), ema.warmup_period()),
                (rsi.first(), rsi.warmup_period()),
            ] {
                assert!(lookback > 0);
                assert!(first - lookback >= series.warmup(), "x{workers}: first {first}");
                assert_eq!(first, series.warmup() + lookback);
            }
        }
    }

    #[test]
    fn test_trades_ordered_and_non_overlapping() {
        let store = random_walk(3_000);
        let series = indicators(&store);
        let (_, trades) = run(7, &store, &series, &EmaCrossoverStrategy::default());

        for pair in trades.windows(2) {
            assert!(pair[0].exit_index < pair[1].entry_index);
        }
        for trade in &trades {
            assert!(trade.entry_index >= series.warmup());
            assert!(trade.exit_index > trade.entry_index || trade.exit_index == store.len() - 1);
        }
    }

    #[test]
    fn test_queue_sink_matches_local() {
        let store = random_walk(4_000);
        let series = indicators(&store);
        let strategy = Periodic;

        let (expected, expected_trades) = run(4, &store, &series, &strategy);

        // A two-slot ring forces spills into the local overflow.
        for capacity in [2, 1024] {
            let mut engine = engine(4, TradeSink::Queue, capacity);
            let metrics = *engine.run_backtest(&store, &series, &strategy).unwrap();

            assert_eq!(metrics.num_trades, expected.num_trades);
            assert!((metrics.total_pnl - expected.total_pnl).abs() < 1e-6);
            assert_eq!(engine.trades(), expected_trades.as_slice());
        }
    }

    #[test]
    fn test_global_metrics_match_merged_trades() {
        let store = random_walk(3_000);
        let series = indicators(&store);
        let mut engine = engine(5, TradeSink::Local, 1024);

        let metrics = *engine
            .run_backtest(&store, &series, &EmaCrossoverStrategy::default())
            .unwrap();
        let global = engine.global();

        assert_eq!(global.total_trades as usize, metrics.num_trades);
        assert!((global.total_pnl - metrics.total_pnl).abs() < 1e-6);
        assert!(global.max_drawdown >= 0.0);
        let owned: usize = engine.accumulators().iter().map(|a| a.len()).sum();
        assert_eq!(owned, metrics.num_trades);
        let owned_pnl: f64 = engine.accumulators().iter().map(|a| a.total_pnl()).sum();
        assert!((owned_pnl - global.total_pnl).abs() < 1e-6);
        let worst = engine
            .accumulators()
            .iter()
            .map(|a| a.max_drawdown())
            .fold(0.0, f64::max);
        assert!((worst - global.max_drawdown).abs() < 1e-12);
    }

    #[test]
    fn test_single_shot_until_reset() {
        let store = random_walk(500);
        let series = indicators(&store);
        let strategy = EmaCrossoverStrategy::default();
        let mut engine = engine(2, TradeSink::Local, 1024);

        let first = *engine.run_backtest(&store, &series, &strategy).unwrap();
        assert!(matches!(
            engine.run_backtest(&store, &series, &strategy),
            Err(BacktestError::AlreadyRun)
        ));
        assert_eq!(engine.metrics(), Some(&first));

        engine.reset();
        assert!(engine.metrics().is_none());
        let second = *engine.run_backtest(&store, &series, &strategy).unwrap();
        assert_eq!(first.num_trades, second.num_trades);
    }

    #[test]
    fn test_length_mismatch() {
        let store = random_walk(500);
        let series = indicators(&random_walk(400));
        let mut engine = engine(2, TradeSink::Local, 1024);

        assert!(matches!(
            engine.run_backtest(&store, &series, &EmaCrossoverStrategy::default()),
            Err(BacktestError::LengthMismatch { ticks: 500, indicators: 400 })
        ));
    }

    #[test]
    fn test_missing_indicator() {
        let store = random_walk(200);
        let mut series = IndicatorSeries::new();
        let mut ema = vec![0.0; store.len()];
        store.ema(&mut ema, 10).unwrap();
        series.set_ema(ema, 10);

        let mut engine = engine(2, TradeSink::Local, 1024);
        let result = engine.run_backtest(&store, &series, &RsiReversionStrategy::default());
        assert!(matches!(
            result,
            Err(BacktestError::MissingIndicator(name)) if name == IndicatorKind::Rsi.name()
        ));

        // A rejected run does not consume the engine.
        assert!(engine
            .run_backtest(&store, &series, &EmaCrossoverStrategy::default())
            .is_ok());
    }

    #[test]
    fn test_stop_before_run_yields_no_trades() {
        let store = random_walk(2_000);
        let series = indicators(&store);
        let mut engine = engine(4, TradeSink::Local, 1024);

        let handle = engine.stop_handle();
        handle.stop();
        assert!(engine.is_stopped());

        let metrics = *engine.run_backtest(&store, &series, &Periodic).unwrap();
        assert_eq!(metrics.num_trades, 0);

        engine.reset();
        assert!(!handle.is_stopped());
    }

    #[test]
    fn test_stop_during_run() {
        // Every tick sleeps, so a full pass takes well over a second.
        let store = random_walk(400_000);
        let series = IndicatorSeries::new();
        let mut engine = ParallelBacktestEngine::new(BacktestConfig {
            workers: 4,
            stop_poll_interval: 32,
            ..BacktestConfig::default()
        })
        .unwrap();

        let handle = engine.stop_handle();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            handle.stop();
        });

        let started = Instant::now();
        let metrics = *engine.run_backtest(&store, &series, &Slow).unwrap();
        let elapsed = started.elapsed();
        stopper.join().unwrap();

        assert!(engine.is_stopped());
        assert!(elapsed < Duration::from_secs(1), "took {elapsed:?}");

        let trades = engine.trades();
        assert_eq!(metrics.num_trades, trades.len());
        for pair in trades.windows(2) {
            assert!(pair[0].exit_index < pair[1].entry_index);
        }
        // Only rule exits: nothing was force-closed at the last tick.
        for trade in trades {
            assert_eq!(trade.exit_index % 50, 3);
            assert_ne!(trade.exit_index, store.len() - 1);
        }
    }

    #[test]
    fn test_open_position_closed_at_end() {
        let store = random_walk(100);
        let series = IndicatorSeries::new();

        let mut engine = engine(3, TradeSink::Local, 1024);
        let metrics = *engine.run_backtest(&store, &series, &HoldForever).unwrap();
        assert_eq!(metrics.num_trades, 1);
        let trade = engine.trades()[0];
        assert_eq!((trade.entry_index, trade.exit_index), (2, 99));

        let mut engine = ParallelBacktestEngine::new(BacktestConfig {
            workers: 3,
            close_open_positions: false,
            ..BacktestConfig::default()
        })
        .unwrap();
        let metrics = *engine.run_backtest(&store, &series, &HoldForever).unwrap();
        assert_eq!(metrics.num_trades, 0);
    }

    #[test]
    fn test_empty_store() {
        let store = TickStore::with_capacity("EMPTY", 0);
        let series = IndicatorSeries::new();
        let mut engine = engine(4, TradeSink::Queue, 16);

        let metrics = *engine
            .run_backtest(&store, &series, &EmaCrossoverStrategy::default())
            .unwrap();
        assert_eq!(metrics.num_trades, 0);
        assert_eq!(metrics.final_equity, 100_000.0);
    }

    #[test]
    fn test_invalid_config() {
        let config = BacktestConfig {
            initial_capital: 0.0,
            ..BacktestConfig::default()
        };
        assert!(ParallelBacktestEngine::new(config).is_err());
        assert!("queue".parse::<TradeSink>().is_ok());
        assert!("mpmc".parse::<TradeSink>().is_err());
    }
}
