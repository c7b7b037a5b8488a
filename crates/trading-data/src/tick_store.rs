//! Cache-aligned tick storage with binary persistence.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use tracing::{debug, info, warn};
use trading_core::simd::{BatchOps, DefaultBatch};
use trading_core::{AlignedBuffer, DataError, Tick, CACHE_LINE_SIZE, TICK_RECORD_SIZE};

/// Ticks reserved up front by [`TickStore::new`].
pub const DEFAULT_RESERVE: usize = 1_000_000;

/// Records reduced per VWAP pass; bounds the scratch working set.
pub const VWAP_CHUNK: usize = 1024;

/// How far ahead of the decoder the loader reads, in cache lines.
pub const READ_AHEAD_LINES: usize = 1024;

const READ_BLOCK_RECORDS: usize = READ_AHEAD_LINES * CACHE_LINE_SIZE / TICK_RECORD_SIZE;

#[repr(C, align(64))]
struct VwapScratch {
    price: [f64; VWAP_CHUNK],
    volume: [f64; VWAP_CHUNK],
}

/// Contiguous, cache-line aligned sequence of ticks for one symbol.
///
/// Ticks are expected in non-decreasing timestamp order; this is not checked.
/// Readers borrow the store immutably, so it cannot change while indicators or
/// a backtest are reading it.
#[derive(Debug, Clone)]
pub struct TickStore {
    symbol: String,
    ticks: AlignedBuffer<Tick>,
}

impl TickStore {
    /// Create an empty store pre-sized for [`DEFAULT_RESERVE`] ticks.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self::with_capacity(symbol, DEFAULT_RESERVE)
    }

    pub fn with_capacity(symbol: impl Into<String>, capacity: usize) -> Self {
        Self {
            symbol: symbol.into(),
            ticks: AlignedBuffer::with_capacity(capacity),
        }
    }

    /// Build a store holding a copy of `ticks`.
    pub fn from_ticks(symbol: impl Into<String>, ticks: &[Tick]) -> Self {
        let mut store = Self::with_capacity(symbol, ticks.len());
        store.extend_from_slice(ticks);
        store
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    #[inline]
    pub fn ticks(&self) -> &[Tick] {
        self.ticks.as_slice()
    }

    pub fn push(&mut self, tick: Tick) {
        self.ticks.push(tick);
    }

    pub fn extend_from_slice(&mut self, ticks: &[Tick]) {
        self.ticks.extend_from_slice(ticks);
    }

    /// Tick at `index`, or an error when out of range.
    pub fn at(&self, index: usize) -> Result<Tick, DataError> {
        self.ticks
            .get(index)
            .copied()
            .ok_or(DataError::IndexOutOfBounds {
                index,
                len: self.ticks.len(),
            })
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Tick> {
        self.ticks.get(index)
    }

    /// Prices copied into a contiguous buffer for vectorized kernels.
    pub fn prices(&self) -> Vec<f64> {
        self.ticks.iter().map(|t| t.price).collect()
    }

    /// Nanoseconds between the first and last tick.
    pub fn time_span_ns(&self) -> i64 {
        match (self.ticks.first(), self.ticks.last()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => 0,
        }
    }

    /// Replace the contents with the records in `path`.
    ///
    /// The record count is the file size divided by the record size; a
    /// trailing partial record is ignored. The file is read sequentially in
    /// blocks of [`READ_AHEAD_LINES`] cache lines and decoded in file order.
    /// On failure the store is left empty.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<usize, DataError> {
        let path = path.as_ref();
        self.ticks.clear();

        let file = File::open(path).map_err(|source| DataError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let file_len = file
            .metadata()
            .map_err(|source| DataError::Read {
                path: path.to_path_buf(),
                source,
            })?
            .len();

        let count = (file_len / TICK_RECORD_SIZE as u64) as usize;
        let trailing = file_len % TICK_RECORD_SIZE as u64;
        if trailing != 0 {
            warn!(
                path = %path.display(),
                trailing_bytes = trailing,
                "ignoring partial record at end of tick file"
            );
        }

        self.ticks.reserve(count);

        if let Err(source) = self.read_records(file, count) {
            self.ticks.clear();
            return Err(DataError::Read {
                path: path.to_path_buf(),
                source,
            });
        }

        info!(
            symbol = %self.symbol,
            ticks = self.ticks.len(),
            path = %path.display(),
            "loaded ticks"
        );
        Ok(self.ticks.len())
    }

    fn read_records(&mut self, mut file: File, count: usize) -> io::Result<()> {
        let mut block = vec![0u8; READ_BLOCK_RECORDS * TICK_RECORD_SIZE];
        let mut remaining = count;

        while remaining > 0 {
            let records = remaining.min(READ_BLOCK_RECORDS);
            let bytes = &mut block[..records * TICK_RECORD_SIZE];
            file.read_exact(bytes)?;

            for record in bytes
                .chunks_exact(TICK_RECORD_SIZE)
                .filter_map(|chunk| <&[u8; TICK_RECORD_SIZE]>::try_from(chunk).ok())
            {
                self.ticks.push(Tick::from_record(record));
            }
            remaining -= records;
        }

        debug!(records = count, block_records = READ_BLOCK_RECORDS, "decoded tick file");
        Ok(())
    }

    /// Write every tick as a fixed-size record, truncating `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DataError> {
        let path = path.as_ref();
        let write_err = |source| DataError::Write {
            path: path.to_path_buf(),
            source,
        };

        let file = File::create(path).map_err(|source| DataError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let mut writer = BufWriter::with_capacity(READ_BLOCK_RECORDS * TICK_RECORD_SIZE, file);

        for tick in self.ticks.iter() {
            writer.write_all(&tick.to_record()).map_err(write_err)?;
        }
        writer.flush().map_err(write_err)?;

        debug!(ticks = self.ticks.len(), path = %path.display(), "saved ticks");
        Ok(())
    }

    /// Volume-weighted average price over the first `min(period, len)` ticks.
    ///
    /// Returns 0 for an empty store, a zero period or zero total volume.
    pub fn vwap(&self, period: usize) -> f64 {
        self.vwap_with(&DefaultBatch::default(), period)
    }

    /// [`TickStore::vwap`] with an explicit batch implementation.
    pub fn vwap_with<B: BatchOps>(&self, batch: &B, period: usize) -> f64 {
        if self.ticks.is_empty() || period == 0 {
            return 0.0;
        }

        let n = period.min(self.ticks.len());
        let mut scratch = Box::new(VwapScratch {
            price: [0.0; VWAP_CHUNK],
            volume: [0.0; VWAP_CHUNK],
        });
        let mut total_volume = 0.0;
        let mut total_notional = 0.0;

        for chunk in self.ticks[..n].chunks(VWAP_CHUNK) {
            let len = chunk.len();
            for (j, tick) in chunk.iter().enumerate() {
                scratch.price[j] = tick.price;
                scratch.volume[j] = tick.volume;
            }

            total_volume += batch.sum(&scratch.volume[..len]);
            total_notional += batch.dot(&scratch.price[..len], &scratch.volume[..len]);
        }

        if total_volume > 0.0 {
            total_notional / total_volume
        } else {
            0.0
        }
    }

    /// Exponential moving average of the prices written into `output`.
    ///
    /// Multiplier is `2 / (period + 1)` and `output[0]` is the first price.
    /// Does nothing for an empty store or a zero period. Each value depends on
    /// the previous one, so the loop is unrolled but stays sequential.
    pub fn ema(&self, output: &mut [f64], period: usize) -> Result<(), DataError> {
        let n = self.ticks.len();
        if n == 0 || period == 0 {
            return Ok(());
        }
        if output.len() < n {
            return Err(DataError::BufferTooSmall {
                required: n,
                available: output.len(),
            });
        }

        let k = 2.0 / (period as f64 + 1.0);
        let keep = 1.0 - k;
        let ticks = self.ticks.as_slice();

        output[0] = ticks[0].price;
        let mut i = 1;
        while i + 3 < n {
            output[i] = ticks[i].price * k + output[i - 1] * keep;
            output[i + 1] = ticks[i + 1].price * k + output[i] * keep;
            output[i + 2] = ticks[i + 2].price * k + output[i + 1] * keep;
            output[i + 3] = ticks[i + 3].price * k + output[i + 2] * keep;
            i += 4;
        }
        while i < n {
            output[i] = ticks[i].price * k + output[i - 1] * keep;
            i += 1;
        }

        Ok(())
    }
}
