//! Tick record and its on-disk encoding.

use serde::{Deserialize, Serialize};

use crate::aligned::{CacheAligned, CACHE_LINE_SIZE};

/// One timestamped price/volume observation.
///
/// Aligned to a cache line so that a tick never straddles two lines. The
/// trailing bytes of the line are padding with no meaning.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(C, align(64))]
pub struct Tick {
    /// Trade or close price
    pub price: f64,
    /// Traded volume
    pub volume: f64,
    /// Nanoseconds since the Unix epoch
    pub timestamp: i64,
}

/// Size of one record in memory and in the binary tick file.
pub const TICK_RECORD_SIZE: usize = std::mem::size_of::<Tick>();

const _: () = assert!(TICK_RECORD_SIZE % CACHE_LINE_SIZE == 0);

impl CacheAligned for Tick {}

impl Tick {
    pub const fn new(timestamp: i64, price: f64, volume: f64) -> Self {
        Self {
            price,
            volume,
            timestamp,
        }
    }

    /// Encode as a fixed-size little-endian record.
    ///
    /// Layout: price, volume, timestamp (8 bytes each), then zeroed padding.
    pub fn to_record(&self) -> [u8; TICK_RECORD_SIZE] {
        let mut record = [0u8; TICK_RECORD_SIZE];
        record[0..8].copy_from_slice(&self.price.to_le_bytes());
        record[8..16].copy_from_slice(&self.volume.to_le_bytes());
        record[16..24].copy_from_slice(&self.timestamp.to_le_bytes());
        record
    }

    /// Decode a record written by [`Tick::to_record`]. Padding is ignored.
    pub fn from_record(record: &[u8; TICK_RECORD_SIZE]) -> Self {
        Self {
            price: f64::from_le_bytes(word(record, 0)),
            volume: f64::from_le_bytes(word(record, 8)),
            timestamp: i64::from_le_bytes(word(record, 16)),
        }
    }

    /// Price times volume.
    #[inline]
    pub fn notional(&self) -> f64 {
        self.price * self.volume
    }
}

#[inline]
fn word(record: &[u8; TICK_RECORD_SIZE], offset: usize) -> [u8; 8] {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&record[offset..offset + 8]);
    bytes
}
