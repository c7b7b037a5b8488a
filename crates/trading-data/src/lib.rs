//! Tick storage and ingestion.
//!
//! [`TickStore`] owns a cache-line aligned tick sequence, persists it in the
//! fixed-record binary format and provides batched VWAP/EMA reductions.
//! [`convert_json_file`] turns exported JSON bars into that binary format.

mod json_source;
mod tick_store;

pub use json_source::{convert_json_file, parse_json_ticks, ConversionSummary};
pub use tick_store::{TickStore, DEFAULT_RESERVE, READ_AHEAD_LINES, VWAP_CHUNK};
