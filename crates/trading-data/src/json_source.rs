//! JSON tick ingestion.
//!
//! Accepts an array of exported bars where each element carries a timestamp,
//! a closing price and a volume, usually string-encoded. Elements that do not
//! parse are skipped with a warning; they never fail the whole batch.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use trading_core::{DataError, Tick};

use crate::TickStore;

/// JSON record format.
#[derive(Debug, Deserialize)]
struct JsonRecord {
    #[serde(alias = "Timestamp", alias = "time", alias = "t")]
    timestamp: Scalar,
    #[serde(alias = "Close", alias = "price", alias = "c")]
    close: Scalar,
    #[serde(alias = "Volume", alias = "v")]
    volume: Scalar,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    fn to_i64(&self, field: &str) -> Result<i64, String> {
        match self {
            Scalar::Int(v) => Ok(*v),
            Scalar::Float(v) if v.fract() == 0.0 && v.is_finite() => Ok(*v as i64),
            Scalar::Float(v) => Err(format!("{field}: {v} is not an integer")),
            Scalar::Text(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|e| format!("{field}: {e} ({s:?})")),
        }
    }

    fn to_f64(&self, field: &str) -> Result<f64, String> {
        match self {
            Scalar::Int(v) => Ok(*v as f64),
            Scalar::Float(v) => Ok(*v),
            Scalar::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| format!("{field}: {e} ({s:?})")),
        }
    }
}

/// Outcome of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConversionSummary {
    pub converted: usize,
    pub skipped: usize,
}

fn parse_record(item: &Value) -> Result<Tick, String> {
    let record = JsonRecord::deserialize(item).map_err(|e| e.to_string())?;
    Ok(Tick::new(
        record.timestamp.to_i64("timestamp")?,
        record.close.to_f64("close")?,
        record.volume.to_f64("volume")?,
    ))
}

/// Parse a JSON array of bars into ticks.
///
/// Returns the parsed ticks in input order and the number of skipped
/// elements. Fails only when the document itself is not a JSON array.
pub fn parse_json_ticks(json: &str) -> Result<(Vec<Tick>, usize), DataError> {
    let document: Value = serde_json::from_str(json).map_err(|e| DataError::Parse(e.to_string()))?;
    let items = document
        .as_array()
        .ok_or_else(|| DataError::Parse("expected a JSON array of ticks".to_string()))?;

    let mut ticks = Vec::with_capacity(items.len());
    let mut skipped = 0;

    for (index, item) in items.iter().enumerate() {
        match parse_record(item) {
            Ok(tick) => ticks.push(tick),
            Err(reason) => {
                warn!(index, %reason, "skipping malformed tick");
                skipped += 1;
            }
        }
    }

    Ok((ticks, skipped))
}

/// Convert a JSON export at `input` into a binary tick file at `output`.
pub fn convert_json_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> Result<ConversionSummary, DataError> {
    let input = input.as_ref();
    let output = output.as_ref();

    let json = std::fs::read_to_string(input).map_err(|source| DataError::Open {
        path: input.to_path_buf(),
        source,
    })?;
    let (ticks, skipped) = parse_json_ticks(&json)?;

    let store = TickStore::from_ticks("converted", &ticks);
    store.save(output)?;

    let summary = ConversionSummary {
        converted: ticks.len(),
        skipped,
    };
    info!(
        converted = summary.converted,
        skipped = summary.skipped,
        output = %output.display(),
        "converted JSON ticks to binary"
    );
    Ok(summary)
}
