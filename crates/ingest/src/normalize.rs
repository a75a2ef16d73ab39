//! Provider payload → canonical price records.
//!
//! Pure and synchronous. Output follows the provider's key order; callers
//! that need chronological order must sort explicitly.

use serde_json::{Map, Value};

use pricevault_core::record::Ohlcv;
use pricevault_core::PriceRecord;

use crate::client::RawPayload;
use crate::error::NormalizeError;

/// Top-level key holding the date-keyed daily series.
pub const SERIES_KEY: &str = "Time Series (Daily)";

const OPEN: &str = "1. open";
const HIGH: &str = "2. high";
const LOW: &str = "3. low";
const CLOSE: &str = "4. close";
const VOLUME: &str = "5. volume";

/// Convert one symbol's payload into records.
///
/// A payload without the series key yields no records: the provider reports
/// "no data" that way. The first bad entry fails the whole symbol, so a
/// partially normalized series never reaches storage.
pub fn normalize(symbol: &str, payload: &RawPayload) -> Result<Vec<PriceRecord>, NormalizeError> {
    let Some(series) = payload.get(SERIES_KEY) else {
        return Ok(Vec::new());
    };
    let series = series.as_object().ok_or_else(|| {
        NormalizeError::MalformedSeries(format!("'{SERIES_KEY}' is not an object"))
    })?;

    let mut records = Vec::with_capacity(series.len());
    for (date, entry) in series {
        let entry = entry.as_object().ok_or_else(|| malformed(date, "entry is not an object"))?;
        let values = Ohlcv {
            open: price(date, entry, OPEN)?,
            high: price(date, entry, HIGH)?,
            low: price(date, entry, LOW)?,
            close: price(date, entry, CLOSE)?,
            volume: volume(date, entry)?,
        };
        let record =
            PriceRecord::new(symbol, date, values).map_err(|e| malformed(date, e.to_string()))?;
        records.push(record);
    }
    Ok(records)
}

fn malformed(date: &str, reason: impl Into<String>) -> NormalizeError {
    NormalizeError::MalformedRecord {
        date: date.to_string(),
        reason: reason.into(),
    }
}

fn field<'a>(date: &str, entry: &'a Map<String, Value>, name: &str) -> Result<&'a Value, NormalizeError> {
    entry
        .get(name)
        .ok_or_else(|| malformed(date, format!("missing field '{name}'")))
}

fn price(date: &str, entry: &Map<String, Value>, name: &str) -> Result<f64, NormalizeError> {
    let parsed = match field(date, entry, name)? {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    parsed.ok_or_else(|| malformed(date, format!("field '{name}' is not a number")))
}

fn volume(date: &str, entry: &Map<String, Value>) -> Result<i64, NormalizeError> {
    let parsed = match field(date, entry, VOLUME)? {
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    };
    parsed.ok_or_else(|| malformed(date, format!("field '{VOLUME}' is not an integer")))
}
