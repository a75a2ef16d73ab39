//! Canonical daily price record.
//!
//! A [`PriceRecord`] can only be built through [`PriceRecord::new`], which
//! enforces the record invariants. Fields are read-only after construction.

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::RecordError;

/// One day's open/high/low/close/volume observation, before validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Ohlcv {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// Storage-ready representation of one day's observation for one symbol.
///
/// Serializes to the flat row shape the destination tables expect:
/// `{"symbol", "date", "open", "high", "low", "close", "volume"}` with the
/// date as an ISO 8601 calendar date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRecord {
    symbol: String,
    date: NaiveDate,
    #[serde(flatten)]
    values: Ohlcv,
}

impl PriceRecord {
    /// Validate and build a record. Nothing is clamped or coerced.
    pub fn new(symbol: impl Into<String>, date: &str, values: Ohlcv) -> Result<Self, RecordError> {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| RecordError::InvalidDate(date.to_string()))?;

        for (field, value) in [
            ("open", values.open),
            ("high", values.high),
            ("low", values.low),
            ("close", values.close),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(RecordError::InvalidPrice { field, value });
            }
        }
        if values.high < values.low {
            return Err(RecordError::InvertedRange {
                high: values.high,
                low: values.low,
            });
        }
        if values.volume < 0 {
            return Err(RecordError::NegativeVolume(values.volume));
        }

        Ok(Self {
            symbol: symbol.into(),
            date,
            values,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn open(&self) -> f64 {
        self.values.open
    }

    pub fn high(&self) -> f64 {
        self.values.high
    }

    pub fn low(&self) -> f64 {
        self.values.low
    }

    pub fn close(&self) -> f64 {
        self.values.close
    }

    pub fn volume(&self) -> i64 {
        self.values.volume
    }
}
