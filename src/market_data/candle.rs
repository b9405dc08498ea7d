use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single OHLCV candle, identical in shape for REST snapshots and stream
/// deltas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Interval open time (epoch ms).
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Base-asset quantity.
    pub volume: f64,
    /// Quote-asset notional.
    pub turnover: f64,
}

impl Candle {
    /// `low <= open, close <= high`.
    pub fn is_well_formed(&self) -> bool {
        self.low <= self.open.min(self.close) && self.open.max(self.close) <= self.high
    }

    /// Build a candle from one row of the `/api/v3/klines` array-of-arrays
    /// response.
    ///
    /// Array indices:
    ///   [0] openTime, [1] open, [2] high, [3] low, [4] close, [5] volume,
    ///   [6] closeTime, [7] quoteAssetVolume, ...
    pub fn from_kline_row(row: &[serde_json::Value]) -> Result<Self> {
        if row.len() < 8 {
            anyhow::bail!("kline row has {} elements, expected at least 8", row.len());
        }
        Ok(Self {
            timestamp: row[0].as_i64().context("kline openTime is not an integer")?,
            open: parse_string_f64(&row[1], "open")?,
            high: parse_string_f64(&row[2], "high")?,
            low: parse_string_f64(&row[3], "low")?,
            close: parse_string_f64(&row[4], "close")?,
            volume: parse_string_f64(&row[5], "volume")?,
            turnover: parse_string_f64(&row[7], "quoteAssetVolume")?,
        })
    }
}

/// Where a candle sequence came from. Synthetic series are fabricated when
/// the exchange is unreachable and must never be mistaken for market data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandleOrigin {
    Exchange,
    Synthetic,
}

/// Outcome of merging a streamed candle into a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandleMerge {
    /// The in-progress last candle was updated in place.
    Replaced,
    /// A new interval opened; the candle was appended.
    Appended,
    /// Older than the last candle; dropped.
    Ignored,
}

/// Ordered candle sequence (oldest first) for one (symbol, interval).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleSeries {
    pub symbol: String,
    pub interval: String,
    pub origin: CandleOrigin,
    pub candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(
        symbol: impl Into<String>,
        interval: impl Into<String>,
        origin: CandleOrigin,
        candles: Vec<Candle>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            interval: interval.into(),
            origin,
            candles,
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// Timestamps strictly increase across the sequence.
    pub fn is_strictly_increasing(&self) -> bool {
        self.candles
            .windows(2)
            .all(|w| w[0].timestamp < w[1].timestamp)
    }

    /// Merge a streamed candle.
    ///
    /// * Same open time as the last candle: replace it in place (the
    ///   interval has not closed yet).
    /// * Newer open time: append, then trim the oldest entries so the series
    ///   never grows past `max_len` (a `max_len` of 0 disables trimming).
    /// * Older open time: ignore.
    pub fn apply_update(&mut self, candle: Candle, max_len: usize) -> CandleMerge {
        match self.candles.last_mut() {
            Some(last) if last.timestamp == candle.timestamp => {
                *last = candle;
                CandleMerge::Replaced
            }
            Some(last) if last.timestamp > candle.timestamp => CandleMerge::Ignored,
            _ => {
                self.candles.push(candle);
                if max_len > 0 && self.candles.len() > max_len {
                    let excess = self.candles.len() - max_len;
                    self.candles.drain(..excess);
                }
                CandleMerge::Appended
            }
        }
    }
}

/// Binance sends numeric values as JSON strings inside kline payloads.
pub(crate) fn parse_string_f64(val: &serde_json::Value, name: &str) -> Result<f64> {
    match val {
        serde_json::Value::String(s) => s
            .parse::<f64>()
            .with_context(|| format!("failed to parse {name} as f64: {s}")),
        serde_json::Value::Number(n) => n
            .as_f64()
            .with_context(|| format!("field {name} is not a valid f64")),
        _ => anyhow::bail!("field {name} has unexpected JSON type"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
