use chrono::{DateTime, Utc};

use common::{Candle, Error, Result, Timeframe};

/// Append-only candle history for one (symbol, timeframe).
///
/// Timestamps strictly increase. The newest accepted timestamp survives
/// `trim`, so trimming never reopens the door to older candles.
#[derive(Debug, Clone)]
pub struct CandleSeries {
    symbol: String,
    timeframe: Timeframe,
    candles: Vec<Candle>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl CandleSeries {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            candles: Vec::new(),
            last_timestamp: None,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Append one candle. Fails with `OutOfOrderCandle` when its timestamp
    /// is not after the newest one seen.
    pub fn append(&mut self, candle: Candle) -> Result<()> {
        if let Some(last) = self.last_timestamp {
            if candle.timestamp <= last {
                return Err(Error::OutOfOrderCandle {
                    symbol: self.symbol.clone(),
                    timeframe: self.timeframe,
                    timestamp: candle.timestamp,
                    last,
                });
            }
        }
        self.last_timestamp = Some(candle.timestamp);
        self.candles.push(candle);
        Ok(())
    }

    /// The last `n` candles (all of them if fewer are stored).
    pub fn slice(&self, last_n: usize) -> &[Candle] {
        let start = self.candles.len().saturating_sub(last_n);
        &self.candles[start..]
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.last_timestamp
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Candles strictly after `timestamp`.
    pub fn after(&self, timestamp: DateTime<Utc>) -> &[Candle] {
        let start = self.candles.partition_point(|c| c.timestamp <= timestamp);
        &self.candles[start..]
    }

    /// Drop all but the newest `keep_last` candles. Returns how many were removed.
    pub fn trim(&mut self, keep_last: usize) -> usize {
        let excess = self.candles.len().saturating_sub(keep_last);
        self.candles.drain(..excess);
        excess
    }
}
