use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{Candle, Direction};

/// A cluster of equal highs or lows, i.e. resting stop orders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiquidityPool {
    /// Equal highs attract sellers' stops above (bearish target); equal
    /// lows the mirror (bullish target).
    pub direction: Direction,
    pub level: f64,
    /// `level` in units of `10^-precision`. Stable identity for the pool.
    pub ticks: i64,
    pub touches: u32,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Equal-highs / equal-lows detector over the last `lookback` candles.
/// Prices are rounded to `precision` decimals before grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidityDetector {
    pub lookback: usize,
    pub precision: u32,
}

impl Default for LiquidityDetector {
    fn default() -> Self {
        Self {
            lookback: 50,
            precision: 4,
        }
    }
}

impl LiquidityDetector {
    /// Pools at every rounded level hit at least twice, highs first, each
    /// group in ascending price order.
    pub fn detect(&self, candles: &[Candle]) -> Vec<LiquidityPool> {
        let start = candles.len().saturating_sub(self.lookback);
        let window = &candles[start..];

        let mut pools = self.cluster(window, |c| c.high, Direction::Bearish);
        pools.extend(self.cluster(window, |c| c.low, Direction::Bullish));
        pools
    }

    fn scale(&self) -> f64 {
        10f64.powi(self.precision as i32)
    }

    fn cluster(
        &self,
        window: &[Candle],
        price: impl Fn(&Candle) -> f64,
        direction: Direction,
    ) -> Vec<LiquidityPool> {
        let scale = self.scale();
        let mut levels: BTreeMap<i64, (u32, DateTime<Utc>, DateTime<Utc>)> = BTreeMap::new();
        for c in window {
            let ticks = (price(c) * scale).round() as i64;
            levels
                .entry(ticks)
                .and_modify(|(count, _, last)| {
                    *count += 1;
                    *last = c.timestamp;
                })
                .or_insert((1, c.timestamp, c.timestamp));
        }

        levels
            .into_iter()
            .filter(|(_, (count, _, _))| *count >= 2)
            .map(|(ticks, (touches, first_seen, last_seen))| LiquidityPool {
                direction,
                level: ticks as f64 / scale,
                ticks,
                touches,
                first_seen,
                last_seen,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::testutil::{bar, ts};

    #[test]
    fn equal_highs_form_a_bearish_pool() {
        let candles = vec![
            bar(0, 1.1000, 1.10502, 1.0990, 1.1001),
            bar(1, 1.1001, 1.1030, 1.0995, 1.1002),
            bar(2, 1.1002, 1.10498, 1.0980, 1.1003),
        ];
        let pools = LiquidityDetector::default().detect(&candles);
        assert_eq!(pools.len(), 1);
        let pool = pools[0];
        assert_eq!(pool.direction, Direction::Bearish);
        assert_eq!(pool.ticks, 11050);
        assert!((pool.level - 1.105).abs() < 1e-12);
        assert_eq!(pool.touches, 2);
        assert_eq!((pool.first_seen, pool.last_seen), (ts(0), ts(2)));
    }

    #[test]
    fn equal_lows_form_a_bullish_pool_with_count() {
        let candles: Vec<_> = (0..3)
            .map(|i| bar(i, 1.2010 + i as f64 * 0.001, 1.2100 + i as f64 * 0.001, 1.2000, 1.2050))
            .collect();
        let pools = LiquidityDetector::default().detect(&candles);
        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].direction, Direction::Bullish);
        assert_eq!(pools[0].touches, 3);
    }

    #[test]
    fn lookback_limits_the_window() {
        let mut candles = vec![bar(0, 1.2010, 1.2100, 1.2000, 1.2050)];
        candles.extend((1..5).map(|i| bar(i, 1.30 + i as f64 * 0.01, 1.31 + i as f64 * 0.01, 1.29 + i as f64 * 0.01, 1.30 + i as f64 * 0.01)));
        candles.push(bar(5, 1.2010, 1.2100, 1.2000, 1.2050));

        assert_eq!(LiquidityDetector::default().detect(&candles).len(), 2);
        let short = LiquidityDetector {
            lookback: 5,
            precision: 4,
        };
        assert!(short.detect(&candles).is_empty());
    }
}
