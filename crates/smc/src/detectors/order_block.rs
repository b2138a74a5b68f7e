use serde::{Deserialize, Serialize};

use common::{Candle, Direction};

use super::Zone;

/// Order block: the last opposite-coloured candle before a strong move.
///
/// Bullish when candle `k` closed bearish and the very next candle `k + 1`
/// closes bullish above candle `k`'s open; bearish is the mirror. Candle
/// `k + 2` must exist, so the reversal bar is known to have closed. The
/// band is the full range of candle `k`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderBlockDetector;

impl OrderBlockDetector {
    pub fn detect(&self, candles: &[Candle]) -> Vec<Zone> {
        candles
            .windows(3)
            .enumerate()
            .filter_map(|(k, w)| {
                let (block, confirm) = (&w[0], &w[1]);
                let direction = if block.is_bearish()
                    && confirm.is_bullish()
                    && confirm.close > block.open
                {
                    Direction::Bullish
                } else if block.is_bullish() && confirm.is_bearish() && confirm.close < block.open {
                    Direction::Bearish
                } else {
                    return None;
                };
                Some(Zone {
                    direction,
                    low: block.low,
                    high: block.high,
                    index: k,
                    origin: block.timestamp,
                    formed_at: confirm.timestamp,
                })
            })
            .collect()
    }
}

/// Promotes order blocks to breaker blocks.
///
/// Within `search_window` bars after the block, the first bar that breaks
/// the band in the block's direction (high above it when bullish, low below
/// it when bearish) is the break of structure. If one of the next
/// `retest_window` bars then trades entirely inside the band, the block
/// becomes a breaker. Only the first break is considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerDetector {
    pub search_window: usize,
    pub retest_window: usize,
}

impl Default for BreakerDetector {
    fn default() -> Self {
        Self {
            search_window: 200,
            retest_window: 10,
        }
    }
}

impl BreakerDetector {
    /// Breaker zones for the given blocks. Each returned zone keeps the
    /// block's band, direction, index and origin; `formed_at` is the retest.
    pub fn detect(&self, candles: &[Candle], blocks: &[Zone]) -> Vec<Zone> {
        blocks
            .iter()
            .filter_map(|ob| {
                let retest = self.retest_index(candles, ob)?;
                Some(Zone {
                    formed_at: candles[retest].timestamp,
                    ..*ob
                })
            })
            .collect()
    }

    fn retest_index(&self, candles: &[Candle], ob: &Zone) -> Option<usize> {
        let n = candles.len();
        let search_end = n.min(ob.index + 1 + self.search_window);
        let brk = (ob.index + 1..search_end).find(|&j| match ob.direction {
            Direction::Bullish => candles[j].high > ob.high,
            Direction::Bearish => candles[j].low < ob.low,
        })?;

        let retest_end = n.min(brk + 1 + self.retest_window);
        (brk + 1..retest_end).find(|&k| candles[k].is_inside(ob.low, ob.high))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::testutil::{bar, ts};

    fn bullish_block_setup() -> Vec<Candle> {
        vec![
            bar(0, 1.050, 1.055, 1.040, 1.042), // bearish: the block
            bar(1, 1.042, 1.062, 1.041, 1.060), // closes above block open
            bar(2, 1.058, 1.063, 1.056, 1.060),
        ]
    }

    #[test]
    fn bullish_order_block_is_bearish_candle_before_reversal() {
        let obs = OrderBlockDetector.detect(&bullish_block_setup());
        assert_eq!(obs.len(), 1);
        let ob = obs[0];
        assert_eq!(ob.direction, Direction::Bullish);
        assert_eq!((ob.low, ob.high), (1.040, 1.055));
        assert_eq!(ob.index, 0);
        assert_eq!(ob.origin, ts(0));
        assert_eq!(ob.formed_at, ts(1));
    }

    #[test]
    fn reversal_needs_one_closed_bar_after_it() {
        let candles = bullish_block_setup();
        assert!(OrderBlockDetector.detect(&candles[..2]).is_empty());
    }

    #[test]
    fn reversal_one_bar_late_is_not_an_order_block() {
        let candles = vec![
            bar(0, 1.050, 1.055, 1.040, 1.042), // bearish
            bar(1, 1.042, 1.046, 1.038, 1.042), // doji in between
            bar(2, 1.042, 1.062, 1.041, 1.060), // would confirm bar 0
            bar(3, 1.058, 1.063, 1.056, 1.060),
        ];
        assert!(OrderBlockDetector.detect(&candles).is_empty());
    }

    #[test]
    fn weak_follow_through_is_not_an_order_block() {
        let mut candles = bullish_block_setup();
        candles[1] = bar(1, 1.044, 1.049, 1.043, 1.048); // bullish but below 1.050
        assert!(OrderBlockDetector.detect(&candles).is_empty());
    }

    #[test]
    fn bearish_order_block_mirrors_bullish() {
        let candles = vec![
            bar(0, 1.040, 1.052, 1.038, 1.050), // bullish: the block
            bar(1, 1.050, 1.051, 1.030, 1.032), // closes below block open
            bar(2, 1.032, 1.036, 1.028, 1.033),
        ];
        let obs = OrderBlockDetector.detect(&candles);
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].direction, Direction::Bearish);
        assert_eq!(obs[0].formed_at, ts(1));
    }

    #[test]
    fn break_then_retest_promotes_to_breaker() {
        let mut candles = bullish_block_setup(); // bar 1 high 1.062 breaks 1.055
        candles.push(bar(3, 1.052, 1.054, 1.045, 1.050)); // fully inside [1.040, 1.055]

        let obs = OrderBlockDetector.detect(&candles);
        assert_eq!(obs.len(), 1);
        let breakers = BreakerDetector::default().detect(&candles, &obs);
        assert_eq!(breakers.len(), 1);
        assert_eq!(breakers[0].origin, ts(0));
        assert_eq!(breakers[0].formed_at, ts(3));
        assert_eq!(breakers[0].direction, Direction::Bullish);
    }

    #[test]
    fn retest_outside_window_does_not_promote() {
        let mut candles = bullish_block_setup();
        candles.push(bar(3, 1.058, 1.070, 1.057, 1.065));
        candles.push(bar(4, 1.052, 1.054, 1.045, 1.050));

        let obs = OrderBlockDetector.detect(&candles);
        let detector = BreakerDetector {
            search_window: 200,
            retest_window: 2,
        };
        assert!(detector.detect(&candles, &obs).is_empty());
        assert_eq!(BreakerDetector::default().detect(&candles, &obs).len(), 1);
    }

    #[test]
    fn retest_without_break_is_not_a_breaker() {
        let candles = vec![
            bar(0, 1.050, 1.055, 1.040, 1.042),
            bar(1, 1.042, 1.055, 1.041, 1.054), // reverses but never trades above 1.055
            bar(2, 1.054, 1.055, 1.050, 1.052), // inside the band
        ];
        let obs = OrderBlockDetector.detect(&candles);
        assert_eq!(obs.len(), 1);
        assert!(BreakerDetector::default().detect(&candles, &obs).is_empty());
    }
}
