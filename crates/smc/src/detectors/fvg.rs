use common::{Candle, Direction};

use super::Zone;

/// Three-candle imbalance (fair value gap) detector.
///
/// For every consecutive triple `(b1, b2, b3)`:
/// - bullish gap when `b1.low > b3.high`, band `[b3.high, b1.low]`
/// - bearish gap when `b1.high < b3.low`, band `[b1.high, b3.low]`
#[derive(Debug, Clone, Copy, Default)]
pub struct FvgDetector;

impl FvgDetector {
    pub fn detect(&self, candles: &[Candle]) -> Vec<Zone> {
        candles
            .windows(3)
            .enumerate()
            .filter_map(|(i, w)| {
                let (b1, b3) = (&w[0], &w[2]);
                let (direction, low, high) = if b1.low > b3.high {
                    (Direction::Bullish, b3.high, b1.low)
                } else if b1.high < b3.low {
                    (Direction::Bearish, b1.high, b3.low)
                } else {
                    return None;
                };
                Some(Zone {
                    direction,
                    low,
                    high,
                    index: i,
                    origin: b1.timestamp,
                    formed_at: b3.timestamp,
                })
            })
            .collect()
    }

    /// Position in `later` of the first candle closing inside `[low, high]`
    /// (inclusive). `later` must start after the gap's third candle.
    pub fn first_fill(later: &[Candle], low: f64, high: f64) -> Option<usize> {
        later.iter().position(|c| c.close >= low && c.close <= high)
    }

    /// Gaps as they stand at the end of `candles`: an open gap as detected,
    /// a filled one replaced by its inverse (opposite direction, same band,
    /// formed on the filling candle). Inverse gaps are final.
    pub fn active(&self, candles: &[Candle]) -> Vec<Zone> {
        self.detect(candles)
            .into_iter()
            .map(|g| {
                let later = &candles[g.index + 3..];
                match Self::first_fill(later, g.low, g.high) {
                    None => g,
                    Some(pos) => Zone {
                        direction: g.direction.opposite(),
                        formed_at: later[pos].timestamp,
                        ..g
                    },
                }
            })
            .collect()
    }
}
