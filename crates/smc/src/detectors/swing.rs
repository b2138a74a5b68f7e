use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::Candle;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwingPoint {
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SwingPoints {
    pub highs: Vec<SwingPoint>,
    pub lows: Vec<SwingPoint>,
}

impl SwingPoints {
    pub fn high_times(&self) -> Vec<DateTime<Utc>> {
        self.highs.iter().map(|p| p.timestamp).collect()
    }

    pub fn low_times(&self) -> Vec<DateTime<Utc>> {
        self.lows.iter().map(|p| p.timestamp).collect()
    }
}

/// Local extrema over the closed window `[i - left, i + right]`.
///
/// Candles closer than `left` to the start or `right` to the end can never
/// qualify. On a tie the earliest candle holding the extreme wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwingDetector {
    pub left: usize,
    pub right: usize,
}

impl Default for SwingDetector {
    fn default() -> Self {
        Self { left: 3, right: 3 }
    }
}

impl SwingDetector {
    pub fn new(left: usize, right: usize) -> Self {
        Self { left, right }
    }

    pub fn detect(&self, candles: &[Candle]) -> SwingPoints {
        let mut points = SwingPoints::default();
        let n = candles.len();
        if n < self.left + self.right + 1 {
            return points;
        }

        for i in self.left..n - self.right {
            let window = &candles[i - self.left..=i + self.right];
            if first_extreme(window, |c| c.high, |a, b| a > b) == self.left {
                points.highs.push(SwingPoint {
                    index: i,
                    timestamp: candles[i].timestamp,
                    price: candles[i].high,
                });
            }
            if first_extreme(window, |c| c.low, |a, b| a < b) == self.left {
                points.lows.push(SwingPoint {
                    index: i,
                    timestamp: candles[i].timestamp,
                    price: candles[i].low,
                });
            }
        }
        points
    }
}

/// Index of the first candle in `window` whose value no other beats.
fn first_extreme(
    window: &[Candle],
    value: impl Fn(&Candle) -> f64,
    beats: impl Fn(f64, f64) -> bool,
) -> usize {
    let mut best = 0;
    for (i, c) in window.iter().enumerate().skip(1) {
        if beats(value(c), value(&window[best])) {
            best = i;
        }
    }
    best
}
