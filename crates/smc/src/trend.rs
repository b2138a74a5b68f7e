use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use common::{Candle, Direction, Timeframe, TrendDetails, TrendLabel, TrendRow};

use crate::detectors::{FvgDetector, OrderBlockDetector, SwingDetector, SwingPoint};
use crate::indicators::{last_crossover, Crossover, Ema};

const SLOPE_POINTS: i32 = 25;
const CROSSOVER_POINTS: i32 = 20;
const PRICE_VS_MA_POINTS: i32 = 15;
const UP_CLOSE_POINTS: i32 = 10;
const STRUCTURE_POINTS: i32 = 15;
const POI_SUPPORT_POINTS: i32 = 15;

/// Sum of all weights: scores live in `[-MAX_SCORE, MAX_SCORE]`.
pub const MAX_SCORE: i32 = SLOPE_POINTS
    + CROSSOVER_POINTS
    + PRICE_VS_MA_POINTS
    + UP_CLOSE_POINTS
    + STRUCTURE_POINTS
    + POI_SUPPORT_POINTS;

/// Confidence at or beyond which a directional label is given.
const LABEL_CONFIDENCE: u8 = 60;

pub const INSUFFICIENT_DATA: &str = "Insufficient data";

/// Weighted trend vote over the most recent `lookback` candles of one
/// timeframe. A pure function of the window: same candles, same row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendScorer {
    pub lookback: usize,
    pub min_bars: usize,
    pub fast_span: usize,
    pub slow_span: usize,
    pub slope_threshold: f64,
    pub crossover_bars: usize,
    /// Swing radius used for the structure vote.
    pub structure_radius: usize,
}

impl Default for TrendScorer {
    fn default() -> Self {
        Self {
            lookback: 50,
            min_bars: 10,
            fast_span: 8,
            slow_span: 34,
            slope_threshold: 0.0005,
            crossover_bars: 10,
            structure_radius: 2,
        }
    }
}

impl TrendScorer {
    pub fn score(&self, timeframe: Timeframe, candles: &[Candle]) -> TrendRow {
        let window = &candles[candles.len().saturating_sub(self.lookback)..];
        if window.len() < self.min_bars.max(2) {
            return TrendRow {
                timeframe,
                trend: TrendLabel::Unknown,
                confidence: 0,
                reasons: vec![INSUFFICIENT_DATA.to_string()],
                details: None,
            };
        }

        let closes: Vec<f64> = window.iter().map(|c| c.close).collect();
        let fast = Ema::new(self.fast_span).series(&closes);
        let slow = Ema::new(self.slow_span).series(&closes);
        let last = closes.len() - 1;
        let (fast_ema, slow_ema, current_close) = (fast[last], slow[last], closes[last]);

        // (signed points, reason)
        let mut votes: Vec<(i32, String)> = Vec::new();

        let slope = if slow_ema != 0.0 {
            (fast_ema - slow_ema) / slow_ema
        } else {
            0.0
        };
        if slope > self.slope_threshold {
            votes.push((SLOPE_POINTS, "MA slope bullish".into()));
        } else if slope < -self.slope_threshold {
            votes.push((-SLOPE_POINTS, "MA slope bearish".into()));
        }

        match last_crossover(&fast, &slow, self.crossover_bars) {
            Some((_, Crossover::Bullish)) => {
                votes.push((CROSSOVER_POINTS, "Recent MA crossover bullish".into()))
            }
            Some((_, Crossover::Bearish)) => {
                votes.push((-CROSSOVER_POINTS, "Recent MA crossover bearish".into()))
            }
            None => {}
        }

        match current_close.partial_cmp(&slow_ema) {
            Some(Ordering::Greater) => {
                votes.push((PRICE_VS_MA_POINTS, "Price above long MA".into()))
            }
            Some(Ordering::Less) => {
                votes.push((-PRICE_VS_MA_POINTS, "Price below long MA".into()))
            }
            _ => {}
        }

        let up_closes = closes.windows(2).filter(|w| w[1] > w[0]).count();
        let up_close_pct = up_closes as f64 / closes.len() as f64 * 100.0;
        if up_close_pct > 60.0 {
            votes.push((UP_CLOSE_POINTS, "Strong bullish candles ratio".into()));
        } else if up_close_pct < 40.0 {
            votes.push((-UP_CLOSE_POINTS, "Strong bearish candles ratio".into()));
        }

        match self.structure(window) {
            Some(Direction::Bullish) => {
                votes.push((STRUCTURE_POINTS, "Market structure bullish (HH/HL)".into()))
            }
            Some(Direction::Bearish) => {
                votes.push((-STRUCTURE_POINTS, "Market structure bearish (LH/LL)".into()))
            }
            None => {}
        }

        // Zones only back the direction the other votes already lean.
        let lean: i32 = votes.iter().map(|(p, _)| p).sum();
        let lean = match lean.signum() {
            1 => Some(Direction::Bullish),
            -1 => Some(Direction::Bearish),
            _ => None,
        };
        let support = lean.map_or(0, |d| poi_support(window, current_close, d));
        if support > 0 {
            votes.push((POI_SUPPORT_POINTS, format!("POI support count={support}")));
        }

        let score: i32 = votes.iter().map(|(p, _)| p).sum();
        let confidence = confidence(score);
        let trend = if confidence >= LABEL_CONFIDENCE && score > 0 {
            TrendLabel::Bull
        } else if confidence <= 100 - LABEL_CONFIDENCE && score < 0 {
            TrendLabel::Bear
        } else {
            TrendLabel::Sideways
        };

        // Heaviest contributions first; equal weights keep evaluation order.
        votes.sort_by_key(|(p, _)| std::cmp::Reverse(p.abs()));

        TrendRow {
            timeframe,
            trend,
            confidence,
            reasons: votes.into_iter().map(|(_, r)| r).collect(),
            details: Some(TrendDetails {
                fast_ema,
                slow_ema,
                slope,
                current_close,
                up_close_pct,
            }),
        }
    }

    /// Compare the last two swing highs and the last two swing lows.
    /// Bullish when at least one side is higher and neither is lower.
    fn structure(&self, window: &[Candle]) -> Option<Direction> {
        let swings =
            SwingDetector::new(self.structure_radius, self.structure_radius).detect(window);
        let highs = last_two(&swings.highs);
        let lows = last_two(&swings.lows);

        let bullish = highs == Some(Ordering::Greater) || lows == Some(Ordering::Greater);
        let bearish = highs == Some(Ordering::Less) || lows == Some(Ordering::Less);
        match (bullish, bearish) {
            (true, false) => Some(Direction::Bullish),
            (false, true) => Some(Direction::Bearish),
            _ => None,
        }
    }
}

/// Map a score in `[-MAX_SCORE, MAX_SCORE]` onto `0..=100`.
pub fn confidence(score: i32) -> u8 {
    let clamped = score.clamp(-MAX_SCORE, MAX_SCORE);
    let norm = f64::from(clamped + MAX_SCORE) * 100.0 / f64::from(2 * MAX_SCORE);
    norm.round() as u8
}

fn last_two(points: &[SwingPoint]) -> Option<Ordering> {
    match points {
        [.., prev, last] => last.price.partial_cmp(&prev.price),
        _ => None,
    }
}

/// Gaps (inverse gaps included) and order blocks of `direction` that are
/// active at the end of the window and whose band holds the current close.
fn poi_support(window: &[Candle], close: f64, direction: Direction) -> usize {
    let gaps = FvgDetector.active(window);
    let blocks = OrderBlockDetector.detect(window);
    gaps.iter()
        .chain(blocks.iter())
        .filter(|z| z.direction == direction && z.contains(close))
        .count()
}
