//! Structural pattern detectors.
//!
//! Every detector is a pure function of a candle slice (oldest first). They
//! are re-run over the whole series on each update and return positions and
//! bands only; turning those into POI records is the engine's job.

pub mod fvg;
pub mod liquidity;
pub mod order_block;
pub mod swing;

use chrono::{DateTime, Utc};

use common::Direction;

pub use fvg::FvgDetector;
pub use liquidity::{LiquidityDetector, LiquidityPool};
pub use order_block::{BreakerDetector, OrderBlockDetector};
pub use swing::{SwingDetector, SwingPoint, SwingPoints};

/// A directional price band found at a position in a candle slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zone {
    pub direction: Direction,
    pub low: f64,
    pub high: f64,
    /// Slice index of the candle the band is anchored on.
    pub index: usize,
    /// Timestamp of that candle.
    pub origin: DateTime<Utc>,
    /// Timestamp of the last candle needed to confirm the pattern.
    pub formed_at: DateTime<Utc>,
}

impl Zone {
    pub fn contains(&self, price: f64) -> bool {
        price >= self.low && price <= self.high
    }
}
