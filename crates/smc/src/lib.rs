pub mod config;
pub mod detectors;
pub mod indicators;
pub mod poi;
pub mod series;
pub mod signal;
pub mod trend;

pub use config::{EngineSettings, SmcConfig};
pub use detectors::{
    BreakerDetector, FvgDetector, LiquidityDetector, LiquidityPool, OrderBlockDetector,
    SwingDetector, SwingPoint, SwingPoints, Zone,
};
pub use poi::invalidate;
pub use series::CandleSeries;
pub use signal::{confluence, Selection, SignalGenerator};
pub use trend::TrendScorer;
