use std::path::Path;

use serde::{Deserialize, Serialize};

use common::{Error, Result, Timeframe};

use crate::detectors::{BreakerDetector, LiquidityDetector, SwingDetector};
use crate::signal::SignalGenerator;
use crate::trend::TrendScorer;

const MAX_PRECISION: u32 = 10;

/// Detector configuration file (TOML). Every key is optional.
///
/// Example `config/smc.toml`:
/// ```toml
/// [engine]
/// primary_timeframe = "M15"
/// timeframes = ["M1", "M5", "M15", "H1", "H4"]
///
/// [order_block]
/// search_window = 200
/// retest_window = 10
///
/// [signal]
/// min_confluence = 2
/// selection = "first"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SmcConfig {
    pub engine: EngineSettings,
    pub swing: SwingDetector,
    pub order_block: BreakerDetector,
    pub liquidity: LiquidityDetector,
    pub trend: TrendScorer,
    pub signal: SignalGenerator,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Timeframe a webhook payload is assumed to carry when it names none.
    pub primary_timeframe: Timeframe,
    /// Timeframes kept per symbol and reported in the trend table, in order.
    pub timeframes: Vec<Timeframe>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            primary_timeframe: Timeframe::M15,
            timeframes: vec![
                Timeframe::M1,
                Timeframe::M5,
                Timeframe::M15,
                Timeframe::H1,
                Timeframe::H4,
            ],
        }
    }
}

impl SmcConfig {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let mut cfg: SmcConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject parameter combinations the detectors cannot work with, and
    /// make sure the primary timeframe is among the tracked ones.
    pub fn validate(&mut self) -> Result<()> {
        if self.swing.left == 0 || self.swing.right == 0 {
            return Err(Error::Config("swing.left and swing.right must be >= 1".into()));
        }
        if self.order_block.search_window == 0 || self.order_block.retest_window == 0 {
            return Err(Error::Config(
                "order_block windows must be >= 1 bar".into(),
            ));
        }
        if self.liquidity.lookback < 2 {
            return Err(Error::Config("liquidity.lookback must be >= 2".into()));
        }
        // Rounded levels are kept as i64 ticks.
        if self.liquidity.precision > MAX_PRECISION {
            return Err(Error::Config(format!(
                "liquidity.precision must be <= {MAX_PRECISION}"
            )));
        }
        let t = &self.trend;
        if t.min_bars < 2 || t.lookback < t.min_bars {
            return Err(Error::Config(
                "trend.min_bars must be >= 2 and <= trend.lookback".into(),
            ));
        }
        if t.fast_span == 0 || t.fast_span >= t.slow_span {
            return Err(Error::Config(
                "trend.fast_span must be >= 1 and below trend.slow_span".into(),
            ));
        }
        if !(self.signal.reward_multiple.is_finite() && self.signal.reward_multiple > 0.0) {
            return Err(Error::Config("signal.reward_multiple must be positive".into()));
        }

        let mut seen = Vec::new();
        self.engine.timeframes.retain(|tf| {
            let fresh = !seen.contains(tf);
            seen.push(*tf);
            fresh
        });
        if !self.engine.timeframes.contains(&self.engine.primary_timeframe) {
            self.engine.timeframes.push(self.engine.primary_timeframe);
        }
        Ok(())
    }
}
