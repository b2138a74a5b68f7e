use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use common::{ConfluenceFactor, Direction, Poi, Result, Side, Signal};

/// Which qualifying POI wins when several reach the confluence threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
    /// The earliest-created qualifying POI.
    #[default]
    First,
    /// The qualifying POI with the highest confluence score; the earliest on ties.
    Best,
}

/// Turns the POI list into at most one trade signal per call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalGenerator {
    pub min_confluence: u32,
    /// Target distance as a multiple of the entry-to-stop distance.
    pub reward_multiple: f64,
    pub selection: Selection,
}

impl Default for SignalGenerator {
    fn default() -> Self {
        Self {
            min_confluence: 2,
            reward_multiple: 1.5,
            selection: Selection::First,
        }
    }
}

impl SignalGenerator {
    /// Scan `pois` in creation order. Candidates are validated FVGs, order
    /// blocks and breakers; a candidate whose band has zero width is
    /// skipped, never propagated as an error.
    pub fn generate(&self, symbol: &str, pois: &[Poi]) -> Option<Signal> {
        let mut candidates = pois
            .iter()
            .filter(|p| p.validated && p.kind.is_tradeable())
            .filter_map(|p| self.build(symbol, p, pois).ok())
            .filter(|s| s.confluence_score >= self.min_confluence);

        match self.selection {
            Selection::First => candidates.next(),
            Selection::Best => candidates.fold(None, |best: Option<Signal>, s| match best {
                Some(b) if b.confluence_score >= s.confluence_score => Some(b),
                _ => Some(s),
            }),
        }
    }

    fn build(&self, symbol: &str, poi: &Poi, pois: &[Poi]) -> Result<Signal> {
        let (entry, stop) = match poi.direction {
            Direction::Bullish => (poi.low, poi.high),
            Direction::Bearish => (poi.high, poi.low),
        };
        let reward = self.reward_multiple * (entry - stop).abs();
        let target = match poi.direction {
            Direction::Bullish => entry + reward,
            Direction::Bearish => entry - reward,
        };

        Signal::new(
            symbol,
            Side::from(poi.direction),
            entry,
            stop,
            target,
            confluence(pois, poi.direction),
            poi.id,
            poi.timeframe,
        )
    }
}

/// For each factor: does any validated POI of that kind point in `direction`?
pub fn confluence(pois: &[Poi], direction: Direction) -> BTreeMap<ConfluenceFactor, bool> {
    ConfluenceFactor::ALL
        .into_iter()
        .map(|factor| {
            let hit = pois
                .iter()
                .any(|p| p.validated && p.kind == factor.kind() && p.direction == direction);
            (factor, hit)
        })
        .collect()
}
