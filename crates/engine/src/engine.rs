use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use common::{
    Candle, CandlePayload, Clock, Direction, Error, Poi, PoiKind, Result, Signal, SignalAlert,
    Timeframe, TrendRow,
};
use smc::{invalidate, CandleSeries, FvgDetector, OrderBlockDetector, SmcConfig, SwingPoints};

/// Outcome of one `add_candles` batch. A bad record never blocks the rest.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub accepted: usize,
    /// Batch position and reason of every rejected record.
    pub rejected: Vec<(usize, Error)>,
}

impl IngestReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Outcome of one detect, validate, generate pass.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    pub new_pois: usize,
    pub invalidated: usize,
    pub signal: Option<Signal>,
}

/// Identity of a detected structure, so re-running detectors over a grown
/// series never records the same pattern twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PoiKey {
    kind: PoiKind,
    direction: Direction,
    timeframe: Timeframe,
    /// Origin timestamp in millis for zones, rounded level in ticks for pools.
    anchor: i64,
}

struct Detected {
    kind: PoiKind,
    direction: Direction,
    low: f64,
    high: f64,
    origin: DateTime<Utc>,
    formed_at: DateTime<Utc>,
    anchor: i64,
    touches: Option<u32>,
}

/// All detection state for one symbol: a candle series per timeframe and
/// the append-only POI list.
///
/// Not thread-safe by itself; the registry serialises access per symbol.
pub struct SmcEngine {
    symbol: String,
    config: Arc<SmcConfig>,
    clock: Arc<dyn Clock>,
    series: HashMap<Timeframe, CandleSeries>,
    pois: Vec<Poi>,
    seen: HashSet<PoiKey>,
    next_id: u64,
}

impl SmcEngine {
    pub fn new(symbol: impl Into<String>, config: Arc<SmcConfig>, clock: Arc<dyn Clock>) -> Self {
        let symbol = symbol.into();
        let series = config
            .engine
            .timeframes
            .iter()
            .map(|tf| (*tf, CandleSeries::new(symbol.clone(), *tf)))
            .collect();
        Self {
            symbol,
            config,
            clock,
            series,
            pois: Vec::new(),
            seen: HashSet::new(),
            next_id: 0,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn config(&self) -> &SmcConfig {
        &self.config
    }

    /// Validate and append raw candle records in order. Malformed and
    /// out-of-order records are rejected one by one; the rest still land.
    pub fn add_candles(&mut self, timeframe: Timeframe, records: Vec<Value>) -> IngestReport {
        let mut report = IngestReport::default();
        for (index, raw) in records.into_iter().enumerate() {
            let result = CandlePayload::from_value(raw)
                .and_then(Candle::try_from)
                .and_then(|candle| self.add_candle(timeframe, candle));
            match result {
                Ok(()) => report.accepted += 1,
                Err(e) => {
                    warn!(symbol = %self.symbol, %timeframe, index, error = %e, "Candle rejected");
                    report.rejected.push((index, e));
                }
            }
        }
        report
    }

    pub fn add_candle(&mut self, timeframe: Timeframe, candle: Candle) -> Result<()> {
        self.series
            .entry(timeframe)
            .or_insert_with(|| CandleSeries::new(self.symbol.clone(), timeframe))
            .append(candle)
    }

    pub fn candles(&self, timeframe: Timeframe) -> &[Candle] {
        self.series
            .get(&timeframe)
            .map(|s| s.candles())
            .unwrap_or(&[])
    }

    /// Every POI ever recorded, in creation order, invalidated ones included.
    pub fn pois(&self) -> &[Poi] {
        &self.pois
    }

    /// Drop all but the newest `keep_last` candles of one timeframe.
    /// POIs are history and are kept.
    pub fn trim(&mut self, timeframe: Timeframe, keep_last: usize) -> usize {
        let removed = self
            .series
            .get_mut(&timeframe)
            .map(|s| s.trim(keep_last))
            .unwrap_or(0);
        if removed > 0 {
            debug!(symbol = %self.symbol, %timeframe, removed, "Series trimmed");
        }
        removed
    }

    /// Run the gap, order-block, breaker and liquidity detectors over the
    /// series and record every structure not seen before. Returns how many
    /// POIs were added.
    pub fn run_detectors(&mut self, timeframe: Timeframe) -> usize {
        let Some(series) = self.series.get(&timeframe) else {
            return 0;
        };
        let candles = series.candles();
        let cfg = &self.config;

        let gaps = FvgDetector.detect(candles);
        let blocks = OrderBlockDetector.detect(candles);
        let breakers = cfg.order_block.detect(candles, &blocks);
        let pools = cfg.liquidity.detect(candles);

        let zone = |kind, z: &smc::Zone| Detected {
            kind,
            direction: z.direction,
            low: z.low,
            high: z.high,
            origin: z.origin,
            formed_at: z.formed_at,
            anchor: z.origin.timestamp_millis(),
            touches: None,
        };
        let mut found: Vec<Detected> = Vec::new();
        found.extend(gaps.iter().map(|z| zone(PoiKind::FairValueGap, z)));
        found.extend(blocks.iter().map(|z| zone(PoiKind::OrderBlock, z)));
        found.extend(breakers.iter().map(|z| zone(PoiKind::BreakerBlock, z)));
        found.extend(pools.iter().map(|p| Detected {
            kind: PoiKind::LiquidityPool,
            direction: p.direction,
            low: p.level,
            high: p.level,
            origin: p.first_seen,
            formed_at: p.last_seen,
            anchor: p.ticks,
            touches: Some(p.touches),
        }));

        let added = found
            .into_iter()
            .filter(|d| self.record(timeframe, d))
            .count();
        if added > 0 {
            debug!(symbol = %self.symbol, %timeframe, added, total = self.pois.len(), "Detectors ran");
        }
        added
    }

    fn record(&mut self, timeframe: Timeframe, d: &Detected) -> bool {
        let key = PoiKey {
            kind: d.kind,
            direction: d.direction,
            timeframe,
            anchor: d.anchor,
        };
        if !self.seen.insert(key) {
            return false;
        }

        // A breaker points back at the order block it was promoted from.
        let source = (d.kind == PoiKind::BreakerBlock)
            .then(|| {
                self.pois.iter().find(|p| {
                    p.kind == PoiKind::OrderBlock
                        && p.timeframe == timeframe
                        && p.direction == d.direction
                        && p.origin == d.origin
                })
            })
            .flatten()
            .map(|p| p.id);

        let poi = Poi {
            id: self.next_id,
            kind: d.kind,
            direction: d.direction,
            timeframe,
            low: d.low,
            high: d.high,
            validated: true,
            inverse: false,
            origin: d.origin,
            formed_at: d.formed_at,
            created_at: self.clock.now(),
            invalidated_at: None,
            source,
            touches: d.touches,
        };
        debug!(
            symbol = %self.symbol,
            id = poi.id,
            kind = %poi.kind,
            direction = %poi.direction,
            low = poi.low,
            high = poi.high,
            "POI recorded"
        );
        self.next_id += 1;
        self.pois.push(poi);
        true
    }

    /// Check every still-valid gap against the candles that closed after it
    /// formed. The first close inside the band invalidates it and appends the
    /// inverse gap. Inverse gaps are final and are skipped here: they are
    /// never invalidated or inverted again. Idempotent: a second call changes
    /// nothing.
    pub fn validate_pois(&mut self) -> usize {
        let now = self.clock.now();
        let mut invalidated = 0;

        for idx in 0..self.pois.len() {
            let poi = &self.pois[idx];
            if poi.kind != PoiKind::FairValueGap || poi.inverse || !poi.validated {
                continue;
            }
            let Some(series) = self.series.get(&poi.timeframe) else {
                continue;
            };
            let later = series.after(poi.formed_at);
            let Some(pos) = FvgDetector::first_fill(later, poi.low, poi.high) else {
                continue;
            };
            let filled_at = later[pos].timestamp;

            let (updated, inverse) = match invalidate(poi, self.next_id, filled_at, now) {
                Ok(t) => t,
                Err(e) => {
                    warn!(symbol = %self.symbol, error = %e, "Skipping POI invalidation");
                    continue;
                }
            };
            debug!(symbol = %self.symbol, id = updated.id, %filled_at, "FVG filled");
            self.pois[idx] = updated;
            if let Some(inverse) = inverse {
                debug!(
                    symbol = %self.symbol,
                    id = inverse.id,
                    source = ?inverse.source,
                    direction = %inverse.direction,
                    "Inverse FVG recorded"
                );
                self.next_id += 1;
                self.pois.push(inverse);
            }
            invalidated += 1;
        }
        invalidated
    }

    /// At most one signal from the current POI list.
    pub fn generate_signal(&self) -> Option<Signal> {
        let signal = self.config.signal.generate(&self.symbol, &self.pois)?;
        info!(
            symbol = %signal.symbol,
            side = %signal.side,
            entry = signal.entry,
            stop = signal.stop,
            target = signal.target,
            rr = signal.rr,
            confluence = signal.confluence_score,
            poi = signal.poi_id,
            "Signal generated"
        );
        Some(signal)
    }

    /// One trend row per configured timeframe, in configured order.
    pub fn trend_table(&self) -> Vec<TrendRow> {
        self.config
            .engine
            .timeframes
            .iter()
            .map(|tf| self.config.trend.score(*tf, self.candles(*tf)))
            .collect()
    }

    pub fn swings(&self, timeframe: Timeframe) -> SwingPoints {
        self.config.swing.detect(self.candles(timeframe))
    }

    /// Detect, validate, then look for a signal.
    pub fn evaluate(&mut self, timeframe: Timeframe) -> Evaluation {
        let new_pois = self.run_detectors(timeframe);
        let invalidated = self.validate_pois();
        let signal = self.generate_signal();
        Evaluation {
            new_pois,
            invalidated,
            signal,
        }
    }

    /// Read-only snapshot handed to alert collaborators with `signal`.
    pub fn alert(&self, signal: Signal, timeframe: Timeframe) -> SignalAlert {
        SignalAlert {
            signal,
            trend: self.trend_table(),
            pois: self.pois.clone(),
            timeframe,
            candles: self.candles(timeframe).to_vec(),
        }
    }
}
