use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

// ─── Candles ──────────────────────────────────────────────────────────────────

/// One OHLCV bar. Only built through [`Candle::new`] or from a
/// [`CandlePayload`], both of which enforce OHLC consistency. Serialize
/// only: incoming candles always go through the payload schema.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self> {
        for (field, value) in [
            ("open", open),
            ("high", high),
            ("low", low),
            ("close", close),
            ("volume", volume),
        ] {
            if !value.is_finite() {
                return Err(Error::malformed(field, format!("{value} is not finite")));
            }
        }
        if volume < 0.0 {
            return Err(Error::malformed("volume", format!("{volume} is negative")));
        }
        if high < open.max(close) {
            return Err(Error::malformed(
                "high",
                format!("{high} is below the candle body"),
            ));
        }
        if low > open.min(close) {
            return Err(Error::malformed(
                "low",
                format!("{low} is above the candle body"),
            ));
        }

        Ok(Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// True when the whole bar, wicks included, sits inside `[low, high]`.
    pub fn is_inside(&self, low: f64, high: f64) -> bool {
        self.low >= low && self.high <= high
    }
}

/// Loosely-typed candle as it arrives over the wire.
///
/// Every field is optional here; [`Candle::try_from`] is the single place
/// where presence, numeric coercion and OHLC consistency are checked.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandlePayload {
    #[serde(default, alias = "timestamp")]
    pub time: Option<Value>,
    #[serde(default)]
    pub open: Option<Value>,
    #[serde(default)]
    pub high: Option<Value>,
    #[serde(default)]
    pub low: Option<Value>,
    #[serde(default)]
    pub close: Option<Value>,
    /// Missing volume is read as zero.
    #[serde(default)]
    pub volume: Option<Value>,
}

impl CandlePayload {
    /// Interpret one element of a candle batch.
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::malformed("candle", "expected a JSON object"));
        }
        serde_json::from_value(value).map_err(|e| Error::malformed("candle", e.to_string()))
    }
}

impl TryFrom<CandlePayload> for Candle {
    type Error = Error;

    fn try_from(p: CandlePayload) -> Result<Self> {
        let timestamp = parse_time(p.time.as_ref())?;
        let open = parse_number("open", p.open.as_ref())?;
        let high = parse_number("high", p.high.as_ref())?;
        let low = parse_number("low", p.low.as_ref())?;
        let close = parse_number("close", p.close.as_ref())?;
        let volume = match p.volume.as_ref() {
            None | Some(Value::Null) => 0.0,
            Some(v) => parse_number("volume", Some(v))?,
        };
        Candle::new(timestamp, open, high, low, close, volume)
    }
}

const NAIVE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

fn parse_time(value: Option<&Value>) -> Result<DateTime<Utc>> {
    match value {
        None | Some(Value::Null) => Err(Error::malformed("time", "missing")),
        Some(Value::String(s)) => {
            let s = s.trim();
            if let Ok(t) = DateTime::parse_from_rfc3339(s) {
                return Ok(t.with_timezone(&Utc));
            }
            // Zone-less ISO timestamps are taken as UTC.
            NAIVE_TIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|naive| naive.and_utc())
                .ok_or_else(|| Error::malformed("time", format!("unparseable timestamp '{s}'")))
        }
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or_else(|| Error::malformed("time", format!("{n} is not a unix timestamp"))),
        Some(other) => Err(Error::malformed(
            "time",
            format!("expected a string or number, got {other}"),
        )),
    }
}

fn parse_number(field: &'static str, value: Option<&Value>) -> Result<f64> {
    match value {
        None | Some(Value::Null) => Err(Error::malformed(field, "missing")),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| Error::malformed(field, format!("{n} is not representable"))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::malformed(field, format!("'{s}' is not numeric"))),
        Some(other) => Err(Error::malformed(
            field,
            format!("expected a number, got {other}"),
        )),
    }
}

// ─── Timeframes ───────────────────────────────────────────────────────────────

/// Candle granularity. Each timeframe is ingested and stored on its own;
/// nothing is aggregated from lower timeframes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Timeframe {
    M1,
    M3,
    M5,
    M15,
    M30,
    H1,
    H4,
    #[serde(alias = "D")]
    D1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 8] = [
        Timeframe::M1,
        Timeframe::M3,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "M1",
            Timeframe::M3 => "M3",
            Timeframe::M5 => "M5",
            Timeframe::M15 => "M15",
            Timeframe::M30 => "M30",
            Timeframe::H1 => "H1",
            Timeframe::H4 => "H4",
            Timeframe::D1 => "D1",
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Timeframe {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_uppercase();
        if upper == "D" {
            return Ok(Timeframe::D1);
        }
        Timeframe::ALL
            .into_iter()
            .find(|tf| tf.as_str() == upper)
            .ok_or_else(|| Error::UnknownTimeframe(s.to_string()))
    }
}

// ─── Directions ───────────────────────────────────────────────────────────────

/// Expected price reaction at a structural zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Bullish => Direction::Bearish,
            Direction::Bearish => Direction::Bullish,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Bullish => write!(f, "bullish"),
            Direction::Bearish => write!(f, "bearish"),
        }
    }
}

/// Trade side of a [`Signal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl From<Direction> for Side {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Bullish => Side::Long,
            Direction::Bearish => Side::Short,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}

// ─── Points of interest ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoiKind {
    FairValueGap,
    OrderBlock,
    BreakerBlock,
    LiquidityPool,
}

impl PoiKind {
    /// Kinds a trade can be anchored on. Liquidity pools only add confluence.
    pub fn is_tradeable(self) -> bool {
        !matches!(self, PoiKind::LiquidityPool)
    }
}

impl std::fmt::Display for PoiKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoiKind::FairValueGap => write!(f, "FVG"),
            PoiKind::OrderBlock => write!(f, "OB"),
            PoiKind::BreakerBlock => write!(f, "BB"),
            PoiKind::LiquidityPool => write!(f, "Liquidity"),
        }
    }
}

/// A detected structural price zone.
///
/// Records are never edited in place: invalidation produces a replacement
/// record with `validated == false` (and possibly a new inverse record), so
/// the POI list reads as an audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poi {
    /// Sequential per engine, in creation order.
    pub id: u64,
    pub kind: PoiKind,
    pub direction: Direction,
    pub timeframe: Timeframe,
    pub low: f64,
    pub high: f64,
    pub validated: bool,
    /// Set on inverse FVGs, which are not inverted a second time.
    pub inverse: bool,
    /// Timestamp of the candle the zone was derived from.
    pub origin: DateTime<Utc>,
    /// Timestamp of the candle that completed the pattern. Later candles
    /// are the ones that can invalidate it.
    pub formed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub invalidated_at: Option<DateTime<Utc>>,
    /// For an inverse FVG, the gap it came from; for a breaker, its order block.
    pub source: Option<u64>,
    /// Number of equal highs/lows behind a liquidity pool.
    pub touches: Option<u32>,
}

impl Poi {
    pub fn contains(&self, price: f64) -> bool {
        price >= self.low && price <= self.high
    }

    pub fn width(&self) -> f64 {
        self.high - self.low
    }
}

// ─── Trend table ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendLabel {
    Bull,
    Bear,
    Sideways,
    Unknown,
}

impl std::fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendLabel::Bull => write!(f, "Bull"),
            TrendLabel::Bear => write!(f, "Bear"),
            TrendLabel::Sideways => write!(f, "Sideways"),
            TrendLabel::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Raw indicator readings behind a [`TrendRow`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendDetails {
    pub fast_ema: f64,
    pub slow_ema: f64,
    pub slope: f64,
    pub current_close: f64,
    pub up_close_pct: f64,
}

/// Trend verdict for one timeframe. Built fresh on every evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendRow {
    pub timeframe: Timeframe,
    pub trend: TrendLabel,
    /// 0..=100
    pub confidence: u8,
    pub reasons: Vec<String>,
    pub details: Option<TrendDetails>,
}

// ─── Signals ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfluenceFactor {
    Fvg,
    OrderBlock,
    BreakerBlock,
    LiquiditySweep,
}

impl ConfluenceFactor {
    pub const ALL: [ConfluenceFactor; 4] = [
        ConfluenceFactor::Fvg,
        ConfluenceFactor::OrderBlock,
        ConfluenceFactor::BreakerBlock,
        ConfluenceFactor::LiquiditySweep,
    ];

    pub fn kind(self) -> PoiKind {
        match self {
            ConfluenceFactor::Fvg => PoiKind::FairValueGap,
            ConfluenceFactor::OrderBlock => PoiKind::OrderBlock,
            ConfluenceFactor::BreakerBlock => PoiKind::BreakerBlock,
            ConfluenceFactor::LiquiditySweep => PoiKind::LiquidityPool,
        }
    }
}

impl std::fmt::Display for ConfluenceFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfluenceFactor::Fvg => write!(f, "fvg"),
            ConfluenceFactor::OrderBlock => write!(f, "order_block"),
            ConfluenceFactor::BreakerBlock => write!(f, "breaker_block"),
            ConfluenceFactor::LiquiditySweep => write!(f, "liquidity_sweep"),
        }
    }
}

/// An actionable trade idea. Terminal output: nothing refers back to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub side: Side,
    pub entry: f64,
    pub stop: f64,
    pub target: f64,
    /// |target − entry| / |entry − stop|
    pub rr: f64,
    pub confluence: BTreeMap<ConfluenceFactor, bool>,
    /// Always the number of `true` entries in `confluence`.
    pub confluence_score: u32,
    /// The POI the trade is anchored on.
    pub poi_id: u64,
    pub timeframe: Timeframe,
}

impl Signal {
    /// Build a signal, deriving `rr` and `confluence_score`.
    ///
    /// Fails with [`Error::InvalidSignal`] when entry equals stop or the
    /// resulting ratio is not a positive finite number.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: impl Into<String>,
        side: Side,
        entry: f64,
        stop: f64,
        target: f64,
        confluence: BTreeMap<ConfluenceFactor, bool>,
        poi_id: u64,
        timeframe: Timeframe,
    ) -> Result<Self> {
        let risk = (entry - stop).abs();
        if risk == 0.0 {
            return Err(Error::InvalidSignal(format!(
                "entry equals stop ({entry}) on POI {poi_id}"
            )));
        }
        let rr = (target - entry).abs() / risk;
        if !rr.is_finite() || rr <= 0.0 {
            return Err(Error::InvalidSignal(format!(
                "risk-reward {rr} on POI {poi_id} is not positive"
            )));
        }
        let confluence_score = confluence.values().filter(|&&v| v).count() as u32;

        Ok(Self {
            symbol: symbol.into(),
            side,
            entry,
            stop,
            target,
            rr,
            confluence,
            confluence_score,
            poi_id,
            timeframe,
        })
    }
}
