use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::Timeframe;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Malformed candle: {field}: {reason}")]
    MalformedCandle { field: &'static str, reason: String },

    #[error("Out-of-order candle on {symbol} {timeframe}: {timestamp} is not after {last}")]
    OutOfOrderCandle {
        symbol: String,
        timeframe: Timeframe,
        timestamp: DateTime<Utc>,
        last: DateTime<Utc>,
    },

    #[error("Invalid signal: {0}")]
    InvalidSignal(String),

    #[error("POI {0} is already invalidated")]
    PoiAlreadyInvalid(u64),

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Unknown timeframe: {0}")]
    UnknownTimeframe(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub(crate) fn malformed(field: &'static str, reason: impl Into<String>) -> Self {
        Error::MalformedCandle {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
