use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use common::{Error, Timeframe};

use crate::{auth::require_auth, AppState};

pub fn webhook_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/webhook", post(webhook))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

fn reject(status: StatusCode, error: impl Into<String>) -> Response {
    (status, Json(json!({"status": "error", "error": error.into()}))).into_response()
}

/// Candle push: `{symbol, timeframe?, candles: [...]}`. Runs one full
/// ingest, detect, validate, signal cycle for the symbol.
async fn webhook(State(state): State<AppState>, body: Result<Json<Value>, JsonRejection>) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return reject(StatusCode::BAD_REQUEST, e.body_text()),
    };

    let symbol = match body.get("symbol").and_then(Value::as_str).map(str::trim) {
        Some(s) if !s.is_empty() => s.to_uppercase(),
        _ => return reject(StatusCode::BAD_REQUEST, "missing symbol"),
    };
    let candles = match body.get("candles").and_then(Value::as_array) {
        Some(c) if !c.is_empty() => c.clone(),
        _ => return reject(StatusCode::BAD_REQUEST, "missing candles"),
    };
    let timeframe = match body.get("timeframe").and_then(Value::as_str) {
        None => state.registry.config().engine.primary_timeframe,
        Some(raw) => match raw.parse::<Timeframe>() {
            Ok(tf) => tf,
            Err(e) => return reject(StatusCode::BAD_REQUEST, e.to_string()),
        },
    };

    let outcome = match state.registry.ingest(&symbol, timeframe, candles).await {
        Ok(o) => o,
        Err(Error::UnknownSymbol(_)) => {
            warn!(%symbol, "Webhook for unsupported symbol");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"status": "symbol_not_supported", "symbol": symbol})),
            )
                .into_response();
        }
        Err(e) => {
            error!(%symbol, error = %e, "Webhook cycle failed");
            return reject(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    let rejected: Vec<Value> = outcome
        .report
        .rejected
        .iter()
        .map(|(index, e)| json!({"index": index, "error": e.to_string()}))
        .collect();
    let status = if outcome.signal.is_some() {
        "signal_sent"
    } else {
        "no_signal"
    };
    info!(
        symbol = %outcome.symbol,
        %timeframe,
        accepted = outcome.report.accepted,
        rejected = rejected.len(),
        new_pois = outcome.new_pois,
        status,
        "Webhook processed"
    );

    Json(json!({
        "status": status,
        "symbol": outcome.symbol,
        "timeframe": timeframe,
        "accepted": outcome.report.accepted,
        "rejected": rejected,
        "new_pois": outcome.new_pois,
        "invalidated": outcome.invalidated,
        "signal": outcome.signal,
    }))
    .into_response()
}
