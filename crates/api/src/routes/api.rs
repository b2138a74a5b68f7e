use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use common::{Error, PoiKind};

use crate::{auth::require_auth, AppState};

pub fn api_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/symbols", get(get_symbols))
        .route("/api/trend/:symbol", get(get_trend))
        .route("/api/pois/:symbol", get(get_pois))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

fn lookup_failed(e: Error) -> Response {
    let status = match e {
        Error::UnknownSymbol(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({"status": "error", "error": e.to_string()}))).into_response()
}

async fn get_symbols(State(state): State<AppState>) -> Response {
    Json(json!({ "symbols": state.registry.symbols().await })).into_response()
}

// ─── Trend ────────────────────────────────────────────────────────────────────

async fn get_trend(State(state): State<AppState>, Path(symbol): Path<String>) -> Response {
    match state.registry.trend_table(&symbol).await {
        Ok(rows) => Json(json!({ "symbol": symbol.to_uppercase(), "trend": rows })).into_response(),
        Err(e) => lookup_failed(e),
    }
}

// ─── POIs ─────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct PoiQuery {
    /// Only currently validated POIs.
    #[serde(default)]
    valid: bool,
    kind: Option<PoiKind>,
}

async fn get_pois(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(q): Query<PoiQuery>,
) -> Response {
    let pois = match state.registry.pois(&symbol).await {
        Ok(p) => p,
        Err(e) => return lookup_failed(e),
    };
    let pois: Vec<_> = pois
        .into_iter()
        .filter(|p| !q.valid || p.validated)
        .filter(|p| q.kind.map_or(true, |k| p.kind == k))
        .collect();

    Json(json!({
        "symbol": symbol.to_uppercase(),
        "total": pois.len(),
        "pois": pois,
    }))
    .into_response()
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::testutil::{send, signal_candles, state};

    #[tokio::test]
    async fn symbols_are_listed_sorted() {
        let (status, body) = send(state(None), "GET", "/api/symbols", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbols"], json!(["EURUSD", "XAUUSD"]));
    }

    #[tokio::test]
    async fn trend_rows_follow_configured_timeframes() {
        let (status, body) = send(state(None), "GET", "/api/trend/eurusd", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let rows = body["trend"].as_array().unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0]["timeframe"], "M1");
        assert_eq!(rows[0]["trend"], "Unknown");
        assert_eq!(rows[0]["reasons"], json!(["Insufficient data"]));
    }

    #[tokio::test]
    async fn pois_can_be_filtered() {
        let state = state(None);
        let body = json!({"symbol": "EURUSD", "candles": signal_candles()});
        send(state.clone(), "POST", "/webhook", None, Some(body)).await;

        let (_, all) = send(state.clone(), "GET", "/api/pois/EURUSD", None, None).await;
        assert_eq!(all["total"], 4);

        let (_, valid) = send(state.clone(), "GET", "/api/pois/EURUSD?valid=true", None, None).await;
        assert_eq!(valid["total"], 3);

        let (_, gaps) =
            send(state, "GET", "/api/pois/EURUSD?kind=fair_value_gap", None, None).await;
        assert_eq!(gaps["total"], 3);
    }

    #[tokio::test]
    async fn unknown_symbol_is_404() {
        let (status, _) = send(state(None), "GET", "/api/pois/GBPUSD", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn query_routes_share_the_token() {
        let (status, _) = send(state(Some("t")), "GET", "/api/symbols", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
