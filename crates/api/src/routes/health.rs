use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::AppState;

pub fn health_router() -> Router<AppState> {
    Router::new().route("/healthz", get(healthz))
}

/// Health check endpoint, no auth required.
async fn healthz(State(state): State<AppState>) -> Json<Value> {
    let symbols = state.registry.symbols().await;
    Json(json!({
        "status": "ok",
        "symbols": symbols.len(),
        "primary_timeframe": state.registry.config().engine.primary_timeframe,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::testutil::{send, state};

    #[tokio::test]
    async fn healthz_needs_no_token() {
        let (status, body) = send(state(Some("secret")), "GET", "/healthz", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["symbols"], 2);
        assert_eq!(body["primary_timeframe"], "M15");
    }
}
