mod auth;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use engine::EngineRegistry;

/// Shared application state injected into every route handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<EngineRegistry>,
    /// Bearer token required on `/webhook` and `/api/*` when set.
    pub webhook_token: Option<String>,
}

/// All routes with state applied. Split out of `serve` so tests can drive it.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any);

    Router::new()
        .merge(routes::webhook_router(state.clone()))
        .merge(routes::api_router(state.clone()))
        .merge(routes::health_router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Bind and run the webhook server until the listener fails.
pub async fn serve(state: AppState, port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(state);

    info!(%addr, "Webhook server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use common::FixedClock;
    use engine::EngineRegistry;
    use smc::SmcConfig;

    use crate::{router, AppState};

    pub fn state(token: Option<&str>) -> AppState {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 10, 7, 18, 0, 0).unwrap()));
        let registry = EngineRegistry::new(
            &["EURUSD".to_string(), "XAUUSD".to_string()],
            Arc::new(SmcConfig::default()),
            clock,
            false,
        );
        AppState {
            registry: Arc::new(registry),
            webhook_token: token.map(str::to_string),
        }
    }

    /// Bullish gap, a filled gap and a bullish order block: one long signal.
    pub fn signal_candles() -> Value {
        let t0 = Utc.with_ymd_and_hms(2025, 10, 7, 16, 0, 0).unwrap();
        let bars = [
            (1.1020, 1.1025, 1.1000, 1.1005),
            (1.1005, 1.1006, 1.0990, 1.0992),
            (1.0992, 1.0998, 1.0980, 1.0985),
            (1.0985, 1.0987, 1.0970, 1.0975),
            (1.0975, 1.0990, 1.0972, 1.0988),
            (1.0988, 1.1030, 1.0986, 1.1025),
        ];
        bars.iter()
            .enumerate()
            .map(|(i, (o, h, l, c))| {
                json!({
                    "time": (t0 + Duration::minutes(15 * i as i64)).to_rfc3339(),
                    "open": o, "high": h, "low": l, "close": c, "volume": 100
                })
            })
            .collect()
    }

    pub async fn send(
        state: AppState,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            req = req.header("Authorization", format!("Bearer {t}"));
        }
        let req = match body {
            Some(b) => req
                .header("Content-Type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let resp = router(state).oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }
}
